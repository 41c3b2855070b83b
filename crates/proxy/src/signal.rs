//! The custom EDNS0 options both proxies agree on: the query-side
//! capability marker and the reply-side fragment descriptor.

use fragdns_domain::{FragmentDescriptor, CAPABILITY_OPTION_CODE, DESCRIPTOR_OPTION_CODE};
use hickory_proto::op::{Edns, Message};
use hickory_proto::rr::rdata::opt::{EdnsCode, EdnsOption};

/// Payload size advertised on behalf of stubs that sent no OPT record.
pub const DEFAULT_CLIENT_PAYLOAD: u16 = 512;

/// Descriptor data emitted while fragments are being packed; rewritten to
/// the real `[total, seq]` once the fragment count is known. Same encoded
/// size either way.
pub const DESCRIPTOR_PLACEHOLDER: [u8; 2] = [0, 0];

/// Payload advertised toward the backend once the capability marker has
/// been consumed. The proxy needs the complete reply to do its own
/// splitting, otherwise the resolver would TC-truncate at the client's
/// advertised size.
pub const BACKEND_PAYLOAD: u16 = 65535;

/// Marks an outbound query as reassembly-capable.
///
/// Ensures the query carries an OPT record (inserting one that advertises a
/// 512-octet buffer if absent) and appends the empty-data capability
/// option. Returns the payload size the client originally advertised, for
/// buffer enforcement when the reply is delivered.
pub fn mark_query(query: &mut Message) -> u16 {
    let edns = query.extensions_mut().get_or_insert_with(|| {
        let mut edns = Edns::new();
        edns.set_max_payload(DEFAULT_CLIENT_PAYLOAD);
        edns.set_version(0);
        edns
    });

    let advertised = edns.max_payload();
    edns.options_mut()
        .insert(EdnsOption::Unknown(CAPABILITY_OPTION_CODE, Vec::new()));

    advertised
}

/// Removes the capability marker from an inbound query, if present.
///
/// When the marker is found the OPT's advertised payload is raised to
/// 65535 so the backend may return the full reply in one message. Returns
/// whether the client supports reassembly.
pub fn consume_capability(query: &mut Message) -> bool {
    let Some(edns) = query.extensions_mut().as_mut() else {
        return false;
    };

    if edns
        .options()
        .get(EdnsCode::Unknown(CAPABILITY_OPTION_CODE))
        .is_none()
    {
        return false;
    }

    edns.options_mut()
        .remove(EdnsCode::Unknown(CAPABILITY_OPTION_CODE));
    edns.set_max_payload(BACKEND_PAYLOAD);
    true
}

/// Reads the fragment descriptor option, if the message carries one.
pub fn fragment_descriptor(msg: &Message) -> Option<FragmentDescriptor> {
    let edns = msg.extensions().as_ref()?;

    match edns.options().get(EdnsCode::Unknown(DESCRIPTOR_OPTION_CODE))? {
        EdnsOption::Unknown(_, data) => FragmentDescriptor::parse(data),
        _ => None,
    }
}

/// Inserts (or rewrites) the fragment descriptor option.
pub fn set_fragment_descriptor(msg: &mut Message, descriptor: FragmentDescriptor) {
    if let Some(edns) = msg.extensions_mut().as_mut() {
        edns.options_mut().insert(EdnsOption::Unknown(
            DESCRIPTOR_OPTION_CODE,
            descriptor.to_bytes().to_vec(),
        ));
    }
}

/// Removes the descriptor option before a reassembled reply leaves the
/// proxy, so the transport signal does not leak to the stub.
pub fn strip_fragment_descriptor(msg: &mut Message) {
    if let Some(edns) = msg.extensions_mut().as_mut() {
        edns.options_mut()
            .remove(EdnsCode::Unknown(DESCRIPTOR_OPTION_CODE));
    }
}

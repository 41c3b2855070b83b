//! Stitches a set of reply fragments back into one DNS message.

use std::collections::HashMap;

use fragdns_domain::ProxyError;
use hickory_proto::op::Message;

/// Collects the fragments of one reply, keyed by sequence number.
///
/// Fragments may arrive in any order; positions come from the descriptor,
/// never from arrival order. Duplicate sequence numbers overwrite — last
/// writer wins.
#[derive(Debug)]
pub struct Reassembly {
    total: u8,
    fragments: HashMap<u8, Message>,
}

impl Reassembly {
    pub fn new(total: u8) -> Self {
        Self {
            total,
            fragments: HashMap::with_capacity(total as usize),
        }
    }

    /// Stores one fragment. Returns false when the sequence number falls
    /// outside `0 .. total` and the fragment was discarded.
    pub fn insert(&mut self, seq: u8, fragment: Message) -> bool {
        if seq >= self.total {
            return false;
        }
        self.fragments.insert(seq, fragment);
        true
    }

    pub fn is_complete(&self) -> bool {
        self.fragments.len() >= self.total as usize
    }

    /// Rebuilds the original reply from the collected fragments.
    ///
    /// Fragment 0 is the base message: its header, question and OPT record
    /// carry over to the result. The record sections of fragments
    /// `1 .. total` are appended in sequence order; their OPT records were
    /// synthesized for transport and are not part of the payload.
    pub fn into_reply(mut self) -> Result<Message, ProxyError> {
        let mut reply = self
            .fragments
            .remove(&0)
            .ok_or(ProxyError::MissingFragment(0))?;

        for seq in 1..self.total {
            let mut fragment = self
                .fragments
                .remove(&seq)
                .ok_or(ProxyError::MissingFragment(seq))?;

            reply.answers_mut().extend(fragment.take_answers());
            reply.name_servers_mut().extend(fragment.take_name_servers());
            // The fragment's OPT lives outside the additional section and
            // is dropped with the fragment.
            reply.additionals_mut().extend(fragment.take_additionals());
        }

        Ok(reply)
    }
}

/// Enforces the payload size the client originally advertised.
///
/// A reply that encodes larger than `max_payload` is replaced by a
/// TC-flagged message with all record sections and the OPT removed; the
/// client is expected to retry over TCP.
pub fn enforce_buffer_limit(reply: Message, max_payload: u16) -> Result<Message, ProxyError> {
    let encoded = reply
        .to_vec()
        .map_err(|e| ProxyError::MalformedMessage(e.to_string()))?;

    if encoded.len() <= max_payload as usize {
        return Ok(reply);
    }

    let mut truncated = reply;
    truncated.set_truncated(true);
    truncated.take_answers();
    truncated.take_name_servers();
    truncated.take_additionals();
    *truncated.extensions_mut() = None;

    Ok(truncated)
}

//! Splits an oversize backend reply into a sequence of small self-contained
//! DNS messages, each tagged with a fragment descriptor.

use std::collections::VecDeque;

use fragdns_domain::{FragmentDescriptor, ProxyError, DESCRIPTOR_OPTION_CODE};
use hickory_proto::op::{Edns, Message};
use hickory_proto::rr::rdata::opt::EdnsOption;
use hickory_proto::rr::Record;
use tracing::trace;

use crate::signal::{self, DESCRIPTOR_PLACEHOLDER};

/// On-wire size ceiling for every fragment.
pub const FRAGMENT_SIZE_LIMIT: usize = 512;

/// The descriptor's total field is a single octet.
pub const MAX_FRAGMENT_COUNT: usize = u8::MAX as usize;

/// Splits `reply` into fragments of at most [`FRAGMENT_SIZE_LIMIT`] octets.
///
/// Every fragment repeats the reply's header and question and carries a
/// copy of the backend OPT record with the fragment descriptor appended.
/// Record order is preserved within each section, and sections are drained
/// answer-first, matching the layout of the original reply.
///
/// Packing is greedy and linear: records are appended one at a time and the
/// encoded size is recomputed after each append; the append that crosses
/// the limit is reverted and the fragment is sealed.
///
/// Two overflow conditions collapse the whole reply into a single
/// TC-flagged message with empty sections and no OPT record: a record that
/// cannot fit in a fragment even on its own, and a reply that would need
/// more than 255 fragments.
///
/// Returns [`ProxyError::MissingOpt`] when the reply has no OPT record to
/// copy; the caller decides whether to forward the reply unfragmented.
pub fn fragment_reply(reply: &Message) -> Result<Vec<Message>, ProxyError> {
    let base_edns = reply
        .extensions()
        .as_ref()
        .cloned()
        .ok_or(ProxyError::MissingOpt)?;

    // The codec keeps the OPT pseudo-RR out of the additional section, so
    // the three queues hold plain records only.
    let mut answers: VecDeque<Record> = reply.answers().iter().cloned().collect();
    let mut authorities: VecDeque<Record> = reply.name_servers().iter().cloned().collect();
    let mut additionals: VecDeque<Record> = reply.additionals().iter().cloned().collect();

    let mut fragments = Vec::new();

    loop {
        let mut fragment = fragment_shell(reply, &base_edns);

        let mut added = pack_section(&mut fragment, &mut answers, Message::answers_mut)?;
        added += pack_section(&mut fragment, &mut authorities, Message::name_servers_mut)?;
        added += pack_section(&mut fragment, &mut additionals, Message::additionals_mut)?;

        let drained = answers.is_empty() && authorities.is_empty() && additionals.is_empty();

        if added == 0 && !drained {
            // The record at the head of a queue does not fit even alone.
            trace!(qid = reply.id(), "record too large for a fragment");
            return Ok(vec![truncated_reply(reply)]);
        }

        fragments.push(fragment);

        if drained {
            break;
        }
    }

    if fragments.len() > MAX_FRAGMENT_COUNT {
        trace!(
            qid = reply.id(),
            fragments = fragments.len(),
            "fragment count exceeds descriptor range"
        );
        return Ok(vec![truncated_reply(reply)]);
    }

    let total = fragments.len() as u8;
    for (seq, fragment) in fragments.iter_mut().enumerate() {
        signal::set_fragment_descriptor(fragment, FragmentDescriptor::new(total, seq as u8));
    }

    Ok(fragments)
}

/// A fragment before any records are packed: the reply's header and
/// question, plus a copy of the backend OPT carrying a placeholder
/// descriptor. The placeholder has the same encoded size as the final
/// `[total, seq]` data, so measuring against it is exact.
fn fragment_shell(reply: &Message, base_edns: &Edns) -> Message {
    let mut shell = Message::new();
    shell.set_header(*reply.header());
    for query in reply.queries() {
        shell.add_query(query.clone());
    }

    let mut edns = base_edns.clone();
    edns.options_mut().insert(EdnsOption::Unknown(
        DESCRIPTOR_OPTION_CODE,
        DESCRIPTOR_PLACEHOLDER.to_vec(),
    ));
    shell.set_edns(edns);

    shell
}

/// Moves records from the queue into one section until the next record
/// would push the fragment over the size limit. Returns how many records
/// were packed.
fn pack_section(
    fragment: &mut Message,
    queue: &mut VecDeque<Record>,
    section: for<'a> fn(&'a mut Message) -> &'a mut Vec<Record>,
) -> Result<usize, ProxyError> {
    let mut added = 0;

    while let Some(record) = queue.pop_front() {
        section(fragment).push(record);

        if encoded_len(fragment)? <= FRAGMENT_SIZE_LIMIT {
            added += 1;
            continue;
        }

        // Over the limit: put the record back and seal this section.
        if let Some(record) = section(fragment).pop() {
            queue.push_front(record);
        }
        break;
    }

    Ok(added)
}

fn encoded_len(msg: &Message) -> Result<usize, ProxyError> {
    msg.to_vec()
        .map(|wire| wire.len())
        .map_err(|e| ProxyError::MalformedMessage(e.to_string()))
}

/// A single truncated reply: original header and question, TC set, no
/// record sections and no OPT. The requester is expected to retry over
/// TCP.
pub fn truncated_reply(reply: &Message) -> Message {
    let mut msg = Message::new();
    msg.set_header(*reply.header());
    for query in reply.queries() {
        msg.add_query(query.clone());
    }
    msg.set_truncated(true);
    msg
}

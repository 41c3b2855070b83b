//! The request pipelines behind the listeners: one handler per proxy role.

mod client;
mod server;

pub use client::ClientProxyHandler;
pub use server::ServerProxyHandler;

use std::net::SocketAddr;

use async_trait::async_trait;
use fragdns_domain::AccessList;
use hickory_proto::op::{Message, ResponseCode};
use tracing::warn;

/// Handles one parsed query and returns the messages to send back, in
/// order. The server proxy returns one message per fragment; everything
/// else is a single message.
///
/// Handlers are stateless across calls and invoked concurrently; every
/// invocation runs the full pipeline on a fresh upstream connection.
#[async_trait]
pub trait DnsHandler: Send + Sync + 'static {
    async fn handle_query(&self, query: Message, peer: SocketAddr) -> Vec<Message>;
}

/// SERVFAIL with the request's ID, opcode and question, no record
/// sections.
pub(crate) fn servfail(request: &Message) -> Message {
    let mut reply = Message::error_msg(
        request.id(),
        request.header().op_code(),
        ResponseCode::ServFail,
    );
    for query in request.queries() {
        reply.add_query(query.clone());
    }
    reply
}

/// REFUSED for sources outside the access list.
pub(crate) fn refused(request: &Message) -> Message {
    let mut reply = Message::error_msg(
        request.id(),
        request.header().op_code(),
        ResponseCode::Refused,
    );
    for query in request.queries() {
        reply.add_query(query.clone());
    }
    reply
}

/// Checks the source address against the access list when enforcement is
/// enabled. Logs and reports denials.
pub(crate) fn access_denied(access: &AccessList, enforce: bool, peer: SocketAddr) -> bool {
    if !enforce || access.allows(peer.ip()) {
        return false;
    }
    warn!(client = %peer, "query refused by access list");
    true
}

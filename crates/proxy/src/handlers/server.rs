use std::net::SocketAddr;

use async_trait::async_trait;
use fragdns_domain::{AccessList, ProxyError};
use hickory_proto::op::Message;
use tracing::{debug, error, warn};

use super::DnsHandler;
use crate::fragment;
use crate::signal;
use crate::upstream::UpstreamSet;

/// The server-side pipeline: strip the capability marker, obtain the full
/// reply from the backend resolver and split it into fragments when the
/// client asked for them.
pub struct ServerProxyHandler {
    upstreams: UpstreamSet,
    access: AccessList,
    enforce_access: bool,
}

impl ServerProxyHandler {
    pub fn new(upstreams: UpstreamSet, access: AccessList, enforce_access: bool) -> Self {
        Self {
            upstreams,
            access,
            enforce_access,
        }
    }

    async fn exchange(&self, query: &Message, peer: SocketAddr) -> Result<Message, ProxyError> {
        let conn = self.upstreams.connect().await?;
        debug!(
            client = %peer,
            qid = query.id(),
            server = %conn.server(),
            "forwarding query to backend"
        );
        conn.send(query).await?;
        conn.receive_matching(query.id()).await
    }
}

#[async_trait]
impl DnsHandler for ServerProxyHandler {
    async fn handle_query(&self, query: Message, peer: SocketAddr) -> Vec<Message> {
        if super::access_denied(&self.access, self.enforce_access, peer) {
            return vec![super::refused(&query)];
        }

        let mut backend_query = query.clone();
        let wants_fragments = signal::consume_capability(&mut backend_query);
        if wants_fragments {
            debug!(client = %peer, qid = query.id(), "client supports reassembly");
        }

        let reply = match self.exchange(&backend_query, peer).await {
            Ok(reply) => reply,
            Err(e) => {
                debug!(client = %peer, qid = query.id(), error = %e, "backend exchange failed");
                return vec![super::servfail(&query)];
            }
        };

        if !wants_fragments {
            debug!(client = %peer, qid = query.id(), "delivering raw reply");
            return vec![reply];
        }

        match fragment::fragment_reply(&reply) {
            Ok(fragments) => {
                debug!(
                    client = %peer,
                    qid = query.id(),
                    fragments = fragments.len(),
                    "reply fragmented"
                );
                fragments
            }
            Err(ProxyError::MissingOpt) => {
                warn!(
                    client = %peer,
                    qid = query.id(),
                    "backend reply has no OPT record, delivering raw reply"
                );
                vec![reply]
            }
            Err(e) => {
                error!(client = %peer, qid = query.id(), error = %e, "fragmentation failed");
                vec![super::servfail(&query)]
            }
        }
    }
}

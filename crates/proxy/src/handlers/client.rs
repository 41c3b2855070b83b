use std::net::SocketAddr;

use async_trait::async_trait;
use fragdns_domain::{AccessList, ProxyError};
use hickory_proto::op::Message;
use tracing::debug;

use super::DnsHandler;
use crate::reassembly::{self, Reassembly};
use crate::signal;
use crate::upstream::UpstreamSet;

/// The client-side pipeline: mark the query as reassembly-capable, forward
/// it upstream, collect the fragmented reply and deliver a single message
/// to the stub.
pub struct ClientProxyHandler {
    upstreams: UpstreamSet,
    access: AccessList,
    enforce_access: bool,
}

impl ClientProxyHandler {
    pub fn new(upstreams: UpstreamSet, access: AccessList, enforce_access: bool) -> Self {
        Self {
            upstreams,
            access,
            enforce_access,
        }
    }

    async fn resolve(&self, query: &Message, peer: SocketAddr) -> Result<Message, ProxyError> {
        let mut upstream_query = query.clone();
        let client_payload = signal::mark_query(&mut upstream_query);

        let conn = self.upstreams.connect().await?;
        debug!(
            client = %peer,
            qid = query.id(),
            server = %conn.server(),
            "forwarding query upstream"
        );
        conn.send(&upstream_query).await?;

        let first = conn.receive_matching(query.id()).await?;

        let Some(descriptor) = signal::fragment_descriptor(&first) else {
            debug!(client = %peer, qid = query.id(), "unfragmented reply, delivering verbatim");
            return Ok(first);
        };

        if descriptor.total == 0 {
            return Err(ProxyError::MalformedMessage(
                "fragment descriptor with zero total".to_string(),
            ));
        }

        debug!(
            client = %peer,
            qid = query.id(),
            total = descriptor.total,
            "collecting fragmented reply"
        );

        let mut reassembly = Reassembly::new(descriptor.total);
        reassembly.insert(descriptor.seq, first);

        while !reassembly.is_complete() {
            let fragment = conn.receive_matching(query.id()).await?;

            match signal::fragment_descriptor(&fragment) {
                Some(descriptor) => {
                    if !reassembly.insert(descriptor.seq, fragment) {
                        debug!(
                            qid = query.id(),
                            descriptor = %descriptor,
                            "discarding fragment with out-of-range sequence number"
                        );
                    }
                }
                None => {
                    debug!(
                        qid = query.id(),
                        "discarding unfragmented reply during reassembly"
                    );
                }
            }
        }

        let mut reply = reassembly.into_reply()?;
        signal::strip_fragment_descriptor(&mut reply);

        reassembly::enforce_buffer_limit(reply, client_payload)
    }
}

#[async_trait]
impl DnsHandler for ClientProxyHandler {
    async fn handle_query(&self, query: Message, peer: SocketAddr) -> Vec<Message> {
        if super::access_denied(&self.access, self.enforce_access, peer) {
            return vec![super::refused(&query)];
        }

        match self.resolve(&query, peer).await {
            Ok(reply) => vec![reply],
            Err(e) => {
                debug!(client = %peer, qid = query.id(), error = %e, "upstream exchange failed");
                vec![super::servfail(&query)]
            }
        }
    }
}

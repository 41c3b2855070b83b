#![allow(dead_code)]

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;

use hickory_proto::op::{Edns, Message, MessageType, OpCode, Query};
use hickory_proto::rr::rdata::{A, AAAA, NS, TXT};
use hickory_proto::rr::{Name, RData, Record, RecordType};
use tokio::net::UdpSocket;
use tokio::sync::oneshot;

pub fn query(id: u16, name: &str, record_type: RecordType) -> Message {
    let mut question = Query::new();
    question.set_name(Name::from_str(name).unwrap());
    question.set_query_type(record_type);

    let mut msg = Message::new();
    msg.set_id(id)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true)
        .add_query(question);
    msg
}

pub fn query_with_edns(id: u16, name: &str, record_type: RecordType, payload: u16) -> Message {
    let mut msg = query(id, name, record_type);
    let mut edns = Edns::new();
    edns.set_max_payload(payload);
    edns.set_version(0);
    msg.set_edns(edns);
    msg
}

/// Response shell echoing the query's ID and question.
pub fn reply_for(query: &Message) -> Message {
    let mut reply = Message::new();
    reply
        .set_id(query.id())
        .set_message_type(MessageType::Response)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true)
        .set_recursion_available(true);
    for question in query.queries() {
        reply.add_query(question.clone());
    }
    reply
}

/// Response shell with an OPT record, as a resolver that supports EDNS0
/// would send.
pub fn reply_with_edns(query: &Message, payload: u16) -> Message {
    let mut reply = reply_for(query);
    let mut edns = Edns::new();
    edns.set_max_payload(payload);
    edns.set_version(0);
    reply.set_edns(edns);
    reply
}

pub fn a_record(name: &str, last_octet: u8) -> Record {
    Record::from_rdata(
        Name::from_str(name).unwrap(),
        300,
        RData::A(A(Ipv4Addr::new(192, 0, 2, last_octet))),
    )
}

pub fn aaaa_record(name: &str, index: u16) -> Record {
    Record::from_rdata(
        Name::from_str(name).unwrap(),
        300,
        RData::AAAA(AAAA(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, index))),
    )
}

pub fn ns_record(name: &str, target: &str) -> Record {
    Record::from_rdata(
        Name::from_str(name).unwrap(),
        300,
        RData::NS(NS(Name::from_str(target).unwrap())),
    )
}

/// A TXT record whose rdata alone approaches `size` octets, for overflow
/// cases.
pub fn txt_record(name: &str, size: usize) -> Record {
    let mut strings = Vec::new();
    let mut remaining = size;
    while remaining > 0 {
        let chunk = remaining.min(250);
        strings.push("x".repeat(chunk));
        remaining -= chunk;
    }

    Record::from_rdata(
        Name::from_str(name).unwrap(),
        300,
        RData::TXT(TXT::new(strings)),
    )
}

/// Backend reply with `count` AAAA answers and an OPT record. Around 28
/// octets per record on the wire, so a few dozen answers comfortably
/// exceed one 512-octet message.
pub fn reply_with_aaaa(query: &Message, count: u16) -> Message {
    let mut reply = reply_with_edns(query, 4096);
    let name = query.queries()[0].name().to_string();
    for index in 0..count {
        reply.add_answer(aaaa_record(&name, index));
    }
    reply
}

pub fn encode(msg: &Message) -> Vec<u8> {
    msg.to_vec().unwrap()
}

pub fn decode(bytes: &[u8]) -> Message {
    Message::from_vec(bytes).unwrap()
}

/// Scripted UDP upstream: every incoming datagram is answered with
/// whatever wire messages the responder returns, in order.
pub struct MockUpstream {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockUpstream {
    pub async fn start<F>(respond: F) -> std::io::Result<Self>
    where
        F: Fn(Vec<u8>) -> Vec<Vec<u8>> + Send + Sync + 'static,
    {
        let socket = UdpSocket::bind("127.0.0.1:0").await?;
        let addr = socket.local_addr()?;

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            let mut buf = vec![0u8; 65535];

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        break;
                    }
                    result = socket.recv_from(&mut buf) => {
                        if let Ok((len, peer)) = result {
                            for reply in respond(buf[..len].to_vec()) {
                                let _ = socket.send_to(&reply, peer).await;
                            }
                        }
                    }
                }
            }
        });

        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use hickory_proto::op::Message;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tracing::{debug, error};

use crate::handlers::DnsHandler;

/// Queries only arrive on this socket; 4k covers any sane query.
const MAX_QUERY_SIZE: usize = 4096;

pub fn bind(addr: SocketAddr) -> io::Result<UdpSocket> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    if addr.is_ipv6() {
        socket.set_only_v6(false)?;
    }
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.set_nonblocking(true)?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket)
}

/// Receive loop. Each datagram is parsed and handled on its own task so a
/// slow upstream never blocks the socket; every message the handler
/// returns goes out as its own datagram.
pub async fn serve(socket: Arc<UdpSocket>, handler: Arc<dyn DnsHandler>) {
    let mut buf = [0u8; MAX_QUERY_SIZE];

    loop {
        let (len, peer) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                error!(error = %e, "udp recv error");
                continue;
            }
        };

        let wire = buf[..len].to_vec();
        let handler = handler.clone();
        let socket = socket.clone();

        tokio::spawn(async move {
            let query = match Message::from_vec(&wire) {
                Ok(query) => query,
                Err(e) => {
                    debug!(client = %peer, error = %e, "dropping malformed query");
                    return;
                }
            };

            for response in handler.handle_query(query, peer).await {
                match response.to_vec() {
                    Ok(bytes) => {
                        if let Err(e) = socket.send_to(&bytes, peer).await {
                            debug!(client = %peer, error = %e, "failed to send response");
                        }
                    }
                    Err(e) => {
                        error!(client = %peer, error = %e, "failed to encode response");
                    }
                }
            }
        });
    }
}

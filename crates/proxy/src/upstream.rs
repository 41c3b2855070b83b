//! Upstream exchange over UDP with a per-transaction socket and an
//! absolute deadline across the whole exchange.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use fragdns_domain::ProxyError;
use hickory_proto::op::Message;
use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::debug;

/// Largest datagram the backend may send once the advertised payload has
/// been raised to 65535.
const MAX_UDP_RESPONSE_SIZE: usize = 65535;

/// The configured upstream endpoints. Each request picks one uniformly at
/// random; no affinity is kept between requests.
#[derive(Debug, Clone)]
pub struct UpstreamSet {
    servers: Vec<SocketAddr>,
    timeout: Duration,
}

impl UpstreamSet {
    pub fn new(servers: Vec<SocketAddr>, timeout: Duration) -> Result<Self, ProxyError> {
        if servers.is_empty() {
            return Err(ProxyError::InvalidUpstream(
                "no upstream servers configured".to_string(),
            ));
        }
        Ok(Self { servers, timeout })
    }

    pub fn pick(&self) -> SocketAddr {
        self.servers[fastrand::usize(..self.servers.len())]
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Opens a fresh connection to a randomly selected server.
    pub async fn connect(&self) -> Result<UpstreamConnection, ProxyError> {
        UpstreamConnection::connect(self.pick(), self.timeout).await
    }
}

/// One UDP socket bound for the duration of a single transaction.
///
/// Every transaction gets its own ephemeral socket, so query-ID collisions
/// across concurrent transactions cannot occur. The deadline is fixed at
/// connect time and bounds the whole exchange, however many datagrams it
/// takes.
pub struct UpstreamConnection {
    socket: UdpSocket,
    server: SocketAddr,
    deadline: Instant,
}

impl UpstreamConnection {
    pub async fn connect(server: SocketAddr, timeout: Duration) -> Result<Self, ProxyError> {
        let bind_addr = if server.is_ipv4() {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0)
        } else {
            SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0)
        };

        let socket = UdpSocket::bind(bind_addr).await.map_err(|e| {
            ProxyError::UpstreamIo(format!("failed to bind upstream socket: {}", e))
        })?;

        socket.connect(server).await.map_err(|e| {
            ProxyError::UpstreamIo(format!("failed to connect to {}: {}", server, e))
        })?;

        Ok(Self {
            socket,
            server,
            deadline: Instant::now() + timeout,
        })
    }

    pub fn server(&self) -> SocketAddr {
        self.server
    }

    pub async fn send(&self, msg: &Message) -> Result<(), ProxyError> {
        let wire = msg
            .to_vec()
            .map_err(|e| ProxyError::MalformedMessage(e.to_string()))?;

        match tokio::time::timeout_at(self.deadline, self.socket.send(&wire)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(ProxyError::UpstreamIo(format!(
                "failed to send query to {}: {}",
                self.server, e
            ))),
            Err(_) => Err(ProxyError::UpstreamTimeout {
                server: self.server.to_string(),
            }),
        }
    }

    /// Waits for the next reply whose DNS ID matches `id`.
    ///
    /// Replies carrying a different ID are discarded and the read
    /// continues; this rejects trivial QID spoofing. Runs until a match,
    /// a malformed datagram, or the connection deadline.
    pub async fn receive_matching(&self, id: u16) -> Result<Message, ProxyError> {
        let mut buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];

        loop {
            let len = match tokio::time::timeout_at(self.deadline, self.socket.recv(&mut buf)).await
            {
                Ok(Ok(len)) => len,
                Ok(Err(e)) => {
                    return Err(ProxyError::UpstreamIo(format!(
                        "failed to receive from {}: {}",
                        self.server, e
                    )))
                }
                Err(_) => {
                    return Err(ProxyError::UpstreamTimeout {
                        server: self.server.to_string(),
                    })
                }
            };

            let response = Message::from_vec(&buf[..len])
                .map_err(|e| ProxyError::MalformedMessage(e.to_string()))?;

            if response.id() == id {
                return Ok(response);
            }

            debug!(
                expected = id,
                received = response.id(),
                server = %self.server,
                "ignoring reply for a different query id"
            );
        }
    }
}

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hickory_proto::op::Message;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error};

use crate::handlers::DnsHandler;

const MAX_TCP_MESSAGE_SIZE: usize = 65535;

/// Idle time allowed between requests before a client connection is
/// dropped.
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

pub fn bind(addr: SocketAddr) -> io::Result<TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    if addr.is_ipv6() {
        socket.set_only_v6(false)?;
    }
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1024)?;
    socket.set_nonblocking(true)?;

    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
}

/// Accept loop. Each connection is served on its own task and may carry
/// multiple length-prefixed requests (RFC 1035 §4.2.2 framing); every
/// message the handler returns is written with its own length prefix.
pub async fn serve(listener: TcpListener, handler: Arc<dyn DnsHandler>) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!(error = %e, "tcp accept error");
                continue;
            }
        };

        let handler = handler.clone();
        tokio::spawn(async move {
            if let Err(e) = serve_connection(stream, peer, handler).await {
                debug!(client = %peer, error = %e, "tcp connection closed");
            }
        });
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    handler: Arc<dyn DnsHandler>,
) -> io::Result<()> {
    loop {
        let wire = match tokio::time::timeout(CONNECTION_TIMEOUT, read_message(&mut stream)).await {
            Ok(Ok(Some(wire))) => wire,
            // clean EOF or idle client, drop the connection quietly
            Ok(Ok(None)) => return Ok(()),
            Ok(Err(e)) => return Err(e),
            Err(_) => return Ok(()),
        };

        let query = match Message::from_vec(&wire) {
            Ok(query) => query,
            Err(e) => {
                debug!(client = %peer, error = %e, "dropping malformed query");
                return Ok(());
            }
        };

        for response in handler.handle_query(query, peer).await {
            match response.to_vec() {
                Ok(bytes) => write_message(&mut stream, &bytes).await?,
                Err(e) => {
                    error!(client = %peer, error = %e, "failed to encode response");
                }
            }
        }
    }
}

async fn read_message(stream: &mut TcpStream) -> io::Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 2];
    match stream.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let len = u16::from_be_bytes(len_buf) as usize;
    let mut wire = vec![0u8; len];
    stream.read_exact(&mut wire).await?;

    Ok(Some(wire))
}

async fn write_message(stream: &mut TcpStream, bytes: &[u8]) -> io::Result<()> {
    if bytes.len() > MAX_TCP_MESSAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "response exceeds DNS message size limit",
        ));
    }

    stream.write_all(&(bytes.len() as u16).to_be_bytes()).await?;
    stream.write_all(bytes).await?;
    stream.flush().await
}

//! UDP and TCP listener front-ends. One handler object serves both
//! transports on every configured bind address.

pub mod tcp;
pub mod udp;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::info;

use crate::handlers::DnsHandler;

/// Binds every address for both transports and serves until the process
/// is stopped. Bind failures are reported before any traffic is accepted
/// so a misconfigured proxy exits instead of limping along.
pub async fn serve(addrs: Vec<SocketAddr>, handler: Arc<dyn DnsHandler>) -> io::Result<()> {
    let mut tasks: JoinSet<()> = JoinSet::new();

    for addr in addrs {
        let udp_socket = udp::bind(addr)?;
        info!(listen = %addr, "udp listener ready");
        tasks.spawn(udp::serve(Arc::new(udp_socket), handler.clone()));

        let tcp_listener = tcp::bind(addr)?;
        info!(listen = %addr, "tcp listener ready");
        tasks.spawn(tcp::serve(tcp_listener, handler.clone()));
    }

    while tasks.join_next().await.is_some() {}
    Ok(())
}

use std::sync::Arc;

use clap::Parser;
use fragdns_cli::bootstrap::{self, ProxyArgs};
use fragdns_domain::{Config, ProxyConfig};
use fragdns_proxy::handlers::ServerProxyHandler;
use fragdns_proxy::listen;
use tracing::info;

#[derive(Parser)]
#[command(name = "fragdns-server")]
#[command(version)]
#[command(about = "Server-side DNS proxy: obtains full replies from a backend \
resolver and splits oversize ones into small DNS messages")]
struct Cli {
    #[command(flatten)]
    args: ProxyArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = bootstrap::load_config(
        &cli.args,
        Config::with_proxy(ProxyConfig::server_defaults()),
    )?;
    bootstrap::init_logging(&config);

    info!("Starting fragdns server proxy v{}", env!("CARGO_PKG_VERSION"));
    info!(
        upstreams = ?config.proxy.upstream_servers,
        timeout_secs = config.proxy.query_timeout,
        "backend configuration"
    );

    let (upstreams, access) = bootstrap::proxy_parts(&config)?;
    let handler = Arc::new(ServerProxyHandler::new(
        upstreams,
        access,
        config.proxy.enforce_access,
    ));

    listen::serve(config.proxy.listen_addrs()?, handler).await?;
    Ok(())
}

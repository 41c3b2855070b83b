use std::sync::Arc;

use clap::Parser;
use fragdns_cli::bootstrap::{self, ProxyArgs};
use fragdns_domain::{Config, ProxyConfig};
use fragdns_proxy::handlers::ClientProxyHandler;
use fragdns_proxy::listen;
use tracing::info;

#[derive(Parser)]
#[command(name = "fragdns-client")]
#[command(version)]
#[command(about = "Client-side DNS proxy: signals reassembly support upstream and \
stitches fragmented replies back together for stub resolvers")]
struct Cli {
    #[command(flatten)]
    args: ProxyArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = bootstrap::load_config(
        &cli.args,
        Config::with_proxy(ProxyConfig::client_defaults()),
    )?;
    bootstrap::init_logging(&config);

    info!("Starting fragdns client proxy v{}", env!("CARGO_PKG_VERSION"));
    info!(
        upstreams = ?config.proxy.upstream_servers,
        timeout_secs = config.proxy.query_timeout,
        "upstream configuration"
    );

    let (upstreams, access) = bootstrap::proxy_parts(&config)?;
    let handler = Arc::new(ClientProxyHandler::new(
        upstreams,
        access,
        config.proxy.enforce_access,
    ));

    listen::serve(config.proxy.listen_addrs()?, handler).await?;
    Ok(())
}

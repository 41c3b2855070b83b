use clap::Args;
use fragdns_domain::{AccessList, CliOverrides, Config, ConfigError};
use fragdns_proxy::upstream::UpstreamSet;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line surface shared by both proxies.
#[derive(Debug, Args)]
pub struct ProxyArgs {
    /// Comma-separated upstream endpoints we proxy requests to
    #[arg(long = "proxy", value_name = "HOST:PORT,...")]
    pub proxy: Option<String>,

    /// Comma-separated bind addresses (both udp and tcp)
    #[arg(long, value_name = "ADDR,...")]
    pub listen: Option<String>,

    /// Comma-separated source networks allowed to query, 0.0.0.0/0 allows
    /// everything
    #[arg(long, value_name = "CIDR,...")]
    pub access: Option<String>,

    /// Upstream I/O deadline in seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Emit per-query diagnostics
    #[arg(long)]
    pub debug: bool,

    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl ProxyArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            upstream_servers: self.proxy.as_deref().map(split_list),
            listen_addresses: self.listen.as_deref().map(split_list),
            access_networks: self.access.as_deref().map(split_list),
            query_timeout: self.timeout,
            debug: self.debug,
            log_level: self.log_level.clone(),
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Loads and validates configuration: role defaults, then the config file,
/// then command-line overrides.
pub fn load_config(args: &ProxyArgs, defaults: Config) -> Result<Config, ConfigError> {
    let config = Config::load(args.config.as_deref(), defaults, args.overrides())?;
    config.validate()?;
    Ok(config)
}

pub fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Builds the upstream set and access list from validated configuration.
pub fn proxy_parts(config: &Config) -> anyhow::Result<(UpstreamSet, AccessList)> {
    let upstreams = UpstreamSet::new(config.proxy.upstream_addrs()?, config.proxy.timeout())?;

    let access = AccessList::parse(&config.proxy.access_networks)?;
    info!(
        networks = access.len(),
        enforced = config.proxy.enforce_access,
        "access list loaded"
    );

    Ok((upstreams, access))
}

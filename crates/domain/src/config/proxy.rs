use serde::{Deserialize, Serialize};
use std::net::{Ipv6Addr, SocketAddr};
use std::time::Duration;

use super::errors::ConfigError;
use crate::access::AccessList;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyConfig {
    /// Upstream endpoints queries are proxied to.
    #[serde(default)]
    pub upstream_servers: Vec<String>,

    /// Addresses to listen on, both UDP and TCP. A bare port number binds
    /// the wildcard address.
    #[serde(default)]
    pub listen_addresses: Vec<String>,

    /// Source networks allowed to query, in CIDR notation.
    #[serde(default)]
    pub access_networks: Vec<String>,

    /// Upstream I/O deadline in seconds.
    #[serde(default = "default_query_timeout")]
    pub query_timeout: u64,

    /// Reject sources outside `access_networks` with REFUSED. Off by
    /// default: the list is parsed and logged but not consulted.
    #[serde(default)]
    pub enforce_access: bool,
}

impl ProxyConfig {
    /// Defaults for the client-side proxy, which sits near stub resolvers.
    pub fn client_defaults() -> Self {
        Self {
            upstream_servers: vec!["8.8.8.8:53".to_string(), "8.8.4.4:53".to_string()],
            listen_addresses: vec!["[::]:53".to_string()],
            access_networks: vec!["127.0.0.0/8".to_string(), "10.0.0.0/8".to_string()],
            query_timeout: default_query_timeout(),
            enforce_access: false,
        }
    }

    /// Defaults for the server-side proxy, which fronts a resolver on the
    /// same host.
    pub fn server_defaults() -> Self {
        Self {
            upstream_servers: vec!["127.0.0.1:53".to_string()],
            listen_addresses: vec!["8000".to_string()],
            access_networks: vec!["0.0.0.0/0".to_string()],
            query_timeout: default_query_timeout(),
            enforce_access: false,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout)
    }

    pub fn upstream_addrs(&self) -> Result<Vec<SocketAddr>, ConfigError> {
        self.upstream_servers
            .iter()
            .map(|server| {
                server.parse().map_err(|e| {
                    ConfigError::Validation(format!("Invalid upstream address {}: {}", server, e))
                })
            })
            .collect()
    }

    pub fn listen_addrs(&self) -> Result<Vec<SocketAddr>, ConfigError> {
        self.listen_addresses
            .iter()
            .map(|entry| parse_listen_entry(entry))
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream_servers.is_empty() {
            return Err(ConfigError::Validation(
                "No upstream servers configured".to_string(),
            ));
        }

        if self.listen_addresses.is_empty() {
            return Err(ConfigError::Validation(
                "No listen addresses configured".to_string(),
            ));
        }

        if self.query_timeout == 0 {
            return Err(ConfigError::Validation(
                "Query timeout cannot be 0".to_string(),
            ));
        }

        self.upstream_addrs()?;
        self.listen_addrs()?;

        AccessList::parse(&self.access_networks)
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        Ok(())
    }
}

fn parse_listen_entry(entry: &str) -> Result<SocketAddr, ConfigError> {
    if let Ok(addr) = entry.parse::<SocketAddr>() {
        return Ok(addr);
    }

    // A bare port number binds the wildcard address on both families.
    if let Ok(port) = entry.parse::<u16>() {
        return Ok(SocketAddr::from((Ipv6Addr::UNSPECIFIED, port)));
    }

    Err(ConfigError::Validation(format!(
        "Invalid listen address: {}",
        entry
    )))
}

fn default_query_timeout() -> u64 {
    5
}

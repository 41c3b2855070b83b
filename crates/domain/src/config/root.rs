use serde::Deserialize;

use super::errors::ConfigError;
use super::logging::LoggingConfig;
use super::proxy::ProxyConfig;

/// Main configuration for one proxy process. The two binaries differ only
/// in their default `ProxyConfig`.
#[derive(Debug, Clone)]
pub struct Config {
    pub proxy: ProxyConfig,
    pub logging: LoggingConfig,
}

impl Config {
    pub fn with_proxy(proxy: ProxyConfig) -> Self {
        Self {
            proxy,
            logging: LoggingConfig::default(),
        }
    }

    /// Load configuration on top of role defaults.
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. fragdns.toml in current directory
    /// 3. /etc/fragdns/config.toml
    /// 4. The provided defaults
    ///
    /// CLI overrides are applied last.
    pub fn load(
        path: Option<&str>,
        defaults: Self,
        overrides: CliOverrides,
    ) -> Result<Self, ConfigError> {
        let mut config = defaults;

        if let Some(path) = path {
            config.apply_file(path)?;
        } else if std::path::Path::new("fragdns.toml").exists() {
            config.apply_file("fragdns.toml")?;
        } else if std::path::Path::new("/etc/fragdns/config.toml").exists() {
            config.apply_file("/etc/fragdns/config.toml")?;
        }

        config.apply_cli_overrides(overrides);
        Ok(config)
    }

    fn apply_file(&mut self, path: &str) -> Result<(), ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        let file: FileConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;

        if let Some(servers) = file.proxy.upstream_servers {
            self.proxy.upstream_servers = servers;
        }
        if let Some(listen) = file.proxy.listen_addresses {
            self.proxy.listen_addresses = listen;
        }
        if let Some(access) = file.proxy.access_networks {
            self.proxy.access_networks = access;
        }
        if let Some(timeout) = file.proxy.query_timeout {
            self.proxy.query_timeout = timeout;
        }
        if let Some(enforce) = file.proxy.enforce_access {
            self.proxy.enforce_access = enforce;
        }
        if let Some(logging) = file.logging {
            self.logging = logging;
        }

        Ok(())
    }

    /// Apply command-line overrides to configuration
    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(servers) = overrides.upstream_servers {
            self.proxy.upstream_servers = servers;
        }
        if let Some(listen) = overrides.listen_addresses {
            self.proxy.listen_addresses = listen;
        }
        if let Some(access) = overrides.access_networks {
            self.proxy.access_networks = access;
        }
        if let Some(timeout) = overrides.query_timeout {
            self.proxy.query_timeout = timeout;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        } else if overrides.debug {
            self.logging.level = "debug".to_string();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.proxy.validate()
    }
}

/// Partial file representation; absent fields keep the role defaults.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    proxy: FileProxyConfig,
    #[serde(default)]
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct FileProxyConfig {
    upstream_servers: Option<Vec<String>>,
    listen_addresses: Option<Vec<String>>,
    access_networks: Option<Vec<String>>,
    query_timeout: Option<u64>,
    enforce_access: Option<bool>,
}

/// Command-line overrides for configuration
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub upstream_servers: Option<Vec<String>>,
    pub listen_addresses: Option<Vec<String>>,
    pub access_networks: Option<Vec<String>>,
    pub query_timeout: Option<u64>,
    pub debug: bool,
    pub log_level: Option<String>,
}

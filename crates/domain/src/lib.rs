pub mod access;
pub mod config;
pub mod descriptor;
pub mod errors;

pub use access::AccessList;
pub use config::{CliOverrides, Config, ConfigError, LoggingConfig, ProxyConfig};
pub use descriptor::{FragmentDescriptor, CAPABILITY_OPTION_CODE, DESCRIPTOR_OPTION_CODE};
pub use errors::ProxyError;

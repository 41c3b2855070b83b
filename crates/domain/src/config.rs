pub mod errors;
pub mod logging;
pub mod proxy;
pub mod root;

pub use errors::ConfigError;
pub use logging::LoggingConfig;
pub use proxy::ProxyConfig;
pub use root::{CliOverrides, Config};

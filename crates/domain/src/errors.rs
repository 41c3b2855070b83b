use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ProxyError {
    #[error("Invalid upstream address: {0}")]
    InvalidUpstream(String),

    #[error("Invalid CIDR format: {0}")]
    InvalidCidr(String),

    #[error("Upstream I/O error: {0}")]
    UpstreamIo(String),

    #[error("Timeout waiting for upstream {server}")]
    UpstreamTimeout { server: String },

    #[error("Malformed DNS message: {0}")]
    MalformedMessage(String),

    #[error("Reply carries no OPT record")]
    MissingOpt,

    #[error("Missing fragment {0}")]
    MissingFragment(u8),

    #[error("Configuration error: {0}")]
    Config(String),
}

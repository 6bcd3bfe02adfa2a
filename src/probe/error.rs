use std::io;

use rustls::pki_types::InvalidDnsNameError;

/// Reasons a single probe attempt did not classify a port.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to connect: {0}")]
    Connect(#[source] io::Error),
    #[error("failed to build probe request: {0}")]
    Request(#[from] http::Error),
    #[error("no HTTP response: {0}")]
    Http(#[source] hyper::Error),
    #[error("invalid TLS server name `{host}`: {source}")]
    InvalidServerName {
        host: String,
        #[source]
        source: InvalidDnsNameError,
    },
    #[error("TLS handshake failed: {0}")]
    Tls(#[source] io::Error),
    #[error("failed to configure TLS client: {0}")]
    TlsConfig(#[from] rustls::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

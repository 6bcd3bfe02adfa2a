use std::io;

use http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unsupported engine endpoint `{0}` (expected unix://, tcp:// or http://)")]
    UnsupportedEndpoint(String),
    #[error("failed to connect to engine at `{endpoint}`: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to build engine request: {0}")]
    Request(#[from] http::Error),
    #[error("engine request failed: {0}")]
    Http(#[source] hyper::Error),
    #[error("engine answered {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("failed to decode engine response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("failed to decode stats snapshot: {0}")]
    Stats(#[from] crate::stats::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

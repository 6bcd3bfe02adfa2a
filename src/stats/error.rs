//! Defines the error type produced while reading a runtime stats snapshot.
//!
//! None of these errors escape [`super::compute`]; they exist so that each metric can report
//! *why* it fell back to its default before the caller folds the failure into a warning.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("missing stats field `{0}`")]
    MissingField(&'static str),

    #[error("invalid value {value} for stats field `{field}`")]
    InvalidField { field: &'static str, value: String },

    #[error("failed to decode stats snapshot: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

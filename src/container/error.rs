#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid container id: {0}")]
    InvalidContainerID(String),
    #[error("invalid host port `{value}` for `{spec}`")]
    InvalidHostPort { spec: String, value: String },
}
pub type Result<T> = std::result::Result<T, Error>;

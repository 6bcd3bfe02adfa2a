use std::net::SocketAddr;
use std::time::Duration;

use crate::docker::{self, Endpoint};
use crate::probe::DEFAULT_MAX_CONCURRENCY;
use crate::processor::DEFAULT_CYCLE_TIMEOUT;

pub const DEFAULT_DOCKER_HOST: &str = "unix:///var/run/docker.sock";
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_VERSION: &str = "unknown";
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:5000";
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(2000);

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid value `{value}` for `{name}`: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("invalid `DOCKER_HOST`: {0}")]
    Endpoint(#[from] docker::Error),
}

type Result<T> = std::result::Result<T, Error>;

/// Start-up configuration of the monitor.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub endpoint: Endpoint,
    /// Id (or id prefix) of the container this process runs in.
    pub current_container_id: Option<String>,
    /// Host the published ports are probed on.
    pub host: String,
    pub version: String,
    pub listen_addr: SocketAddr,
    /// Timeout of a single probe attempt.
    pub probe_timeout: Duration,
    pub max_concurrent_probes: usize,
    pub cycle_timeout: Duration,
    /// Switches the default log level to `debug`.
    pub verbose: bool,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let endpoint = lookup("DOCKER_HOST")
            .unwrap_or_else(|| DEFAULT_DOCKER_HOST.to_owned())
            .parse()?;

        let listen_addr = match lookup("LISTEN_ADDR") {
            Some(value) => parse("LISTEN_ADDR", value)?,
            None => DEFAULT_LISTEN_ADDR
                .parse()
                .map_err(|err| invalid("LISTEN_ADDR", DEFAULT_LISTEN_ADDR, err))?,
        };

        let probe_timeout = lookup("PROBE_TIMEOUT_MS")
            .map(|value| parse("PROBE_TIMEOUT_MS", value).map(Duration::from_millis))
            .transpose()?
            .unwrap_or(DEFAULT_PROBE_TIMEOUT);

        let max_concurrent_probes = match lookup("MAX_CONCURRENT_PROBES") {
            Some(value) => match parse::<usize>("MAX_CONCURRENT_PROBES", value)? {
                0 => {
                    return Err(invalid("MAX_CONCURRENT_PROBES", "0", "must be at least 1"));
                }
                n => n,
            },
            None => DEFAULT_MAX_CONCURRENCY,
        };

        let cycle_timeout = lookup("CYCLE_TIMEOUT_SECS")
            .map(|value| parse("CYCLE_TIMEOUT_SECS", value).map(Duration::from_secs))
            .transpose()?
            .unwrap_or(DEFAULT_CYCLE_TIMEOUT);

        Ok(Self {
            endpoint,
            current_container_id: lookup("HOSTNAME")
                .map(|id| id.trim().to_owned())
                .filter(|id| !id.is_empty()),
            host: lookup("HOST_HOSTNAME")
                .filter(|host| !host.is_empty())
                .unwrap_or_else(|| DEFAULT_HOST.to_owned()),
            version: lookup("VERSION").unwrap_or_else(|| DEFAULT_VERSION.to_owned()),
            listen_addr,
            probe_timeout,
            max_concurrent_probes,
            cycle_timeout,
            verbose: lookup("VERBOSE").is_some(),
        })
    }
}

fn parse<T>(name: &'static str, value: String) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|err| invalid(name, &value, err))
}

fn invalid(name: &'static str, value: &str, reason: impl std::fmt::Display) -> Error {
    Error::InvalidValue {
        name,
        value: value.to_owned(),
        reason: reason.to_string(),
    }
}

//! Runtime-agnostic view of a container.
//!
//! The types here describe what the processing pipeline needs to know about a container, and the
//! [`ContainerHandle`] / [`ContainerRuntime`] traits are the seams through which a concrete
//! runtime adapter (see [`crate::docker`]) supplies it.

use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

mod error;

pub use error::{Error, Result};

use crate::stats::RawStats;

/// The maximum allowed length for a [`ContainerID`].
const CONTAINER_ID_MAX_LEN: usize = 255;

/// Suffix of container port specs that are published over TCP, e.g. `80/tcp`.
const TCP_SUFFIX: &str = "/tcp";

/// A validated container identifier.
///
/// # Examples
///
/// ```
/// # use harbor_lens::container::ContainerID;
/// let container_id = ContainerID::new("abc123def456").unwrap();
/// assert!(container_id.starts_with("abc123"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerID(Arc<str>);

impl ContainerID {
    /// Creates a new `ContainerID` from the given raw id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainerID`] if the input is empty or its length exceeds
    /// [`CONTAINER_ID_MAX_LEN`].
    pub fn new(src: impl AsRef<str>) -> Result<Self> {
        let src = src.as_ref();
        if src.is_empty() || src.len() > CONTAINER_ID_MAX_LEN {
            return Err(Error::InvalidContainerID(src.to_owned()));
        }

        Ok(Self(src.into()))
    }

    /// Returns `true` if this id begins with `prefix`.
    ///
    /// Inside a container the hostname defaults to the short (12 character) container id, so a
    /// prefix match is what identifies the current container.
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl AsRef<str> for ContainerID {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ContainerID {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifiers of a container as reported by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerIdentity {
    pub id: ContainerID,
    pub name: String,
}

impl ContainerIdentity {
    pub fn new(id: ContainerID, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Lifecycle state of a container, as raw as the runtime reported it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerState {
    pub status: Option<String>,
    /// Health check status; `None` for containers without a health check.
    pub health: Option<String>,
    pub started_at: Option<String>,
}

/// Host ports a single container port is published on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortBinding {
    /// Container side of the binding, e.g. `8080/tcp` or `53/udp`.
    pub container_port_spec: String,
    pub host_ports: BTreeSet<u16>,
}

impl PortBinding {
    /// Creates a binding from the runtime's textual host ports.
    ///
    /// Host ports that are not valid port numbers are logged and skipped. Duplicates (e.g. the
    /// same port bound on IPv4 and IPv6) collapse into one entry.
    pub fn new<S: AsRef<str>>(
        container_port_spec: impl Into<String>,
        host_ports: impl IntoIterator<Item = S>,
    ) -> Self {
        let container_port_spec = container_port_spec.into();
        let host_ports = host_ports
            .into_iter()
            .filter_map(|raw| match parse_host_port(&container_port_spec, raw.as_ref()) {
                Ok(port) => Some(port),
                Err(err) => {
                    log::warn!("{}", err);
                    None
                }
            })
            .collect();

        Self {
            container_port_spec,
            host_ports,
        }
    }

    /// Returns `true` if the container port is published over TCP.
    pub fn is_tcp(&self) -> bool {
        self.container_port_spec.ends_with(TCP_SUFFIX)
    }
}

fn parse_host_port(spec: &str, raw: &str) -> Result<u16> {
    match raw.trim().parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(Error::InvalidHostPort {
            spec: spec.to_owned(),
            value: raw.to_owned(),
        }),
    }
}

/// Collects the host ports eligible for probing: TCP bindings with at least one host port.
pub fn candidate_ports(bindings: &[PortBinding]) -> BTreeSet<u16> {
    bindings
        .iter()
        .filter(|binding| binding.is_tcp() && !binding.host_ports.is_empty())
        .flat_map(|binding| binding.host_ports.iter().copied())
        .collect()
}

/// Inspected attributes of a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerAttributes {
    pub state: ContainerState,
    pub port_bindings: Vec<PortBinding>,
}

/// Read-only access to one container of a runtime.
pub trait ContainerHandle: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn identity(&self) -> &ContainerIdentity;

    /// Reads a single point-in-time stats sample.
    fn stats(&self) -> impl Future<Output = std::result::Result<RawStats, Self::Error>> + Send;

    /// Reads state and published ports.
    fn attributes(
        &self,
    ) -> impl Future<Output = std::result::Result<ContainerAttributes, Self::Error>> + Send;
}

/// A container runtime that can enumerate its running containers.
pub trait ContainerRuntime: Send + Sync + 'static {
    type Container: ContainerHandle + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    fn list_containers(
        &self,
    ) -> impl Future<Output = std::result::Result<Vec<Self::Container>, Self::Error>> + Send;
}

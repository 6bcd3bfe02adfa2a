//! Subset of the Docker Engine API responses consumed by the monitor.
//!
//! Every field is decoded leniently so that differences between engine versions degrade into
//! missing values instead of failed requests.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::container::{ContainerAttributes, ContainerState, PortBinding};
use crate::jsonutil;

/// Entry of `GET /containers/json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContainerSummary {
    #[serde(rename = "Id", default, deserialize_with = "jsonutil::lenient")]
    pub id: Option<String>,
    #[serde(rename = "Names", default, deserialize_with = "jsonutil::lenient")]
    pub names: Option<Vec<String>>,
}

impl ContainerSummary {
    /// Primary name without the leading `/`, falling back to the id.
    pub fn name(&self) -> Option<&str> {
        self.names
            .iter()
            .flatten()
            .map(|name| name.trim_start_matches('/'))
            .find(|name| !name.is_empty())
            .or(self.id.as_deref())
    }
}

/// Response of `GET /containers/{id}/json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContainerInspect {
    #[serde(rename = "State", default, deserialize_with = "jsonutil::lenient")]
    pub state: Option<StateInspect>,
    #[serde(
        rename = "NetworkSettings",
        default,
        deserialize_with = "jsonutil::lenient"
    )]
    pub network_settings: Option<NetworkSettingsInspect>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StateInspect {
    #[serde(rename = "Status", default, deserialize_with = "jsonutil::lenient")]
    pub status: Option<String>,
    #[serde(rename = "Health", default, deserialize_with = "jsonutil::lenient")]
    pub health: Option<HealthInspect>,
    #[serde(rename = "StartedAt", default, deserialize_with = "jsonutil::lenient")]
    pub started_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HealthInspect {
    #[serde(rename = "Status", default, deserialize_with = "jsonutil::lenient")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkSettingsInspect {
    /// Container port spec (`80/tcp`) to host bindings; `null` for unpublished ports.
    #[serde(rename = "Ports", default, deserialize_with = "jsonutil::lenient")]
    pub ports: Option<BTreeMap<String, Option<Vec<HostBindingInspect>>>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostBindingInspect {
    #[serde(rename = "HostPort", default, deserialize_with = "jsonutil::lenient")]
    pub host_port: Option<String>,
}

impl From<ContainerInspect> for ContainerAttributes {
    fn from(value: ContainerInspect) -> Self {
        let state = value
            .state
            .map(|state| ContainerState {
                status: state.status,
                health: state.health.and_then(|health| health.status),
                started_at: state.started_at,
            })
            .unwrap_or_default();

        let port_bindings = value
            .network_settings
            .and_then(|settings| settings.ports)
            .unwrap_or_default()
            .into_iter()
            .map(|(spec, bindings)| {
                PortBinding::new(
                    spec,
                    bindings
                        .unwrap_or_default()
                        .into_iter()
                        .filter_map(|binding| binding.host_port),
                )
            })
            .collect();

        Self {
            state,
            port_bindings,
        }
    }
}

//! Turns raw container handles into [`ContainerReport`]s.
//!
//! Every step isolates its own failures and substitutes a documented default, so a container
//! with broken metadata still shows up with placeholder values:
//!
//! | Step    | Default on failure     |
//! |---------|------------------------|
//! | stats   | `0.0` / `0.0`          |
//! | uptime  | `00:00:00`             |
//! | status  | `unknown`              |
//! | health  | `N/A`                  |
//! | ports   | empty                  |
//!
//! The only way [`ContainerProcessor::process`] yields no report is self-exclusion.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::container::{self, ContainerAttributes, ContainerHandle, ContainerID, PortBinding};
use crate::error::ResultOkLogExt;
use crate::probe::{PortClassifier, PortProber, Protocol};
use crate::stats::{self, NormalizedStats};
use crate::uptime::{self, UNKNOWN_UPTIME};

pub const UNKNOWN_STATUS: &str = "unknown";
pub const UNKNOWN_HEALTH: &str = "N/A";

/// Default deadline for one polling cycle across all containers.
pub const DEFAULT_CYCLE_TIMEOUT: Duration = Duration::from_secs(25);

/// A port that answered with a known protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ClassifiedPort {
    pub protocol: Protocol,
    pub port: u16,
}

/// Normalized view of one container for one polling cycle.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ContainerReport {
    pub name: String,
    /// Classified ports in ascending port order.
    pub ports: Vec<ClassifiedPort>,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub status: String,
    pub health: String,
    /// Elapsed time since start as `HH:MM:SS`.
    pub uptime: String,
}

#[derive(Debug, Clone)]
pub struct ContainerProcessor<P> {
    classifier: PortClassifier<P>,
    cycle_timeout: Duration,
    clock: fn() -> DateTime<Utc>,
}

impl<P: PortProber> ContainerProcessor<P> {
    pub fn new(classifier: PortClassifier<P>) -> Self {
        Self {
            classifier,
            cycle_timeout: DEFAULT_CYCLE_TIMEOUT,
            clock: Utc::now,
        }
    }

    pub fn with_cycle_timeout(mut self, cycle_timeout: Duration) -> Self {
        self.cycle_timeout = cycle_timeout;
        self
    }

    /// Replaces the wall clock used for uptime calculation.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Builds the report for a single container.
    ///
    /// Returns `None` if the container is the one this process runs in, i.e. its id starts with
    /// `current_container_id`. An empty `current_container_id` matches nothing.
    pub async fn process<H: ContainerHandle>(
        &self,
        container: &H,
        host: &str,
        current_container_id: Option<&str>,
    ) -> Option<ContainerReport> {
        let identity = container.identity();
        if is_current_container(&identity.id, current_container_id) {
            log::debug!("Skipping (current) container {}", identity.name);
            return None;
        }
        log::debug!("Processing container {}", identity.name);

        let stats = container
            .stats()
            .await
            .ok_log(format!("Error getting stats of container {}", identity.name))
            .map(|raw| stats::compute(&raw))
            .unwrap_or_default();

        let ContainerAttributes {
            state,
            port_bindings,
        } = match container.attributes().await.ok_log(format!(
            "Error inspecting container {}",
            identity.name
        )) {
            Some(attributes) => attributes,
            None => {
                return Some(ContainerReport::placeholder(identity.name.clone(), stats));
            }
        };

        let uptime = uptime::compute(state.started_at.as_deref(), (self.clock)());

        let status = state.status.unwrap_or_else(|| {
            log::warn!("Container {} reports no status", identity.name);
            UNKNOWN_STATUS.to_owned()
        });
        let health = state.health.unwrap_or_else(|| UNKNOWN_HEALTH.to_owned());

        let ports = self.classify_ports(host, &port_bindings).await;

        Some(ContainerReport {
            name: identity.name.clone(),
            ports,
            cpu_percent: stats.cpu_percent,
            memory_percent: stats.memory_percent,
            status,
            health,
            uptime,
        })
    }

    /// Processes all `containers` concurrently.
    ///
    /// Reports are sorted by container name; the current container is left out. If the cycle
    /// does not finish within the cycle timeout, an error is logged and no reports are returned.
    pub async fn process_all<H: ContainerHandle>(
        &self,
        containers: &[H],
        host: &str,
        current_container_id: Option<&str>,
    ) -> Vec<ContainerReport> {
        let cycle = futures::future::join_all(
            containers
                .iter()
                .map(|container| self.process(container, host, current_container_id)),
        );

        match tokio::time::timeout(self.cycle_timeout, cycle).await {
            Ok(reports) => {
                let mut reports: Vec<ContainerReport> = reports.into_iter().flatten().collect();
                reports.sort_by(|a, b| a.name.cmp(&b.name));
                reports
            }
            Err(_) => {
                log::error!(
                    "Container processing timed out after {:?}",
                    self.cycle_timeout
                );
                Vec::new()
            }
        }
    }

    async fn classify_ports(&self, host: &str, bindings: &[PortBinding]) -> Vec<ClassifiedPort> {
        let candidates = container::candidate_ports(bindings);
        if candidates.is_empty() {
            return Vec::new();
        }

        self.classifier
            .classify(host, &candidates)
            .await
            .into_iter()
            .map(|(port, protocol)| ClassifiedPort { protocol, port })
            .collect()
    }
}

fn is_current_container(id: &ContainerID, current_container_id: Option<&str>) -> bool {
    current_container_id.is_some_and(|current| !current.is_empty() && id.starts_with(current))
}

impl ContainerReport {
    /// Report for a container whose attributes could not be read.
    fn placeholder(name: String, stats: NormalizedStats) -> Self {
        Self {
            name,
            ports: Vec::new(),
            cpu_percent: stats.cpu_percent,
            memory_percent: stats.memory_percent,
            status: UNKNOWN_STATUS.to_owned(),
            health: UNKNOWN_HEALTH.to_owned(),
            uptime: UNKNOWN_UPTIME.to_owned(),
        }
    }
}

//! Docker Engine API adapter.
//!
//! Implements [`ContainerRuntime`] and [`ContainerHandle`] on top of the engine's REST API,
//! reached through a Unix socket or plain TCP.

mod error;
pub mod models;
mod transport;

pub use error::{Error, Result};
pub use transport::{Endpoint, Transport};

use crate::container::{
    ContainerAttributes, ContainerHandle, ContainerID, ContainerIdentity, ContainerRuntime,
};
use crate::stats::RawStats;
use models::{ContainerInspect, ContainerSummary};

/// Client for a single engine.
#[derive(Debug, Clone)]
pub struct DockerClient {
    transport: Transport,
}

impl DockerClient {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            transport: Transport::new(endpoint),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.transport.endpoint()
    }

    /// Lists running containers.
    pub async fn list_running(&self) -> Result<Vec<ContainerSummary>> {
        let body = self.transport.get("/containers/json").await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Reads one stats sample without streaming.
    ///
    /// The engine waits for a second sample internally so that `precpu_stats` is populated.
    pub async fn stats(&self, id: &ContainerID) -> Result<RawStats> {
        let body = self
            .transport
            .get(&format!("/containers/{id}/stats?stream=false"))
            .await?;
        Ok(RawStats::from_slice(&body)?)
    }

    pub async fn inspect(&self, id: &ContainerID) -> Result<ContainerInspect> {
        let body = self.transport.get(&format!("/containers/{id}/json")).await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// A container of a [`DockerClient`].
#[derive(Debug, Clone)]
pub struct DockerContainer {
    client: DockerClient,
    identity: ContainerIdentity,
}

impl DockerContainer {
    pub fn new(client: DockerClient, identity: ContainerIdentity) -> Self {
        Self { client, identity }
    }
}

impl ContainerHandle for DockerContainer {
    type Error = Error;

    fn identity(&self) -> &ContainerIdentity {
        &self.identity
    }

    async fn stats(&self) -> Result<RawStats> {
        self.client.stats(&self.identity.id).await
    }

    async fn attributes(&self) -> Result<ContainerAttributes> {
        Ok(self.client.inspect(&self.identity.id).await?.into())
    }
}

impl ContainerRuntime for DockerClient {
    type Container = DockerContainer;
    type Error = Error;

    async fn list_containers(&self) -> Result<Vec<DockerContainer>> {
        let containers = self
            .list_running()
            .await?
            .into_iter()
            .filter_map(|summary| {
                let Some(raw_id) = summary.id.as_deref() else {
                    log::warn!("Ignoring container listed without an id: {:?}", summary.names);
                    return None;
                };
                match ContainerID::new(raw_id) {
                    Ok(id) => {
                        let name = summary.name().unwrap_or(raw_id).to_owned();
                        Some(DockerContainer::new(
                            self.clone(),
                            ContainerIdentity::new(id, name),
                        ))
                    }
                    Err(err) => {
                        log::warn!("Ignoring container listed by the engine: {}", err);
                        None
                    }
                }
            })
            .collect();

        Ok(containers)
    }
}

//! Harbor Lens: a lightweight monitor for the containers of a single Docker host.
//!
//! For every running container it reports CPU and memory usage in percent, uptime, status,
//! health and which published ports speak HTTP or HTTPS. Port classification probes all
//! candidate ports of a container concurrently, so one slow port does not hold up the rest.
//! Every per-container step falls back to a fixed default on failure; a broken container never
//! breaks the report.

pub mod api;
pub mod config;
pub mod container;
pub mod docker;
pub mod error;
pub mod jsonutil;
pub mod probe;
pub mod processor;
pub mod stats;
pub mod uptime;

use config::Config;
use docker::DockerClient;
use probe::{NetworkProber, PortClassifier};
use processor::ContainerProcessor;

/// Runs the monitor with the given configuration.
///
/// # Errors
///
/// Fails if the TLS probe client cannot be set up or if the HTTP listener cannot be bound.
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    log::debug!("Configuration: {:?}", config);

    let prober = NetworkProber::new(config.probe_timeout)?;
    let classifier = PortClassifier::new(prober)
        .with_timeout(config.probe_timeout * 2)
        .with_max_concurrency(config.max_concurrent_probes);
    let processor = ContainerProcessor::new(classifier).with_cycle_timeout(config.cycle_timeout);

    let runtime = DockerClient::new(config.endpoint.clone());
    log::info!("Using container engine at {}", runtime.endpoint());
    match &config.current_container_id {
        Some(id) => log::info!("Excluding current container {}", id),
        None => log::info!("Not running in a container, nothing to exclude"),
    }

    let server = api::APIServer::new(api::AppState {
        runtime,
        processor,
        host: config.host,
        current_container_id: config.current_container_id,
        version: config.version,
    });
    server.listen(config.listen_addr).await?;

    Ok(())
}

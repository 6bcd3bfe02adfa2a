use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::net::ToSocketAddrs;

use crate::container::ContainerRuntime;
use crate::error::ResultOkLogExt;
use crate::probe::{PROBE_HEADER, PortProber};
use crate::processor::ContainerProcessor;

pub mod models;

/// Everything a request needs to run one polling cycle.
pub struct AppState<R, P> {
    pub runtime: R,
    pub processor: ContainerProcessor<P>,
    /// Host the published ports are probed on; also reported as `hostname`.
    pub host: String,
    pub current_container_id: Option<String>,
    pub version: String,
}

async fn reports<R, P>(State(state): State<Arc<AppState<R, P>>>, headers: HeaderMap) -> Response
where
    R: ContainerRuntime,
    P: PortProber + 'static,
{
    // another monitor (or this one) probing the port
    if headers.contains_key(PROBE_HEADER) {
        return "Alive".into_response();
    }

    let containers = state
        .runtime
        .list_containers()
        .await
        .ok_log("Error listing containers")
        .unwrap_or_default();
    log::debug!("Found {} running containers", containers.len());

    let containers = state
        .processor
        .process_all(
            &containers,
            &state.host,
            state.current_container_id.as_deref(),
        )
        .await;

    Json(models::ReportsResponse {
        hostname: state.host.clone(),
        version: state.version.clone(),
        containers,
    })
    .into_response()
}

async fn about<R, P>(State(state): State<Arc<AppState<R, P>>>) -> String
where
    R: ContainerRuntime,
    P: PortProber + 'static,
{
    format!("Version: {}", state.version)
}

/// Builds the router serving `/` and `/about`.
pub fn router<R, P>(state: AppState<R, P>) -> axum::Router
where
    R: ContainerRuntime,
    P: PortProber + 'static,
{
    axum::Router::new()
        .route("/", get(reports::<R, P>))
        .route("/about", get(about::<R, P>))
        .with_state(Arc::new(state))
}

pub struct APIServer {
    router: axum::Router,
}

impl APIServer {
    pub fn new<R, P>(state: AppState<R, P>) -> Self
    where
        R: ContainerRuntime,
        P: PortProber + 'static,
    {
        Self {
            router: router(state),
        }
    }

    /// Serves requests on `addr` until the server fails.
    pub async fn listen(self, addr: impl ToSocketAddrs) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        log::info!("Listening on {}", listener.local_addr()?);
        axum::serve(listener, self.router.into_make_service()).await
    }
}

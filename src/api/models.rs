use crate::processor::ContainerReport;

/// Payload of `GET /`.
#[derive(Debug, serde::Serialize)]
pub struct ReportsResponse {
    pub hostname: String,
    pub version: String,
    pub containers: Vec<ContainerReport>,
}

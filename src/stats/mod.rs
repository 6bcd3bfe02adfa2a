//! This module normalizes a container runtime's resource usage snapshot into stable percentages.
//!
//! The snapshot schema drifts between engine versions and platforms (cgroup v1 vs. v2, Linux vs.
//! Windows daemons), so every field of [`RawStats`] is optional and decoded leniently: a field
//! that is missing or carries an unexpected type simply decodes to `None`.
//!
//! # Main types
//!
//! - [`RawStats`]: One point-in-time snapshot as returned by the runtime engine.
//! - [`NormalizedStats`]: CPU and memory utilisation in percent, rounded to two decimals.
//!
//! # Failure handling
//!
//! [`compute`] never fails. Each metric is computed independently; if one cannot be computed it
//! is logged as a warning and reported as `0.0` while the other metric is still produced.
//! Negative results (CPU counter resets, page cache larger than usage) are floored to `0.0`.

mod cpu;
mod error;
mod memory;

pub use cpu::{CpuStats, CpuUsage, cpu_percent};
pub use error::{Error, Result};
pub use memory::{MemoryStats, memory_percent};

use serde::{Deserialize, Serialize};

use crate::jsonutil;

/// A single stats sample as reported by the runtime engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawStats {
    #[serde(default, deserialize_with = "jsonutil::lenient")]
    pub cpu_stats: Option<CpuStats>,
    #[serde(default, deserialize_with = "jsonutil::lenient")]
    pub precpu_stats: Option<CpuStats>,
    #[serde(default, deserialize_with = "jsonutil::lenient")]
    pub memory_stats: Option<MemoryStats>,
}

impl RawStats {
    /// Decodes a snapshot from the engine's JSON representation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the input is not a JSON object. Individual fields never cause
    /// a decode failure.
    pub fn from_slice(src: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(src)?)
    }
}

/// CPU and memory utilisation of a container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NormalizedStats {
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

/// Computes CPU and memory percentages from a raw snapshot.
///
/// Both values are `>= 0.0` and rounded to two decimal places.
pub fn compute(raw: &RawStats) -> NormalizedStats {
    let cpu_percent = match cpu_percent(raw.cpu_stats.as_ref(), raw.precpu_stats.as_ref()) {
        Ok(percent) => percent,
        Err(err) => {
            log::warn!("Error calculating CPU stats: {}", err);
            0.0
        }
    };

    let memory_percent = match raw.memory_stats.as_ref().map(memory_percent) {
        Some(Ok(percent)) => percent,
        Some(Err(err)) => {
            log::warn!("Error calculating memory stats: {}", err);
            0.0
        }
        None => 0.0,
    };

    NormalizedStats {
        cpu_percent: round_percent(cpu_percent),
        memory_percent: round_percent(memory_percent),
    }
}

/// Rounds to two decimals, mapping negative, `-0.0` and non-finite values to `0.0`.
fn round_percent(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        (value * 100.0).round() / 100.0
    } else {
        0.0
    }
}

//! CPU utilisation derived from two consecutive cumulative counters.
//!
//! The runtime reports a `cpu_stats` sample and the `precpu_stats` sample taken one read
//! earlier. Utilisation is the share of host CPU time consumed by the container between both
//! samples, scaled by the number of CPUs visible to the container:
//!
//! ```text
//! cpu_delta    = cpu_stats.cpu_usage.total_usage - precpu_stats.cpu_usage.total_usage
//! system_delta = cpu_stats.system_cpu_usage    - precpu_stats.system_cpu_usage
//! percent      = cpu_delta / system_delta * 100 * online_cpus
//! ```

use serde::Deserialize;

use super::error::{Error, Result};
use crate::jsonutil;

/// Cumulative CPU counters of one sample.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CpuStats {
    #[serde(default, deserialize_with = "jsonutil::lenient")]
    pub cpu_usage: Option<CpuUsage>,
    /// Total host CPU time in nanoseconds.
    #[serde(default, deserialize_with = "jsonutil::lenient")]
    pub system_cpu_usage: Option<u64>,
    #[serde(default, deserialize_with = "jsonutil::lenient")]
    pub online_cpus: Option<u64>,
}

/// CPU time consumed by the container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CpuUsage {
    /// Container CPU time in nanoseconds.
    #[serde(default, deserialize_with = "jsonutil::lenient")]
    pub total_usage: Option<u64>,
    /// Per-CPU breakdown; only reported by cgroup v1 engines.
    #[serde(default, deserialize_with = "jsonutil::lenient")]
    pub percpu_usage: Option<Vec<u64>>,
}

impl CpuStats {
    fn total_usage(&self) -> Option<u64> {
        self.cpu_usage.as_ref().and_then(|usage| usage.total_usage)
    }

    /// Number of CPUs the sample was taken across.
    ///
    /// Prefers `online_cpus`, falls back to the length of `percpu_usage` and finally to `1`.
    pub fn online_cpu_count(&self) -> u64 {
        self.online_cpus
            .or_else(|| {
                self.cpu_usage
                    .as_ref()
                    .and_then(|usage| usage.percpu_usage.as_ref())
                    .map(|percpu| percpu.len() as u64)
            })
            .unwrap_or(1)
    }
}

/// Computes the unrounded CPU percentage between `previous` and `current`.
///
/// Returns `Ok(0.0)` when the system delta or the CPU count is zero.
///
/// # Errors
///
/// Returns [`Error::MissingField`] naming the first counter that is absent from either sample.
pub fn cpu_percent(current: Option<&CpuStats>, previous: Option<&CpuStats>) -> Result<f64> {
    let current = current.ok_or(Error::MissingField("cpu_stats"))?;
    let previous = previous.ok_or(Error::MissingField("precpu_stats"))?;

    let total = current
        .total_usage()
        .ok_or(Error::MissingField("cpu_stats.cpu_usage.total_usage"))?;
    let previous_total = previous
        .total_usage()
        .ok_or(Error::MissingField("precpu_stats.cpu_usage.total_usage"))?;
    let system = current
        .system_cpu_usage
        .ok_or(Error::MissingField("cpu_stats.system_cpu_usage"))?;
    let previous_system = previous
        .system_cpu_usage
        .ok_or(Error::MissingField("precpu_stats.system_cpu_usage"))?;

    // counters are nanoseconds and may exceed f64's exact integer range
    let cpu_delta = (i128::from(total) - i128::from(previous_total)) as f64;
    let system_delta = (i128::from(system) - i128::from(previous_system)) as f64;
    let online_cpus = current.online_cpu_count();

    if system_delta > 0.0 && online_cpus > 0 {
        Ok(cpu_delta / system_delta * 100.0 * online_cpus as f64)
    } else {
        Ok(0.0)
    }
}

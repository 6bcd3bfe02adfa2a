//! Memory utilisation relative to the container's memory limit.
//!
//! Page cache is reclaimable by the kernel and is therefore subtracted from the reported usage
//! when the engine exposes it (cgroup v1 engines do, cgroup v2 engines usually do not).

use serde::Deserialize;

use super::error::{Error, Result};
use crate::jsonutil::Field;

/// Memory counters of one sample, in bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MemoryStats {
    #[serde(default)]
    pub usage: Field<u64>,
    #[serde(default)]
    pub cache: Field<u64>,
    #[serde(default)]
    pub limit: Field<u64>,
}

fn counter(field: &Field<u64>, name: &'static str) -> Result<Option<u64>> {
    field
        .get()
        .map(|value| value.copied())
        .map_err(|raw| Error::InvalidField {
            field: name,
            value: raw.to_string(),
        })
}

/// Computes the unrounded memory percentage.
///
/// A missing `usage` counts as `0`, a missing `limit` as `1`. A zero limit yields `0.0`.
/// The result is negative when `cache` exceeds `usage`; flooring is left to the caller.
///
/// # Errors
///
/// Returns [`Error::InvalidField`] if a counter is present but not a non-negative integer.
pub fn memory_percent(stats: &MemoryStats) -> Result<f64> {
    let usage = counter(&stats.usage, "memory_stats.usage")?.unwrap_or(0) as f64;
    let usage = match counter(&stats.cache, "memory_stats.cache")? {
        Some(cache) => usage - cache as f64,
        None => usage,
    };
    let limit = counter(&stats.limit, "memory_stats.limit")?.unwrap_or(1);

    if limit > 0 {
        Ok(usage / limit as f64 * 100.0)
    } else {
        Ok(0.0)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn stats(usage: Option<u64>, cache: Option<u64>, limit: Option<u64>) -> MemoryStats {
        let field = |value: Option<u64>| value.map(Field::from).unwrap_or_default();
        MemoryStats {
            usage: field(usage),
            cache: field(cache),
            limit: field(limit),
        }
    }

    #[test]
    fn test_memory_percent_subtracts_cache() {
        let percent = memory_percent(&stats(Some(600), Some(100), Some(1_000))).unwrap();
        assert!((percent - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_memory_percent_without_cache() {
        let percent = memory_percent(&stats(Some(250), None, Some(1_000))).unwrap();
        assert!((percent - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_memory_percent_zero_limit() {
        assert_eq!(memory_percent(&stats(Some(250), None, Some(0))).unwrap(), 0.0);
    }

    #[test]
    fn test_memory_percent_missing_limit_defaults_to_one() {
        let percent = memory_percent(&stats(Some(2), None, None)).unwrap();
        assert!((percent - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_memory_percent_cache_exceeding_usage_is_negative() {
        assert!(memory_percent(&stats(Some(100), Some(300), Some(1_000))).unwrap() < 0.0);
    }

    #[test]
    fn test_memory_percent_empty() {
        assert_eq!(memory_percent(&MemoryStats::default()).unwrap(), 0.0);
    }

    #[test]
    fn test_memory_percent_rejects_ill_typed_counters() {
        for (raw, field) in [
            (json!({"usage": 100, "limit": "1GiB"}), "memory_stats.limit"),
            (json!({"usage": 100, "limit": -1}), "memory_stats.limit"),
            (json!({"usage": 100, "cache": "40", "limit": 1000}), "memory_stats.cache"),
            (json!({"usage": null, "limit": 1000}), "memory_stats.usage"),
        ] {
            let stats: MemoryStats = serde_json::from_value(raw.clone()).unwrap();
            match memory_percent(&stats) {
                Err(Error::InvalidField { field: name, .. }) => assert_eq!(name, field, "{raw}"),
                other => panic!("Expected InvalidField for {raw}, got {other:?}"),
            }
        }
    }
}

//! Human readable container uptime.
//!
//! The runtime reports start times as RFC 3339 timestamps with nanosecond precision, e.g.
//! `2024-05-01T10:00:00.123456789Z`. Only whole seconds matter for display, so the fractional
//! part and the trailing `Z` are dropped before parsing.

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};

/// Uptime reported whenever the start time is missing or unusable.
pub const UNKNOWN_UPTIME: &str = "00:00:00";

const STARTED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("missing start timestamp")]
    Missing,
    #[error("invalid start timestamp `{value}`: {source}")]
    Parse {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("start timestamp {started_at} lies after {now}")]
    InFuture {
        started_at: DateTime<Utc>,
        now: DateTime<Utc>,
    },
}

/// Parses a runtime start timestamp, truncated to whole seconds, as UTC.
///
/// # Errors
///
/// Returns [`Error::Parse`] if the remaining text does not match `%Y-%m-%dT%H:%M:%S`.
pub fn parse_started_at(raw: &str) -> Result<DateTime<Utc>, Error> {
    let whole_seconds = raw.split_once('.').map_or(raw, |(seconds, _)| seconds);
    let whole_seconds = whole_seconds.trim_end_matches('Z');
    NaiveDateTime::parse_from_str(whole_seconds, STARTED_AT_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|source| Error::Parse {
            value: raw.to_owned(),
            source,
        })
}

/// Formats an elapsed duration as `HH:MM:SS`.
///
/// Hours wrap at 24, matching a wall clock rather than a day counter.
pub fn format_elapsed(elapsed: TimeDelta) -> String {
    let total = elapsed.num_seconds().max(0);
    let hours = (total / 3_600) % 24;
    let minutes = (total / 60) % 60;
    let seconds = total % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

fn try_compute(started_at: Option<&str>, now: DateTime<Utc>) -> Result<String, Error> {
    let started_at = parse_started_at(started_at.ok_or(Error::Missing)?)?;
    if started_at > now {
        return Err(Error::InFuture { started_at, now });
    }
    Ok(format_elapsed(now - started_at))
}

/// Computes the uptime string for a container started at `started_at`.
///
/// Never fails: any problem is logged and [`UNKNOWN_UPTIME`] is returned.
pub fn compute(started_at: Option<&str>, now: DateTime<Utc>) -> String {
    match try_compute(started_at, now) {
        Ok(uptime) => uptime,
        Err(err) => {
            log::error!("Error calculating uptime: {}", err);
            UNKNOWN_UPTIME.to_owned()
        }
    }
}

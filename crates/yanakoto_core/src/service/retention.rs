//! Point log retention.
//!
//! # Invariants
//! - Only entries strictly older than the cutoff are removed.
//! - The calendar-month horizon is computed in UTC; when the month
//!   arithmetic is not representable the cutoff falls back to `now`.

use crate::repo::point_log_repo::PointLogRepository;
use crate::repo::RepoResult;
use chrono::{DateTime, Months};
use log::info;
use std::time::Duration;

/// Default retention horizon in calendar months.
pub const DEFAULT_RETENTION_MONTHS: u32 = 1;

/// Returns `now_ms` minus `months` calendar months.
pub fn month_cutoff_ms(now_ms: i64, months: u32) -> i64 {
    DateTime::from_timestamp_millis(now_ms)
        .and_then(|now| now.checked_sub_months(Months::new(months)))
        .map(|cutoff| cutoff.timestamp_millis())
        .unwrap_or(now_ms)
}

/// Removes entries with `timestamp < now_ms - horizon`.
pub fn prune_older_than<L: PointLogRepository>(
    logs: &L,
    now_ms: i64,
    horizon: Duration,
) -> RepoResult<usize> {
    let horizon_ms = i64::try_from(horizon.as_millis()).unwrap_or(i64::MAX);
    prune_before(logs, now_ms.saturating_sub(horizon_ms))
}

/// Removes entries older than `months` calendar months.
pub fn prune_older_than_months<L: PointLogRepository>(
    logs: &L,
    now_ms: i64,
    months: u32,
) -> RepoResult<usize> {
    prune_before(logs, month_cutoff_ms(now_ms, months))
}

fn prune_before<L: PointLogRepository>(logs: &L, cutoff_ms: i64) -> RepoResult<usize> {
    let removed = logs.delete_older_than(cutoff_ms)?;
    info!(
        "event=retention_prune module=retention status=ok cutoff_ms={} removed={}",
        cutoff_ms, removed
    );
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::month_cutoff_ms;

    // 2026-03-31T12:00:00Z
    const MARCH_31_NOON_MS: i64 = 1_774_958_400_000;
    // 2026-02-28T12:00:00Z
    const FEB_28_NOON_MS: i64 = 1_772_280_000_000;

    #[test]
    fn month_cutoff_clamps_to_end_of_shorter_month() {
        assert_eq!(month_cutoff_ms(MARCH_31_NOON_MS, 1), FEB_28_NOON_MS);
    }

    #[test]
    fn zero_months_is_now() {
        assert_eq!(month_cutoff_ms(MARCH_31_NOON_MS, 0), MARCH_31_NOON_MS);
    }
}

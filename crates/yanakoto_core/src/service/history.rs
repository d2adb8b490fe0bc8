//! History view grouping.
//!
//! Entries are partitioned by calendar day in a caller-supplied UTC offset.
//! Partitions are ordered by their newest timestamp, descending; entries
//! keep the order they were given in (newest first from the store).

use crate::model::point_log::PointLogEntry;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Log entries sharing one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayGroup {
    pub day: NaiveDate,
    pub entries: Vec<PointLogEntry>,
}

impl DayGroup {
    fn newest_timestamp(&self) -> i64 {
        self.entries
            .iter()
            .map(|entry| entry.timestamp)
            .max()
            .unwrap_or(i64::MIN)
    }
}

/// Groups `entries` by calendar day in `offset`.
pub fn group_by_day(entries: Vec<PointLogEntry>, offset: FixedOffset) -> Vec<DayGroup> {
    let mut index: HashMap<NaiveDate, usize> = HashMap::new();
    let mut groups: Vec<DayGroup> = Vec::new();

    for entry in entries {
        let day = local_day(entry.timestamp, offset);
        match index.get(&day) {
            Some(&position) => groups[position].entries.push(entry),
            None => {
                index.insert(day, groups.len());
                groups.push(DayGroup {
                    day,
                    entries: vec![entry],
                });
            }
        }
    }

    groups.sort_by_key(|group| std::cmp::Reverse(group.newest_timestamp()));
    groups
}

fn local_day(timestamp_ms: i64, offset: FixedOffset) -> NaiveDate {
    DateTime::from_timestamp_millis(timestamp_ms)
        .map(|utc| utc.with_timezone(&offset).date_naive())
        .unwrap_or(NaiveDate::MIN)
}

//! Frequency tables over a store query result.

use std::collections::BTreeMap;

use chrono::{DateTime, Days, FixedOffset, TimeDelta};

use crate::{parse_applied_date, DateRange, StatsResult, StoredJob, DAY_KEY_FORMAT};

/// Applied dates older than this never reach the daily table, whatever the range.
pub const DAILY_COUNT_HORIZON_HOURS: i64 = 30 * 24;

/// Zeroed daily table for the `window_days` calendar days ending on `now`'s date.
pub fn seed_daily_counts(now: DateTime<FixedOffset>, window_days: u32) -> BTreeMap<String, u32> {
    let today = now.date_naive();
    (0..window_days)
        .filter_map(|offset| today.checked_sub_days(Days::new(u64::from(offset))))
        .map(|day| (day.format(DAY_KEY_FORMAT).to_string(), 0))
        .collect()
}

/// Build the four stats tables from whatever the store returned for `range`.
///
/// The daily table is seeded from the host clock independently of the store
/// filter; a record only lands in it when its applied date is within
/// [`DAILY_COUNT_HORIZON_HOURS`] of `now`, keyed by the date in its own offset.
pub fn aggregate(jobs: &[StoredJob], range: DateRange, now: DateTime<FixedOffset>) -> StatsResult {
    let mut stats = StatsResult {
        daily_count: seed_daily_counts(now, range.daily_window_days()),
        ..StatsResult::default()
    };
    let horizon = TimeDelta::hours(DAILY_COUNT_HORIZON_HOURS);

    for job in jobs {
        if let Some(applied) = job.applied_date.as_deref().and_then(parse_applied_date) {
            if now.signed_duration_since(applied) <= horizon {
                let key = applied.format(DAY_KEY_FORMAT).to_string();
                *stats.daily_count.entry(key).or_default() += 1;
            }
        }

        bump(&mut stats.status_count, &job.status);
        bump(&mut stats.company_count, &job.record.company);
        bump(&mut stats.country_count, &job.record.country);
    }

    stats
}

fn bump(table: &mut BTreeMap<String, u32>, key: &str) {
    if !key.is_empty() {
        *table.entry(key.to_string()).or_default() += 1;
    }
}

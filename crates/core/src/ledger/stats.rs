use std::fmt;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone};

use crate::domain::grant::{ChannelId, GrantRecord, UserId};

pub const RECENT_HISTORY_LIMIT: usize = 5;

#[derive(Clone, Debug, PartialEq)]
pub struct RecentGrant {
    pub from: UserId,
    pub channel_id: ChannelId,
    pub reason: String,
    pub ts: f64,
    /// `%B %d` in the viewer's time zone, e.g. `October 03`.
    pub date_label: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StatsView {
    pub user_id: UserId,
    /// `%B %Y` of the request instant.
    pub month_label: String,
    pub received_total: u64,
    pub granted_this_month: u64,
    pub available: u64,
    pub monthly_limit: u32,
    /// Newest first, at most [`RECENT_HISTORY_LIMIT`] entries.
    pub recent_received: Vec<RecentGrant>,
}

/// Personal stats for `user_id` as of `now`.
///
/// The ledger is walked once, newest to oldest. Recent history stops collecting after
/// [`RECENT_HISTORY_LIMIT`] entries while the lifetime and monthly counters keep going over the
/// rest of the walk. Store order is not trusted: the walk is ordered by `ts` descending, with equal
/// timestamps visited latest-inserted first.
pub fn compute_stats<Tz>(
    ledger: &[GrantRecord],
    user_id: &UserId,
    now: &DateTime<Tz>,
    monthly_limit: u32,
) -> StatsView
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let month_start = start_of_month(now);
    let mut received_total = 0_u64;
    let mut granted_this_month = 0_u64;
    let mut recent_received = Vec::with_capacity(RECENT_HISTORY_LIMIT);

    for record in newest_first(ledger) {
        if &record.to == user_id {
            received_total += 1;
            if recent_received.len() < RECENT_HISTORY_LIMIT {
                recent_received.push(RecentGrant {
                    from: record.from.clone(),
                    channel_id: record.channel_id.clone(),
                    reason: record.reason.clone(),
                    ts: record.ts,
                    date_label: day_label(record.ts, &now.timezone()),
                });
            }
        }

        if &record.from == user_id && record.ts >= month_start {
            granted_this_month += 1;
        }
    }

    StatsView {
        user_id: user_id.clone(),
        month_label: now.format("%B %Y").to_string(),
        received_total,
        granted_this_month,
        available: u64::from(monthly_limit).saturating_sub(granted_this_month),
        monthly_limit,
        recent_received,
    }
}

/// Unix seconds of the first instant of `now`'s calendar month in `now`'s time zone.
pub fn start_of_month<Tz: TimeZone>(now: &DateTime<Tz>) -> f64 {
    let Some(midnight) = NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
        .and_then(|first_day| first_day.and_hms_opt(0, 0, 0))
    else {
        return unix_seconds(now);
    };

    // A DST jump can skip local midnight; the month then starts at the first representable hour.
    let timezone = now.timezone();
    (0..3)
        .find_map(|hours| timezone.from_local_datetime(&(midnight + Duration::hours(hours))).earliest())
        .map(|start| unix_seconds(&start))
        .unwrap_or_else(|| midnight.and_utc().timestamp() as f64)
}

pub fn unix_seconds<Tz: TimeZone>(instant: &DateTime<Tz>) -> f64 {
    instant.timestamp() as f64 + f64::from(instant.timestamp_subsec_micros()) / 1_000_000.0
}

fn newest_first(ledger: &[GrantRecord]) -> Vec<&GrantRecord> {
    let mut ordered: Vec<&GrantRecord> = ledger.iter().rev().collect();
    ordered.sort_by(|left, right| right.ts.total_cmp(&left.ts));
    ordered
}

fn day_label<Tz>(ts: f64, timezone: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let seconds = ts.floor() as i64;
    let nanos = ((ts - ts.floor()) * 1_000_000_000.0) as u32;
    DateTime::from_timestamp(seconds, nanos)
        .map(|instant| instant.with_timezone(timezone).format("%B %d").to_string())
        .unwrap_or_default()
}

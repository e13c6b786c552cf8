//! Calendar-day proration of amounts across months.

use bizdiag_model::MonthKey;
use chrono::NaiveDate;

/// Days of `start..=end` falling in each month, in month order.
pub fn overlap_days(start: NaiveDate, end: NaiveDate) -> Vec<(MonthKey, i64)> {
    if end < start {
        return Vec::new();
    }
    let last = MonthKey::from_date(end);
    let mut month = MonthKey::from_date(start);
    let mut overlaps = Vec::new();
    loop {
        let segment_start = start.max(month.first_day());
        let segment_end = end.min(month.last_day());
        overlaps.push((month, (segment_end - segment_start).num_days() + 1));
        let next = month.next();
        if month == last || next == month {
            break;
        }
        month = next;
    }
    overlaps
}

/// Split `total` across the months of `start..=end` in proportion to the
/// calendar days in each month.
///
/// The last month takes the remainder so the shares sum to `total`. Empty
/// when `end` is before `start`.
pub fn prorate_period(start: NaiveDate, end: NaiveDate, total: f64) -> Vec<(MonthKey, f64)> {
    let overlaps = overlap_days(start, end);
    let total_days: i64 = overlaps.iter().map(|(_, days)| days).sum();
    if total_days == 0 {
        return Vec::new();
    }
    let mut shares = Vec::with_capacity(overlaps.len());
    let mut allocated = 0.0;
    let last_idx = overlaps.len() - 1;
    for (idx, (month, days)) in overlaps.into_iter().enumerate() {
        let share = if idx == last_idx {
            total - allocated
        } else {
            total * days as f64 / total_days as f64
        };
        allocated += share;
        shares.push((month, share));
    }
    shares
}

use super::classifier::days_between;
use chrono::{Days, NaiveDate};
use std::collections::BTreeMap;

/// Contiguous, inclusive range of days fetched in one listing run.
pub type DateWindow = (NaiveDate, NaiveDate);

/// Splits `[start, end]` into consecutive windows whose listing totals stay
/// within `max_listings`.
///
/// A window always holds at least one day, so a single day above the budget
/// becomes its own oversized window. Days absent from `day_counts` count as 0.
/// Returns nothing when `start > end`.
pub fn partition_date_range(
    start: NaiveDate,
    end: NaiveDate,
    day_counts: &BTreeMap<NaiveDate, usize>,
    max_listings: usize,
) -> Vec<DateWindow> {
    if start > end {
        return Vec::new();
    }

    let mut windows = Vec::new();
    let mut window_start = start;
    let mut total = 0usize;

    for day in days_between(start, end) {
        let count = day_counts.get(&day).copied().unwrap_or(0);
        if total.saturating_add(count) > max_listings && window_start < day {
            if let Some(previous) = day.checked_sub_days(Days::new(1)) {
                windows.push((window_start, previous));
            }
            window_start = day;
            total = 0;
        }
        total = total.saturating_add(count);
    }

    windows.push((window_start, end));
    windows
}

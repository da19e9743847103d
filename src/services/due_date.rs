//! Due date computation against library opening days

use chrono::{DateTime, Duration, Utc};

use crate::models::LibrarySchedule;

/// Move `due` forward to the first day the library is open.
///
/// Without a schedule the library is always open. When no open day exists
/// within `horizon_days` the date is returned unchanged: a checkout must not
/// fail because of a calendar gap.
pub fn next_open_day(
    schedule: Option<&LibrarySchedule>,
    due: DateTime<Utc>,
    horizon_days: u32,
) -> DateTime<Utc> {
    let Some(schedule) = schedule else {
        return due;
    };

    for offset in 0..=i64::from(horizon_days) {
        let Some(candidate) = due.checked_add_signed(Duration::days(offset)) else {
            break;
        };
        if schedule.is_open(candidate.date_naive()) {
            return candidate;
        }
    }

    tracing::warn!(
        "No open day for library {} within {} days of {}, keeping due date",
        schedule.library_id,
        horizon_days,
        due.date_naive()
    );
    due
}

/// Due date of a new checkout
pub fn checkout_due_date(
    requested: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    duration_days: u32,
    schedule: Option<&LibrarySchedule>,
    horizon_days: u32,
) -> DateTime<Utc> {
    let due = requested.unwrap_or_else(|| add_days(now, duration_days));
    next_open_day(schedule, due, horizon_days)
}

/// Due date after one extension, counted from the later of the current due
/// date and now
pub fn extended_due_date(
    current: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    extension_days: u32,
    schedule: Option<&LibrarySchedule>,
    horizon_days: u32,
) -> DateTime<Utc> {
    let start = current.map_or(now, |due| due.max(now));
    next_open_day(schedule, add_days(start, extension_days), horizon_days)
}

/// `days` later, saturating at the last representable instant
fn add_days(date: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    date.checked_add_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

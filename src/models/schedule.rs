//! Library opening schedule (weekly slots and exceptional closures)

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ScheduleSlot
// ---------------------------------------------------------------------------

/// A weekly opening slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSlot {
    /// Day of week (0=Monday, 6=Sunday)
    pub day_of_week: i16,
    pub open_time: NaiveTime,
    pub close_time: NaiveTime,
}

// ---------------------------------------------------------------------------
// ScheduleClosure
// ---------------------------------------------------------------------------

/// An exceptional closure day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleClosure {
    pub closure_date: NaiveDate,
    pub reason: Option<String>,
}

// ---------------------------------------------------------------------------
// LibrarySchedule
// ---------------------------------------------------------------------------

/// Opening schedule of one library
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibrarySchedule {
    pub library_id: i32,
    pub slots: Vec<ScheduleSlot>,
    pub closures: Vec<ScheduleClosure>,
}

impl LibrarySchedule {
    pub fn new(library_id: i32) -> Self {
        Self {
            library_id,
            ..Default::default()
        }
    }

    /// Add a slot for each given weekday (0=Monday)
    pub fn open_on(mut self, days: &[i16], open_time: NaiveTime, close_time: NaiveTime) -> Self {
        self.slots.extend(days.iter().map(|&day_of_week| ScheduleSlot {
            day_of_week,
            open_time,
            close_time,
        }));
        self
    }

    pub fn closed_on(mut self, date: NaiveDate, reason: Option<&str>) -> Self {
        self.closures.push(ScheduleClosure {
            closure_date: date,
            reason: reason.map(str::to_string),
        });
        self
    }

    /// A day is open when it has a slot and is not an exceptional closure
    pub fn is_open(&self, date: NaiveDate) -> bool {
        let weekday = date.weekday().num_days_from_monday() as i16;
        self.slots.iter().any(|s| s.day_of_week == weekday)
            && !self.closures.iter().any(|c| c.closure_date == date)
    }
}

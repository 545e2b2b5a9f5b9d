//! Date source — the only place the desk asks what day it is.
//!
//! The engine never reads the wall clock itself. Callers pass `today`
//! explicitly; the `Desk` service gets it from a `DateSource` so tests
//! can pin the calendar.

use chrono::{Local, NaiveDate, NaiveDateTime};

pub trait DateSource: Send + Sync {
    fn today(&self) -> NaiveDate;
    fn now(&self) -> NaiveDateTime;
}

/// Local wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl DateSource for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock pinned to one instant. Used by tests and `--today` runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock {
    pub at: NaiveDateTime,
}

impl FixedClock {
    /// Pin to midnight of `date`.
    pub fn on(date: NaiveDate) -> Self {
        Self { at: date.and_time(chrono::NaiveTime::MIN) }
    }
}

impl DateSource for FixedClock {
    fn today(&self) -> NaiveDate {
        self.at.date()
    }

    fn now(&self) -> NaiveDateTime {
        self.at
    }
}

//! Calendar month navigation and the merged event list

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::imported::ImportedEvent;
use super::local_event::LocalEvent;
use crate::{OpCalError, Result};

/// One row of a calendar view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalendarEntry {
    Local(LocalEvent),
    Imported(ImportedEvent),
}

impl CalendarEntry {
    pub fn start(&self) -> DateTime<Utc> {
        match self {
            Self::Local(event) => event.start,
            Self::Imported(event) => event.start,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Local(event) => &event.title,
            Self::Imported(event) => &event.title,
        }
    }
}

/// A calendar month, written `YYYY-M` in query strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthCursor {
    year: i32,
    month: u32,
}

impl MonthCursor {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(OpCalError::InvalidInput(format!("month out of range: {month}")));
        }
        // Reject years chrono cannot represent.
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(OpCalError::InvalidInput(format!("year out of range: {year}")));
        }
        Ok(Self { year, month })
    }

    pub fn containing(instant: DateTime<Utc>) -> Self {
        Self { year: instant.year(), month: instant.month() }
    }

    pub const fn year(self) -> i32 {
        self.year
    }

    pub const fn month(self) -> u32 {
        self.month
    }

    #[must_use]
    pub const fn prev(self) -> Self {
        if self.month == 1 {
            Self { year: self.year - 1, month: 12 }
        } else {
            Self { year: self.year, month: self.month - 1 }
        }
    }

    #[must_use]
    pub const fn next(self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    /// Half-open `[first instant, first instant of next month)` range in UTC.
    pub fn range(self) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        Ok((first_instant(self)?, first_instant(self.next())?))
    }

    pub fn contains(self, instant: DateTime<Utc>) -> bool {
        Self::containing(instant) == self
    }

    /// `month=YYYY-M` query fragment used by calendar navigation links.
    pub fn query(self) -> String {
        format!("month={self}")
    }
}

fn first_instant(cursor: MonthCursor) -> Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(cursor.year, cursor.month, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| OpCalError::InvalidInput(format!("month out of range: {cursor}")))
}

impl fmt::Display for MonthCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.year, self.month)
    }
}

impl FromStr for MonthCursor {
    type Err = OpCalError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || OpCalError::InvalidInput(format!("invalid month: {s}"));
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

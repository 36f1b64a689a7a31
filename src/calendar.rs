//! Day-boundary policies
//!
//! The aggregator never looks at the ambient clock or the system time zone.
//! Callers inject a [`DayCalendar`] that truncates an instant to the calendar
//! day it falls on.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::error::HealthError;

/// Rule for truncating an instant to its containing calendar day
pub trait DayCalendar: Send + Sync {
    /// Calendar day containing `instant`
    fn day_of(&self, instant: DateTime<Utc>) -> NaiveDate;

    /// First instant of `day`
    fn start_of_day(&self, day: NaiveDate) -> DateTime<Utc>;

    /// Human-readable name of the policy (e.g. an IANA zone or "+02:00")
    fn name(&self) -> String;
}

/// Calendar days in an IANA time zone, DST-aware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZonedCalendar {
    tz: Tz,
}

impl ZonedCalendar {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn utc() -> Self {
        Self::new(Tz::UTC)
    }

    /// Parse an IANA zone name such as `"America/New_York"`
    pub fn from_name(name: &str) -> Result<Self, HealthError> {
        name.parse::<Tz>()
            .map(Self::new)
            .map_err(|_| HealthError::InvalidTimezone(name.to_string()))
    }

    /// Like [`from_name`](Self::from_name) but falls back to UTC with a warning
    pub fn from_name_or_utc(name: &str) -> Self {
        Self::from_name(name).unwrap_or_else(|_| {
            warn!(timezone = name, "unrecognised timezone, falling back to UTC");
            Self::utc()
        })
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }
}

impl Default for ZonedCalendar {
    fn default() -> Self {
        Self::utc()
    }
}

impl DayCalendar for ZonedCalendar {
    fn day_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }

    fn start_of_day(&self, day: NaiveDate) -> DateTime<Utc> {
        let midnight = day.and_time(NaiveTime::MIN);
        // Zones that skip midnight on a DST change start the day an hour later
        self.tz
            .from_local_datetime(&midnight)
            .earliest()
            .or_else(|| {
                self.tz
                    .from_local_datetime(&(midnight + Duration::hours(1)))
                    .earliest()
            })
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
    }

    fn name(&self) -> String {
        self.tz.name().to_string()
    }
}

/// Calendar days at a constant UTC offset (no DST)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedOffsetCalendar {
    offset: FixedOffset,
}

impl FixedOffsetCalendar {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Parse an offset of the form `+HH:MM` / `-HH:MM` (or `Z`)
    pub fn parse(offset: &str) -> Result<Self, HealthError> {
        if offset == "Z" || offset == "z" {
            return Ok(Self::new(Utc.fix()));
        }

        offset
            .parse::<FixedOffset>()
            .map(Self::new)
            .map_err(|_| HealthError::InvalidTimezone(offset.to_string()))
    }
}

impl DayCalendar for FixedOffsetCalendar {
    fn day_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    fn start_of_day(&self, day: NaiveDate) -> DateTime<Utc> {
        let midnight = day.and_time(NaiveTime::MIN);
        let offset = Duration::seconds(i64::from(self.offset.local_minus_utc()));
        Utc.from_utc_datetime(&(midnight - offset))
    }

    fn name(&self) -> String {
        self.offset.to_string()
    }
}

// ABOUTME: Recurrence rules for scheduled backups and update checks.
// ABOUTME: Supports every-N-hours, daily, weekly, and monthly at a wall-clock time.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Wall-clock time of day in `HH:MM` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Result<Self, String> {
        if hour > 23 {
            return Err(format!("hour out of range: {hour}"));
        }
        if minute > 59 {
            return Err(format!("minute out of range: {minute}"));
        }
        Ok(Self { hour, minute })
    }

    fn as_naive(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl FromStr for TimeOfDay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hour, minute) = s
            .split_once(':')
            .ok_or_else(|| format!("expected HH:MM, got '{s}'"))?;
        let hour = hour
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("invalid hour in '{s}'"))?;
        let minute = minute
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("invalid minute in '{s}'"))?;
        Self::new(hour, minute)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// How often a scheduled job recurs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "every", rename_all = "lowercase")]
pub enum Cadence {
    /// Every N hours, counted from when the schedule was armed.
    Hours { hours: u32 },
    /// Every day at a fixed time.
    Daily { at: TimeOfDay },
    /// Every week on a weekday at a fixed time.
    Weekly { weekday: Weekday, at: TimeOfDay },
    /// Every month on a day of the month at a fixed time.
    Monthly { day: u32, at: TimeOfDay },
}

impl Cadence {
    /// Nominal period used to decide whether a run was missed while offline.
    /// A month counts as 30 days.
    pub fn period(&self) -> Duration {
        match self {
            Cadence::Hours { hours } => Duration::hours(i64::from(*hours)),
            Cadence::Daily { .. } => Duration::days(1),
            Cadence::Weekly { .. } => Duration::weeks(1),
            Cadence::Monthly { .. } => Duration::days(30),
        }
    }

    /// The first run strictly after `now`.
    ///
    /// Monthly cadences skip months that lack the configured day. Returns
    /// `None` only if no month in the following four years has that day.
    pub fn next_after(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            Cadence::Hours { hours } => Some(now + Duration::hours(i64::from(*hours))),
            Cadence::Daily { at } => {
                let today = now.date().and_time(at.as_naive());
                if today > now {
                    Some(today)
                } else {
                    Some(today + Duration::days(1))
                }
            }
            Cadence::Weekly { weekday, at } => {
                let current = now.weekday().num_days_from_monday();
                let target = weekday.num_days_from_monday();
                let days_ahead = (7 + target - current) % 7;
                let candidate = (now.date() + Duration::days(i64::from(days_ahead)))
                    .and_time(at.as_naive());
                if candidate > now {
                    Some(candidate)
                } else {
                    Some(candidate + Duration::weeks(1))
                }
            }
            Cadence::Monthly { day, at } => {
                let (mut year, mut month) = (now.year(), now.month());
                for _ in 0..48 {
                    if let Some(date) = NaiveDate::from_ymd_opt(year, month, *day) {
                        let candidate = date.and_time(at.as_naive());
                        if candidate > now {
                            return Some(candidate);
                        }
                    }
                    if month == 12 {
                        year += 1;
                        month = 1;
                    } else {
                        month += 1;
                    }
                }
                None
            }
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            Cadence::Hours { hours: 0 } => Err("hours cadence must be at least 1".to_string()),
            Cadence::Monthly { day, .. } if !(1..=31).contains(day) => {
                Err(format!("monthly day out of range: {day}"))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cadence::Hours { hours } => write!(f, "every {hours} hour(s)"),
            Cadence::Daily { at } => write!(f, "daily at {at}"),
            Cadence::Weekly { weekday, at } => write!(f, "every {weekday} at {at}"),
            Cadence::Monthly { day, at } => write!(f, "monthly on day {day} at {at}"),
        }
    }
}

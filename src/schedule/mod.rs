// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/nightwatch

//! Nightly monitoring window

mod gate;

pub use gate::{is_active, FixedClock, ScheduleGate, SystemClock, WallClock};

use std::fmt;
use std::str::FromStr;
use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::SafetyError;

/// Minute-precision wall-clock time, written as `"HH:MM"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    minutes: u16,
}

impl TimeOfDay {
    /// `InvalidSettings` outside 00:00..=23:59
    pub fn new(hour: u8, minute: u8) -> Result<Self, SafetyError> {
        if hour > 23 || minute > 59 {
            return Err(SafetyError::InvalidSettings(format!("time {:02}:{:02} out of range", hour, minute)));
        }
        Ok(Self { minutes: hour as u16 * 60 + minute as u16 })
    }

    /// Hour, 0-23
    pub fn hour(&self) -> u8 {
        (self.minutes / 60) as u8
    }

    /// Minute, 0-59
    pub fn minute(&self) -> u8 {
        (self.minutes % 60) as u8
    }

    /// Truncates seconds
    pub fn from_time<T: Timelike>(time: &T) -> Self {
        Self { minutes: (time.hour() * 60 + time.minute()) as u16 }
    }
}

impl From<NaiveTime> for TimeOfDay {
    fn from(time: NaiveTime) -> Self {
        Self::from_time(&time)
    }
}

impl FromStr for TimeOfDay {
    type Err = SafetyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SafetyError::InvalidSettings(format!("expected HH:MM, got {:?}", s));
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        if m.len() != 2 {
            return Err(invalid());
        }
        let hour: u8 = h.parse().map_err(|_| invalid())?;
        let minute: u8 = m.parse().map_err(|_| invalid())?;
        Self::new(hour, minute)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = SafetyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(time: TimeOfDay) -> Self {
        time.to_string()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

/// Monitoring window; `start >= end` means the window crosses midnight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// When set, the window drives `monitoring_enabled`
    pub enabled: bool,
    /// Inclusive
    pub start: TimeOfDay,
    /// Exclusive
    pub end: TimeOfDay,
}

impl Schedule {
    /// Enabled window
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { enabled: true, start, end }
    }

    /// `start >= end`
    pub fn crosses_midnight(&self) -> bool {
        self.start >= self.end
    }

    /// Whether `now` falls inside `[start, end)`, ignoring `enabled`.
    /// `start == end` covers the whole day.
    pub fn contains(&self, now: TimeOfDay) -> bool {
        if self.start < self.end {
            self.start <= now && now < self.end
        } else {
            now >= self.start || now < self.end
        }
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            enabled: false,
            start: TimeOfDay { minutes: 22 * 60 },
            end: TimeOfDay { minutes: 6 * 60 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(t("22:00").to_string(), "22:00");
        assert_eq!(t("6:05").to_string(), "06:05");
        assert!("24:00".parse::<TimeOfDay>().is_err());
        assert!("12:60".parse::<TimeOfDay>().is_err());
        assert!("1200".parse::<TimeOfDay>().is_err());
        assert!("12:5".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn test_overnight_window() {
        let schedule = Schedule::new(t("22:00"), t("06:00"));
        assert!(schedule.crosses_midnight());
        assert!(schedule.contains(t("23:30")));
        assert!(schedule.contains(t("02:00")));
        assert!(schedule.contains(t("22:00")));
        assert!(!schedule.contains(t("06:00")));
        assert!(!schedule.contains(t("12:00")));
    }

    #[test]
    fn test_daytime_window() {
        let schedule = Schedule::new(t("08:00"), t("18:00"));
        assert!(!schedule.crosses_midnight());
        assert!(schedule.contains(t("10:00")));
        assert!(!schedule.contains(t("20:00")));
        assert!(!schedule.contains(t("18:00")));
    }

    #[test]
    fn test_serde_uses_clock_strings() {
        let schedule = Schedule::default();
        let json = serde_json::to_string(&schedule).unwrap();
        assert_eq!(json, r#"{"enabled":false,"start":"22:00","end":"06:00"}"#);
        let back: Schedule = serde_json::from_str(&json).unwrap();
        assert_eq!(back, schedule);
    }
}

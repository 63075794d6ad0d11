//! Wall-clock arithmetic for the daily timeline.
//!
//! The grid is fixed at one pixel per minute with midnight at pixel 0, so a
//! pixel offset and a minute offset are numerically the same value. Any
//! change to the grid scale has to touch both mapping functions together.

use crate::error::{PlannerError, PlannerResult};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::fmt;
use std::str::FromStr;

pub const MINUTES_PER_HOUR: i64 = 60;
pub const MINUTES_PER_DAY: i64 = 24 * MINUTES_PER_HOUR;
pub const PIXELS_PER_HOUR: i64 = 60;

const NEW_TASK_LEAD_MINUTES: i64 = 30;
const NEW_TASK_LENGTH_MINUTES: i64 = 60;

/// A validated minute offset inside a single day, written as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WallTime(i64);

impl WallTime {
    pub fn from_minutes(minutes: i64) -> PlannerResult<Self> {
        if !(0..MINUTES_PER_DAY).contains(&minutes) {
            return Err(PlannerError::format(minutes.to_string()));
        }
        Ok(Self(minutes))
    }

    pub fn minutes(self) -> i64 {
        self.0
    }
}

impl FromStr for WallTime {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        time_to_minutes(s).map(Self)
    }
}

impl fmt::Display for WallTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}",
            self.0 / MINUTES_PER_HOUR,
            self.0 % MINUTES_PER_HOUR
        )
    }
}

pub fn time_to_minutes(input: &str) -> PlannerResult<i64> {
    let (hours, minutes) = input
        .split_once(':')
        .ok_or_else(|| PlannerError::format(input))?;
    let hours = parse_component(hours).ok_or_else(|| PlannerError::format(input))?;
    let minutes = parse_component(minutes).ok_or_else(|| PlannerError::format(input))?;
    if hours > 23 || minutes > 59 {
        return Err(PlannerError::format(input));
    }
    Ok(hours * MINUTES_PER_HOUR + minutes)
}

fn parse_component(part: &str) -> Option<i64> {
    if part.is_empty() || part.len() > 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

/// Formats a minute offset as `HH:MM`. Offsets outside a single day are
/// rejected; use [`clamp_minutes`] first when clamping is wanted.
pub fn minutes_to_time(minutes: i64) -> PlannerResult<String> {
    WallTime::from_minutes(minutes).map(|time| time.to_string())
}

pub fn clamp_minutes(minutes: i64) -> i64 {
    minutes.clamp(0, MINUTES_PER_DAY - 1)
}

pub fn minutes_to_pixels(minutes: i64) -> i64 {
    minutes
}

pub fn pixels_to_minutes(pixels: i64) -> i64 {
    pixels
}

/// Rounds to the nearest hour boundary; exact halves round up.
pub fn snap_to_hour(pixels: i64) -> i64 {
    pixels
        .saturating_add(PIXELS_PER_HOUR / 2)
        .div_euclid(PIXELS_PER_HOUR)
        .saturating_mul(PIXELS_PER_HOUR)
}

pub fn duration_minutes(start: &str, end: &str) -> PlannerResult<i64> {
    Ok(time_to_minutes(end)? - time_to_minutes(start)?)
}

pub fn hour_label(hour: u32) -> String {
    let period = if hour >= 12 { "PM" } else { "AM" };
    let display = match hour {
        0 => 12,
        h if h > 12 => h - 12,
        h => h,
    };
    format!("{display} {period}")
}

pub fn hour_labels() -> Vec<String> {
    (0..24).map(hour_label).collect()
}

/// Pixel offset of the "now" indicator, shown only while the viewed date is
/// the current day.
pub fn current_time_offset(viewed: NaiveDate, now: NaiveDateTime) -> Option<i64> {
    if now.date() != viewed {
        return None;
    }
    let minutes = i64::from(now.hour()) * MINUTES_PER_HOUR + i64::from(now.minute());
    Some(minutes_to_pixels(minutes))
}

/// Start and end suggested for a new task: half an hour from now, one hour
/// long, kept inside the current day.
pub fn default_draft_times(now: NaiveTime) -> (String, String) {
    let now_minutes = i64::from(now.hour()) * MINUTES_PER_HOUR + i64::from(now.minute());
    let start = (now_minutes + NEW_TASK_LEAD_MINUTES)
        .min(MINUTES_PER_DAY - 1 - NEW_TASK_LENGTH_MINUTES);
    let end = start + NEW_TASK_LENGTH_MINUTES;
    (
        WallTime(clamp_minutes(start)).to_string(),
        WallTime(clamp_minutes(end)).to_string(),
    )
}

pub fn date_heading(viewed: NaiveDate, today: NaiveDate) -> String {
    if viewed == today {
        "Today".to_string()
    } else {
        viewed.format("%B %-d").to_string()
    }
}

pub fn long_date(viewed: NaiveDate) -> String {
    viewed.format("%A, %B %-d, %Y").to_string()
}

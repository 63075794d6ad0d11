use crate::error::{PlannerError, PlannerResult};
use crate::time_math::WallTime;
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn variants() -> &'static [Priority] {
        &[Priority::Low, Priority::Medium, Priority::High]
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!("unknown priority '{other}'")),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A block of time on one calendar day.
///
/// Tasks serialize through [`TaskRecord`], so the JSON form of a `Task` is
/// the import/export record format everywhere it appears.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "TaskRecord", try_from = "TaskRecord")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub start_time: WallTime,
    pub end_time: WallTime,
    pub description: Option<String>,
    pub priority: Priority,
    pub completed: bool,
    pub scheduled_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn duration_minutes(&self) -> i64 {
        self.end_time.minutes() - self.start_time.minutes()
    }

    /// Half-open overlap against `[start, end)`; touching endpoints do not
    /// overlap.
    pub fn overlaps(&self, start: WallTime, end: WallTime) -> bool {
        start < self.end_time && end > self.start_time
    }

    pub fn matches_search(&self, needle_lowercase: &str) -> bool {
        if needle_lowercase.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(needle_lowercase)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(needle_lowercase))
    }
}

/// Fields supplied when creating a task. Times are still raw `HH:MM` strings
/// as they come from a form or a command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
}

impl TaskDraft {
    pub fn new(
        title: impl Into<String>,
        start_time: impl Into<String>,
        end_time: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            start_time: start_time.into(),
            end_time: end_time.into(),
            description: None,
            priority: Priority::default(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// Partial update; `None` leaves a field as it is. An empty description
/// clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

impl TaskPatch {
    pub fn times(start_time: impl Into<String>, end_time: impl Into<String>) -> Self {
        Self {
            start_time: Some(start_time.into()),
            end_time: Some(end_time.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.description.is_none()
            && self.priority.is_none()
    }
}

pub(crate) fn validate_title(title: &str) -> PlannerResult<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(PlannerError::validation("task title cannot be empty"));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn validate_window(start: &str, end: &str) -> PlannerResult<(WallTime, WallTime)> {
    let start: WallTime = start.trim().parse()?;
    let end: WallTime = end.trim().parse()?;
    if start >= end {
        return Err(PlannerError::validation(
            "End time must be after start time",
        ));
    }
    Ok((start, end))
}

pub(crate) fn normalize_description(description: Option<String>) -> Option<String> {
    description.and_then(|d| {
        let trimmed = d.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Wire form of a task as stored and exchanged in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: String,
    pub title: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub priority: Priority,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Task> for TaskRecord {
    fn from(task: Task) -> Self {
        Self {
            id: task.id.0,
            title: task.title,
            start_time: task.start_time.to_string(),
            end_time: task.end_time.to_string(),
            description: task.description,
            priority: task.priority,
            completed: task.completed,
            date: Some(task.scheduled_date.format("%Y-%m-%d").to_string()),
            created_at: task.created_at,
            updated_at: Some(task.updated_at),
            completed_at: task.completed_at,
        }
    }
}

impl TryFrom<TaskRecord> for Task {
    type Error = String;

    fn try_from(record: TaskRecord) -> Result<Self, Self::Error> {
        if record.id.trim().is_empty() {
            return Err("task id cannot be empty".to_string());
        }
        let title = validate_title(&record.title).map_err(|err| err.to_string())?;
        let (start_time, end_time) = validate_window(&record.start_time, &record.end_time)
            .map_err(|err| format!("task {}: {err}", record.id))?;
        let scheduled_date = match record.date.as_deref() {
            Some(raw) => parse_record_date(raw)?,
            None => record.created_at.date_naive(),
        };
        Ok(Self {
            id: TaskId(record.id),
            title,
            start_time,
            end_time,
            description: normalize_description(record.description),
            priority: record.priority,
            completed: record.completed,
            scheduled_date,
            created_at: record.created_at,
            updated_at: record.updated_at.unwrap_or(record.created_at),
            completed_at: if record.completed {
                record.completed_at
            } else {
                None
            },
        })
    }
}

/// Accepts a plain `YYYY-MM-DD` date or a full RFC 3339 timestamp. A
/// timestamp names the local calendar day it falls on.
fn parse_record_date(raw: &str) -> Result<NaiveDate, String> {
    parse_record_date_in(raw, &Local)
}

fn parse_record_date_in<Tz: TimeZone>(raw: &str, zone: &Tz) -> Result<NaiveDate, String> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(zone).date_naive())
        .map_err(|e| format!("invalid date '{raw}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use serde_json::json;

    #[test]
    fn record_without_date_falls_back_to_creation_day() {
        let task: Task = serde_json::from_value(json!({
            "id": "1",
            "title": "Legacy",
            "startTime": "09:00",
            "endTime": "10:00",
            "priority": "low",
            "completed": false,
            "createdAt": "2025-03-04T08:00:00.000Z"
        }))
        .unwrap();
        assert_eq!(task.scheduled_date, NaiveDate::from_ymd_opt(2025, 3, 4).unwrap());
        assert_eq!(task.updated_at, task.created_at);
    }

    #[test]
    fn record_date_accepts_timestamps() {
        let west = FixedOffset::west_opt(5 * 3600).unwrap();
        let east = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(
            parse_record_date_in("2025-06-02T00:00:00.000Z", &west).unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
        );
        assert_eq!(
            parse_record_date_in("2025-03-04T23:30:00+02:00", &east).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 4).unwrap()
        );
        assert_eq!(
            parse_record_date_in("2025-03-04T23:30:00+02:00", &Utc).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 4).unwrap()
        );
        assert_eq!(
            parse_record_date_in("2025-03-04", &west).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 4).unwrap()
        );
        assert!(parse_record_date("tomorrow").is_err());
    }

    #[test]
    fn priority_parses_case_insensitively() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
    }
}

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::TaskError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self { Self(value.to_string()) }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self { Self(value) }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority { Low, #[default] Medium, High }

impl Priority {
    /// Sort weight; higher sorts first.
    pub fn rank(self) -> u8 {
        match self { Priority::Low => 1, Priority::Medium => 2, Priority::High => 3 }
    }

    pub fn as_str(self) -> &'static str {
        match self { Priority::Low => "low", Priority::Medium => "medium", Priority::High => "high" }
    }

    pub fn next(self) -> Self {
        match self { Priority::Low => Priority::Medium, Priority::Medium => Priority::High, Priority::High => Priority::Low }
    }
}

impl FromStr for Priority {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(TaskError::validation(format!("invalid priority: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus { #[default] Pending, Completed }

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self { TaskStatus::Pending => "pending", TaskStatus::Completed => "completed" }
    }

    pub fn toggled(self) -> Self {
        match self { TaskStatus::Pending => TaskStatus::Completed, TaskStatus::Completed => TaskStatus::Pending }
    }
}

impl FromStr for TaskStatus {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(TaskError::validation(format!("invalid status: {other}"))),
        }
    }
}

/// A wall-clock due date in the user's local time, e.g. `2025-01-10T09:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DueDate(NaiveDateTime);

impl DueDate {
    const MINUTES: &'static str = "%Y-%m-%dT%H:%M";
    const SECONDS: &'static str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn new(at: NaiveDateTime) -> Self { Self(at) }

    pub fn parse(raw: &str) -> Result<Self, TaskError> {
        let raw = raw.trim();
        if let Ok(at) = NaiveDateTime::parse_from_str(raw, Self::MINUTES) { return Ok(Self(at)); }
        if let Ok(at) = NaiveDateTime::parse_from_str(raw, Self::SECONDS) { return Ok(Self(at)); }
        // Offset-qualified timestamps are pinned to local wall-clock time.
        DateTime::parse_from_rfc3339(raw)
            .map(|at| Self(at.with_timezone(&Local).naive_local()))
            .map_err(|_| TaskError::validation(format!("invalid due date: {raw}")))
    }

    /// Joins separate `YYYY-MM-DD` and `HH:MM` form inputs.
    pub fn from_parts(date: &str, time: &str) -> Result<Self, TaskError> {
        Self::parse(&format!("{}T{}", date.trim(), time.trim()))
    }

    pub fn naive(&self) -> NaiveDateTime { self.0 }

    pub fn date(&self) -> NaiveDate { self.0.date() }
}

impl fmt::Display for DueDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.second() == 0 && self.0.nanosecond() == 0 {
            write!(f, "{}", self.0.format(Self::MINUTES))
        } else {
            write!(f, "{}", self.0.format(Self::SECONDS))
        }
    }
}

impl Serialize for DueDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DueDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DueDate::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub due_date: DueDate,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(id: TaskId, input: NewTask, now: DateTime<Utc>) -> Self {
        let mut task = Task {
            id,
            title: input.title,
            description: input.description,
            due_date: input.due_date,
            priority: input.priority,
            status: input.status,
            created_at: now,
            completed_at: None,
        };
        task.sync_completion(now);
        task
    }

    /// Merges the present fields of `patch`. `id` and `created_at` never change.
    pub fn apply_patch(&mut self, patch: TaskPatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title { self.title = title; }
        if let Some(description) = patch.description { self.description = description; }
        if let Some(due_date) = patch.due_date { self.due_date = due_date; }
        if let Some(priority) = patch.priority { self.priority = priority; }
        if let Some(status) = patch.status { self.status = status; }
        if let Some(completed_at) = patch.completed_at { self.completed_at = completed_at; }
        self.sync_completion(now);
    }

    /// Keeps `completed_at` present iff the task is completed.
    fn sync_completion(&mut self, now: DateTime<Utc>) {
        match self.status {
            TaskStatus::Completed => { self.completed_at.get_or_insert(now); }
            TaskStatus::Pending => self.completed_at = None,
        }
    }

    pub fn is_pending(&self) -> bool { self.status == TaskStatus::Pending }

    pub fn is_overdue(&self, now: NaiveDateTime) -> bool {
        self.is_pending() && self.due_date.naive() < now
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub due_date: DueDate,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: TaskStatus,
}

impl NewTask {
    pub fn validate(&self) -> Result<(), TaskError> { validate_title(&self.title) }
}

/// Partial update. Nullable fields use `Some(None)` for an explicit `null`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "explicit_null", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DueDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, deserialize_with = "explicit_null", skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Option<DateTime<Utc>>>,
}

impl TaskPatch {
    pub fn validate(&self) -> Result<(), TaskError> {
        match &self.title { Some(title) => validate_title(title), None => Ok(()) }
    }

    /// The status flip sent by the complete/undo action.
    pub fn status_change(status: TaskStatus, now: DateTime<Utc>) -> Self {
        let completed_at = match status { TaskStatus::Completed => Some(now), TaskStatus::Pending => None };
        TaskPatch { status: Some(status), completed_at: Some(completed_at), ..Default::default() }
    }
}

fn validate_title(title: &str) -> Result<(), TaskError> {
    if title.trim().is_empty() { return Err(TaskError::validation("title is required")); }
    Ok(())
}

fn explicit_null<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
    }

    fn sample() -> Task {
        let input = NewTask {
            title: "Pay bills".into(),
            description: None,
            due_date: DueDate::new(at(2025, 1, 10, 9, 0)),
            priority: Priority::High,
            status: TaskStatus::Pending,
        };
        Task::new(TaskId::from("1"), input, Utc::now())
    }

    #[test]
    fn due_date_keeps_minute_precision_form() {
        let due = DueDate::parse("2025-01-10T09:00").unwrap();
        assert_eq!(due.naive(), at(2025, 1, 10, 9, 0));
        assert_eq!(due.to_string(), "2025-01-10T09:00");
        assert_eq!(DueDate::parse("2025-01-10T09:00:30").unwrap().to_string(), "2025-01-10T09:00:30");
        assert_eq!(DueDate::from_parts("2025-01-10", "09:00").unwrap(), due);
    }

    #[test]
    fn due_date_rejects_garbage() {
        assert!(matches!(DueDate::parse("next tuesday"), Err(TaskError::Validation(_))));
        assert!(DueDate::from_parts("2025-01-10", "").is_err());
    }

    #[test]
    fn wire_format_is_camel_case_with_null_completed_at() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["dueDate"], "2025-01-10T09:00");
        assert_eq!(json["priority"], "high");
        assert_eq!(json["status"], "pending");
        assert!(json["completedAt"].is_null());
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn complete_then_undo_clears_completed_at() {
        let mut task = sample();
        task.apply_patch(TaskPatch { status: Some(TaskStatus::Completed), ..Default::default() }, Utc::now());
        assert!(task.completed_at.is_some());
        task.apply_patch(TaskPatch { status: Some(TaskStatus::Pending), ..Default::default() }, Utc::now());
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.completed_at, None);
    }

    #[test]
    fn patch_distinguishes_null_from_missing() {
        let patch: TaskPatch = serde_json::from_str(r#"{"description":null}"#).unwrap();
        assert_eq!(patch.description, Some(None));
        let patch: TaskPatch = serde_json::from_str(r#"{"title":"x","id":"ignored"}"#).unwrap();
        assert_eq!(patch.description, None);
        assert_eq!(patch.title.as_deref(), Some("x"));
    }

    #[test]
    fn patch_cannot_detach_completed_at_from_status() {
        let mut task = sample();
        let stamp = Utc::now();
        task.apply_patch(TaskPatch::status_change(TaskStatus::Completed, stamp), Utc::now());
        assert_eq!(task.completed_at, Some(stamp));
        task.apply_patch(TaskPatch { completed_at: Some(None), ..Default::default() }, stamp);
        assert_eq!(task.completed_at, Some(stamp));
    }

    #[test]
    fn overdue_only_applies_to_pending() {
        let mut task = sample();
        let now = at(2025, 1, 11, 9, 0);
        assert!(task.is_overdue(now));
        task.status = TaskStatus::Completed;
        assert!(!task.is_overdue(now));
    }
}

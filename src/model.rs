//! Planner data model.
//!
//! Tasks, categories and week plans as the backend serves them. Wire
//! encoding is camelCase JSON.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::{Error, Result};

/// Prefix marking ids minted on the client before the backend confirms a create.
pub const TEMP_ID_PREFIX: &str = "tmp-";

/// Task identifier, either server-assigned or a temporary client id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Mint a fresh temporary id for an optimistic create.
    pub fn temporary() -> Self {
        let suffix = Ulid::new().to_string().to_ascii_lowercase();
        Self(format!("{TEMP_ID_PREFIX}{suffix}"))
    }

    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMP_ID_PREFIX)
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
        Self(value.to_string())
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Day of the week within a plan, 1 (Monday) through 7 (Sunday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Day(u8);

impl Day {
    pub const FIRST: Day = Day(1);
    pub const LAST: Day = Day(7);

    pub fn new(value: u8) -> Option<Self> {
        (1..=7).contains(&value).then_some(Self(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Days since the start of the week.
    pub fn offset(self) -> i64 {
        i64::from(self.0) - 1
    }

    pub fn all() -> impl Iterator<Item = Day> {
        (1..=7).map(Day)
    }
}

impl TryFrom<u8> for Day {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Day::new(value).ok_or_else(|| {
            Error::InvalidArgument(format!("day must be between 1 and 7, got {value}"))
        })
    }
}

impl From<Day> for u8 {
    fn from(day: Day) -> Self {
        day.0
    }
}

impl FromStr for Day {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value: u8 = s
            .trim()
            .parse()
            .map_err(|_| Error::InvalidArgument(format!("invalid day '{s}'")))?;
        Day::try_from(value)
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(Error::InvalidArgument(format!(
                "invalid priority '{s}': must be high, medium, or low"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    #[serde(alias = "DONE")]
    Completed,
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" | "done" => Ok(TaskStatus::Completed),
            _ => Err(Error::InvalidArgument(format!(
                "invalid status '{s}': must be todo, in_progress, or completed"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    /// Planned duration in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    pub day: Day,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Category and minutes this task contributes to its category's actual time.
    ///
    /// Archived tasks contribute nothing unless `ignore_archived` is set.
    pub fn tracked_time(&self, ignore_archived: bool) -> Option<(&str, i64)> {
        if self.archived && !ignore_archived {
            return None;
        }
        match (self.category_id.as_deref(), self.duration) {
            (Some(category), Some(minutes)) if minutes > 0 => Some((category, i64::from(minutes))),
            _ => None,
        }
    }
}

/// Body of `POST /tasks?weekId=...`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTask {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    pub day: Day,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub position: i64,
}

impl CreateTask {
    pub fn new(title: impl Into<String>, day: Day, date: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            description: None,
            priority: Priority::default(),
            duration: None,
            status: TaskStatus::default(),
            category_id: None,
            day,
            date,
            position: 0,
        }
    }

    /// Materialize the optimistic cache entry for this create.
    pub fn to_task(&self, id: TaskId, created_at: DateTime<Utc>) -> Task {
        Task {
            id,
            title: self.title.clone(),
            description: self.description.clone(),
            priority: self.priority,
            duration: self.duration,
            status: self.status,
            category_id: self.category_id.clone(),
            day: self.day,
            date: self.date,
            position: self.position,
            archived: false,
            archive_reason: None,
            created_at,
        }
    }
}

/// Body of `PATCH /tasks/{taskId}`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTask {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
}

impl UpdateTask {
    pub fn is_empty(&self) -> bool {
        self == &UpdateTask::default()
    }

    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = Some(description.clone());
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(duration) = self.duration {
            task.duration = Some(duration);
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(category_id) = &self.category_id {
            task.category_id = Some(category_id.clone());
        }
    }
}

/// Body of `PATCH /tasks/{taskId}/move`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveTaskPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week_plan_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<Day>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_archive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub name: String,
    /// Planned time budget in minutes.
    #[serde(default)]
    pub planned_time: i64,
    /// Sum of durations of non-archived tasks in this category.
    #[serde(default)]
    pub actual_time: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategory {
    pub name: String,
    #[serde(default)]
    pub planned_time: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategory {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_time: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekPlan {
    pub id: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month_id: Option<String>,
}

impl WeekPlan {
    /// Calendar date of `day` within this week.
    pub fn date_for(&self, day: Day) -> DateTime<Utc> {
        self.start_date + Duration::days(day.offset())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn day_rejects_out_of_range() {
        assert!(Day::new(0).is_none());
        assert!(Day::new(8).is_none());
        assert_eq!(Day::new(3).map(Day::get), Some(3));
        assert!("9".parse::<Day>().is_err());
        assert_eq!("7".parse::<Day>().expect("day"), Day::LAST);
    }

    #[test]
    fn task_deserializes_from_camel_case() {
        let raw = r#"{
            "id": "t1",
            "title": "Write report",
            "priority": "HIGH",
            "duration": 45,
            "status": "DONE",
            "categoryId": "c1",
            "day": 2,
            "date": "2024-03-05T00:00:00Z",
            "position": 2000,
            "archived": false,
            "createdAt": "2024-03-01T09:00:00Z"
        }"#;
        let task: Task = serde_json::from_str(raw).expect("task");
        assert_eq!(task.id, TaskId::from("t1"));
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.day.get(), 2);
        assert_eq!(task.tracked_time(false), Some(("c1", 45)));
    }

    #[test]
    fn task_with_invalid_day_fails() {
        let raw = r#"{"id":"t1","title":"x","day":0,"date":"2024-03-05T00:00:00Z","createdAt":"2024-03-01T09:00:00Z"}"#;
        assert!(serde_json::from_str::<Task>(raw).is_err());
    }

    #[test]
    fn archived_tasks_track_no_time() {
        let raw = r#"{"id":"t1","title":"x","duration":30,"categoryId":"c1","day":1,"archived":true,"date":"2024-03-05T00:00:00Z","createdAt":"2024-03-01T09:00:00Z"}"#;
        let task: Task = serde_json::from_str(raw).expect("task");
        assert_eq!(task.tracked_time(false), None);
        assert_eq!(task.tracked_time(true), Some(("c1", 30)));
    }

    #[test]
    fn temporary_ids_are_marked() {
        let id = TaskId::temporary();
        assert!(id.is_temporary());
        assert!(!TaskId::from("42").is_temporary());
    }

    #[test]
    fn move_payload_omits_absent_fields() {
        let payload = MoveTaskPayload {
            day: Day::new(3),
            position: Some(1000),
            ..Default::default()
        };
        let value = serde_json::to_value(&payload).expect("json");
        assert_eq!(value, serde_json::json!({ "day": 3, "position": 1000 }));
    }

    #[test]
    fn week_plan_dates_days_from_start() {
        let start = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).single().expect("date");
        let week = WeekPlan {
            id: "w1".to_string(),
            start_date: start,
            end_date: start + Duration::days(6),
            month_id: None,
        };
        let thursday = Day::new(4).expect("day");
        assert_eq!(week.date_for(thursday), start + Duration::days(3));
    }

    #[test]
    fn update_applies_only_present_fields() {
        let created = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).single().expect("date");
        let mut task = CreateTask::new("a", Day::FIRST, created).to_task(TaskId::from("1"), created);
        let changes = UpdateTask {
            status: Some(TaskStatus::InProgress),
            duration: Some(15),
            ..Default::default()
        };
        changes.apply_to(&mut task);
        assert_eq!(task.title, "a");
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.duration, Some(15));
    }
}

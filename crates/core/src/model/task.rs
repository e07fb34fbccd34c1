use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{SubjectId, TaskId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TaskError {
    #[error("Title is required")]
    EmptyTitle,

    #[error("invalid task priority: {0}")]
    InvalidPriority(String),

    #[error("invalid task status: {0}")]
    InvalidStatus(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Urgent => "urgent",
        }
    }
}

impl FromStr for TaskPriority {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            other => Err(TaskError::InvalidPriority(other.to_string())),
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
        }
    }

    /// Pending and in-progress tasks still need work.
    #[must_use]
    pub fn is_open(self) -> bool {
        !matches!(self, TaskStatus::Completed)
    }
}

impl FromStr for TaskStatus {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in-progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(TaskError::InvalidStatus(other.to_string())),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload for creating a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateTask {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<SubjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_pomodoros: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl CreateTask {
    /// Minimal payload with only a title.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            subject_id: None,
            due_date: None,
            priority: None,
            status: None,
            estimated_pomodoros: None,
            tags: None,
        }
    }
}

/// Sparse update for a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateTask {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<SubjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_pomodoros: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_pomodoros: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl UpdateTask {
    /// Update that only changes the status.
    #[must_use]
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

/// A to-do item, optionally linked to a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    id: TaskId,
    user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subject_id: Option<SubjectId>,
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    due_date: Option<DateTime<Utc>>,
    priority: TaskPriority,
    status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    estimated_pomodoros: Option<u32>,
    completed_pomodoros: u32,
    #[serde(default)]
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    completed_at: Option<DateTime<Utc>>,
}

/// Persisted shape of a task, used to rehydrate without re-running creation rules.
#[derive(Debug, Clone)]
pub struct TaskParts {
    pub id: TaskId,
    pub user_id: UserId,
    pub subject_id: Option<SubjectId>,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub estimated_pomodoros: Option<u32>,
    pub completed_pomodoros: u32,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Creates a task. A task created as completed is stamped immediately.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::EmptyTitle` if the title is blank.
    pub fn new(
        id: TaskId,
        user_id: UserId,
        input: CreateTask,
        now: DateTime<Utc>,
    ) -> Result<Self, TaskError> {
        if input.title.trim().is_empty() {
            return Err(TaskError::EmptyTitle);
        }
        let status = input.status.unwrap_or_default();
        Ok(Self {
            id,
            user_id,
            subject_id: input.subject_id,
            title: input.title,
            description: input.description,
            due_date: input.due_date,
            priority: input.priority.unwrap_or_default(),
            status,
            estimated_pomodoros: input.estimated_pomodoros,
            completed_pomodoros: 0,
            tags: input.tags.unwrap_or_default(),
            created_at: now,
            updated_at: now,
            completed_at: (status == TaskStatus::Completed).then_some(now),
        })
    }

    /// Rehydrate a task from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::EmptyTitle` if the stored title is blank.
    pub fn from_persisted(parts: TaskParts) -> Result<Self, TaskError> {
        if parts.title.trim().is_empty() {
            return Err(TaskError::EmptyTitle);
        }
        Ok(Self {
            id: parts.id,
            user_id: parts.user_id,
            subject_id: parts.subject_id,
            title: parts.title,
            description: parts.description,
            due_date: parts.due_date,
            priority: parts.priority,
            status: parts.status,
            estimated_pomodoros: parts.estimated_pomodoros,
            completed_pomodoros: parts.completed_pomodoros,
            tags: parts.tags,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
            completed_at: parts.completed_at,
        })
    }

    /// Apply a sparse update.
    ///
    /// The first transition to `completed` stamps `completed_at`; it is
    /// never cleared afterwards.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::EmptyTitle` if the new title is blank.
    pub fn apply_update(&mut self, update: &UpdateTask, now: DateTime<Utc>) -> Result<(), TaskError> {
        if let Some(title) = &update.title {
            if title.trim().is_empty() {
                return Err(TaskError::EmptyTitle);
            }
            self.title.clone_from(title);
        }
        if update.description.is_some() {
            self.description.clone_from(&update.description);
        }
        if update.subject_id.is_some() {
            self.subject_id = update.subject_id;
        }
        if update.due_date.is_some() {
            self.due_date = update.due_date;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(status) = update.status {
            self.status = status;
            if status == TaskStatus::Completed && self.completed_at.is_none() {
                self.completed_at = Some(now);
            }
        }
        if update.estimated_pomodoros.is_some() {
            self.estimated_pomodoros = update.estimated_pomodoros;
        }
        if let Some(done) = update.completed_pomodoros {
            self.completed_pomodoros = done;
        }
        if let Some(tags) = &update.tags {
            self.tags.clone_from(tags);
        }
        self.updated_at = now;
        Ok(())
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn subject_id(&self) -> Option<SubjectId> {
        self.subject_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn due_date(&self) -> Option<DateTime<Utc>> {
        self.due_date
    }

    #[must_use]
    pub fn priority(&self) -> TaskPriority {
        self.priority
    }

    #[must_use]
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    #[must_use]
    pub fn estimated_pomodoros(&self) -> Option<u32> {
        self.estimated_pomodoros
    }

    #[must_use]
    pub fn completed_pomodoros(&self) -> u32 {
        self.completed_pomodoros
    }

    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn task() -> Task {
        Task::new(
            TaskId::generate(),
            UserId::new("u1").unwrap(),
            CreateTask::titled("Read chapter 3"),
            fixed_now(),
        )
        .unwrap()
    }

    #[test]
    fn defaults_to_pending_medium() {
        let t = task();
        assert_eq!(t.status(), TaskStatus::Pending);
        assert_eq!(t.priority(), TaskPriority::Medium);
        assert_eq!(t.completed_at(), None);
        assert_eq!(t.completed_pomodoros(), 0);
    }

    #[test]
    fn completing_stamps_once() {
        let mut t = task();
        let first = fixed_now() + Duration::hours(1);
        t.apply_update(&UpdateTask::status(TaskStatus::Completed), first).unwrap();
        assert_eq!(t.completed_at(), Some(first));

        t.apply_update(&UpdateTask::status(TaskStatus::Pending), first + Duration::hours(1))
            .unwrap();
        t.apply_update(&UpdateTask::status(TaskStatus::Completed), first + Duration::hours(2))
            .unwrap();
        assert_eq!(t.completed_at(), Some(first));
    }

    #[test]
    fn blank_title_rejected_on_update() {
        let mut t = task();
        let update = UpdateTask {
            title: Some(String::new()),
            ..UpdateTask::default()
        };
        assert_eq!(t.apply_update(&update, fixed_now()), Err(TaskError::EmptyTitle));
        assert_eq!(t.title(), "Read chapter 3");
    }

    #[test]
    fn status_uses_kebab_case_on_the_wire() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
        assert_eq!("in-progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert!("done".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn create_rejects_unknown_priority() {
        let err = serde_json::from_str::<CreateTask>(r#"{"title":"x","priority":"asap"}"#);
        assert!(err.is_err());
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{PomodoroSessionId, SubjectId, TaskId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PomodoroError {
    #[error("duration must be at least 1 second")]
    ZeroDuration,

    #[error("invalid session type: {0}")]
    InvalidKind(String),
}

/// Focus block or rest block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionKind {
    Work,
    Break,
    LongBreak,
}

impl SessionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionKind::Work => "work",
            SessionKind::Break => "break",
            SessionKind::LongBreak => "longBreak",
        }
    }
}

impl FromStr for SessionKind {
    type Err = PomodoroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "work" => Ok(Self::Work),
            "break" => Ok(Self::Break),
            "longBreak" => Ok(Self::LongBreak),
            other => Err(PomodoroError::InvalidKind(other.to_string())),
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreatePomodoroSession {
    #[serde(rename = "type")]
    pub kind: SessionKind,
    /// Length in seconds.
    pub duration: u32,
    pub completed_at: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub was_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<SubjectId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdatePomodoroSession {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<SessionKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub was_completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<SubjectId>,
}

/// A finished (or abandoned) Pomodoro block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroSession {
    id: PomodoroSessionId,
    user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subject_id: Option<SubjectId>,
    #[serde(rename = "type")]
    kind: SessionKind,
    duration: u32,
    completed_at: DateTime<Utc>,
    was_completed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PomodoroSession {
    /// # Errors
    ///
    /// Returns `PomodoroError::ZeroDuration` for a zero-length session.
    pub fn new(
        id: PomodoroSessionId,
        user_id: UserId,
        input: CreatePomodoroSession,
        now: DateTime<Utc>,
    ) -> Result<Self, PomodoroError> {
        if input.duration == 0 {
            return Err(PomodoroError::ZeroDuration);
        }
        Ok(Self {
            id,
            user_id,
            task_id: input.task_id,
            subject_id: input.subject_id,
            kind: input.kind,
            duration: input.duration,
            completed_at: input.completed_at,
            was_completed: input.was_completed,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rehydrate a session from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `PomodoroError::ZeroDuration` for a zero-length session.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: PomodoroSessionId,
        user_id: UserId,
        task_id: Option<TaskId>,
        subject_id: Option<SubjectId>,
        kind: SessionKind,
        duration: u32,
        completed_at: DateTime<Utc>,
        was_completed: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, PomodoroError> {
        if duration == 0 {
            return Err(PomodoroError::ZeroDuration);
        }
        Ok(Self {
            id,
            user_id,
            task_id,
            subject_id,
            kind,
            duration,
            completed_at,
            was_completed,
            created_at,
            updated_at,
        })
    }

    /// # Errors
    ///
    /// Returns `PomodoroError::ZeroDuration` if the new duration is zero.
    pub fn apply_update(
        &mut self,
        update: &UpdatePomodoroSession,
        now: DateTime<Utc>,
    ) -> Result<(), PomodoroError> {
        if update.duration == Some(0) {
            return Err(PomodoroError::ZeroDuration);
        }
        if let Some(kind) = update.kind {
            self.kind = kind;
        }
        if let Some(duration) = update.duration {
            self.duration = duration;
        }
        if let Some(at) = update.completed_at {
            self.completed_at = at;
        }
        if let Some(done) = update.was_completed {
            self.was_completed = done;
        }
        if update.task_id.is_some() {
            self.task_id = update.task_id;
        }
        if update.subject_id.is_some() {
            self.subject_id = update.subject_id;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Completed focus block, the only kind that counts toward statistics.
    #[must_use]
    pub fn is_focus(&self) -> bool {
        self.kind == SessionKind::Work && self.was_completed
    }

    #[must_use]
    pub fn id(&self) -> PomodoroSessionId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn task_id(&self) -> Option<TaskId> {
        self.task_id
    }

    #[must_use]
    pub fn subject_id(&self) -> Option<SubjectId> {
        self.subject_id
    }

    #[must_use]
    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    /// Length in seconds.
    #[must_use]
    pub fn duration(&self) -> u32 {
        self.duration
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn was_completed(&self) -> bool {
        self.was_completed
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn parses_wire_payload_with_type_field() {
        let input: CreatePomodoroSession = serde_json::from_str(
            r#"{"type":"longBreak","duration":900,"completedAt":"2023-11-14T22:13:20Z"}"#,
        )
        .unwrap();
        assert_eq!(input.kind, SessionKind::LongBreak);
        assert!(input.was_completed);
    }

    #[test]
    fn zero_duration_rejected() {
        let input = CreatePomodoroSession {
            kind: SessionKind::Work,
            duration: 0,
            completed_at: fixed_now(),
            was_completed: true,
            task_id: None,
            subject_id: None,
        };
        let err = PomodoroSession::new(
            PomodoroSessionId::generate(),
            UserId::new("u1").unwrap(),
            input,
            fixed_now(),
        );
        assert_eq!(err.unwrap_err(), PomodoroError::ZeroDuration);
    }

    #[test]
    fn only_completed_work_counts_as_focus() {
        let make = |kind, was_completed| {
            PomodoroSession::new(
                PomodoroSessionId::generate(),
                UserId::new("u1").unwrap(),
                CreatePomodoroSession {
                    kind,
                    duration: 1500,
                    completed_at: fixed_now(),
                    was_completed,
                    task_id: None,
                    subject_id: None,
                },
                fixed_now(),
            )
            .unwrap()
        };
        assert!(make(SessionKind::Work, true).is_focus());
        assert!(!make(SessionKind::Work, false).is_focus());
        assert!(!make(SessionKind::Break, true).is_focus());
    }
}

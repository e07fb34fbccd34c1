use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{SubjectId, UserId};
use crate::progress::SubjectProgress;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SubjectError {
    #[error("Name is required")]
    EmptyName,

    #[error("Color is required")]
    EmptyColor,
}

/// Payload for creating a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateSubject {
    pub name: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub professor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
}

/// Sparse update for a subject. Progress counters are not accepted here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateSubject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub professor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
}

/// A course or study area with progress derived from its topics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    id: SubjectId,
    user_id: UserId,
    name: String,
    color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    professor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    schedule: Option<String>,
    #[serde(flatten)]
    progress: SubjectProgress,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn require(value: &str, err: SubjectError) -> Result<(), SubjectError> {
    if value.trim().is_empty() {
        Err(err)
    } else {
        Ok(())
    }
}

impl Subject {
    /// Creates a new subject with no topics.
    ///
    /// # Errors
    ///
    /// Returns `SubjectError` if the name or color is blank.
    pub fn new(
        id: SubjectId,
        user_id: UserId,
        input: CreateSubject,
        now: DateTime<Utc>,
    ) -> Result<Self, SubjectError> {
        require(&input.name, SubjectError::EmptyName)?;
        require(&input.color, SubjectError::EmptyColor)?;

        Ok(Self {
            id,
            user_id,
            name: input.name,
            color: input.color,
            icon: input.icon,
            professor: input.professor,
            schedule: input.schedule,
            progress: SubjectProgress::EMPTY,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rehydrate a subject from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `SubjectError` if the stored name or color is blank.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: SubjectId,
        user_id: UserId,
        name: String,
        color: String,
        icon: Option<String>,
        professor: Option<String>,
        schedule: Option<String>,
        progress: SubjectProgress,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, SubjectError> {
        require(&name, SubjectError::EmptyName)?;
        require(&color, SubjectError::EmptyColor)?;
        Ok(Self {
            id,
            user_id,
            name,
            color,
            icon,
            professor,
            schedule,
            progress,
            created_at,
            updated_at,
        })
    }

    /// Apply a sparse update. Nothing changes if validation fails.
    ///
    /// # Errors
    ///
    /// Returns `SubjectError` if the new name or color is blank.
    pub fn apply_update(
        &mut self,
        update: &UpdateSubject,
        now: DateTime<Utc>,
    ) -> Result<(), SubjectError> {
        if let Some(name) = &update.name {
            require(name, SubjectError::EmptyName)?;
        }
        if let Some(color) = &update.color {
            require(color, SubjectError::EmptyColor)?;
        }

        if let Some(name) = &update.name {
            self.name.clone_from(name);
        }
        if let Some(color) = &update.color {
            self.color.clone_from(color);
        }
        if update.icon.is_some() {
            self.icon.clone_from(&update.icon);
        }
        if update.professor.is_some() {
            self.professor.clone_from(&update.professor);
        }
        if update.schedule.is_some() {
            self.schedule.clone_from(&update.schedule);
        }
        self.updated_at = now;
        Ok(())
    }

    /// Overwrite the derived progress counters.
    pub fn apply_progress(&mut self, progress: SubjectProgress) {
        self.progress = progress;
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> SubjectId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn color(&self) -> &str {
        &self.color
    }

    #[must_use]
    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    #[must_use]
    pub fn professor(&self) -> Option<&str> {
        self.professor.as_deref()
    }

    #[must_use]
    pub fn schedule(&self) -> Option<&str> {
        self.schedule.as_deref()
    }

    #[must_use]
    pub fn progress(&self) -> SubjectProgress {
        self.progress
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

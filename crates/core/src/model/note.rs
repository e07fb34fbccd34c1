use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{NoteId, SubjectId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NoteError {
    #[error("Title is required")]
    EmptyTitle,

    #[error("Content is required")]
    EmptyContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateNote {
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<SubjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateNote {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<SubjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
}

/// Free-form study note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    id: NoteId,
    user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subject_id: Option<SubjectId>,
    title: String,
    content: String,
    #[serde(default)]
    tags: Vec<String>,
    is_favorite: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn check(title: &str, content: &str) -> Result<(), NoteError> {
    if title.trim().is_empty() {
        return Err(NoteError::EmptyTitle);
    }
    if content.trim().is_empty() {
        return Err(NoteError::EmptyContent);
    }
    Ok(())
}

impl Note {
    /// # Errors
    ///
    /// Returns `NoteError` if the title or content is blank.
    pub fn new(
        id: NoteId,
        user_id: UserId,
        input: CreateNote,
        now: DateTime<Utc>,
    ) -> Result<Self, NoteError> {
        check(&input.title, &input.content)?;
        Ok(Self {
            id,
            user_id,
            subject_id: input.subject_id,
            title: input.title,
            content: input.content,
            tags: input.tags.unwrap_or_default(),
            is_favorite: input.is_favorite.unwrap_or(false),
            created_at: now,
            updated_at: now,
        })
    }

    /// Rehydrate a note from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `NoteError` if the stored title or content is blank.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: NoteId,
        user_id: UserId,
        subject_id: Option<SubjectId>,
        title: String,
        content: String,
        tags: Vec<String>,
        is_favorite: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, NoteError> {
        check(&title, &content)?;
        Ok(Self {
            id,
            user_id,
            subject_id,
            title,
            content,
            tags,
            is_favorite,
            created_at,
            updated_at,
        })
    }

    /// Apply a sparse update and bump `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns `NoteError` if the resulting title or content is blank.
    pub fn apply_update(&mut self, update: &UpdateNote, now: DateTime<Utc>) -> Result<(), NoteError> {
        check(
            update.title.as_deref().unwrap_or(&self.title),
            update.content.as_deref().unwrap_or(&self.content),
        )?;
        if let Some(title) = &update.title {
            self.title.clone_from(title);
        }
        if let Some(content) = &update.content {
            self.content.clone_from(content);
        }
        if update.subject_id.is_some() {
            self.subject_id = update.subject_id;
        }
        if let Some(tags) = &update.tags {
            self.tags.clone_from(tags);
        }
        if let Some(fav) = update.is_favorite {
            self.is_favorite = fav;
        }
        self.updated_at = now;
        Ok(())
    }

    #[must_use]
    pub fn id(&self) -> NoteId {
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
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    #[must_use]
    pub fn is_favorite(&self) -> bool {
        self.is_favorite
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
    use chrono::Duration;

    #[test]
    fn content_is_required() {
        let err = Note::new(
            NoteId::generate(),
            UserId::new("u1").unwrap(),
            CreateNote {
                title: "Derivatives".into(),
                content: "  ".into(),
                subject_id: None,
                tags: None,
                is_favorite: None,
            },
            fixed_now(),
        );
        assert_eq!(err.unwrap_err(), NoteError::EmptyContent);
    }

    #[test]
    fn update_bumps_timestamp() {
        let mut note = Note::new(
            NoteId::generate(),
            UserId::new("u1").unwrap(),
            CreateNote {
                title: "Derivatives".into(),
                content: "d/dx x^2 = 2x".into(),
                subject_id: None,
                tags: Some(vec!["calc".into()]),
                is_favorite: None,
            },
            fixed_now(),
        )
        .unwrap();
        let later = fixed_now() + Duration::minutes(3);
        note.apply_update(
            &UpdateNote {
                is_favorite: Some(true),
                ..UpdateNote::default()
            },
            later,
        )
        .unwrap();
        assert!(note.is_favorite());
        assert_eq!(note.updated_at(), later);
        assert_eq!(note.created_at(), fixed_now());
        assert_eq!(note.tags(), ["calc".to_string()]);
    }
}

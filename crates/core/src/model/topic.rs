use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{SubjectId, TopicId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TopicError {
    #[error("Name is required")]
    EmptyName,
}

/// Payload for creating a topic under a subject.
///
/// When `order` is omitted the topic is appended after the subject's
/// current last topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateTopic {
    pub subject_id: SubjectId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<String>>,
}

/// Sparse update for a topic. The owning subject cannot change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateTopic {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<String>>,
}

impl UpdateTopic {
    /// Update that only flips the completion flag.
    #[must_use]
    pub fn completion(is_completed: bool) -> Self {
        Self {
            is_completed: Some(is_completed),
            ..Self::default()
        }
    }
}

/// A completable unit of study belonging to a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    id: TopicId,
    user_id: UserId,
    subject_id: SubjectId,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    is_completed: bool,
    order: u32,
    #[serde(default)]
    resources: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Topic {
    /// Creates a topic at the given position.
    ///
    /// `order` is used only when the input does not carry one.
    ///
    /// # Errors
    ///
    /// Returns `TopicError::EmptyName` if the name is blank.
    pub fn new(
        id: TopicId,
        user_id: UserId,
        input: CreateTopic,
        order: u32,
        now: DateTime<Utc>,
    ) -> Result<Self, TopicError> {
        if input.name.trim().is_empty() {
            return Err(TopicError::EmptyName);
        }
        Ok(Self {
            id,
            user_id,
            subject_id: input.subject_id,
            name: input.name,
            description: input.description,
            is_completed: input.is_completed.unwrap_or(false),
            order: input.order.unwrap_or(order),
            resources: input.resources.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Rehydrate a topic from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `TopicError::EmptyName` if the stored name is blank.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: TopicId,
        user_id: UserId,
        subject_id: SubjectId,
        name: String,
        description: Option<String>,
        is_completed: bool,
        order: u32,
        resources: Vec<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, TopicError> {
        if name.trim().is_empty() {
            return Err(TopicError::EmptyName);
        }
        Ok(Self {
            id,
            user_id,
            subject_id,
            name,
            description,
            is_completed,
            order,
            resources,
            created_at,
            updated_at,
        })
    }

    /// Apply a sparse update. Nothing changes if validation fails.
    ///
    /// # Errors
    ///
    /// Returns `TopicError::EmptyName` if the new name is blank.
    pub fn apply_update(&mut self, update: &UpdateTopic, now: DateTime<Utc>) -> Result<(), TopicError> {
        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(TopicError::EmptyName);
            }
            self.name.clone_from(name);
        }
        if update.description.is_some() {
            self.description.clone_from(&update.description);
        }
        if let Some(done) = update.is_completed {
            self.is_completed = done;
        }
        if let Some(order) = update.order {
            self.order = order;
        }
        if let Some(resources) = &update.resources {
            self.resources.clone_from(resources);
        }
        self.updated_at = now;
        Ok(())
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> TopicId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn subject_id(&self) -> SubjectId {
        self.subject_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    #[must_use]
    pub fn order(&self) -> u32 {
        self.order
    }

    #[must_use]
    pub fn resources(&self) -> &[String] {
        &self.resources
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

/// Position for a topic appended to `existing`: one past the highest order, or 0.
#[must_use]
pub fn next_topic_order<'a>(existing: impl IntoIterator<Item = &'a Topic>) -> u32 {
    existing
        .into_iter()
        .map(Topic::order)
        .max()
        .map_or(0, |max| max.saturating_add(1))
}

/// Display order for topics: `order` ascending, then creation time.
pub fn sort_topics(topics: &mut [Topic]) {
    topics.sort_by(|a, b| {
        a.order
            .cmp(&b.order)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn input(name: &str, order: Option<u32>) -> CreateTopic {
        CreateTopic {
            subject_id: SubjectId::generate(),
            name: name.into(),
            description: None,
            is_completed: None,
            order,
            resources: None,
        }
    }

    fn owner() -> UserId {
        UserId::new("u1").unwrap()
    }

    #[test]
    fn explicit_order_wins_over_assigned() {
        let t = Topic::new(TopicId::generate(), owner(), input("Sets", Some(7)), 2, fixed_now()).unwrap();
        assert_eq!(t.order(), 7);
        let t = Topic::new(TopicId::generate(), owner(), input("Sets", None), 2, fixed_now()).unwrap();
        assert_eq!(t.order(), 2);
        assert!(!t.is_completed());
    }

    #[test]
    fn next_order_appends_after_highest() {
        let a = Topic::new(TopicId::generate(), owner(), input("A", Some(0)), 0, fixed_now()).unwrap();
        let b = Topic::new(TopicId::generate(), owner(), input("B", Some(4)), 0, fixed_now()).unwrap();
        assert_eq!(next_topic_order([&a, &b]), 5);
        assert_eq!(next_topic_order(std::iter::empty()), 0);
    }

    #[test]
    fn sort_uses_order_then_creation_time() {
        let now = fixed_now();
        let late = Topic::new(TopicId::generate(), owner(), input("late", Some(1)), 0, now + Duration::seconds(5)).unwrap();
        let early = Topic::new(TopicId::generate(), owner(), input("early", Some(1)), 0, now).unwrap();
        let first = Topic::new(TopicId::generate(), owner(), input("first", Some(0)), 0, now + Duration::seconds(9)).unwrap();
        let mut topics = vec![late, early, first];
        sort_topics(&mut topics);
        let names: Vec<_> = topics.iter().map(Topic::name).collect();
        assert_eq!(names, ["first", "early", "late"]);
    }

    #[test]
    fn completion_update_toggles_flag_only() {
        let mut t = Topic::new(TopicId::generate(), owner(), input("Sets", None), 3, fixed_now()).unwrap();
        t.apply_update(&UpdateTopic::completion(true), fixed_now()).unwrap();
        assert!(t.is_completed());
        assert_eq!(t.name(), "Sets");
        assert_eq!(t.order(), 3);
    }

    #[test]
    fn create_requires_subject_id() {
        let err = serde_json::from_str::<CreateTopic>(r#"{"name":"Sets"}"#).unwrap_err();
        assert!(err.to_string().contains("subjectId"));
    }
}

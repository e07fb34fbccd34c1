use std::sync::Arc;

use storage::repository::{StorageError, TopicRepository};
use study_core::{TopicChange, TopicRemoval};
use study_core::model::{
    CreateTopic, SubjectId, Topic, TopicId, UpdateTopic, UserId, next_topic_order,
};
use tracing::{debug, info};

use crate::Clock;
use crate::error::TopicServiceError;

/// Topic CRUD. Every write recomputes the parent subject's progress.
#[derive(Clone)]
pub struct TopicService {
    clock: Clock,
    topics: Arc<dyn TopicRepository>,
}

impl TopicService {
    #[must_use]
    pub fn new(clock: Clock, topics: Arc<dyn TopicRepository>) -> Self {
        Self { clock, topics }
    }

    /// List topics by position then creation time.
    ///
    /// # Errors
    ///
    /// Returns `TopicServiceError::Storage` if repository access fails.
    pub async fn list(
        &self,
        owner: &UserId,
        subject: Option<SubjectId>,
    ) -> Result<Vec<Topic>, TopicServiceError> {
        let topics = self.topics.list_topics(owner, subject).await?;
        debug!(user = %owner, ?subject, count = topics.len(), "listed topics");
        Ok(topics)
    }

    /// # Errors
    ///
    /// Returns `TopicServiceError::NotFound` if the topic is not visible to `owner`.
    pub async fn get(&self, owner: &UserId, id: TopicId) -> Result<Topic, TopicServiceError> {
        Ok(self.topics.get_topic(owner, id).await?)
    }

    /// Create a topic under one of the owner's subjects.
    ///
    /// Without an explicit `order` the topic goes after the subject's last one.
    ///
    /// # Errors
    ///
    /// Returns `TopicServiceError::SubjectNotFound` if the subject is not visible to `owner`.
    /// Returns `TopicServiceError::Topic` for validation failures.
    pub async fn create(
        &self,
        owner: &UserId,
        input: CreateTopic,
    ) -> Result<TopicChange, TopicServiceError> {
        let siblings = self
            .topics
            .list_topics(owner, Some(input.subject_id))
            .await?;
        let order = next_topic_order(&siblings);
        let topic = Topic::new(
            TopicId::generate(),
            owner.clone(),
            input,
            order,
            self.clock.now(),
        )?;

        let subject_progress = self
            .topics
            .insert_topic(&topic)
            .await
            .map_err(|e| match e {
                StorageError::NotFound => TopicServiceError::SubjectNotFound,
                other => TopicServiceError::Storage(other),
            })?;
        info!(
            user = %owner,
            topic = %topic.id(),
            subject = %topic.subject_id(),
            percent = subject_progress.percent(),
            "topic created"
        );
        Ok(TopicChange {
            topic,
            subject_progress,
        })
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `TopicServiceError::NotFound` if the topic is not visible to `owner`.
    /// Returns `TopicServiceError::Topic` for validation failures.
    pub async fn update(
        &self,
        owner: &UserId,
        id: TopicId,
        update: &UpdateTopic,
    ) -> Result<TopicChange, TopicServiceError> {
        let mut topic = self.topics.get_topic(owner, id).await?;
        topic.apply_update(update, self.clock.now())?;
        let subject_progress = self.topics.update_topic(&topic).await?;
        info!(
            user = %owner,
            topic = %id,
            completed = topic.is_completed(),
            percent = subject_progress.percent(),
            "topic updated"
        );
        Ok(TopicChange {
            topic,
            subject_progress,
        })
    }

    /// # Errors
    ///
    /// Returns `TopicServiceError::NotFound` if the topic is not visible to `owner`.
    pub async fn delete(
        &self,
        owner: &UserId,
        id: TopicId,
    ) -> Result<TopicRemoval, TopicServiceError> {
        let (subject_id, subject_progress) = self.topics.delete_topic(owner, id).await?;
        info!(
            user = %owner,
            topic = %id,
            subject = %subject_id,
            percent = subject_progress.percent(),
            "topic deleted"
        );
        Ok(TopicRemoval {
            subject_id,
            subject_progress,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::SubjectProgress;
    use storage::repository::{InMemoryRepository, SubjectRepository};
    use study_core::model::{CreateSubject, Subject};
    use study_core::time::{fixed_clock, fixed_now};

    async fn setup() -> (TopicService, InMemoryRepository, UserId, SubjectId) {
        let repo = InMemoryRepository::new();
        let owner = UserId::new("u1").unwrap();
        let subject = Subject::new(
            SubjectId::generate(),
            owner.clone(),
            CreateSubject {
                name: "Algorithms".into(),
                color: "#8b5cf6".into(),
                icon: None,
                professor: None,
                schedule: None,
            },
            fixed_now(),
        )
        .unwrap();
        repo.insert_subject(&subject).await.unwrap();
        let service = TopicService::new(fixed_clock(), Arc::new(repo.clone()));
        (service, repo, owner, subject.id())
    }

    fn input(subject: SubjectId, name: &str, done: bool) -> CreateTopic {
        CreateTopic {
            subject_id: subject,
            name: name.into(),
            description: None,
            is_completed: Some(done),
            order: None,
            resources: None,
        }
    }

    #[tokio::test]
    async fn orders_append_after_last_topic() {
        let (service, _, owner, subject) = setup().await;
        let a = service.create(&owner, input(subject, "Sorting", false)).await.unwrap();
        let b = service.create(&owner, input(subject, "Graphs", false)).await.unwrap();
        assert_eq!(a.topic.order(), 0);
        assert_eq!(b.topic.order(), 1);

        let mut explicit = input(subject, "Heaps", false);
        explicit.order = Some(7);
        service.create(&owner, explicit).await.unwrap();
        let c = service.create(&owner, input(subject, "Tries", false)).await.unwrap();
        assert_eq!(c.topic.order(), 8);
    }

    #[tokio::test]
    async fn progress_follows_every_topic_write() {
        let (service, repo, owner, subject) = setup().await;
        service.create(&owner, input(subject, "a", true)).await.unwrap();
        service.create(&owner, input(subject, "b", true)).await.unwrap();
        let c = service.create(&owner, input(subject, "c", false)).await.unwrap();
        assert_eq!(c.subject_progress.percent(), 67);

        let done = service
            .update(&owner, c.topic.id(), &UpdateTopic::completion(true))
            .await
            .unwrap();
        assert_eq!(done.subject_progress.percent(), 100);

        let removal = service.delete(&owner, c.topic.id()).await.unwrap();
        assert_eq!(removal.subject_id, subject);
        assert_eq!(removal.subject_progress, SubjectProgress::from_counts(2, 2));

        let stored = repo.get_subject(&owner, subject).await.unwrap();
        assert_eq!(stored.progress(), removal.subject_progress);
    }

    #[tokio::test]
    async fn unknown_subject_is_reported() {
        let (service, _, owner, _) = setup().await;
        let err = service
            .create(&owner, input(SubjectId::generate(), "orphan", false))
            .await
            .unwrap_err();
        assert!(matches!(err, TopicServiceError::SubjectNotFound));
    }

    #[test]
    fn change_serializes_with_subject_progress_key() {
        let progress = SubjectProgress::from_counts(3, 2);
        let removal = TopicRemoval {
            subject_id: SubjectId::generate(),
            subject_progress: progress,
        };
        let json = serde_json::to_value(removal).unwrap();
        assert_eq!(json["subjectProgress"]["progress"], 67);
        assert_eq!(json["subjectProgress"]["totalTopics"], 3);
    }
}

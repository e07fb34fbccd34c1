use std::sync::Arc;

use storage::repository::{SubjectRepository, TopicRepository};
use study_core::model::{CreateSubject, Subject, SubjectId, UpdateSubject, UserId};
use tracing::{debug, info};

use crate::Clock;
use crate::error::SubjectServiceError;

/// Orchestrates subject CRUD for one owner at a time.
#[derive(Clone)]
pub struct SubjectService {
    clock: Clock,
    subjects: Arc<dyn SubjectRepository>,
    topics: Arc<dyn TopicRepository>,
}

impl SubjectService {
    #[must_use]
    pub fn new(
        clock: Clock,
        subjects: Arc<dyn SubjectRepository>,
        topics: Arc<dyn TopicRepository>,
    ) -> Self {
        Self {
            clock,
            subjects,
            topics,
        }
    }

    /// List the owner's subjects, newest first.
    ///
    /// # Errors
    ///
    /// Returns `SubjectServiceError::Storage` if repository access fails.
    pub async fn list(&self, owner: &UserId) -> Result<Vec<Subject>, SubjectServiceError> {
        let subjects = self.subjects.list_subjects(owner).await?;
        debug!(user = %owner, count = subjects.len(), "listed subjects");
        Ok(subjects)
    }

    /// # Errors
    ///
    /// Returns `SubjectServiceError::NotFound` if the subject is not visible to `owner`.
    pub async fn get(&self, owner: &UserId, id: SubjectId) -> Result<Subject, SubjectServiceError> {
        Ok(self.subjects.get_subject(owner, id).await?)
    }

    /// Create a subject with empty progress.
    ///
    /// # Errors
    ///
    /// Returns `SubjectServiceError::Subject` for validation failures.
    /// Returns `SubjectServiceError::Storage` if persistence fails.
    pub async fn create(
        &self,
        owner: &UserId,
        input: CreateSubject,
    ) -> Result<Subject, SubjectServiceError> {
        let subject = Subject::new(SubjectId::generate(), owner.clone(), input, self.clock.now())?;
        self.subjects.insert_subject(&subject).await?;
        info!(user = %owner, subject = %subject.id(), "subject created");
        Ok(subject)
    }

    /// Apply a partial update. Progress is never touched here.
    ///
    /// # Errors
    ///
    /// Returns `SubjectServiceError::NotFound` if the subject is not visible to `owner`.
    /// Returns `SubjectServiceError::Subject` for validation failures.
    pub async fn update(
        &self,
        owner: &UserId,
        id: SubjectId,
        update: &UpdateSubject,
    ) -> Result<Subject, SubjectServiceError> {
        let mut subject = self.subjects.get_subject(owner, id).await?;
        subject.apply_update(update, self.clock.now())?;
        self.subjects.update_subject(&subject).await?;
        info!(user = %owner, subject = %id, "subject updated");
        Ok(subject)
    }

    /// Delete a subject and its topics.
    ///
    /// # Errors
    ///
    /// Returns `SubjectServiceError::NotFound` if the subject is not visible to `owner`.
    pub async fn delete(&self, owner: &UserId, id: SubjectId) -> Result<(), SubjectServiceError> {
        self.subjects.delete_subject(owner, id).await?;
        info!(user = %owner, subject = %id, "subject deleted");
        Ok(())
    }

    /// Recount the subject's topics and store the result.
    ///
    /// # Errors
    ///
    /// Returns `SubjectServiceError::NotFound` if the subject is not visible to `owner`.
    pub async fn refresh_progress(
        &self,
        owner: &UserId,
        id: SubjectId,
    ) -> Result<Subject, SubjectServiceError> {
        let subject = self.topics.refresh_subject_progress(owner, id).await?;
        info!(
            user = %owner,
            subject = %id,
            percent = subject.progress().percent(),
            "subject progress refreshed"
        );
        Ok(subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryRepository;
    use study_core::time::fixed_clock;

    fn service() -> SubjectService {
        let repo = InMemoryRepository::new();
        SubjectService::new(fixed_clock(), Arc::new(repo.clone()), Arc::new(repo))
    }

    fn input(name: &str) -> CreateSubject {
        CreateSubject {
            name: name.into(),
            color: "#f59e0b".into(),
            icon: None,
            professor: None,
            schedule: None,
        }
    }

    #[tokio::test]
    async fn create_starts_with_empty_progress() {
        let service = service();
        let owner = UserId::new("u1").unwrap();
        let subject = service.create(&owner, input("Statistics")).await.unwrap();
        assert_eq!(subject.progress().total_topics(), 0);
        assert_eq!(subject.progress().percent(), 0);

        let listed = service.list(&owner).await.unwrap();
        assert_eq!(listed, vec![subject]);
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let service = service();
        let owner = UserId::new("u1").unwrap();
        let err = service.create(&owner, input("  ")).await.unwrap_err();
        assert!(matches!(err, SubjectServiceError::Subject(_)));
    }

    #[tokio::test]
    async fn other_owner_gets_not_found() {
        let service = service();
        let alice = UserId::new("alice").unwrap();
        let bob = UserId::new("bob").unwrap();
        let subject = service.create(&alice, input("Logic")).await.unwrap();

        let err = service
            .update(&bob, subject.id(), &UpdateSubject::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SubjectServiceError::NotFound));
        let err = service.delete(&bob, subject.id()).await.unwrap_err();
        assert!(matches!(err, SubjectServiceError::NotFound));
    }
}

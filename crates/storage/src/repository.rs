use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use study_core::SubjectProgress;
use study_core::model::{
    Note, NoteId, PomodoroSession, PomodoroSessionId, Subject, SubjectId, Task, TaskId, Topic,
    TopicId, UserId, sort_topics,
};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for subjects.
///
/// Every method is scoped to an owner; another user's subject behaves as if
/// it did not exist.
#[async_trait]
pub trait SubjectRepository: Send + Sync {
    /// List the owner's subjects, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the subjects cannot be read.
    async fn list_subjects(&self, owner: &UserId) -> Result<Vec<Subject>, StorageError>;

    /// Fetch one subject.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_subject(&self, owner: &UserId, id: SubjectId) -> Result<Subject, StorageError>;

    /// Persist a new subject.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id is already taken.
    async fn insert_subject(&self, subject: &Subject) -> Result<(), StorageError>;

    /// Overwrite the user-editable fields of an existing subject.
    ///
    /// Progress fields are left untouched; only topic writes move them.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the subject does not exist for its owner.
    async fn update_subject(&self, subject: &Subject) -> Result<(), StorageError>;

    /// Delete a subject together with its topics.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn delete_subject(&self, owner: &UserId, id: SubjectId) -> Result<(), StorageError>;
}

/// Repository contract for topics.
///
/// Each write recomputes the parent subject's progress and stores it in the
/// same atomic unit as the topic change. The recomputed value is returned.
#[async_trait]
pub trait TopicRepository: Send + Sync {
    /// List the owner's topics, optionally narrowed to one subject, ordered by
    /// position then creation time.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the topics cannot be read.
    async fn list_topics(
        &self,
        owner: &UserId,
        subject: Option<SubjectId>,
    ) -> Result<Vec<Topic>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_topic(&self, owner: &UserId, id: TopicId) -> Result<Topic, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the parent subject does not exist
    /// for the topic's owner, `StorageError::Conflict` on a duplicate id.
    async fn insert_topic(&self, topic: &Topic) -> Result<SubjectProgress, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the topic does not exist for its owner.
    async fn update_topic(&self, topic: &Topic) -> Result<SubjectProgress, StorageError>;

    /// Delete a topic and return the parent subject's new progress.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn delete_topic(
        &self,
        owner: &UserId,
        id: TopicId,
    ) -> Result<(SubjectId, SubjectProgress), StorageError>;

    /// Recompute a subject's progress from its topics and store it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the subject does not exist for the owner.
    async fn refresh_subject_progress(
        &self,
        owner: &UserId,
        subject: SubjectId,
    ) -> Result<Subject, StorageError>;
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// List the owner's tasks, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the tasks cannot be read.
    async fn list_tasks(&self, owner: &UserId) -> Result<Vec<Task>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_task(&self, owner: &UserId, id: TaskId) -> Result<Task, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id is already taken.
    async fn insert_task(&self, task: &Task) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the task does not exist for its owner.
    async fn update_task(&self, task: &Task) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn delete_task(&self, owner: &UserId, id: TaskId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// List the owner's notes, most recently edited first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the notes cannot be read.
    async fn list_notes(&self, owner: &UserId) -> Result<Vec<Note>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_note(&self, owner: &UserId, id: NoteId) -> Result<Note, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id is already taken.
    async fn insert_note(&self, note: &Note) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the note does not exist for its owner.
    async fn update_note(&self, note: &Note) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn delete_note(&self, owner: &UserId, id: NoteId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait PomodoroRepository: Send + Sync {
    /// List the owner's sessions by completion time, newest first.
    ///
    /// `None` returns every session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the sessions cannot be read.
    async fn list_sessions(
        &self,
        owner: &UserId,
        limit: Option<u32>,
    ) -> Result<Vec<PomodoroSession>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_session(
        &self,
        owner: &UserId,
        id: PomodoroSessionId,
    ) -> Result<PomodoroSession, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id is already taken.
    async fn insert_session(&self, session: &PomodoroSession) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the session does not exist for its owner.
    async fn update_session(&self, session: &PomodoroSession) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn delete_session(
        &self,
        owner: &UserId,
        id: PomodoroSessionId,
    ) -> Result<(), StorageError>;
}

/// Liveness probe for the backing store.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the store cannot be reached.
    async fn ping(&self) -> Result<(), StorageError>;
}

trait Owned: Clone {
    type Id: PartialEq + Copy;

    fn key(&self) -> Self::Id;
    fn owner(&self) -> &UserId;

    fn is(&self, owner: &UserId, id: Self::Id) -> bool {
        self.key() == id && self.owner() == owner
    }
}

macro_rules! owned {
    ($ty:ty, $id:ty) => {
        impl Owned for $ty {
            type Id = $id;

            fn key(&self) -> $id {
                self.id()
            }

            fn owner(&self) -> &UserId {
                self.user_id()
            }
        }
    };
}

owned!(Subject, SubjectId);
owned!(Topic, TopicId);
owned!(Task, TaskId);
owned!(Note, NoteId);
owned!(PomodoroSession, PomodoroSessionId);

fn find<T: Owned>(rows: &[T], owner: &UserId, id: T::Id) -> Result<T, StorageError> {
    rows.iter()
        .find(|row| row.is(owner, id))
        .cloned()
        .ok_or(StorageError::NotFound)
}

fn push_new<T: Owned>(rows: &mut Vec<T>, item: &T) -> Result<(), StorageError> {
    if rows.iter().any(|row| row.key() == item.key()) {
        return Err(StorageError::Conflict);
    }
    rows.push(item.clone());
    Ok(())
}

fn replace<T: Owned>(rows: &mut [T], item: &T) -> Result<(), StorageError> {
    let slot = rows
        .iter_mut()
        .find(|row| row.is(item.owner(), item.key()))
        .ok_or(StorageError::NotFound)?;
    *slot = item.clone();
    Ok(())
}

fn remove<T: Owned>(rows: &mut Vec<T>, owner: &UserId, id: T::Id) -> Result<T, StorageError> {
    let idx = rows
        .iter()
        .position(|row| row.is(owner, id))
        .ok_or(StorageError::NotFound)?;
    Ok(rows.remove(idx))
}

/// Owner's rows sorted descending by `key`; ties go to the later insert.
fn newest_first<T: Owned>(
    rows: &[T],
    owner: &UserId,
    key: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<T> {
    let mut out: Vec<T> = rows
        .iter()
        .rev()
        .filter(|row| row.owner() == owner)
        .cloned()
        .collect();
    out.sort_by(|a, b| key(b).cmp(&key(a)));
    out
}

#[derive(Default)]
struct Tables {
    subjects: Vec<Subject>,
    topics: Vec<Topic>,
    tasks: Vec<Task>,
    notes: Vec<Note>,
    sessions: Vec<PomodoroSession>,
}

impl Tables {
    fn recompute(
        &mut self,
        owner: &UserId,
        subject_id: SubjectId,
    ) -> Result<SubjectProgress, StorageError> {
        let progress = SubjectProgress::from_topics(
            self.topics
                .iter()
                .filter(|t| t.subject_id() == subject_id && t.user_id() == owner),
        );
        let subject = self
            .subjects
            .iter_mut()
            .find(|s| s.is(owner, subject_id))
            .ok_or(StorageError::NotFound)?;
        subject.apply_progress(progress);
        Ok(progress)
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// All tables share one lock, so a topic write and its progress write-back
/// are observed together.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StorageError> {
        self.tables
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl SubjectRepository for InMemoryRepository {
    async fn list_subjects(&self, owner: &UserId) -> Result<Vec<Subject>, StorageError> {
        let guard = self.lock()?;
        Ok(newest_first(&guard.subjects, owner, Subject::created_at))
    }

    async fn get_subject(&self, owner: &UserId, id: SubjectId) -> Result<Subject, StorageError> {
        let guard = self.lock()?;
        find(&guard.subjects, owner, id)
    }

    async fn insert_subject(&self, subject: &Subject) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        push_new(&mut guard.subjects, subject)
    }

    async fn update_subject(&self, subject: &Subject) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let stored = find(&guard.subjects, subject.user_id(), subject.id())?;
        let mut next = subject.clone();
        next.apply_progress(stored.progress());
        replace(&mut guard.subjects, &next)
    }

    async fn delete_subject(&self, owner: &UserId, id: SubjectId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        remove(&mut guard.subjects, owner, id)?;
        guard
            .topics
            .retain(|t| !(t.subject_id() == id && t.user_id() == owner));
        Ok(())
    }
}

#[async_trait]
impl TopicRepository for InMemoryRepository {
    async fn list_topics(
        &self,
        owner: &UserId,
        subject: Option<SubjectId>,
    ) -> Result<Vec<Topic>, StorageError> {
        let guard = self.lock()?;
        let mut topics: Vec<Topic> = guard
            .topics
            .iter()
            .filter(|t| t.user_id() == owner)
            .filter(|t| subject.is_none_or(|s| t.subject_id() == s))
            .cloned()
            .collect();
        sort_topics(&mut topics);
        Ok(topics)
    }

    async fn get_topic(&self, owner: &UserId, id: TopicId) -> Result<Topic, StorageError> {
        let guard = self.lock()?;
        find(&guard.topics, owner, id)
    }

    async fn insert_topic(&self, topic: &Topic) -> Result<SubjectProgress, StorageError> {
        let mut guard = self.lock()?;
        find(&guard.subjects, topic.user_id(), topic.subject_id())?;
        push_new(&mut guard.topics, topic)?;
        guard.recompute(topic.user_id(), topic.subject_id())
    }

    async fn update_topic(&self, topic: &Topic) -> Result<SubjectProgress, StorageError> {
        let mut guard = self.lock()?;
        let stored = find(&guard.topics, topic.user_id(), topic.id())?;
        if stored.subject_id() != topic.subject_id() {
            return Err(StorageError::Conflict);
        }
        replace(&mut guard.topics, topic)?;
        guard.recompute(topic.user_id(), topic.subject_id())
    }

    async fn delete_topic(
        &self,
        owner: &UserId,
        id: TopicId,
    ) -> Result<(SubjectId, SubjectProgress), StorageError> {
        let mut guard = self.lock()?;
        let removed = remove(&mut guard.topics, owner, id)?;
        let progress = guard.recompute(owner, removed.subject_id())?;
        Ok((removed.subject_id(), progress))
    }

    async fn refresh_subject_progress(
        &self,
        owner: &UserId,
        subject: SubjectId,
    ) -> Result<Subject, StorageError> {
        let mut guard = self.lock()?;
        guard.recompute(owner, subject)?;
        find(&guard.subjects, owner, subject)
    }
}

#[async_trait]
impl TaskRepository for InMemoryRepository {
    async fn list_tasks(&self, owner: &UserId) -> Result<Vec<Task>, StorageError> {
        let guard = self.lock()?;
        Ok(newest_first(&guard.tasks, owner, Task::created_at))
    }

    async fn get_task(&self, owner: &UserId, id: TaskId) -> Result<Task, StorageError> {
        let guard = self.lock()?;
        find(&guard.tasks, owner, id)
    }

    async fn insert_task(&self, task: &Task) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        push_new(&mut guard.tasks, task)
    }

    async fn update_task(&self, task: &Task) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        replace(&mut guard.tasks, task)
    }

    async fn delete_task(&self, owner: &UserId, id: TaskId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        remove(&mut guard.tasks, owner, id).map(drop)
    }
}

#[async_trait]
impl NoteRepository for InMemoryRepository {
    async fn list_notes(&self, owner: &UserId) -> Result<Vec<Note>, StorageError> {
        let guard = self.lock()?;
        Ok(newest_first(&guard.notes, owner, Note::updated_at))
    }

    async fn get_note(&self, owner: &UserId, id: NoteId) -> Result<Note, StorageError> {
        let guard = self.lock()?;
        find(&guard.notes, owner, id)
    }

    async fn insert_note(&self, note: &Note) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        push_new(&mut guard.notes, note)
    }

    async fn update_note(&self, note: &Note) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        replace(&mut guard.notes, note)
    }

    async fn delete_note(&self, owner: &UserId, id: NoteId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        remove(&mut guard.notes, owner, id).map(drop)
    }
}

#[async_trait]
impl PomodoroRepository for InMemoryRepository {
    async fn list_sessions(
        &self,
        owner: &UserId,
        limit: Option<u32>,
    ) -> Result<Vec<PomodoroSession>, StorageError> {
        let guard = self.lock()?;
        let mut sessions = newest_first(&guard.sessions, owner, PomodoroSession::completed_at);
        if let Some(limit) = limit {
            sessions.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(sessions)
    }

    async fn get_session(
        &self,
        owner: &UserId,
        id: PomodoroSessionId,
    ) -> Result<PomodoroSession, StorageError> {
        let guard = self.lock()?;
        find(&guard.sessions, owner, id)
    }

    async fn insert_session(&self, session: &PomodoroSession) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        push_new(&mut guard.sessions, session)
    }

    async fn update_session(&self, session: &PomodoroSession) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        replace(&mut guard.sessions, session)
    }

    async fn delete_session(
        &self,
        owner: &UserId,
        id: PomodoroSessionId,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        remove(&mut guard.sessions, owner, id).map(drop)
    }
}

#[async_trait]
impl HealthCheck for InMemoryRepository {
    async fn ping(&self) -> Result<(), StorageError> {
        self.lock().map(drop)
    }
}

/// Aggregates the per-entity repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub subjects: Arc<dyn SubjectRepository>,
    pub topics: Arc<dyn TopicRepository>,
    pub tasks: Arc<dyn TaskRepository>,
    pub notes: Arc<dyn NoteRepository>,
    pub pomodoro: Arc<dyn PomodoroRepository>,
    pub health: Arc<dyn HealthCheck>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_backend(InMemoryRepository::new())
    }

    /// Wire every repository to the same backend.
    pub(crate) fn from_backend<R>(repo: R) -> Self
    where
        R: SubjectRepository
            + TopicRepository
            + TaskRepository
            + NoteRepository
            + PomodoroRepository
            + HealthCheck
            + Clone
            + 'static,
    {
        Self {
            subjects: Arc::new(repo.clone()),
            topics: Arc::new(repo.clone()),
            tasks: Arc::new(repo.clone()),
            notes: Arc::new(repo.clone()),
            pomodoro: Arc::new(repo.clone()),
            health: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use study_core::model::{CreateSubject, CreateTask, CreateTopic, UpdateTopic};
    use study_core::time::fixed_now;

    fn owner(raw: &str) -> UserId {
        UserId::new(raw).unwrap()
    }

    fn subject(user: &UserId, name: &str) -> Subject {
        Subject::new(
            SubjectId::generate(),
            user.clone(),
            CreateSubject {
                name: name.into(),
                color: "#3b82f6".into(),
                icon: None,
                professor: None,
                schedule: None,
            },
            fixed_now(),
        )
        .unwrap()
    }

    fn topic(user: &UserId, subject: SubjectId, order: u32, done: bool) -> Topic {
        Topic::new(
            TopicId::generate(),
            user.clone(),
            CreateTopic {
                subject_id: subject,
                name: format!("topic {order}"),
                description: None,
                is_completed: Some(done),
                order: None,
                resources: None,
            },
            order,
            fixed_now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn topic_writes_update_subject_progress() {
        let repo = InMemoryRepository::new();
        let user = owner("u1");
        let subj = subject(&user, "Calculus");
        repo.insert_subject(&subj).await.unwrap();

        let done = topic(&user, subj.id(), 0, true);
        let open = topic(&user, subj.id(), 1, false);
        repo.insert_topic(&done).await.unwrap();
        let progress = repo.insert_topic(&open).await.unwrap();
        assert_eq!(progress, SubjectProgress::from_counts(2, 1));
        assert_eq!(progress.percent(), 50);

        let (parent, progress) = repo.delete_topic(&user, done.id()).await.unwrap();
        assert_eq!(parent, subj.id());
        assert_eq!(progress, SubjectProgress::from_counts(1, 0));

        let stored = repo.get_subject(&user, subj.id()).await.unwrap();
        assert_eq!(stored.progress(), progress);

        let mut reopened = open.clone();
        reopened
            .apply_update(&UpdateTopic::completion(true), fixed_now())
            .unwrap();
        let progress = repo.update_topic(&reopened).await.unwrap();
        assert_eq!(progress.percent(), 100);
    }

    #[tokio::test]
    async fn topic_insert_requires_owned_subject() {
        let repo = InMemoryRepository::new();
        let alice = owner("alice");
        let bob = owner("bob");
        let subj = subject(&alice, "Physics");
        repo.insert_subject(&subj).await.unwrap();

        let err = repo
            .insert_topic(&topic(&bob, subj.id(), 0, false))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
        assert!(repo.list_topics(&bob, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_subject_removes_its_topics() {
        let repo = InMemoryRepository::new();
        let user = owner("u1");
        let keep = subject(&user, "Keep");
        let drop_me = subject(&user, "Drop");
        repo.insert_subject(&keep).await.unwrap();
        repo.insert_subject(&drop_me).await.unwrap();
        repo.insert_topic(&topic(&user, keep.id(), 0, false)).await.unwrap();
        repo.insert_topic(&topic(&user, drop_me.id(), 0, true)).await.unwrap();

        repo.delete_subject(&user, drop_me.id()).await.unwrap();

        let left = repo.list_topics(&user, None).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].subject_id(), keep.id());
    }

    #[tokio::test]
    async fn update_subject_keeps_stored_progress() {
        let repo = InMemoryRepository::new();
        let user = owner("u1");
        let subj = subject(&user, "History");
        repo.insert_subject(&subj).await.unwrap();
        repo.insert_topic(&topic(&user, subj.id(), 0, true)).await.unwrap();

        // `subj` still carries the empty progress it was created with.
        repo.update_subject(&subj).await.unwrap();
        let stored = repo.get_subject(&user, subj.id()).await.unwrap();
        assert_eq!(stored.progress().percent(), 100);
    }

    #[tokio::test]
    async fn tasks_are_listed_newest_first_and_scoped_by_owner() {
        let repo = InMemoryRepository::new();
        let user = owner("u1");
        let other = owner("u2");
        let older = Task::new(TaskId::generate(), user.clone(), CreateTask::titled("a"), fixed_now())
            .unwrap();
        let newer = Task::new(
            TaskId::generate(),
            user.clone(),
            CreateTask::titled("b"),
            fixed_now() + Duration::minutes(1),
        )
        .unwrap();
        let tie = Task::new(
            TaskId::generate(),
            user.clone(),
            CreateTask::titled("c"),
            fixed_now(),
        )
        .unwrap();
        let foreign =
            Task::new(TaskId::generate(), other.clone(), CreateTask::titled("x"), fixed_now())
                .unwrap();
        for task in [&older, &newer, &tie, &foreign] {
            repo.insert_task(task).await.unwrap();
        }

        let ids: Vec<TaskId> = repo
            .list_tasks(&user)
            .await
            .unwrap()
            .iter()
            .map(Task::id)
            .collect();
        assert_eq!(ids, vec![newer.id(), tie.id(), older.id()]);

        let err = repo.delete_task(&other, older.id()).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }
}

//! One user's view state: every collection, plus subject progress.
//!
//! Confirmed subjects carry the progress the server returned with the last
//! acknowledged topic write. While topic mutations are still pending, the
//! progress shown is recounted from the topics held locally.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use study_core::model::{
    CreateTopic, Note, PomodoroSession, Subject, SubjectId, Task, TaskId, TaskStatus, Topic,
    TopicId, UpdateTask, UpdateTopic, UserId,
};
use study_core::{Clock, SubjectProgress};
use tracing::debug;

use crate::error::ClientError;
use crate::http::HttpStudyApi;
use crate::optimistic::OptimisticCollection;
use crate::remote::{RemoteCollection, RemoteTopics};

/// Topic transport that keeps the subject progress each acknowledged write
/// came back with, until the workspace folds it into the subject.
struct TopicLink {
    remote: Arc<dyn RemoteTopics>,
    acked: Mutex<HashMap<SubjectId, SubjectProgress>>,
}

impl TopicLink {
    fn acked(&self) -> MutexGuard<'_, HashMap<SubjectId, SubjectProgress>> {
        self.acked.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, subject: SubjectId, progress: SubjectProgress) {
        self.acked().insert(subject, progress);
    }
}

#[async_trait]
impl RemoteCollection<Topic> for TopicLink {
    async fn list(&self) -> Result<Vec<Topic>, ClientError> {
        self.remote.list_topics().await
    }

    async fn create(&self, input: &CreateTopic) -> Result<Topic, ClientError> {
        let change = self.remote.create_topic(input).await?;
        self.record(change.topic.subject_id(), change.subject_progress);
        Ok(change.topic)
    }

    async fn update(&self, id: TopicId, patch: &UpdateTopic) -> Result<Topic, ClientError> {
        let change = self.remote.update_topic(id, patch).await?;
        self.record(change.topic.subject_id(), change.subject_progress);
        Ok(change.topic)
    }

    async fn delete(&self, id: TopicId) -> Result<(), ClientError> {
        let removal = self.remote.delete_topic(id).await?;
        self.record(removal.subject_id, removal.subject_progress);
        Ok(())
    }
}

pub struct StudyWorkspace {
    topic_link: Arc<TopicLink>,
    tasks: OptimisticCollection<Task>,
    subjects: OptimisticCollection<Subject>,
    topics: OptimisticCollection<Topic>,
    notes: OptimisticCollection<Note>,
    sessions: OptimisticCollection<PomodoroSession>,
}

impl StudyWorkspace {
    /// Build a workspace whose collections all talk to `remote`.
    #[must_use]
    pub fn new<R>(remote: Arc<R>, owner: UserId, clock: Clock) -> Self
    where
        R: RemoteCollection<Task>
            + RemoteCollection<Subject>
            + RemoteTopics
            + RemoteCollection<Note>
            + RemoteCollection<PomodoroSession>
            + 'static,
    {
        let tasks: Arc<dyn RemoteCollection<Task>> = remote.clone();
        let subjects: Arc<dyn RemoteCollection<Subject>> = remote.clone();
        let topic_remote: Arc<dyn RemoteTopics> = remote.clone();
        let topic_link = Arc::new(TopicLink {
            remote: topic_remote,
            acked: Mutex::new(HashMap::new()),
        });
        let topics: Arc<dyn RemoteCollection<Topic>> = topic_link.clone();
        let notes: Arc<dyn RemoteCollection<Note>> = remote.clone();
        let sessions: Arc<dyn RemoteCollection<PomodoroSession>> = remote;
        Self {
            topic_link,
            tasks: OptimisticCollection::new(tasks, owner.clone(), clock),
            subjects: OptimisticCollection::new(subjects, owner.clone(), clock),
            topics: OptimisticCollection::new(topics, owner.clone(), clock),
            notes: OptimisticCollection::new(notes, owner.clone(), clock),
            sessions: OptimisticCollection::new(sessions, owner, clock),
        }
    }

    #[must_use]
    pub fn connect(api: HttpStudyApi, owner: UserId) -> Self {
        Self::new(Arc::new(api), owner, Clock::default_clock())
    }

    /// Fetch every collection.
    ///
    /// # Errors
    ///
    /// Returns the first failing request's error.
    pub async fn load(&self) -> Result<(), ClientError> {
        let (tasks, subjects, topics, notes, sessions) = tokio::try_join!(
            self.tasks.load(),
            self.subjects.load(),
            self.topics.load(),
            self.notes.load(),
            self.sessions.load(),
        )?;
        debug!(tasks, subjects, topics, notes, sessions, "workspace loaded");
        Ok(())
    }

    #[must_use]
    pub fn tasks(&self) -> &OptimisticCollection<Task> {
        &self.tasks
    }

    /// Raw subject collection. [`Self::subjects_with_progress`] is what to show.
    #[must_use]
    pub fn subjects(&self) -> &OptimisticCollection<Subject> {
        &self.subjects
    }

    #[must_use]
    pub fn topics(&self) -> &OptimisticCollection<Topic> {
        &self.topics
    }

    #[must_use]
    pub fn notes(&self) -> &OptimisticCollection<Note> {
        &self.notes
    }

    #[must_use]
    pub fn sessions(&self) -> &OptimisticCollection<PomodoroSession> {
        &self.sessions
    }

    /// Progress of `subject` as the user should see it.
    ///
    /// With no topic mutation pending this is the server's figure held on the
    /// subject; otherwise it is recounted over the visible topics.
    #[must_use]
    pub fn subject_progress(&self, subject: SubjectId) -> SubjectProgress {
        let held = self.subjects.get(subject).map(|s| s.progress());
        match held {
            Some(progress) if self.topics.pending() == 0 => progress,
            _ => local_progress(&self.topics.items(), subject),
        }
    }

    /// Subjects with the progress [`Self::subject_progress`] would report.
    #[must_use]
    pub fn subjects_with_progress(&self) -> Vec<Subject> {
        let subjects = self.subjects.items();
        if self.topics.pending() == 0 {
            return subjects;
        }
        let topics = self.topics.items();
        subjects
            .into_iter()
            .map(|mut subject| {
                subject.apply_progress(local_progress(&topics, subject.id()));
                subject
            })
            .collect()
    }

    /// # Errors
    ///
    /// Returns the request's error after rolling back.
    pub async fn add_topic(&self, input: CreateTopic) -> Result<Topic, ClientError> {
        let subject = input.subject_id;
        let result = self.topics.create(input).await;
        self.settle_subject(subject);
        result
    }

    /// Flip a topic between done and not done.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Status` with 404 if the topic is not held
    /// locally, otherwise the request's error after rolling back.
    pub async fn toggle_topic(&self, id: TopicId) -> Result<Topic, ClientError> {
        let topic = self.topics.get(id).ok_or_else(|| ClientError::Status {
            status: 404,
            message: "Topic not found".into(),
        })?;
        let result = self
            .topics
            .update(id, UpdateTopic::completion(!topic.is_completed()))
            .await;
        self.settle_subject(topic.subject_id());
        result
    }

    /// # Errors
    ///
    /// Returns the request's error after rolling back.
    pub async fn remove_topic(&self, id: TopicId) -> Result<(), ClientError> {
        let subject = self.topics.get(id).map(|t| t.subject_id());
        let result = self.topics.delete(id).await;
        if let Some(subject) = subject {
            self.settle_subject(subject);
        }
        result
    }

    /// Delete a subject; its topics go with it on the server, so drop them here too.
    ///
    /// # Errors
    ///
    /// Returns the request's error after rolling back.
    pub async fn remove_subject(&self, id: SubjectId) -> Result<(), ClientError> {
        self.subjects.delete(id).await?;
        self.topics.discard_where(|t| t.subject_id() == id);
        self.topic_link.acked().remove(&id);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the request's error after rolling back.
    pub async fn complete_task(&self, id: TaskId) -> Result<Task, ClientError> {
        self.tasks
            .update(id, UpdateTask::status(TaskStatus::Completed))
            .await
    }

    /// Fold the server's latest progress for `id` into the confirmed subject.
    ///
    /// The acknowledgement stays locked until it is applied, so a newer one
    /// can never be overwritten by an older one.
    fn settle_subject(&self, id: SubjectId) {
        let mut acked = self.topic_link.acked();
        let Some(progress) = acked.remove(&id) else {
            return;
        };
        let confirmed = self.subjects.snapshot().confirmed;
        let Some(mut subject) = confirmed.into_iter().find(|s| s.id() == id) else {
            return;
        };
        subject.apply_progress(progress);
        self.subjects.reconcile(subject);
        debug!(subject = %id, percent = progress.percent(), "subject progress acknowledged");
    }
}

fn local_progress(topics: &[Topic], subject: SubjectId) -> SubjectProgress {
    SubjectProgress::from_topics(topics.iter().filter(|t| t.subject_id() == subject))
}

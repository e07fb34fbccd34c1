//! Per-entity glue between the domain model and the HTTP resources.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use study_core::model::{
    CreateNote, CreatePomodoroSession, CreateSubject, CreateTask, CreateTopic, Note, NoteId,
    PomodoroSession, PomodoroSessionId, Subject, SubjectId, Task, TaskId, Topic, TopicId,
    UpdateNote, UpdatePomodoroSession, UpdateSubject, UpdateTask, UpdateTopic, UserId,
    next_topic_order, sort_topics,
};

/// A record type the client can hold and mutate optimistically.
pub trait Record:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    type Id: Copy + Eq + fmt::Debug + fmt::Display + Send + Sync + 'static;
    type Create: Serialize + Clone + fmt::Debug + Send + Sync + 'static;
    type Patch: Serialize + Clone + fmt::Debug + Send + Sync + 'static;

    /// Collection route, e.g. `/tasks`.
    const PATH: &'static str;
    /// Response key wrapping one record.
    const ONE: &'static str;
    /// Response key wrapping a list.
    const MANY: &'static str;

    fn id(&self) -> Self::Id;

    /// Placeholder id for a record the server has not assigned yet.
    fn temp_id() -> Self::Id;

    /// Local stand-in for a record that is being created.
    ///
    /// # Errors
    ///
    /// Returns the model's validation error if `input` would be rejected.
    fn draft(
        id: Self::Id,
        owner: &UserId,
        input: &Self::Create,
        current: &[Self],
        now: DateTime<Utc>,
    ) -> Result<Self, study_core::Error>;

    /// # Errors
    ///
    /// Returns the model's validation error if `patch` would be rejected.
    fn apply_patch(&mut self, patch: &Self::Patch, now: DateTime<Utc>)
    -> Result<(), study_core::Error>;

    /// Sort into the order the server lists this collection in.
    fn arrange(items: &mut [Self]);
}

impl Record for Task {
    type Id = TaskId;
    type Create = CreateTask;
    type Patch = UpdateTask;

    const PATH: &'static str = "/tasks";
    const ONE: &'static str = "task";
    const MANY: &'static str = "tasks";

    fn id(&self) -> TaskId {
        Task::id(self)
    }

    fn temp_id() -> TaskId {
        TaskId::generate()
    }

    fn draft(
        id: TaskId,
        owner: &UserId,
        input: &CreateTask,
        _current: &[Self],
        now: DateTime<Utc>,
    ) -> Result<Self, study_core::Error> {
        Ok(Task::new(id, owner.clone(), input.clone(), now)?)
    }

    fn apply_patch(&mut self, patch: &UpdateTask, now: DateTime<Utc>) -> Result<(), study_core::Error> {
        Ok(self.apply_update(patch, now)?)
    }

    fn arrange(items: &mut [Self]) {
        items.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    }
}

impl Record for Subject {
    type Id = SubjectId;
    type Create = CreateSubject;
    type Patch = UpdateSubject;

    const PATH: &'static str = "/subjects";
    const ONE: &'static str = "subject";
    const MANY: &'static str = "subjects";

    fn id(&self) -> SubjectId {
        Subject::id(self)
    }

    fn temp_id() -> SubjectId {
        SubjectId::generate()
    }

    fn draft(
        id: SubjectId,
        owner: &UserId,
        input: &CreateSubject,
        _current: &[Self],
        now: DateTime<Utc>,
    ) -> Result<Self, study_core::Error> {
        Ok(Subject::new(id, owner.clone(), input.clone(), now)?)
    }

    fn apply_patch(&mut self, patch: &UpdateSubject, now: DateTime<Utc>) -> Result<(), study_core::Error> {
        Ok(self.apply_update(patch, now)?)
    }

    fn arrange(items: &mut [Self]) {
        items.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    }
}

impl Record for Topic {
    type Id = TopicId;
    type Create = CreateTopic;
    type Patch = UpdateTopic;

    const PATH: &'static str = "/topics";
    const ONE: &'static str = "topic";
    const MANY: &'static str = "topics";

    fn id(&self) -> TopicId {
        Topic::id(self)
    }

    fn temp_id() -> TopicId {
        TopicId::generate()
    }

    fn draft(
        id: TopicId,
        owner: &UserId,
        input: &CreateTopic,
        current: &[Self],
        now: DateTime<Utc>,
    ) -> Result<Self, study_core::Error> {
        let order = next_topic_order(current.iter().filter(|t| t.subject_id() == input.subject_id));
        Ok(Topic::new(id, owner.clone(), input.clone(), order, now)?)
    }

    fn apply_patch(&mut self, patch: &UpdateTopic, now: DateTime<Utc>) -> Result<(), study_core::Error> {
        Ok(self.apply_update(patch, now)?)
    }

    fn arrange(items: &mut [Self]) {
        sort_topics(items);
    }
}

impl Record for Note {
    type Id = NoteId;
    type Create = CreateNote;
    type Patch = UpdateNote;

    const PATH: &'static str = "/notes";
    const ONE: &'static str = "note";
    const MANY: &'static str = "notes";

    fn id(&self) -> NoteId {
        Note::id(self)
    }

    fn temp_id() -> NoteId {
        NoteId::generate()
    }

    fn draft(
        id: NoteId,
        owner: &UserId,
        input: &CreateNote,
        _current: &[Self],
        now: DateTime<Utc>,
    ) -> Result<Self, study_core::Error> {
        Ok(Note::new(id, owner.clone(), input.clone(), now)?)
    }

    fn apply_patch(&mut self, patch: &UpdateNote, now: DateTime<Utc>) -> Result<(), study_core::Error> {
        Ok(self.apply_update(patch, now)?)
    }

    fn arrange(items: &mut [Self]) {
        items.sort_by(|a, b| b.updated_at().cmp(&a.updated_at()));
    }
}

impl Record for PomodoroSession {
    type Id = PomodoroSessionId;
    type Create = CreatePomodoroSession;
    type Patch = UpdatePomodoroSession;

    const PATH: &'static str = "/pomodoro-sessions";
    const ONE: &'static str = "session";
    const MANY: &'static str = "sessions";

    fn id(&self) -> PomodoroSessionId {
        PomodoroSession::id(self)
    }

    fn temp_id() -> PomodoroSessionId {
        PomodoroSessionId::generate()
    }

    fn draft(
        id: PomodoroSessionId,
        owner: &UserId,
        input: &CreatePomodoroSession,
        _current: &[Self],
        now: DateTime<Utc>,
    ) -> Result<Self, study_core::Error> {
        Ok(PomodoroSession::new(id, owner.clone(), input.clone(), now)?)
    }

    fn apply_patch(
        &mut self,
        patch: &UpdatePomodoroSession,
        now: DateTime<Utc>,
    ) -> Result<(), study_core::Error> {
        Ok(self.apply_update(patch, now)?)
    }

    fn arrange(items: &mut [Self]) {
        items.sort_by(|a, b| b.completed_at().cmp(&a.completed_at()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use study_core::time::fixed_now;

    #[test]
    fn topic_drafts_append_within_their_subject() {
        let owner = UserId::new("u1").unwrap();
        let subject = SubjectId::generate();
        let other = SubjectId::generate();
        let input = |subject_id| CreateTopic {
            subject_id,
            name: "Limits".into(),
            description: None,
            is_completed: None,
            order: None,
            resources: None,
        };
        let first = Topic::draft(Topic::temp_id(), &owner, &input(subject), &[], fixed_now()).unwrap();
        let elsewhere =
            Topic::draft(Topic::temp_id(), &owner, &input(other), &[], fixed_now()).unwrap();
        let second = Topic::draft(
            Topic::temp_id(),
            &owner,
            &input(subject),
            &[first.clone(), elsewhere],
            fixed_now(),
        )
        .unwrap();
        assert_eq!(first.order(), 0);
        assert_eq!(second.order(), 1);
    }

    #[test]
    fn tasks_arrange_newest_first() {
        let owner = UserId::new("u1").unwrap();
        let make = |minutes| {
            Task::draft(
                Task::temp_id(),
                &owner,
                &CreateTask::titled("t"),
                &[],
                fixed_now() + Duration::minutes(minutes),
            )
            .unwrap()
        };
        let mut items = vec![make(0), make(5), make(2)];
        Task::arrange(&mut items);
        let stamps: Vec<_> = items.iter().map(Task::created_at).collect();
        assert!(stamps.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn invalid_drafts_are_rejected() {
        let owner = UserId::new("u1").unwrap();
        let err = Task::draft(
            Task::temp_id(),
            &owner,
            &CreateTask::titled(" "),
            &[],
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Title is required");
    }
}

//! Optimistic mutation of a client-held collection.
//!
//! A collection keeps the records the server has acknowledged (`confirmed`)
//! and an ordered queue of mutations that were applied locally but not yet
//! answered (`pending`). What callers see is `confirmed` with every pending
//! mutation replayed on top.
//!
//! Requests for one collection go out one at a time in submission order.
//! When a request fails, only its own mutation leaves the queue and the view
//! is rebuilt, so a failure never undoes a mutation that was submitted later
//! and has already succeeded. With a single mutation in flight this is the
//! same as restoring the snapshot taken before it was applied.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use study_core::Clock;
use study_core::model::UserId;
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::record::Record;
use crate::remote::RemoteCollection;

/// A change to one record of a collection.
#[derive(Debug, Clone)]
pub enum Mutation<T: Record> {
    Create { temp_id: T::Id, input: T::Create },
    Update { id: T::Id, patch: T::Patch },
    Delete { id: T::Id },
}

impl<T: Record> Mutation<T> {
    /// Id of the record this mutation touches.
    #[must_use]
    pub fn target(&self) -> T::Id {
        match self {
            Self::Create { temp_id, .. } => *temp_id,
            Self::Update { id, .. } | Self::Delete { id } => *id,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
        }
    }
}

/// Copy of a collection's state at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub visible: Vec<T>,
    pub confirmed: Vec<T>,
}

struct Pending<T: Record> {
    seq: u64,
    mutation: Mutation<T>,
    draft: Option<T>,
}

struct State<T: Record> {
    confirmed: Vec<T>,
    pending: Vec<Pending<T>>,
    visible: Vec<T>,
}

impl<T: Record> State<T> {
    fn rebuild(&mut self, now: DateTime<Utc>) {
        let mut visible = self.confirmed.clone();
        for pending in &self.pending {
            replay(&mut visible, pending, now);
        }
        T::arrange(&mut visible);
        self.visible = visible;
    }

    fn upsert(&mut self, record: T) {
        let id = record.id();
        match self.confirmed.iter_mut().find(|r| r.id() == id) {
            Some(slot) => *slot = record,
            None => self.confirmed.push(record),
        }
        T::arrange(&mut self.confirmed);
    }

    /// Point queued mutations at the server-assigned id.
    fn remap(&mut self, from: T::Id, to: T::Id) {
        for pending in &mut self.pending {
            match &mut pending.mutation {
                Mutation::Update { id, .. } | Mutation::Delete { id } if *id == from => *id = to,
                _ => {}
            }
        }
    }
}

fn replay<T: Record>(items: &mut Vec<T>, pending: &Pending<T>, now: DateTime<Utc>) {
    match &pending.mutation {
        Mutation::Create { .. } => items.extend(pending.draft.iter().cloned()),
        Mutation::Update { id, patch } => {
            if let Some(item) = items.iter_mut().find(|r| r.id() == *id) {
                let mut patched = item.clone();
                match patched.apply_patch(patch, now) {
                    Ok(()) => *item = patched,
                    Err(e) => debug!(seq = pending.seq, error = %e, "patch no longer applies"),
                }
            }
        }
        Mutation::Delete { id } => items.retain(|r| r.id() != *id),
    }
}

/// A client-held collection with optimistic create, update and delete.
pub struct OptimisticCollection<T: Record> {
    remote: Arc<dyn RemoteCollection<T>>,
    owner: UserId,
    clock: Clock,
    state: Mutex<State<T>>,
    send_gate: tokio::sync::Mutex<()>,
    next_seq: AtomicU64,
}

impl<T: Record> OptimisticCollection<T> {
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteCollection<T>>, owner: UserId, clock: Clock) -> Self {
        Self {
            remote,
            owner,
            clock,
            state: Mutex::new(State {
                confirmed: Vec::new(),
                pending: Vec::new(),
                visible: Vec::new(),
            }),
            send_gate: tokio::sync::Mutex::new(()),
            next_seq: AtomicU64::new(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the confirmed records with the server's list.
    ///
    /// Mutations still in flight stay applied on top.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the list request fails; local state is untouched.
    pub async fn load(&self) -> Result<usize, ClientError> {
        let mut records = self.remote.list().await?;
        T::arrange(&mut records);
        let count = records.len();
        let mut state = self.lock();
        state.confirmed = records;
        state.rebuild(self.clock.now());
        debug!(path = T::PATH, count, "collection loaded");
        Ok(count)
    }

    /// Records as the user should see them, pending mutations included.
    #[must_use]
    pub fn items(&self) -> Vec<T> {
        self.lock().visible.clone()
    }

    #[must_use]
    pub fn get(&self, id: T::Id) -> Option<T> {
        self.lock().visible.iter().find(|r| r.id() == id).cloned()
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot<T> {
        let state = self.lock();
        Snapshot {
            visible: state.visible.clone(),
            confirmed: state.confirmed.clone(),
        }
    }

    /// Number of mutations applied locally and not yet answered.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    /// Fold a record obtained elsewhere into the confirmed state.
    pub fn reconcile(&self, record: T) {
        let mut state = self.lock();
        state.upsert(record);
        state.rebuild(self.clock.now());
    }

    /// Drop confirmed records the server has removed on its own.
    pub fn discard_where(&self, mut predicate: impl FnMut(&T) -> bool) {
        let mut state = self.lock();
        state.confirmed.retain(|r| !predicate(r));
        state.rebuild(self.clock.now());
    }

    /// # Errors
    ///
    /// Returns `ClientError::Invalid` without sending anything if the input
    /// fails local validation, or the request's error after rolling back.
    pub async fn create(&self, input: T::Create) -> Result<T, ClientError> {
        let mutation = Mutation::Create {
            temp_id: T::temp_id(),
            input,
        };
        self.submit(mutation).await?.ok_or_else(missing_record)
    }

    /// # Errors
    ///
    /// Returns `ClientError::Invalid` without sending anything if the patch
    /// fails local validation, or the request's error after rolling back.
    pub async fn update(&self, id: T::Id, patch: T::Patch) -> Result<T, ClientError> {
        self.submit(Mutation::Update { id, patch })
            .await?
            .ok_or_else(missing_record)
    }

    /// # Errors
    ///
    /// Returns the request's error after rolling back.
    pub async fn delete(&self, id: T::Id) -> Result<(), ClientError> {
        self.submit(Mutation::Delete { id }).await.map(drop)
    }

    /// Apply `mutation` locally, send it once every earlier mutation of this
    /// collection has been answered, then keep or drop it.
    ///
    /// Returns the server's record for creates and updates.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Invalid` if the mutation fails local validation,
    /// otherwise the request's error after the mutation has been rolled back.
    pub async fn submit(&self, mutation: Mutation<T>) -> Result<Option<T>, ClientError> {
        let seq = self.stage(mutation)?;
        let mut ticket = Ticket {
            collection: self,
            seq,
            open: true,
        };

        let _turn = self.send_gate.lock().await;
        let Some(mutation) = self.staged(seq) else {
            ticket.open = false;
            return Ok(None);
        };
        let result = self.send(&mutation).await;
        ticket.open = false;
        self.settle(seq, &mutation, result)
    }

    fn stage(&self, mutation: Mutation<T>) -> Result<u64, ClientError> {
        let now = self.clock.now();
        let mut state = self.lock();
        let draft = match &mutation {
            Mutation::Create { temp_id, input } => {
                Some(T::draft(*temp_id, &self.owner, input, &state.visible, now)?)
            }
            Mutation::Update { id, patch } => {
                if let Some(current) = state.visible.iter().find(|r| r.id() == *id) {
                    current.clone().apply_patch(patch, now)?;
                }
                None
            }
            Mutation::Delete { .. } => None,
        };

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        debug!(
            path = T::PATH,
            seq,
            kind = mutation.kind(),
            target = %mutation.target(),
            "applied optimistically"
        );
        state.pending.push(Pending {
            seq,
            mutation,
            draft,
        });
        state.rebuild(now);
        Ok(seq)
    }

    fn staged(&self, seq: u64) -> Option<Mutation<T>> {
        self.lock()
            .pending
            .iter()
            .find(|p| p.seq == seq)
            .map(|p| p.mutation.clone())
    }

    async fn send(&self, mutation: &Mutation<T>) -> Result<Option<T>, ClientError> {
        match mutation {
            Mutation::Create { input, .. } => self.remote.create(input).await.map(Some),
            Mutation::Update { id, patch } => self.remote.update(*id, patch).await.map(Some),
            Mutation::Delete { id } => self.remote.delete(*id).await.map(|()| None),
        }
    }

    fn settle(
        &self,
        seq: u64,
        mutation: &Mutation<T>,
        result: Result<Option<T>, ClientError>,
    ) -> Result<Option<T>, ClientError> {
        let mut state = self.lock();
        state.pending.retain(|p| p.seq != seq);
        match (&result, mutation) {
            (Ok(Some(record)), Mutation::Create { temp_id, .. }) => {
                let canonical = record.id();
                state.remap(*temp_id, canonical);
                state.upsert(record.clone());
                info!(path = T::PATH, seq, temp = %temp_id, id = %canonical, "create confirmed");
            }
            (Ok(Some(record)), Mutation::Update { id, .. }) => {
                state.upsert(record.clone());
                info!(path = T::PATH, seq, id = %id, "update confirmed");
            }
            (Ok(_), Mutation::Delete { id }) => {
                state.confirmed.retain(|r| r.id() != *id);
                info!(path = T::PATH, seq, id = %id, "delete confirmed");
            }
            (Ok(None), _) => {}
            (Err(e), _) => warn!(
                path = T::PATH,
                seq,
                kind = mutation.kind(),
                target = %mutation.target(),
                error = %e,
                "mutation failed, rolled back"
            ),
        }
        state.rebuild(self.clock.now());
        result
    }

    fn abandon(&self, seq: u64) {
        let mut state = self.lock();
        state.pending.retain(|p| p.seq != seq);
        state.rebuild(self.clock.now());
        warn!(path = T::PATH, seq, "mutation dropped before completion, rolled back");
    }
}

/// Rolls a staged mutation back if its future is dropped mid-flight.
struct Ticket<'a, T: Record> {
    collection: &'a OptimisticCollection<T>,
    seq: u64,
    open: bool,
}

impl<T: Record> Drop for Ticket<'_, T> {
    fn drop(&mut self) {
        if self.open {
            self.collection.abandon(self.seq);
        }
    }
}

fn missing_record() -> ClientError {
    ClientError::Decode("server returned no record".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use study_core::model::{CreateTask, Task, TaskId, TaskStatus, UpdateTask};
    use study_core::time::fixed_clock;

    /// In-process stand-in for the server's task collection.
    struct ScriptedTasks {
        owner: UserId,
        clock: Clock,
        records: Mutex<Vec<Task>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedTasks {
        fn new(owner: &UserId) -> Arc<Self> {
            Arc::new(Self {
                owner: owner.clone(),
                clock: fixed_clock(),
                records: Mutex::new(Vec::new()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn seed(&self, title: &str) -> Task {
            let task = Task::new(
                TaskId::generate(),
                self.owner.clone(),
                CreateTask::titled(title),
                self.clock.now(),
            )
            .unwrap();
            self.records.lock().unwrap().push(task.clone());
            task
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn server_state(&self) -> Vec<Task> {
            self.records.lock().unwrap().clone()
        }

        fn offline() -> ClientError {
            ClientError::Status {
                status: 503,
                message: "Service unavailable".into(),
            }
        }
    }

    #[async_trait]
    impl RemoteCollection<Task> for ScriptedTasks {
        async fn list(&self) -> Result<Vec<Task>, ClientError> {
            Ok(self.server_state())
        }

        async fn create(&self, input: &CreateTask) -> Result<Task, ClientError> {
            tokio::task::yield_now().await;
            self.calls.lock().unwrap().push(format!("create {}", input.title));
            if input.title.contains("fail") {
                return Err(Self::offline());
            }
            let task = Task::new(
                TaskId::generate(),
                self.owner.clone(),
                input.clone(),
                self.clock.now(),
            )
            .unwrap();
            self.records.lock().unwrap().push(task.clone());
            Ok(task)
        }

        async fn update(&self, id: TaskId, patch: &UpdateTask) -> Result<Task, ClientError> {
            tokio::task::yield_now().await;
            self.calls.lock().unwrap().push(format!("update {id}"));
            if patch.title.as_deref().is_some_and(|t| t.contains("fail")) {
                return Err(Self::offline());
            }
            let mut records = self.records.lock().unwrap();
            let task = records
                .iter_mut()
                .find(|t| t.id() == id)
                .ok_or(ClientError::Status {
                    status: 404,
                    message: "Task not found".into(),
                })?;
            task.apply_update(patch, self.clock.now()).unwrap();
            Ok(task.clone())
        }

        async fn delete(&self, id: TaskId) -> Result<(), ClientError> {
            tokio::task::yield_now().await;
            self.calls.lock().unwrap().push(format!("delete {id}"));
            let mut records = self.records.lock().unwrap();
            let before = records.len();
            records.retain(|t| t.id() != id);
            if records.len() == before {
                return Err(ClientError::Status {
                    status: 404,
                    message: "Task not found".into(),
                });
            }
            Ok(())
        }
    }

    fn collection(remote: &Arc<ScriptedTasks>) -> OptimisticCollection<Task> {
        let remote: Arc<dyn RemoteCollection<Task>> = remote.clone();
        OptimisticCollection::new(remote, UserId::new("u1").unwrap(), fixed_clock())
    }

    fn renamed(title: &str) -> UpdateTask {
        UpdateTask {
            title: Some(title.into()),
            ..UpdateTask::default()
        }
    }

    #[tokio::test]
    async fn failed_create_restores_the_snapshot() {
        let owner = UserId::new("u1").unwrap();
        let remote = ScriptedTasks::new(&owner);
        remote.seed("Existing");
        let tasks = collection(&remote);
        tasks.load().await.unwrap();
        let before = tasks.snapshot();

        let err = tasks
            .create(CreateTask::titled("will fail"))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(503));
        assert_eq!(tasks.snapshot(), before);
        assert_eq!(tasks.items().len(), 1);
        assert_eq!(tasks.pending(), 0);
    }

    #[tokio::test]
    async fn create_is_visible_before_the_server_answers() {
        let owner = UserId::new("u1").unwrap();
        let remote = ScriptedTasks::new(&owner);
        let tasks = collection(&remote);
        let tasks_ref = &tasks;

        let turn = tasks.send_gate.lock().await;
        let temp_id = TaskId::generate();
        let submit = tasks.submit(Mutation::Create {
            temp_id,
            input: CreateTask::titled("Flashcards"),
        });
        let observe = async move {
            while tasks_ref.pending() == 0 {
                tokio::task::yield_now().await;
            }
            let seen = tasks_ref.get(temp_id).map(|t| t.title().to_owned());
            drop(turn);
            seen
        };
        let (created, seen) = tokio::join!(submit, observe);

        assert_eq!(seen.as_deref(), Some("Flashcards"));
        assert_eq!(remote.calls(), vec!["create Flashcards".to_owned()]);
        let created = created.unwrap().unwrap();
        assert!(tasks.get(temp_id).is_none());
        assert_eq!(tasks.items(), vec![created]);
    }

    #[tokio::test]
    async fn successful_update_keeps_status_and_canonical_id() {
        let owner = UserId::new("u1").unwrap();
        let remote = ScriptedTasks::new(&owner);
        let tasks = collection(&remote);

        let temp_id = TaskId::generate();
        let created = tasks
            .submit(Mutation::Create {
                temp_id,
                input: CreateTask::titled("Essay outline"),
            })
            .await
            .unwrap()
            .unwrap();
        assert_ne!(created.id(), temp_id);
        assert_eq!(tasks.items()[0].id(), created.id());

        let updated = tasks
            .update(created.id(), UpdateTask::status(TaskStatus::Completed))
            .await
            .unwrap();

        assert_eq!(updated.status(), TaskStatus::Completed);
        let items = tasks.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].status(), TaskStatus::Completed);
        assert_eq!(items[0].completed_at(), updated.completed_at());
        assert_eq!(tasks.snapshot().confirmed, remote.server_state());
    }

    #[tokio::test]
    async fn a_failed_mutation_does_not_undo_a_later_success() {
        let owner = UserId::new("u1").unwrap();
        let remote = ScriptedTasks::new(&owner);
        let first = remote.seed("Reading");
        let second = remote.seed("Lab");
        let tasks = collection(&remote);
        tasks.load().await.unwrap();

        let (failed, succeeded) = tokio::join!(
            tasks.update(first.id(), renamed("fail: rename")),
            tasks.update(second.id(), renamed("Lab report")),
        );

        assert!(failed.is_err());
        assert_eq!(succeeded.unwrap().title(), "Lab report");
        assert_eq!(
            remote.calls(),
            vec![format!("update {}", first.id()), format!("update {}", second.id())]
        );
        assert_eq!(tasks.get(first.id()).unwrap().title(), "Reading");
        assert_eq!(tasks.get(second.id()).unwrap().title(), "Lab report");
        assert_eq!(tasks.pending(), 0);
    }

    #[tokio::test]
    async fn queued_mutations_follow_the_canonical_id() {
        let owner = UserId::new("u1").unwrap();
        let remote = ScriptedTasks::new(&owner);
        let tasks = collection(&remote);

        let temp_id = TaskId::generate();
        let (created, updated) = tokio::join!(
            tasks.submit(Mutation::Create {
                temp_id,
                input: CreateTask::titled("Draft"),
            }),
            tasks.submit(Mutation::Update {
                id: temp_id,
                patch: renamed("Final"),
            }),
        );
        let created = created.unwrap().unwrap();
        let updated = updated.unwrap().unwrap();

        assert_eq!(updated.id(), created.id());
        assert_eq!(
            remote.calls(),
            vec!["create Draft".to_owned(), format!("update {}", created.id())]
        );
        assert_eq!(tasks.items(), vec![updated]);
    }

    #[tokio::test]
    async fn failed_delete_brings_the_record_back() {
        let owner = UserId::new("u1").unwrap();
        let remote = ScriptedTasks::new(&owner);
        let tasks = collection(&remote);
        tasks.reconcile(
            Task::new(
                TaskId::generate(),
                owner.clone(),
                CreateTask::titled("Only local"),
                fixed_clock().now(),
            )
            .unwrap(),
        );
        let before = tasks.snapshot();
        let id = before.visible[0].id();

        let err = tasks.delete(id).await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(tasks.snapshot(), before);
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_without_a_request() {
        let owner = UserId::new("u1").unwrap();
        let remote = ScriptedTasks::new(&owner);
        let tasks = collection(&remote);

        let err = tasks.create(CreateTask::titled("  ")).await.unwrap_err();

        assert!(err.is_validation());
        assert!(remote.calls().is_empty());
        assert_eq!(tasks.pending(), 0);
    }
}

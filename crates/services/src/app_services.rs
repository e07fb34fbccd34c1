use std::sync::Arc;

use storage::repository::{HealthCheck, Storage, StorageError};

use crate::Clock;
use crate::dashboard_service::DashboardService;
use crate::error::AppServicesError;
use crate::note_service::NoteService;
use crate::pomodoro_service::PomodoroService;
use crate::subject_service::SubjectService;
use crate::task_service::TaskService;
use crate::topic_service::TopicService;

/// Assembles every service over one `Storage` handle.
#[derive(Clone)]
pub struct AppServices {
    subjects: Arc<SubjectService>,
    topics: Arc<TopicService>,
    tasks: Arc<TaskService>,
    notes: Arc<NoteService>,
    pomodoro: Arc<PomodoroService>,
    dashboard: Arc<DashboardService>,
    health: Arc<dyn HealthCheck>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    /// Build services over a fresh in-memory store.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        Self {
            subjects: Arc::new(SubjectService::new(
                clock,
                Arc::clone(&storage.subjects),
                Arc::clone(&storage.topics),
            )),
            topics: Arc::new(TopicService::new(clock, Arc::clone(&storage.topics))),
            tasks: Arc::new(TaskService::new(clock, Arc::clone(&storage.tasks))),
            notes: Arc::new(NoteService::new(clock, Arc::clone(&storage.notes))),
            pomodoro: Arc::new(PomodoroService::new(clock, Arc::clone(&storage.pomodoro))),
            dashboard: Arc::new(DashboardService::new(
                clock,
                Arc::clone(&storage.tasks),
                Arc::clone(&storage.subjects),
                Arc::clone(&storage.notes),
                Arc::clone(&storage.pomodoro),
            )),
            health: Arc::clone(&storage.health),
        }
    }

    #[must_use]
    pub fn subjects(&self) -> Arc<SubjectService> {
        Arc::clone(&self.subjects)
    }

    #[must_use]
    pub fn topics(&self) -> Arc<TopicService> {
        Arc::clone(&self.topics)
    }

    #[must_use]
    pub fn tasks(&self) -> Arc<TaskService> {
        Arc::clone(&self.tasks)
    }

    #[must_use]
    pub fn notes(&self) -> Arc<NoteService> {
        Arc::clone(&self.notes)
    }

    #[must_use]
    pub fn pomodoro(&self) -> Arc<PomodoroService> {
        Arc::clone(&self.pomodoro)
    }

    #[must_use]
    pub fn dashboard(&self) -> Arc<DashboardService> {
        Arc::clone(&self.dashboard)
    }

    /// Probe the backing store.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the store is unreachable.
    pub async fn check_health(&self) -> Result<(), StorageError> {
        self.health.ping().await
    }
}

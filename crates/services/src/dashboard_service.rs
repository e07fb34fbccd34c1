use std::sync::Arc;

use storage::repository::{NoteRepository, PomodoroRepository, SubjectRepository, TaskRepository};
use study_core::model::UserId;
use study_core::stats::DashboardStats;
use tracing::debug;

use crate::Clock;
use crate::error::DashboardError;

/// Read-only summary across every collection a user owns.
#[derive(Clone)]
pub struct DashboardService {
    clock: Clock,
    tasks: Arc<dyn TaskRepository>,
    subjects: Arc<dyn SubjectRepository>,
    notes: Arc<dyn NoteRepository>,
    sessions: Arc<dyn PomodoroRepository>,
}

impl DashboardService {
    #[must_use]
    pub fn new(
        clock: Clock,
        tasks: Arc<dyn TaskRepository>,
        subjects: Arc<dyn SubjectRepository>,
        notes: Arc<dyn NoteRepository>,
        sessions: Arc<dyn PomodoroRepository>,
    ) -> Self {
        Self {
            clock,
            tasks,
            subjects,
            notes,
            sessions,
        }
    }

    /// # Errors
    ///
    /// Returns `DashboardError::Storage` if any repository read fails.
    pub async fn stats(&self, owner: &UserId) -> Result<DashboardStats, DashboardError> {
        let tasks = self.tasks.list_tasks(owner).await?;
        let subjects = self.subjects.list_subjects(owner).await?;
        let notes = self.notes.list_notes(owner).await?;
        let sessions = self.sessions.list_sessions(owner, None).await?;
        let stats = DashboardStats::compute(&tasks, &subjects, &notes, &sessions, self.clock.now());
        debug!(
            user = %owner,
            pending = stats.pending_tasks,
            subjects = stats.active_subjects,
            "dashboard computed"
        );
        Ok(stats)
    }
}

use std::sync::Arc;

use storage::repository::PomodoroRepository;
use study_core::model::{
    CreatePomodoroSession, PomodoroSession, PomodoroSessionId, UpdatePomodoroSession, UserId,
};
use study_core::stats::PomodoroStats;
use tracing::{debug, info};

use crate::Clock;
use crate::error::PomodoroServiceError;

/// Sessions returned when the caller does not ask for a limit.
pub const DEFAULT_SESSION_LIMIT: u32 = 50;
/// Upper bound on a caller-supplied limit.
pub const MAX_SESSION_LIMIT: u32 = 500;

#[derive(Clone)]
pub struct PomodoroService {
    clock: Clock,
    sessions: Arc<dyn PomodoroRepository>,
}

impl PomodoroService {
    #[must_use]
    pub fn new(clock: Clock, sessions: Arc<dyn PomodoroRepository>) -> Self {
        Self { clock, sessions }
    }

    /// Most recent sessions first.
    ///
    /// `limit` defaults to [`DEFAULT_SESSION_LIMIT`] and is clamped to
    /// `1..=MAX_SESSION_LIMIT`.
    ///
    /// # Errors
    ///
    /// Returns `PomodoroServiceError::Storage` if repository access fails.
    pub async fn list(
        &self,
        owner: &UserId,
        limit: Option<u32>,
    ) -> Result<Vec<PomodoroSession>, PomodoroServiceError> {
        let limit = limit
            .unwrap_or(DEFAULT_SESSION_LIMIT)
            .clamp(1, MAX_SESSION_LIMIT);
        let sessions = self.sessions.list_sessions(owner, Some(limit)).await?;
        debug!(user = %owner, limit, count = sessions.len(), "listed sessions");
        Ok(sessions)
    }

    /// # Errors
    ///
    /// Returns `PomodoroServiceError::NotFound` if the session is not visible to `owner`.
    pub async fn get(
        &self,
        owner: &UserId,
        id: PomodoroSessionId,
    ) -> Result<PomodoroSession, PomodoroServiceError> {
        Ok(self.sessions.get_session(owner, id).await?)
    }

    /// # Errors
    ///
    /// Returns `PomodoroServiceError::Pomodoro` for validation failures.
    pub async fn create(
        &self,
        owner: &UserId,
        input: CreatePomodoroSession,
    ) -> Result<PomodoroSession, PomodoroServiceError> {
        let session = PomodoroSession::new(
            PomodoroSessionId::generate(),
            owner.clone(),
            input,
            self.clock.now(),
        )?;
        self.sessions.insert_session(&session).await?;
        info!(
            user = %owner,
            session = %session.id(),
            kind = %session.kind(),
            seconds = session.duration(),
            "session recorded"
        );
        Ok(session)
    }

    /// # Errors
    ///
    /// Returns `PomodoroServiceError::NotFound` if the session is not visible to `owner`.
    /// Returns `PomodoroServiceError::Pomodoro` for validation failures.
    pub async fn update(
        &self,
        owner: &UserId,
        id: PomodoroSessionId,
        update: &UpdatePomodoroSession,
    ) -> Result<PomodoroSession, PomodoroServiceError> {
        let mut session = self.sessions.get_session(owner, id).await?;
        session.apply_update(update, self.clock.now())?;
        self.sessions.update_session(&session).await?;
        info!(user = %owner, session = %id, "session updated");
        Ok(session)
    }

    /// # Errors
    ///
    /// Returns `PomodoroServiceError::NotFound` if the session is not visible to `owner`.
    pub async fn delete(
        &self,
        owner: &UserId,
        id: PomodoroSessionId,
    ) -> Result<(), PomodoroServiceError> {
        self.sessions.delete_session(owner, id).await?;
        info!(user = %owner, session = %id, "session deleted");
        Ok(())
    }

    /// Focus-time totals over all of the owner's sessions.
    ///
    /// # Errors
    ///
    /// Returns `PomodoroServiceError::Storage` if repository access fails.
    pub async fn stats(&self, owner: &UserId) -> Result<PomodoroStats, PomodoroServiceError> {
        let sessions = self.sessions.list_sessions(owner, None).await?;
        Ok(PomodoroStats::compute(&sessions, self.clock.now()))
    }
}

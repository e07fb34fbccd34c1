use std::sync::Arc;

use storage::repository::NoteRepository;
use study_core::model::{CreateNote, Note, NoteId, UpdateNote, UserId};
use tracing::{debug, info};

use crate::Clock;
use crate::error::NoteServiceError;

#[derive(Clone)]
pub struct NoteService {
    clock: Clock,
    notes: Arc<dyn NoteRepository>,
}

impl NoteService {
    #[must_use]
    pub fn new(clock: Clock, notes: Arc<dyn NoteRepository>) -> Self {
        Self { clock, notes }
    }

    /// List notes, most recently edited first.
    ///
    /// # Errors
    ///
    /// Returns `NoteServiceError::Storage` if repository access fails.
    pub async fn list(&self, owner: &UserId) -> Result<Vec<Note>, NoteServiceError> {
        let notes = self.notes.list_notes(owner).await?;
        debug!(user = %owner, count = notes.len(), "listed notes");
        Ok(notes)
    }

    /// # Errors
    ///
    /// Returns `NoteServiceError::NotFound` if the note is not visible to `owner`.
    pub async fn get(&self, owner: &UserId, id: NoteId) -> Result<Note, NoteServiceError> {
        Ok(self.notes.get_note(owner, id).await?)
    }

    /// # Errors
    ///
    /// Returns `NoteServiceError::Note` for validation failures.
    pub async fn create(&self, owner: &UserId, input: CreateNote) -> Result<Note, NoteServiceError> {
        let note = Note::new(NoteId::generate(), owner.clone(), input, self.clock.now())?;
        self.notes.insert_note(&note).await?;
        info!(user = %owner, note = %note.id(), "note created");
        Ok(note)
    }

    /// # Errors
    ///
    /// Returns `NoteServiceError::NotFound` if the note is not visible to `owner`.
    /// Returns `NoteServiceError::Note` for validation failures.
    pub async fn update(
        &self,
        owner: &UserId,
        id: NoteId,
        update: &UpdateNote,
    ) -> Result<Note, NoteServiceError> {
        let mut note = self.notes.get_note(owner, id).await?;
        note.apply_update(update, self.clock.now())?;
        self.notes.update_note(&note).await?;
        info!(user = %owner, note = %id, "note updated");
        Ok(note)
    }

    /// # Errors
    ///
    /// Returns `NoteServiceError::NotFound` if the note is not visible to `owner`.
    pub async fn delete(&self, owner: &UserId, id: NoteId) -> Result<(), NoteServiceError> {
        self.notes.delete_note(owner, id).await?;
        info!(user = %owner, note = %id, "note deleted");
        Ok(())
    }
}

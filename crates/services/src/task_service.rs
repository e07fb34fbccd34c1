use std::sync::Arc;

use storage::repository::TaskRepository;
use study_core::model::{CreateTask, Task, TaskId, UpdateTask, UserId};
use tracing::{debug, info};

use crate::Clock;
use crate::error::TaskServiceError;

/// Task CRUD scoped to one owner.
#[derive(Clone)]
pub struct TaskService {
    clock: Clock,
    tasks: Arc<dyn TaskRepository>,
}

impl TaskService {
    #[must_use]
    pub fn new(clock: Clock, tasks: Arc<dyn TaskRepository>) -> Self {
        Self { clock, tasks }
    }

    /// # Errors
    ///
    /// Returns `TaskServiceError::Storage` if repository access fails.
    pub async fn list(&self, owner: &UserId) -> Result<Vec<Task>, TaskServiceError> {
        let tasks = self.tasks.list_tasks(owner).await?;
        debug!(user = %owner, count = tasks.len(), "listed tasks");
        Ok(tasks)
    }

    /// # Errors
    ///
    /// Returns `TaskServiceError::NotFound` if the task is not visible to `owner`.
    pub async fn get(&self, owner: &UserId, id: TaskId) -> Result<Task, TaskServiceError> {
        Ok(self.tasks.get_task(owner, id).await?)
    }

    /// # Errors
    ///
    /// Returns `TaskServiceError::Task` for validation failures.
    pub async fn create(&self, owner: &UserId, input: CreateTask) -> Result<Task, TaskServiceError> {
        let task = Task::new(TaskId::generate(), owner.clone(), input, self.clock.now())?;
        self.tasks.insert_task(&task).await?;
        info!(user = %owner, task = %task.id(), status = %task.status(), "task created");
        Ok(task)
    }

    /// Apply a partial update; completing a task stamps `completed_at` once.
    ///
    /// # Errors
    ///
    /// Returns `TaskServiceError::NotFound` if the task is not visible to `owner`.
    /// Returns `TaskServiceError::Task` for validation failures.
    pub async fn update(
        &self,
        owner: &UserId,
        id: TaskId,
        update: &UpdateTask,
    ) -> Result<Task, TaskServiceError> {
        let mut task = self.tasks.get_task(owner, id).await?;
        task.apply_update(update, self.clock.now())?;
        self.tasks.update_task(&task).await?;
        info!(user = %owner, task = %id, status = %task.status(), "task updated");
        Ok(task)
    }

    /// # Errors
    ///
    /// Returns `TaskServiceError::NotFound` if the task is not visible to `owner`.
    pub async fn delete(&self, owner: &UserId, id: TaskId) -> Result<(), TaskServiceError> {
        self.tasks.delete_task(owner, id).await?;
        info!(user = %owner, task = %id, "task deleted");
        Ok(())
    }
}

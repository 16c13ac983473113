use async_trait::async_trait;

use super::error::TaskError;
use super::task::{Task, TaskId, TaskPatch};

/// Storage port for the task collection.
///
/// Backends always hand back the whole collection from `list`; there is no
/// partial query surface.
#[async_trait]
pub trait TaskRepository: Send + Sync + 'static {
    async fn init(&self) -> Result<(), TaskError>;
    async fn list(&self) -> Result<Vec<Task>, TaskError>;
    async fn append(&self, task: Task) -> Result<Task, TaskError>;
    /// Merges `patch` into the task with `id`, or fails with `TaskError::NotFound`.
    async fn replace(&self, id: &TaskId, patch: TaskPatch) -> Result<Task, TaskError>;
    async fn remove(&self, id: &TaskId) -> Result<bool, TaskError>;
}

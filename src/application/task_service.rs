use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::error::TaskError;
use crate::domain::repository::TaskRepository;
use crate::domain::task::{NewTask, Task, TaskId, TaskPatch};

#[async_trait]
pub trait TaskService: Send + Sync + 'static {
    async fn list(&self) -> Result<Vec<Task>, TaskError>;
    async fn create(&self, input: NewTask) -> Result<Task, TaskError>;
    async fn update(&self, id: TaskId, patch: TaskPatch) -> Result<Task, TaskError>;
    async fn delete(&self, id: TaskId) -> Result<(), TaskError>;
}

/// Hands out millisecond-timestamp ids, bumped past the last one issued or
/// observed so two creates in the same millisecond never collide.
#[derive(Debug, Default)]
pub struct IdSequence {
    last: AtomicI64,
}

impl IdSequence {
    pub fn next(&self, now_millis: i64) -> TaskId {
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now_millis.max(prev + 1);
            match self.last.compare_exchange_weak(prev, candidate, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => return TaskId(candidate.to_string()),
                Err(actual) => prev = actual,
            }
        }
    }

    /// Raises the floor past an existing numeric id. Other ids are ignored.
    pub fn observe(&self, id: &TaskId) {
        if let Ok(n) = id.as_str().parse::<i64>() {
            self.last.fetch_max(n, Ordering::Relaxed);
        }
    }
}

#[derive(Clone)]
pub struct TaskServiceImpl<R: TaskRepository> {
    repo: R,
    ids: Arc<IdSequence>,
}

impl<R: TaskRepository> TaskServiceImpl<R> {
    pub fn new(repo: R) -> Self { Self { repo, ids: Arc::new(IdSequence::default()) } }
}

#[async_trait]
impl<R: TaskRepository> TaskService for TaskServiceImpl<R> {
    async fn list(&self) -> Result<Vec<Task>, TaskError> { self.repo.list().await }

    async fn create(&self, input: NewTask) -> Result<Task, TaskError> {
        input.validate()?;
        // ids already stored, possibly by another process, are never reissued
        for existing in self.repo.list().await? {
            self.ids.observe(&existing.id);
        }
        let now = Utc::now();
        let task = Task::new(self.ids.next(now.timestamp_millis()), input, now);
        self.repo.append(task).await
    }

    async fn update(&self, id: TaskId, patch: TaskPatch) -> Result<Task, TaskError> {
        patch.validate()?;
        self.repo.replace(&id, patch).await
    }

    async fn delete(&self, id: TaskId) -> Result<(), TaskError> {
        if self.repo.remove(&id).await? { Ok(()) } else { Err(TaskError::NotFound(id)) }
    }
}

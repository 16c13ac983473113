use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::{fs, sync::Mutex};

use crate::domain::{
    error::TaskError,
    repository::TaskRepository,
    task::{Task, TaskId, TaskPatch},
};

/// Stores the whole collection as one pretty-printed JSON array.
///
/// Every operation re-reads the file and rewrites it in full. The mutex
/// serializes those cycles within the process, and writes land through a
/// temp file plus rename so readers never observe a half-written array.
#[derive(Clone)]
pub struct JsonFileTaskRepository {
    path: Arc<PathBuf>,
    lock: Arc<Mutex<()>>,
}

impl JsonFileTaskRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: Arc::new(path.into()), lock: Arc::new(Mutex::new(())) }
    }

    /// Unreadable or corrupt files degrade to an empty collection.
    async fn read_all(&self) -> Vec<Task> {
        let bytes = match fs::read(&*self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "failed to read tasks file");
                return Vec::new();
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "failed to parse tasks file");
                Vec::new()
            }
        }
    }

    async fn write_all(&self, tasks: &[Task]) -> Result<(), TaskError> {
        let bytes = serde_json::to_vec_pretty(tasks).map_err(|e| TaskError::Storage(e.to_string()))?;
        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &*self.path).await?;
        tracing::debug!(path = %self.path.display(), count = tasks.len(), "tasks file written");
        Ok(())
    }
}

#[async_trait]
impl TaskRepository for JsonFileTaskRepository {
    async fn init(&self) -> Result<(), TaskError> {
        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() { fs::create_dir_all(parent).await?; }
        }
        if !fs::try_exists(&*self.path).await? {
            self.write_all(&[]).await?;
            tracing::info!(path = %self.path.display(), "created empty tasks file");
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Task>, TaskError> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all().await)
    }

    async fn append(&self, task: Task) -> Result<Task, TaskError> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.read_all().await;
        if tasks.iter().any(|t| t.id == task.id) {
            return Err(TaskError::validation(format!("duplicate task id: {}", task.id)));
        }
        tasks.push(task.clone());
        self.write_all(&tasks).await?;
        Ok(task)
    }

    async fn replace(&self, id: &TaskId, patch: TaskPatch) -> Result<Task, TaskError> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.read_all().await;
        let Some(task) = tasks.iter_mut().find(|t| &t.id == id) else {
            return Err(TaskError::NotFound(id.clone()));
        };
        task.apply_patch(patch, Utc::now());
        let updated = task.clone();
        self.write_all(&tasks).await?;
        Ok(updated)
    }

    async fn remove(&self, id: &TaskId) -> Result<bool, TaskError> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.read_all().await;
        let before = tasks.len();
        tasks.retain(|t| &t.id != id);
        if tasks.len() == before { return Ok(false); }
        self.write_all(&tasks).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::{DueDate, NewTask, Priority, TaskStatus};

    fn task(id: &str) -> Task {
        let input = NewTask {
            title: format!("task {id}"),
            description: Some("details".into()),
            due_date: DueDate::parse("2025-01-10T09:00").unwrap(),
            priority: Priority::Low,
            status: TaskStatus::Pending,
        };
        Task::new(TaskId::from(id), input, Utc::now())
    }

    #[tokio::test]
    async fn init_creates_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tasks.json");
        let repo = JsonFileTaskRepository::new(&path);
        repo.init().await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_or_corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let repo = JsonFileTaskRepository::new(&path);
        assert!(repo.list().await.unwrap().is_empty());
        std::fs::write(&path, "{ not json").unwrap();
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn writes_are_pretty_printed_and_reloadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let repo = JsonFileTaskRepository::new(&path);
        let stored = repo.append(task("1")).await.unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\n  {"));
        assert!(raw.contains("\"dueDate\": \"2025-01-10T09:00\""));
        let reopened = JsonFileTaskRepository::new(&path);
        assert_eq!(reopened.list().await.unwrap(), vec![stored]);
    }

    #[tokio::test]
    async fn replace_and_remove_report_missing_ids() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileTaskRepository::new(dir.path().join("tasks.json"));
        repo.append(task("1")).await.unwrap();
        let err = repo.replace(&TaskId::from("2"), TaskPatch::default()).await.unwrap_err();
        assert!(matches!(err, TaskError::NotFound(_)));
        assert!(repo.remove(&TaskId::from("1")).await.unwrap());
        assert!(!repo.remove(&TaskId::from("1")).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_ids_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileTaskRepository::new(dir.path().join("tasks.json"));
        repo.append(task("1")).await.unwrap();
        assert!(matches!(repo.append(task("1")).await, Err(TaskError::Validation(_))));
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_are_all_kept() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileTaskRepository::new(dir.path().join("tasks.json"));
        repo.init().await.unwrap();
        let handles: Vec<_> = (0..20)
            .map(|i| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.append(task(&i.to_string())).await })
            })
            .collect();
        for handle in handles { handle.await.unwrap().unwrap(); }
        assert_eq!(repo.list().await.unwrap().len(), 20);
    }
}

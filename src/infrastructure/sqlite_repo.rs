use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow}, Pool, Row, Sqlite};

use crate::domain::{
    error::TaskError,
    repository::TaskRepository,
    task::{DueDate, Priority, Task, TaskId, TaskPatch, TaskStatus},
};

impl From<sqlx::Error> for TaskError {
    fn from(e: sqlx::Error) -> Self { TaskError::Storage(e.to_string()) }
}

/// Embedded alternative to the JSON file, keyed by task id.
#[derive(Clone)]
pub struct SqliteTaskRepository {
    pool: Arc<Pool<Sqlite>>,
}

impl SqliteTaskRepository {
    pub async fn connect(database_url: &str) -> Result<Self, TaskError> {
        if let Some(parent) = database_file(database_url).and_then(|p| p.parent()) {
            if !parent.as_os_str().is_empty() { tokio::fs::create_dir_all(parent).await?; }
        }
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // Each in-memory connection is its own database, so keep exactly one alive.
        let pool = if database_url.starts_with("sqlite::memory:") {
            SqlitePoolOptions::new().max_connections(1).idle_timeout(None).max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool.connect_with(options).await?;
        Ok(Self { pool: Arc::new(pool) })
    }
}

/// The on-disk file behind a `sqlite:` url, if any.
fn database_file(database_url: &str) -> Option<&Path> {
    if database_url.starts_with("sqlite::memory:") { return None; }
    let rest = database_url.strip_prefix("sqlite://").or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path == ":memory:" { None } else { Some(Path::new(path)) }
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn init(&self) -> Result<(), TaskError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                due_date TEXT NOT NULL,
                priority TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                completed_at TEXT
            )",
        )
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Task>, TaskError> {
        let rows = sqlx::query("SELECT id, title, description, due_date, priority, status, created_at, completed_at FROM tasks ORDER BY rowid")
            .fetch_all(&*self.pool)
            .await?;
        rows.iter().map(row_to_task).collect()
    }

    async fn append(&self, task: Task) -> Result<Task, TaskError> {
        sqlx::query(
            "INSERT INTO tasks (id, title, description, due_date, priority, status, created_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(task.id.as_str())
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.due_date.to_string())
        .bind(task.priority.as_str())
        .bind(task.status.as_str())
        .bind(task.created_at.to_rfc3339())
        .bind(task.completed_at.map(|at| at.to_rfc3339()))
        .execute(&*self.pool)
        .await?;
        Ok(task)
    }

    async fn replace(&self, id: &TaskId, patch: TaskPatch) -> Result<Task, TaskError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT id, title, description, due_date, priority, status, created_at, completed_at FROM tasks WHERE id = ?1")
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else { return Err(TaskError::NotFound(id.clone())) };
        let mut task = row_to_task(&row)?;
        task.apply_patch(patch, Utc::now());

        sqlx::query("UPDATE tasks SET title = ?2, description = ?3, due_date = ?4, priority = ?5, status = ?6, completed_at = ?7 WHERE id = ?1")
            .bind(task.id.as_str())
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.due_date.to_string())
            .bind(task.priority.as_str())
            .bind(task.status.as_str())
            .bind(task.completed_at.map(|at| at.to_rfc3339()))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(task)
    }

    async fn remove(&self, id: &TaskId) -> Result<bool, TaskError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?1")
            .bind(id.as_str())
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn row_to_task(row: &SqliteRow) -> Result<Task, TaskError> {
    let id: String = row.try_get("id")?;
    let due_date: String = row.try_get("due_date")?;
    let priority: String = row.try_get("priority")?;
    let status: String = row.try_get("status")?;
    let created_at: String = row.try_get("created_at")?;
    let completed_at: Option<String> = row.try_get("completed_at")?;

    Ok(Task {
        id: TaskId(id),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        due_date: DueDate::parse(&due_date)?,
        priority: priority.parse::<Priority>()?,
        status: status.parse::<TaskStatus>()?,
        created_at: parse_timestamp(&created_at)?,
        completed_at: completed_at.as_deref().map(parse_timestamp).transpose()?,
    })
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, TaskError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| TaskError::Storage(format!("bad timestamp {raw}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::NewTask;

    async fn memory_repo() -> SqliteTaskRepository {
        let repo = SqliteTaskRepository::connect("sqlite::memory:").await.unwrap();
        repo.init().await.unwrap();
        repo
    }

    fn task(id: &str, title: &str) -> Task {
        let input = NewTask {
            title: title.into(),
            description: None,
            due_date: DueDate::parse("2025-01-10T09:00").unwrap(),
            priority: Priority::Medium,
            status: TaskStatus::Pending,
        };
        Task::new(TaskId::from(id), input, Utc::now())
    }

    #[tokio::test]
    async fn connect_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("nested").join("tasks.db");
        let repo = SqliteTaskRepository::connect(&format!("sqlite://{}", file.display())).await.unwrap();
        repo.init().await.unwrap();
        repo.append(task("1", "a")).await.unwrap();
        assert!(file.exists());
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[test]
    fn database_file_skips_memory_and_query_strings() {
        assert_eq!(database_file("sqlite::memory:"), None);
        assert_eq!(database_file("sqlite://data/tasks.db?mode=rwc"), Some(Path::new("data/tasks.db")));
        assert_eq!(database_file("sqlite:tasks.db"), Some(Path::new("tasks.db")));
    }

    #[tokio::test]
    async fn list_keeps_insertion_order() {
        let repo = memory_repo().await;
        repo.append(task("2", "b")).await.unwrap();
        repo.append(task("1", "a")).await.unwrap();
        let titles: Vec<_> = repo.list().await.unwrap().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn replace_round_trips_completion() {
        let repo = memory_repo().await;
        repo.append(task("1", "a")).await.unwrap();
        let done = repo.replace(&TaskId::from("1"), TaskPatch { status: Some(TaskStatus::Completed), ..Default::default() }).await.unwrap();
        assert!(done.completed_at.is_some());
        let listed = repo.list().await.unwrap();
        assert_eq!(listed[0].status, TaskStatus::Completed);
        assert!(listed[0].completed_at.is_some());
        assert!(matches!(repo.replace(&TaskId::from("9"), TaskPatch::default()).await, Err(TaskError::NotFound(_))));
    }

    #[tokio::test]
    async fn remove_reports_whether_a_row_went_away() {
        let repo = memory_repo().await;
        repo.append(task("1", "a")).await.unwrap();
        assert!(repo.remove(&TaskId::from("1")).await.unwrap());
        assert!(!repo.remove(&TaskId::from("1")).await.unwrap());
    }
}

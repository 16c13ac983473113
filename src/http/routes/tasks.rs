use axum::extract::{rejection::JsonRejection, Path, State};
use axum::{routing::{get, put}, Json, Router};

use crate::application::task_service::TaskService;
use crate::domain::task::{NewTask, Task, TaskId, TaskPatch};
use crate::http::types::{ApiError, MessageBody};

#[derive(Clone)]
pub struct AppState<S: TaskService> { pub service: S }

pub fn router<S: TaskService + Clone + Send + Sync + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/tasks", get(list_tasks::<S>).post(create_task::<S>))
        .route("/tasks/:id", put(update_task::<S>).delete(delete_task::<S>))
        .with_state(state)
}

async fn list_tasks<S: TaskService>(State(state): State<AppState<S>>) -> Result<Json<Vec<Task>>, ApiError> {
    Ok(Json(state.service.list().await?))
}

async fn create_task<S: TaskService>(State(state): State<AppState<S>>, payload: Result<Json<NewTask>, JsonRejection>) -> Result<Json<Task>, ApiError> {
    let Json(input) = payload?;
    let task = state.service.create(input).await?;
    tracing::info!(task_id = %task.id, title = %task.title, "task created");
    Ok(Json(task))
}

async fn update_task<S: TaskService>(State(state): State<AppState<S>>, Path(id): Path<String>, payload: Result<Json<TaskPatch>, JsonRejection>) -> Result<Json<Task>, ApiError> {
    let Json(patch) = payload?;
    let task = state.service.update(TaskId(id), patch).await?;
    tracing::info!(task_id = %task.id, status = task.status.as_str(), "task updated");
    Ok(Json(task))
}

async fn delete_task<S: TaskService>(State(state): State<AppState<S>>, Path(id): Path<String>) -> Result<Json<MessageBody>, ApiError> {
    let id = TaskId(id);
    state.service.delete(id.clone()).await?;
    tracing::info!(task_id = %id, "task deleted");
    Ok(Json(MessageBody { message: "Task deleted successfully".into() }))
}

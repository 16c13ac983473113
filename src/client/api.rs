use async_trait::async_trait;
use http::StatusCode;
use thiserror::Error;

use crate::application::task_service::TaskService;
use crate::domain::error::TaskError;
use crate::domain::task::{NewTask, Task, TaskId, TaskPatch};
use crate::http::types::ErrorBody;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: StatusCode, message: String },

    #[error(transparent)]
    Task(#[from] TaskError),
}

/// What the list manager needs from the task backend.
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn list(&self) -> Result<Vec<Task>, ClientError>;
    async fn create(&self, input: &NewTask) -> Result<Task, ClientError>;
    async fn update(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task, ClientError>;
    async fn delete(&self, id: &TaskId) -> Result<(), ClientError>;
}

/// Talks to the REST API, e.g. `http://127.0.0.1:3000/api`.
#[derive(Clone)]
pub struct HttpTaskApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTaskApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into() }
    }

    fn tasks_url(&self) -> String { format!("{}/tasks", self.base_url) }

    fn task_url(&self, id: &TaskId) -> String { format!("{}/tasks/{}", self.base_url, id) }
}

/// Turns a non-2xx response into `ClientError::Api`, preferring the server's
/// `{"error": ...}` message over the raw body.
async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = resp.status();
    if status.is_success() { return Ok(resp); }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body).map(|b| b.error).unwrap_or(body);
    Err(ClientError::Api { status, message })
}

#[async_trait]
impl TaskApi for HttpTaskApi {
    async fn list(&self) -> Result<Vec<Task>, ClientError> {
        let resp = self.client.get(self.tasks_url()).send().await?;
        Ok(check_response(resp).await?.json().await?)
    }

    async fn create(&self, input: &NewTask) -> Result<Task, ClientError> {
        let resp = self.client.post(self.tasks_url()).json(input).send().await?;
        Ok(check_response(resp).await?.json().await?)
    }

    async fn update(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task, ClientError> {
        let resp = self.client.put(self.task_url(id)).json(patch).send().await?;
        Ok(check_response(resp).await?.json().await?)
    }

    async fn delete(&self, id: &TaskId) -> Result<(), ClientError> {
        let resp = self.client.delete(self.task_url(id)).send().await?;
        check_response(resp).await?;
        Ok(())
    }
}

/// Calls a `TaskService` in process, skipping HTTP entirely.
#[derive(Clone)]
pub struct ServiceTaskApi<S: TaskService> { service: S }

impl<S: TaskService> ServiceTaskApi<S> {
    pub fn new(service: S) -> Self { Self { service } }
}

#[async_trait]
impl<S: TaskService> TaskApi for ServiceTaskApi<S> {
    async fn list(&self) -> Result<Vec<Task>, ClientError> { Ok(self.service.list().await?) }
    async fn create(&self, input: &NewTask) -> Result<Task, ClientError> { Ok(self.service.create(input.clone()).await?) }
    async fn update(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task, ClientError> { Ok(self.service.update(id.clone(), patch.clone()).await?) }
    async fn delete(&self, id: &TaskId) -> Result<(), ClientError> { Ok(self.service.delete(id.clone()).await?) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> reqwest::Response {
        reqwest::Response::from(::http::Response::builder().status(status).body(body.to_string()).unwrap())
    }

    #[tokio::test]
    async fn error_body_message_is_surfaced() {
        let err = check_response(response(404, r#"{"error":"Task not found"}"#)).await.unwrap_err();
        match err {
            ClientError::Api { status, message } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(message, "Task not found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn plain_error_body_is_kept_verbatim() {
        let err = check_response(response(502, "bad gateway")).await.unwrap_err();
        assert!(matches!(err, ClientError::Api { message, .. } if message == "bad gateway"));
    }

    #[tokio::test]
    async fn success_passes_through() {
        assert!(check_response(response(200, "[]")).await.is_ok());
    }

    #[test]
    fn urls_are_joined_under_the_base() {
        let api = HttpTaskApi::new("http://localhost:3000/api");
        assert_eq!(api.tasks_url(), "http://localhost:3000/api/tasks");
        assert_eq!(api.task_url(&TaskId::from("42")), "http://localhost:3000/api/tasks/42");
    }
}

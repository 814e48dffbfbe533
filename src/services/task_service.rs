//! Client for the external task service
//!
//! The service exposes two endpoints, `POST /api/tasks/start/{id}` and
//! `POST /api/tasks/complete/{id}`, each answering `{"success": bool}`.

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::{
    error::{Result, TimerError},
    state::TaskId,
};

/// Task status reported by the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    InProgress,
    Completed,
}

impl TaskStatus {
    fn endpoint(&self) -> &'static str {
        match self {
            TaskStatus::InProgress => "start",
            TaskStatus::Completed => "complete",
        }
    }
}

/// Reports task progress. Implementations return whether the service
/// accepted the update; transport problems are errors.
pub trait TaskService: Send + Sync {
    fn update_status<'a>(&'a self, task: &'a TaskId, status: TaskStatus) -> BoxFuture<'a, Result<bool>>;
}

#[derive(Debug, Deserialize)]
struct TaskResponse {
    #[serde(default)]
    success: bool,
}

/// Task service reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTaskService {
    client: Client,
    base_url: Url,
}

impl HttpTaskService {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url =
            Url::parse(base_url).map_err(|e| TimerError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(TimerError::InvalidUrl(base_url.to_string()));
        }

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self { client, base_url })
    }

    fn endpoint_url(&self, task: &TaskId, status: TaskStatus) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TimerError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["api", "tasks", status.endpoint(), task.as_str()]);
        Ok(url)
    }

    async fn post_status(&self, task: &TaskId, status: TaskStatus) -> Result<bool> {
        let url = self.endpoint_url(task, status)?;
        debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TimerError::Status(response.status().as_u16()));
        }

        let body: TaskResponse = response.json().await?;
        info!("Task {} {:?} update acknowledged: success={}", task, status, body.success);
        Ok(body.success)
    }
}

impl TaskService for HttpTaskService {
    fn update_status<'a>(&'a self, task: &'a TaskId, status: TaskStatus) -> BoxFuture<'a, Result<bool>> {
        Box::pin(self.post_status(task, status))
    }
}

/// Used when no task service is configured. Never touches the network
/// and always reports that the update was not applied.
#[derive(Debug, Default, Clone)]
pub struct DisabledTaskService;

impl TaskService for DisabledTaskService {
    fn update_status<'a>(&'a self, task: &'a TaskId, status: TaskStatus) -> BoxFuture<'a, Result<bool>> {
        Box::pin(async move {
            debug!("No task service configured, skipping {:?} for task {}", status, task);
            Ok(false)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str) -> TaskId {
        TaskId::parse(id).unwrap()
    }

    #[tokio::test]
    async fn start_posts_to_start_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/tasks/start/42")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": true}"#)
            .create_async()
            .await;

        let service = HttpTaskService::new(&server.url()).unwrap();
        let accepted = service.update_status(&task("42"), TaskStatus::InProgress).await.unwrap();

        assert!(accepted);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn complete_reports_unsuccessful_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/tasks/complete/7")
            .with_status(200)
            .with_body(r#"{"success": false, "message": "unknown task"}"#)
            .create_async()
            .await;

        let service = HttpTaskService::new(&server.url()).unwrap();
        let accepted = service.update_status(&task("7"), TaskStatus::Completed).await.unwrap();

        assert!(!accepted);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_error_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/tasks/start/1")
            .with_status(500)
            .create_async()
            .await;

        let service = HttpTaskService::new(&server.url()).unwrap();
        let result = service.update_status(&task("1"), TaskStatus::InProgress).await;

        assert!(matches!(result, Err(TimerError::Status(500))));
    }

    #[test]
    fn task_ids_are_escaped_and_base_path_kept() {
        let service = HttpTaskService::new("http://localhost:5000/app/").unwrap();
        let url = service.endpoint_url(&task("a b/c"), TaskStatus::Completed).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/app/api/tasks/complete/a%20b%2Fc");
    }

    #[test]
    fn rejects_non_base_urls() {
        assert!(HttpTaskService::new("not a url").is_err());
        assert!(HttpTaskService::new("mailto:someone@example.com").is_err());
    }

    #[tokio::test]
    async fn disabled_service_reports_not_applied() {
        let accepted = DisabledTaskService
            .update_status(&task("1"), TaskStatus::Completed)
            .await
            .unwrap();
        assert!(!accepted);
    }
}

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::model::{
    Dependency, NewTask, ProjectId, ProjectSnapshot, ServiceConfig, Task, TaskId, TaskPatch,
};

use super::{ServiceError, TaskService};

const BODY_PREVIEW_LIMIT: usize = 512;

/// REST client for the scheduling service
#[derive(Debug, Clone)]
pub struct HttpService {
    client: Client,
    base_url: String,
}

/// Structured error body returned by the service
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct CriticalPathBody {
    #[serde(default)]
    critical_path_task_ids: Vec<TaskId>,
    #[serde(default)]
    task_analyses: Vec<TaskAnalysis>,
}

#[derive(Debug, Deserialize)]
struct TaskAnalysis {
    task_id: TaskId,
    total_slack: i64,
}

impl CriticalPathBody {
    fn into_parts(self) -> (HashSet<TaskId>, HashMap<TaskId, i64>) {
        let slack = self
            .task_analyses
            .into_iter()
            .map(|a| (a.task_id, a.total_slack))
            .collect();
        (self.critical_path_task_ids.into_iter().collect(), slack)
    }
}

impl HttpService {
    pub fn new(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        Ok(HttpService {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ServiceError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        Err(error_from_body(status, &url, &body))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, ServiceError> {
        let response = self.send(builder).await?;
        let body = response
            .text()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        serde_json::from_str(&body)
            .map_err(|e| ServiceError::Decode(format!("{} | body={}", e, preview(&body))))
    }

    /// Critical task ids plus per-task slack. Degrades to empty on failure.
    async fn critical_path(&self, project: ProjectId) -> (HashSet<TaskId>, HashMap<TaskId, i64>) {
        let path = format!("/projects/{}/critical-path", project);
        match self
            .send_json::<CriticalPathBody>(self.request(Method::GET, &path))
            .await
        {
            Ok(body) => body.into_parts(),
            // An empty project has no critical path
            Err(ServiceError::NotFound { .. }) => Default::default(),
            Err(e) => {
                tracing::warn!(%project, error = %e, "critical path unavailable");
                Default::default()
            }
        }
    }
}

fn preview(body: &str) -> String {
    if body.len() <= BODY_PREVIEW_LIMIT {
        return body.to_string();
    }
    let mut end = BODY_PREVIEW_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

fn error_from_body(status: StatusCode, url: &str, body: &str) -> ServiceError {
    let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
    match (status, parsed) {
        (StatusCode::NOT_FOUND, Some(err)) => ServiceError::NotFound {
            resource: "resource",
            id: err.message,
        },
        (StatusCode::NOT_FOUND, None) => ServiceError::NotFound {
            resource: "resource",
            id: url.to_string(),
        },
        (_, Some(err)) => ServiceError::Rejected {
            code: err.error,
            message: err.message,
        },
        (_, None) => ServiceError::Rejected {
            code: format!("http_{}", status.as_u16()),
            message: preview(body),
        },
    }
}

fn new_task_body(task: &NewTask) -> Value {
    let mut body = json!({
        "title": task.title,
        "description": task.description,
        "duration_days": task.duration_days,
        "project_id": task.project_id,
    });
    if let Some(id) = task.id {
        body["id"] = json!(id);
    }
    if let Some(start) = task.start_date {
        body["start_date"] = json!(start);
    }
    if let Some(pos) = task.position {
        body["position_x"] = json!(pos.x);
        body["position_y"] = json!(pos.y);
    }
    body
}

/// PATCH body: only present fields are sent, so the service leaves the rest alone.
fn patch_body(patch: &TaskPatch) -> Value {
    let mut body = Map::new();
    if let Some(title) = &patch.title {
        body.insert("title".into(), json!(title));
    }
    if let Some(description) = &patch.description {
        body.insert("description".into(), json!(description));
    }
    if let Some(days) = patch.duration_days {
        body.insert("duration_days".into(), json!(days));
    }
    if let Some(start) = patch.start_date {
        body.insert("start_date".into(), json!(start.format("%Y-%m-%d").to_string()));
    }
    if let Some(pos) = patch.position {
        body.insert("position_x".into(), json!(pos.x));
        body.insert("position_y".into(), json!(pos.y));
    }
    Value::Object(body)
}

#[async_trait]
impl TaskService for HttpService {
    async fn create_task(&self, task: NewTask) -> Result<Task, ServiceError> {
        let builder = self
            .request(Method::POST, "/tasks/")
            .json(&new_task_body(&task));
        self.send_json(builder).await
    }

    async fn update_task(&self, id: TaskId, patch: TaskPatch) -> Result<Task, ServiceError> {
        let builder = self
            .request(Method::PATCH, &format!("/tasks/{}", id))
            .json(&patch_body(&patch));
        self.send_json(builder).await
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), ServiceError> {
        self.send(self.request(Method::DELETE, &format!("/tasks/{}", id)))
            .await?;
        Ok(())
    }

    async fn create_dependency(
        &self,
        predecessor: TaskId,
        successor: TaskId,
    ) -> Result<Dependency, ServiceError> {
        let builder = self.request(Method::POST, "/dependencies/").json(&json!({
            "predecessor_id": predecessor,
            "successor_id": successor,
        }));
        self.send_json(builder).await
    }

    async fn delete_dependency(
        &self,
        predecessor: TaskId,
        successor: TaskId,
    ) -> Result<(), ServiceError> {
        let path = format!("/dependencies/{}/{}", predecessor, successor);
        self.send(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }

    async fn snapshot(&self, project: ProjectId) -> Result<ProjectSnapshot, ServiceError> {
        let query = [("project_id", project.to_string())];
        let tasks: Vec<Task> = self
            .send_json(self.request(Method::GET, "/tasks/").query(&query))
            .await?;
        let dependencies: Vec<Dependency> = self
            .send_json(self.request(Method::GET, "/dependencies/").query(&query))
            .await?;
        let (critical_task_ids, slack) = self.critical_path(project).await;
        tracing::debug!(
            %project,
            tasks = tasks.len(),
            dependencies = dependencies.len(),
            "fetched snapshot"
        );
        Ok(ProjectSnapshot {
            project_id: project,
            tasks,
            dependencies,
            critical_task_ids,
            slack,
            fetched_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Position;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    #[test]
    fn critical_path_body_carries_slack_per_task() {
        let (a, b) = (TaskId::new(), TaskId::new());
        let body: CriticalPathBody = serde_json::from_value(json!({
            "project_id": ProjectId::new(),
            "project_duration": 9,
            "critical_path_task_ids": [a],
            "task_analyses": [
                { "task_id": a, "title": "Design", "total_slack": 0, "is_critical": true },
                { "task_id": b, "title": "Docs", "total_slack": 4, "is_critical": false }
            ]
        }))
        .unwrap();
        let (critical, slack) = body.into_parts();
        assert_eq!(critical, HashSet::from([a]));
        assert_eq!(slack.get(&b), Some(&4));
        assert_eq!(slack.get(&a), Some(&0));
    }

    #[test]
    fn critical_path_body_without_analyses_has_no_slack() {
        let body: CriticalPathBody =
            serde_json::from_value(json!({ "critical_path_task_ids": [] })).unwrap();
        let (critical, slack) = body.into_parts();
        assert!(critical.is_empty());
        assert!(slack.is_empty());
    }

    #[test]
    fn patch_body_only_carries_present_fields() {
        let body = patch_body(&TaskPatch::title("Final"));
        assert_eq!(body, json!({ "title": "Final" }));
    }

    #[test]
    fn patch_body_clears_description_with_null() {
        let patch = TaskPatch {
            description: Some(None),
            ..Default::default()
        };
        assert_eq!(patch_body(&patch), json!({ "description": null }));
    }

    #[test]
    fn patch_body_flattens_position() {
        let body = patch_body(&TaskPatch::position(Position::new(1.5, -2.0)));
        assert_eq!(body, json!({ "position_x": 1.5, "position_y": -2.0 }));
    }

    #[test]
    fn new_task_body_includes_requested_id() {
        let project = ProjectId::new();
        let mut req = NewTask::new(project, "Restore me");
        req.id = Some(TaskId::new());
        req.start_date = NaiveDate::from_ymd_opt(2026, 3, 2);
        let body = new_task_body(&req);
        assert_eq!(body["id"], json!(req.id.unwrap()));
        assert_eq!(body["start_date"], json!("2026-03-02"));
        assert!(body.get("position_x").is_none());
    }

    #[test]
    fn structured_error_body_becomes_rejection() {
        let body = r#"{"error":"cycle_detected","message":"would create a cycle","details":null}"#;
        let err = error_from_body(StatusCode::BAD_REQUEST, "http://x/dependencies/", body);
        assert_eq!(err.code(), Some("cycle_detected"));
    }

    #[test]
    fn bare_404_is_not_found() {
        let err = error_from_body(StatusCode::NOT_FOUND, "http://x/tasks/1", "");
        assert!(matches!(err, ServiceError::NotFound { .. }));
    }

    #[test]
    fn unstructured_error_keeps_status_code() {
        let err = error_from_body(StatusCode::BAD_GATEWAY, "http://x", "upstream down");
        assert_eq!(err.code(), Some("http_502"));
    }

    #[test]
    fn preview_truncates_long_bodies() {
        let long = "x".repeat(BODY_PREVIEW_LIMIT + 10);
        assert!(preview(&long).ends_with("..."));
        assert_eq!(preview("short"), "short");
    }
}

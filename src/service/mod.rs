//! The scheduling service boundary.
//!
//! Every domain mutation goes through [`TaskService`]. The service owns task
//! identity, computed dates and the critical path; the client only ever sees
//! confirmed results.

pub mod http;
pub mod memory;

pub use http::HttpService;
pub use memory::MemoryService;

use async_trait::async_trait;

use crate::model::{Dependency, NewTask, ProjectId, ProjectSnapshot, Task, TaskId, TaskPatch};

/// Error type for service calls
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },
    /// The service refused the request (cycle, duplicate, validation, ...)
    #[error("{message} ({code})")]
    Rejected { code: String, message: String },
    #[error("service unreachable: {0}")]
    Transport(String),
    #[error("unexpected response from service: {0}")]
    Decode(String),
    /// Failure scheduled through `MemoryService::fail_next`
    #[error("injected failure: {0}")]
    Injected(String),
}

impl ServiceError {
    pub fn rejected(code: &str, message: impl Into<String>) -> Self {
        ServiceError::Rejected {
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub fn task_not_found(id: TaskId) -> Self {
        ServiceError::NotFound {
            resource: "task",
            id: id.to_string(),
        }
    }

    /// Machine-readable code for rejections (`cycle_detected`, ...)
    pub fn code(&self) -> Option<&str> {
        match self {
            ServiceError::Rejected { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Remote CRUD + refresh feed for one scheduling backend
#[async_trait]
pub trait TaskService: Send + Sync {
    async fn create_task(&self, task: NewTask) -> Result<Task, ServiceError>;
    async fn update_task(&self, id: TaskId, patch: TaskPatch) -> Result<Task, ServiceError>;
    async fn delete_task(&self, id: TaskId) -> Result<(), ServiceError>;
    async fn create_dependency(
        &self,
        predecessor: TaskId,
        successor: TaskId,
    ) -> Result<Dependency, ServiceError>;
    async fn delete_dependency(
        &self,
        predecessor: TaskId,
        successor: TaskId,
    ) -> Result<(), ServiceError>;
    /// Current tasks, dependencies and critical set for a project
    async fn snapshot(&self, project: ProjectId) -> Result<ProjectSnapshot, ServiceError>;
}

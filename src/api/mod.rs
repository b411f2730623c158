//! Asana collaborator interface and its HTTP implementation.

mod http;

pub use http::AsanaClient;

use async_trait::async_trait;

use crate::entities::{
    CreateTaskRequest, ProjectSummary, TaskDetails, TaskSummary, UpdateTaskRequest,
    WorkspaceMember,
};
use crate::errors::ApiError;

/// The external system of record, behind a trait so the resolution engine can
/// be exercised against fakes.
///
/// All calls are awaited to completion; timeouts belong to the transport.
#[async_trait]
pub trait AsanaApi: Send + Sync {
    /// Fetch the full member list of the workspace.
    async fn workspace_members(&self) -> Result<Vec<WorkspaceMember>, ApiError>;

    /// Full-text task search, optionally restricted to a project, filtered by
    /// completion state.
    async fn search_tasks(
        &self,
        project_gid: Option<&str>,
        text: &str,
        completed: bool,
    ) -> Result<Vec<TaskSummary>, ApiError>;

    /// Create a new task.
    async fn create_task(&self, req: &CreateTaskRequest) -> Result<TaskDetails, ApiError>;

    /// Update an existing task.
    async fn update_task(
        &self,
        task_gid: &str,
        req: &UpdateTaskRequest,
    ) -> Result<TaskDetails, ApiError>;

    /// Fetch full details of a task.
    async fn get_task(&self, task_gid: &str) -> Result<TaskDetails, ApiError>;

    /// List projects visible to the authenticated user.
    async fn list_projects(&self) -> Result<Vec<ProjectSummary>, ApiError>;
}

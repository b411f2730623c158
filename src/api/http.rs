//! HTTP client for the Asana REST API.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::entities::{
    CreateTaskRequest, NamedRef, ProjectSummary, TaskDetails, TaskSummary, UpdateTaskRequest,
    WorkspaceMember,
};
use crate::errors::ApiError;

use super::AsanaApi;

const ASANA_API_BASE: &str = "https://app.asana.com/api/1.0";

/// Asana REST API client.
pub struct AsanaClient {
    token: String,
    workspace_gid: String,
    client: reqwest::Client,
}

impl AsanaClient {
    /// Create a new client for one workspace, authenticating with a personal
    /// access token.
    pub fn new(token: impl Into<String>, workspace_gid: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            workspace_gid: workspace_gid.into(),
            client: reqwest::Client::new(),
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        debug!(path, "asana GET");
        let resp = self
            .client
            .get(format!("{ASANA_API_BASE}{path}"))
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await?;
        unwrap_data(resp).await
    }

    async fn send_body<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        data: Value,
    ) -> Result<T, ApiError> {
        debug!(path, %method, "asana request");
        let resp = self
            .client
            .request(method, format!("{ASANA_API_BASE}{path}"))
            .bearer_auth(&self.token)
            .json(&json!({ "data": data }))
            .send()
            .await?;
        unwrap_data(resp).await
    }
}

/// Unwrap Asana's `{"data": ...}` envelope, turning non-success statuses into
/// `ApiError::Api` with the first error message from the body when present.
async fn unwrap_data<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ApiError::Api {
            status: status.as_u16(),
            message: error_message(&body),
        });
    }
    let envelope: Envelope<T> = resp.json().await?;
    Ok(envelope.data)
}

fn error_message(body: &str) -> String {
    let from_payload = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        v.get("errors")
            .and_then(|e| e.get(0))
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .map(String::from)
    });
    from_payload.unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            "unknown error".to_string()
        } else {
            trimmed.to_string()
        }
    })
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct MemberData {
    gid: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

impl From<MemberData> for WorkspaceMember {
    fn from(m: MemberData) -> Self {
        Self {
            gid: m.gid,
            name: m.name.unwrap_or_default(),
            email: m.email.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
struct TaskData {
    gid: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    completed: Option<bool>,
}

impl From<TaskData> for TaskSummary {
    fn from(t: TaskData) -> Self {
        Self {
            gid: t.gid,
            name: t.name.unwrap_or_default(),
            completed: t.completed.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
struct RefData {
    gid: String,
    #[serde(default)]
    name: Option<String>,
}

impl From<RefData> for NamedRef {
    fn from(r: RefData) -> Self {
        Self {
            gid: r.gid,
            name: r.name.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
struct TaskDetailsData {
    gid: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    completed: Option<bool>,
    #[serde(default)]
    due_on: Option<String>,
    #[serde(default)]
    assignee: Option<RefData>,
    #[serde(default)]
    projects: Option<Vec<RefData>>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    modified_at: Option<String>,
    #[serde(default)]
    permalink_url: Option<String>,
}

impl From<TaskDetailsData> for TaskDetails {
    fn from(t: TaskDetailsData) -> Self {
        Self {
            gid: t.gid,
            name: t.name.unwrap_or_default(),
            notes: t.notes.unwrap_or_default(),
            completed: t.completed.unwrap_or_default(),
            due_on: t.due_on,
            assignee: t.assignee.map(NamedRef::from),
            projects: t
                .projects
                .unwrap_or_default()
                .into_iter()
                .map(NamedRef::from)
                .collect(),
            created_at: t.created_at,
            modified_at: t.modified_at,
            permalink_url: t.permalink_url,
        }
    }
}

const TASK_OPT_FIELDS: &str =
    "name,notes,completed,due_on,created_at,modified_at,assignee.name,projects.name,permalink_url";

#[async_trait::async_trait]
impl AsanaApi for AsanaClient {
    async fn workspace_members(&self) -> Result<Vec<WorkspaceMember>, ApiError> {
        let members: Vec<MemberData> = self
            .get(
                &format!("/workspaces/{}/users", self.workspace_gid),
                &[("opt_fields", "name,email")],
            )
            .await?;
        Ok(members.into_iter().map(WorkspaceMember::from).collect())
    }

    async fn search_tasks(
        &self,
        project_gid: Option<&str>,
        text: &str,
        completed: bool,
    ) -> Result<Vec<TaskSummary>, ApiError> {
        let completed = if completed { "true" } else { "false" };
        let mut query = vec![
            ("text", text),
            ("completed", completed),
            ("opt_fields", "name,completed"),
        ];
        if let Some(project) = project_gid {
            query.push(("projects.any", project));
        }
        let tasks: Vec<TaskData> = self
            .get(
                &format!("/workspaces/{}/tasks/search", self.workspace_gid),
                &query,
            )
            .await?;
        Ok(tasks.into_iter().map(TaskSummary::from).collect())
    }

    async fn create_task(&self, req: &CreateTaskRequest) -> Result<TaskDetails, ApiError> {
        let mut data = serde_json::Map::new();
        data.insert("name".to_string(), json!(req.name));
        data.insert("notes".to_string(), json!(req.notes));
        if !req.projects.is_empty() {
            data.insert("projects".to_string(), json!(req.projects));
        }
        if let Some(assignee) = &req.assignee {
            data.insert("assignee".to_string(), json!(assignee));
        }
        if let Some(due_on) = &req.due_on {
            data.insert("due_on".to_string(), json!(due_on));
        }
        if let Some(priority) = req.priority {
            data.insert("priority".to_string(), json!(priority.as_asana_value()));
        }
        let task: TaskDetailsData = self
            .send_body(reqwest::Method::POST, "/tasks", Value::Object(data))
            .await?;
        Ok(task.into())
    }

    async fn update_task(
        &self,
        task_gid: &str,
        req: &UpdateTaskRequest,
    ) -> Result<TaskDetails, ApiError> {
        let mut data = serde_json::Map::new();
        if let Some(name) = &req.name {
            data.insert("name".to_string(), json!(name));
        }
        if let Some(notes) = &req.notes {
            data.insert("notes".to_string(), json!(notes));
        }
        if let Some(completed) = req.completed {
            data.insert("completed".to_string(), json!(completed));
        }
        if let Some(due_on) = &req.due_on {
            data.insert("due_on".to_string(), json!(due_on));
        }
        if let Some(priority) = req.priority {
            data.insert("priority".to_string(), json!(priority.as_asana_value()));
        }
        let task: TaskDetailsData = self
            .send_body(
                reqwest::Method::PUT,
                &format!("/tasks/{task_gid}"),
                Value::Object(data),
            )
            .await?;
        Ok(task.into())
    }

    async fn get_task(&self, task_gid: &str) -> Result<TaskDetails, ApiError> {
        let task: TaskDetailsData = self
            .get(
                &format!("/tasks/{task_gid}"),
                &[("opt_fields", TASK_OPT_FIELDS)],
            )
            .await?;
        Ok(task.into())
    }

    async fn list_projects(&self) -> Result<Vec<ProjectSummary>, ApiError> {
        self.get(
            "/projects",
            &[
                ("workspace", self.workspace_gid.as_str()),
                ("opt_fields", "name"),
            ],
        )
        .await
    }
}

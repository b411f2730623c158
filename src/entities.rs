//! Core entities shared across the API and domain layers.

use serde::{Deserialize, Serialize};

/// A member of the Asana workspace directory.
///
/// Immutable once fetched; owned by the directory cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceMember {
    /// Canonical Asana gid.
    pub gid: String,
    /// Display name, e.g. "Jane Doe".
    pub name: String,
    /// Primary email address (may be empty for service accounts).
    #[serde(default)]
    pub email: String,
}

/// A task as returned by the search collaborator. Consumed read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub gid: String,
    pub name: String,
    #[serde(default)]
    pub completed: bool,
}

/// A gid/name pair referencing another Asana record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub gid: String,
    pub name: String,
}

/// Full task details returned by `get_task`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDetails {
    pub gid: String,
    pub name: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub completed: bool,
    pub due_on: Option<String>,
    pub assignee: Option<NamedRef>,
    #[serde(default)]
    pub projects: Vec<NamedRef>,
    pub created_at: Option<String>,
    pub modified_at: Option<String>,
    pub permalink_url: Option<String>,
}

/// A project visible to the authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub gid: String,
    pub name: String,
}

/// Outcome of identity resolution.
///
/// `Unresolved` carries the caller's original text unchanged so it can still
/// be passed through to the API (it may be a valid gid or email the cache
/// doesn't know about). Not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberRef {
    /// Matched a cached alias (or was already a canonical gid).
    Resolved(String),
    /// No confident match; the original input, unmodified.
    Unresolved(String),
}

impl MemberRef {
    /// The string to hand to the API either way.
    pub fn into_inner(self) -> String {
        match self {
            Self::Resolved(gid) => gid,
            Self::Unresolved(text) => text,
        }
    }
}

/// Outcome of task location within a project scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskMatch {
    /// Exactly one qualifying task.
    Found(String),
    /// No qualifying task.
    NotFound,
    /// Multiple qualifying tasks; truncated to the first five in the order
    /// the search collaborator returned them.
    Ambiguous(Vec<TaskSummary>),
}

/// Task priority accepted by the tools, mapped to Asana's capitalized values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    /// Parse a priority, case-insensitively. Unknown values yield `None` and
    /// are silently dropped by callers, matching the upstream behavior.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "urgent" => Some(Self::Urgent),
            _ => None,
        }
    }

    /// The value Asana expects on the wire.
    #[must_use]
    pub const fn as_asana_value(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Urgent => "Urgent",
        }
    }
}

/// Fields for task creation.
#[derive(Debug, Clone, Default)]
pub struct CreateTaskRequest {
    pub name: String,
    pub notes: String,
    pub projects: Vec<String>,
    pub assignee: Option<String>,
    pub due_on: Option<String>,
    pub priority: Option<TaskPriority>,
}

/// Fields for task update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateTaskRequest {
    pub name: Option<String>,
    pub notes: Option<String>,
    pub completed: Option<bool>,
    pub due_on: Option<String>,
    pub priority: Option<TaskPriority>,
}

impl UpdateTaskRequest {
    /// True when no field is set; the API rejects empty updates upstream, so
    /// callers check this first.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.notes.is_none()
            && self.completed.is_none()
            && self.due_on.is_none()
            && self.priority.is_none()
    }
}

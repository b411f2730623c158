#![warn(clippy::pedantic)]
// Allow common pedantic lints that don't affect correctness
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::map_unwrap_or)]

//! # Asana Tasks
//!
//! Asana task management tools with fuzzy identity resolution.
//!
//! This crate provides:
//! - A time-bounded directory cache of workspace members with derived
//!   lookup aliases
//! - Free-text identity resolution (names, name fragments, emails) to
//!   canonical Asana gids
//! - Task-name search and disambiguation within a project
//! - A flexible date-expression normalizer (`"tomorrow"`, `"3 days"`,
//!   several absolute formats)
//! - An MCP server binary exposing the Asana tool surface
//!
//! ## Example
//!
//! ```rust,ignore
//! use asana_tasks::{AsanaClient, DirectoryCache, IdentityResolver, SystemClock};
//!
//! let api = Arc::new(AsanaClient::new(token, workspace_gid));
//! let directory = Arc::new(DirectoryCache::new(api, Arc::new(SystemClock)));
//! let resolver = IdentityResolver::new(directory);
//!
//! match resolver.resolve("jane d").await {
//!     MemberRef::Resolved(gid) => println!("assignee gid: {gid}"),
//!     MemberRef::Unresolved(text) => println!("passing through: {text}"),
//! }
//! ```

// Core entities
pub mod entities;

// Error types
pub mod errors;

// Injectable time source
pub mod clock;

// Asana collaborator interface + HTTP implementation
pub mod api;

// Domain facades
pub mod domain;

// Re-export key types for convenience
pub use api::{AsanaApi, AsanaClient};
pub use clock::{Clock, SystemClock};
pub use domain::{
    dates, is_canonical_gid, CacheSnapshot, DirectoryCache, IdentityResolver, TaskLocator,
    DEFAULT_TTL_SECS,
};
pub use entities::{
    CreateTaskRequest, MemberRef, NamedRef, ProjectSummary, TaskDetails, TaskMatch, TaskPriority,
    TaskSummary, UpdateTaskRequest, WorkspaceMember,
};
pub use errors::{ApiError, LocateError};

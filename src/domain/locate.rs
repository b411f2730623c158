//! Task lookup and disambiguation within a project scope.

use std::sync::Arc;

use tracing::debug;

use crate::api::AsanaApi;
use crate::domain::identity::is_canonical_gid;
use crate::entities::TaskMatch;
use crate::errors::LocateError;

/// Upper bound on candidates carried by an ambiguous result.
const MAX_CANDIDATES: usize = 5;

/// Finds a task gid from a free-text title reference, scoped to one project.
pub struct TaskLocator {
    api: Arc<dyn AsanaApi>,
}

impl TaskLocator {
    pub fn new(api: Arc<dyn AsanaApi>) -> Self {
        Self { api }
    }

    /// Locate a task by reference within a project.
    ///
    /// Canonical gids pass through as `Found` without a search. Otherwise the
    /// search collaborator is queried for incomplete tasks in the project, and
    /// a task qualifies when its title equals the reference case-insensitively
    /// or either string contains the other. Zero, one, and many matches map to
    /// `NotFound`, `Found`, and `Ambiguous` with the first five candidates in
    /// collaborator order.
    ///
    /// A failed search is an error — there is no cached task index to fall
    /// back on.
    pub async fn locate(
        &self,
        reference: &str,
        project_gid: &str,
    ) -> Result<TaskMatch, LocateError> {
        if is_canonical_gid(reference) {
            return Ok(TaskMatch::Found(reference.to_string()));
        }

        let tasks = self
            .api
            .search_tasks(Some(project_gid), reference, false)
            .await
            .map_err(LocateError::ProviderUnavailable)?;

        let needle = reference.to_lowercase();
        let mut matches: Vec<_> = tasks
            .into_iter()
            .filter(|task| {
                let title = task.name.to_lowercase();
                title == needle || title.contains(&needle) || needle.contains(&title)
            })
            .collect();

        debug!(
            reference,
            project_gid,
            matches = matches.len(),
            "task search complete"
        );

        Ok(match matches.len() {
            0 => TaskMatch::NotFound,
            1 => TaskMatch::Found(matches.remove(0).gid),
            _ => {
                matches.truncate(MAX_CANDIDATES);
                TaskMatch::Ambiguous(matches)
            }
        })
    }
}

//! Time-bounded directory cache of workspace members.
//!
//! The cache holds one immutable snapshot of derived lookup aliases. A refresh
//! rebuilds the whole alias index and swaps the snapshot behind a lock, so
//! readers see either the old index or the new one, never a mix.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::api::AsanaApi;
use crate::clock::Clock;
use crate::entities::WorkspaceMember;
use crate::errors::ApiError;

/// Default snapshot time-to-live, in seconds.
pub const DEFAULT_TTL_SECS: i64 = 3600;

/// An immutable view of the alias index at a point in time.
#[derive(Debug, Clone)]
pub struct CacheSnapshot {
    aliases: BTreeMap<String, String>,
    fetched_at: DateTime<Utc>,
}

impl CacheSnapshot {
    fn empty(fetched_at: DateTime<Utc>) -> Self {
        Self {
            aliases: BTreeMap::new(),
            fetched_at,
        }
    }

    /// Exact lookup by (lowercased) alias.
    pub fn lookup(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(String::as_str)
    }

    /// All (alias, gid) pairs in ascending alias order. The ordering is load
    /// bearing: the identity resolver's tie-break depends on it.
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}

/// Directory cache service. Injectable state — no globals — so tests control
/// both the member source and the clock.
pub struct DirectoryCache {
    api: Arc<dyn AsanaApi>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    snapshot: Mutex<Option<Arc<CacheSnapshot>>>,
}

impl DirectoryCache {
    pub fn new(api: Arc<dyn AsanaApi>, clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl(api, clock, DEFAULT_TTL_SECS)
    }

    pub fn with_ttl(api: Arc<dyn AsanaApi>, clock: Arc<dyn Clock>, ttl_secs: i64) -> Self {
        Self {
            api,
            clock,
            ttl: Duration::seconds(ttl_secs),
            snapshot: Mutex::new(None),
        }
    }

    /// Get the current snapshot, refreshing when stale or when forced.
    ///
    /// The lock is held across the refresh, so concurrent stale readers
    /// trigger exactly one upstream fetch. On fetch failure the last good
    /// snapshot is served when one exists; otherwise an empty snapshot is
    /// returned but not stored, so the next call retries.
    pub async fn snapshot(&self, force_refresh: bool) -> Arc<CacheSnapshot> {
        let mut stored = self.snapshot.lock().await;
        let now = self.clock.now();

        if !force_refresh {
            if let Some(current) = stored.as_ref() {
                if now - current.fetched_at < self.ttl {
                    return Arc::clone(current);
                }
            }
        }

        match self.api.workspace_members().await {
            Ok(members) => {
                let fresh = Arc::new(build_snapshot(&members, now));
                debug!(
                    members = members.len(),
                    aliases = fresh.aliases.len(),
                    "directory cache refreshed"
                );
                *stored = Some(Arc::clone(&fresh));
                fresh
            }
            Err(err) => match stored.as_ref() {
                Some(last_good) => {
                    warn!(error = %err, "directory fetch failed, serving stale snapshot");
                    Arc::clone(last_good)
                }
                None => {
                    warn!(error = %err, "directory fetch failed with no cached snapshot");
                    Arc::new(CacheSnapshot::empty(now))
                }
            },
        }
    }

    /// Fetch and store a fresh snapshot unconditionally, surfacing the fetch
    /// error to the caller instead of degrading to stale data. A workspace
    /// with zero members is a successful (empty) refresh, not an error.
    pub async fn refresh(&self) -> Result<Arc<CacheSnapshot>, ApiError> {
        let mut stored = self.snapshot.lock().await;
        let members = self.api.workspace_members().await?;
        let fresh = Arc::new(build_snapshot(&members, self.clock.now()));
        debug!(
            members = members.len(),
            aliases = fresh.aliases.len(),
            "directory cache refreshed"
        );
        *stored = Some(Arc::clone(&fresh));
        Ok(fresh)
    }

    /// Drop the stored snapshot; the next lookup refetches.
    pub async fn invalidate(&self) {
        *self.snapshot.lock().await = None;
    }
}

fn build_snapshot(members: &[WorkspaceMember], fetched_at: DateTime<Utc>) -> CacheSnapshot {
    let mut aliases = BTreeMap::new();
    for member in members {
        // Later members overwrite earlier ones on collision: input order is
        // stable, last write wins.
        for alias in derive_aliases(member) {
            aliases.insert(alias, member.gid.clone());
        }
    }
    CacheSnapshot { aliases, fetched_at }
}

/// Lookup aliases for one member, all lowercased: the full display name; for
/// names with at least two parts also the first name and `"first l"`; the
/// email; and the member's own gid (so pre-resolved input hits exactly).
fn derive_aliases(member: &WorkspaceMember) -> Vec<String> {
    let mut aliases = Vec::new();

    let name = member.name.trim().to_lowercase();
    if !name.is_empty() {
        aliases.push(name.clone());
    }
    let parts: Vec<&str> = name.split_whitespace().collect();
    if parts.len() >= 2 {
        aliases.push(parts[0].to_string());
        if let Some(initial) = parts.last().and_then(|last| last.chars().next()) {
            aliases.push(format!("{} {}", parts[0], initial));
        }
    }

    let email = member.email.trim().to_lowercase();
    if !email.is_empty() {
        aliases.push(email);
    }

    aliases.push(member.gid.clone());
    aliases
}

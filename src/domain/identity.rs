//! Free-text member resolution against the directory cache.

use std::sync::Arc;

use tracing::debug;

use crate::domain::directory::DirectoryCache;
use crate::entities::MemberRef;

/// Minimum containment score a fuzzy candidate must strictly exceed.
const SCORE_THRESHOLD: f64 = 0.3;

/// True when the reference is already a canonical Asana gid: all digits and
/// longer than ten characters. Such input skips the directory entirely.
pub fn is_canonical_gid(reference: &str) -> bool {
    reference.len() > 10 && reference.chars().all(|c| c.is_ascii_digit())
}

/// Resolves free-text member references (names, partial names, emails) to
/// canonical gids using the directory cache.
pub struct IdentityResolver {
    directory: Arc<DirectoryCache>,
}

impl IdentityResolver {
    pub fn new(directory: Arc<DirectoryCache>) -> Self {
        Self { directory }
    }

    /// Resolve a reference to a member gid.
    ///
    /// Tries, in order: canonical-gid pass-through, exact alias match, then
    /// fuzzy substring containment scored `min(len) / max(len)` over every
    /// alias that is not a gid self-mapping. The best candidate must score
    /// strictly above 0.3; on a score tie the lexicographically smallest alias
    /// wins, because the index is scanned in ascending alias order and only a
    /// strictly greater score replaces the running best.
    ///
    /// Never fails: input that matches nothing comes back as
    /// `Unresolved` carrying the original text, for the caller to pass
    /// through.
    pub async fn resolve(&self, reference: &str) -> MemberRef {
        if is_canonical_gid(reference) {
            return MemberRef::Resolved(reference.to_string());
        }

        let snapshot = self.directory.snapshot(false).await;
        let needle = reference.trim().to_lowercase();
        if needle.is_empty() {
            return MemberRef::Unresolved(reference.to_string());
        }

        if let Some(gid) = snapshot.lookup(&needle) {
            return MemberRef::Resolved(gid.to_string());
        }

        let mut best: Option<(&str, f64)> = None;
        for (alias, gid) in snapshot.aliases() {
            // gid self-mappings exist only for exact pass-through; scoring
            // them would let unrelated numeric input latch onto a member.
            if alias == gid {
                continue;
            }
            let Some(score) = containment_score(&needle, alias) else {
                continue;
            };
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((gid, score));
            }
        }

        match best {
            Some((gid, score)) if score > SCORE_THRESHOLD => {
                debug!(reference, gid, score, "fuzzy-resolved member");
                MemberRef::Resolved(gid.to_string())
            }
            _ => MemberRef::Unresolved(reference.to_string()),
        }
    }
}

/// Containment score for a pair of lowercased strings: if one contains the
/// other, the ratio of the shorter to the longer length; otherwise no score.
fn containment_score(a: &str, b: &str) -> Option<f64> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    if a.contains(b) || b.contains(a) {
        let (min, max) = if a.len() <= b.len() {
            (a.len(), b.len())
        } else {
            (b.len(), a.len())
        };
        #[allow(clippy::cast_precision_loss)]
        Some(min as f64 / max as f64)
    } else {
        None
    }
}

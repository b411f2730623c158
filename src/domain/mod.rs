//! Domain facades for the resolution engine.
//!
//! These combine the Asana collaborator with the matching and scoring policies
//! that turn free-text references into canonical gids.

pub mod dates;
mod directory;
mod identity;
mod locate;

pub use directory::{CacheSnapshot, DirectoryCache, DEFAULT_TTL_SECS};
pub use identity::{is_canonical_gid, IdentityResolver};
pub use locate::TaskLocator;

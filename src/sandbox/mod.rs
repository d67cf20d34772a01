//! Confinement of every filesystem access to the shared directory.
//!
//! - **`resolver`**: the [`SandboxRoot`] handle, request-target normalization and path resolution
//! - **`beneath`**: descriptor-relative lookups that never leave the root (unix)
//! - **`listing`**: directory listings and their one-line-per-entry rendering

#[cfg(unix)]
mod beneath;
pub mod listing;
pub mod resolver;

pub use listing::DirectoryListing;
pub use resolver::{normalize_target, Resolved, ResolvedEntry, SandboxRoot};

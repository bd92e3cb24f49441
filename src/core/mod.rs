//! Core data structures.
//!
//! - Bazel identifiers (RepositoryId, PackageId, TargetId)
//! - Providers recorded for analyzed targets
//! - Repositories and the workspace shared across translation passes

pub mod bazelrc;
pub mod label;
pub mod provider;
pub mod repository;
pub mod workspace;

pub use label::{parse_absolute_target, LabelError, PackageId, RepositoryId, TargetId};
pub use provider::{CMakeTarget, Provider, TargetInfo};
pub use repository::Repository;
pub use workspace::{Workspace, WorkspaceError};

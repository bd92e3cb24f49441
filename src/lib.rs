//! bazel-to-cmake - Translate Bazel repositories into CMake projects
//!
//! A translation pass runs once per repository. The top-level pass creates a
//! [`Workspace`], lowers the rules it knows about into a CMake script and
//! saves the workspace; dependency passes, started from the generated CMake,
//! reload that snapshot so labels across repositories resolve consistently.

pub mod cmake;
pub mod core;
pub mod evaluation;
pub mod ops;
pub mod rules;
pub mod util;

pub use crate::core::{
    label::{PackageId, RepositoryId, TargetId},
    provider::{CMakeTarget, Provider, TargetInfo},
    repository::Repository,
    workspace::Workspace,
};

pub use evaluation::EvaluationState;
pub use ops::translate::{translate, TranslateOptions};

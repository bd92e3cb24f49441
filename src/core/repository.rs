//! A single Bazel repository and the CMake project generated for it.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::label::RepositoryId;
use crate::core::workspace::Workspace;
use crate::util::fs::to_posix_string;

/// A Bazel repository bound to one generated CMake project.
///
/// Each translation pass operates on one primary repository. In the top-level
/// pass only the top-level repository exists; in a dependency pass the
/// reloaded workspace also holds the top-level repository, so that labels of
/// the top-level project still resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub repository_id: RepositoryId,
    pub cmake_project_name: String,
    /// Absolute binary directory, always with `/` separators.
    pub cmake_binary_dir: String,
    /// Absolute source directory, always with `/` separators.
    pub source_directory: String,
    pub top_level: bool,
    /// Maps repository names as written in this repository to the names used
    /// by the workspace.
    pub repo_mapping: BTreeMap<String, String>,
}

impl Repository {
    /// Create a repository and register it with `workspace`.
    ///
    /// Fails if the registration would leave the workspace without exactly
    /// one top-level repository.
    ///
    /// # Panics
    ///
    /// Panics if `bazel_repo_name` is empty.
    pub fn create(
        workspace: &mut Workspace,
        bazel_repo_name: &str,
        cmake_project_name: &str,
        cmake_binary_dir: &Path,
        source_directory: &Path,
        top_level: bool,
    ) -> Result<RepositoryId> {
        assert!(!bazel_repo_name.is_empty(), "repository name must not be empty");

        let cmake_binary_dir = std::path::absolute(cmake_binary_dir).with_context(|| {
            format!("invalid binary directory: {}", cmake_binary_dir.display())
        })?;
        let source_directory = std::path::absolute(source_directory).with_context(|| {
            format!("invalid source directory: {}", source_directory.display())
        })?;

        let repository = Repository {
            repository_id: RepositoryId::new(bazel_repo_name),
            cmake_project_name: cmake_project_name.to_string(),
            cmake_binary_dir: to_posix_string(&cmake_binary_dir),
            source_directory: to_posix_string(&source_directory),
            top_level,
            repo_mapping: BTreeMap::new(),
        };
        let id = repository.repository_id.clone();
        workspace.register_repository(repository)?;
        Ok(id)
    }

    /// The binary directory as a path.
    pub fn binary_dir(&self) -> &Path {
        Path::new(&self.cmake_binary_dir)
    }
}

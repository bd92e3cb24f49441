//! State threaded through rule lowering.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::cmake::CMakeBuilder;
use crate::core::label::{LabelError, RepositoryId, TargetId};
use crate::core::provider::CMakeTarget;
use crate::core::repository::Repository;
use crate::core::workspace::{Workspace, WorkspaceError};

/// Everything a rule needs while it is being lowered: the workspace, the
/// repository being translated and the script being generated.
pub struct EvaluationState<'a> {
    pub workspace: &'a mut Workspace,
    pub builder: &'a mut CMakeBuilder,
    repository_id: RepositoryId,
    /// The executable nested projects invoke to translate their sources.
    program: PathBuf,
}

impl<'a> EvaluationState<'a> {
    pub fn new(
        workspace: &'a mut Workspace,
        builder: &'a mut CMakeBuilder,
        repository_id: RepositoryId,
        program: PathBuf,
    ) -> Self {
        EvaluationState {
            workspace,
            builder,
            repository_id,
            program,
        }
    }

    /// The repository currently being translated.
    pub fn repo(&self) -> Result<&Repository, WorkspaceError> {
        self.workspace
            .repository(&self.repository_id)
            .ok_or_else(|| WorkspaceError::UnknownRepository(self.repository_id.clone()))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Resolve a label written in the current repository.
    ///
    /// Relative labels resolve against the repository root; repository names
    /// go through the repository's remap table.
    pub fn resolve_label(&self, label: &str) -> Result<TargetId> {
        let repo = self.repo()?;
        let target = repo.repository_id.package_id("").parse_target(label)?;
        Ok(target.remap_repo(&repo.repo_mapping))
    }

    /// Record a mapping from a Bazel target to a CMake target and/or package.
    pub fn set_bazel_target_mapping(
        &mut self,
        target: &str,
        cmake_target: Option<CMakeTarget>,
        cmake_package: Option<&str>,
    ) -> Result<(), LabelError> {
        self.workspace
            .set_bazel_target_mapping(target, cmake_target, cmake_package)
    }

    pub fn set_target_mapping(
        &mut self,
        target: TargetId,
        cmake_target: Option<CMakeTarget>,
        cmake_package: Option<&str>,
    ) {
        self.workspace
            .set_target_mapping(target, cmake_target, cmake_package);
    }
}

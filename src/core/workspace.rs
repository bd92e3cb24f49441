//! Workspace - state shared by every translation pass.
//!
//! The top-level pass creates the workspace and saves it; each dependency
//! pass reloads the snapshot, so that dependencies see the targets, options
//! and repositories of the top-level project.
//!
//! The workspace depends on the CMake build configuration, which allows
//! `select` expressions to be evaluated fully.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::bazelrc::{self, BazelrcOptions};
use crate::core::label::{parse_absolute_target, LabelError, RepositoryId, TargetId};
use crate::core::provider::{CMakeTarget, Provider, TargetInfo};
use crate::core::repository::Repository;
use crate::rules::{LibraryRegistry, ModuleRegistry};

/// Version of the snapshot format written by [`Workspace::save`].
pub const SNAPSHOT_VERSION: u32 = 1;

/// Errors raised by workspace bookkeeping.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("invalid quoting in {path}:{line}")]
    Bazelrc { path: String, line: usize },

    #[error("target `{0}` has already been analyzed")]
    AlreadyAnalyzed(TargetId),

    #[error("unknown module `{0}`")]
    UnknownModule(String),

    #[error("unknown repository `{0}`")]
    UnknownRepository(RepositoryId),

    #[error("repository `{repository}` conflicts with top-level repository `{existing}`")]
    TopLevelConflict {
        existing: RepositoryId,
        repository: RepositoryId,
    },

    #[error("workspace snapshot version {0} is not supported")]
    IncompatibleSnapshot(u32),
}

/// Relevant state of the entire Bazel workspace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Workspace {
    /// Variables provided by CMake.
    pub cmake_vars: BTreeMap<String, String>,

    /// Snapshot that nested projects load. Carried over when a dependency
    /// pass reloads the workspace.
    pub save_workspace: Option<PathBuf>,

    /// Maps Bazel repository names to CMake project names.
    pub bazel_to_cmake_deps: BTreeMap<RepositoryId, String>,

    repos: BTreeMap<RepositoryId, Repository>,

    top_level: Option<RepositoryId>,

    /// Every CMake project name registered by a repository.
    pub repo_cmake_packages: BTreeSet<String>,

    /// Platform name used for `build:<platform>` bazelrc groups.
    pub host_platform_name: Option<String>,

    /// `("define", "KEY=VALUE")` pairs from `--define`.
    pub values: BTreeSet<(String, String)>,

    pub copts: Vec<String>,

    pub cxxopts: Vec<String>,

    pub ignored_libraries: BTreeSet<TargetId>,

    modules: BTreeSet<String>,

    analyzed_targets: BTreeMap<TargetId, TargetInfo>,
}

/// On-disk form of a saved workspace.
#[derive(Serialize, Deserialize)]
struct WorkspaceSnapshot {
    version: u32,
    workspace: Workspace,
}

impl Workspace {
    /// Create a workspace for the platform this binary was built for.
    pub fn new(cmake_vars: BTreeMap<String, String>, save_workspace: Option<PathBuf>) -> Self {
        let platform = bazelrc::host_platform_name(std::env::consts::OS);
        Self::with_host_platform(cmake_vars, save_workspace, platform)
    }

    /// Create a workspace with an explicit host platform name.
    pub fn with_host_platform(
        cmake_vars: BTreeMap<String, String>,
        save_workspace: Option<PathBuf>,
        host_platform_name: Option<&str>,
    ) -> Self {
        Workspace {
            cmake_vars,
            save_workspace,
            host_platform_name: host_platform_name.map(str::to_string),
            ..Default::default()
        }
    }

    /// Load a workspace saved by a previous pass.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read workspace: {}", path.display()))?;
        let snapshot: WorkspaceSnapshot = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse workspace: {}", path.display()))?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(WorkspaceError::IncompatibleSnapshot(snapshot.version).into());
        }
        Ok(snapshot.workspace)
    }

    /// Save the workspace to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot = WorkspaceSnapshot {
            version: SNAPSHOT_VERSION,
            workspace: self.clone(),
        };
        let content =
            serde_json::to_string_pretty(&snapshot).context("failed to serialize workspace")?;
        crate::util::fs::write_string(path, &content)
    }

    /// Register a repository. Exactly one repository is top-level, and it
    /// cannot be registered again as a dependency.
    pub(crate) fn register_repository(
        &mut self,
        repository: Repository,
    ) -> Result<(), WorkspaceError> {
        let id = repository.repository_id.clone();
        if let Some(existing) = &self.top_level {
            if (repository.top_level && *existing != id)
                || (!repository.top_level && *existing == id)
            {
                return Err(WorkspaceError::TopLevelConflict {
                    existing: existing.clone(),
                    repository: id,
                });
            }
        }
        if repository.top_level {
            self.top_level = Some(id.clone());
        }
        self.repo_cmake_packages
            .insert(repository.cmake_project_name.clone());
        self.repos.insert(id, repository);
        Ok(())
    }

    /// Look up a repository. The empty id resolves to the top-level repository.
    pub fn repository(&self, id: &RepositoryId) -> Option<&Repository> {
        if id.is_main() {
            return self.top_level.as_ref().and_then(|top| self.repos.get(top));
        }
        self.repos.get(id)
    }

    /// Iterate over the registered repositories, each once.
    pub fn repositories(&self) -> impl Iterator<Item = &Repository> {
        self.repos.values()
    }

    /// Record that `mapped` refers to the repository `original` inside `repository_id`.
    pub fn add_repo_mapping(
        &mut self,
        repository_id: &RepositoryId,
        mapped: impl Into<String>,
        original: impl Into<String>,
    ) -> Result<(), WorkspaceError> {
        let id = if repository_id.is_main() {
            self.top_level.clone()
        } else {
            Some(repository_id.clone())
        };
        let repo = id
            .and_then(|id| self.repos.get_mut(&id))
            .ok_or_else(|| WorkspaceError::UnknownRepository(repository_id.clone()))?;
        repo.repo_mapping.insert(mapped.into(), original.into());
        Ok(())
    }

    /// Record a mapping from a Bazel target to a CMake target and/or package.
    pub fn set_bazel_target_mapping(
        &mut self,
        target: &str,
        cmake_target: Option<CMakeTarget>,
        cmake_package: Option<&str>,
    ) -> Result<(), LabelError> {
        let target = parse_absolute_target(target)?;
        self.set_target_mapping(target, cmake_target, cmake_package);
        Ok(())
    }

    /// Like [`Workspace::set_bazel_target_mapping`] for an already-parsed target.
    pub fn set_target_mapping(
        &mut self,
        target: TargetId,
        cmake_target: Option<CMakeTarget>,
        cmake_package: Option<&str>,
    ) {
        let mut providers = Vec::new();
        if let Some(cmake_target) = cmake_target {
            providers.push(Provider::CMakeDeps(vec![cmake_target]));
        }
        if let Some(cmake_package) = cmake_package {
            providers.push(Provider::CMakePackageDeps(vec![cmake_package.to_string()]));
        }
        self.analyzed_targets
            .insert(target, TargetInfo::new(providers));
    }

    /// Record the result of analyzing `target`.
    pub fn add_analyzed_target(
        &mut self,
        target: TargetId,
        info: TargetInfo,
    ) -> Result<(), WorkspaceError> {
        if self.analyzed_targets.contains_key(&target) {
            return Err(WorkspaceError::AlreadyAnalyzed(target));
        }
        self.analyzed_targets.insert(target, info);
        Ok(())
    }

    pub fn target_info(&self, target: &TargetId) -> Option<&TargetInfo> {
        self.analyzed_targets.get(target)
    }

    pub fn analyzed_targets(&self) -> impl Iterator<Item = (&TargetId, &TargetInfo)> {
        self.analyzed_targets.iter()
    }

    /// Mark a bzl library as ignored; loading it yields a stand-in.
    pub fn ignore_library(&mut self, target: TargetId) {
        self.ignored_libraries.insert(target);
    }

    pub fn is_library_ignored(&self, target: &TargetId) -> bool {
        self.ignored_libraries.contains(target)
    }

    /// Drop every stored `TargetInfo` of `repository_id`.
    ///
    /// Aliases defined by the top-level project for a dependency must be
    /// removed before the dependency's real targets are analyzed.
    pub fn exclude_repo_targets(&mut self, repository_id: &RepositoryId) {
        let before = self.analyzed_targets.len();
        self.analyzed_targets
            .retain(|target, _| target.repository_id != *repository_id);
        tracing::debug!(
            "excluded {} targets of {}",
            before - self.analyzed_targets.len(),
            repository_id
        );
    }

    /// Load options from a `.bazelrc` file.
    pub fn load_bazelrc(&mut self, path: &Path) -> Result<()> {
        let options = bazelrc::read_bazelrc(path)?;
        self.add_bazelrc(&options);
        Ok(())
    }

    /// Merge options from a parsed `.bazelrc` file.
    pub fn add_bazelrc(&mut self, options: &BazelrcOptions) {
        let flags = bazelrc::extract_build_flags(options, self.host_platform_name.as_deref());
        self.values
            .extend(flags.defines.into_iter().map(|d| ("define".to_string(), d)));
        self.copts.extend(flags.copts);
        self.cxxopts.extend(flags.cxxopts);
    }

    /// Request that an extension module be loaded before evaluation.
    pub fn add_module(&mut self, module_name: impl Into<String>) {
        self.modules.insert(module_name.into());
    }

    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(String::as_str)
    }

    /// Load every module requested with [`Workspace::add_module`].
    pub fn load_modules(
        &self,
        modules: &ModuleRegistry,
        libraries: &mut LibraryRegistry,
    ) -> Result<(), WorkspaceError> {
        for name in &self.modules {
            let register = modules
                .get(name)
                .ok_or_else(|| WorkspaceError::UnknownModule(name.clone()))?;
            tracing::debug!("loading module {}", name);
            register(libraries);
        }
        Ok(())
    }
}

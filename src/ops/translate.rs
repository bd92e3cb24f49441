//! One translation pass over a repository.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::cmake::CMakeBuilder;
use crate::core::label::{parse_absolute_target, RepositoryId, TargetId};
use crate::core::provider::CMakeTarget;
use crate::core::repository::Repository;
use crate::core::workspace::Workspace;
use crate::evaluation::EvaluationState;
use crate::rules::{local_mirror, BzlLibrary, LibraryRegistry, LocalMirrorRule, ModuleRegistry};
use crate::util::fs::write_if_changed;

/// Declarations file read when `--declarations` is not given.
pub const DEFAULT_DECLARATIONS: &str = "bazel_to_cmake.toml";

/// Rule declarations for one repository.
#[derive(Debug, Default, Deserialize)]
pub struct Declarations {
    #[serde(default)]
    pub bazel_local_mirror: Vec<LocalMirrorRule>,
}

impl Declarations {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read declarations: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse declarations: {}", path.display()))
    }
}

/// Inputs of a translation pass.
#[derive(Debug, Clone, Default)]
pub struct TranslateOptions {
    pub cmake_vars: BTreeMap<String, String>,
    /// Workspace saved by the parent pass; absent for the top-level pass.
    pub load_workspace: Option<PathBuf>,
    /// Where this pass saves the workspace. Nothing is saved when absent.
    pub save_workspace: Option<PathBuf>,
    pub cmake_project_name: String,
    pub cmake_binary_dir: PathBuf,
    pub bazel_repo_name: String,
    pub source_dir: PathBuf,
    /// Defaults to `<binary dir>/build_rules.cmake`.
    pub build_rules_output: Option<PathBuf>,
    pub bazelrc: Vec<PathBuf>,
    pub modules: Vec<String>,
    pub ignore_libraries: Vec<String>,
    pub repo_mappings: Vec<(String, String)>,
    pub target_aliases: Vec<(String, String)>,
    /// Package globs restricting BUILD file analysis.
    pub include_packages: Vec<String>,
    pub exclude_packages: Vec<String>,
    /// Labels restricting analysis to specific targets.
    pub targets: Vec<String>,
    pub declarations: Option<PathBuf>,
    /// Executable that nested projects invoke.
    pub program: PathBuf,
}

/// What a pass produced.
#[derive(Debug)]
pub struct TranslateOutcome {
    pub build_rules_output: PathBuf,
    /// False when the output already had the generated content.
    pub written: bool,
    pub mirrors: usize,
    /// Targets requested with `targets`, resolved in this repository.
    pub targets: Vec<TargetId>,
}

/// Run one translation pass.
pub fn translate(opts: &TranslateOptions) -> Result<TranslateOutcome> {
    let top_level = opts.load_workspace.is_none();
    let mut workspace = match &opts.load_workspace {
        Some(path) => {
            let mut ws = Workspace::load(path)?;
            ws.cmake_vars.extend(opts.cmake_vars.clone());
            // Nested projects load this pass's own snapshot if it saves one,
            // otherwise the one it was loaded from.
            ws.save_workspace = opts
                .save_workspace
                .clone()
                .or_else(|| ws.save_workspace.take())
                .or_else(|| Some(path.clone()));
            ws
        }
        None => Workspace::new(opts.cmake_vars.clone(), opts.save_workspace.clone()),
    };

    let repository_id = RepositoryId::new(opts.bazel_repo_name.as_str());
    if !top_level {
        workspace.exclude_repo_targets(&repository_id);
    }
    Repository::create(
        &mut workspace,
        &opts.bazel_repo_name,
        &opts.cmake_project_name,
        &opts.cmake_binary_dir,
        &opts.source_dir,
        top_level,
    )?;
    tracing::info!(
        "translating {} as CMake project {}",
        repository_id,
        opts.cmake_project_name
    );

    for (mapped, original) in &opts.repo_mappings {
        workspace.add_repo_mapping(&repository_id, mapped.as_str(), original.as_str())?;
    }
    for path in &opts.bazelrc {
        workspace.load_bazelrc(path)?;
    }
    for label in &opts.ignore_libraries {
        workspace.ignore_library(parse_absolute_target(label)?);
    }
    workspace.add_module(local_mirror::MODULE_NAME);
    for module in &opts.modules {
        workspace.add_module(module.as_str());
    }

    let mut libraries = LibraryRegistry::default();
    workspace.load_modules(&ModuleRegistry::builtin(), &mut libraries)?;

    let declarations = match &opts.declarations {
        Some(path) => Declarations::load(path)?,
        None => {
            let path = opts.source_dir.join(DEFAULT_DECLARATIONS);
            if path.exists() {
                Declarations::load(&path)?
            } else {
                Declarations::default()
            }
        }
    };

    let mut builder = CMakeBuilder::new();
    let mut state = EvaluationState::new(
        &mut workspace,
        &mut builder,
        repository_id,
        opts.program.clone(),
    );

    for (label, alias) in &opts.target_aliases {
        let target = state.resolve_label(label)?;
        state.set_target_mapping(
            target,
            Some(CMakeTarget::new(alias.as_str())),
            Some(opts.cmake_project_name.as_str()),
        );
    }

    // Only declarations are lowered, so package and target filters are
    // validated but select nothing further.
    let targets = opts
        .targets
        .iter()
        .map(|label| state.resolve_label(label))
        .collect::<Result<Vec<_>>>()?;
    if !opts.include_packages.is_empty() || !opts.exclude_packages.is_empty() {
        tracing::debug!(
            "package filters: include {:?}, exclude {:?}",
            opts.include_packages,
            opts.exclude_packages
        );
    }

    let mut mirrors = 0;
    if !declarations.bazel_local_mirror.is_empty() {
        match libraries.resolve(&*state.workspace, &local_mirror::library()) {
            Some(BzlLibrary::LocalMirror) => {
                for rule in &declarations.bazel_local_mirror {
                    local_mirror::local_mirror(&mut state, rule)
                        .with_context(|| format!("failed to translate local mirror `{}`", rule.name))?;
                    mirrors += 1;
                }
            }
            Some(BzlLibrary::Ignored) => {
                tracing::info!("{} is ignored, skipping local mirrors", local_mirror::library());
            }
            None => bail!("{} is not loaded", local_mirror::library()),
        }
    }

    let build_rules_output = opts
        .build_rules_output
        .clone()
        .unwrap_or_else(|| opts.cmake_binary_dir.join("build_rules.cmake"));
    let written = write_if_changed(&build_rules_output, builder.render().as_bytes())?;

    if let Some(path) = &opts.save_workspace {
        tracing::debug!("saving workspace to {}", path.display());
        workspace.save(path)?;
    }

    Ok(TranslateOutcome {
        build_rules_output,
        written,
        mirrors,
        targets,
    })
}

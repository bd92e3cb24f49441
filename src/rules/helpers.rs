//! Helpers shared by rules that generate nested bazel-to-cmake projects.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use anyhow::Result;

use crate::cmake::{quote_path, quote_string};
use crate::core::label::PackageId;
use crate::core::provider::CMakeTarget;
use crate::evaluation::EvaluationState;
use crate::rules::config::BazelToCmakeOptions;
use crate::rules::errors::MirrorError;

const ARG_SEP: &str = "\n        ";

/// Record a rule's `cmake_target_mapping` in the workspace.
///
/// Labels are resolved against `root` and remapped through `repo_mapping`.
/// Returns the mapping keyed by canonical label.
pub fn update_target_mapping(
    state: &mut EvaluationState<'_>,
    root: &PackageId,
    cmake_name: &str,
    target_mapping: &BTreeMap<String, String>,
    repo_mapping: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>> {
    let mut canonical = BTreeMap::new();
    for (relative_label, cmake_target) in target_mapping {
        let target = root.parse_target(relative_label)?.remap_repo(repo_mapping);
        canonical.insert(target.as_label(), cmake_target.clone());
        state.set_target_mapping(
            target,
            Some(CMakeTarget::new(cmake_target.clone())),
            Some(cmake_name),
        );
    }
    Ok(canonical)
}

/// Append the body of a nested `CMakeLists.txt` that re-runs bazel-to-cmake
/// on the dependency `name` and includes the rules it generates.
pub fn write_bazel_to_cmake_cmakelists(
    state: &EvaluationState<'_>,
    out: &mut String,
    name: &str,
    cmake_name: &str,
    options: &BazelToCmakeOptions,
    cmake_target_mapping: &BTreeMap<String, String>,
    repo_mapping: &BTreeMap<String, String>,
) -> Result<()> {
    let save_workspace = state
        .workspace
        .save_workspace
        .as_ref()
        .ok_or_else(|| MirrorError::WorkspaceNotSaved {
            repo: name.to_string(),
        })?;

    let mut args = vec![
        format!("--load-workspace {}", quote_path(save_workspace)),
        format!("--cmake-project-name {}", quote_string(cmake_name)),
        "--cmake-binary-dir \"${CMAKE_CURRENT_BINARY_DIR}\"".to_string(),
        format!("--bazel-repo-name {}", quote_string(name)),
        "--build-rules-output \"${CMAKE_CURRENT_BINARY_DIR}/build_rules.cmake\"".to_string(),
    ];
    for (mapped, original) in repo_mapping {
        args.push(format!(
            "--repo-mapping {} {}",
            quote_string(mapped),
            quote_string(original)
        ));
    }
    for package in &options.include {
        args.push(quote_string(&format!("--include-package={package}")));
    }
    for package in &options.exclude {
        args.push(quote_string(&format!("--exclude-package={package}")));
    }
    if options.aliased_targets_only {
        for label in cmake_target_mapping.keys() {
            args.push(format!("--target {}", quote_string(label)));
        }
    }
    for (label, alias) in cmake_target_mapping {
        args.push(format!(
            "--target-alias {} {}",
            quote_string(label),
            quote_string(alias)
        ));
    }
    args.extend(options.args.iter().cloned());

    write!(
        out,
        r#"
project({project})
execute_process(
  COMMAND {program}
        {args}
  WORKING_DIRECTORY "${{CMAKE_CURRENT_SOURCE_DIR}}"
  COMMAND_ERROR_IS_FATAL ANY)
include("${{CMAKE_CURRENT_BINARY_DIR}}/build_rules.cmake")
"#,
        project = quote_string(cmake_name),
        program = quote_path(state.program()),
        args = args.join(ARG_SEP),
    )?;
    Ok(())
}

//! CLI definitions using clap.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;

/// Translate a Bazel repository into CMake build rules
#[derive(Parser)]
#[command(name = "bazel-to-cmake")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, env = "BAZEL_TO_CMAKE_VERBOSE")]
    pub verbose: bool,

    /// CMake variable visible to the translation, as KEY=VALUE
    #[arg(long = "cmake-var", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub cmake_vars: Vec<(String, String)>,

    /// Workspace saved by the parent translation pass
    #[arg(long)]
    pub load_workspace: Option<PathBuf>,

    /// Where to save the workspace for dependency passes
    #[arg(long)]
    pub save_workspace: Option<PathBuf>,

    /// Name of the generated CMake project
    #[arg(long)]
    pub cmake_project_name: String,

    /// CMake binary directory of the project
    #[arg(long)]
    pub cmake_binary_dir: PathBuf,

    /// Bazel name of the repository being translated
    #[arg(long)]
    pub bazel_repo_name: String,

    /// Repository source directory (defaults to the current directory)
    #[arg(long)]
    pub source_dir: Option<PathBuf>,

    /// Output file for the generated rules
    #[arg(long)]
    pub build_rules_output: Option<PathBuf>,

    /// .bazelrc files to read options from
    #[arg(long)]
    pub bazelrc: Vec<PathBuf>,

    /// Extension module to load
    #[arg(long = "module")]
    pub modules: Vec<String>,

    /// Bzl library whose rules are skipped
    #[arg(long = "ignore-library", value_name = "LABEL")]
    pub ignore_libraries: Vec<String>,

    /// Repository name remapping inside this repository
    #[arg(long, num_args = 2, value_names = ["FROM", "TO"])]
    pub repo_mapping: Vec<String>,

    /// CMake target to use for a Bazel label
    #[arg(long, num_args = 2, value_names = ["LABEL", "CMAKE_TARGET"])]
    pub target_alias: Vec<String>,

    /// Package glob to translate
    #[arg(long = "include-package", value_name = "GLOB")]
    pub include_packages: Vec<String>,

    /// Package glob to skip
    #[arg(long = "exclude-package", value_name = "GLOB")]
    pub exclude_packages: Vec<String>,

    /// Restrict translation to a target
    #[arg(long = "target", value_name = "LABEL")]
    pub targets: Vec<String>,

    /// Rule declarations (defaults to bazel_to_cmake.toml in the source directory)
    #[arg(long, env = "BAZEL_TO_CMAKE_DECLARATIONS")]
    pub declarations: Option<PathBuf>,
}

/// Group a flat list of flag values into pairs.
pub fn pairs(values: &[String]) -> Vec<(String, String)> {
    values
        .chunks(2)
        .filter_map(|pair| match pair {
            [a, b] => Some((a.clone(), b.clone())),
            _ => None,
        })
        .collect()
}

fn parse_key_val(s: &str) -> Result<(String, String)> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("invalid KEY=VALUE: no `=` found in `{s}`"))?;
    if key.is_empty() {
        return Err(anyhow!("invalid KEY=VALUE: empty key in `{s}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("A=b=c").unwrap(),
            ("A".to_string(), "b=c".to_string())
        );
        assert!(parse_key_val("novalue").is_err());
        assert!(parse_key_val("=x").is_err());
    }

    #[test]
    fn test_pairs() {
        let cli = Cli::parse_from([
            "bazel-to-cmake",
            "--cmake-project-name",
            "P",
            "--cmake-binary-dir",
            "b",
            "--bazel-repo-name",
            "r",
            "--repo-mapping",
            "zlib",
            "net_zlib",
            "--repo-mapping",
            "png",
            "libpng",
            "--include-package=src/**",
            "--target",
            ":half",
        ]);
        assert_eq!(cli.include_packages, ["src/**"]);
        assert_eq!(cli.targets, [":half"]);
        assert_eq!(
            pairs(&cli.repo_mapping),
            [
                ("zlib".to_string(), "net_zlib".to_string()),
                ("png".to_string(), "libpng".to_string())
            ]
        );
    }
}

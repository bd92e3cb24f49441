//! Rule declarations as they appear in the declarations file.

use std::collections::BTreeMap;

use serde::de::IgnoredAny;
use serde::Deserialize;

/// Options for the nested bazel-to-cmake invocation of a dependency.
///
/// Its presence on a rule marks the rule as taking part in translation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BazelToCmakeOptions {
    /// Package globs the nested pass includes (`--include-package`).
    #[serde(default)]
    pub include: Vec<String>,

    /// Package globs the nested pass excludes (`--exclude-package`).
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Restrict the nested pass to the targets in `cmake_target_mapping`.
    #[serde(default)]
    pub aliased_targets_only: bool,

    /// Extra arguments appended to the nested invocation.
    #[serde(default)]
    pub args: Vec<String>,
}

/// A `bazel_local_mirror` declaration. Unrecognized keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalMirrorRule {
    pub name: String,

    #[serde(default)]
    pub cmake_name: Option<String>,

    #[serde(default)]
    pub bazel_to_cmake: Option<BazelToCmakeOptions>,

    /// Languages to `enable_language()` before the mirror is added.
    #[serde(default)]
    pub cmake_languages: Vec<String>,

    /// Paths, relative to the mirror directory, to materialize.
    #[serde(default)]
    pub files: Vec<String>,

    #[serde(default)]
    pub file_content: BTreeMap<String, String>,

    /// Candidate URLs per file; only the first is used.
    #[serde(default)]
    pub file_url: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub file_sha256: BTreeMap<String, String>,

    #[serde(default)]
    pub cmakelists_prefix: Option<String>,

    #[serde(default)]
    pub cmakelists_suffix: Option<String>,

    /// Labels (relative to the mirrored repository) to CMake target names.
    #[serde(default)]
    pub cmake_target_mapping: BTreeMap<String, String>,

    #[serde(default)]
    pub repo_mapping: BTreeMap<String, String>,

    #[serde(default)]
    pub build_file_content: Option<String>,

    #[serde(default)]
    pub cmake_package_redirect_extra: Option<IgnoredAny>,

    #[serde(default)]
    pub cmake_package_aliases: Option<IgnoredAny>,

    #[serde(default)]
    pub cmake_package_redirect_libraries: Option<IgnoredAny>,
}

impl LocalMirrorRule {
    /// The first unsupported package-redirect option present, if any.
    pub fn unsupported_option(&self) -> Option<&'static str> {
        if self.cmake_package_redirect_extra.is_some() {
            Some("cmake_package_redirect_extra")
        } else if self.cmake_package_aliases.is_some() {
            Some("cmake_package_aliases")
        } else if self.cmake_package_redirect_libraries.is_some() {
            Some("cmake_package_redirect_libraries")
        } else {
            None
        }
    }
}

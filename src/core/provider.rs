//! Facts recorded about analyzed targets.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A CMake target name produced for a Bazel target.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CMakeTarget(String);

impl CMakeTarget {
    pub fn new(name: impl Into<String>) -> Self {
        CMakeTarget(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CMakeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A typed fact attached to an analyzed target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
#[non_exhaustive]
pub enum Provider {
    /// CMake targets a dependent must link against.
    CMakeDeps(Vec<CMakeTarget>),
    /// CMake packages a dependent must `find_package`.
    CMakePackageDeps(Vec<String>),
}

/// The providers captured when a target was analyzed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetInfo {
    providers: Vec<Provider>,
}

impl TargetInfo {
    pub fn new(providers: impl IntoIterator<Item = Provider>) -> Self {
        TargetInfo {
            providers: providers.into_iter().collect(),
        }
    }

    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    /// The CMake targets, if this target carries a `CMakeDeps` provider.
    pub fn cmake_deps(&self) -> Option<&[CMakeTarget]> {
        self.providers.iter().find_map(|p| match p {
            Provider::CMakeDeps(targets) => Some(targets.as_slice()),
            _ => None,
        })
    }

    /// The CMake packages, if this target carries a `CMakePackageDeps` provider.
    pub fn cmake_package_deps(&self) -> Option<&[String]> {
        self.providers.iter().find_map(|p| match p {
            Provider::CMakePackageDeps(packages) => Some(packages.as_slice()),
            _ => None,
        })
    }
}

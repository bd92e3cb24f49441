//! Bazel label identification - WHICH target in WHICH repository.
//!
//! Labels are parsed once into `TargetId` values and compared by value
//! afterwards. The canonical string form is `@repo//package:name`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error produced when a label cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
    #[error("label `{0}` is not absolute (expected `@repo//package:name`)")]
    NotAbsolute(String),

    #[error("label `{0}` is empty")]
    Empty(String),

    #[error("invalid label `{label}`: {reason}")]
    Invalid { label: String, reason: &'static str },
}

/// A Bazel repository name.
///
/// The empty id refers to the repository currently driving evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepositoryId(String);

impl RepositoryId {
    pub fn new(name: impl Into<String>) -> Self {
        RepositoryId(name.into())
    }

    /// The id that aliases the top-level repository.
    pub fn main() -> Self {
        RepositoryId(String::new())
    }

    pub fn repository_name(&self) -> &str {
        &self.0
    }

    pub fn is_main(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the id of a package in this repository.
    pub fn package_id(&self, package_name: impl Into<String>) -> PackageId {
        PackageId {
            repository_id: self.clone(),
            package_name: package_name.into(),
        }
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// A package inside a repository.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackageId {
    pub repository_id: RepositoryId,
    pub package_name: String,
}

impl PackageId {
    /// Get the id of a target in this package.
    pub fn target_id(&self, target_name: impl Into<String>) -> TargetId {
        TargetId {
            repository_id: self.repository_id.clone(),
            package_name: self.package_name.clone(),
            target_name: target_name.into(),
        }
    }

    /// Parse a label relative to this package.
    ///
    /// Accepts `@repo//pkg:name`, `//pkg:name`, `:name` and a bare `name`.
    pub fn parse_target(&self, label: &str) -> Result<TargetId, LabelError> {
        if label.starts_with('@') {
            return parse_absolute_target(label);
        }
        if let Some(rest) = label.strip_prefix("//") {
            let (package_name, target_name) = split_package_and_target(label, rest, None)?;
            return Ok(self.repository_id.package_id(package_name).target_id(target_name));
        }
        let name = label.strip_prefix(':').unwrap_or(label);
        if name.is_empty() {
            return Err(LabelError::Empty(label.to_string()));
        }
        if name.contains(':') {
            return Err(LabelError::Invalid {
                label: label.to_string(),
                reason: "relative label contains more than one `:`",
            });
        }
        Ok(self.target_id(name))
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}//{}", self.repository_id.0, self.package_name)
    }
}

/// A fully-qualified Bazel target.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetId {
    pub repository_id: RepositoryId,
    pub package_name: String,
    pub target_name: String,
}

impl TargetId {
    /// Get the package containing this target.
    pub fn package_id(&self) -> PackageId {
        self.repository_id.package_id(self.package_name.clone())
    }

    /// The canonical `@repo//package:name` form.
    pub fn as_label(&self) -> String {
        self.to_string()
    }

    /// Replace the repository name through a remap table.
    pub fn remap_repo(&self, mapping: &BTreeMap<String, String>) -> TargetId {
        match mapping.get(self.repository_id.repository_name()) {
            Some(mapped) => TargetId {
                repository_id: RepositoryId::new(mapped.clone()),
                package_name: self.package_name.clone(),
                target_name: self.target_name.clone(),
            },
            None => self.clone(),
        }
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "@{}//{}:{}",
            self.repository_id.0, self.package_name, self.target_name
        )
    }
}

impl FromStr for TargetId {
    type Err = LabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_absolute_target(s)
    }
}

impl Serialize for TargetId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        // Targets are map keys in the workspace snapshot, so they must be strings.
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TargetId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_absolute_target(&s).map_err(serde::de::Error::custom)
    }
}

/// Parse an absolute label such as `@repo//pkg:name`.
///
/// `@repo//pkg` names the target after the last package component and a bare
/// `@repo` means `@repo//:repo`.
pub fn parse_absolute_target(label: &str) -> Result<TargetId, LabelError> {
    let rest = label
        .strip_prefix("@@")
        .or_else(|| label.strip_prefix('@'))
        .ok_or_else(|| LabelError::NotAbsolute(label.to_string()))?;

    let Some((repo, path)) = rest.split_once("//") else {
        if rest.is_empty() || rest.contains(':') || rest.contains('/') {
            return Err(LabelError::Invalid {
                label: label.to_string(),
                reason: "expected `//` after the repository name",
            });
        }
        return Ok(RepositoryId::new(rest).package_id("").target_id(rest));
    };

    let (package_name, target_name) = split_package_and_target(label, path, Some(repo))?;
    Ok(RepositoryId::new(repo)
        .package_id(package_name)
        .target_id(target_name))
}

fn split_package_and_target<'a>(
    label: &str,
    path: &'a str,
    repo: Option<&'a str>,
) -> Result<(&'a str, &'a str), LabelError> {
    let (package_name, target_name) = match path.split_once(':') {
        Some((package_name, target_name)) => (package_name, target_name),
        None => {
            let last = path.rsplit('/').next().unwrap_or(path);
            if last.is_empty() {
                // `@repo//` names the repository's root target.
                match repo {
                    Some(repo) if !repo.is_empty() => (path, repo),
                    _ => return Err(LabelError::Empty(label.to_string())),
                }
            } else {
                (path, last)
            }
        }
    };

    if target_name.is_empty() {
        return Err(LabelError::Empty(label.to_string()));
    }
    if target_name.contains(':') {
        return Err(LabelError::Invalid {
            label: label.to_string(),
            reason: "target name contains `:`",
        });
    }
    if package_name.ends_with('/') || package_name.starts_with('/') {
        return Err(LabelError::Invalid {
            label: label.to_string(),
            reason: "package path has a leading or trailing `/`",
        });
    }
    Ok((package_name, target_name))
}

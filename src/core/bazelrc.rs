//! `.bazelrc` parsing.
//!
//! Only the `build` group and the `build:<host platform>` group are relevant
//! for translation, and within those only `--copt`, `--cxxopt` and
//! `--define`.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::core::workspace::WorkspaceError;

/// Options grouped by their leading key (`build`, `build:linux`, ...).
pub type BazelrcOptions = BTreeMap<String, Vec<String>>;

/// Options that are handled by dedicated mechanisms and must not leak into
/// the global copt lists.
static FILTERED_COPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[-/]std|-fdiagnostics-color=|[-/]D)").unwrap());

/// Map an OS name (as in `std::env::consts::OS`) to the Bazel platform name
/// used in `build:<platform>` groups.
pub fn host_platform_name(os: &str) -> Option<&'static str> {
    match os {
        "windows" => Some("windows"),
        "linux" => Some("linux"),
        "macos" => Some("macos"),
        "freebsd" => Some("freebsd"),
        "openbsd" => Some("openbsd"),
        _ => None,
    }
}

/// Parse the text of a `.bazelrc` file.
///
/// `origin` is only used for error messages.
pub fn parse_bazelrc(text: &str, origin: &str) -> Result<BazelrcOptions, WorkspaceError> {
    let mut options = BazelrcOptions::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts = shlex::split(line).ok_or_else(|| WorkspaceError::Bazelrc {
            path: origin.to_string(),
            line: index + 1,
        })?;
        let mut parts = parts.into_iter();
        let Some(key) = parts.next() else {
            continue;
        };
        options.entry(key).or_default().extend(parts);
    }
    Ok(options)
}

/// Read and parse a `.bazelrc` file.
pub fn read_bazelrc(path: &Path) -> Result<BazelrcOptions> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read bazelrc: {}", path.display()))?;
    Ok(parse_bazelrc(&text, &path.display().to_string())?)
}

/// The flags extracted from the relevant option groups.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BuildFlags {
    pub copts: Vec<String>,
    pub cxxopts: Vec<String>,
    pub defines: Vec<String>,
}

/// Collect the `build` and `build:<platform>` groups and extract the flags
/// translation cares about. Unknown flags are ignored.
pub fn extract_build_flags(options: &BazelrcOptions, host_platform: Option<&str>) -> BuildFlags {
    let mut args: Vec<&str> = Vec::new();
    if let Some(build) = options.get("build") {
        args.extend(build.iter().map(String::as_str));
    }
    if let Some(platform) = host_platform {
        if let Some(platform_args) = options.get(&format!("build:{platform}")) {
            args.extend(platform_args.iter().map(String::as_str));
        }
    }

    let mut flags = BuildFlags::default();
    let mut iter = args.into_iter().peekable();
    while let Some(arg) = iter.next() {
        let (name, inline_value) = match arg.split_once('=') {
            Some((name, value)) if name.starts_with("--") => (name, Some(value)),
            _ => (arg, None),
        };
        let target = match name {
            "--copt" => &mut flags.copts,
            "--cxxopt" => &mut flags.cxxopts,
            "--define" => &mut flags.defines,
            _ => continue,
        };
        let value = match inline_value {
            Some(value) => value,
            // A following flag is left for the next iteration.
            None => match iter.next_if(|next| !next.starts_with("--")) {
                Some(value) => value,
                None => {
                    tracing::warn!("ignoring `{}` without a value in bazelrc", name);
                    continue;
                }
            },
        };
        target.push(value.to_string());
    }

    flags.copts.retain(|opt| !FILTERED_COPT.is_match(opt));
    flags.cxxopts.retain(|opt| !FILTERED_COPT.is_match(opt));
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accumulates_groups() {
        let text = r#"
# comment
build --copt=-O2
build:linux --copt "-Wall -Wextra"

build --define=FOO=1
"#;
        let options = parse_bazelrc(text, ".bazelrc").unwrap();
        assert_eq!(options["build"], ["--copt=-O2", "--define=FOO=1"]);
        assert_eq!(options["build:linux"], ["--copt", "-Wall -Wextra"]);
    }

    #[test]
    fn test_parse_rejects_unbalanced_quotes() {
        let err = parse_bazelrc("build --copt \"-O2\n", "x.bazelrc").unwrap_err();
        assert!(err.to_string().contains("x.bazelrc:1"));
    }

    #[test]
    fn test_extract_filters_and_platform() {
        let text = r#"
build --copt=-O2 --copt=-std=c++17 --cxxopt /std:c++17 --copt -DNDEBUG
build --copt=-fdiagnostics-color=always --cxxopt=-fno-exceptions
build --define absl=1 --unknown_flag value
build:linux --copt=-pthread
build:windows --copt=/bigobj
"#;
        let options = parse_bazelrc(text, ".bazelrc").unwrap();
        let flags = extract_build_flags(&options, Some("linux"));

        assert_eq!(flags.copts, ["-O2", "-pthread"]);
        assert_eq!(flags.cxxopts, ["-fno-exceptions"]);
        assert_eq!(flags.defines, ["absl=1"]);
    }

    #[test]
    fn test_extract_without_platform() {
        let options = parse_bazelrc("build:macos --copt=-fobjc-arc\n", ".bazelrc").unwrap();
        assert_eq!(extract_build_flags(&options, None), BuildFlags::default());
    }

    #[test]
    fn test_dangling_flag_is_skipped() {
        let options = parse_bazelrc("build --copt=-O1 --copt\n", ".bazelrc").unwrap();
        assert_eq!(extract_build_flags(&options, None).copts, ["-O1"]);
    }

    #[test]
    fn test_flag_followed_by_flag_is_skipped() {
        let options =
            parse_bazelrc("build --copt --define=X=1 --cxxopt --copt=-O2\n", ".bazelrc").unwrap();
        let flags = extract_build_flags(&options, None);

        assert_eq!(flags.copts, ["-O2"]);
        assert!(flags.cxxopts.is_empty());
        assert_eq!(flags.defines, ["X=1"]);
    }

    #[test]
    fn test_host_platform_table() {
        assert_eq!(host_platform_name("linux"), Some("linux"));
        assert_eq!(host_platform_name("macos"), Some("macos"));
        assert_eq!(host_platform_name("windows"), Some("windows"));
        assert_eq!(host_platform_name("freebsd"), Some("freebsd"));
        assert_eq!(host_platform_name("openbsd"), Some("openbsd"));
        assert_eq!(host_platform_name("solaris"), None);
    }
}

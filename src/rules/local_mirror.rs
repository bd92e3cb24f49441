//! CMake lowering of `bazel_local_mirror` from
//! `@com_google_tensorstore//bazel:local_mirror.bzl`.
//!
//! A local mirror is a third-party repository assembled from individual
//! files, each either given literally or downloaded with a mandatory SHA-256.
//! The files land in `<binary dir>/local_mirror/<cmake name>`, which gets a
//! nested `CMakeLists.txt` and is added as a subdirectory. A
//! `<name>-config.cmake` redirect makes `find_package(<name>)` resolve to the
//! mirror.

use std::path::Path;

use anyhow::{Context, Result};

use crate::cmake::{quote_path, quote_string, Section};
use crate::core::label::{RepositoryId, TargetId};
use crate::evaluation::EvaluationState;
use crate::rules::config::LocalMirrorRule;
use crate::rules::errors::MirrorError;
use crate::rules::helpers::{update_target_mapping, write_bazel_to_cmake_cmakelists};
use crate::rules::{BzlLibrary, LibraryRegistry};
use crate::util::fs::{ensure_dir, to_posix_string, write_string};
use crate::util::hash::normalize_sha256;

/// Name of the module providing this library.
pub const MODULE_NAME: &str = "bazel_to_cmake.bzl_library.local_mirror";

/// CMake variable naming the directory for `find_package` redirects.
pub const REDIRECTS_DIR_VAR: &str = "CMAKE_FIND_PACKAGE_REDIRECTS_DIR";

/// Label of the bzl library implemented here.
pub fn library() -> TargetId {
    RepositoryId::new("com_google_tensorstore")
        .package_id("bazel")
        .target_id("local_mirror.bzl")
}

/// Register the library with `libraries`.
pub fn register(libraries: &mut LibraryRegistry) {
    libraries.register(library(), BzlLibrary::LocalMirror);
}

/// Where the contents of one mirrored file come from.
#[derive(Debug, PartialEq, Eq)]
enum FileSource<'a> {
    Content(&'a str),
    Download { url: &'a str, sha256: String },
}

/// Decide the source of every file, failing before anything is written if a
/// download cannot be verified.
fn plan_files(rule: &LocalMirrorRule) -> Result<Vec<(&str, FileSource<'_>)>, MirrorError> {
    let mut plan = Vec::new();
    for file in &rule.files {
        if let Some(content) = rule.file_content.get(file) {
            plan.push((file.as_str(), FileSource::Content(content.as_str())));
            continue;
        }
        let Some(url) = rule.file_url.get(file).and_then(|urls| urls.first()) else {
            tracing::debug!("{}: no content or url for {}, skipping", rule.name, file);
            continue;
        };
        let digest = rule
            .file_sha256
            .get(file)
            .filter(|d| !d.is_empty())
            .ok_or_else(|| MirrorError::MissingSha256 {
                repo: rule.name.clone(),
                file: file.clone(),
            })?;
        let sha256 = normalize_sha256(digest).ok_or_else(|| MirrorError::InvalidSha256 {
            repo: rule.name.clone(),
            file: file.clone(),
            digest: digest.clone(),
        })?;
        plan.push((
            file.as_str(),
            FileSource::Download {
                url: url.as_str(),
                sha256,
            },
        ));
    }
    Ok(plan)
}

/// Lower one `bazel_local_mirror` declaration.
///
/// Declarations without `cmake_name` or `bazel_to_cmake` are skipped, which
/// lets a declaration opt out of translation.
pub fn local_mirror(state: &mut EvaluationState<'_>, rule: &LocalMirrorRule) -> Result<()> {
    let Some(cmake_name) = rule.cmake_name.as_deref().filter(|n| !n.is_empty()) else {
        return Ok(());
    };
    let Some(bazel_to_cmake) = &rule.bazel_to_cmake else {
        return Ok(());
    };

    // Everything that can reject the declaration is checked up front, so a
    // failing rule leaves no trace in the script or on disk.
    let plan = if rule.files.is_empty() {
        Vec::new()
    } else {
        if let Some(option) = rule.unsupported_option() {
            return Err(MirrorError::UnsupportedOption {
                repo: rule.name.clone(),
                option,
            }
            .into());
        }
        if rule.build_file_content.is_some() {
            return Err(MirrorError::BuildFileContent {
                repo: rule.name.clone(),
            }
            .into());
        }
        if !state.workspace.cmake_vars.contains_key(REDIRECTS_DIR_VAR) {
            return Err(MirrorError::MissingCMakeVar(REDIRECTS_DIR_VAR).into());
        }
        if state.workspace.save_workspace.is_none() {
            return Err(MirrorError::WorkspaceNotSaved {
                repo: rule.name.clone(),
            }
            .into());
        }
        plan_files(rule)?
    };

    let repository_id = RepositoryId::new(rule.name.as_str());
    state
        .workspace
        .bazel_to_cmake_deps
        .insert(repository_id.clone(), cmake_name.to_string());

    let root = repository_id.package_id("");
    let target_mapping = update_target_mapping(
        state,
        &root,
        cmake_name,
        &rule.cmake_target_mapping,
        &rule.repo_mapping,
    )?;
    let own_target = root.target_id(rule.name.as_str());
    if !target_mapping.contains_key(&own_target.as_label()) {
        state.set_target_mapping(own_target, None, Some(cmake_name));
    }

    for lang in &rule.cmake_languages {
        state
            .builder
            .addtext(&format!("enable_language({lang})\n"), Section::Declare, true);
    }

    if rule.files.is_empty() {
        return Ok(());
    }

    let local_mirror_dir = to_posix_string(
        &state
            .repo()?
            .binary_dir()
            .join("local_mirror")
            .join(cmake_name),
    );
    ensure_dir(Path::new(&local_mirror_dir))?;
    tracing::info!("materializing {} in {}", rule.name, local_mirror_dir);

    let mut downloads = String::new();
    for (file, source) in &plan {
        let file_path = format!("{local_mirror_dir}/{file}");
        match source {
            FileSource::Content(content) => {
                tracing::debug!("{}: writing {}", rule.name, file);
                write_string(Path::new(&file_path), content)?;
            }
            FileSource::Download { url, sha256 } => {
                tracing::debug!("{}: downloading {} from {}", rule.name, file, url);
                downloads.push_str(&format!(
                    "file(DOWNLOAD {} {}\n     EXPECTED_HASH \"SHA256={}\")\n\n",
                    quote_string(url),
                    quote_string(&file_path),
                    sha256
                ));
            }
        }
    }

    state.builder.addtext(
        &format!("# Loading {}\n", repository_id.repository_name()),
        Section::Declare,
        false,
    );
    state.builder.addtext(&downloads, Section::Declare, false);
    state.builder.addtext(
        &format!(
            "add_subdirectory({} EXCLUDE_FROM_ALL)\n",
            quote_path(&local_mirror_dir)
        ),
        Section::Declare,
        false,
    );

    let mut cmakelists = format!("set(CMAKE_MESSAGE_INDENT \"[{cmake_name}] \")\n");
    if let Some(prefix) = &rule.cmakelists_prefix {
        cmakelists.push_str(prefix);
    }
    write_bazel_to_cmake_cmakelists(
        state,
        &mut cmakelists,
        &rule.name,
        cmake_name,
        bazel_to_cmake,
        &target_mapping,
        &rule.repo_mapping,
    )?;
    if let Some(suffix) = &rule.cmakelists_suffix {
        cmakelists.push_str(suffix);
    }
    write_string(
        &Path::new(&local_mirror_dir).join("CMakeLists.txt"),
        &cmakelists,
    )?;

    // Consumers use find_package(); provide a -config.cmake for it.
    let redirects_dir = state
        .workspace
        .cmake_vars
        .get(REDIRECTS_DIR_VAR)
        .ok_or(MirrorError::MissingCMakeVar(REDIRECTS_DIR_VAR))?;
    let lower = cmake_name.to_lowercase();
    let config_path = Path::new(redirects_dir).join(format!("{lower}-config.cmake"));
    write_string(
        &config_path,
        &format!(
            "\nset({lower}_ROOT_DIR {})\nset({lower}_FOUND ON)\nset({}_FOUND ON)\n",
            quote_string(&local_mirror_dir),
            cmake_name.to_uppercase()
        ),
    )
    .with_context(|| format!("failed to write package redirect for {}", rule.name))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::PathBuf;

    use serde::de::IgnoredAny;
    use tempfile::TempDir;

    use crate::cmake::CMakeBuilder;
    use crate::core::repository::Repository;
    use crate::core::workspace::Workspace;
    use crate::rules::config::BazelToCmakeOptions;

    const SHA: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    struct Fixture {
        tmp: TempDir,
        ws: Workspace,
        builder: CMakeBuilder,
        repo: RepositoryId,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            let mut vars = BTreeMap::new();
            vars.insert(
                REDIRECTS_DIR_VAR.to_string(),
                tmp.path().join("redirects").display().to_string(),
            );
            let mut ws = Workspace::new(vars, Some(tmp.path().join("workspace.json")));
            let repo = Repository::create(
                &mut ws,
                "com_google_tensorstore",
                "tensorstore",
                &tmp.path().join("build"),
                tmp.path(),
                true,
            )
            .unwrap();
            Fixture {
                tmp,
                ws,
                builder: CMakeBuilder::new(),
                repo,
            }
        }

        fn lower(&mut self, rule: &LocalMirrorRule) -> Result<()> {
            let mut state = EvaluationState::new(
                &mut self.ws,
                &mut self.builder,
                self.repo.clone(),
                PathBuf::from("/usr/bin/bazel-to-cmake"),
            );
            local_mirror(&mut state, rule)
        }

        fn mirror_dir(&self, cmake_name: &str) -> PathBuf {
            self.tmp.path().join("build/local_mirror").join(cmake_name)
        }

        fn redirect(&self, lower: &str) -> PathBuf {
            self.tmp
                .path()
                .join("redirects")
                .join(format!("{lower}-config.cmake"))
        }

        fn declare(&self) -> &str {
            self.builder.section(Section::Declare)
        }
    }

    fn rule(name: &str, cmake_name: &str) -> LocalMirrorRule {
        LocalMirrorRule {
            name: name.to_string(),
            cmake_name: Some(cmake_name.to_string()),
            bazel_to_cmake: Some(BazelToCmakeOptions::default()),
            ..Default::default()
        }
    }

    fn map<V: Clone>(entries: &[(&str, V)]) -> BTreeMap<String, V> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_missing_cmake_name_is_noop() {
        let mut fx = Fixture::new();
        let mut r = rule("nasm", "NASM");
        r.cmake_name = None;
        r.files = vec!["a.txt".to_string()];
        fx.lower(&r).unwrap();

        assert!(fx.ws.bazel_to_cmake_deps.is_empty());
        assert!(fx.builder.is_empty());
    }

    #[test]
    fn test_missing_bazel_to_cmake_is_noop() {
        let mut fx = Fixture::new();
        let mut r = rule("nasm", "NASM");
        r.bazel_to_cmake = None;
        r.cmake_languages = vec!["ASM".to_string()];
        fx.lower(&r).unwrap();

        assert!(fx.ws.bazel_to_cmake_deps.is_empty());
        assert!(fx.builder.is_empty());
    }

    #[test]
    fn test_no_files_is_bookkeeping_only() {
        let mut fx = Fixture::new();
        let mut r = rule("nasm", "NASM");
        r.cmake_languages = vec!["ASM_NASM".to_string()];
        fx.lower(&r).unwrap();

        assert_eq!(fx.ws.bazel_to_cmake_deps[&RepositoryId::new("nasm")], "NASM");
        let info = fx.ws.target_info(&"@nasm//:nasm".parse().unwrap()).unwrap();
        assert_eq!(info.cmake_package_deps().unwrap(), ["NASM".to_string()]);
        assert_eq!(fx.declare(), "enable_language(ASM_NASM)\n");
        assert!(!fx.mirror_dir("NASM").exists());
        assert!(!fx.redirect("nasm").exists());
    }

    #[test]
    fn test_literal_content() {
        let mut fx = Fixture::new();
        let mut r = rule("hello_repo", "Hello");
        r.files = vec!["a.txt".to_string(), "sub/dir/b.h".to_string()];
        r.file_content = map(&[
            ("a.txt", "hello".to_string()),
            ("sub/dir/b.h", "#pragma once\n".to_string()),
        ]);
        // URL and digest are ignored when content is given.
        r.file_url = map(&[("a.txt", vec!["http://x/a.txt".to_string()])]);
        fx.lower(&r).unwrap();

        let dir = fx.mirror_dir("Hello");
        assert_eq!(fs::read_to_string(dir.join("a.txt")).unwrap(), "hello");
        assert_eq!(
            fs::read_to_string(dir.join("sub/dir/b.h")).unwrap(),
            "#pragma once\n"
        );
        assert!(!fx.declare().contains("file(DOWNLOAD"));
        assert!(fx.declare().starts_with("# Loading hello_repo\n"));
        assert!(fx.declare().contains("EXCLUDE_FROM_ALL)"));
    }

    #[test]
    fn test_download_requires_sha256() {
        let mut fx = Fixture::new();
        let mut r = rule("b_repo", "B");
        r.files = vec!["b.bin".to_string()];
        r.file_url = map(&[("b.bin", vec!["http://x/b.bin".to_string()])]);

        let err = fx.lower(&r).unwrap_err();
        let err = err.downcast_ref::<MirrorError>().unwrap();
        assert!(matches!(err, MirrorError::MissingSha256 { file, .. } if file == "b.bin"));
        assert!(fx.builder.is_empty());
        assert!(fx.ws.bazel_to_cmake_deps.is_empty());
        assert!(!fx.mirror_dir("B").exists());
    }

    #[test]
    fn test_invalid_sha256() {
        let mut fx = Fixture::new();
        let mut r = rule("b_repo", "B");
        r.files = vec!["b.bin".to_string()];
        r.file_url = map(&[("b.bin", vec!["http://x/b.bin".to_string()])]);
        r.file_sha256 = map(&[("b.bin", "not-a-digest".to_string())]);

        let err = fx.lower(&r).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MirrorError>(),
            Some(MirrorError::InvalidSha256 { .. })
        ));
    }

    #[test]
    fn test_verified_download() {
        let mut fx = Fixture::new();
        let mut r = rule("c_repo", "CRepo");
        r.files = vec!["c.bin".to_string()];
        r.file_url = map(&[(
            "c.bin",
            vec!["http://x/c.bin".to_string(), "http://mirror/c.bin".to_string()],
        )]);
        r.file_sha256 = map(&[("c.bin", SHA.to_string())]);
        fx.lower(&r).unwrap();

        let declare = fx.declare();
        assert_eq!(declare.matches("file(DOWNLOAD").count(), 1);
        assert!(declare.contains("file(DOWNLOAD \"http://x/c.bin\""));
        assert!(!declare.contains("http://mirror/c.bin"));
        assert!(declare.contains(&format!("EXPECTED_HASH \"SHA256={SHA}\")")));

        let binary_dir = &fx.ws.repository(&fx.repo).unwrap().cmake_binary_dir;
        let dir = format!("{binary_dir}/local_mirror/CRepo");
        assert!(declare.contains(&format!("\"{dir}/c.bin\"")));
        assert!(declare.contains(&format!("add_subdirectory(\"{dir}\" EXCLUDE_FROM_ALL)")));

        let redirect = fs::read_to_string(fx.redirect("crepo")).unwrap();
        assert!(redirect.contains(&format!("set(crepo_ROOT_DIR \"{dir}\")")));
        assert!(redirect.contains("set(crepo_FOUND ON)"));
        assert!(redirect.contains("set(CREPO_FOUND ON)"));
    }

    #[test]
    fn test_file_without_source_is_skipped() {
        let mut fx = Fixture::new();
        let mut r = rule("d_repo", "D");
        r.files = vec!["missing.txt".to_string(), "present.txt".to_string()];
        r.file_content = map(&[("present.txt", "x".to_string())]);
        fx.lower(&r).unwrap();

        let dir = fx.mirror_dir("D");
        assert!(!dir.join("missing.txt").exists());
        assert!(dir.join("present.txt").exists());
        assert!(dir.join("CMakeLists.txt").exists());
    }

    #[test]
    fn test_languages_enabled_once_across_repositories() {
        let mut fx = Fixture::new();
        let mut first = rule("nasm", "NASM");
        first.cmake_languages = vec!["ASM_NASM".to_string()];
        first.files = vec!["a.asm".to_string()];
        first.file_content = map(&[("a.asm", "nop".to_string())]);
        let mut second = rule("yasm", "YASM");
        second.cmake_languages = vec!["ASM_NASM".to_string(), "C".to_string()];

        fx.lower(&first).unwrap();
        fx.lower(&second).unwrap();

        assert_eq!(fx.declare().matches("enable_language(ASM_NASM)").count(), 1);
        assert_eq!(fx.declare().matches("enable_language(C)").count(), 1);
        assert!(fx.declare().starts_with("enable_language(ASM_NASM)\n"));
    }

    #[test]
    fn test_unsupported_option_with_files() {
        let mut fx = Fixture::new();
        let mut r = rule("e_repo", "E");
        r.files = vec!["e.txt".to_string()];
        r.file_content = map(&[("e.txt", "e".to_string())]);
        r.cmake_package_aliases = Some(IgnoredAny);

        let err = fx.lower(&r).unwrap_err();
        assert!(err.to_string().contains("cmake_package_aliases"));
        assert!(!fx.redirect("e").exists());
        assert!(!fx.mirror_dir("E").exists());
    }

    #[test]
    fn test_unsupported_option_without_files_is_ignored() {
        let mut fx = Fixture::new();
        let mut r = rule("e_repo", "E");
        r.cmake_package_redirect_libraries = Some(IgnoredAny);
        fx.lower(&r).unwrap();
        assert!(fx.ws.bazel_to_cmake_deps.contains_key(&RepositoryId::new("e_repo")));
    }

    #[test]
    fn test_build_file_content_rejected() {
        let mut fx = Fixture::new();
        let mut r = rule("f_repo", "F");
        r.files = vec!["f.txt".to_string()];
        r.build_file_content = Some("cc_library(name = 'f')".to_string());
        assert!(fx.lower(&r).is_err());
    }

    #[test]
    fn test_missing_redirects_dir() {
        let mut fx = Fixture::new();
        fx.ws.cmake_vars.clear();
        let mut r = rule("g_repo", "G");
        r.files = vec!["g.txt".to_string()];
        r.file_content = map(&[("g.txt", "g".to_string())]);

        let err = fx.lower(&r).unwrap_err();
        assert!(err.to_string().contains(REDIRECTS_DIR_VAR));
    }

    #[test]
    fn test_nested_cmakelists() {
        let mut fx = Fixture::new();
        let mut r = rule("h_repo", "H");
        r.files = vec!["h.txt".to_string()];
        r.file_content = map(&[("h.txt", "h".to_string())]);
        r.cmakelists_prefix = Some("# prefix\n".to_string());
        r.cmakelists_suffix = Some("# suffix\n".to_string());
        r.cmake_target_mapping = map(&[(":h", "H::h".to_string())]);

        let path = fx.mirror_dir("H").join("CMakeLists.txt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "stale").unwrap();

        fx.lower(&r).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("set(CMAKE_MESSAGE_INDENT \"[H] \")\n# prefix\n"));
        assert!(text.contains("project(\"H\")"));
        assert!(text.contains("--target-alias \"@h_repo//:h\" \"H::h\""));
        assert!(text.ends_with("# suffix\n"));
        assert!(!text.contains("stale"));

        let info = fx.ws.target_info(&"@h_repo//:h".parse().unwrap()).unwrap();
        assert_eq!(info.cmake_deps().unwrap()[0].as_str(), "H::h");
        // The rule's own target is still registered as a package.
        assert!(fx.ws.target_info(&"@h_repo//:h_repo".parse().unwrap()).is_some());
    }

    #[test]
    fn test_library_label() {
        assert_eq!(
            library().as_label(),
            "@com_google_tensorstore//bazel:local_mirror.bzl"
        );
    }
}

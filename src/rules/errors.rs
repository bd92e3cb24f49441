//! Rule configuration errors. Each aborts the translation pass.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("local_mirror `{repo}` requires SHA256 for downloaded file: {file}")]
    MissingSha256 { repo: String, file: String },

    #[error("local_mirror `{repo}` has an invalid SHA256 for {file}: `{digest}`")]
    InvalidSha256 {
        repo: String,
        file: String,
        digest: String,
    },

    #[error("CMake option `{option}` is not supported by local_mirror `{repo}`")]
    UnsupportedOption { repo: String, option: &'static str },

    #[error("build_file_content is not allowed in `{repo}`")]
    BuildFileContent { repo: String },

    #[error("CMake variable `{0}` is not set")]
    MissingCMakeVar(&'static str),

    #[error("`{repo}` generates a nested project, which requires a saved workspace")]
    WorkspaceNotSaved { repo: String },
}

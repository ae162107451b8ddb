//! Runtime error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while discovering, preparing or running modules.
///
/// Only [`CctError::ManifestParse`] is recoverable: discovery logs it and
/// skips the directory. Every other variant aborts the current module run.
#[derive(Error, Debug)]
pub enum CctError {
    #[error("cannot parse manifest {path}: {reason}")]
    ManifestParse { path: PathBuf, reason: String },

    #[error("cannot fetch dependency {url}: {reason}")]
    DependencyFetch { url: String, reason: String },

    #[error("cannot download artifact '{name}' from {url}: {reason}")]
    ArtifactDownload {
        name: String,
        url: String,
        reason: String,
    },

    #[error("artifact '{name}' from {url} doesn't match required checksum {expected} (got {actual})")]
    ArtifactIntegrity {
        name: String,
        url: String,
        expected: String,
        actual: String,
    },

    #[error("invalid artifact name '{0}' (must be a plain file name)")]
    InvalidArtifactName(String),

    #[error("unsupported checksum '{0}' (expected <algorithm>:<hexdigest>)")]
    UnsupportedChecksum(String),

    #[error("operation '{command}' is not supported by module {module}")]
    UnsupportedOperation { module: String, command: String },

    #[error("invalid arguments for '{command}': {reason}")]
    InvalidArguments { command: String, reason: String },

    #[error("required environment value '{0}' is not set")]
    MissingEnvironment(String),

    #[error("command failed: {cmd} (exit code: {code:?})\n{output}")]
    ExternalProcess {
        cmd: String,
        code: Option<i32>,
        output: String,
    },

    #[error("module {0} cannot be found")]
    ModuleNotFound(String),

    #[error("cannot parse change file {path}: {reason}")]
    ChangeParse { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = CctError> = std::result::Result<T, E>;

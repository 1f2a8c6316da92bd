use std::path::PathBuf;

use thiserror::Error;

/// Failures the subtitle pipeline distinguishes between.
///
/// Per-movie variants (`FileTooSmall`, `Io`, `NotFound`, `MergeFailure`) are
/// collected and reported after the run; the rest abort it.
#[derive(Debug, Error)]
pub enum SsError {
    #[error("{path} is too small to fingerprint ({size} bytes, need at least {min})")]
    FileTooSmall { path: PathBuf, size: u64, min: u64 },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no such file or directory: {path}")]
    NotFound { path: PathBuf },

    #[error("network error: {0}")]
    Network(String),

    #[error("login rejected: {0}")]
    Auth(String),

    #[error("unexpected response from search service: {0}")]
    Protocol(String),

    #[error("merge failed for {path}")]
    MergeFailure { path: PathBuf, output: String },

    #[error("{tool} not found in PATH")]
    ToolUnavailable { tool: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Text shown under the movie name in the failure listing.
    pub(crate) fn detail(&self) -> String {
        match self {
            Self::MergeFailure { output, .. } => output.clone(),
            other => other.to_string(),
        }
    }
}

//! Error types and exit codes for cie-core
//!
//! Only the terminal error categories from spec §7 (1 input validation, 5
//! batch oversize, 6 backend write failure, 7 cancellation) are represented
//! here. Per-file parse failures and per-item embedding failures are
//! non-fatal and are aggregated into `IngestionResult` counters instead.

use std::process::ExitCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CieError {
    #[error("invalid source: {message}")]
    InvalidSource { message: String },

    #[error("not found: {path}")]
    NotFound { path: String },

    #[error("path rejected: {path}: {reason}")]
    PathRejected { path: String, reason: String },

    #[error("unsupported language for extension: {extension}")]
    UnsupportedLanguage { extension: String },

    #[error("git error: {message}")]
    Git { message: String },

    #[error("not a git repository: {path}")]
    NotGitRepo { path: String },

    #[error("statement exceeds max size ({len} bytes > {max} bytes); preview: {preview}")]
    BatchOversize {
        len: usize,
        max: usize,
        preview: String,
    },

    #[error("backend write failed: {message}")]
    BackendWrite { message: String },

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("checkpoint mismatch: {message}")]
    Checkpoint { message: String },

    #[error("run canceled")]
    Canceled,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CieError {
    /// Map to a process exit code.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidSource { .. } => ExitCode::from(1),
            Self::NotFound { .. } => ExitCode::from(1),
            Self::PathRejected { .. } => ExitCode::from(1),
            Self::UnsupportedLanguage { .. } => ExitCode::from(2),
            Self::Git { .. } => ExitCode::from(5),
            Self::NotGitRepo { .. } => ExitCode::from(5),
            Self::BatchOversize { .. } => ExitCode::from(6),
            Self::BackendWrite { .. } => ExitCode::from(7),
            Self::Config { .. } => ExitCode::from(1),
            Self::Checkpoint { .. } => ExitCode::from(7),
            Self::Canceled => ExitCode::from(130),
            Self::Io(_) => ExitCode::from(1),
            Self::Json(_) => ExitCode::from(1),
        }
    }
}

/// Result type alias for cie-core operations
pub type Result<T> = std::result::Result<T, CieError>;

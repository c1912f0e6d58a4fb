//! Error types for easy-commit modules using thiserror.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from validating pipeline input (diffs, styles, conventions).
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Invalid diff input: diff must be a non-empty string")]
    EmptyDiff,

    #[error("Invalid diff input: content is not text (binary or invalid UTF-8)")]
    NotText,

    #[error("Invalid style '{0}'. Valid styles are: short, long, concise, creative")]
    InvalidStyle(String),

    #[error("Invalid commit message convention: {0}")]
    InvalidConvention(String),

    #[error("Failed to read input: {0}")]
    ReadFailed(#[source] std::io::Error),
}

/// Errors from repository access.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Not a git repository: {}. Run this command inside a git repository.", .0.display())]
    NotARepository(PathBuf),

    #[error("Git operation failed: {0}")]
    Git(#[source] git2::Error),

    #[error("Failed to create commit: {0}")]
    CommitFailed(#[source] git2::Error),

    #[error("Git config error (missing user.name or user.email): {0}")]
    SignatureMissing(#[source] git2::Error),
}

/// Errors from credential lookup and storage.
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Gemini API key is not set. Set GEMINI_API_KEY or run `easy-commit configure`.")]
    Missing,

    #[error("No existing API key found to reset")]
    NotConfigured,

    #[error("Failed to read credential file {}: {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },

    #[error("Failed to write credential file: {0}")]
    WriteFailed(#[source] std::io::Error),

    #[error("Could not determine the home directory for the credential file")]
    NoHomeDirectory,
}

/// Errors from the generation endpoint and its response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Invalid API key. Please check your GEMINI_API_KEY.")]
    InvalidCredential,

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("Gemini API server error (HTTP {status}). Please try again later.")]
    ServiceUnavailable { status: u16 },

    #[error("Request to Gemini API timed out after {0} seconds. Please try again.")]
    Timeout(u64),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid response from Gemini API: {0}")]
    InvalidResponse(String),

    #[error("Invalid request (HTTP {status}): {message}")]
    RequestRejected { status: u16, message: String },
}

impl GenerationError {
    /// Whether a caller-level retry has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GenerationError::RateLimited
                | GenerationError::ServiceUnavailable { .. }
                | GenerationError::Timeout(_)
                | GenerationError::NetworkError(_)
        )
    }
}

/// Errors surfaced by the end-to-end commit message pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("No changes staged. Stage your changes using `git add` before generating a commit message.")]
    NoChanges,
}

impl PipelineError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::Input(_) | PipelineError::Repository(_) => 1,
            PipelineError::Credential(_) => 2,
            PipelineError::NoChanges => 3,
            PipelineError::Generation(_) => 4,
        }
    }
}

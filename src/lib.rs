//! easy-commit - A CLI tool that writes git commit messages with Gemini.
//!
//! # Overview
//!
//! easy-commit reads the staged changes of a repository, classifies them,
//! and, for ordinary code changes, sends a cleaned diff to the Gemini
//! `generateContent` endpoint. The returned text is normalized into a
//! single-line message that can be committed directly.
//!
//! Change sets with nothing to narrate (whitespace-only edits, renames,
//! permission changes, binaries, empty files, merge conflicts) are reported
//! with a deterministic summary instead of being sent to the model.

pub mod commit;
pub mod config;
pub mod credential;
pub mod display;
pub mod error;
pub mod gemini;

// Re-export commonly used types
pub use commit::{ChangeCategory, DiffInput, Generated, Prepared, StyleDirective};
pub use config::{Settings, UnstagedFallback};
pub use credential::ApiKey;
pub use error::{CredentialError, GenerationError, InputError, PipelineError, RepositoryError};
pub use gemini::{GeminiClient, MessageGenerator};

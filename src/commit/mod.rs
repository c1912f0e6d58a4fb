//! Commit message preparation: diff signals, classification, sanitization,
//! prompt construction, and commit application.

pub mod classify;
pub mod history;
pub mod message;
pub mod prompt;
pub mod sanitize;
pub mod signals;

pub use classify::{ChangeCategory, DiffText, classify, classify_custom};
pub use history::recent_history;
pub use message::{
    DiffInput, Generated, PipelineOptions, Prepared, SelectedChanges, apply_commit,
    describe_changes, generate_message, load_custom_diff, prepare_request, select_changes,
};
pub use prompt::{CustomConvention, GenerationRequest, RecentHistory, StyleDirective, build_prompt};
pub use sanitize::{SanitizedDiff, sanitize};
pub use signals::{DiffScope, DiffSignals, FileStatus, StagedFile, collect_signals, open_repository};

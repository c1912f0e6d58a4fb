//! Change classification.
//!
//! Some change sets have nothing worth narrating (a rename, a chmod, a
//! whitespace reflow). Those short-circuit the pipeline with a deterministic
//! summary instead of being sent to the model.

use std::fmt;

use crate::commit::signals::{DiffSignals, FileStatus};
use crate::error::InputError;

/// Label placed before the raw diff in a whitespace-only summary.
pub const WHITESPACE_ONLY_LABEL: &str = "Whitespace-only changes:\n";

/// A unified diff body that is known to be text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffText(String);

impl DiffText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Decode raw bytes, rejecting anything that is not UTF-8 text.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, InputError> {
        if bytes.contains(&0) {
            return Err(InputError::NotText);
        }
        String::from_utf8(bytes)
            .map(Self)
            .map_err(|_| InputError::NotText)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for DiffText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What kind of change set is staged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeCategory {
    /// Ordinary code changes; carries the full diff.
    Normal(DiffText),
    WhitespaceOnly(String),
    EmptyFileChange(String),
    RenameOnly(String),
    PermissionChange(String),
    BinaryChange(String),
    MergeConflict(String),
    NoChanges,
}

impl ChangeCategory {
    /// Human-readable summary for categories that skip generation.
    pub fn summary(&self) -> Option<&str> {
        match self {
            ChangeCategory::WhitespaceOnly(s)
            | ChangeCategory::EmptyFileChange(s)
            | ChangeCategory::RenameOnly(s)
            | ChangeCategory::PermissionChange(s)
            | ChangeCategory::BinaryChange(s)
            | ChangeCategory::MergeConflict(s) => Some(s),
            ChangeCategory::Normal(_) | ChangeCategory::NoChanges => None,
        }
    }

    /// Short heading shown above the summary.
    pub fn label(&self) -> &'static str {
        match self {
            ChangeCategory::Normal(_) => "Code changes",
            ChangeCategory::WhitespaceOnly(_) => "Only whitespace changed",
            ChangeCategory::EmptyFileChange(_) => "Empty files added or removed",
            ChangeCategory::RenameOnly(_) => "Files renamed or moved",
            ChangeCategory::PermissionChange(_) => "File permissions changed",
            ChangeCategory::BinaryChange(_) => "Binary files changed",
            ChangeCategory::MergeConflict(_) => "Unresolved merge conflicts",
            ChangeCategory::NoChanges => "No changes",
        }
    }

    pub fn is_normal(&self) -> bool {
        matches!(self, ChangeCategory::Normal(_))
    }
}

/// Classify a signals bundle. The first matching rule wins.
pub fn classify(signals: &DiffSignals) -> ChangeCategory {
    if signals.staged_files.is_empty() {
        return ChangeCategory::NoChanges;
    }

    if is_whitespace_only(signals) {
        return ChangeCategory::WhitespaceOnly(format!(
            "{WHITESPACE_ONLY_LABEL}{}",
            signals.diff_text
        ));
    }

    if !signals.empty_files.is_empty() {
        return ChangeCategory::EmptyFileChange(signals.empty_files.join("\n"));
    }

    if !signals.renames.is_empty() {
        return ChangeCategory::RenameOnly(signals.renames.join("\n"));
    }

    if !signals.mode_changes.is_empty() {
        return ChangeCategory::PermissionChange(signals.mode_changes.join("\n"));
    }

    let binary: Vec<&str> = signals
        .numstat
        .iter()
        .map(String::as_str)
        .filter(|line| is_binary_numstat(line))
        .collect();
    if !binary.is_empty() {
        return ChangeCategory::BinaryChange(binary.join("\n"));
    }

    if !signals.conflicts.is_empty() {
        return ChangeCategory::MergeConflict(signals.conflicts.join("\n"));
    }

    ChangeCategory::Normal(DiffText::new(signals.diff_text.clone()))
}

/// Classify a diff the user supplied directly. No repository signals exist,
/// so only emptiness is checked.
pub fn classify_custom(diff: DiffText) -> ChangeCategory {
    if diff.is_blank() {
        ChangeCategory::NoChanges
    } else {
        ChangeCategory::Normal(diff)
    }
}

/// Only content edits can be whitespace-only. An added, deleted or renamed
/// file is a structural change even when its text diff is empty.
fn is_whitespace_only(signals: &DiffSignals) -> bool {
    signals.whitespace_insensitive_diff.trim().is_empty()
        && !signals.diff_text.trim().is_empty()
        && signals
            .staged_files
            .iter()
            .all(|f| f.status == FileStatus::Modified)
}

/// A numstat line whose add/delete counts are not numbers (`-\t-\tpath`).
fn is_binary_numstat(line: &str) -> bool {
    let mut fields = line.split('\t');
    match (fields.next(), fields.next()) {
        (Some(adds), Some(dels)) => {
            adds.parse::<u64>().is_err() || dels.parse::<u64>().is_err()
        }
        _ => false,
    }
}

//! The commit message pipeline: select changes, prepare a prompt, generate,
//! and apply the resulting commit.

use std::path::Path;

use git2::{ErrorCode, Oid, Repository};
use tracing::{debug, warn};

use crate::commit::classify::{ChangeCategory, DiffText, classify, classify_custom};
use crate::commit::prompt::{
    CustomConvention, GenerationRequest, RecentHistory, StyleDirective, build_prompt,
};
use crate::commit::sanitize::{SanitizedDiff, sanitize};
use crate::commit::signals::{DiffScope, DiffSignals, collect_signals};
use crate::config::{DEFAULT_LANGUAGE, DEFAULT_MAX_DIFF_LINES, UnstagedFallback};
use crate::credential::ApiKey;
use crate::error::{GenerationError, InputError, PipelineError, RepositoryError};
use crate::gemini::client::MessageGenerator;
use crate::gemini::response::normalize;
use crate::gemini::retry::generate_with_retry;

/// The diff a message is generated for.
#[derive(Debug, Clone)]
pub enum DiffInput {
    /// Signals collected from a repository.
    Repository(DiffSignals),
    /// A diff the user supplied directly.
    Custom(DiffText),
}

/// Changes picked from a repository, and which side they came from.
#[derive(Debug, Clone)]
pub struct SelectedChanges {
    pub signals: DiffSignals,
    pub scope: DiffScope,
}

/// Options for one run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub style: StyleDirective,
    pub language: String,
    pub max_lines: usize,
    pub history: Option<RecentHistory>,
    pub convention: Option<CustomConvention>,
    /// Number of sequential suggestions to request.
    pub suggestions: u32,
    /// Extra attempts after transient generation failures.
    pub extra_attempts: u32,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            style: StyleDirective::default(),
            language: DEFAULT_LANGUAGE.to_string(),
            max_lines: DEFAULT_MAX_DIFF_LINES,
            history: None,
            convention: None,
            suggestions: 1,
            extra_attempts: 0,
        }
    }
}

/// Outcome of preparing a request.
#[derive(Debug, Clone)]
pub enum Prepared {
    /// Nothing worth sending to the model; show the category summary instead.
    EarlyExit(ChangeCategory),
    /// A prompt ready to send.
    Ready {
        prompt: String,
        sanitized: SanitizedDiff,
    },
}

/// Outcome of a full generation run.
#[derive(Debug, Clone)]
pub enum Generated {
    /// Nothing worth sending to the model; show the category summary instead.
    EarlyExit(ChangeCategory),
    /// Normalized suggestions, in request order.
    Messages {
        messages: Vec<String>,
        sanitized: SanitizedDiff,
    },
}

/// Pick the changes to describe.
///
/// Staged changes win. When nothing is staged and the fallback is enabled,
/// unstaged changes to tracked files are used instead.
pub fn select_changes(
    repo: &Repository,
    fallback: UnstagedFallback,
) -> Result<SelectedChanges, RepositoryError> {
    let staged = collect_signals(repo, DiffScope::Staged)?;
    if !staged.staged_files.is_empty() || fallback == UnstagedFallback::Disabled {
        return Ok(SelectedChanges {
            signals: staged,
            scope: DiffScope::Staged,
        });
    }

    let unstaged = collect_signals(repo, DiffScope::Unstaged)?;
    if unstaged.staged_files.is_empty() {
        return Ok(SelectedChanges {
            signals: staged,
            scope: DiffScope::Staged,
        });
    }

    warn!(
        "No staged changes; falling back to {} unstaged file(s)",
        unstaged.staged_files.len()
    );
    Ok(SelectedChanges {
        signals: unstaged,
        scope: DiffScope::Unstaged,
    })
}

/// Read a user-supplied diff from a file.
pub fn load_custom_diff(path: &Path) -> Result<DiffText, InputError> {
    let bytes = std::fs::read(path).map_err(InputError::ReadFailed)?;
    DiffText::from_bytes(bytes)
}

/// Classify the input and, for ordinary changes, build the prompt.
pub fn prepare_request(
    input: &DiffInput,
    options: &PipelineOptions,
) -> Result<Prepared, PipelineError> {
    let category = match input {
        DiffInput::Repository(signals) => classify(signals),
        DiffInput::Custom(diff) => classify_custom(diff.clone()),
    };
    debug!("Change category: {}", category.label());

    let diff = match category {
        ChangeCategory::NoChanges => return Err(PipelineError::NoChanges),
        ChangeCategory::Normal(diff) => diff,
        other => return Ok(Prepared::EarlyExit(other)),
    };

    let sanitized = sanitize(diff.as_str(), options.max_lines)?;

    let mut request = GenerationRequest::new(sanitized.text.clone(), options.style)
        .with_language(options.language.clone());
    if let Some(history) = &options.history {
        request = request.with_history(history.clone());
    }
    if let Some(convention) = &options.convention {
        request = request.with_convention(convention.clone());
    }

    let prompt = build_prompt(&request)?;
    debug!(
        "Prompt ready: {} chars, {} diff lines, truncated={}",
        prompt.len(),
        sanitized.text.lines().count(),
        sanitized.truncated
    );

    Ok(Prepared::Ready { prompt, sanitized })
}

/// One generate-then-normalize pass.
pub async fn generate_message<G>(
    generator: &G,
    prompt: &str,
    key: &ApiKey,
) -> Result<String, GenerationError>
where
    G: MessageGenerator + ?Sized,
{
    let raw = generator.generate(prompt, key).await?;
    normalize(&raw)
}

/// Run the whole pipeline for `input`.
///
/// A `style` given as text is parsed first and replaces `options.style`.
/// The credential is requested only once a prompt is ready, so an invalid
/// style, an early exit, or an empty change set never needs an API key and
/// never reaches `generator`.
pub async fn describe_changes<G, C>(
    generator: &G,
    input: &DiffInput,
    style: Option<&str>,
    options: PipelineOptions,
    credential: C,
) -> Result<Generated, PipelineError>
where
    G: MessageGenerator + ?Sized,
    C: FnOnce() -> Result<ApiKey, PipelineError>,
{
    let options = match style {
        Some(raw) => PipelineOptions {
            style: raw.parse()?,
            ..options
        },
        None => options,
    };

    let (prompt, sanitized) = match prepare_request(input, &options)? {
        Prepared::EarlyExit(category) => return Ok(Generated::EarlyExit(category)),
        Prepared::Ready { prompt, sanitized } => (prompt, sanitized),
    };

    let key = credential()?;

    let count = options.suggestions.max(1);
    let mut messages = Vec::with_capacity(count as usize);
    for _ in 0..count {
        messages.push(generate_with_retry(generator, &prompt, &key, options.extra_attempts).await?);
    }

    Ok(Generated::Messages {
        messages,
        sanitized,
    })
}

/// Commit the index with `message`.
///
/// For unstaged changes, modifications to tracked files are staged first.
/// Works on a branch with no commits yet.
pub fn apply_commit(
    repo: &Repository,
    message: &str,
    scope: DiffScope,
) -> Result<Oid, RepositoryError> {
    let mut index = repo.index().map_err(RepositoryError::Git)?;
    if scope == DiffScope::Unstaged {
        index
            .update_all(["*"].iter(), None)
            .map_err(RepositoryError::Git)?;
        index.write().map_err(RepositoryError::Git)?;
    }

    let tree_id = index.write_tree().map_err(RepositoryError::CommitFailed)?;
    let tree = repo
        .find_tree(tree_id)
        .map_err(RepositoryError::CommitFailed)?;

    let sig = repo.signature().map_err(RepositoryError::SignatureMissing)?;

    let parent = match repo.head() {
        Ok(head) => Some(head.peel_to_commit().map_err(RepositoryError::Git)?),
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => None,
        Err(e) => return Err(RepositoryError::Git(e)),
    };
    let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

    let oid = repo
        .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .map_err(RepositoryError::CommitFailed)?;

    debug!("Created commit {}", oid);
    Ok(oid)
}

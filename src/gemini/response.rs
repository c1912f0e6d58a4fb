//! Parsing and cleanup of `generateContent` responses.

use std::sync::LazyLock;

use regex_lite::Regex;
use serde::Deserialize;

use crate::error::GenerationError;

static COMMIT_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^commit:\s*").expect("Invalid regex"));
static NEWLINE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\r\n]+").expect("Invalid regex"));

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Extract and clean the generated message from a raw response body.
pub fn normalize(raw_body: &str) -> Result<String, GenerationError> {
    let response: GenerateContentResponse = serde_json::from_str(raw_body)
        .map_err(|e| GenerationError::InvalidResponse(format!("malformed JSON: {e}")))?;

    let block_reason = response
        .prompt_feedback
        .and_then(|f| f.block_reason)
        .map(|r| format!(" (blocked: {r})"))
        .unwrap_or_default();

    let candidate = response
        .candidates
        .and_then(|c| c.into_iter().next())
        .ok_or_else(|| {
            GenerationError::InvalidResponse(format!("no candidates in response{block_reason}"))
        })?;

    let finish_reason = candidate
        .finish_reason
        .map(|r| format!(" (finish reason: {r})"))
        .unwrap_or_default();

    let text = candidate
        .content
        .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
        .ok_or_else(|| {
            GenerationError::InvalidResponse(format!("no text in response{finish_reason}"))
        })?;

    normalize_text(&text)
}

/// Clean generated text into a single-line message.
///
/// Each pass trims, strips one surrounding quote on each side, drops a
/// leading `commit:` label, and folds newline runs into spaces. Passes repeat
/// until the text is stable, so cleaning a cleaned message is a no-op.
///
/// Repeating passes departs from a single cleanup pass on purpose: nested
/// quote pairs and stacked labels are all removed (`""x""` becomes `x`,
/// not `"x"`), which is what makes the cleanup idempotent.
pub fn normalize_text(text: &str) -> Result<String, GenerationError> {
    let mut current = text.to_string();
    loop {
        let next = clean_once(&current);
        if next == current {
            break;
        }
        current = next;
    }

    if current.is_empty() {
        return Err(GenerationError::InvalidResponse(
            "generated message is empty".to_string(),
        ));
    }
    Ok(current)
}

fn clean_once(text: &str) -> String {
    let trimmed = text.trim();
    let unquoted = trimmed
        .strip_prefix(['"', '\''])
        .unwrap_or(trimmed);
    let unquoted = unquoted.strip_suffix(['"', '\'']).unwrap_or(unquoted);
    let unlabeled = COMMIT_LABEL.replace(unquoted, "");
    NEWLINE_RUN.replace_all(&unlabeled, " ").trim().to_string()
}

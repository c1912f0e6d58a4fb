//! Diff sanitization for prompt inclusion.

use tracing::warn;

use crate::error::InputError;

/// Line prefixes that carry diff metadata rather than changed content.
const METADATA_PREFIXES: [&str; 3] = ["---", "+++", "@@"];

/// Sanitized diff text ready for a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedDiff {
    pub text: String,
    /// Whether lines were dropped at the cap.
    pub truncated: bool,
    /// Number of content lines dropped at the cap.
    pub omitted_lines: usize,
}

/// Strip file and hunk headers and blank lines, then keep at most
/// `max_lines` lines.
///
/// Truncation is silent in the returned text; `truncated` and
/// `omitted_lines` let the caller report it.
pub fn sanitize(diff: &str, max_lines: usize) -> Result<SanitizedDiff, InputError> {
    if diff.trim().is_empty() {
        return Err(InputError::EmptyDiff);
    }

    let content: Vec<&str> = diff
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !METADATA_PREFIXES.iter().any(|p| line.starts_with(p)))
        .collect();

    let omitted_lines = content.len().saturating_sub(max_lines);
    if omitted_lines > 0 {
        warn!(
            "Diff truncated to {} lines ({} lines omitted)",
            max_lines, omitted_lines
        );
    }

    let text = content
        .into_iter()
        .take(max_lines)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();

    Ok(SanitizedDiff {
        text,
        truncated: omitted_lines > 0,
        omitted_lines,
    })
}

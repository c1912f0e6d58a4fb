//! Prompt construction for commit message generation.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::config::{DEFAULT_HISTORY_DEPTH, DEFAULT_LANGUAGE};
use crate::error::InputError;

/// Requested tone and length of the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StyleDirective {
    #[default]
    Short,
    Long,
    Concise,
    Creative,
}

impl StyleDirective {
    /// All styles, in menu order.
    pub const ALL: [StyleDirective; 4] = [
        StyleDirective::Short,
        StyleDirective::Long,
        StyleDirective::Concise,
        StyleDirective::Creative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StyleDirective::Short => "short",
            StyleDirective::Long => "long",
            StyleDirective::Concise => "concise",
            StyleDirective::Creative => "creative",
        }
    }

    /// Phrasing hint placed in the prompt.
    pub fn hint(&self) -> &'static str {
        match self {
            StyleDirective::Short => "concise, one line, at most 50 characters",
            StyleDirective::Long => "a detailed explanation of the changes and their rationale",
            StyleDirective::Concise => "brief, key changes only",
            StyleDirective::Creative => "engaging but professional",
        }
    }
}

impl fmt::Display for StyleDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StyleDirective {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "short" => Ok(Self::Short),
            "long" => Ok(Self::Long),
            "concise" => Ok(Self::Concise),
            "creative" => Ok(Self::Creative),
            _ => Err(InputError::InvalidStyle(s.to_string())),
        }
    }
}

/// Recent commit summaries, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecentHistory(Vec<String>);

impl RecentHistory {
    /// Keeps at most `DEFAULT_HISTORY_DEPTH` entries; blank entries are dropped.
    pub fn new(entries: Vec<String>) -> Self {
        Self(
            entries
                .into_iter()
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
                .take(DEFAULT_HISTORY_DEPTH)
                .collect(),
        )
    }

    pub fn entries(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A user-supplied message convention, included in the prompt verbatim as JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomConvention(serde_json::Value);

impl CustomConvention {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn from_json_str(json: &str) -> Result<Self, InputError> {
        serde_json::from_str(json)
            .map(Self)
            .map_err(|e| InputError::InvalidConvention(e.to_string()))
    }

    /// Load a convention from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, InputError> {
        let content = std::fs::read_to_string(path).map_err(InputError::ReadFailed)?;
        Self::from_json_str(&content)
    }

    fn to_pretty_json(&self) -> Result<String, InputError> {
        serde_json::to_string_pretty(&self.0)
            .map_err(|e| InputError::InvalidConvention(e.to_string()))
    }
}

/// Everything the prompt is built from.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Sanitized diff body.
    pub diff: String,
    pub style: StyleDirective,
    pub history: Option<RecentHistory>,
    pub convention: Option<CustomConvention>,
    pub language: String,
}

impl GenerationRequest {
    pub fn new(diff: impl Into<String>, style: StyleDirective) -> Self {
        Self {
            diff: diff.into(),
            style,
            history: None,
            convention: None,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }

    pub fn with_history(mut self, history: RecentHistory) -> Self {
        self.history = Some(history).filter(|h| !h.is_empty());
        self
    }

    pub fn with_convention(mut self, convention: CustomConvention) -> Self {
        self.convention = Some(convention);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        let language = language.into();
        if !language.trim().is_empty() {
            self.language = language.trim().to_string();
        }
        self
    }
}

/// Build the instruction text sent to the model.
pub fn build_prompt(request: &GenerationRequest) -> Result<String, InputError> {
    let diff = request.diff.trim();
    if diff.is_empty() {
        return Err(InputError::EmptyDiff);
    }

    let mut prompt = format!(
        "Write a professional Git commit message in {language} for the following diff.\n\
         Style: {style} ({hint}).\n\
         Write a single paragraph in the present tense that starts with a lowercase verb \
         (for example \"add\", \"fix\", \"update\"). Reply with the commit message only.\n\
         \n\
         Diff:\n\
         {diff}\n",
        language = request.language,
        style = request.style,
        hint = request.style.hint(),
    );

    if let Some(history) = request.history.as_ref().filter(|h| !h.is_empty()) {
        prompt.push_str(
            "\nRecent commits, for context only. Match their tone and format, \
             but do not describe them:\n",
        );
        for entry in history.entries() {
            prompt.push_str("- ");
            prompt.push_str(entry);
            prompt.push('\n');
        }
    }

    if let Some(convention) = &request.convention {
        prompt.push_str("\nApply the following rules to the commit message:\n");
        prompt.push_str(&convention.to_pretty_json()?);
        prompt.push('\n');
    }

    Ok(prompt)
}

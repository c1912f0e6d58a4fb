//! Runtime settings: defaults, environment overrides, and CLI overrides.

use std::env;
use std::time::Duration;

use tracing::warn;

/// Gemini REST base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Default request timeout (30 seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum number of sanitized diff lines sent to the model.
pub const DEFAULT_MAX_DIFF_LINES: usize = 200;

/// Number of recent commits included as style context.
pub const DEFAULT_HISTORY_DEPTH: usize = 5;

/// Language the commit message is written in.
pub const DEFAULT_LANGUAGE: &str = "English";

const MODEL_ENV_VAR: &str = "EASY_COMMIT_MODEL";
const BASE_URL_ENV_VAR: &str = "EASY_COMMIT_BASE_URL";
const TIMEOUT_ENV_VAR: &str = "EASY_COMMIT_TIMEOUT";
const ALLOW_UNSTAGED_ENV_VAR: &str = "EASY_COMMIT_ALLOW_UNSTAGED";

/// What to do when nothing is staged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnstagedFallback {
    /// Fail with "no staged changes".
    #[default]
    Disabled,
    /// Use unstaged changes to tracked files and warn the user.
    WithWarning,
}

/// Sampling parameters sent in `generationConfig`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 1024,
        }
    }
}

/// Settings for one command invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub params: GenerationParams,
    pub max_diff_lines: usize,
    pub history_depth: usize,
    pub language: String,
    pub unstaged_fallback: UnstagedFallback,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            params: GenerationParams::default(),
            max_diff_lines: DEFAULT_MAX_DIFF_LINES,
            history_depth: DEFAULT_HISTORY_DEPTH,
            language: DEFAULT_LANGUAGE.to_string(),
            unstaged_fallback: UnstagedFallback::Disabled,
        }
    }
}

impl Settings {
    /// Defaults with `EASY_COMMIT_*` environment overrides applied.
    pub fn from_env() -> Self {
        let mut settings = Settings::default();

        if let Some(model) = non_empty_var(MODEL_ENV_VAR) {
            settings.model = model;
        }
        if let Some(base_url) = non_empty_var(BASE_URL_ENV_VAR) {
            settings.base_url = base_url.trim_end_matches('/').to_string();
        }
        settings.timeout = get_timeout();
        if env_flag(ALLOW_UNSTAGED_ENV_VAR) {
            settings.unstaged_fallback = UnstagedFallback::WithWarning;
        }

        settings
    }
}

/// Get the configured request timeout.
///
/// Reads from `EASY_COMMIT_TIMEOUT` if set, otherwise uses the default of
/// 30 seconds. Logs a warning if the variable is set but invalid.
fn get_timeout() -> Duration {
    match env::var(TIMEOUT_ENV_VAR) {
        Ok(v) if !v.is_empty() => match v.parse::<u64>() {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            _ => {
                warn!(
                    "Invalid {} value '{}', using default {}s",
                    TIMEOUT_ENV_VAR, v, DEFAULT_TIMEOUT_SECS
                );
                Duration::from_secs(DEFAULT_TIMEOUT_SECS)
            }
        },
        _ => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_flag(name: &str) -> bool {
    match non_empty_var(name) {
        Some(v) => matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => false,
    }
}

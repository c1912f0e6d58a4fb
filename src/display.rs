//! Console output: severity-prefixed colored lines.

use colored::{ColoredString, Colorize};

use crate::commit::ChangeCategory;

/// How a message is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn symbol(&self) -> &'static str {
        match self {
            Severity::Info => "ℹ",
            Severity::Success => "✔",
            Severity::Warning => "⚠",
            Severity::Error => "✘",
        }
    }

    fn paint(&self, text: &str) -> ColoredString {
        match self {
            Severity::Info => text.blue(),
            Severity::Success => text.green(),
            Severity::Warning => text.yellow(),
            Severity::Error => text.red(),
        }
    }
}

/// The uncolored line for a message.
pub fn prefixed(severity: Severity, message: &str) -> String {
    format!("{} {}", severity.symbol(), message)
}

/// Print a message. Errors go to stderr, everything else to stdout.
pub fn present(severity: Severity, message: &str) {
    let line = severity.paint(&prefixed(severity, message));
    match severity {
        Severity::Error => eprintln!("{line}"),
        _ => println!("{line}"),
    }
}

/// Show a generated message.
pub fn present_message(message: &str) {
    present(Severity::Success, "Generated commit message:");
    println!("\n  {}\n", message.bold());
}

/// Show numbered suggestions.
pub fn present_suggestions(messages: &[String]) {
    present(Severity::Success, "Generated commit suggestions:");
    for (i, message) in messages.iter().enumerate() {
        present(Severity::Info, &format!("{}: {}", i + 1, message));
    }
}

/// Show why no message was generated for a change set.
pub fn present_category(category: &ChangeCategory) {
    present(
        Severity::Warning,
        &format!("{}. No commit message generated.", category.label()),
    );
    if let Some(summary) = category.summary() {
        println!("{}", summary.dimmed());
    }
}

/// Steps for configuring the API key on the given platform
/// (`std::env::consts::OS` values).
pub fn setup_instructions(os: &str) -> Vec<(Severity, String)> {
    let mut lines = vec![(
        Severity::Warning,
        "To configure the GEMINI_API_KEY environment variable, use one of these methods:"
            .to_string(),
    )];

    match os {
        "windows" => {
            lines.push((Severity::Info, "1. For Command Prompt, run:".to_string()));
            lines.push((Severity::Info, "   set GEMINI_API_KEY=\"your_api_key\"".to_string()));
            lines.push((Severity::Info, "2. For PowerShell, run:".to_string()));
            lines.push((Severity::Info, "   $env:GEMINI_API_KEY=\"your_api_key\"".to_string()));
            lines.push((
                Severity::Info,
                "To set it permanently, use \"setx GEMINI_API_KEY\" or System Properties."
                    .to_string(),
            ));
        }
        "macos" | "linux" => {
            lines.push((Severity::Info, "1. For the current session, run:".to_string()));
            lines.push((Severity::Info, "   export GEMINI_API_KEY=\"your_api_key\"".to_string()));
            lines.push((
                Severity::Info,
                "2. To keep it, add the same line to your shell profile (~/.bashrc or ~/.zshrc) \
                 and reload it with `source`."
                    .to_string(),
            ));
            lines.push((
                Severity::Info,
                "3. Or create a .env file in your project directory containing:".to_string(),
            ));
            lines.push((Severity::Info, "   GEMINI_API_KEY=\"your_api_key\"".to_string()));
        }
        _ => {
            lines.push((
                Severity::Info,
                "Unknown platform. Set GEMINI_API_KEY manually.".to_string(),
            ));
        }
    }

    lines.push((
        Severity::Info,
        "Alternatively, run `easy-commit configure` to store the key interactively.".to_string(),
    ));
    lines
}

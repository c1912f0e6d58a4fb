//! easy-commit - CLI entry point.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use dialoguer::{Confirm, Editor, Password, Select};
use git2::Repository;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use easy_commit::commit::{
    CustomConvention, DiffInput, DiffScope, DiffText, Generated, PipelineOptions, StyleDirective,
    apply_commit, describe_changes, load_custom_diff, open_repository, recent_history,
    select_changes,
};
use easy_commit::config::{Settings, UnstagedFallback};
use easy_commit::credential::{
    ApiKey, default_config_path, reset_credential, resolve_credential, save_credential,
};
use easy_commit::display::{
    Severity, present, present_category, present_message, present_suggestions,
    setup_instructions,
};
use easy_commit::error::{CredentialError, PipelineError};
use easy_commit::gemini::GeminiClient;

/// Suggestion counts above this ask for confirmation first.
const MAX_UNCONFIRMED_SUGGESTIONS: u32 = 5;

/// Generate commit messages from staged changes using Gemini.
#[derive(Parser, Debug)]
#[command(name = "easy-commit")]
#[command(about = "Generate professional git commit messages with Gemini")]
#[command(version, args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    generate: GenerateArgs,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a commit message for the staged changes (default)
    Generate(GenerateArgs),
    /// Store or reset the Gemini API key
    Configure(ConfigureArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Message style: short, long, concise, or creative
    #[arg(short, long)]
    style: Option<String>,

    /// Language the message is written in
    #[arg(short, long)]
    language: Option<String>,

    /// Read the diff from a file instead of the repository
    #[arg(long, conflicts_with = "edit_diff")]
    diff_file: Option<PathBuf>,

    /// Write the diff in an editor instead of reading the repository
    #[arg(long)]
    edit_diff: bool,

    /// JSON file with commit message rules to apply
    #[arg(long)]
    convention: Option<PathBuf>,

    /// Number of suggestions to generate
    #[arg(short = 'n', long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    count: u32,

    /// Use unstaged changes to tracked files when nothing is staged
    #[arg(long)]
    allow_unstaged: bool,

    /// Extra attempts after transient API failures
    #[arg(long, default_value_t = 0)]
    retries: u32,

    /// Commit without asking for confirmation
    #[arg(short, long)]
    yes: bool,

    /// Print the message without committing
    #[arg(long, conflicts_with = "yes")]
    print_only: bool,

    /// Gemini model to use
    #[arg(long)]
    model: Option<String>,

    /// Maximum number of diff lines sent to the model
    #[arg(long)]
    max_lines: Option<usize>,

    /// Run as if started in this directory
    #[arg(short = 'C', value_name = "DIR")]
    directory: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ConfigureArgs {
    /// Delete the stored API key
    #[arg(long, conflicts_with = "key")]
    reset: bool,

    /// API key to store (prompted for when omitted)
    #[arg(long)]
    key: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Some(Command::Configure(args)) => run_configure(args),
        Some(Command::Generate(args)) => run_generate(args).await,
        None => run_generate(cli.generate).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report_failure(&err),
    }
}

/// Log to stderr. `-v` enables debug output for this crate; `RUST_LOG` wins.
fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "easy_commit=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn report_failure(err: &anyhow::Error) -> ExitCode {
    present(Severity::Error, &format!("{err:#}"));

    let pipeline = err.downcast_ref::<PipelineError>();
    if matches!(
        pipeline,
        Some(PipelineError::Credential(CredentialError::Missing))
    ) {
        for (severity, line) in setup_instructions(std::env::consts::OS) {
            present(severity, &line);
        }
    }

    ExitCode::from(pipeline.map(PipelineError::exit_code).unwrap_or(1))
}

fn cancelled() -> Result<()> {
    present(Severity::Info, "Operation cancelled by user");
    Ok(())
}

/// Ask a yes/no question. `None` means the prompt was interrupted.
fn confirm(prompt: &str, default: bool) -> Option<bool> {
    Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact()
        .ok()
}

async fn run_generate(args: GenerateArgs) -> Result<()> {
    let mut settings = Settings::from_env();
    if let Some(model) = &args.model {
        settings.model = model.clone();
    }
    if let Some(max_lines) = args.max_lines {
        settings.max_diff_lines = max_lines;
    }
    if let Some(language) = &args.language {
        settings.language = language.clone();
    }
    if args.allow_unstaged {
        settings.unstaged_fallback = UnstagedFallback::WithWarning;
    }

    // A style given on the command line is validated by the pipeline; only
    // an interactive choice happens here.
    let style = match &args.style {
        Some(_) => StyleDirective::default(),
        None if std::io::stdin().is_terminal() => match choose_style() {
            Some(style) => style,
            None => return cancelled(),
        },
        None => StyleDirective::default(),
    };

    let workdir = args.directory.clone().unwrap_or_else(|| PathBuf::from("."));
    let custom_diff = args.diff_file.is_some() || args.edit_diff;
    let repo = match open_repository(&workdir) {
        Ok(repo) => Some(repo),
        Err(_) if custom_diff => None,
        Err(e) => return Err(PipelineError::from(e).into()),
    };

    let (input, scope) = if let Some(path) = &args.diff_file {
        let diff = load_custom_diff(path).map_err(PipelineError::from)?;
        (DiffInput::Custom(diff), DiffScope::Staged)
    } else if args.edit_diff {
        match Editor::new().edit("").context("Failed to open editor")? {
            Some(text) => (DiffInput::Custom(DiffText::new(text)), DiffScope::Staged),
            None => return cancelled(),
        }
    } else {
        let repo = repo.as_ref().context("Not a git repository")?;
        let selected =
            select_changes(repo, settings.unstaged_fallback).map_err(PipelineError::from)?;
        if selected.scope == DiffScope::Unstaged {
            present(
                Severity::Warning,
                "No staged changes found. Using unstaged changes to tracked files.",
            );
        }
        (DiffInput::Repository(selected.signals), selected.scope)
    };

    let history = repo.as_ref().and_then(|repo| {
        recent_history(repo, settings.history_depth)
            .inspect_err(|e| warn!("Could not read recent commits: {e}"))
            .ok()
    });
    let convention = args
        .convention
        .as_deref()
        .map(CustomConvention::from_file)
        .transpose()
        .map_err(PipelineError::from)?;

    let options = PipelineOptions {
        style,
        language: settings.language.clone(),
        max_lines: settings.max_diff_lines,
        history,
        convention,
        suggestions: args.count,
        extra_attempts: args.retries,
    };

    if args.count > MAX_UNCONFIRMED_SUGGESTIONS {
        present(
            Severity::Warning,
            "Generating many suggestions may increase API usage costs.",
        );
        if confirm("Do you want to continue?", false) != Some(true) {
            return cancelled();
        }
    }

    let client = GeminiClient::new(&settings);
    let model = settings.model.clone();
    let credential = move || -> Result<ApiKey, PipelineError> {
        let key = resolve_api_key()?;
        present(
            Severity::Info,
            &format!("Generating commit message with {model}..."),
        );
        Ok(key)
    };

    let generation = describe_changes(
        &client,
        &input,
        args.style.as_deref(),
        options,
        credential,
    );
    let generated = tokio::select! {
        result = generation => result?,
        _ = tokio::signal::ctrl_c() => return cancelled(),
    };

    let (messages, sanitized) = match generated {
        Generated::EarlyExit(category) => {
            present_category(&category);
            return Ok(());
        }
        Generated::Messages {
            messages,
            sanitized,
        } => (messages, sanitized),
    };

    if sanitized.truncated {
        present(
            Severity::Warning,
            &format!(
                "Diff truncated to {} lines ({} lines omitted).",
                settings.max_diff_lines, sanitized.omitted_lines
            ),
        );
    }

    let message = match messages.as_slice() {
        [only] => {
            present_message(only);
            only.clone()
        }
        _ => {
            present_suggestions(&messages);
            if args.print_only {
                return Ok(());
            }
            match choose_suggestion(&messages) {
                Some(message) => message,
                None => return cancelled(),
            }
        }
    };

    if args.print_only {
        return Ok(());
    }

    let Some(repo) = repo else {
        present(
            Severity::Info,
            "Not inside a git repository; copy the message to use it.",
        );
        return Ok(());
    };

    if !args.yes {
        match confirm("Would you like to use this commit message?", true) {
            Some(true) => {}
            Some(false) => return Ok(()),
            None => return cancelled(),
        }
    }

    commit_message(&repo, &message, scope)
}

/// Resolve the stored API key. Called only once a prompt is ready.
fn resolve_api_key() -> Result<ApiKey, PipelineError> {
    let config_path = default_config_path()?;
    resolve_credential(&config_path)?.ok_or(PipelineError::Credential(CredentialError::Missing))
}

fn choose_style() -> Option<StyleDirective> {
    let index = Select::new()
        .with_prompt("What type of commit message would you like to generate?")
        .items(&StyleDirective::ALL)
        .default(0)
        .interact()
        .ok()?;
    StyleDirective::ALL.get(index).copied()
}

fn choose_suggestion(messages: &[String]) -> Option<String> {
    let index = Select::new()
        .with_prompt("Select the commit message you want to use")
        .items(messages)
        .default(0)
        .interact()
        .ok()?;
    messages.get(index).cloned()
}

fn commit_message(repo: &Repository, message: &str, scope: DiffScope) -> Result<()> {
    match apply_commit(repo, message, scope) {
        Ok(oid) => {
            let id = oid.to_string();
            present(
                Severity::Success,
                &format!("Commit {} created.", &id[..id.len().min(7)]),
            );
            Ok(())
        }
        Err(e) => {
            present(
                Severity::Warning,
                "Failed to apply the commit message. You can still copy and use it manually.",
            );
            Err(PipelineError::from(e).into())
        }
    }
}

fn run_configure(args: ConfigureArgs) -> Result<()> {
    let config_path = default_config_path().map_err(PipelineError::from)?;

    if args.reset {
        return match reset_credential(&config_path) {
            Ok(()) => {
                present(Severity::Success, "API key has been reset.");
                Ok(())
            }
            Err(CredentialError::NotConfigured) => {
                present(Severity::Warning, "No existing API key found to reset.");
                Ok(())
            }
            Err(e) => Err(PipelineError::from(e).into()),
        };
    }

    let raw = match args.key {
        Some(key) => key,
        None => {
            present(Severity::Info, "Please enter your Gemini API key.");
            Password::new()
                .with_prompt("Gemini API key")
                .interact()
                .context("Failed to read the API key")?
        }
    };

    let Some(key) = ApiKey::new(raw) else {
        bail!("API key cannot be empty.");
    };

    save_credential(&config_path, &key).map_err(PipelineError::from)?;
    present(
        Severity::Success,
        &format!("Gemini API key saved to {}", config_path.display()),
    );
    Ok(())
}

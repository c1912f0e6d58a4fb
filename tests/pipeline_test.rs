//! End-to-end tests: staged repository changes through to a created commit.

mod common;

use common::{TestRepo, read_fixture, response_fixture};
use easy_commit::commit::{
    DiffInput, DiffScope, Generated, PipelineOptions, Prepared, apply_commit, describe_changes,
    generate_message, prepare_request, recent_history, select_changes,
};
use easy_commit::config::{Settings, UnstagedFallback};
use easy_commit::credential::ApiKey;
use easy_commit::error::{CredentialError, InputError, PipelineError};
use easy_commit::gemini::{GeminiClient, generate_with_retry};
use easy_commit::{ChangeCategory, GenerationError};
use wiremock::matchers::{body_string_contains, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn success() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_string(read_fixture(response_fixture("success.json")))
}

fn client_for(server: &MockServer) -> GeminiClient {
    GeminiClient::new(&Settings {
        base_url: server.uri(),
        ..Settings::default()
    })
}

fn key() -> ApiKey {
    ApiKey::new("test-api-key").unwrap()
}

fn staged_change() -> TestRepo {
    let repo = TestRepo::new();
    repo.commit_file("src/cli.rs", "fn generate() {}\n", "add generate command");
    repo.write_and_stage(
        "src/cli.rs",
        "fn generate(retries: u32) {\n    let _ = retries;\n}\n",
    );
    repo
}

#[tokio::test]
async fn test_staged_change_to_commit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("+    let _ = retries;"))
        .and(body_string_contains("add generate command"))
        .respond_with(success())
        .expect(1)
        .mount(&server)
        .await;

    let repo = staged_change();
    let selected = select_changes(&repo.repo, UnstagedFallback::Disabled).unwrap();
    let options = PipelineOptions {
        history: Some(recent_history(&repo.repo, 5).unwrap()),
        ..PipelineOptions::default()
    };

    let prompt = match prepare_request(&DiffInput::Repository(selected.signals), &options).unwrap()
    {
        Prepared::Ready { prompt, .. } => prompt,
        other => panic!("Expected Ready, got {other:?}"),
    };

    let message = generate_message(&client_for(&server), &prompt, &key())
        .await
        .unwrap();
    assert_eq!(message, "add retry flag to the generate command");

    let oid = apply_commit(&repo.repo, &message, selected.scope).unwrap();
    let commit = repo.repo.find_commit(oid).unwrap();
    assert_eq!(commit.message(), Some("add retry flag to the generate command"));
    assert_eq!(commit.parent_count(), 1);
}

#[tokio::test]
async fn test_unstaged_fallback_commits_working_tree() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(success())
        .expect(1)
        .mount(&server)
        .await;

    let repo = TestRepo::new();
    repo.commit_file("notes.md", "one\n", "initial");
    repo.write("notes.md", "one\ntwo\n");

    let selected = select_changes(&repo.repo, UnstagedFallback::WithWarning).unwrap();
    assert_eq!(selected.scope, DiffScope::Unstaged);

    let Prepared::Ready { prompt, .. } = prepare_request(
        &DiffInput::Repository(selected.signals),
        &PipelineOptions::default(),
    )
    .unwrap() else {
        panic!("Expected Ready");
    };

    let message = generate_message(&client_for(&server), &prompt, &key())
        .await
        .unwrap();
    let oid = apply_commit(&repo.repo, &message, selected.scope).unwrap();

    let tree = repo.repo.find_commit(oid).unwrap().tree().unwrap();
    let entry = tree.get_name("notes.md").unwrap();
    let blob = repo.repo.find_blob(entry.id()).unwrap();
    assert_eq!(blob.content(), b"one\ntwo\n");
}

#[tokio::test]
async fn test_invalid_style_fails_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(success())
        .expect(0)
        .mount(&server)
        .await;

    let repo = staged_change();
    let selected = select_changes(&repo.repo, UnstagedFallback::Disabled).unwrap();
    let result = describe_changes(
        &client_for(&server),
        &DiffInput::Repository(selected.signals),
        Some("verbose"),
        PipelineOptions::default(),
        || Ok(key()),
    )
    .await;

    match result {
        Err(err @ PipelineError::Input(InputError::InvalidStyle(_))) => {
            assert_eq!(err.exit_code(), 1);
        }
        other => panic!("Expected InvalidStyle, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rename_is_summarized_without_credential() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(success())
        .expect(0)
        .mount(&server)
        .await;

    let repo = TestRepo::new();
    repo.commit_file("old.rs", "fn a() {}\nfn b() {}\nfn c() {}\n", "initial");
    repo.stage_rename("old.rs", "new.rs");

    let selected = select_changes(&repo.repo, UnstagedFallback::Disabled).unwrap();
    let result = describe_changes(
        &client_for(&server),
        &DiffInput::Repository(selected.signals),
        Some("short"),
        PipelineOptions::default(),
        || Err(PipelineError::Credential(CredentialError::Missing)),
    )
    .await
    .unwrap();

    assert!(matches!(
        result,
        Generated::EarlyExit(ChangeCategory::RenameOnly(_))
    ));
}

#[tokio::test]
async fn test_describe_changes_generates_requested_suggestions() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("Style: creative"))
        .respond_with(success())
        .expect(2)
        .mount(&server)
        .await;

    let repo = staged_change();
    let selected = select_changes(&repo.repo, UnstagedFallback::Disabled).unwrap();
    let options = PipelineOptions {
        suggestions: 2,
        ..PipelineOptions::default()
    };
    let result = describe_changes(
        &client_for(&server),
        &DiffInput::Repository(selected.signals),
        Some("creative"),
        options,
        || Ok(key()),
    )
    .await
    .unwrap();

    match result {
        Generated::Messages { messages, .. } => {
            assert_eq!(messages.len(), 2);
            assert!(messages.iter().all(|m| m == "add retry flag to the generate command"));
        }
        other => panic!("Expected Messages, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rename_exits_early_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(success())
        .expect(0)
        .mount(&server)
        .await;

    let repo = TestRepo::new();
    repo.commit_file("old.rs", "fn a() {}\nfn b() {}\nfn c() {}\n", "initial");
    repo.stage_rename("old.rs", "new.rs");

    let selected = select_changes(&repo.repo, UnstagedFallback::Disabled).unwrap();
    let prepared = prepare_request(
        &DiffInput::Repository(selected.signals),
        &PipelineOptions::default(),
    )
    .unwrap();

    match prepared {
        Prepared::EarlyExit(category @ ChangeCategory::RenameOnly(_)) => {
            assert_eq!(category.summary(), Some("R\told.rs\tnew.rs"));
        }
        other => panic!("Expected RenameOnly, got {other:?}"),
    }
}

#[test]
fn test_nothing_staged_is_no_changes() {
    let repo = TestRepo::new();
    repo.commit_file("a.txt", "a\n", "initial");

    let selected = select_changes(&repo.repo, UnstagedFallback::Disabled).unwrap();
    let result = prepare_request(
        &DiffInput::Repository(selected.signals),
        &PipelineOptions::default(),
    );

    match result {
        Err(err @ PipelineError::NoChanges) => assert_eq!(err.exit_code(), 3),
        other => panic!("Expected NoChanges, got {other:?}"),
    }
}

#[tokio::test]
async fn test_retry_recovers_from_service_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(success())
        .expect(1)
        .mount(&server)
        .await;

    let message = generate_with_retry(&client_for(&server), "prompt", &key(), 1)
        .await
        .unwrap();
    assert_eq!(message, "add retry flag to the generate command");
}

#[tokio::test]
async fn test_invalid_credential_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let result = generate_with_retry(&client_for(&server), "prompt", &key(), 3).await;
    assert_eq!(result, Err(GenerationError::InvalidCredential));
    assert_eq!(PipelineError::from(GenerationError::InvalidCredential).exit_code(), 4);
}

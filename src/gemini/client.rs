//! HTTP client for the Gemini `generateContent` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{GenerationParams, Settings};
use crate::credential::ApiKey;
use crate::error::GenerationError;

/// Longest provider error text carried into an error value.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Something that turns a prompt into a raw response body.
///
/// This abstraction lets the pipeline run against a mock in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageGenerator: Send + Sync {
    /// Send one generation request and return the raw response body.
    async fn generate(&self, prompt: &str, key: &ApiKey) -> Result<String, GenerationError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

impl<'a> GenerateContentRequest<'a> {
    fn new(prompt: &'a str, params: &GenerationParams) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: params.temperature,
                top_k: params.top_k,
                top_p: params.top_p,
                max_output_tokens: params.max_output_tokens,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

/// Gemini REST client. One request per `generate` call, no retries.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    timeout: Duration,
    params: GenerationParams,
}

impl GeminiClient {
    pub fn new(settings: &Settings) -> Self {
        Self {
            http: Client::new(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            timeout: settings.timeout,
            params: settings.params,
        }
    }

    /// Endpoint URL without the key.
    pub fn endpoint(&self) -> String {
        let model = self.model.strip_prefix("models/").unwrap_or(&self.model);
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl MessageGenerator for GeminiClient {
    async fn generate(&self, prompt: &str, key: &ApiKey) -> Result<String, GenerationError> {
        let url = self.endpoint();
        let request = GenerateContentRequest::new(prompt, &self.params);

        debug!(
            "Sending generateContent request: model={}, prompt_len={}, timeout={}s",
            self.model,
            prompt.len(),
            self.timeout.as_secs()
        );

        // The timeout covers both the send and the body read.
        let exchange = async {
            let response = self
                .http
                .post(&url)
                .query(&[("key", key.expose())])
                .json(&request)
                .send()
                .await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let (status, body) = match tokio::time::timeout(self.timeout, exchange).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => return Err(transport_error(e, self.timeout)),
            Err(_) => return Err(GenerationError::Timeout(self.timeout.as_secs())),
        };

        debug!("Gemini responded: status={}, body_len={}", status, body.len());

        if !status.is_success() {
            return Err(status_error(status, &body));
        }
        if body.trim().is_empty() {
            return Err(GenerationError::InvalidResponse(
                "empty response body".to_string(),
            ));
        }

        Ok(body)
    }
}

/// Map a transport failure. The URL is dropped because it carries the key.
fn transport_error(error: reqwest::Error, timeout: Duration) -> GenerationError {
    if error.is_timeout() {
        return GenerationError::Timeout(timeout.as_secs());
    }
    GenerationError::NetworkError(error.without_url().to_string())
}

/// Map a non-success HTTP status to a generation error.
fn status_error(status: StatusCode, body: &str) -> GenerationError {
    let message = provider_message(body);

    match status.as_u16() {
        401 | 403 => GenerationError::InvalidCredential,
        400 if message.to_lowercase().contains("api key") => GenerationError::InvalidCredential,
        429 => GenerationError::RateLimited,
        code @ 500..=599 => GenerationError::ServiceUnavailable { status: code },
        code => GenerationError::RequestRejected {
            status: code,
            message,
        },
    }
}

/// The provider's `error.message`, or the start of the raw body.
fn provider_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body)
        && let Some(message) = parsed.error.and_then(|e| e.message)
    {
        return message;
    }

    let mut end = body.len().min(MAX_ERROR_MESSAGE_LEN);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].trim().to_string()
}

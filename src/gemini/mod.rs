//! Google Gemini generation endpoint.

pub mod client;
pub mod response;
pub mod retry;

pub use client::{GeminiClient, MessageGenerator};
pub use response::{normalize, normalize_text};
pub use retry::{generate_with_retry, retry_transient};

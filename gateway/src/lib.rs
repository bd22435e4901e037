//! Gemini API client for Atelier.
//!
//! # Architecture
//!
//! The crate exposes one seam, the [`Gateway`] trait, with three
//! request/response operations:
//!
//! - [`Gateway::complete_chat`] - multi-turn chat via `generateContent`,
//!   optionally with one inline image on the newest turn
//! - [`Gateway::generate_image`] - one square image via Imagen `:predict`
//! - [`Gateway::research`] - a web-grounded report via `generateContent`
//!   with the `google_search` tool; citations come from
//!   `groundingMetadata`
//!
//! [`GeminiGateway`] is the production implementation. The session engine
//! holds the trait behind an `Arc<dyn Gateway>`, so tests substitute a
//! scripted fake without touching the network.
//!
//! # Error Handling
//!
//! Every failure surfaces as a [`GatewayError`] whose `Display` string is
//! written into the conversation, so the messages here are worded for
//! end users. A backend success that carries no usable payload is
//! [`GatewayError::EmptyResult`]; callers must never treat it as an
//! empty reply.

pub mod gemini;

use async_trait::async_trait;
use thiserror::Error;

use atelier_types::{Citation, GeneratedImage, ImageAttachment, NonEmptyString, Speaker};

pub use gemini::GeminiGateway;

/// Canonical Gemini API base URL.
pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default chat/research model.
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-flash";
/// Default image synthesis model.
pub const DEFAULT_IMAGE_MODEL: &str = "imagen-4.0-generate-001";

const CONNECT_TIMEOUT_SECS: u64 = 30;
/// Whole-request deadline. A stalled backend settles as an error turn
/// instead of leaving the session in `Submitting` forever.
const REQUEST_TIMEOUT_SECS: u64 = 120;
const TCP_KEEPALIVE_SECS: u64 = 60;
const POOL_MAX_IDLE_PER_HOST: usize = 8;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

/// One prior exchange as resent to the backend.
///
/// Histories are text-only on the wire: image attachments from earlier
/// turns are dropped when a follow-up request is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryTurn {
    pub speaker: Speaker,
    pub text: String,
}

impl HistoryTurn {
    #[must_use]
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
        }
    }
}

/// A grounded research result: report text plus its sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchFindings {
    pub text: NonEmptyString,
    pub citations: Vec<Citation>,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("could not reach the backend: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("the backend rejected the request ({status}): {message}")]
    Api {
        status: reqwest::StatusCode,
        message: String,
    },
    #[error("the backend returned nothing usable for this request")]
    EmptyResult,
    #[error("could not understand the backend response: {0}")]
    InvalidResponse(String),
}

/// The remote AI capability consumed by the session engine.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Chat completion over the prior history plus one new turn.
    ///
    /// `text` may be empty only when `image` is present; the composer
    /// guarantees that before a submission exists.
    async fn complete_chat(
        &self,
        history: &[HistoryTurn],
        text: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<NonEmptyString, GatewayError>;

    /// Synthesize a single square image from a prompt.
    async fn generate_image(
        &self,
        prompt: &NonEmptyString,
    ) -> Result<GeneratedImage, GatewayError>;

    /// Produce a web-grounded research report on a topic.
    async fn research(&self, topic: &NonEmptyString) -> Result<ResearchFindings, GatewayError>;
}

pub(crate) fn build_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(std::time::Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .tcp_keepalive(Some(std::time::Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .pool_idle_timeout(Some(std::time::Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap_or_else(|e| {
            tracing::error!("failed to build tuned HTTP client: {e}; using defaults");
            reqwest::Client::new()
        })
}

/// Read an error body with a hard cap so a hostile or broken backend
/// cannot balloon memory on the failure path.
pub(crate) async fn read_capped_error_body(response: reqwest::Response) -> String {
    match response.text().await {
        Ok(mut text) => {
            if text.len() > MAX_ERROR_BODY_BYTES {
                let mut cut = MAX_ERROR_BODY_BYTES;
                while !text.is_char_boundary(cut) {
                    cut -= 1;
                }
                text.truncate(cut);
                text.push_str("...(truncated)");
            }
            text
        }
        Err(e) => format!("<failed to read error body: {e}>"),
    }
}

#[cfg(test)]
mod tests {
    use super::{HistoryTurn, Speaker};

    #[test]
    fn history_turn_carries_role() {
        let turn = HistoryTurn::new(Speaker::User, "hello");
        assert_eq!(turn.speaker.role_str(), "user");
        assert_eq!(turn.text, "hello");
    }
}

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use atelier_types::{Citation, GeneratedImage, ImageAttachment, NonEmptyString};

use crate::{
    GEMINI_API_BASE_URL, Gateway, GatewayError, HistoryTurn, ResearchFindings,
    build_http_client, read_capped_error_body,
};

/// Production Gemini client.
///
/// One instance is shared for the whole session; reqwest's client is
/// internally pooled, so cloning is cheap.
#[derive(Debug, Clone)]
pub struct GeminiGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    chat_model: String,
    image_model: String,
}

impl GeminiGateway {
    #[must_use]
    pub fn new(api_key: String, chat_model: String, image_model: String) -> Self {
        Self::with_base_url(GEMINI_API_BASE_URL.to_string(), api_key, chat_model, image_model)
    }

    /// Point the client at a different base URL. Tests use this to talk
    /// to a local mock server.
    #[must_use]
    pub fn with_base_url(
        base_url: String,
        api_key: String,
        chat_model: String,
        image_model: String,
    ) -> Self {
        Self {
            client: build_http_client(),
            base_url,
            api_key,
            chat_model,
            image_model,
        }
    }

    #[must_use]
    pub fn chat_model(&self) -> &str {
        &self.chat_model
    }

    #[must_use]
    pub fn image_model(&self) -> &str {
        &self.image_model
    }

    async fn post(&self, url: &str, body: &Value) -> Result<reqwest::Response, GatewayError> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = read_capped_error_body(response).await;
            tracing::warn!(%status, "Gemini API error");
            return Err(GatewayError::Api {
                status,
                message: extract_api_error(&body),
            });
        }

        Ok(response)
    }

    async fn generate_content(&self, body: &Value) -> Result<GenerateContentResponse, GatewayError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.chat_model
        );
        let response = self.post(&url, body).await?;
        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }
}

/// Build a text part for the `contents` array.
fn text_part(text: &str) -> Value {
    json!({ "text": text })
}

/// Build the `contents` array for a chat request.
///
/// History turns contribute their text only; the new turn carries the
/// typed text and, in chat mode, an optional `inline_data` image part.
fn build_chat_contents(
    history: &[HistoryTurn],
    text: &str,
    image: Option<&ImageAttachment>,
) -> Vec<Value> {
    let mut contents: Vec<Value> = history
        .iter()
        .map(|turn| {
            json!({
                "role": turn.speaker.role_str(),
                "parts": [text_part(&turn.text)]
            })
        })
        .collect();

    let mut parts: Vec<Value> = Vec::new();
    if !text.is_empty() {
        parts.push(text_part(text));
    }
    if let Some(image) = image {
        parts.push(json!({
            "inline_data": {
                "mime_type": image.mime(),
                "data": image.data()
            }
        }));
    }

    contents.push(json!({ "role": "user", "parts": parts }));
    contents
}

fn build_chat_body(history: &[HistoryTurn], text: &str, image: Option<&ImageAttachment>) -> Value {
    json!({ "contents": build_chat_contents(history, text, image) })
}

/// Prompt template wrapped around a research topic.
fn research_prompt(topic: &str) -> String {
    format!(
        "Provide a comprehensive research report on the topic: \"{topic}\". \
         The report should be well-structured with headings (using markdown like ##), \
         detailed, and informative."
    )
}

fn build_research_body(topic: &str) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [text_part(&research_prompt(topic))]
        }],
        "tools": [{ "google_search": {} }]
    })
}

fn build_predict_body(prompt: &str) -> Value {
    json!({
        "instances": [{ "prompt": prompt }],
        "parameters": {
            "sampleCount": 1,
            "aspectRatio": "1:1"
        }
    })
}

/// Pull a human-readable message out of a Gemini error body, falling
/// back to the raw body when it is not the documented JSON shape.
fn extract_api_error(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }
    #[derive(Deserialize)]
    struct ErrorDetail {
        message: String,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) if !parsed.error.message.trim().is_empty() => parsed.error.message,
        _ => body.trim().to_string(),
    }
}

// ============================================================================
// Typed response payloads
// ============================================================================

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct Content {
    parts: Option<Vec<Part>>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    grounding_chunks: Option<Vec<GroundingChunk>>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<WebSource>,
}

#[derive(Debug, Deserialize)]
struct WebSource {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    predictions: Option<Vec<Prediction>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate's parts.
    fn joined_text(&self) -> String {
        let mut out = String::new();
        if let Some(candidate) = self.candidates.as_ref().and_then(|c| c.first())
            && let Some(parts) = candidate.content.as_ref().and_then(|c| c.parts.as_ref())
        {
            for part in parts {
                if let Some(text) = &part.text {
                    out.push_str(text);
                }
            }
        }
        out
    }

    /// Web grounding sources of the first candidate, in backend order.
    fn citations(&self) -> Vec<Citation> {
        let Some(candidate) = self.candidates.as_ref().and_then(|c| c.first()) else {
            return Vec::new();
        };
        let Some(chunks) = candidate
            .grounding_metadata
            .as_ref()
            .and_then(|m| m.grounding_chunks.as_ref())
        else {
            return Vec::new();
        };

        chunks
            .iter()
            .filter_map(|chunk| chunk.web.as_ref())
            .filter_map(|web| {
                web.uri.as_ref().map(|uri| Citation {
                    uri: uri.clone(),
                    title: web.title.clone(),
                })
            })
            .collect()
    }
}

#[async_trait]
impl Gateway for GeminiGateway {
    async fn complete_chat(
        &self,
        history: &[HistoryTurn],
        text: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<NonEmptyString, GatewayError> {
        let body = build_chat_body(history, text, image);
        let response = self.generate_content(&body).await?;

        // An empty reply and a failed reply are the same thing to the caller.
        NonEmptyString::new(response.joined_text()).map_err(|_| GatewayError::EmptyResult)
    }

    async fn generate_image(
        &self,
        prompt: &NonEmptyString,
    ) -> Result<GeneratedImage, GatewayError> {
        let url = format!("{}/models/{}:predict", self.base_url, self.image_model);
        let body = build_predict_body(prompt.as_str());
        let response = self.post(&url, &body).await?;

        let parsed = response
            .json::<PredictResponse>()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        let prediction = parsed
            .predictions
            .and_then(|mut p| if p.is_empty() { None } else { Some(p.remove(0)) })
            .ok_or(GatewayError::EmptyResult)?;

        let data = prediction
            .bytes_base64_encoded
            .filter(|d| !d.is_empty())
            .ok_or(GatewayError::EmptyResult)?;
        let mime = prediction
            .mime_type
            .unwrap_or_else(|| "image/png".to_string());

        Ok(GeneratedImage::new(data, mime))
    }

    async fn research(&self, topic: &NonEmptyString) -> Result<ResearchFindings, GatewayError> {
        let body = build_research_body(topic.as_str());
        let response = self.generate_content(&body).await?;

        let text =
            NonEmptyString::new(response.joined_text()).map_err(|_| GatewayError::EmptyResult)?;
        let citations = response.citations();

        Ok(ResearchFindings { text, citations })
    }
}

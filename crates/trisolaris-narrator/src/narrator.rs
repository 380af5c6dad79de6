//! Narrative backends.
//!
//! Enum dispatch over the supported LLM APIs, following the same shape
//! for every backend: render the prompt, POST it, pull the text out of
//! the response. `Offline` never calls out and always reports itself
//! unavailable, which makes the session broadcast its fallback text.

use std::sync::Arc;
use std::time::Duration;

use trisolaris_core::config::NarrativeConfig;
use trisolaris_core::{NarrativeError, NarrativeProvider, ReportFields, ReportKind};

use crate::error::NarratorError;
use crate::prompt::{RenderedPrompt, ReportPrompts};

/// A narrative backend.
pub enum Narrator {
    /// OpenAI-compatible chat completions API.
    OpenAi(OpenAiNarrator),
    /// Anthropic Messages API.
    Anthropic(AnthropicNarrator),
    /// No backend; every request fails fast.
    Offline,
}

impl Narrator {
    /// Human-readable name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Anthropic(_) => "anthropic",
            Self::Offline => "offline",
        }
    }

    /// Render and send one report request.
    ///
    /// # Errors
    ///
    /// Returns [`NarratorError::Offline`] in offline mode, or a backend or
    /// template error.
    pub async fn report(&self, kind: ReportKind, fields: &ReportFields) -> Result<String, NarratorError> {
        match self {
            Self::OpenAi(backend) => backend.report(kind, fields).await,
            Self::Anthropic(backend) => backend.report(kind, fields).await,
            Self::Offline => Err(NarratorError::Offline),
        }
    }
}

impl NarrativeProvider for Narrator {
    async fn generate(&self, kind: ReportKind, fields: &ReportFields) -> Result<String, NarrativeError> {
        let text = self.report(kind, fields).await?;
        tracing::debug!(backend = self.name(), kind = kind.as_str(), chars = text.len(), "report generated");
        Ok(text)
    }
}

fn http_client(timeout: Duration) -> Result<reqwest::Client, NarratorError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| NarratorError::Client(e.to_string()))
}

async fn post_json(
    request: reqwest::RequestBuilder,
    backend: &str,
    body: &serde_json::Value,
) -> Result<serde_json::Value, NarratorError> {
    let response = request
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| NarratorError::LlmBackend(format!("{backend} request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| "unable to read error body".to_owned());
        return Err(NarratorError::LlmBackend(format!(
            "{backend} returned {status}: {error_body}"
        )));
    }

    response
        .json()
        .await
        .map_err(|e| NarratorError::LlmBackend(format!("{backend} response parse failed: {e}")))
}

// ---------------------------------------------------------------------------
// OpenAI-compatible backend
// ---------------------------------------------------------------------------

/// Backend for OpenAI-compatible chat completions APIs.
///
/// Sends requests to `{api_url}/v1/chat/completions`.
pub struct OpenAiNarrator {
    client: reqwest::Client,
    prompts: Arc<ReportPrompts>,
    api_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiNarrator {
    /// Create a new `OpenAI`-compatible backend.
    ///
    /// # Errors
    ///
    /// Returns [`NarratorError::Client`] if the HTTP client cannot be built.
    pub fn new(config: &NarrativeConfig, prompts: Arc<ReportPrompts>) -> Result<Self, NarratorError> {
        Ok(Self {
            client: http_client(Duration::from_millis(config.timeout_ms))?,
            prompts,
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    async fn report(&self, kind: ReportKind, fields: &ReportFields) -> Result<String, NarratorError> {
        let prompt = self.prompts.render(kind, fields)?;
        let url = format!("{}/v1/chat/completions", self.api_url);
        let body = openai_body(&self.model, &prompt);

        let mut request = self.client.post(&url);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }
        let json = post_json(request, "OpenAI", &body).await?;
        extract_openai_content(&json)
    }
}

fn openai_body(model: &str, prompt: &RenderedPrompt) -> serde_json::Value {
    serde_json::json!({
        "model": model,
        "messages": [
            {"role": "system", "content": prompt.system},
            {"role": "user", "content": prompt.user}
        ],
        "temperature": prompt.sampling.temperature,
        "max_tokens": prompt.sampling.max_tokens
    })
}

/// Extract the text content from an `OpenAI` chat completions response.
fn extract_openai_content(json: &serde_json::Value) -> Result<String, NarratorError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            NarratorError::LlmBackend("OpenAI response missing choices[0].message.content".to_owned())
        })
}

// ---------------------------------------------------------------------------
// Anthropic Messages API backend
// ---------------------------------------------------------------------------

/// Backend for the Anthropic Messages API.
///
/// Uses the `x-api-key` header, a top-level `system` field, and reads the
/// reply from `content[0].text`.
pub struct AnthropicNarrator {
    client: reqwest::Client,
    prompts: Arc<ReportPrompts>,
    api_url: String,
    api_key: String,
    model: String,
}

impl AnthropicNarrator {
    /// Create a new Anthropic Messages API backend.
    ///
    /// # Errors
    ///
    /// Returns [`NarratorError::MissingApiKey`] without a key, or
    /// [`NarratorError::Client`] if the HTTP client cannot be built.
    pub fn new(config: &NarrativeConfig, prompts: Arc<ReportPrompts>) -> Result<Self, NarratorError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or(NarratorError::MissingApiKey("anthropic"))?;
        Ok(Self {
            client: http_client(Duration::from_millis(config.timeout_ms))?,
            prompts,
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            api_key,
            model: config.model.clone(),
        })
    }

    async fn report(&self, kind: ReportKind, fields: &ReportFields) -> Result<String, NarratorError> {
        let prompt = self.prompts.render(kind, fields)?;
        let url = format!("{}/v1/messages", self.api_url);
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": prompt.sampling.max_tokens,
            "temperature": prompt.sampling.temperature,
            "system": prompt.system,
            "messages": [
                {"role": "user", "content": prompt.user}
            ]
        });

        let request = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01");
        let json = post_json(request, "Anthropic", &body).await?;
        extract_anthropic_content(&json)
    }
}

/// Extract the text content from an Anthropic Messages API response.
fn extract_anthropic_content(json: &serde_json::Value) -> Result<String, NarratorError> {
    json.get("content")
        .and_then(|c| c.get(0))
        .and_then(|b| b.get("text"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            NarratorError::LlmBackend("Anthropic response missing content[0].text".to_owned())
        })
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Create a narrator from configuration.
///
/// `backend` is matched case-insensitively against `openai`, `anthropic`,
/// and `offline`.
///
/// # Errors
///
/// Returns [`NarratorError::UnknownBackend`] for an unrecognized name, or
/// any error raised while building the backend.
pub fn create_narrator(config: &NarrativeConfig) -> Result<Narrator, NarratorError> {
    let backend = config.backend.to_ascii_lowercase();
    if backend == "offline" {
        return Ok(Narrator::Offline);
    }
    let prompts = Arc::new(ReportPrompts::new()?);
    match backend.as_str() {
        "openai" => Ok(Narrator::OpenAi(OpenAiNarrator::new(config, prompts)?)),
        "anthropic" => Ok(Narrator::Anthropic(AnthropicNarrator::new(config, prompts)?)),
        _ => Err(NarratorError::UnknownBackend(config.backend.clone())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::panic)]
mod tests {
    use axum::Json;
    use axum::Router;
    use axum::routing::post;
    use chrono::Utc;

    use super::*;

    fn fields() -> ReportFields {
        ReportFields {
            civilization: "Trisolaris".to_owned(),
            current_sanity: 0.0,
            max_sanity: 100.0,
            tech_level: 5,
            population: 1_000_000,
            event: "Collapse of collective sanity".to_owned(),
            tick: 9,
            born_at: Utc::now(),
            occurred_at: Utc::now(),
        }
    }

    fn config(backend: &str, api_url: &str) -> NarrativeConfig {
        NarrativeConfig {
            backend: backend.to_owned(),
            api_url: api_url.to_owned(),
            api_key: Some("test".to_owned()),
            ..NarrativeConfig::default()
        }
    }

    #[test]
    fn extract_openai_content_valid() {
        let json = serde_json::json!({
            "choices": [{"message": {"content": "The suns rose together."}}]
        });
        assert_eq!(extract_openai_content(&json).unwrap(), "The suns rose together.");
    }

    #[test]
    fn extract_openai_content_missing_choices() {
        let json = serde_json::json!({"error": "rate_limit"});
        assert!(extract_openai_content(&json).is_err());
    }

    #[test]
    fn extract_anthropic_content_valid() {
        let json = serde_json::json!({"content": [{"type": "text", "text": "Dehydrate now."}]});
        assert_eq!(extract_anthropic_content(&json).unwrap(), "Dehydrate now.");
    }

    #[test]
    fn extract_anthropic_content_missing() {
        let json = serde_json::json!({"content": []});
        assert!(extract_anthropic_content(&json).is_err());
    }

    #[test]
    fn create_narrator_dispatches_correctly() {
        assert_eq!(create_narrator(&config("openai", "http://x")).unwrap().name(), "openai-compatible");
        assert_eq!(create_narrator(&config("Anthropic", "http://x")).unwrap().name(), "anthropic");
        assert_eq!(create_narrator(&config("offline", "http://x")).unwrap().name(), "offline");
        assert!(matches!(
            create_narrator(&config("oracle", "http://x")),
            Err(NarratorError::UnknownBackend(_))
        ));
    }

    #[test]
    fn anthropic_requires_a_key() {
        let mut cfg = config("anthropic", "http://x");
        cfg.api_key = None;
        assert!(matches!(
            create_narrator(&cfg),
            Err(NarratorError::MissingApiKey("anthropic"))
        ));
    }

    #[tokio::test]
    async fn offline_narrator_is_unavailable() {
        let result = Narrator::Offline.generate(ReportKind::Extinction, &fields()).await;
        assert!(matches!(result, Err(NarrativeError::Unavailable(_))));
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn openai_round_trip_against_local_server() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|Json(body): Json<serde_json::Value>| async move {
                let user = body["messages"][1]["content"].as_str().unwrap_or_default().to_owned();
                let reply = if user.contains("Extinction report") { "silence" } else { "noise" };
                Json(serde_json::json!({
                    "choices": [{"message": {"content": reply}}]
                }))
            }),
        );
        let url = serve(router).await;
        let narrator = create_narrator(&config("openai", &url)).unwrap();
        let text = narrator.generate(ReportKind::Extinction, &fields()).await.unwrap();
        assert_eq!(text, "silence");
    }

    #[tokio::test]
    async fn backend_error_status_is_a_provider_error() {
        let router = Router::new().route(
            "/v1/messages",
            post(|| async { (axum::http::StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let url = serve(router).await;
        let narrator = create_narrator(&config("anthropic", &url)).unwrap();
        let result = narrator.generate(ReportKind::SanityCollapse, &fields()).await;
        match result {
            Err(NarrativeError::Provider(message)) => assert!(message.contains("429")),
            other => panic!("unexpected {other:?}"),
        }
    }
}

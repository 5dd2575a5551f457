//! Gemini REST client for schema-guided structured generation.
//!
//! The primary provider is the only one with machine-checked output schemas.
//! A structured request first runs with strict enforcement
//! (`responseMimeType` + `responseSchema`); when that fails for any
//! non-auth-class reason, one fallback request runs with enforcement off and
//! the same schema rendered into the prompt text instead. Auth-class
//! failures skip the fallback entirely — a bad credential is not a schema
//! problem — and surface to the engine's reselection retry layer.

use fabula_core::{InferenceConfig, ModelConfig};
use fabula_error::{FabulaError, FabulaResult, ProviderError, ProviderErrorKind};
use fabula_interface::StructuredTask;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, instrument, warn};

use crate::{auth, prompts};

/// Default REST endpoint for the Gemini API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Image model used when the configuration names none.
pub(crate) const DEFAULT_IMAGE_MODEL: &str = "gemini-2.0-flash-preview-image-generation";

/// Video model used when the configuration names none.
pub(crate) const DEFAULT_VIDEO_MODEL: &str = "veo-2.0-generate-001";

/// Client for the Gemini REST API.
///
/// Holds a resolved credential for the duration of one engine call; the
/// caller's `ModelConfig` is never retained or mutated.
#[derive(Clone)]
pub struct GeminiClient {
    pub(crate) http: Client,
    pub(crate) api_key: String,
    pub(crate) base_url: String,
    pub(crate) text_model: String,
    pub(crate) image_model: String,
    pub(crate) video_model: String,
    pub(crate) inference: InferenceConfig,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("text_model", &self.text_model)
            .finish_non_exhaustive()
    }
}

/// Response payload of `generateContent` (the subset this driver reads).
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Part {
    pub text: Option<String>,
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InlineData {
    pub mime_type: Option<String>,
    pub data: String,
}

impl GeminiClient {
    /// Creates a client from the caller's model configuration.
    ///
    /// `key_override` is the credential returned by an interactive
    /// reselection; it wins over both the per-call key and the process-level
    /// fallback.
    ///
    /// # Errors
    ///
    /// Returns `MissingCredential` before any network traffic when no key is
    /// resolvable.
    #[instrument(skip_all, fields(model = %config.text_model))]
    pub fn from_config(
        http: Client,
        config: &ModelConfig,
        key_override: Option<String>,
        operation: &'static str,
    ) -> FabulaResult<Self> {
        let api_key = match key_override.filter(|k| !k.is_empty()) {
            Some(key) => key,
            None => auth::resolve_gemini_key(config, operation)?,
        };

        let base_url = if config.base_url.trim().is_empty() {
            DEFAULT_BASE_URL.to_string()
        } else {
            config.base_url.trim_end_matches('/').to_string()
        };

        debug!(base_url = %base_url, "Created Gemini driver");

        Ok(Self {
            http,
            api_key,
            base_url,
            text_model: config.text_model.clone(),
            image_model: config
                .image_model
                .clone()
                .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            video_model: config
                .video_model
                .clone()
                .unwrap_or_else(|| DEFAULT_VIDEO_MODEL.to_string()),
            inference: config.inference_or_default(),
        })
    }

    /// Creates a client against the default endpoint using only an explicit
    /// key, for the silent image reroute from providers without image
    /// capability.
    pub fn with_key(http: Client, api_key: String, image_model: Option<String>) -> Self {
        Self {
            http,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            text_model: "gemini-2.0-flash".to_string(),
            image_model: image_model.unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            video_model: DEFAULT_VIDEO_MODEL.to_string(),
            inference: InferenceConfig::default(),
        }
    }

    pub(crate) fn err(&self, kind: ProviderErrorKind, operation: &'static str) -> ProviderError {
        ProviderError::new(kind, "gemini", operation)
    }

    /// URL for a model-scoped method, with the credential as a query param.
    pub(crate) fn model_url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/models/{}:{}?key={}",
            self.base_url, model, method, self.api_key
        )
    }

    /// POST a JSON body, returning the response body text on 2xx.
    pub(crate) async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        operation: &'static str,
    ) -> FabulaResult<String> {
        let response = self.http.post(url).json(body).send().await.map_err(|e| {
            error!(error = ?e, "HTTP request failed");
            self.err(ProviderErrorKind::Transport(e.to_string()), operation)
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.err(ProviderErrorKind::Transport(e.to_string()), operation))?;

        if !status.is_success() {
            error!(status = %status, body = %text, "API error");
            return Err(self
                .err(
                    ProviderErrorKind::RequestFailed {
                        status: status.as_u16(),
                        body: text,
                    },
                    operation,
                )
                .into());
        }

        debug!(response_len = text.len(), "Received response");
        Ok(text)
    }

    pub(crate) fn parse_content(
        &self,
        text: &str,
        operation: &'static str,
    ) -> FabulaResult<GenerateContentResponse> {
        serde_json::from_str(text).map_err(|e| {
            self.err(
                ProviderErrorKind::MalformedResponse(format!("{e}; raw text: {text}")),
                operation,
            )
            .into()
        })
    }

    /// One `generateContent` call; strict mode attaches the response schema.
    async fn generate_once(
        &self,
        task: &StructuredTask<'_>,
        strict: bool,
    ) -> FabulaResult<String> {
        let mut generation_config = json!({
            "temperature": task.inference.temperature,
            "topP": task.inference.top_p,
            "maxOutputTokens": task.inference.max_tokens,
        });

        let prompt = if strict {
            generation_config["responseMimeType"] = json!("application/json");
            generation_config["responseSchema"] = task.schema.to_strict_schema();
            task.prompt.to_string()
        } else {
            format!("{}\n\n{}", task.prompt, task.schema.to_prompt_block())
        };

        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": generation_config,
        });

        let url = self.model_url(&self.text_model, "generateContent");
        let text = self.post_json(&url, &body, task.operation).await?;
        let response = self.parse_content(&text, task.operation)?;

        let combined: String = response
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect()
            })
            .unwrap_or_default();

        if combined.trim().is_empty() {
            return Err(self.err(ProviderErrorKind::EmptyResponse, task.operation).into());
        }
        Ok(combined)
    }

    /// Strict-schema attempt with one schema-in-prompt fallback.
    pub(crate) async fn generate_structured_internal(
        &self,
        task: &StructuredTask<'_>,
    ) -> FabulaResult<String> {
        match self.generate_once(task, true).await {
            Ok(text) => Ok(text),
            Err(e) if auth::is_auth_class(&e) => Err(e),
            Err(e) => {
                warn!(error = %e, "Strict schema request failed, retrying with schema in prompt");
                self.generate_once(task, false).await
            }
        }
    }

    /// Minimal round-trip used by the connectivity probe.
    pub(crate) async fn probe_internal(&self) -> Result<(), FabulaError> {
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompts::PROBE_PROMPT }] }],
            "generationConfig": { "maxOutputTokens": 8 },
        });
        let url = self.model_url(&self.text_model, "generateContent");
        self.post_json(&url, &body, "probe").await.map(|_| ())
    }
}

#[async_trait::async_trait]
impl fabula_interface::ProviderDriver for GeminiClient {
    #[instrument(skip(self, task), fields(model = %self.text_model, operation = task.operation))]
    async fn generate_structured(&self, task: &StructuredTask<'_>) -> FabulaResult<String> {
        self.generate_structured_internal(task).await
    }

    async fn generate_image(&self, prompt: &str) -> FabulaResult<fabula_core::GeneratedImage> {
        self.generate_image_internal(prompt).await
    }

    #[instrument(skip(self))]
    async fn probe(&self) -> bool {
        match self.probe_internal().await {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "Probe failed");
                false
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

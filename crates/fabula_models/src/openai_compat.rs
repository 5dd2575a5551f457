//! OpenAI-compatible chat and image driver using reqwest.
//!
//! Covers every provider speaking the `/chat/completions` wire format
//! (OpenAI, DeepSeek, SiliconFlow, Ollama). These providers have no
//! machine-checked schema enforcement, so the target schema always travels
//! as a system-level instruction.

use async_trait::async_trait;
use base64::Engine as _;
use fabula_core::{GeneratedImage, ModelConfig, Provider};
use fabula_error::{FabulaResult, ProviderError, ProviderErrorKind};
use fabula_interface::{ProviderDriver, StructuredTask};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, instrument};

use crate::{auth, prompts};

/// Chat completion response payload (the subset this driver reads).
#[derive(Debug, Clone, Deserialize, derive_getters::Getters)]
pub struct ChatCompletionResponse {
    /// Completion choices; only the first is consumed
    choices: Vec<ChatChoice>,
}

/// One completion choice.
#[derive(Debug, Clone, Deserialize, derive_getters::Getters)]
pub struct ChatChoice {
    /// The assistant message for this choice
    message: ChatMessage,
}

/// Assistant message within a choice.
#[derive(Debug, Clone, Deserialize, derive_getters::Getters)]
pub struct ChatMessage {
    /// Text payload; absent when the model produced nothing usable
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ImageGenerationResponse {
    data: Vec<ImageDatum>,
}

#[derive(Debug, Clone, Deserialize)]
struct ImageDatum {
    b64_json: Option<String>,
}

/// Driver for OpenAI-compatible providers.
///
/// The effective key may be empty: local providers like Ollama accept
/// anonymous requests, so the bearer header is only attached when a key is
/// present.
#[derive(Debug, Clone)]
pub struct OpenAICompatibleClient {
    http: Client,
    api_key: Option<String>,
    base_url: String,
    text_model: String,
    image_model: Option<String>,
    provider: Provider,
    inference: fabula_core::InferenceConfig,
}

impl OpenAICompatibleClient {
    /// Creates a driver from the caller's model configuration.
    #[instrument(skip_all, fields(provider = %config.provider, model = %config.text_model))]
    pub fn from_config(http: Client, config: &ModelConfig) -> Self {
        debug!(base_url = %config.base_url, "Created OpenAI-compatible driver");
        Self {
            http,
            api_key: config.key().map(str::to_string),
            base_url: config.base_url.clone(),
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
            provider: config.provider,
            inference: config.inference_or_default(),
        }
    }

    fn err(&self, kind: ProviderErrorKind, operation: &'static str) -> ProviderError {
        ProviderError::new(kind, self.provider.as_str(), operation)
    }

    /// POST a JSON body, returning the response body text on 2xx.
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        operation: &'static str,
    ) -> FabulaResult<String> {
        let mut request = self.http.post(url).json(body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request.send().await.map_err(|e| {
            error!(error = ?e, url = %url, "HTTP request failed");
            self.err(ProviderErrorKind::Transport(e.to_string()), operation)
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            self.err(ProviderErrorKind::Transport(e.to_string()), operation)
        })?;

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

    async fn chat(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
        operation: &'static str,
    ) -> FabulaResult<ChatCompletionResponse> {
        let mut body = json!({
            "model": self.text_model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "temperature": self.inference.temperature,
            "top_p": self.inference.top_p,
            "max_tokens": max_tokens,
        });
        if self.provider.supports_json_object_hint() {
            body["response_format"] = json!({ "type": "json_object" });
        }
        if self.provider.requires_stream_flag() {
            body["stream"] = json!(false);
        }

        let url = auth::chat_url(&self.base_url);
        let text = self.post_json(&url, &body, operation).await?;

        serde_json::from_str(&text).map_err(|e| {
            self.err(
                ProviderErrorKind::MalformedResponse(format!("{e}; raw text: {text}")),
                operation,
            )
            .into()
        })
    }
}

#[async_trait]
impl ProviderDriver for OpenAICompatibleClient {
    #[instrument(skip(self, task), fields(provider = %self.provider, model = %self.text_model, operation = task.operation))]
    async fn generate_structured(&self, task: &StructuredTask<'_>) -> FabulaResult<String> {
        let system = task.schema.to_prompt_block();
        let response = self
            .chat(&system, task.prompt, task.inference.max_tokens, task.operation)
            .await?;

        response
            .choices()
            .first()
            .and_then(|choice| choice.message().content().clone())
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| self.err(ProviderErrorKind::EmptyResponse, task.operation).into())
    }

    #[instrument(skip(self, prompt), fields(provider = %self.provider))]
    async fn generate_image(&self, prompt: &str) -> FabulaResult<GeneratedImage> {
        let model = self.image_model.clone().unwrap_or_default();
        let body = json!({
            "model": model,
            "prompt": prompt,
            "n": 1,
            "size": "1024x1024",
            "response_format": "b64_json",
        });

        let url = auth::images_url(&self.base_url);
        let text = self.post_json(&url, &body, "generate_image").await?;

        let response: ImageGenerationResponse = serde_json::from_str(&text).map_err(|e| {
            self.err(
                ProviderErrorKind::MalformedResponse(format!("{e}; raw text: {text}")),
                "generate_image",
            )
        })?;

        let encoded = response
            .data
            .first()
            .and_then(|datum| datum.b64_json.clone())
            .ok_or_else(|| self.err(ProviderErrorKind::EmptyResponse, "generate_image"))?;

        let data = base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| {
                self.err(
                    ProviderErrorKind::MalformedResponse(format!("invalid base64 image: {e}")),
                    "generate_image",
                )
            })?;

        Ok(GeneratedImage {
            mime: "image/png".to_string(),
            data,
        })
    }

    /// One minimal chat completion; any failure at all reads as unreachable.
    #[instrument(skip(self), fields(provider = %self.provider))]
    async fn probe(&self) -> bool {
        match self
            .chat("You are a connectivity check.", prompts::PROBE_PROMPT, 8, "probe")
            .await
        {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "Probe failed");
                false
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        self.provider.as_str()
    }
}

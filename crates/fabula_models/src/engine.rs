//! The engine facade the UI layer calls.
//!
//! One dispatch on the configured provider selects a driver; everything
//! downstream works through the capability trait. Engines hold no state
//! beyond a shared HTTP client and the optional reselection capability, so
//! concurrent calls are independent.

use fabula_core::{
    AspectRatio, GeneratedImage, GeneratedVideo, ModelConfig, Provider, SchemaNode, StoryAnalysis,
    StoryPolish, analysis_schema, extract_json, polish_schema,
};
use fabula_error::{BuilderError, FabulaResult, ProviderError, ProviderErrorKind};
use fabula_interface::{CredentialReselector, ProviderDriver, StructuredTask};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::instrument;

use crate::gemini::{GeminiClient, VideoRequestBuilder};
use crate::openai_compat::OpenAICompatibleClient;
use crate::retry::with_auth_retry;
use crate::{auth, prompts};

/// Facade over the structured, image, and video generation engines.
///
/// # Examples
///
/// ```no_run
/// use fabula_models::StoryEngine;
/// use fabula_core::{ModelConfig, Provider};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = StoryEngine::new();
/// let config = ModelConfig {
///     provider: Provider::OpenAi,
///     api_key: Some("sk-test".to_string()),
///     base_url: "https://api.openai.com/v1".to_string(),
///     text_model: "gpt-4o".to_string(),
///     image_model: None,
///     video_model: None,
///     inference: None,
/// };
/// let analysis = engine.analyze("A fox tricks a crow...", &config, "en").await?;
/// println!("{}", analysis.title);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct StoryEngine {
    http: Client,
    reselector: Option<Arc<dyn CredentialReselector>>,
}

impl std::fmt::Debug for StoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoryEngine")
            .field("has_reselector", &self.reselector.is_some())
            .finish()
    }
}

impl Default for StoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StoryEngine {
    /// Create an engine with a fresh HTTP client and no reselection capability.
    pub fn new() -> Self {
        Self {
            http: Client::new(),
            reselector: None,
        }
    }

    /// Attach an interactive credential reselection capability.
    ///
    /// Presence of the capability is what enables the bounded auth-class
    /// retry; without it, auth failures propagate on first occurrence.
    pub fn with_reselector(mut self, reselector: Arc<dyn CredentialReselector>) -> Self {
        self.reselector = Some(reselector);
        self
    }

    fn reselector_ref(&self) -> Option<&dyn CredentialReselector> {
        self.reselector.as_deref()
    }

    /// Extract structured story elements from a folktale.
    #[instrument(skip(self, story, config), fields(provider = %config.provider))]
    pub async fn analyze(
        &self,
        story: &str,
        config: &ModelConfig,
        language: &str,
    ) -> FabulaResult<StoryAnalysis> {
        let prompt = prompts::analysis_prompt(story, language);
        let schema = analysis_schema();
        let raw = self.structured(config, &prompt, &schema, "analyze").await?;
        parse_document(&raw, config.provider, "analyze")
    }

    /// Critique and rewrite a story.
    #[instrument(skip(self, story, config), fields(provider = %config.provider))]
    pub async fn polish(
        &self,
        story: &str,
        config: &ModelConfig,
        language: &str,
    ) -> FabulaResult<StoryPolish> {
        let prompt = prompts::polish_prompt(story, language);
        let schema = polish_schema();
        let raw = self.structured(config, &prompt, &schema, "polish").await?;
        parse_document(&raw, config.provider, "polish")
    }

    /// Shared protocol for both structured document types.
    async fn structured(
        &self,
        config: &ModelConfig,
        prompt: &str,
        schema: &SchemaNode,
        operation: &'static str,
    ) -> FabulaResult<String> {
        let task = StructuredTask {
            prompt,
            schema,
            inference: config.inference_or_default(),
            operation,
        };

        if config.provider == Provider::Gemini {
            with_auth_retry(self.reselector_ref(), |key| {
                let task = task.clone();
                async move {
                    let client = GeminiClient::from_config(self.http.clone(), config, key, operation)?;
                    client.generate_structured(&task).await
                }
            })
            .await
        } else {
            // OpenAI-compatible providers reject bad keys directly; the
            // ambiguous not-found recovery path does not apply.
            let client = OpenAICompatibleClient::from_config(self.http.clone(), config);
            client.generate_structured(&task).await
        }
    }

    /// Generate one illustration for a story element or plot point.
    ///
    /// Providers with an image endpoint are called directly when the
    /// configuration names an image model. Every other case (no image
    /// endpoint, or an image endpoint with no model configured) reroutes
    /// to the primary provider on the process-level fallback credential,
    /// failing with `MissingCredential` when that credential is absent.
    #[instrument(skip_all, fields(provider = %config.provider))]
    pub async fn generate_image(
        &self,
        description: &str,
        story_context: &str,
        negative_prompt: Option<&str>,
        config: &ModelConfig,
    ) -> FabulaResult<GeneratedImage> {
        let prompt = prompts::image_prompt(description, story_context, negative_prompt);

        match config.provider {
            Provider::Gemini => {
                with_auth_retry(self.reselector_ref(), |key| {
                    let prompt = prompt.clone();
                    async move {
                        let client =
                            GeminiClient::from_config(self.http.clone(), config, key, "generate_image")?;
                        client.generate_image(&prompt).await
                    }
                })
                .await
            }
            provider if provider.has_image_endpoint() && config.image_model.is_some() => {
                let client = OpenAICompatibleClient::from_config(self.http.clone(), config);
                client.generate_image(&prompt).await
            }
            provider => {
                // No image capability on the active provider: reroute to the
                // primary provider on the process-level fallback credential.
                let Some(fallback_key) = auth::fallback_gemini_key() else {
                    return Err(ProviderError::new(
                        ProviderErrorKind::MissingCredential,
                        provider.as_str(),
                        "generate_image",
                    )
                    .into());
                };
                with_auth_retry(self.reselector_ref(), |key| {
                    let prompt = prompt.clone();
                    let effective = key.unwrap_or_else(|| fallback_key.clone());
                    async move {
                        let client = GeminiClient::with_key(self.http.clone(), effective, None);
                        client.generate_image(&prompt).await
                    }
                })
                .await
            }
        }
    }

    /// Synthesize a short video clip. Primary-provider-only.
    ///
    /// Runs until the remote job completes; callers wanting a timeout impose
    /// one externally. The auth-class retry covers submission only.
    #[instrument(skip_all)]
    pub async fn generate_video(
        &self,
        prompt: &str,
        reference_image: Option<&str>,
        aspect_ratio: AspectRatio,
        config: Option<&ModelConfig>,
    ) -> FabulaResult<GeneratedVideo> {
        let mut builder = VideoRequestBuilder::default();
        builder.prompt(prompt).aspect_ratio(aspect_ratio);
        if let Some(image) = reference_image {
            builder.reference_image(Some(image.to_string()));
        }
        let request = builder
            .build()
            .map_err(|e| BuilderError::new(e.to_string()))?;

        let (client, operation_name) = with_auth_retry(self.reselector_ref(), |key| {
            let request = request.clone();
            async move {
                let client = self.video_client(config, key)?;
                let name = client.submit_video(&request).await?;
                Ok((client, name))
            }
        })
        .await?;

        client.await_video(&operation_name).await
    }

    fn video_client(
        &self,
        config: Option<&ModelConfig>,
        key_override: Option<String>,
    ) -> FabulaResult<GeminiClient> {
        match config {
            Some(cfg) if cfg.provider == Provider::Gemini => {
                GeminiClient::from_config(self.http.clone(), cfg, key_override, "generate_video")
            }
            other => {
                let key = key_override
                    .filter(|k| !k.is_empty())
                    .or_else(auth::fallback_gemini_key)
                    .ok_or_else(|| {
                        ProviderError::new(
                            ProviderErrorKind::MissingCredential,
                            "gemini",
                            "generate_video",
                        )
                    })?;
                let mut client = GeminiClient::with_key(self.http.clone(), key, None);
                if let Some(model) = other.and_then(|cfg| cfg.video_model.clone()) {
                    client.video_model = model;
                }
                Ok(client)
            }
        }
    }

    /// Reachability and credential check for the UI "test connection" button.
    ///
    /// Reduces every failure to `false` by design; precise classification is
    /// the generation engines' job, not this affordance's.
    #[instrument(skip(self, config), fields(provider = %config.provider))]
    pub async fn test_connection(&self, config: &ModelConfig) -> bool {
        if config.provider == Provider::Gemini {
            match GeminiClient::from_config(self.http.clone(), config, None, "probe") {
                Ok(client) => client.probe().await,
                Err(_) => false,
            }
        } else {
            OpenAICompatibleClient::from_config(self.http.clone(), config)
                .probe()
                .await
        }
    }
}

/// Funnel raw model text through the extractor into a typed document.
fn parse_document<T: DeserializeOwned>(
    raw: &str,
    provider: Provider,
    operation: &'static str,
) -> FabulaResult<T> {
    extract_json(raw).map_err(|_| {
        ProviderError::new(
            ProviderErrorKind::MalformedResponse(raw.to_string()),
            provider.as_str(),
            operation,
        )
        .into()
    })
}

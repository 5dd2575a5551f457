//! Model configuration passed by the caller into each engine invocation.

use serde::{Deserialize, Serialize};

/// AI providers the engines can target.
///
/// `Gemini` is the primary multimodal provider; the remaining variants speak
/// the OpenAI-compatible chat/image wire format and differ only in the flags
/// their endpoints require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Google Gemini (primary multimodal provider)
    Gemini,
    /// OpenAI
    OpenAi,
    /// DeepSeek
    DeepSeek,
    /// SiliconFlow
    SiliconFlow,
    /// Ollama (local, accepts anonymous requests)
    Ollama,
}

impl Provider {
    /// Lowercase provider label for error context and tracing.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::OpenAi => "openai",
            Provider::DeepSeek => "deepseek",
            Provider::SiliconFlow => "siliconflow",
            Provider::Ollama => "ollama",
        }
    }

    /// True for every provider speaking the OpenAI chat-completions format.
    pub fn is_openai_compatible(&self) -> bool {
        !matches!(self, Provider::Gemini)
    }

    /// Whether the provider understands `response_format: {"type": "json_object"}`.
    pub fn supports_json_object_hint(&self) -> bool {
        matches!(
            self,
            Provider::OpenAi | Provider::DeepSeek | Provider::SiliconFlow
        )
    }

    /// Whether the provider requires an explicit `"stream": false` flag.
    ///
    /// Ollama defaults to streaming chunked responses unless told otherwise.
    pub fn requires_stream_flag(&self) -> bool {
        matches!(self, Provider::Ollama)
    }

    /// Whether the provider offers an `/images/generations` endpoint.
    pub fn has_image_endpoint(&self) -> bool {
        matches!(self, Provider::OpenAi | Provider::SiliconFlow)
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sampling parameters forwarded verbatim to the provider.
///
/// # Examples
///
/// ```
/// use fabula_core::InferenceConfig;
///
/// let inference = InferenceConfig {
///     temperature: 0.8,
///     top_p: 0.95,
///     max_tokens: 8192,
/// };
/// assert!(inference.temperature <= 2.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Sampling temperature (0.0 to 2.0)
    pub temperature: f32,
    /// Nucleus sampling threshold (0.0 to 1.0)
    pub top_p: f32,
    /// Maximum number of tokens to generate
    pub max_tokens: u32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.95,
            max_tokens: 8192,
        }
    }
}

/// The active model configuration the UI layer passes into each engine call.
///
/// Engines treat this as read-only input per call; it is never mutated or
/// retained across invocations.
///
/// # Examples
///
/// ```
/// use fabula_core::{ModelConfig, Provider};
///
/// let config = ModelConfig {
///     provider: Provider::OpenAi,
///     api_key: Some("sk-test".to_string()),
///     base_url: "https://api.openai.com/v1".to_string(),
///     text_model: "gpt-4o".to_string(),
///     image_model: None,
///     video_model: None,
///     inference: None,
/// };
/// assert!(config.provider.is_openai_compatible());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Which provider to call
    pub provider: Provider,
    /// Per-call API key; absent or empty falls back to ambient credentials
    pub api_key: Option<String>,
    /// Provider endpoint base URL
    pub base_url: String,
    /// Model used for structured text generation
    pub text_model: String,
    /// Model used for image generation, when the provider offers one
    pub image_model: Option<String>,
    /// Model used for video synthesis (primary provider only)
    pub video_model: Option<String>,
    /// Sampling parameters; engine defaults apply when absent
    pub inference: Option<InferenceConfig>,
}

impl ModelConfig {
    /// The per-call API key, treating an empty string as absent.
    pub fn key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }

    /// Sampling parameters, falling back to engine defaults.
    pub fn inference_or_default(&self) -> InferenceConfig {
        self.inference.unwrap_or_default()
    }
}

/// Requested video frame orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    /// Landscape, 16:9
    Wide,
    /// Portrait, 9:16
    Tall,
}

impl AspectRatio {
    /// The wire-format aspect ratio string.
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Wide => "16:9",
            AspectRatio::Tall => "9:16",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_is_absent() {
        let config = ModelConfig {
            provider: Provider::Gemini,
            api_key: Some(String::new()),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            text_model: "gemini-2.0-flash".to_string(),
            image_model: None,
            video_model: None,
            inference: None,
        };
        assert_eq!(config.key(), None);
    }

    #[test]
    fn provider_capabilities() {
        assert!(!Provider::Gemini.is_openai_compatible());
        assert!(Provider::Ollama.requires_stream_flag());
        assert!(!Provider::Ollama.supports_json_object_hint());
        assert!(Provider::SiliconFlow.has_image_endpoint());
        assert!(!Provider::DeepSeek.has_image_endpoint());
    }

    #[test]
    fn aspect_ratio_wire_strings() {
        assert_eq!(AspectRatio::Wide.as_str(), "16:9");
        assert_eq!(AspectRatio::Tall.as_str(), "9:16");
    }
}

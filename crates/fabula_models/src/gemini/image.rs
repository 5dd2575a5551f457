//! Gemini image generation with model-name dispatch.
//!
//! Imagen-family models use the dedicated `:predict` endpoint; everything
//! else goes through `generateContent` requesting inline image data with
//! permissive safety thresholds. A text-only answer on the multimodal path
//! is treated as a refusal.

use base64::Engine as _;
use fabula_core::GeneratedImage;
use fabula_error::{FabulaResult, ProviderErrorKind};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use super::client::GeminiClient;

const OPERATION: &str = "generate_image";

/// Harm categories relaxed to `BLOCK_NONE` for illustration requests.
///
/// Folktales routinely feature wolves eating grandmothers; default
/// thresholds refuse a surprising share of perfectly tame storybook prompts.
const SAFETY_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Debug, Clone, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}

fn excerpt(text: &str) -> String {
    text.chars().take(200).collect()
}

impl GeminiClient {
    pub(crate) async fn generate_image_internal(
        &self,
        prompt: &str,
    ) -> FabulaResult<GeneratedImage> {
        if self.image_model.contains("imagen") {
            self.generate_image_predict(prompt).await
        } else {
            self.generate_image_multimodal(prompt).await
        }
    }

    /// Dedicated image endpoint for Imagen models.
    #[instrument(skip(self, prompt), fields(model = %self.image_model))]
    async fn generate_image_predict(&self, prompt: &str) -> FabulaResult<GeneratedImage> {
        let body = json!({
            "instances": [{ "prompt": prompt }],
            "parameters": { "sampleCount": 1, "aspectRatio": "1:1" },
        });

        let url = self.model_url(&self.image_model, "predict");
        let text = self.post_json(&url, &body, OPERATION).await?;

        let response: PredictResponse = serde_json::from_str(&text).map_err(|e| {
            self.err(
                ProviderErrorKind::MalformedResponse(format!("{e}; raw text: {text}")),
                OPERATION,
            )
        })?;

        let prediction = response
            .predictions
            .first()
            .ok_or_else(|| self.err(ProviderErrorKind::EmptyResponse, OPERATION))?;
        let encoded = prediction
            .bytes_base64_encoded
            .as_deref()
            .ok_or_else(|| self.err(ProviderErrorKind::EmptyResponse, OPERATION))?;

        let data = self.decode_base64(encoded)?;
        Ok(GeneratedImage {
            mime: prediction
                .mime_type
                .clone()
                .unwrap_or_else(|| "image/png".to_string()),
            data,
        })
    }

    /// General multimodal call requesting inline image data.
    #[instrument(skip(self, prompt), fields(model = %self.image_model))]
    async fn generate_image_multimodal(&self, prompt: &str) -> FabulaResult<GeneratedImage> {
        let safety_settings: Vec<_> = SAFETY_CATEGORIES
            .iter()
            .map(|category| json!({ "category": category, "threshold": "BLOCK_NONE" }))
            .collect();

        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "responseModalities": ["TEXT", "IMAGE"] },
            "safetySettings": safety_settings,
        });

        let url = self.model_url(&self.image_model, "generateContent");
        let text = self.post_json(&url, &body, OPERATION).await?;
        let response = self.parse_content(&text, OPERATION)?;

        let parts = response
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| content.parts.as_slice())
            .unwrap_or_default();

        if let Some(inline) = parts.iter().find_map(|part| part.inline_data.as_ref()) {
            let data = self.decode_base64(&inline.data)?;
            debug!(bytes = data.len(), "Received inline image");
            return Ok(GeneratedImage {
                mime: inline
                    .mime_type
                    .clone()
                    .unwrap_or_else(|| "image/png".to_string()),
                data,
            });
        }

        // No image part: text means the model declined, silence means nothing came back
        let refusal: String = parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        if !refusal.trim().is_empty() {
            return Err(self
                .err(ProviderErrorKind::GenerationRefused(excerpt(&refusal)), OPERATION)
                .into());
        }
        Err(self.err(ProviderErrorKind::EmptyResponse, OPERATION).into())
    }

    fn decode_base64(&self, encoded: &str) -> FabulaResult<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| {
                self.err(
                    ProviderErrorKind::MalformedResponse(format!("invalid base64 image: {e}")),
                    OPERATION,
                )
                .into()
            })
    }
}

//! Gemini (Veo) video synthesis: long-running job submission, polling, and
//! local materialization of the result.

use fabula_core::{AspectRatio, GeneratedVideo};
use fabula_error::{FabulaResult, ProviderErrorKind};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use super::client::GeminiClient;

const OPERATION: &str = "generate_video";

/// Polling interval while a video job runs. Job runtimes are provider
/// controlled, commonly tens of seconds to minutes.
const POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(5);

/// One video synthesis request.
///
/// # Examples
///
/// ```
/// use fabula_models::VideoRequestBuilder;
/// use fabula_core::AspectRatio;
///
/// let request = VideoRequestBuilder::default()
///     .prompt("A fox bows to a crow on a branch")
///     .aspect_ratio(AspectRatio::Wide)
///     .build()
///     .unwrap();
/// assert!(request.reference_image().is_none());
/// ```
#[derive(Debug, Clone, derive_builder::Builder, derive_getters::Getters)]
#[builder(setter(into))]
pub struct VideoRequest {
    /// Motion prompt for the clip
    prompt: String,
    /// Optional reference image, raw base64 or a full data URI
    #[builder(default)]
    reference_image: Option<String>,
    /// Requested frame orientation
    aspect_ratio: AspectRatio,
}

#[derive(Debug, Clone, Deserialize)]
struct OperationHandle {
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct OperationStatus {
    #[serde(default)]
    done: bool,
    error: Option<OperationError>,
    response: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct OperationError {
    message: Option<String>,
}

/// Strip a `data:*;base64,` prefix so only raw base64 goes over the wire.
fn strip_data_uri(image: &str) -> &str {
    match image.find("base64,") {
        Some(idx) => &image[idx + "base64,".len()..],
        None => image,
    }
}

impl GeminiClient {
    /// Submit a video job, returning the remote operation name.
    ///
    /// Submission is the only phase eligible for the auth-class reselection
    /// retry; failures discovered mid-poll propagate as-is.
    #[instrument(skip(self, request), fields(model = %self.video_model))]
    pub(crate) async fn submit_video(&self, request: &VideoRequest) -> FabulaResult<String> {
        let mut instance = json!({ "prompt": request.prompt() });
        if let Some(image) = request.reference_image() {
            instance["image"] = json!({
                "bytesBase64Encoded": strip_data_uri(image),
                "mimeType": "image/png",
            });
        }

        let body = json!({
            "instances": [instance],
            "parameters": {
                "aspectRatio": request.aspect_ratio().as_str(),
                "numberOfVideos": 1,
                "resolution": "720p",
            },
        });

        let url = self.model_url(&self.video_model, "predictLongRunning");
        let text = self.post_json(&url, &body, OPERATION).await?;

        let handle: OperationHandle = serde_json::from_str(&text).map_err(|e| {
            self.err(
                ProviderErrorKind::MalformedResponse(format!("{e}; raw text: {text}")),
                OPERATION,
            )
        })?;

        debug!(operation = %handle.name, "Video job submitted");
        Ok(handle.name)
    }

    /// Poll a submitted job to completion and fetch the resulting binary.
    ///
    /// Polls indefinitely at a fixed interval; callers wanting a timeout
    /// impose one externally and simply stop awaiting.
    #[instrument(skip(self), fields(operation = %operation_name))]
    pub(crate) async fn await_video(&self, operation_name: &str) -> FabulaResult<GeneratedVideo> {
        let status_url = format!(
            "{}/{}?key={}",
            self.base_url, operation_name, self.api_key
        );

        let status = loop {
            let response = self.http.get(&status_url).send().await.map_err(|e| {
                self.err(ProviderErrorKind::Transport(e.to_string()), OPERATION)
            })?;
            let http_status = response.status();
            let text = response
                .text()
                .await
                .map_err(|e| self.err(ProviderErrorKind::Transport(e.to_string()), OPERATION))?;
            if !http_status.is_success() {
                return Err(self
                    .err(
                        ProviderErrorKind::RequestFailed {
                            status: http_status.as_u16(),
                            body: text,
                        },
                        OPERATION,
                    )
                    .into());
            }

            let status: OperationStatus = serde_json::from_str(&text).map_err(|e| {
                self.err(
                    ProviderErrorKind::MalformedResponse(format!("{e}; raw text: {text}")),
                    OPERATION,
                )
            })?;

            if status.done {
                break status;
            }
            debug!("Video job still running");
            tokio::time::sleep(POLL_INTERVAL).await;
        };

        if let Some(error) = status.error {
            let message = error.message.unwrap_or_else(|| "unspecified".to_string());
            return Err(self
                .err(ProviderErrorKind::GenerationFailed(message), OPERATION)
                .into());
        }

        let uri = status
            .response
            .as_ref()
            .and_then(video_uri)
            .ok_or_else(|| {
                self.err(
                    ProviderErrorKind::GenerationFailed("job completed without a video URI".to_string()),
                    OPERATION,
                )
            })?;

        self.download_video(&uri).await
    }

    /// Fetch the finished clip, authorizing with the resolved credential.
    ///
    /// The result is local bytes; the remote URI needs the key and is never
    /// handed to the caller.
    async fn download_video(&self, uri: &str) -> FabulaResult<GeneratedVideo> {
        let separator = if uri.contains('?') { '&' } else { '?' };
        let authorized = format!("{uri}{separator}key={}", self.api_key);

        let response = self
            .http
            .get(&authorized)
            .send()
            .await
            .map_err(|e| self.err(ProviderErrorKind::Transport(e.to_string()), OPERATION))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self
                .err(
                    ProviderErrorKind::RequestFailed {
                        status: status.as_u16(),
                        body,
                    },
                    OPERATION,
                )
                .into());
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| self.err(ProviderErrorKind::Transport(e.to_string()), OPERATION))?;

        debug!(bytes = data.len(), "Video downloaded");
        Ok(GeneratedVideo {
            mime: "video/mp4".to_string(),
            data: data.to_vec(),
        })
    }
}

/// The result URI inside a completed operation payload.
fn video_uri(response: &serde_json::Value) -> Option<String> {
    response["generateVideoResponse"]["generatedSamples"][0]["video"]["uri"]
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_data_uri_prefix() {
        assert_eq!(strip_data_uri("data:image/png;base64,AAAA"), "AAAA");
        assert_eq!(strip_data_uri("AAAA"), "AAAA");
    }

    #[test]
    fn extracts_video_uri() {
        let response = json!({
            "generateVideoResponse": {
                "generatedSamples": [
                    { "video": { "uri": "https://example.com/clip.mp4" } }
                ]
            }
        });
        assert_eq!(
            video_uri(&response).as_deref(),
            Some("https://example.com/clip.mp4")
        );
        assert_eq!(video_uri(&json!({})), None);
    }
}

//! Credential resolution, endpoint construction, and auth-class detection.

use fabula_core::ModelConfig;
use fabula_error::{FabulaError, FabulaErrorKind, ProviderError, ProviderErrorKind};

/// Environment variable holding the process-level fallback Gemini key.
pub const GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";

/// The ambient fallback credential for the primary provider, if any.
pub fn fallback_gemini_key() -> Option<String> {
    std::env::var(GEMINI_KEY_ENV).ok().filter(|k| !k.is_empty())
}

/// Resolve the effective Gemini key for a call.
///
/// Per-call key wins when non-empty, then the process-level fallback. Fails
/// with `MissingCredential` before any network traffic when neither exists.
pub fn resolve_gemini_key(
    config: &ModelConfig,
    operation: &'static str,
) -> Result<String, ProviderError> {
    config
        .key()
        .map(str::to_string)
        .or_else(fallback_gemini_key)
        .ok_or_else(|| {
            ProviderError::new(ProviderErrorKind::MissingCredential, "gemini", operation)
        })
}

/// Chat-completions endpoint for an OpenAI-compatible base URL.
pub fn chat_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

/// Image-generations endpoint for an OpenAI-compatible base URL.
pub fn images_url(base_url: &str) -> String {
    format!("{}/images/generations", base_url.trim_end_matches('/'))
}

/// Whether a failure looks like an invalid or rotated credential.
///
/// The primary provider reports a bad key as a generic "not found" error
/// rather than a distinct unauthorized status, so this is a heuristic:
/// explicit `AuthRejected`, a 404 status, or a kind message containing
/// (case-insensitively) "not found" or "404". The substring check runs over
/// the kind's own message, never the located wrapper display, so source
/// line numbers cannot classify. Auth-class failures are the only ones
/// eligible for the single reselection retry. Kept as the one
/// classification point so the heuristic can be tightened without touching
/// call sites.
pub fn is_auth_class(error: &FabulaError) -> bool {
    match error.kind() {
        FabulaErrorKind::Provider(e) => match &e.kind {
            ProviderErrorKind::AuthRejected(_) => true,
            ProviderErrorKind::RequestFailed { status: 404, .. } => true,
            kind => has_auth_marker(&kind.to_string()),
        },
        FabulaErrorKind::Json(e) => has_auth_marker(&e.message),
        FabulaErrorKind::Builder(e) => has_auth_marker(&e.message),
    }
}

fn has_auth_marker(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("not found") || message.contains("404")
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabula_core::Provider;

    fn config_with_key(key: Option<&str>) -> ModelConfig {
        ModelConfig {
            provider: Provider::Gemini,
            api_key: key.map(str::to_string),
            base_url: String::new(),
            text_model: "gemini-2.0-flash".to_string(),
            image_model: None,
            video_model: None,
            inference: None,
        }
    }

    #[test]
    fn per_call_key_wins() {
        let config = config_with_key(Some("per-call"));
        assert_eq!(resolve_gemini_key(&config, "analyze").unwrap(), "per-call");
    }

    #[test]
    fn endpoint_suffixes_strip_trailing_slashes() {
        assert_eq!(
            chat_url("http://localhost:11434/v1/"),
            "http://localhost:11434/v1/chat/completions"
        );
        assert_eq!(
            images_url("https://api.openai.com/v1"),
            "https://api.openai.com/v1/images/generations"
        );
    }

    #[test]
    fn not_found_message_is_auth_class() {
        let err: FabulaError = ProviderError::new(
            ProviderErrorKind::Transport("Requested entity was Not Found".to_string()),
            "gemini",
            "analyze",
        )
        .into();
        assert!(is_auth_class(&err));
    }

    #[test]
    fn numeric_404_is_auth_class() {
        let err: FabulaError = ProviderError::new(
            ProviderErrorKind::RequestFailed {
                status: 404,
                body: "gone".to_string(),
            },
            "gemini",
            "analyze",
        )
        .into();
        assert!(is_auth_class(&err));
    }

    #[test]
    fn rate_limit_is_not_auth_class() {
        let err: FabulaError = ProviderError::new(
            ProviderErrorKind::Transport("rate limit exceeded".to_string()),
            "gemini",
            "analyze",
        )
        .into();
        assert!(!is_auth_class(&err));
    }

    #[test]
    fn source_location_never_classifies() {
        // A non-auth message raised at line 404 must stay non-auth-class.
        let err: FabulaError = ProviderError {
            kind: ProviderErrorKind::Transport("rate limit exceeded".to_string()),
            provider: "gemini",
            operation: "analyze",
            line: 404,
            file: "driver.rs",
        }
        .into();
        assert!(!is_auth_class(&err));
    }

    #[test]
    fn plain_500_is_not_auth_class() {
        let err: FabulaError = ProviderError::new(
            ProviderErrorKind::RequestFailed {
                status: 500,
                body: "internal".to_string(),
            },
            "gemini",
            "analyze",
        )
        .into();
        assert!(!is_auth_class(&err));
    }
}

//! Provider error types shared by all generation engines.

/// Provider-specific failure conditions.
///
/// One variant per failure class a generation engine can surface to the UI
/// layer. Classification into auth-class (eligible for a single credential
/// reselection retry) happens in `fabula_models::auth::is_auth_class`, not
/// here, so the heuristic stays in one place.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ProviderErrorKind {
    /// No usable API key could be resolved for the call
    #[display("No API key configured for this provider")]
    MissingCredential,
    /// Provider rejected the credential (invalid, rotated, or unrecognized)
    #[display("Credential rejected: {}", _0)]
    AuthRejected(String),
    /// Non-success HTTP status from the provider
    #[display("Request failed with status {}: {}", status, body)]
    RequestFailed {
        /// HTTP status code
        status: u16,
        /// Response body text
        body: String,
    },
    /// Connection-level failure before any HTTP status was received
    #[display("Transport error: {}", _0)]
    Transport(String),
    /// Transport succeeded but the response carried no usable payload
    #[display("Model returned an empty response")]
    EmptyResponse,
    /// Model explicitly declined to generate (e.g., safety refusal)
    #[display("Model declined to generate: {}", _0)]
    GenerationRefused(String),
    /// Payload present but not parseable into the expected shape
    #[display("Could not parse model output: {}", _0)]
    MalformedResponse(String),
    /// Remote job completed without producing a usable artifact
    #[display("Generation completed without output: {}", _0)]
    GenerationFailed(String),
}

/// Provider error with operation context and source location tracking.
///
/// Carries the provider name and operation so the UI layer can display a
/// one-line message without inspecting the kind.
///
/// # Examples
///
/// ```
/// use fabula_error::{ProviderError, ProviderErrorKind};
///
/// let err = ProviderError::new(ProviderErrorKind::EmptyResponse, "gemini", "analyze");
/// assert!(format!("{}", err).contains("gemini"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("{} {} failed: {} at line {} in {}", provider, operation, kind, line, file)]
pub struct ProviderError {
    /// The kind of error that occurred
    pub kind: ProviderErrorKind,
    /// Provider the failing call targeted
    pub provider: &'static str,
    /// Operation that failed (e.g. "analyze", "generate_image")
    pub operation: &'static str,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ProviderError {
    /// Create a new ProviderError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ProviderErrorKind, provider: &'static str, operation: &'static str) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            provider,
            operation,
            line: location.line(),
            file: location.file(),
        }
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match &self.kind {
            ProviderErrorKind::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

//! Top-level error wrapper types.

use crate::{BuilderError, JsonError, ProviderError};

/// This is the foundation error enum for the fabula workspace.
///
/// # Examples
///
/// ```
/// use fabula_error::{FabulaError, JsonError};
///
/// let json_err = JsonError::new("unexpected end of input");
/// let err: FabulaError = json_err.into();
/// assert!(format!("{}", err).contains("JSON Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum FabulaErrorKind {
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
    /// Builder error
    #[from(BuilderError)]
    Builder(BuilderError),
    /// Provider/generation error
    #[from(ProviderError)]
    Provider(ProviderError),
}

/// Fabula error with kind discrimination.
///
/// # Examples
///
/// ```
/// use fabula_error::{FabulaResult, ProviderError, ProviderErrorKind};
///
/// fn might_fail() -> FabulaResult<()> {
///     Err(ProviderError::new(ProviderErrorKind::EmptyResponse, "gemini", "polish"))?
/// }
///
/// match might_fail() {
///     Ok(_) => println!("Success"),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Fabula Error: {}", _0)]
pub struct FabulaError(Box<FabulaErrorKind>);

impl FabulaError {
    /// Create a new error from a kind.
    pub fn new(kind: FabulaErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &FabulaErrorKind {
        &self.0
    }

    /// The provider error inside this error, if that is what it wraps.
    pub fn as_provider(&self) -> Option<&ProviderError> {
        match self.kind() {
            FabulaErrorKind::Provider(e) => Some(e),
            _ => None,
        }
    }
}

// Generic From implementation for any type that converts to FabulaErrorKind
impl<T> From<T> for FabulaError
where
    T: Into<FabulaErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for fabula operations.
///
/// # Examples
///
/// ```
/// use fabula_error::{FabulaResult, JsonError};
///
/// fn parse_payload() -> FabulaResult<String> {
///     Err(JsonError::new("unexpected end of input"))?
/// }
/// ```
pub type FabulaResult<T> = std::result::Result<T, FabulaError>;

//! Trait definitions for provider drivers and their capabilities.

use async_trait::async_trait;
use fabula_core::{GeneratedImage, InferenceConfig, SchemaNode};
use fabula_error::FabulaResult;

/// One schema-guided generation request, fully assembled by the engine.
///
/// The driver owns only wire-format concerns: how the schema is enforced
/// (mechanically or as prompt text) and how the raw text comes back.
#[derive(Debug, Clone)]
pub struct StructuredTask<'a> {
    /// The task prompt, including story text and language directive
    pub prompt: &'a str,
    /// Canonical schema of the expected output document
    pub schema: &'a SchemaNode,
    /// Sampling parameters for this call
    pub inference: InferenceConfig,
    /// Operation label for error context (e.g. "analyze", "polish")
    pub operation: &'static str,
}

/// Core capability trait every provider driver implements.
///
/// Video synthesis is deliberately not part of this trait: it exists only on
/// the primary multimodal provider and has no cross-provider contract.
#[async_trait]
pub trait ProviderDriver: Send + Sync {
    /// Obtain raw model text expected to conform to the task's schema.
    ///
    /// Callers pass the result through the response extractor; drivers never
    /// parse the document themselves.
    async fn generate_structured(&self, task: &StructuredTask<'_>) -> FabulaResult<String>;

    /// Generate one illustration for an already-composed prompt.
    async fn generate_image(&self, prompt: &str) -> FabulaResult<GeneratedImage>;

    /// Minimal round-trip reachability check.
    ///
    /// Exists purely for a UI "test connection" affordance; every failure
    /// reduces to `false` by design.
    async fn probe(&self) -> bool;

    /// Provider name (e.g. "gemini", "openai").
    fn provider_name(&self) -> &'static str;
}

/// Optional environment capability for interactive credential re-acquisition.
///
/// When the first attempt of an operation fails with an auth-class error and
/// a reselector is present, the engine invokes it exactly once and retries
/// with the returned key. Returning `None` means the user declined.
#[async_trait]
pub trait CredentialReselector: Send + Sync {
    /// Prompt the environment for a replacement credential.
    async fn reselect(&self) -> Option<String>;
}

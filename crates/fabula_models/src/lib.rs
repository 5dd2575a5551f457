//! AI provider integrations and generation engines for fabula.
//!
//! This crate turns one [`fabula_core::ModelConfig`] into typed generation
//! results: structured story documents, illustrations, and video clips. It
//! normalizes two wire families behind one driver trait — the primary
//! multimodal Gemini REST API and the OpenAI-compatible chat/image format —
//! and owns the resilience policies around them: strict-schema requests with
//! a schema-in-prompt fallback, and a single bounded retry after interactive
//! credential reselection when a failure looks like a rotated key.
//!
//! # Example
//!
//! ```no_run
//! use fabula_models::StoryEngine;
//! use fabula_core::{ModelConfig, Provider};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = StoryEngine::new();
//! let config = ModelConfig {
//!     provider: Provider::Gemini,
//!     api_key: None, // falls back to GEMINI_API_KEY
//!     base_url: String::new(),
//!     text_model: "gemini-2.0-flash".to_string(),
//!     image_model: None,
//!     video_model: None,
//!     inference: None,
//! };
//! if engine.test_connection(&config).await {
//!     let analysis = engine.analyze("A fox tricks a crow...", &config, "en").await?;
//!     println!("{} plot points", analysis.plot_points.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
mod engine;
mod gemini;
mod openai_compat;
pub mod prompts;
mod retry;

pub use engine::StoryEngine;
pub use gemini::{DEFAULT_BASE_URL, GeminiClient, VideoRequest, VideoRequestBuilder};
pub use openai_compat::OpenAICompatibleClient;
pub use retry::with_auth_retry;

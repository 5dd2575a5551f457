//! Google Gemini driver: structured generation, image generation, and video
//! synthesis against the REST API.

mod client;
mod image;
mod video;

pub use client::{DEFAULT_BASE_URL, GeminiClient};
pub use video::{VideoRequest, VideoRequestBuilder};

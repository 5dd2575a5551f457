//! Core data types for the fabula storyboard generation library.
//!
//! This crate provides the provider-independent foundation types: the model
//! configuration handed in by the UI layer, the structured documents the
//! generation engines produce, the canonical output schemas, and the
//! extractor that recovers structured data from unreliable model text.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod documents;
mod extract;
mod schema;

pub use config::{AspectRatio, InferenceConfig, ModelConfig, Provider};
pub use documents::{
    GeneratedImage, GeneratedVideo, NamedElement, PlotPoint, SceneElement, StoryAnalysis,
    StoryPolish,
};
pub use extract::extract_json;
pub use schema::{SchemaNode, analysis_schema, polish_schema};

//! Structured documents produced by the generation engines.

use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// A named story element (character, prop, animal/plant, or other).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedElement {
    /// Element name as it appears in the story
    pub name: String,
    /// Visual description suitable for illustration prompts
    pub description: String,
}

/// A scene or setting extracted from the story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneElement {
    /// Visual description of the scene
    pub description: String,
}

/// A single plot point with a suggested illustration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotPoint {
    /// What happens at this point in the story
    pub description: String,
    /// Suggested visual composition for this moment
    pub suggested_visual: String,
}

/// Structured analysis of a folktale.
///
/// Array fields are ordered to match source-text order. Every field is
/// required: a model response missing any of them fails the parse, which is
/// how malformed fallback output gets caught.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryAnalysis {
    /// Story title
    pub title: String,
    /// Characters appearing in the story
    pub characters: Vec<NamedElement>,
    /// Scenes and settings
    pub scenes: Vec<SceneElement>,
    /// Props and objects
    pub props: Vec<NamedElement>,
    /// Animals and plants
    pub animals_plants: Vec<NamedElement>,
    /// Elements that fit no other category
    pub others: Vec<NamedElement>,
    /// Plot points in narrative order
    pub plot_points: Vec<PlotPoint>,
}

/// A critique-and-rewrite pass over a story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryPolish {
    /// Critique of the original text
    pub critique: String,
    /// The rewritten story
    pub rewritten_story: String,
    /// Individual changes the rewrite made
    pub changes_made: Vec<String>,
}

/// A generated illustration, materialized as local bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    /// MIME type of the image
    pub mime: String,
    /// Binary image data
    pub data: Vec<u8>,
}

impl GeneratedImage {
    /// Render as a `data:` URI for direct display.
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime,
            base64::engine::general_purpose::STANDARD.encode(&self.data)
        )
    }
}

/// A generated video clip, fetched and held as local bytes.
///
/// The remote result URI requires the caller's credential to download, so
/// engines materialize the binary instead of handing the URI onward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedVideo {
    /// MIME type of the video
    pub mime: String,
    /// Binary video data
    pub data: Vec<u8>,
}

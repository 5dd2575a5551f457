//! Prompt templates for the structured-generation and image engines.

/// Trivial prompt used by connectivity probes.
pub const PROBE_PROMPT: &str = "Hi";

/// Language codes whose scripts differ from the Latin default.
///
/// For these, narrative fields come back in the target script while fields
/// destined for downstream image/video prompts stay in English, which the
/// generation models handle far more reliably.
const NON_LATIN_SCRIPTS: &[&str] = &["zh", "ja", "ko", "ru", "ar", "th", "he", "el", "hi"];

/// Language directive appended to structured-generation prompts.
pub fn language_directive(language: &str) -> String {
    let tag = language
        .split(['-', '_'])
        .next()
        .unwrap_or(language)
        .to_lowercase();
    if tag.is_empty() || tag == "en" {
        return String::new();
    }
    if NON_LATIN_SCRIPTS.contains(&tag.as_str()) {
        format!(
            "\n\nWrite all narrative text fields in {language}. Keep every field that \
             feeds an image or video prompt (descriptions and suggested_visual) in \
             English, so downstream generation models can consume them."
        )
    } else {
        format!("\n\nWrite all narrative text fields in {language}.")
    }
}

/// Task prompt for story analysis.
pub fn analysis_prompt(story: &str, language: &str) -> String {
    format!(
        "You are a story analyst preparing a folktale for illustration. Read the \
         story below and extract its title, characters, scenes, props, animals and \
         plants, other notable elements, and the sequence of plot points. Keep every \
         list in the order elements first appear in the text. For each plot point, \
         suggest a single visual composition that could illustrate it.{directive}\n\n\
         Story:\n{story}",
        directive = language_directive(language),
    )
}

/// Task prompt for the critique-and-rewrite pass.
pub fn polish_prompt(story: &str, language: &str) -> String {
    format!(
        "You are an experienced story editor. Critique the folktale below, then \
         rewrite it with stronger pacing, clearer imagery, and consistent tone while \
         preserving its plot and characters. List each concrete change you \
         made.{directive}\n\nStory:\n{story}",
        directive = language_directive(language),
    )
}

/// Compose a single illustration prompt from element description and context.
pub fn image_prompt(description: &str, story_context: &str, negative_prompt: Option<&str>) -> String {
    let mut prompt = format!(
        "A storybook illustration in a warm, painterly folktale style. Subject: \
         {description}. Story context: {story_context}."
    );
    if let Some(negative) = negative_prompt.filter(|n| !n.trim().is_empty()) {
        prompt.push_str(&format!(" Do not include: {negative}."));
    }
    prompt
}

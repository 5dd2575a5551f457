//! Extraction of the real document types from messy model output, the way
//! fallback-path responses actually arrive.

use fabula_core::{StoryAnalysis, StoryPolish, extract_json};

#[test]
fn analysis_survives_prose_and_fences() {
    let raw = r#"Certainly! Here is the structured analysis you asked for:

```json
{
  "title": "The Fox and the Crow",
  "characters": [
    {"name": "Fox", "description": "A sleek red fox with a sly grin"},
    {"name": "Crow", "description": "A glossy black crow perched on a branch"}
  ],
  "scenes": [
    {"description": "A sunlit forest clearing beneath an old oak"}
  ],
  "props": [
    {"name": "Cheese", "description": "A wedge of golden cheese"}
  ],
  "animals_plants": [],
  "others": [],
  "plot_points": [
    {
      "description": "The crow opens her beak to sing and drops the cheese",
      "suggested_visual": "Cheese falling mid-air toward the waiting fox"
    }
  ]
}
```

Let me know if you need anything else!"#;

    let analysis: StoryAnalysis = extract_json(raw).unwrap();
    assert_eq!(analysis.title, "The Fox and the Crow");
    assert_eq!(analysis.characters.len(), 2);
    assert_eq!(analysis.plot_points[0].suggested_visual, "Cheese falling mid-air toward the waiting fox");
}

#[test]
fn polish_survives_trailing_commas() {
    let raw = r#"{
  "critique": "The pacing rushes the ending.",
  "rewritten_story": "Once upon a time, a crow found a wedge of cheese...",
  "changes_made": [
    "Slowed the final scene",
    "Gave the fox a closing line",
  ],
}"#;

    let polish: StoryPolish = extract_json(raw).unwrap();
    assert_eq!(polish.changes_made.len(), 2);
    assert!(polish.critique.contains("pacing"));
}

#[test]
fn non_latin_narrative_fields_survive_comma_repair() {
    let raw = r#"{
  "title": "狐狸与乌鸦",
  "characters": [{"name": "狐狸", "description": "A sleek red fox"},],
  "scenes": [],
  "props": [],
  "animals_plants": [],
  "others": [],
  "plot_points": [],
}"#;
    let analysis: StoryAnalysis = extract_json(raw).unwrap();
    assert_eq!(analysis.title, "狐狸与乌鸦");
    assert_eq!(analysis.characters[0].name, "狐狸");
}

#[test]
fn missing_required_field_fails_even_when_json_is_valid() {
    // Valid JSON, but no plot_points: the type boundary must reject it.
    let raw = r#"{"title": "T", "characters": [], "scenes": [], "props": [],
                  "animals_plants": [], "others": []}"#;
    assert!(extract_json::<StoryAnalysis>(raw).is_err());
}

#[test]
fn refusal_prose_reports_rather_than_panics() {
    let raw = "I'm sorry, but I can't help with that request.";
    let err = extract_json::<StoryAnalysis>(raw).unwrap_err();
    assert!(err.message.contains("can't help"));
}

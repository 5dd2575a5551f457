//! Wire-level tests for the OpenAI-compatible driver: document round-trip,
//! header handling, provider-specific body flags, and the connectivity probe.

mod test_utils;

use fabula_core::{ModelConfig, Provider};
use fabula_models::StoryEngine;
use serde_json::json;
use test_utils::MockServer;

const STORY: &str = "A hungry fox flatters a crow into dropping her cheese.";

fn config_for(provider: Provider, base_url: &str, api_key: Option<&str>) -> ModelConfig {
    ModelConfig {
        provider,
        api_key: api_key.map(str::to_string),
        base_url: base_url.to_string(),
        text_model: "gpt-4o".to_string(),
        image_model: None,
        video_model: None,
        inference: None,
    }
}

/// A chat completion whose first choice carries the given content.
fn chat_response(content: &str) -> String {
    json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    })
    .to_string()
}

fn analysis_document() -> String {
    json!({
        "title": "The Fox and the Crow",
        "characters": [
            { "name": "Fox", "description": "A sleek red fox with a sly grin" },
            { "name": "Crow", "description": "A glossy black crow perched high" }
        ],
        "scenes": [
            { "description": "A sunlit forest clearing under an old oak" }
        ],
        "props": [
            { "name": "Cheese", "description": "A wedge of golden cheese" }
        ],
        "animals_plants": [],
        "others": [],
        "plot_points": [{
            "description": "The crow opens her beak to sing and drops the cheese",
            "suggested_visual": "Cheese falling mid-air toward the waiting fox"
        }]
    })
    .to_string()
}

#[tokio::test]
async fn analyze_round_trips_a_structured_document() -> anyhow::Result<()> {
    let server = MockServer::spawn(vec![(200, chat_response(&analysis_document()))]).await?;

    let engine = StoryEngine::new();
    let config = config_for(Provider::OpenAi, &server.url(), Some("sk-test"));
    let analysis = engine.analyze(STORY, &config, "en").await?;
    assert_eq!(analysis.title, "The Fox and the Crow");
    assert_eq!(analysis.plot_points.len(), 1);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path(), "/chat/completions");
    assert!(requests[0].head.contains("authorization: Bearer sk-test")
        || requests[0].head.contains("Authorization: Bearer sk-test"));
    assert!(requests[0].body.contains(r#""model":"gpt-4o""#));
    assert!(
        requests[0].body.contains(r#""response_format""#),
        "OpenAI requests should carry the json_object hint"
    );
    Ok(())
}

#[tokio::test]
async fn fenced_model_output_still_parses() -> anyhow::Result<()> {
    let fenced = format!("```json\n{}\n```", analysis_document());
    let server = MockServer::spawn(vec![(200, chat_response(&fenced))]).await?;

    let engine = StoryEngine::new();
    let config = config_for(Provider::DeepSeek, &server.url(), Some("sk-test"));
    let analysis = engine.analyze(STORY, &config, "en").await?;
    assert_eq!(analysis.characters.len(), 2);
    Ok(())
}

#[tokio::test]
async fn anonymous_provider_sends_no_bearer_and_disables_streaming() -> anyhow::Result<()> {
    let server = MockServer::spawn(vec![(200, chat_response("ok"))]).await?;

    let engine = StoryEngine::new();
    let config = config_for(Provider::Ollama, &server.url(), None);
    assert!(engine.test_connection(&config).await);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert!(
        !requests[0].head.to_ascii_lowercase().contains("authorization:"),
        "anonymous requests must not carry a bearer header"
    );
    assert!(requests[0].body.contains(r#""stream":false"#));
    Ok(())
}

#[tokio::test]
async fn rejected_credential_fails_the_connection_test() -> anyhow::Result<()> {
    let server = MockServer::spawn(vec![(
        401,
        json!({ "error": { "message": "Incorrect API key provided" } }).to_string(),
    )])
    .await?;

    let engine = StoryEngine::new();
    let config = config_for(Provider::OpenAi, &server.url(), Some("sk-bad"));
    assert!(!engine.test_connection(&config).await);
    Ok(())
}

#[tokio::test]
async fn server_error_surfaces_status_and_body() -> anyhow::Result<()> {
    let server = MockServer::spawn(vec![(500, "upstream exploded".to_string())]).await?;

    let engine = StoryEngine::new();
    let config = config_for(Provider::SiliconFlow, &server.url(), Some("sk-test"));
    let error = engine.polish(STORY, &config, "en").await.unwrap_err();

    let provider = error.as_provider().expect("provider error");
    assert_eq!(provider.status(), Some(500));
    assert!(error.to_string().contains("upstream exploded"));
    Ok(())
}

#[tokio::test]
async fn configured_image_model_uses_the_provider_endpoint_directly() -> anyhow::Result<()> {
    // "QUJD" is base64 for ABC
    let server = MockServer::spawn(vec![(
        200,
        json!({ "data": [{ "b64_json": "QUJD" }] }).to_string(),
    )])
    .await?;

    let engine = StoryEngine::new();
    let mut config = config_for(Provider::OpenAi, &server.url(), Some("sk-test"));
    config.image_model = Some("dall-e-3".to_string());
    let image = engine
        .generate_image("A sly fox", "The Fox and the Crow", None, &config)
        .await?;
    assert_eq!(image.data, b"ABC");

    let requests = server.requests();
    assert_eq!(requests.len(), 1, "no reroute away from a configured image endpoint");
    assert_eq!(requests[0].path(), "/images/generations");
    assert!(requests[0].body.contains(r#""model":"dall-e-3""#));
    Ok(())
}

#[tokio::test]
async fn empty_chat_content_is_reported_as_empty_response() -> anyhow::Result<()> {
    let server = MockServer::spawn(vec![(200, chat_response("   "))]).await?;

    let engine = StoryEngine::new();
    let config = config_for(Provider::OpenAi, &server.url(), Some("sk-test"));
    let error = engine.analyze(STORY, &config, "en").await.unwrap_err();
    assert!(error.to_string().contains("empty response"));
    Ok(())
}

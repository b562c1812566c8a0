//! Integration tests for `RangeRanker` using wiremock HTTP mocks.

use fairway_finder::api::{RangeRanker, RANKING_PROMPT};
use fairway_finder::config::ApiConfig;
use fairway_finder::error::ServiceError;
use fairway_finder::models::{Coordinate, SourceKind};
use fairway_finder::normalize::normalize;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENDPOINT: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

fn test_ranker(base_url: &str) -> RangeRanker {
    let config = ApiConfig {
        base_url: base_url.to_string(),
        request_timeout_secs: 5,
        ..ApiConfig::default()
    };
    RangeRanker::new("test-key", &config).expect("client construction should not fail")
}

fn here() -> Coordinate {
    Coordinate::new(37.77, -122.41)
}

#[tokio::test]
async fn rank_sends_grounded_request_and_returns_text_verbatim() {
    let server = MockServer::start().await;
    let text = "Here are results:\n```json\n[{\"name\":\"Range A\",\"latitude\":1,\"longitude\":2}]\n```";

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(serde_json::json!({
            "tools": [{ "googleMaps": {} }],
            "toolConfig": {
                "retrievalConfig": {
                    "latLng": { "latitude": 37.77, "longitude": -122.41 }
                }
            },
            "contents": [{ "role": "user", "parts": [{ "text": RANKING_PROMPT }] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let completion = test_ranker(&server.uri())
        .rank(here())
        .await
        .expect("rank should succeed");

    assert_eq!(completion.text, text);
    assert!(completion.grounding.is_none());
    assert_eq!(normalize(&completion.text).len(), 1);
}

#[tokio::test]
async fn text_parts_are_concatenated_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "[{\"name\":" }, { "text": "\"Split\"}]" }] }
            }]
        })))
        .mount(&server)
        .await;

    let completion = test_ranker(&server.uri()).rank(here()).await.unwrap();
    assert_eq!(completion.text, "[{\"name\":\"Split\"}]");
}

#[tokio::test]
async fn grounding_metadata_is_passed_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "[]" }] },
                "groundingMetadata": {
                    "groundingChunks": [
                        { "maps": {
                            "uri": "https://maps.google.com/?cid=42",
                            "title": "Range A",
                            "placeAnswerSources": { "reviewSnippets": [{ "content": "Heated bays" }] }
                        } },
                        { "web": { "uri": "https://example.com/ranges", "title": "Best ranges" } }
                    ],
                    "searchEntryPoint": { "renderedContent": "<div class=\"chips\"></div>" }
                }
            }]
        })))
        .mount(&server)
        .await;

    let completion = test_ranker(&server.uri()).rank(here()).await.unwrap();
    let grounding = completion.grounding.expect("grounding should be present");

    assert_eq!(grounding.sources.len(), 2);
    assert_eq!(grounding.sources[0].kind, SourceKind::Maps);
    assert_eq!(grounding.sources[0].title.as_deref(), Some("Range A"));
    assert_eq!(
        grounding.sources[0].review_snippet.as_deref(),
        Some("Heated bays")
    );
    assert_eq!(grounding.sources[1].kind, SourceKind::Web);
    assert!(grounding.search_entry_html.is_some());
}

#[tokio::test]
async fn api_error_surfaces_provider_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "error": { "code": 403, "message": "API key not valid.", "status": "PERMISSION_DENIED" }
        })))
        .mount(&server)
        .await;

    let err = test_ranker(&server.uri()).rank(here()).await.unwrap_err();
    match err {
        ServiceError::Api { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "API key not valid.");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn blocked_prompt_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        })))
        .mount(&server)
        .await;

    let err = test_ranker(&server.uri()).rank(here()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Blocked(reason) if reason == "SAFETY"));
}

#[tokio::test]
async fn no_candidates_is_an_empty_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let completion = test_ranker(&server.uri()).rank(here()).await.unwrap();
    assert_eq!(completion.text, "");
}

#[tokio::test]
async fn non_json_success_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy login</html>"))
        .mount(&server)
        .await;

    let err = test_ranker(&server.uri()).rank(here()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Decode(_)));
}

#[tokio::test]
async fn unreachable_service_is_an_http_error() {
    // Nothing listens on this port once the server is dropped.
    let uri = {
        let server = MockServer::start().await;
        server.uri()
    };

    let err = test_ranker(&uri).rank(here()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Http(_)));
}

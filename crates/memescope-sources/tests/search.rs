//! Integration tests for `TavilyClient` using wiremock HTTP mocks.

use memescope_core::SearchDepth;
use memescope_sources::{SourceError, TavilyClient, WebSearch};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(base: &str) -> TavilyClient {
    TavilyClient::new("tvly-test", base, 5).expect("client construction should not fail")
}

#[tokio::test]
async fn search_posts_query_and_returns_results() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_json(json!({
            "api_key": "tvly-test",
            "query": "2025网络热梗流行语",
            "search_depth": "advanced",
            "max_results": 10
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": "2025网络热梗流行语",
            "results": [
                {
                    "title": "2025年度十大网络流行语",
                    "url": "https://example.com/a",
                    "content": "City不City、班味……",
                    "score": 0.93
                },
                { "title": "只有标题" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let results = client(&server.uri())
        .search("2025网络热梗流行语", SearchDepth::Advanced, 10)
        .await
        .expect("search should succeed");

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].title, "2025年度十大网络流行语");
    assert_eq!(results[0].url, "https://example.com/a");
    assert_eq!(results[1].content, "");
}

#[tokio::test]
async fn quick_depth_is_sent_as_basic() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .and(wiremock::matchers::body_partial_json(
            json!({ "search_depth": "basic", "max_results": 3 }),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let results = client(&server.uri())
        .search("meme", SearchDepth::Quick, 3)
        .await
        .expect("search should succeed");
    assert!(results.is_empty());
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(432).set_body_string("plan limit"))
        .mount(&server)
        .await;

    let err = client(&server.uri())
        .search("meme", SearchDepth::Advanced, 10)
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::UnexpectedStatus { status: 432, .. }));
}

#[tokio::test]
async fn malformed_body_is_a_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client(&server.uri())
        .search("meme", SearchDepth::Advanced, 10)
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::Deserialize { .. }));
}

#[test]
fn invalid_base_url_is_rejected() {
    let result = TavilyClient::new("k", "::nope::", 5);
    assert!(matches!(result, Err(SourceError::InvalidUrl { .. })));
}

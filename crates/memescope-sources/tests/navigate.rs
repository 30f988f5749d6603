//! Integration tests for `HttpNavigator` using wiremock HTTP mocks.

use memescope_sources::{HttpNavigator, PageNavigator, SourceError};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const UA: &str = "Mozilla/5.0 (X11; Linux x86_64) memescope-test";

#[tokio::test]
async fn navigate_returns_title_and_visible_text() {
    let server = MockServer::start().await;

    let html = r"<html><head><title>知乎热榜</title></head>
<body><script>track()</script><h2>1 班味是什么味</h2><h2>2 City不City</h2></body></html>";

    Mock::given(method("GET"))
        .and(path("/billboard"))
        .and(header("user-agent", UA))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string(html),
        )
        .expect(1)
        .mount(&server)
        .await;

    let navigator = HttpNavigator::new(UA, 5).expect("navigator construction should not fail");
    let page = navigator
        .navigate(&format!("{}/billboard", server.uri()))
        .await
        .expect("navigation should succeed");

    assert_eq!(page.title, "知乎热榜");
    assert_eq!(page.text, "1 班味是什么味\n2 City不City");
}

#[tokio::test]
async fn error_status_is_reported_with_url() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let navigator = HttpNavigator::new(UA, 5).expect("navigator construction should not fail");
    let url = format!("{}/hot", server.uri());
    let err = navigator.navigate(&url).await.unwrap_err();

    match err {
        SourceError::UnexpectedStatus { status, url: got } => {
            assert_eq!(status, 403);
            assert_eq!(got, url);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

//! HTTP-replay fallback (SPEC_FULL.md §4.7 "Main mode" body-unavailable path).

use std::collections::HashMap;

use gatecapture::capture::replay::{cookie_header_for_url, replay_request};
use gatecapture::session::CookieRecord;

#[tokio::test]
async fn replay_request_returns_body_on_success() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/asset.bin")
        .with_status(200)
        .with_body(b"payload-bytes".to_vec())
        .create_async()
        .await;

    let client = reqwest::Client::new();
    let url = format!("{}/asset.bin", server.url());
    let headers = HashMap::new();
    let body = replay_request(&client, "GET", &url, &headers, None).await.expect("replay succeeds");

    assert_eq!(body, b"payload-bytes");
    mock.assert_async().await;
}

#[tokio::test]
async fn replay_request_errors_on_4xx_5xx() {
    let mut server = mockito::Server::new_async().await;
    server.mock("GET", "/gone.bin").with_status(404).create_async().await;

    let client = reqwest::Client::new();
    let url = format!("{}/gone.bin", server.url());
    let headers = HashMap::new();
    let result = replay_request(&client, "GET", &url, &headers, None).await;

    assert!(result.is_err(), "a 404 replay must surface as BodyUnavailable, not success");
}

#[tokio::test]
async fn replay_request_forwards_cookie_header() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/with-cookie")
        .match_header("cookie", "session=abc123")
        .with_status(200)
        .with_body("ok")
        .create_async()
        .await;

    let client = reqwest::Client::new();
    let url = format!("{}/with-cookie", server.url());
    let headers = HashMap::new();
    replay_request(&client, "GET", &url, &headers, Some("session=abc123")).await.expect("replay succeeds");

    mock.assert_async().await;
}

#[test]
fn cookie_header_for_url_filters_by_domain() {
    let cookies = vec![
        cookie("a", "1", ".example.com"),
        cookie("b", "2", ".other.com"),
    ];
    let header = cookie_header_for_url(&cookies, "https://sub.example.com/page").expect("some cookies match");
    assert!(header.contains("a=1"));
    assert!(!header.contains("b=2"));
}

#[test]
fn cookie_header_for_url_is_none_when_nothing_matches() {
    let cookies = vec![cookie("a", "1", ".other.com")];
    assert!(cookie_header_for_url(&cookies, "https://example.com/page").is_none());
}

fn cookie(name: &str, value: &str, domain: &str) -> CookieRecord {
    CookieRecord {
        name: name.to_string(),
        value: value.to_string(),
        domain: domain.to_string(),
        path: "/".to_string(),
        expires: -1.0,
        http_only: false,
        secure: false,
        same_site: None,
    }
}

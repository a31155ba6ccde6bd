// Transport tests against a local mock server.
//
// Drives the reqwest-backed transport end to end: auth header, 429 backoff,
// failure bodies, the allow-list and multipart uploads.

use std::time::Duration;

use drama_client::api::retry::RetryPolicy;
use drama_client::{Attachment, Config, DramaClient, DramaError};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "secret-token";

fn client_for(server: &MockServer) -> DramaClient {
    let mut config = Config::new(TOKEN, server.address().to_string());
    config.https = false;
    config.retry = RetryPolicy {
        max_retries: Some(2),
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        jitter: false,
    };
    DramaClient::new(&config).unwrap()
}

// ============================================================
// Headers and bodies
// ============================================================

#[tokio::test]
async fn authorization_header_is_sent_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/post/7"))
        .and(header("authorization", TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7})))
        .expect(1)
        .mount(&server)
        .await;

    let post = client_for(&server).get_post(7).await.unwrap();

    assert_eq!(post, json!({"id": 7}));
}

#[tokio::test]
async fn plain_post_is_form_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/@alice/transfer_coins"))
        .and(header_regex("content-type", "^application/x-www-form-urlencoded"))
        .and(body_string_contains("amount=25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server).give_coins("alice", 25).await.unwrap();

    assert_eq!(response, json!({"message": "ok"}));
}

#[tokio::test]
async fn attachment_is_sent_as_multipart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/comment"))
        .and(header_regex("content-type", "^multipart/form-data"))
        .and(body_string_contains("c_5"))
        .and(body_string_contains("filename=\"cat.png\""))
        .and(body_string_contains("not really a png"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 100})))
        .expect(1)
        .mount(&server)
        .await;

    let file = Attachment::new("cat.png", "image/png", b"not really a png".to_vec());
    let response = client_for(&server)
        .reply_to_comment_by_id(5, 9, "look", Some(file))
        .await
        .unwrap();

    assert_eq!(response, json!({"id": 100}));
}

#[tokio::test]
async fn empty_success_body_is_null() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/clear"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server).clear_notifications().await.unwrap();

    assert!(response.is_null());
}

// ============================================================
// Failures and the allow-list
// ============================================================

#[tokio::test]
async fn failure_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/unread"))
        .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"error": "unauthorized"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_unread_notifications()
        .await
        .unwrap_err();

    match err {
        DramaError::RequestFailed {
            method,
            url,
            status,
            body,
        } => {
            assert_eq!(method, "GET");
            assert!(url.ends_with("/unread"));
            assert_eq!(status, 401);
            assert_eq!(body, r#"{"error": "unauthorized"}"#);
        }
        other => panic!("expected request failure, got {other:?}"),
    }
}

#[tokio::test]
async fn direct_message_reply_500_with_html_is_null() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/reply"))
        .and(body_string_contains("parent_id=77"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<h1>Internal Server Error</h1>"))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server)
        .reply_to_direct_message(77, "thanks")
        .await
        .unwrap();

    assert!(response.is_null());
}

#[tokio::test]
async fn unlisted_500_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/submit"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .make_post("title", "", "body")
        .await
        .unwrap_err();

    assert!(matches!(err, DramaError::RequestFailed { status: 500, .. }));
}

// ============================================================
// Rate limiting
// ============================================================

#[tokio::test]
async fn rate_limited_call_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/comment/3"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/comment/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 3})))
        .expect(1)
        .mount(&server)
        .await;

    let comment = client_for(&server).get_comment(3).await.unwrap();

    assert_eq!(comment, json!({"id": 3}));
}

#[tokio::test]
async fn persistent_rate_limit_exhausts_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let err = client_for(&server).get_front_page().await.unwrap_err();

    match err {
        DramaError::RetriesExhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert!(last.is_rate_limited());
        }
        other => panic!("expected retries exhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn rate_limit_on_allow_listed_request_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/reply"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/reply"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server)
        .reply_to_direct_message(12, "hi")
        .await
        .unwrap();

    assert_eq!(response, json!({"ok": true}));
}

use std::time::Duration;

use pantry_alerts::{MailTransport, ResendTransport, TransportError};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport(server: &MockServer, key: &str) -> ResendTransport {
    ResendTransport::new(key, server.uri(), Duration::from_secs(2)).unwrap()
}

async fn send(t: &ResendTransport) -> Result<String, TransportError> {
    t.send_html_email(
        "noreply@example.com",
        &["admin@example.com".to_string()],
        "1 food item(s) close to expiry",
        "<p>milk</p>",
    )
    .await
    .map(|s| s.id)
}

#[tokio::test]
async fn successful_send_returns_message_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(header("Authorization", "Bearer test-api-key"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "msg-123" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let id = send(&transport(&server, "test-api-key")).await.unwrap();
    assert_eq!(id, "msg-123");
}

#[tokio::test]
async fn unauthorized_maps_to_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "statusCode": 401,
            "message": "API key is invalid",
            "name": "unauthorized"
        })))
        .mount(&server)
        .await;

    let err = send(&transport(&server, "bad-key")).await.unwrap_err();
    assert!(matches!(err, TransportError::Auth(_)));
    assert!(err.to_string().contains("auth"));
    assert!(err.to_string().contains("API key is invalid"));
}

#[tokio::test]
async fn rate_limit_reads_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
        .mount(&server)
        .await;

    let err = send(&transport(&server, "k")).await.unwrap_err();
    assert!(matches!(
        err,
        TransportError::RateLimited {
            retry_after_secs: 30
        }
    ));
}

#[tokio::test]
async fn validation_error_is_invalid_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
            "statusCode": 422,
            "message": "Invalid `to` field",
        })))
        .mount(&server)
        .await;

    let err = send(&transport(&server, "k")).await.unwrap_err();
    assert!(matches!(err, TransportError::InvalidRequest(ref m) if m == "Invalid `to` field"));
}

#[tokio::test]
async fn server_error_keeps_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = send(&transport(&server, "k")).await.unwrap_err();
    assert!(matches!(err, TransportError::Server { status: 503, .. }));
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "id": "late" }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let t = ResendTransport::new("k", server.uri(), Duration::from_millis(200)).unwrap();
    let err = send(&t).await.unwrap_err();
    assert!(err.is_timeout(), "got {err:?}");
}

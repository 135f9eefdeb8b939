use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use daikin_onecta::{Error, OnectaClient, Result, StaticTokenProvider, TokenProvider};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> OnectaClient {
    OnectaClient::with_options(
        Arc::new(StaticTokenProvider::new("test-token")),
        server.uri(),
        Duration::from_secs(5),
    )
}

/// Hands out a stale token until `refresh` is called.
struct RotatingTokens {
    refreshes: AtomicUsize,
}

#[async_trait]
impl TokenProvider for RotatingTokens {
    async fn access_token(&self) -> Result<String> {
        if self.refreshes.load(Ordering::SeqCst) == 0 {
            Ok("stale-token".to_string())
        } else {
            Ok("fresh-token".to_string())
        }
    }

    async fn refresh(&self) -> Result<String> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok("fresh-token".to_string())
    }
}

#[tokio::test]
async fn get_sends_bearer_token_and_parses_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gateway-devices"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "dev-1"}])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let body = client.get("/gateway-devices").await.expect("get should succeed");
    assert_eq!(body[0]["id"], "dev-1");
}

#[tokio::test]
async fn non_200_read_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gateway-devices"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get("/gateway-devices")
        .await
        .unwrap_err();
    assert!(
        matches!(err, Error::Status { status: 500, .. }),
        "expected Status, got {err:?}"
    );
}

#[tokio::test]
async fn unparsable_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gateway-devices"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get("/gateway-devices")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Decode(_)), "expected Decode, got {err:?}");
}

#[tokio::test]
async fn accepted_write_records_timestamp() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(
            "/gateway-devices/dev-1/management-points/climateControl/characteristics/onOffMode",
        ))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.last_write().is_none());
    client
        .patch(
            "/gateway-devices/dev-1/management-points/climateControl/characteristics/onOffMode",
            &json!({"value": "on"}),
        )
        .await
        .expect("write should succeed");
    assert!(client.last_write().is_some());
}

#[tokio::test]
async fn rejected_write_records_no_timestamp() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(
            "/gateway-devices/dev-1/management-points/climateControl/characteristics/onOffMode",
        ))
        .respond_with(ResponseTemplate::new(422))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .patch(
            "/gateway-devices/dev-1/management-points/climateControl/characteristics/onOffMode",
            &json!({"value": "banana"}),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Status { status: 422, .. }));
    assert!(client.last_write().is_none());
}

#[tokio::test]
async fn rate_limit_headers_refresh_the_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gateway-devices"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .insert_header("X-RateLimit-Limit-minute", "10")
                .insert_header("X-RateLimit-Limit-day", "200")
                .insert_header("X-RateLimit-Remaining-minute", "7")
                .insert_header("X-RateLimit-Remaining-day", "143"),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.get("/gateway-devices").await.unwrap();

    let snap = client.rate_limits();
    assert_eq!(snap.limit_minute, 10);
    assert_eq!(snap.limit_day, 200);
    assert_eq!(snap.remaining_minute, 7);
    assert_eq!(snap.remaining_day, 143);
}

#[tokio::test]
async fn headers_are_captured_even_on_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gateway-devices"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("X-RateLimit-Limit-day", "200")
                .insert_header("X-RateLimit-Remaining-day", "0")
                .insert_header("Retry-After", "300"),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get("/gateway-devices").await.unwrap_err();
    assert!(matches!(err, Error::Status { status: 429, .. }));

    let snap = client.rate_limits();
    assert_eq!(snap.remaining_day, 0);
    assert_eq!(snap.retry_after, 300);
}

#[tokio::test]
async fn missing_headers_read_as_zero() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gateway-devices"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .insert_header("X-RateLimit-Remaining-day", "143"),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gateway-devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.get("/gateway-devices").await.unwrap();
    assert_eq!(client.rate_limits().remaining_day, 143);

    client.get("/gateway-devices").await.unwrap();
    assert_eq!(client.rate_limits(), Default::default());
}

#[tokio::test]
async fn rejected_token_is_refreshed_and_retried_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gateway-devices"))
        .and(header("authorization", "Bearer stale-token"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gateway-devices"))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = Arc::new(RotatingTokens {
        refreshes: AtomicUsize::new(0),
    });
    let client = OnectaClient::with_options(tokens.clone(), server.uri(), Duration::from_secs(5));

    client
        .get("/gateway-devices")
        .await
        .expect("retry with the fresh token should succeed");
    assert_eq!(tokens.refreshes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn second_rejection_surfaces_auth_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gateway-devices"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get("/gateway-devices")
        .await
        .unwrap_err();
    assert!(
        matches!(err, Error::AuthFailed),
        "expected AuthFailed, got {err:?}"
    );
}

#[tokio::test]
async fn connection_failure_is_an_error() {
    let client = OnectaClient::with_options(
        Arc::new(StaticTokenProvider::new("test-token")),
        "http://127.0.0.1:1",
        Duration::from_secs(1),
    );
    let err = client.get("/gateway-devices").await.unwrap_err();
    assert!(matches!(err, Error::Http(_)), "expected Http, got {err:?}");
}

//! Card checkout and credits managers against a mock paywall server.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use cedros_checkout::{
    CheckoutError, CheckoutRedirector, CheckoutRequest, CheckoutResult, CheckoutSession,
    CreditsManager, HostedCheckoutManager, RailConfig,
};
use cedros_http::ApiClient;
use cedros_resilience::{CircuitBreakerConfig, CircuitState, ResilienceError, RetryPolicy};
use cedros_types::ErrorCode;
use serde_json::json;
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn rail_config(failure_threshold: u32) -> RailConfig {
    RailConfig {
        retry: RetryPolicy::new(2, Duration::from_millis(10), 2.0, Duration::from_millis(50))
            .without_jitter(),
        breaker: CircuitBreakerConfig {
            failure_threshold,
            timeout: Duration::from_secs(30),
        },
    }
}

async fn server_with_prefix(prefix: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cedros-health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "routePrefix": prefix })))
        .mount(&server)
        .await;
    server
}

fn api(server: &MockServer) -> ApiClient {
    ApiClient::with_settings(
        &server.uri(),
        Duration::from_secs(2),
        RetryPolicy::quick().without_jitter(),
    )
    .unwrap()
}

#[derive(Default)]
struct RecordingRedirector {
    sessions: Mutex<Vec<CheckoutSession>>,
}

#[async_trait]
impl CheckoutRedirector for RecordingRedirector {
    async fn redirect_to_checkout(&self, session: &CheckoutSession) -> CheckoutResult<()> {
        self.sessions.lock().unwrap().push(session.clone());
        Ok(())
    }
}

#[tokio::test]
async fn test_process_payment_redirects_to_session() {
    let server = server_with_prefix("/api").await;
    Mock::given(method("POST"))
        .and(path("/api/paywall/v1/stripe-session"))
        .and(header_exists("Idempotency-Key"))
        .and(body_json(json!({
            "resource": "article-1",
            "customerEmail": "buyer@example.com",
            "successUrl": "https://shop.example.com/ok",
            "cancelUrl": "https://shop.example.com/cancel",
            "couponCode": "SAVE10",
            "metadata": { "orderId": "42" },
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sessionId": "cs_test_1",
            "url": "https://checkout.example.com/cs_test_1",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let manager = HostedCheckoutManager::new(api(&server), rail_config(5));
    let redirector = RecordingRedirector::default();
    let request = CheckoutRequest::new("article-1")
        .with_email("buyer@example.com")
        .with_urls("https://shop.example.com/ok", "https://shop.example.com/cancel")
        .with_coupon("SAVE10")
        .with_metadata("orderId", "42");

    let session = manager.process_payment(&request, &redirector).await.unwrap();

    assert_eq!(session.session_id, "cs_test_1");
    assert_eq!(redirector.sessions.lock().unwrap().as_slice(), &[session]);
}

#[tokio::test]
async fn test_retries_reuse_one_idempotency_key() {
    let server = server_with_prefix("").await;
    Mock::given(method("POST"))
        .and(path("/paywall/v1/stripe-session"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/paywall/v1/stripe-session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "sessionId": "cs_2" })))
        .mount(&server)
        .await;

    let manager = HostedCheckoutManager::new(api(&server), rail_config(5));
    let session = manager
        .create_session(&CheckoutRequest::new("article-1"))
        .await
        .unwrap();
    assert_eq!(session.session_id, "cs_2");

    let keys: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r: &&Request| r.url.path() == "/paywall/v1/stripe-session")
        .map(|r| {
            r.headers
                .get("idempotency-key")
                .unwrap()
                .to_str()
                .unwrap()
                .to_string()
        })
        .collect();
    assert_eq!(keys.len(), 3);
    assert!(keys.iter().all(|k| k == &keys[0]));
}

#[tokio::test]
async fn test_open_circuit_rejects_without_request() {
    let server = server_with_prefix("").await;
    Mock::given(method("POST"))
        .and(path("/paywall/v1/stripe-session"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let manager = HostedCheckoutManager::new(api(&server), rail_config(3));
    let request = CheckoutRequest::new("article-1");

    let err = manager.create_session(&request).await.unwrap_err();
    assert_eq!(err.business_code(), None);
    assert!(err.is_retryable());
    assert_eq!(manager.breaker().state(), CircuitState::Open);

    let err = manager.create_session(&request).await.unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::Api(cedros_http::ApiError::Resilience(ResilienceError::CircuitOpen { .. }))
    ));
    assert_eq!(manager.breaker().stats().rejection_count, 1);
}

#[tokio::test]
async fn test_session_creation_is_rate_limited() {
    let server = server_with_prefix("").await;
    Mock::given(method("POST"))
        .and(path("/paywall/v1/stripe-session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "sessionId": "cs" })))
        .expect(5)
        .mount(&server)
        .await;

    let manager = HostedCheckoutManager::new(api(&server), rail_config(5));
    let request = CheckoutRequest::new("article-1");
    for _ in 0..5 {
        manager.create_session(&request).await.unwrap();
    }

    let err = manager.create_session(&request).await.unwrap_err();
    assert!(err.is_admission());
}

#[tokio::test]
async fn test_credits_hold_and_authorize() {
    let server = server_with_prefix("").await;
    Mock::given(method("POST"))
        .and(path("/paywall/v1/credits/hold"))
        .and(header("Authorization", "Bearer user-token"))
        .and(body_json(json!({ "resource": "article-1", "couponCode": "SAVE10" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "holdId": "hold_1",
            "amount": 250,
            "currency": "credits",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/paywall/v1/credits/authorize"))
        .and(header("Authorization", "Bearer user-token"))
        .and(body_json(json!({ "holdId": "hold_1", "resource": "article-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let manager = CreditsManager::new(api(&server), rail_config(5));
    let hold = manager
        .create_hold("article-1", Some("SAVE10"), "user-token")
        .await
        .unwrap();
    assert_eq!(hold.hold_id, "hold_1");
    assert_eq!(hold.amount, 250);

    let settled = manager
        .authorize(&hold.hold_id, "article-1", "user-token")
        .await
        .unwrap();
    assert!(settled.success);
    assert_eq!(settled.transaction_id, "hold_1");
}

#[tokio::test]
async fn test_credits_business_errors() {
    let server = server_with_prefix("").await;
    Mock::given(method("POST"))
        .and(path("/paywall/v1/credits/hold"))
        .respond_with(ResponseTemplate::new(402).set_body_json(json!({
            "code": "insufficient_credits",
            "message": "Not enough credits",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/paywall/v1/credits/authorize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": "hold expired",
        })))
        .mount(&server)
        .await;

    let manager = CreditsManager::new(api(&server), rail_config(5));

    let err = manager.create_hold("article-1", None, "tok").await.unwrap_err();
    assert_eq!(err.business_code(), Some(ErrorCode::InsufficientCredits));

    let err = manager.authorize("hold_9", "article-1", "tok").await.unwrap_err();
    assert_eq!(
        err,
        CheckoutError::Declined {
            reason: "hold expired".into()
        }
    );

    let err = manager.create_hold("article-1", None, "").await.unwrap_err();
    assert_eq!(err, CheckoutError::Unauthenticated);
}

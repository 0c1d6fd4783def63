//! Route discovery against a mock server.

use std::sync::Arc;
use std::time::Duration;

use cedros_http::RouteResolver;
use cedros_resilience::RetryPolicy;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn resolver(server: &MockServer) -> RouteResolver {
    RouteResolver::new(
        reqwest::Client::new(),
        &server.uri(),
        RetryPolicy::new(2, Duration::from_millis(10), 2.0, Duration::from_millis(40)).without_jitter(),
        Duration::from_secs(2),
    )
}

#[tokio::test]
async fn test_resolves_and_caches_prefix() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cedros-health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "routePrefix": "api/" })))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = resolver(&server);
    assert_eq!(resolver.resolve().await, "/api");
    assert_eq!(resolver.resolve().await, "/api");
    assert_eq!(resolver.cached(), Some("/api".to_string()));
}

#[tokio::test]
async fn test_missing_prefix_caches_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cedros-health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = resolver(&server);
    assert_eq!(resolver.resolve().await, "");
    assert_eq!(resolver.cached(), Some(String::new()));
    assert_eq!(resolver.resolve().await, "");
}

#[tokio::test]
async fn test_not_found_is_a_valid_empty_prefix() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cedros-health"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = resolver(&server);
    assert_eq!(resolver.resolve().await, "");
    assert_eq!(resolver.cached(), Some(String::new()));
}

#[tokio::test]
async fn test_too_many_requests_caches_empty_prefix() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cedros-health"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = resolver(&server);
    assert_eq!(resolver.resolve().await, "");
    assert_eq!(resolver.cached(), Some(String::new()));
    // Cached, so no second discovery request.
    assert_eq!(resolver.resolve().await, "");
}

#[tokio::test]
async fn test_server_errors_are_retried_and_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cedros-health"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let resolver = resolver(&server);
    assert_eq!(resolver.resolve().await, "");
    assert_eq!(resolver.cached(), None);
}

#[tokio::test]
async fn test_recovers_after_transient_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cedros-health"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cedros-health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "routePrefix": "/v1" })))
        .mount(&server)
        .await;

    let resolver = resolver(&server);
    assert_eq!(resolver.resolve().await, "/v1");
    assert_eq!(resolver.cached(), Some("/v1".to_string()));
}

#[tokio::test]
async fn test_undecodable_body_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cedros-health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>starting up</html>"))
        .expect(3)
        .mount(&server)
        .await;

    let resolver = resolver(&server);
    assert_eq!(resolver.resolve().await, "");
    assert_eq!(resolver.cached(), None);
}

#[tokio::test]
async fn test_concurrent_first_calls_share_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cedros-health"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "routePrefix": "/api" }))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let resolver = Arc::new(resolver(&server));
    let (a, b, c) = tokio::join!(resolver.resolve(), resolver.resolve(), resolver.resolve());
    assert_eq!((a.as_str(), b.as_str(), c.as_str()), ("/api", "/api", "/api"));
}

#[tokio::test]
async fn test_reset_discards_pending_resolution() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cedros-health"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "routePrefix": "/old" }))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;

    let resolver = Arc::new(resolver(&server));
    let pending = {
        let resolver = Arc::clone(&resolver);
        tokio::spawn(async move { resolver.resolve().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    resolver.reset();
    assert_eq!(pending.await.unwrap(), "/old");
    // The resolution started before reset must not populate the cache.
    assert_eq!(resolver.cached(), None);
}

#[tokio::test]
async fn test_reset_forces_rediscovery() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cedros-health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "routePrefix": "/api" })))
        .expect(2)
        .mount(&server)
        .await;

    let resolver = resolver(&server);
    assert_eq!(resolver.resolve().await, "/api");
    resolver.reset();
    assert_eq!(resolver.cached(), None);
    assert_eq!(resolver.resolve().await, "/api");
}

mod support;

use serde::Deserialize;
use serde_json::{json, Value};
use vimeo_networking::test_support::{server_error_payload, test_settings};
use vimeo_networking::{
    CacheFetchPolicy, ErrorDomain, Fingerprint, LocalErrorCode, Method, Request, ResponseCache,
    RetryPolicy, ServerErrorCode, TransportError,
};

#[derive(Debug, Deserialize)]
struct User {
    name: String,
}

#[tokio::test]
async fn cache_only_miss_never_touches_network() {
    let client = support::TestClient::new();
    let request = Request::get("/me").with_cache_fetch_policy(CacheFetchPolicy::CacheOnly);

    let mut stream = client.dispatcher.execute::<User>(request);
    let err = stream
        .next_response()
        .await
        .expect("one item")
        .expect_err("cache miss");

    assert!(err.is_local(LocalErrorCode::CachedResponseNotFound));
    assert!(stream.next_response().await.is_none());
    assert_eq!(client.transport.send_count(), 0);
}

#[tokio::test]
async fn network_response_is_persisted_then_served_from_disk_cache() {
    let client = support::TestClient::new();
    client.transport.push_json(200, json!({"name": "Ada"}));

    let first = client
        .dispatcher
        .execute_final::<User>(Request::get("/me"))
        .await
        .expect("network response");
    assert!(!first.is_cached_response);

    let cached = client
        .dispatcher
        .execute_final::<User>(
            Request::get("/me").with_cache_fetch_policy(CacheFetchPolicy::CacheOnly),
        )
        .await
        .expect("cached response");
    assert!(cached.is_cached_response);
    assert!(cached.is_final_response);
    assert_eq!(cached.model.name, "Ada");
    assert_eq!(client.transport.send_count(), 1);
}

#[tokio::test]
async fn cache_then_network_orders_cached_before_final() {
    let client = support::TestClient::new();
    let request = Request::get("/me");
    client
        .cache
        .put(&Fingerprint::of(&request), json!({"name": "stale"}));
    client.transport.push_json(200, json!({"name": "fresh"}));

    let mut stream = client.dispatcher.execute::<User>(request.clone());
    let mut seen = Vec::new();
    while let Some(item) = stream.next_response().await {
        let response = item.expect("response");
        seen.push((response.is_cached_response, response.is_final_response));
    }

    assert_eq!(seen, vec![(true, false), (false, true)]);
    assert_eq!(
        client.cache.get(&Fingerprint::of(&request)),
        Some(json!({"name": "fresh"}))
    );
}

#[test]
fn fingerprint_ignores_parameter_order() {
    let a = Request::get("/videos")
        .with_parameter("page", 2)
        .with_parameter("query", "cats");
    let b = Request::get("/videos")
        .with_parameter("query", "cats")
        .with_parameter("page", 2);
    assert_eq!(Fingerprint::of(&a), Fingerprint::of(&b));
}

#[tokio::test(start_paused = true)]
async fn fixed_count_three_sends_four_times_on_transport_failure() {
    let client = support::TestClient::new();
    for _ in 0..4 {
        client
            .transport
            .push_error(TransportError::Timeout("deadline elapsed".to_string()));
    }

    let err = client
        .dispatcher
        .execute_final::<Value>(Request::get("/me").with_retry_policy(RetryPolicy::FixedCount(3)))
        .await
        .expect_err("every attempt fails");

    assert_eq!(err.domain(), ErrorDomain::Transport);
    assert_eq!(client.transport.send_count(), 4);
    assert_eq!(client.transport.remaining(), 0);
}

#[tokio::test]
async fn quota_error_is_server_reported_not_http_status() {
    let client = support::TestClient::new();
    client
        .transport
        .push_json(400, server_error_payload(4101, "Upload quota exceeded"));

    let err = client
        .dispatcher
        .execute_final::<Value>(Request::new(Method::Post, "/me/videos"))
        .await
        .expect_err("quota exceeded");

    assert_eq!(err.domain(), ErrorDomain::ServerReported);
    assert_eq!(err.code(), 4101);
    assert_eq!(
        err.server_error_code(),
        Some(ServerErrorCode::UploadStorageQuotaExceeded)
    );
    assert_eq!(err.http_status(), Some(400));
}

#[tokio::test]
async fn failures_are_not_cached() {
    let client = support::TestClient::new();
    client.transport.push_json(503, json!({"error": "maintenance"}));
    let request = Request::get("/me");

    let err = client
        .dispatcher
        .execute_final::<User>(request.clone())
        .await
        .expect_err("unavailable");
    assert_eq!(err.domain(), ErrorDomain::HttpStatus);
    assert_eq!(err.code(), 503);
    assert_eq!(client.cache.get(&Fingerprint::of(&request)), None);
}

#[tokio::test]
async fn requests_target_configured_base_url() {
    let client = support::TestClient::new();
    client.transport.push_json(200, json!({"name": "Ada"}));

    client
        .dispatcher
        .execute_final::<User>(Request::get("me"))
        .await
        .expect("response");

    let sent = client.transport.sent();
    assert_eq!(sent[0].url, format!("{}/me", test_settings().base_url));
    assert_eq!(
        sent[0].header("user-agent"),
        Some(test_settings().user_agent.as_str())
    );
}

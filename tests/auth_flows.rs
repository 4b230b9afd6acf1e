mod support;

use serde_json::{json, Value};
use vimeo_networking::test_support::{server_error_payload, test_settings, token_payload};
use vimeo_networking::{
    AuthGrant, CodeGrantRequest, ErrorDomain, LocalErrorCode, Method, Request, Scope,
    ServerErrorCode,
};

fn sent_body(client: &support::TestClient, index: usize) -> Value {
    let sent = client.transport.sent();
    serde_json::from_slice(sent[index].body.as_deref().expect("json body")).expect("valid json")
}

#[tokio::test]
async fn log_in_posts_password_grant() {
    let client = support::TestClient::new();
    client.transport.push_json(200, token_payload("tok-1", "public"));

    client
        .auth
        .log_in("a@b.com", "pw", vec![Scope::Public])
        .await
        .expect("logged in");

    let sent = client.transport.sent();
    assert_eq!(sent[0].method, Method::Post);
    assert!(sent[0].url.ends_with("/oauth/authorize/password"));
    assert_eq!(
        sent_body(&client, 0),
        json!({
            "grant_type": "password",
            "scope": "public",
            "username": "a@b.com",
            "password": "pw"
        })
    );
}

#[tokio::test]
async fn log_in_without_token_is_auth_token_error() {
    let client = support::TestClient::new();
    client.transport.push_json(200, json!({"user": {"name": "Ada"}}));

    let err = client
        .auth
        .log_in("a@b.com", "pw", vec![Scope::Public])
        .await
        .expect_err("no token");

    assert!(err.is_local(LocalErrorCode::AuthToken));
    assert!(!client.auth.session().is_authenticated());
}

#[tokio::test]
async fn session_token_authorizes_later_requests() {
    let client = support::TestClient::new();
    client.transport.push_json(200, token_payload("tok-2", "public private"));
    client.transport.push_json(200, json!({"name": "Ada"}));

    client
        .auth
        .client_credentials(vec![Scope::Public, Scope::Private])
        .await
        .expect("authenticated");
    client
        .dispatcher
        .execute_final::<Value>(Request::get("/me"))
        .await
        .expect("me");

    let sent = client.transport.sent();
    assert_eq!(sent[1].header("authorization"), Some("Bearer tok-2"));
}

#[tokio::test]
async fn join_surfaces_invalid_parameter_codes() {
    let client = support::TestClient::new();
    let mut payload = server_error_payload(2204, "Invalid parameters");
    payload["invalid_parameters"] = json!([
        {"field": "email", "error_code": 2216, "error": "Email too long"}
    ]);
    client.transport.push_json(400, payload);

    let err = client
        .auth
        .join("Ada", "a@b.com", "pw", vec![Scope::Public])
        .await
        .expect_err("rejected");

    assert_eq!(err.domain(), ErrorDomain::ServerReported);
    assert_eq!(err.server_error_code(), Some(ServerErrorCode::InvalidRequestInput));
    assert_eq!(err.first_invalid_parameter_code(), Some(2216));
    assert_eq!(sent_body(&client, 0)["display_name"], "Ada");
}

#[tokio::test]
async fn facebook_join_and_app_exchange_use_their_paths() {
    let client = support::TestClient::new();
    client.transport.push_json(200, token_payload("fb-tok", "public"));
    client.transport.push_json(200, token_payload("app-tok", "public"));

    client
        .auth
        .facebook_join("fb-token", vec![Scope::Public])
        .await
        .expect("joined");
    client
        .auth
        .app_token_exchange("other-app-token")
        .await
        .expect("exchanged");

    let sent = client.transport.sent();
    assert!(sent[0].url.ends_with("/users"));
    assert!(sent[1].url.ends_with("/oauth/appexchange"));
    assert_eq!(sent_body(&client, 1), json!({"access_token": "other-app-token"}));
    assert_eq!(
        client.auth.session().current().expect("session").access_token,
        "app-tok"
    );
}

#[tokio::test]
async fn code_grant_round_trip() {
    let client = support::TestClient::new();
    client.transport.push_json(200, token_payload("code-tok", "public"));

    let authorize = CodeGrantRequest::new(&test_settings(), "myapp://auth", &[Scope::Public])
        .expect("authorize request");
    let redirect = format!("myapp://auth?code=xyz&state={}", authorize.state());
    let code = authorize.parse_redirect(&redirect).expect("code");

    let session = client
        .auth
        .authenticate(authorize.grant(code))
        .await
        .expect("exchanged code");
    assert_eq!(session.access_token, "code-tok");

    let body = sent_body(&client, 0);
    assert_eq!(body["grant_type"], "authorization_code");
    assert_eq!(body["code"], "xyz");
    assert_eq!(body["redirect_uri"], "myapp://auth");
    assert!(client.transport.sent()[0].url.ends_with("/oauth/access_token"));
}

#[tokio::test]
async fn log_out_deletes_token_and_clears_session() {
    let client = support::TestClient::new();
    client.transport.push_json(200, token_payload("tok-3", "public"));
    client.transport.push_json(200, json!({}));

    client
        .auth
        .client_credentials(vec![Scope::Public])
        .await
        .expect("authenticated");
    client.auth.log_out().await.expect("logged out");

    let sent = client.transport.sent();
    assert_eq!(sent[1].method, Method::Delete);
    assert!(sent[1].url.ends_with("/tokens"));
    assert!(!client.auth.session().is_authenticated());
}

#[test]
fn delete_token_grant_allows_three_attempts() {
    let request = AuthGrant::DeleteToken.request();
    assert_eq!(request.retry_policy.max_retries() + 1, 3);
}

#![allow(clippy::unwrap_used)]
// Integration tests for `ImatrixClient` using wiremock.

use pretty_assertions::assert_eq;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use imatrix_api::{
    Credentials, Error, ImatrixClient, TransportConfig, VerifyOutcome, verify_credentials,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn credentials() -> Credentials {
    Credentials::new("owner@example.com", SecretString::from("s3cret".to_string()))
}

async fn setup() -> (MockServer, ImatrixClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = ImatrixClient::with_client(reqwest::Client::new(), base_url, credentials());
    (server, client)
}

async fn mount_login(server: &MockServer, token: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_json(json!({ "email": "owner@example.com", "password": "s3cret" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": token })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

// ── Login ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_stores_token() {
    let (server, client) = setup().await;
    mount_login(&server, "tok-1", 1).await;

    let token = client.login().await.unwrap();

    assert_eq!(token.expose_secret(), "tok-1");
    assert_eq!(
        client.token_store().get().unwrap().expose_secret(),
        "tok-1"
    );
}

#[tokio::test]
async fn test_login_unauthorized_is_invalid_credentials() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client.login().await;

    assert!(
        matches!(result, Err(Error::InvalidCredentials)),
        "expected InvalidCredentials, got: {result:?}"
    );
    assert!(client.token_store().get().is_none());
}

#[tokio::test]
async fn test_login_without_token_field_fails() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "user": "x" })))
        .mount(&server)
        .await;

    let result = client.login().await;

    match result {
        Err(ref e @ Error::Authentication { ref message }) => {
            assert!(e.is_auth_failure());
            assert!(message.contains("token"), "unexpected message: {message}");
        }
        other => panic!("expected Authentication error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_login_server_error_is_auth_failure() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client.login().await.unwrap_err();
    assert!(err.is_auth_failure(), "got: {err:?}");
}

#[tokio::test]
async fn test_refresh_returns_none_on_failure() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client.refresh().await.is_none());
}

// ── Endpoints ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_things_sends_token_and_page() {
    let (server, client) = setup().await;
    mount_login(&server, "tok-1", 1).await;

    Mock::given(method("GET"))
        .and(path("/things"))
        .and(query_param("page", "1"))
        .and(query_param("per_page", "100"))
        .and(header("x-auth-token", "tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "list": [
                { "sn": 1001, "name": "Cold room", "currentVersion": "1.2.3", "mac": "aa:bb" },
                { "sn": "1002" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    client.login().await.unwrap();
    let things = client.list_things().await.unwrap();

    assert_eq!(things.len(), 2);
    assert_eq!(things[0].sn, "1001");
    assert_eq!(things[0].name.as_deref(), Some("Cold room"));
    assert_eq!(things[0].current_version.as_deref(), Some("1.2.3"));
    assert_eq!(things[1].sn, "1002");
    assert!(things[1].mac.is_none());
}

#[tokio::test]
async fn test_latest_values_extracts_own_serial() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/things/1001/sensors/last"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "1001": { "lastSeen": 1_700_000_000_000_i64, "sensorsData": { "3": { "value": 4.2 } } }
        })))
        .mount(&server)
        .await;

    client
        .token_store()
        .replace(SecretString::from("tok-1".to_string()));
    let latest = client.latest_values("1001").await.unwrap();

    assert_eq!(latest.last_seen, Some(1_700_000_000_000));
    assert_eq!(latest.value("3"), Some(&json!(4.2)));
}

#[tokio::test]
async fn test_latest_values_missing_serial_is_empty() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/things/1001/sensors/last"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let latest = client.latest_values("1001").await.unwrap();
    assert!(latest.last_seen.is_none());
    assert!(latest.sensors_data.is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/things/1001/sensors"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = client.list_sensors("1001").await.unwrap_err();
    assert!(matches!(err, Error::Deserialization { .. }), "got: {err:?}");
    assert!(err.is_transient());
}

// ── Token refresh ───────────────────────────────────────────────────

#[tokio::test]
async fn test_unauthorized_refreshes_once_and_retries() {
    let (server, client) = setup().await;
    mount_login(&server, "tok-new", 1).await;

    Mock::given(method("GET"))
        .and(path("/things/1001/product"))
        .and(header("x-auth-token", "tok-old"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/things/1001/product"))
        .and(header("x-auth-token", "tok-new"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "shortName": "NEO-1D", "iconUrl": "https://x/i.png" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    client
        .token_store()
        .replace(SecretString::from("tok-old".to_string()));
    let product = client.get_product("1001").await.unwrap();

    assert_eq!(product.short_name.as_deref(), Some("NEO-1D"));
    assert_eq!(
        client.token_store().get().unwrap().expose_secret(),
        "tok-new"
    );
}

#[tokio::test]
async fn test_failed_refresh_is_token_expired() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/things/1001/sensors/last"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let err = client.latest_values("1001").await.unwrap_err();
    assert!(err.is_auth_expired(), "got: {err:?}");
}

#[tokio::test]
async fn test_second_unauthorized_is_not_retried_again() {
    let (server, client) = setup().await;
    mount_login(&server, "tok-new", 1).await;

    Mock::given(method("GET"))
        .and(path("/things"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let err = client.list_things().await.unwrap_err();
    assert!(matches!(err, Error::TokenExpired), "got: {err:?}");
}

// ── Credential verification ─────────────────────────────────────────

#[tokio::test]
async fn test_verify_credentials_classifies_outcomes() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1", 1).await;

    let outcome =
        verify_credentials(&server.uri(), &credentials(), &TransportConfig::default()).await;
    assert_eq!(outcome, VerifyOutcome::Valid);

    let wrong = Credentials::new("owner@example.com", SecretString::from("nope".to_string()));
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let outcome = verify_credentials(&server.uri(), &wrong, &TransportConfig::default()).await;
    assert_eq!(outcome, VerifyOutcome::InvalidAuth);
}

#[tokio::test]
async fn test_verify_credentials_unreachable() {
    // Port 9 (discard) on localhost is reliably closed in test environments.
    let outcome = verify_credentials(
        "http://127.0.0.1:9",
        &credentials(),
        &TransportConfig::default(),
    )
    .await;
    assert!(matches!(outcome, VerifyOutcome::CannotConnect(_)), "got: {outcome:?}");
}

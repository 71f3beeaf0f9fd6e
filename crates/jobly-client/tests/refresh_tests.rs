//! Token refresh behavior against a mock Jobly API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use jobly_client::{
    ApiRequest, ClientConfig, ClientError, ClientResult, CredentialKey, CredentialStore,
    JoblyClient, MemoryCredentialStore,
};

// =============================================================================
// Test Helpers
// =============================================================================

/// Memory store that counts `clear` calls.
#[derive(Default)]
struct CountingStore {
    inner: MemoryCredentialStore,
    clears: AtomicUsize,
}

impl CountingStore {
    fn with_tokens(access: &str, refresh: &str) -> Self {
        Self {
            inner: MemoryCredentialStore::with_tokens(access, refresh),
            clears: AtomicUsize::new(0),
        }
    }

    fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl CredentialStore for CountingStore {
    fn get(&self, key: CredentialKey) -> ClientResult<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: CredentialKey, value: &str) -> ClientResult<()> {
        self.inner.set(key, value)
    }

    fn remove(&self, key: CredentialKey) -> ClientResult<()> {
        self.inner.remove(key)
    }

    fn clear(&self) -> ClientResult<()> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.inner.clear()
    }
}

fn client_for(
    server: &MockServer,
    store: Arc<dyn CredentialStore>,
    expirations: Arc<AtomicUsize>,
) -> JoblyClient {
    let config = ClientConfig::with_base_url(server.uri()).unwrap();
    JoblyClient::builder(config, store)
        .on_session_expired(move || {
            expirations.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap()
}

fn empty_page() -> serde_json::Value {
    json!({ "count": 0, "next": null, "previous": null, "results": [] })
}

fn unauthorized() -> ResponseTemplate {
    ResponseTemplate::new(401).set_body_json(json!({
        "detail": "Given token not valid for any token type"
    }))
}

/// Refresh endpoint answering with a new access token after `delay`.
async fn mount_refresh_success(server: &MockServer, refresh: &str, access: &str, delay: Duration) {
    Mock::given(method("POST"))
        .and(path("/auth/refresh_token/"))
        .and(body_json(json!({ "refresh": refresh })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access": access }))
                .set_delay(delay),
        )
        .expect(1)
        .mount(server)
        .await;
}

// =============================================================================
// Single-flight
// =============================================================================

#[tokio::test]
async fn test_concurrent_unauthorized_requests_share_one_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/jobs/"))
        .and(header("Authorization", "JWT expired"))
        .respond_with(unauthorized())
        .expect(5)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jobs/"))
        .and(header("Authorization", "JWT fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_page()))
        .expect(5)
        .mount(&server)
        .await;
    mount_refresh_success(&server, "r1", "fresh", Duration::from_millis(300)).await;

    let store = Arc::new(MemoryCredentialStore::with_tokens("expired", "r1"));
    let expirations = Arc::new(AtomicUsize::new(0));
    let client = client_for(&server, store.clone(), expirations.clone());

    let results = join_all((0..5).map(|_| client.execute(ApiRequest::get("/jobs/")))).await;

    for result in results {
        assert_eq!(result.unwrap().status().as_u16(), 200);
    }
    assert_eq!(
        store.get(CredentialKey::AccessToken).unwrap().as_deref(),
        Some("fresh")
    );
    assert_eq!(expirations.load(Ordering::SeqCst), 0);
    assert!(!client.is_refreshing());
}

#[tokio::test]
async fn test_refresh_sends_refresh_token_without_authorization() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/profile/"))
        .and(header("Authorization", "JWT expired"))
        .respond_with(unauthorized())
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/profile/"))
        .and(header("Authorization", "JWT fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;
    mount_refresh_success(&server, "r1", "fresh", Duration::ZERO).await;

    let client = client_for(
        &server,
        Arc::new(MemoryCredentialStore::with_tokens("expired", "r1")),
        Arc::new(AtomicUsize::new(0)),
    );
    client.execute(ApiRequest::get("/auth/profile/")).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let refresh = requests
        .iter()
        .find(|r| r.url.path() == "/auth/refresh_token/")
        .unwrap();
    assert!(!refresh.headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_rotated_refresh_token_is_stored() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/applications/my_applications/"))
        .and(header("Authorization", "JWT expired"))
        .respond_with(unauthorized())
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/applications/my_applications/"))
        .and(header("Authorization", "JWT fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh_token/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "access": "fresh", "refresh": "r2" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::with_tokens("expired", "r1"));
    let client = client_for(&server, store.clone(), Arc::new(AtomicUsize::new(0)));

    let mine = client.applications().my_applications().await.unwrap();
    assert!(mine.is_empty());
    assert_eq!(
        store.get(CredentialKey::RefreshToken).unwrap().as_deref(),
        Some("r2")
    );
}

// =============================================================================
// Retry limits and exclusions
// =============================================================================

#[tokio::test]
async fn test_retried_request_is_not_refreshed_again() {
    let server = MockServer::start().await;

    // Rejects every token, including the refreshed one.
    Mock::given(method("GET"))
        .and(path("/jobs/my_jobs/"))
        .respond_with(unauthorized())
        .expect(2)
        .mount(&server)
        .await;
    mount_refresh_success(&server, "r1", "fresh", Duration::ZERO).await;

    let store = Arc::new(MemoryCredentialStore::with_tokens("expired", "r1"));
    let expirations = Arc::new(AtomicUsize::new(0));
    let client = client_for(&server, store.clone(), expirations.clone());

    let err = client
        .execute(ApiRequest::get("/jobs/my_jobs/"))
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(expirations.load(Ordering::SeqCst), 0);
    // The refreshed pair is kept; only a failed refresh ends the session.
    assert_eq!(
        store.get(CredentialKey::AccessToken).unwrap().as_deref(),
        Some("fresh")
    );
}

#[tokio::test]
async fn test_guest_unauthorized_short_circuits() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/applications/status_summary/"))
        .respond_with(unauthorized())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh_token/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "x" })))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(CountingStore::default());
    let expirations = Arc::new(AtomicUsize::new(0));
    let client = client_for(&server, store.clone(), expirations.clone());

    let err = client
        .execute(ApiRequest::get("/applications/status_summary/"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert!(!err.is_session_expired());
    assert_eq!(expirations.load(Ordering::SeqCst), 0);
    assert_eq!(store.clears(), 0);

    let requests = server.received_requests().await.unwrap();
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_login_unauthorized_never_refreshes() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login/"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "error": "Invalid credentials" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh_token/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "x" })))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::with_tokens("stale", "r1"));
    let client = client_for(&server, store.clone(), Arc::new(AtomicUsize::new(0)));

    let err = client
        .auth()
        .login("ada@example.com", "wrong-password")
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(err.api_message(), "Invalid credentials");
    assert_eq!(
        store.get(CredentialKey::RefreshToken).unwrap().as_deref(),
        Some("r1")
    );
}

#[tokio::test]
async fn test_skip_refresh_bypasses_recovery() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/profile/"))
        .respond_with(unauthorized())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh_token/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "x" })))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(
        &server,
        Arc::new(MemoryCredentialStore::with_tokens("expired", "r1")),
        Arc::new(AtomicUsize::new(0)),
    );

    let err = client
        .execute(ApiRequest::get("/auth/profile/").skip_refresh())
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
}

// =============================================================================
// Refresh failure
// =============================================================================

#[tokio::test]
async fn test_failed_refresh_clears_credentials_and_notifies_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reviews/my_reviews/"))
        .respond_with(unauthorized())
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh_token/"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({
                    "error": "Invalid or expired refresh token. Please login again."
                }))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(CountingStore::with_tokens("expired", "r1"));
    store.set(CredentialKey::User, r#"{"full_name":"Ada"}"#).unwrap();
    let expirations = Arc::new(AtomicUsize::new(0));
    let client = client_for(&server, store.clone(), expirations.clone());

    let results =
        join_all((0..3).map(|_| client.execute(ApiRequest::get("/reviews/my_reviews/")))).await;

    for result in results {
        let err = result.unwrap_err();
        assert!(err.is_session_expired(), "unexpected error: {err}");
        assert_eq!(err.status(), Some(401));
    }
    assert_eq!(expirations.load(Ordering::SeqCst), 1);
    assert_eq!(store.clears(), 1);
    for key in CredentialKey::ALL {
        assert_eq!(store.get(key).unwrap(), None);
    }
    assert!(!client.is_refreshing());
}

#[tokio::test]
async fn test_malformed_refresh_response_ends_session() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/jobs/my_jobs/"))
        .respond_with(unauthorized())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh_token/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::with_tokens("expired", "r1"));
    let expirations = Arc::new(AtomicUsize::new(0));
    let client = client_for(&server, store.clone(), expirations.clone());

    let err = client.jobs().my_jobs().await.unwrap_err();
    assert!(matches!(err, ClientError::Refresh(ref e) if e.message.contains("Invalid refresh response")));
    assert_eq!(expirations.load(Ordering::SeqCst), 1);
    assert_eq!(store.get(CredentialKey::AccessToken).unwrap(), None);
}

#[tokio::test]
async fn test_new_refresh_cycle_after_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/jobs/my_jobs/"))
        .and(header("Authorization", "JWT fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jobs/my_jobs/"))
        .respond_with(unauthorized())
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh_token/"))
        .and(body_json(json!({ "refresh": "revoked" })))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "revoked" })))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh_success(&server, "r2", "fresh", Duration::ZERO).await;

    let store = Arc::new(MemoryCredentialStore::with_tokens("expired", "revoked"));
    let expirations = Arc::new(AtomicUsize::new(0));
    let client = client_for(&server, store.clone(), expirations.clone());

    assert!(client.jobs().my_jobs().await.unwrap_err().is_session_expired());

    // Signing in again gives the next 401 a fresh cycle.
    store.set_tokens("expired", "r2").unwrap();
    assert!(client.jobs().my_jobs().await.unwrap().is_empty());
    assert_eq!(expirations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancelled_leader_does_not_expire_queued_requests() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/jobs/my_jobs/"))
        .and(header("Authorization", "JWT expired"))
        .respond_with(unauthorized())
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jobs/my_jobs/"))
        .and(header("Authorization", "JWT fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    // The first cycle is cut short by the leader's timeout; the queued
    // request then leads a second one.
    Mock::given(method("POST"))
        .and(path("/auth/refresh_token/"))
        .and(body_json(json!({ "refresh": "r1" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access": "fresh" }))
                .set_delay(Duration::from_millis(400)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let store = Arc::new(CountingStore::with_tokens("expired", "r1"));
    let expirations = Arc::new(AtomicUsize::new(0));
    let client = client_for(&server, store.clone(), expirations.clone());

    let leader = tokio::time::timeout(
        Duration::from_millis(150),
        client.execute(ApiRequest::get("/jobs/my_jobs/")),
    );
    let follower = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        client.execute(ApiRequest::get("/jobs/my_jobs/")).await
    };
    let (leader, follower) = tokio::join!(leader, follower);

    assert!(leader.is_err(), "leader should have timed out");
    assert_eq!(follower.unwrap().status().as_u16(), 200);
    assert_eq!(expirations.load(Ordering::SeqCst), 0);
    assert_eq!(store.clears(), 0);
    assert_eq!(
        store.get(CredentialKey::AccessToken).unwrap().as_deref(),
        Some("fresh")
    );
    assert_eq!(
        store.get(CredentialKey::RefreshToken).unwrap().as_deref(),
        Some("r1")
    );
    assert!(!client.is_refreshing());
}

// =============================================================================
// Mixed outcomes and transport failures
// =============================================================================

#[tokio::test]
async fn test_forbidden_response_propagates_while_others_refresh() {
    let server = MockServer::start().await;

    for endpoint in ["/jobs/my_jobs/", "/reviews/my_reviews/"] {
        Mock::given(method("GET"))
            .and(path(endpoint))
            .and(header("Authorization", "JWT expired"))
            .respond_with(unauthorized())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(endpoint))
            .and(header("Authorization", "JWT fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/applications/status_summary/"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({
                "detail": "You do not have permission to perform this action."
            })),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh_success(&server, "r1", "fresh", Duration::from_millis(300)).await;

    let client = client_for(
        &server,
        Arc::new(MemoryCredentialStore::with_tokens("expired", "r1")),
        Arc::new(AtomicUsize::new(0)),
    );

    let (a, b, c) = tokio::join!(
        client.execute(ApiRequest::get("/jobs/my_jobs/")),
        client.execute(ApiRequest::get("/reviews/my_reviews/")),
        client.execute(ApiRequest::get("/applications/status_summary/")),
    );

    assert_eq!(a.unwrap().status().as_u16(), 200);
    assert_eq!(b.unwrap().status().as_u16(), 200);

    let forbidden = c.unwrap_err();
    assert_eq!(forbidden.status(), Some(403));
    assert!(forbidden.api_message().contains("permission"));
}

#[tokio::test]
async fn test_unreachable_api_returns_network_error() {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let config = ClientConfig::with_base_url(format!("http://127.0.0.1:{port}/api")).unwrap();
    let store = Arc::new(CountingStore::with_tokens("a", "r"));
    let client = JoblyClient::new(config, store.clone()).unwrap();

    let err = client.execute(ApiRequest::get("/jobs/")).await.unwrap_err();

    assert!(err.is_network());
    assert_eq!(err.status(), None);
    assert_eq!(store.clears(), 0);
}

//! Authenticated Jobly API client.
//!
//! Every request:
//! - reads the current access token from the credential store and attaches it
//! - on an eligible 401, refreshes the access token (single-flight) and is
//!   resent once with the new token
//! - on refresh failure, clears the stored credentials and notifies the
//!   registered [`SessionListener`] once per failed cycle

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info, info_span, warn, Instrument};

use jobly_models::{ApiErrorBody, AuthTokens, RefreshResponse};

use crate::api::{ApplicationsApi, AuthApi, JobsApi, ReviewsApi};
use crate::config::ClientConfig;
use crate::credentials::{CredentialKey, CredentialStore};
use crate::error::{ClientError, ClientResult, RefreshError};
use crate::listener::{NoopListener, SessionListener};
use crate::metrics::{outcome, record_refresh, record_request};
use crate::refresh::{RefreshCoordinator, RefreshTicket};
use crate::request::{ApiRequest, ApiResponse, RequestBody, RequestContext, REFRESH_TOKEN_PATH};

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`JoblyClient`].
pub struct JoblyClientBuilder {
    config: ClientConfig,
    store: Arc<dyn CredentialStore>,
    listener: Arc<dyn SessionListener>,
}

impl JoblyClientBuilder {
    pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            config,
            store,
            listener: Arc::new(NoopListener),
        }
    }

    /// Register the observer notified when the session expires.
    pub fn session_listener(mut self, listener: Arc<dyn SessionListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Shorthand for registering a closure as the session listener.
    pub fn on_session_expired<F>(self, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.session_listener(Arc::new(callback))
    }

    pub fn build(self) -> ClientResult<JoblyClient> {
        let config = self.config.validated()?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(config.user_agent.clone())
            .default_headers(default_headers)
            .build()
            .map_err(ClientError::Network)?;

        Ok(JoblyClient {
            inner: Arc::new(ClientInner {
                http,
                config,
                store: self.store,
                listener: self.listener,
                refresh: RefreshCoordinator::new(),
            }),
        })
    }
}

// =============================================================================
// Client
// =============================================================================

struct ClientInner {
    http: Client,
    config: ClientConfig,
    store: Arc<dyn CredentialStore>,
    listener: Arc<dyn SessionListener>,
    /// Refresh state is per client instance, never process-global.
    refresh: RefreshCoordinator,
}

/// Jobly REST API client. Cheap to clone; clones share the credential store
/// and the refresh state.
#[derive(Clone)]
pub struct JoblyClient {
    inner: Arc<ClientInner>,
}

impl JoblyClient {
    pub fn builder(config: ClientConfig, store: Arc<dyn CredentialStore>) -> JoblyClientBuilder {
        JoblyClientBuilder::new(config, store)
    }

    /// Create a client without a session listener.
    pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> ClientResult<Self> {
        Self::builder(config, store).build()
    }

    /// Create from environment variables.
    pub fn from_env(store: Arc<dyn CredentialStore>) -> ClientResult<Self> {
        Self::new(ClientConfig::from_env()?, store)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.inner.store
    }

    /// True while an access token refresh is in flight.
    pub fn is_refreshing(&self) -> bool {
        self.inner.refresh.is_refreshing()
    }

    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.clone())
    }

    pub fn jobs(&self) -> JobsApi {
        JobsApi::new(self.clone())
    }

    pub fn applications(&self) -> ApplicationsApi {
        ApplicationsApi::new(self.clone())
    }

    pub fn reviews(&self) -> ReviewsApi {
        ReviewsApi::new(self.clone())
    }

    // =========================================================================
    // Credentials
    // =========================================================================

    /// Persist a freshly issued token pair (e.g. after login).
    pub fn set_tokens(&self, tokens: &AuthTokens) -> ClientResult<()> {
        self.inner.store.set_tokens(&tokens.access, &tokens.refresh)
    }

    /// Forget the token pair and cached user.
    pub fn clear_credentials(&self) -> ClientResult<()> {
        self.inner.store.clear()
    }

    pub fn access_token(&self) -> ClientResult<Option<String>> {
        self.inner.store.get(CredentialKey::AccessToken)
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Send a request, transparently recovering from an expired access token.
    ///
    /// Returns the response for 2xx/3xx statuses and
    /// [`ClientError::Status`] for everything else, including 401s that are
    /// not eligible for a refresh.
    pub async fn execute(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        let span = info_span!("api_request", method = %request.method, path = %request.path);
        let method = request.method.clone();

        let start = Instant::now();
        let result = self
            .execute_with_refresh(RequestContext::new(request))
            .instrument(span)
            .await;
        let latency_ms = start.elapsed().as_millis() as f64;

        record_request(method.as_str(), recorded_status(&result), latency_ms);

        result
    }

    /// Send a request and deserialize the JSON body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> ClientResult<T> {
        self.execute(request).await?.json()
    }

    /// Send a request, discarding the body.
    pub async fn send_empty(&self, request: ApiRequest) -> ClientResult<()> {
        self.execute(request).await.map(|_| ())
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.send_json(ApiRequest::get(path)).await
    }

    async fn execute_with_refresh(&self, mut ctx: RequestContext) -> ClientResult<ApiResponse> {
        loop {
            let token = match ctx.token_override.take() {
                Some(token) => Some(token),
                None => self.inner.store.get(CredentialKey::AccessToken)?,
            };

            let response = self.dispatch(&ctx.request, token.as_deref()).await?;

            if response.status() != StatusCode::UNAUTHORIZED || !ctx.is_refresh_eligible() {
                return response.error_for_status();
            }

            let Some(refresh_token) = self.inner.store.get(CredentialKey::RefreshToken)? else {
                debug!("Unauthorized without a refresh token, not attempting recovery");
                return response.error_for_status();
            };

            ctx.retried = true;
            let access = self.refreshed_access_token(&refresh_token).await?;
            ctx.token_override = Some(access);
        }
    }

    /// Obtain a new access token, joining the in-flight refresh if any.
    ///
    /// A waiter whose leader was cancelled mid-refresh starts (or joins) the
    /// next cycle instead of failing.
    async fn refreshed_access_token(&self, refresh_token: &str) -> ClientResult<String> {
        let lease = loop {
            match self.inner.refresh.begin() {
                RefreshTicket::Leader(lease) => break lease,
                RefreshTicket::Follower(waiter) => match waiter.wait().await {
                    Err(e) if e.is_abandoned() => {
                        debug!("Token refresh abandoned by its leader, retrying");
                    }
                    outcome => return outcome.map_err(ClientError::from),
                },
            }
        };

        let refreshed = self
            .request_new_access_token(refresh_token)
            .instrument(info_span!("token_refresh"))
            .await;

        match &refreshed {
            Ok(_) => {
                record_refresh(outcome::SUCCESS);
                info!("Access token refreshed");
            }
            Err(e) => {
                record_refresh(outcome::FAILURE);
                if let Err(clear_err) = self.inner.store.clear() {
                    warn!("Failed to clear credentials after refresh failure: {}", clear_err);
                }
                warn!("Token refresh failed, session expired: {}", e);
            }
        }

        // Queued requests learn the outcome before the listener runs.
        lease.complete(&refreshed);

        if refreshed.is_err() {
            self.inner.listener.session_expired();
        }

        refreshed.map_err(ClientError::from)
    }

    /// Call the refresh endpoint directly, bypassing the 401 handling.
    async fn request_new_access_token(&self, refresh_token: &str) -> Result<String, RefreshError> {
        let url = self.inner.config.url_for(REFRESH_TOKEN_PATH);

        let response = self
            .inner
            .http
            .post(&url)
            .json(&json!({ "refresh": refresh_token }))
            .send()
            .await
            .map_err(|e| RefreshError::new(None, format!("Refresh request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RefreshError::new(Some(status.as_u16()), e.to_string()))?;

        if !status.is_success() {
            let message = ApiErrorBody::parse(&body)
                .and_then(|b| b.summary())
                .unwrap_or_else(|| format!("Refresh rejected with status {}", status.as_u16()));
            return Err(RefreshError::new(Some(status.as_u16()), message));
        }

        let refreshed: RefreshResponse = serde_json::from_str(&body).map_err(|e| {
            RefreshError::new(
                Some(status.as_u16()),
                format!("Invalid refresh response: {}", e),
            )
        })?;

        // The in-memory token still serves the queued retries if persisting fails.
        if let Err(e) = self.inner.store.set(CredentialKey::AccessToken, &refreshed.access) {
            warn!("Failed to persist refreshed access token: {}", e);
        }
        if let Some(rotated) = refreshed.refresh.as_deref() {
            if let Err(e) = self.inner.store.set(CredentialKey::RefreshToken, rotated) {
                warn!("Failed to persist rotated refresh token: {}", e);
            }
        }

        Ok(refreshed.access)
    }

    /// Send one attempt of a request.
    async fn dispatch(&self, request: &ApiRequest, token: Option<&str>) -> ClientResult<ApiResponse> {
        let url = self.inner.config.url_for(&request.path);

        let mut builder = self.inner.http.request(request.method.clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = token {
            builder = builder.header(
                AUTHORIZATION,
                format!("{} {}", self.inner.config.auth_scheme, token),
            );
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(form) => builder.multipart(form.to_form()?),
        };

        let response = builder.send().await?;
        ApiResponse::from_reqwest(response).await
    }
}

/// Status label for the request metric: the status the call itself received.
/// A failed refresh carries the refresh endpoint's status, but the call that
/// triggered it was answered with a 401.
fn recorded_status(result: &ClientResult<ApiResponse>) -> u16 {
    match result {
        Ok(response) => response.status().as_u16(),
        Err(ClientError::Refresh(_)) => StatusCode::UNAUTHORIZED.as_u16(),
        Err(e) => e.status().unwrap_or(0),
    }
}

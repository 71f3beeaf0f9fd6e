//! Signed-in session on top of a [`JoblyClient`].

use tracing::{debug, info, warn};

use jobly_models::User;

use crate::client::JoblyClient;
use crate::credentials::CredentialKey;
use crate::error::ClientResult;

/// Login state: token pair plus the cached user, all held in the client's
/// credential store.
#[derive(Clone)]
pub struct SessionManager {
    client: JoblyClient,
}

impl SessionManager {
    pub fn new(client: JoblyClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &JoblyClient {
        &self.client
    }

    /// Sign in and persist the issued tokens and user.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<User> {
        let response = self.client.auth().login(email, password).await?;

        self.client.set_tokens(&response.tokens())?;
        self.cache_user(&response.user)?;

        info!(user_id = %response.user.id, role = %response.user.role, "Signed in");
        Ok(response.user)
    }

    /// Tell the server (best effort) and forget the local credentials.
    pub async fn logout(&self) -> ClientResult<()> {
        if let Err(e) = self.client.auth().logout().await {
            debug!("Server logout failed, clearing credentials anyway: {}", e);
        }
        self.client.clear_credentials()?;
        info!("Signed out");
        Ok(())
    }

    /// Re-fetch the profile of the signed-in user.
    ///
    /// Returns `None` without a network call when no access token is stored.
    /// Any failure ends the session.
    pub async fn refresh_user(&self) -> ClientResult<Option<User>> {
        if self.client.access_token()?.is_none() {
            return Ok(None);
        }

        match self.client.auth().profile().await {
            Ok(user) => {
                self.cache_user(&user)?;
                Ok(Some(user))
            }
            Err(e) => {
                warn!("Could not load profile, clearing session: {}", e);
                self.client.clear_credentials()?;
                Ok(None)
            }
        }
    }

    /// User cached at the last login or profile fetch.
    pub fn current_user(&self) -> ClientResult<Option<User>> {
        let Some(raw) = self.client.credentials().get(CredentialKey::User)? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                debug!("Ignoring malformed cached user: {}", e);
                Ok(None)
            }
        }
    }

    pub fn is_authenticated(&self) -> ClientResult<bool> {
        Ok(self.current_user()?.is_some())
    }

    fn cache_user(&self, user: &User) -> ClientResult<()> {
        let json = serde_json::to_string(user)?;
        self.client.credentials().set(CredentialKey::User, &json)
    }
}

//! Authentication and profile endpoints.

use serde_json::json;
use tracing::info;

use jobly_models::{
    user::validate_email, ApiMessage, ChangePassword, LoginResponse, PasswordResetConfirm,
    ProfileUpdate, RefreshResponse, RegisterRequest, User,
};

use super::validated;
use crate::client::JoblyClient;
use crate::error::{ClientError, ClientResult};
use crate::request::{ApiRequest, MultipartForm, Upload, REFRESH_TOKEN_PATH};

/// `/auth/*` endpoints.
pub struct AuthApi {
    client: JoblyClient,
}

impl AuthApi {
    pub fn new(client: JoblyClient) -> Self {
        Self { client }
    }

    pub async fn register(&self, request: &RegisterRequest) -> ClientResult<ApiMessage> {
        validated(request.validate())?;
        let result = self
            .client
            .send_json(ApiRequest::post("/auth/register/").json(request)?)
            .await?;
        info!(email = %request.email, role = %request.role, "Registered account");
        Ok(result)
    }

    /// Exchange credentials for a token pair. Does not persist the tokens;
    /// see [`SessionManager::login`](crate::SessionManager::login).
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<LoginResponse> {
        if password.is_empty() {
            return Err(ClientError::Validation("Password is required".to_string()));
        }
        validated(validate_email(email))?;

        let body = json!({ "email": email, "password": password });
        self.client
            .send_json(ApiRequest::post("/auth/login/").json(&body)?)
            .await
    }

    pub async fn logout(&self) -> ClientResult<ApiMessage> {
        self.client.send_json(ApiRequest::post("/auth/logout/")).await
    }

    pub async fn verify_email(&self, token: &str) -> ClientResult<ApiMessage> {
        let body = json!({ "token": token });
        self.client
            .send_json(ApiRequest::post("/auth/verify_email/").json(&body)?)
            .await
    }

    pub async fn resend_verification(&self, email: &str) -> ClientResult<ApiMessage> {
        validated(validate_email(email))?;
        let body = json!({ "email": email });
        self.client
            .send_json(ApiRequest::post("/auth/resend_verification/").json(&body)?)
            .await
    }

    pub async fn request_password_reset(&self, email: &str) -> ClientResult<ApiMessage> {
        validated(validate_email(email))?;
        let body = json!({ "email": email });
        self.client
            .send_json(ApiRequest::post("/auth/request_password_reset/").json(&body)?)
            .await
    }

    pub async fn confirm_password_reset(
        &self,
        request: &PasswordResetConfirm,
    ) -> ClientResult<ApiMessage> {
        validated(request.validate())?;
        self.client
            .send_json(ApiRequest::post("/auth/confirm_password_reset/").json(request)?)
            .await
    }

    /// Profile of the signed-in user.
    pub async fn profile(&self) -> ClientResult<User> {
        self.client.get_json("/auth/profile/").await
    }

    /// Update profile fields. Files switch the request to a multipart form.
    pub async fn update_profile(
        &self,
        update: &ProfileUpdate,
        avatar: Option<Upload>,
        resume: Option<Upload>,
    ) -> ClientResult<User> {
        let request = ApiRequest::patch("/auth/update_profile/");
        let request = if avatar.is_none() && resume.is_none() {
            request.json(update)?
        } else {
            let mut form = MultipartForm::new().fields(update.form_fields());
            if let Some(avatar) = avatar {
                form = form.file("avatar", avatar);
            }
            if let Some(resume) = resume {
                form = form.file("resume", resume);
            }
            request.form(form)
        };

        self.client.send_json(request).await
    }

    pub async fn change_password(&self, request: &ChangePassword) -> ClientResult<ApiMessage> {
        validated(request.validate())?;
        self.client
            .send_json(ApiRequest::post("/auth/change_password/").json(request)?)
            .await
    }

    /// Call the refresh endpoint explicitly. Nothing is stored; the
    /// automatic recovery path in the client does not use this.
    pub async fn refresh_token(&self, refresh: &str) -> ClientResult<RefreshResponse> {
        let body = json!({ "refresh": refresh });
        self.client
            .send_json(ApiRequest::post(REFRESH_TOKEN_PATH).json(&body)?)
            .await
    }
}

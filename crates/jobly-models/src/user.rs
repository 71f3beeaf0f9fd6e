//! User accounts and authentication payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Minimum password length accepted by the backend.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Browses postings and applies to them
    Seeker,
    /// Posts jobs and manages applicants
    Recruiter,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Seeker => "seeker",
            UserRole::Recruiter => "recruiter",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extended profile attached to a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub phone_number: Option<String>,
    pub bio: Option<String>,
    /// Avatar image URL
    pub avatar: Option<String>,
    pub skills: Option<String>,
    pub experience: Option<String>,
    #[serde(default)]
    pub experience_years: u32,
    /// Resume file URL
    pub resume: Option<String>,
}

/// A registered user as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub role: UserRole,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub profile: Option<UserProfile>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl User {
    pub fn is_recruiter(&self) -> bool {
        self.role == UserRole::Recruiter
    }
}

/// Access/refresh token pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access: String,
    pub refresh: String,
}

/// Response of the login endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    pub user: User,
}

impl LoginResponse {
    pub fn tokens(&self) -> AuthTokens {
        AuthTokens {
            access: self.access.clone(),
            refresh: self.refresh.clone(),
        }
    }
}

/// Response of the refresh-token endpoint. The refresh token is only present
/// when the backend rotates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
}

/// Account registration payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub role: UserRole,
    pub password: String,
}

impl RegisterRequest {
    /// Validate the request.
    pub fn validate(&self) -> Result<(), String> {
        if self.full_name.trim().is_empty() {
            return Err("Full name is required".to_string());
        }
        validate_email(&self.email)?;
        validate_password(&self.password)
    }
}

/// Partial profile update. Unset fields are left untouched by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience_years: Option<u32>,
}

impl ProfileUpdate {
    /// Text form fields for multipart uploads.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let optional = [
            ("full_name", self.full_name.clone()),
            ("phone_number", self.phone_number.clone()),
            ("bio", self.bio.clone()),
            ("skills", self.skills.clone()),
            ("experience", self.experience.clone()),
            ("experience_years", self.experience_years.map(|y| y.to_string())),
        ];
        optional
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name, v)))
            .collect()
    }
}

/// Password change payload for an authenticated user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePassword {
    pub old_password: String,
    pub new_password: String,
}

impl ChangePassword {
    /// Validate the request.
    pub fn validate(&self) -> Result<(), String> {
        if self.old_password.is_empty() {
            return Err("Current password is required".to_string());
        }
        validate_password(&self.new_password)?;
        if self.old_password == self.new_password {
            return Err("New password must differ from the current one".to_string());
        }
        Ok(())
    }
}

/// Password reset confirmation (link parameters plus the new password).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordResetConfirm {
    pub uid: String,
    pub token: String,
    pub new_password: String,
}

impl PasswordResetConfirm {
    /// Validate the request.
    pub fn validate(&self) -> Result<(), String> {
        if self.uid.is_empty() || self.token.is_empty() {
            return Err("Reset link is incomplete".to_string());
        }
        validate_password(&self.new_password)
    }
}

/// Basic shape check for an email address.
pub fn validate_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return Err(format!("Invalid email address: {email}"));
    };
    if local.is_empty() || domain.is_empty() || !domain.contains('.') || domain.contains('@') {
        return Err(format!("Invalid email address: {email}"));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        ));
    }
    Ok(())
}

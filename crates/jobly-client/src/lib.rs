//! Jobly REST API client.
//!
//! This crate provides:
//! - An authenticated HTTP client that attaches the stored access token
//! - Single-flight access token refresh on 401 responses, with queued
//!   requests replayed once the refresh settles
//! - Credential persistence (in-memory and JSON file stores)
//! - Session-expired notification for the surrounding application
//! - Typed endpoint wrappers for auth, jobs, applications and reviews

pub mod api;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod listener;
pub mod metrics;
pub mod refresh;
pub mod request;
pub mod session;

pub use api::{ApplicationsApi, AuthApi, JobsApi, ReviewsApi};
pub use client::{JoblyClient, JoblyClientBuilder};
pub use config::ClientConfig;
pub use credentials::{CredentialKey, CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use error::{ClientError, ClientResult, RefreshError};
pub use listener::SessionListener;
pub use refresh::RefreshCoordinator;
pub use request::{ApiRequest, ApiResponse, MultipartForm, RequestBody, Upload};
pub use session::SessionManager;

//! Request and response types.
//!
//! Requests own all of their data (including multipart file contents) so a
//! request can be sent again after a token refresh.

use std::path::Path;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ClientError, ClientResult};

/// Endpoints whose 401 must never start a refresh: they either run before
/// a session exists or are the refresh call itself.
pub const REFRESH_EXCLUDED_PATHS: &[&str] = &[
    "/auth/login/",
    "/auth/register/",
    "/auth/verify_email/",
    "/auth/resend_verification/",
    "/auth/request_password_reset/",
    "/auth/confirm_password_reset/",
    "/auth/refresh_token/",
];

/// Path of the refresh endpoint, relative to the API base URL.
pub const REFRESH_TOKEN_PATH: &str = "/auth/refresh_token/";

/// True if `path` targets one of [`REFRESH_EXCLUDED_PATHS`].
pub fn is_refresh_excluded(path: &str) -> bool {
    REFRESH_EXCLUDED_PATHS.iter().any(|excluded| path.contains(excluded))
}

// =============================================================================
// Uploads and multipart forms
// =============================================================================

/// File attached to a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let file_name = file_name.into();
        let content_type = guess_content_type(&file_name).map(str::to_string);
        Self {
            file_name,
            content_type,
            bytes: bytes.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Read a file from disk.
    pub fn from_path(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            ClientError::Validation(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(file_name, bytes))
    }
}

fn guess_content_type(file_name: &str) -> Option<&'static str> {
    let ext = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        _ => return None,
    };
    Some(mime)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FormValue {
    Text(String),
    File(Upload),
}

/// Re-sendable multipart form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    parts: Vec<(String, FormValue)>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push((name.into(), FormValue::Text(value.into())));
        self
    }

    /// Add every `(name, value)` pair as a text part.
    pub fn fields<N, V>(mut self, fields: impl IntoIterator<Item = (N, V)>) -> Self
    where
        N: Into<String>,
        V: Into<String>,
    {
        for (name, value) in fields {
            self = self.text(name, value);
        }
        self
    }

    pub fn file(mut self, name: impl Into<String>, upload: Upload) -> Self {
        self.parts.push((name.into(), FormValue::File(upload)));
        self
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Build a fresh reqwest form for one send attempt.
    pub(crate) fn to_form(&self) -> ClientResult<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new();
        for (name, value) in &self.parts {
            form = match value {
                FormValue::Text(text) => form.text(name.clone(), text.clone()),
                FormValue::File(upload) => {
                    let mut part = reqwest::multipart::Part::bytes(upload.bytes.to_vec())
                        .file_name(upload.file_name.clone());
                    if let Some(content_type) = &upload.content_type {
                        part = part.mime_str(content_type).map_err(|e| {
                            ClientError::Validation(format!(
                                "Invalid content type {content_type}: {e}"
                            ))
                        })?;
                    }
                    form.part(name.clone(), part)
                }
            };
        }
        Ok(form)
    }
}

// =============================================================================
// Requests
// =============================================================================

/// Request body.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Multipart(MultipartForm),
}

/// Outbound API request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base URL, or an absolute URL
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    /// Never start a token refresh for this request
    pub skip_refresh: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            skip_refresh: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    /// Add every set field of a filter struct as a query parameter.
    /// `None` fields are skipped; scalars are rendered without quotes.
    pub fn query_params<T: Serialize>(mut self, params: &T) -> ClientResult<Self> {
        let value = serde_json::to_value(params)?;
        let Value::Object(map) = value else {
            return Err(ClientError::Validation(
                "Query parameters must serialize to an object".to_string(),
            ));
        };

        for (name, value) in map {
            let rendered = match value {
                Value::Null => continue,
                Value::String(s) => s,
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                other => other.to_string(),
            };
            self.query.push((name, rendered));
        }
        Ok(self)
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> ClientResult<Self> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn form(mut self, form: MultipartForm) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    /// Bypass the refresh machinery for this request.
    pub fn skip_refresh(mut self) -> Self {
        self.skip_refresh = true;
        self
    }

    /// Whether a 401 on this request may start (or join) a token refresh.
    pub fn allows_refresh(&self) -> bool {
        !self.skip_refresh && !is_refresh_excluded(&self.path)
    }
}

/// Per-call state carried through the retry path.
#[derive(Debug)]
pub(crate) struct RequestContext {
    pub request: ApiRequest,
    /// Set once the request has been resent after a refresh.
    pub retried: bool,
    /// Token to attach instead of reading the store (the refreshed token).
    pub token_override: Option<String>,
}

impl RequestContext {
    pub fn new(request: ApiRequest) -> Self {
        Self {
            request,
            retried: false,
            token_override: None,
        }
    }

    pub fn is_refresh_eligible(&self) -> bool {
        !self.retried && self.request.allows_refresh()
    }
}

// =============================================================================
// Responses
// =============================================================================

/// Fully buffered API response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl ApiResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub(crate) async fn from_reqwest(response: reqwest::Response) -> ClientResult<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(Self::new(status, headers, body))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body. An empty body is read as JSON `null`.
    pub fn json<T: DeserializeOwned>(&self) -> ClientResult<T> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Turn non-2xx/3xx responses into [`ClientError::Status`].
    pub fn error_for_status(self) -> ClientResult<Self> {
        if self.status.is_success() || self.status.is_redirection() {
            Ok(self)
        } else {
            Err(ClientError::from_status(self.status, self.text()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobly_models::{JobCategory, JobFilters};

    #[test]
    fn test_excluded_paths() {
        assert!(is_refresh_excluded("/auth/login/"));
        assert!(is_refresh_excluded("https://api.example/api/auth/refresh_token/"));
        assert!(!is_refresh_excluded("/auth/profile/"));
        assert!(!is_refresh_excluded("/auth/logout/"));
        assert!(!is_refresh_excluded("/jobs/"));
    }

    #[test]
    fn test_refresh_eligibility() {
        assert!(ApiRequest::get("/jobs/").allows_refresh());
        assert!(!ApiRequest::post("/auth/login/").allows_refresh());
        assert!(!ApiRequest::get("/jobs/").skip_refresh().allows_refresh());

        let mut ctx = RequestContext::new(ApiRequest::get("/jobs/"));
        assert!(ctx.is_refresh_eligible());
        ctx.retried = true;
        assert!(!ctx.is_refresh_eligible());
    }

    #[test]
    fn test_query_params_from_filters() {
        let filters = JobFilters {
            page: Some(2),
            category: Some(JobCategory::Finance),
            ..Default::default()
        };
        let request = ApiRequest::get("/jobs/").query_params(&filters).unwrap();
        assert!(request.query.contains(&("page".to_string(), "2".to_string())));
        assert!(request.query.contains(&("category".to_string(), "finance".to_string())));
        assert_eq!(request.query.len(), 2);
    }

    #[test]
    fn test_query_params_rejects_non_objects() {
        assert!(ApiRequest::get("/jobs/").query_params(&5).is_err());
    }

    #[test]
    fn test_upload_content_type_guess() {
        assert_eq!(
            Upload::new("resume.PDF", Vec::new()).content_type.as_deref(),
            Some("application/pdf")
        );
        assert_eq!(Upload::new("notes", Vec::new()).content_type, None);
        assert_eq!(
            Upload::new("x.bin", Vec::new())
                .with_content_type("application/octet-stream")
                .content_type
                .as_deref(),
            Some("application/octet-stream")
        );
    }

    #[test]
    fn test_multipart_form_builds_repeatedly() {
        let form = MultipartForm::new()
            .fields([("job_id", "3")])
            .file("resume", Upload::new("cv.pdf", b"%PDF".to_vec()));
        assert_eq!(form.len(), 2);
        assert!(form.to_form().is_ok());
        assert!(form.to_form().is_ok());
    }

    #[test]
    fn test_response_json_and_status_mapping() {
        let ok = ApiResponse::new(StatusCode::OK, HeaderMap::new(), Bytes::from_static(b"{\"a\":1}"));
        let value: Value = ok.json().unwrap();
        assert_eq!(value["a"], 1);

        let empty = ApiResponse::new(StatusCode::NO_CONTENT, HeaderMap::new(), Bytes::new());
        let unit: Option<Value> = empty.json().unwrap();
        assert!(unit.is_none());

        let denied = ApiResponse::new(StatusCode::FORBIDDEN, HeaderMap::new(), Bytes::from_static(b"{\"detail\":\"no\"}"));
        let err = denied.error_for_status().unwrap_err();
        assert_eq!(err.status(), Some(403));
    }
}

//! Job applications and recruiter feedback.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::job::{JobDetail, JobId};

/// Review state of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Reviewed,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Reviewed => "reviewed",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    /// Accepted and rejected applications are final.
    pub fn is_final(&self) -> bool {
        matches!(self, ApplicationStatus::Accepted | ApplicationStatus::Rejected)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application as it appears in listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationListItem {
    pub id: u64,
    pub job: JobId,
    pub job_title: String,
    pub job_company: String,
    pub applicant_name: String,
    pub applicant_email: String,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full application including the job it targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationDetail {
    pub id: u64,
    pub job: JobDetail,
    pub applicant_name: String,
    pub applicant_email: String,
    pub applicant_phone: Option<String>,
    pub applicant_bio: Option<String>,
    /// Resume file URL
    pub resume: Option<String>,
    pub cover_letter: Option<String>,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Feedback left by a recruiter when changing an application's status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationFeedback {
    pub id: u64,
    pub application: u64,
    pub recruiter_name: String,
    pub recruiter_email: String,
    pub applicant_name: String,
    pub applicant_email: String,
    pub job_title: String,
    pub feedback_text: String,
    pub status_given: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-status counts for the caller's applications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub total: u64,
    pub pending: u64,
    pub reviewed: u64,
    pub accepted: u64,
    pub rejected: u64,
}

/// Listing filters, sent as query parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<JobId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ApplicationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

/// Application submission. The resume file travels next to these fields in
/// a multipart form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewApplication {
    pub job_id: JobId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_letter: Option<String>,
}

impl NewApplication {
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![("job_id", self.job_id.to_string())];
        if let Some(letter) = self.cover_letter.as_ref().filter(|l| !l.trim().is_empty()) {
            fields.push(("cover_letter", letter.clone()));
        }
        fields
    }
}

//! Job postings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric job identifier assigned by the backend.
pub type JobId = u64;

/// Employment type of a posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    FullTime,
    PartTime,
    Remote,
    Contract,
    Internship,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::FullTime => "full_time",
            JobType::PartTime => "part_time",
            JobType::Remote => "remote",
            JobType::Contract => "contract",
            JobType::Internship => "internship",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Industry category of a posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobCategory {
    It,
    Healthcare,
    Finance,
    Education,
    Marketing,
    Design,
    Other,
}

impl JobCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobCategory::It => "it",
            JobCategory::Healthcare => "healthcare",
            JobCategory::Finance => "finance",
            JobCategory::Education => "education",
            JobCategory::Marketing => "marketing",
            JobCategory::Design => "design",
            JobCategory::Other => "other",
        }
    }
}

impl fmt::Display for JobCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job as it appears in listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobListItem {
    pub id: JobId,
    pub title: String,
    pub company_name: String,
    /// Logo image URL
    pub company_logo: Option<String>,
    pub location: String,
    pub job_type: JobType,
    pub category: JobCategory,
    pub salary: Option<u32>,
    pub recruiter_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full job posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDetail {
    #[serde(flatten)]
    pub summary: JobListItem,
    pub description: String,
    pub requirements: String,
    #[serde(default)]
    pub experience_required: u32,
    #[serde(default = "default_position_count")]
    pub position_count: u32,
    pub application_deadline: Option<DateTime<Utc>>,
    pub recruiter_email: String,
}

fn default_position_count() -> u32 {
    1
}

impl JobDetail {
    /// True once the application deadline (if any) has passed.
    pub fn is_closed_at(&self, now: DateTime<Utc>) -> bool {
        self.application_deadline.is_some_and(|deadline| deadline < now)
    }
}

/// Listing filters, sent as query parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<JobCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_type: Option<JobType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Ordering field, e.g. `-created_at` or `salary`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordering: Option<String>,
}

/// Job creation payload. Sent as multipart form fields so a logo can be
/// attached alongside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewJob {
    pub title: String,
    pub description: String,
    pub requirements: String,
    pub location: String,
    pub job_type: JobType,
    pub category: JobCategory,
    pub company_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience_required: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_deadline: Option<DateTime<Utc>>,
}

impl NewJob {
    /// Validate the request.
    pub fn validate(&self) -> Result<(), String> {
        let required = [
            ("title", &self.title),
            ("description", &self.description),
            ("requirements", &self.requirements),
            ("location", &self.location),
            ("company_name", &self.company_name),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(format!("{field} is required"));
            }
        }

        if self.salary == Some(0) {
            return Err("Salary must be a positive number".to_string());
        }
        if self.position_count == Some(0) {
            return Err("Position count must be at least 1".to_string());
        }

        Ok(())
    }

    /// Text form fields in the order the backend documents them.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("title", self.title.clone()),
            ("description", self.description.clone()),
            ("requirements", self.requirements.clone()),
            ("location", self.location.clone()),
            ("job_type", self.job_type.as_str().to_string()),
            ("category", self.category.as_str().to_string()),
            ("company_name", self.company_name.clone()),
        ];
        if let Some(salary) = self.salary {
            fields.push(("salary", salary.to_string()));
        }
        if let Some(years) = self.experience_required {
            fields.push(("experience_required", years.to_string()));
        }
        if let Some(count) = self.position_count {
            fields.push(("position_count", count.to_string()));
        }
        if let Some(deadline) = self.application_deadline {
            fields.push(("application_deadline", deadline.to_rfc3339()));
        }
        fields
    }
}

//! Ratings and reviews exchanged between seekers and recruiters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::job::{JobId, JobListItem};

/// Accepted rating range (inclusive).
pub const RATING_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

/// Maximum comment length accepted by the backend.
pub const MAX_COMMENT_LENGTH: usize = 1000;

/// Review as it appears in listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewListItem {
    pub id: u64,
    pub job: JobId,
    pub job_title: String,
    pub recruiter_name: String,
    pub recruiter_email: String,
    pub reviewer_name: String,
    pub reviewer_email: String,
    pub rating: u8,
    pub created_at: DateTime<Utc>,
}

/// Full review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewDetail {
    pub id: u64,
    pub job: JobListItem,
    pub job_title: String,
    pub recruiter_name: String,
    pub recruiter_email: String,
    pub reviewer_name: String,
    pub reviewer_email: String,
    pub rating: u8,
    pub created_at: DateTime<Utc>,
    pub comment: Option<String>,
}

/// Rating distribution for one recruiter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewStatistics {
    pub total_reviews: u64,
    pub average_rating: f64,
    pub five_star: u64,
    pub four_star: u64,
    pub three_star: u64,
    pub two_star: u64,
    pub one_star: u64,
}

/// Entry of the top-recruiters leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopRecruiter {
    pub recruiter: Uuid,
    #[serde(rename = "recruiter__full_name")]
    pub recruiter_full_name: String,
    pub avg_rating: f64,
    pub review_count: u64,
}

/// Response of the helpful toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpfulToggle {
    pub message: String,
    pub helpful_count: u64,
}

/// Helpful vote tally for a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpfulVotes {
    pub review_id: u64,
    pub helpful_count: u64,
    pub is_helpful_by_current_user: bool,
}

/// Listing filters, sent as query parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recruiter: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<JobId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordering: Option<String>,
}

/// Review creation payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReview {
    pub job_id: JobId,
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl NewReview {
    /// Validate the request.
    pub fn validate(&self) -> Result<(), String> {
        validate_rating(self.rating)?;
        validate_comment(self.comment.as_deref())
    }
}

/// Partial review update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ReviewUpdate {
    /// Validate the request.
    pub fn validate(&self) -> Result<(), String> {
        if self.rating.is_none() && self.comment.is_none() {
            return Err("Nothing to update".to_string());
        }
        if let Some(rating) = self.rating {
            validate_rating(rating)?;
        }
        validate_comment(self.comment.as_deref())
    }
}

fn validate_rating(rating: u8) -> Result<(), String> {
    if !RATING_RANGE.contains(&rating) {
        return Err(format!(
            "Rating must be between {} and {}",
            RATING_RANGE.start(),
            RATING_RANGE.end()
        ));
    }
    Ok(())
}

fn validate_comment(comment: Option<&str>) -> Result<(), String> {
    match comment {
        Some(c) if c.chars().count() > MAX_COMMENT_LENGTH => Err(format!(
            "Comment must be at most {MAX_COMMENT_LENGTH} characters"
        )),
        _ => Ok(()),
    }
}

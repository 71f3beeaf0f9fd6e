//! Shared data models for the Jobly job-board API.
//!
//! This crate provides Serde-serializable types for:
//! - Users, profiles and login responses
//! - Job postings and listing filters
//! - Applications, recruiter feedback and status summaries
//! - Reviews, recruiter statistics and helpful votes
//! - Pagination envelopes and API error bodies

pub mod application;
pub mod error;
pub mod job;
pub mod response;
pub mod review;
pub mod user;

// Re-export common types
pub use application::{
    ApplicationDetail, ApplicationFeedback, ApplicationFilters, ApplicationListItem,
    ApplicationStatus, NewApplication, StatusSummary,
};
pub use error::ApiErrorBody;
pub use job::{JobCategory, JobDetail, JobFilters, JobId, JobListItem, JobType, NewJob};
pub use response::{ApiMessage, Paginated};
pub use review::{
    HelpfulToggle, HelpfulVotes, NewReview, ReviewDetail, ReviewFilters, ReviewListItem,
    ReviewStatistics, ReviewUpdate, TopRecruiter,
};
pub use user::{
    AuthTokens, ChangePassword, LoginResponse, PasswordResetConfirm, ProfileUpdate,
    RefreshResponse, RegisterRequest, User, UserProfile, UserRole,
};

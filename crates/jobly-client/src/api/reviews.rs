//! Recruiter review endpoints.

use uuid::Uuid;

use jobly_models::{
    HelpfulToggle, HelpfulVotes, JobId, NewReview, Paginated, ReviewDetail, ReviewFilters,
    ReviewListItem, ReviewStatistics, ReviewUpdate, TopRecruiter,
};

use super::validated;
use crate::client::JoblyClient;
use crate::error::ClientResult;
use crate::request::ApiRequest;

/// `/reviews/*` endpoints.
pub struct ReviewsApi {
    client: JoblyClient,
}

impl ReviewsApi {
    pub fn new(client: JoblyClient) -> Self {
        Self { client }
    }

    fn review_path(id: u64) -> String {
        format!("/reviews/{}/", id)
    }

    pub async fn list(&self, filters: &ReviewFilters) -> ClientResult<Paginated<ReviewListItem>> {
        let request = ApiRequest::get("/reviews/").query_params(filters)?;
        self.client.send_json(request).await
    }

    pub async fn get(&self, id: u64) -> ClientResult<ReviewDetail> {
        self.client.get_json(&Self::review_path(id)).await
    }

    pub async fn create(&self, review: &NewReview) -> ClientResult<ReviewDetail> {
        validated(review.validate())?;
        self.client
            .send_json(ApiRequest::post("/reviews/").json(review)?)
            .await
    }

    pub async fn update(&self, id: u64, update: &ReviewUpdate) -> ClientResult<ReviewDetail> {
        validated(update.validate())?;
        self.client
            .send_json(ApiRequest::patch(Self::review_path(id)).json(update)?)
            .await
    }

    pub async fn delete(&self, id: u64) -> ClientResult<()> {
        self.client
            .send_empty(ApiRequest::delete(Self::review_path(id)))
            .await
    }

    pub async fn recruiter_reviews(
        &self,
        recruiter_id: Uuid,
        job_id: Option<JobId>,
    ) -> ClientResult<Vec<ReviewListItem>> {
        let mut request =
            ApiRequest::get("/reviews/recruiter_reviews/").query("recruiter_id", recruiter_id);
        if let Some(job_id) = job_id {
            request = request.query("job_id", job_id);
        }
        self.client.send_json(request).await
    }

    /// Reviews written by the signed-in seeker.
    pub async fn my_reviews(&self) -> ClientResult<Vec<ReviewListItem>> {
        self.client.get_json("/reviews/my_reviews/").await
    }

    /// Reviews about the signed-in recruiter.
    pub async fn my_received_reviews(&self) -> ClientResult<Vec<ReviewListItem>> {
        self.client.get_json("/reviews/my_received_reviews/").await
    }

    pub async fn recruiter_statistics(&self, recruiter_id: Uuid) -> ClientResult<ReviewStatistics> {
        let request =
            ApiRequest::get("/reviews/recruiter_statistics/").query("recruiter_id", recruiter_id);
        self.client.send_json(request).await
    }

    pub async fn job_reviews(&self, job_id: JobId) -> ClientResult<Vec<ReviewListItem>> {
        let request = ApiRequest::get("/reviews/job_reviews/").query("job_id", job_id);
        self.client.send_json(request).await
    }

    pub async fn top_recruiters(&self, limit: Option<u32>) -> ClientResult<Vec<TopRecruiter>> {
        let mut request = ApiRequest::get("/reviews/top_recruiters/");
        if let Some(limit) = limit {
            request = request.query("limit", limit);
        }
        self.client.send_json(request).await
    }

    /// Mark or unmark a review as helpful.
    pub async fn toggle_helpful(&self, id: u64) -> ClientResult<HelpfulToggle> {
        self.client
            .send_json(ApiRequest::post(format!("/reviews/{}/helpful/", id)))
            .await
    }

    pub async fn helpful_votes(&self, id: u64) -> ClientResult<HelpfulVotes> {
        self.client
            .get_json(&format!("/reviews/{}/helpful_votes/", id))
            .await
    }
}

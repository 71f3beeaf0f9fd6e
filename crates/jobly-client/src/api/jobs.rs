//! Job posting endpoints.

use serde::Serialize;
use tracing::info;

use jobly_models::{JobDetail, JobFilters, JobId, JobListItem, NewJob, Paginated};

use super::validated;
use crate::client::JoblyClient;
use crate::error::ClientResult;
use crate::request::{ApiRequest, MultipartForm, Upload};

/// `/jobs/*` endpoints.
pub struct JobsApi {
    client: JoblyClient,
}

impl JobsApi {
    pub fn new(client: JoblyClient) -> Self {
        Self { client }
    }

    fn job_path(id: JobId) -> String {
        format!("/jobs/{}/", id)
    }

    /// One page of open jobs.
    pub async fn list(&self, filters: &JobFilters) -> ClientResult<Paginated<JobListItem>> {
        let request = ApiRequest::get("/jobs/").query_params(filters)?;
        self.client.send_json(request).await
    }

    /// Follow a `next`/`previous` link from an earlier page.
    pub async fn page(&self, url: &str) -> ClientResult<Paginated<JobListItem>> {
        self.client.get_json(url).await
    }

    pub async fn get(&self, id: JobId) -> ClientResult<JobDetail> {
        self.client.get_json(&Self::job_path(id)).await
    }

    /// Post a job (recruiters only). Always sent as a multipart form.
    pub async fn create(&self, job: &NewJob, logo: Option<Upload>) -> ClientResult<JobDetail> {
        validated(job.validate())?;

        let mut form = MultipartForm::new().fields(job.form_fields());
        if let Some(logo) = logo {
            form = form.file("company_logo", logo);
        }

        let created: JobDetail = self
            .client
            .send_json(ApiRequest::post("/jobs/").form(form))
            .await?;
        info!(job_id = created.summary.id, title = %created.summary.title, "Created job");
        Ok(created)
    }

    /// Partially update a job with JSON fields.
    pub async fn update<T: Serialize>(&self, id: JobId, changes: &T) -> ClientResult<JobDetail> {
        let request = ApiRequest::patch(Self::job_path(id)).json(changes)?;
        self.client.send_json(request).await
    }

    /// Partially update a job with a multipart form, e.g. to replace the logo.
    pub async fn update_form(&self, id: JobId, form: MultipartForm) -> ClientResult<JobDetail> {
        let request = ApiRequest::patch(Self::job_path(id)).form(form);
        self.client.send_json(request).await
    }

    pub async fn delete(&self, id: JobId) -> ClientResult<()> {
        self.client
            .send_empty(ApiRequest::delete(Self::job_path(id)))
            .await?;
        info!(job_id = id, "Deleted job");
        Ok(())
    }

    /// Jobs posted by the signed-in recruiter.
    pub async fn my_jobs(&self) -> ClientResult<Vec<JobListItem>> {
        self.client.get_json("/jobs/my_jobs/").await
    }

    pub async fn similar_jobs(&self, id: JobId) -> ClientResult<Vec<JobListItem>> {
        self.client
            .get_json(&format!("/jobs/{}/similar_jobs/", id))
            .await
    }
}

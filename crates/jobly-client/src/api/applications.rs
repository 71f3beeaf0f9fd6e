//! Job application endpoints.

use serde_json::json;
use tracing::info;

use jobly_models::{
    ApplicationDetail, ApplicationFeedback, ApplicationFilters, ApplicationListItem,
    ApplicationStatus, JobId, NewApplication, Paginated, StatusSummary, User,
};

use crate::client::JoblyClient;
use crate::error::{ClientError, ClientResult};
use crate::request::{ApiRequest, MultipartForm, Upload};

/// `/applications/*` endpoints.
pub struct ApplicationsApi {
    client: JoblyClient,
}

impl ApplicationsApi {
    pub fn new(client: JoblyClient) -> Self {
        Self { client }
    }

    fn application_path(id: u64) -> String {
        format!("/applications/{}/", id)
    }

    pub async fn list(
        &self,
        filters: &ApplicationFilters,
    ) -> ClientResult<Paginated<ApplicationListItem>> {
        let request = ApiRequest::get("/applications/").query_params(filters)?;
        self.client.send_json(request).await
    }

    pub async fn get(&self, id: u64) -> ClientResult<ApplicationDetail> {
        self.client.get_json(&Self::application_path(id)).await
    }

    /// Apply to a job with a resume file and optional cover letter.
    pub async fn create(
        &self,
        application: &NewApplication,
        resume: Upload,
    ) -> ClientResult<ApplicationDetail> {
        if resume.bytes.is_empty() {
            return Err(ClientError::Validation("Resume file is empty".to_string()));
        }

        let form = MultipartForm::new()
            .fields(application.form_fields())
            .file("resume", resume);

        let created: ApplicationDetail = self
            .client
            .send_json(ApiRequest::post("/applications/").form(form))
            .await?;
        info!(
            application_id = created.id,
            job_id = application.job_id,
            "Submitted application"
        );
        Ok(created)
    }

    /// Withdraw an application.
    pub async fn delete(&self, id: u64) -> ClientResult<()> {
        self.client
            .send_empty(ApiRequest::delete(Self::application_path(id)))
            .await
    }

    /// Applications submitted by the signed-in seeker.
    pub async fn my_applications(&self) -> ClientResult<Vec<ApplicationListItem>> {
        self.client
            .get_json("/applications/my_applications/")
            .await
    }

    /// Applications received by the signed-in recruiter, optionally for one job.
    pub async fn job_applications(
        &self,
        job_id: Option<JobId>,
    ) -> ClientResult<Vec<ApplicationListItem>> {
        let mut request = ApiRequest::get("/applications/job_applications/");
        if let Some(job_id) = job_id {
            request = request.query("job_id", job_id);
        }
        self.client.send_json(request).await
    }

    pub async fn update_status(
        &self,
        id: u64,
        status: ApplicationStatus,
    ) -> ClientResult<ApplicationDetail> {
        let request =
            ApiRequest::patch(Self::application_path(id)).json(&json!({ "status": status }))?;
        self.client.send_json(request).await
    }

    /// Change the status and leave feedback for the applicant in one call.
    pub async fn update_status_with_feedback(
        &self,
        id: u64,
        status: ApplicationStatus,
        feedback_text: &str,
    ) -> ClientResult<ApplicationDetail> {
        if feedback_text.trim().is_empty() {
            return Err(ClientError::Validation(
                "Feedback text is required".to_string(),
            ));
        }

        let body = json!({ "status": status, "feedback_text": feedback_text });
        let request =
            ApiRequest::post(format!("/applications/{}/update_status/", id)).json(&body)?;
        self.client.send_json(request).await
    }

    pub async fn applicant_profile(&self, id: u64) -> ClientResult<User> {
        self.client
            .get_json(&format!("/applications/{}/applicant_profile/", id))
            .await
    }

    pub async fn feedback(&self, id: u64) -> ClientResult<ApplicationFeedback> {
        self.client
            .get_json(&format!("/applications/{}/feedback/", id))
            .await
    }

    pub async fn status_summary(&self) -> ClientResult<StatusSummary> {
        self.client.get_json("/applications/status_summary/").await
    }
}

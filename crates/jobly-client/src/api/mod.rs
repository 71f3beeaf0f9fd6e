//! Typed wrappers over the Jobly REST endpoints.
//!
//! Every call goes through [`JoblyClient::execute`](crate::JoblyClient::execute),
//! so all of them share token injection and refresh recovery.

mod applications;
mod auth;
mod jobs;
mod reviews;

pub use applications::ApplicationsApi;
pub use auth::AuthApi;
pub use jobs::JobsApi;
pub use reviews::ReviewsApi;

use crate::error::{ClientError, ClientResult};

/// Map a model-level validation failure into a client error.
fn validated(result: Result<(), String>) -> ClientResult<()> {
    result.map_err(ClientError::Validation)
}

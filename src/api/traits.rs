//! api::traits
//!
//! The GitLab API capability trait.
//!
//! # Design
//!
//! The discovery engine, revision resolution and the publisher consume
//! GitLab through this trait rather than a concrete client, so tests can
//! substitute the in-memory [`mock`]. The trait is async because every
//! operation is network I/O, and implementations must be `Send + Sync` for
//! use across tasks — discovery passes for different projects may run
//! concurrently.
//!
//! [`mock`]: crate::api::mock

use async_trait::async_trait;
use thiserror::Error;

use super::types::{Branch, MergeRequest, Tag};
use crate::heads::RefSpec;

/// Errors from GitLab API operations.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Authentication failed (invalid token, expired, insufficient scope).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// The API returned an error status.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    Network(String),
}

/// Capability interface to a GitLab deployment.
///
/// Three list operations feed discovery, `ref_tip` serves revision
/// resolution, and `post_merge_request_note` serves the publisher.
#[async_trait]
pub trait GitLabApi: Send + Sync {
    /// List the branches of a project.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the project does not exist or is not visible
    /// - `AuthFailed` / `RateLimited` / `Network` per failure mode
    async fn list_branches(&self, project_id: u64) -> Result<Vec<Branch>, ApiError>;

    /// List the tags of a project.
    async fn list_tags(&self, project_id: u64) -> Result<Vec<Tag>, ApiError>;

    /// List the open merge requests targeting a project.
    async fn list_open_merge_requests(
        &self,
        project_id: u64,
    ) -> Result<Vec<MergeRequest>, ApiError>;

    /// Look up the current tip of a ref.
    ///
    /// `name` is the branch or tag name, or the merge request iid for
    /// `RefSpec::MergeRequests`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the ref does not exist (e.g. deleted branch)
    async fn ref_tip(
        &self,
        project_id: u64,
        category: RefSpec,
        name: &str,
    ) -> Result<String, ApiError>;

    /// Post a note on a merge request.
    ///
    /// Wire contract: `POST /projects/{id}/merge_requests/{iid}/notes`
    /// with a form-encoded `body` field, authenticated via the
    /// `PRIVATE-TOKEN` header.
    async fn post_merge_request_note(
        &self,
        project_id: u64,
        merge_request_iid: u64,
        body: &str,
    ) -> Result<(), ApiError>;
}

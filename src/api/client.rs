//! api::client
//!
//! GitLab REST API client over `reqwest`.
//!
//! # Design
//!
//! Implements [`GitLabApi`] against GitLab's v4 REST API:
//! - list endpoints are paginated (`per_page=100`) and drained fully
//! - authentication is a private token sent as the `PRIVATE-TOKEN` header
//! - the API base is configurable for self-hosted deployments
//!
//! # Rate limiting
//!
//! GitLab enforces rate limits. The client returns [`ApiError::RateLimited`]
//! when they are hit and does not retry; backoff is the caller's
//! responsibility.
//!
//! # Example
//!
//! ```ignore
//! use gitlab_branch_source::api::{GitLabApi, GitLabClient};
//!
//! let client = GitLabClient::with_api_base(
//!     "glpat-xxx",
//!     "https://gitlab.example.com/api/v4",
//! );
//! let branches = client.list_branches(3).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;

use super::traits::{ApiError, GitLabApi};
use super::types::{Branch, MergeRequest, Tag};
use crate::config::ConnectionConfig;
use crate::heads::RefSpec;

/// Default GitLab API base URL.
const DEFAULT_API_BASE: &str = "https://gitlab.com/api/v4";

/// Authentication header GitLab expects for private tokens.
const PRIVATE_TOKEN_HEADER: &str = "PRIVATE-TOKEN";

/// GitLab's maximum page size for list endpoints.
const PER_PAGE: usize = 100;

/// GitLab REST API client.
pub struct GitLabClient {
    /// HTTP client for making requests.
    client: Client,
    /// Private token; empty for anonymous access to public projects.
    token: String,
    /// API base URL (configurable for self-hosted GitLab).
    api_base: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitLabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitLabClient")
            .field("has_token", &!self.token.is_empty())
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GitLabClient {
    /// Create a client against gitlab.com.
    ///
    /// # Example
    ///
    /// ```
    /// use gitlab_branch_source::api::GitLabClient;
    ///
    /// let client = GitLabClient::new("glpat-xxx");
    /// ```
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_api_base(token, DEFAULT_API_BASE)
    }

    /// Create a client with a custom API base URL.
    ///
    /// Use this for self-hosted GitLab installations
    /// (e.g. `https://gitlab.example.com/api/v4`).
    pub fn with_api_base(token: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
            api_base: api_base.into(),
        }
    }

    /// Create a client from a validated connection configuration.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Network` if the HTTP client cannot be built.
    pub fn from_config(config: &ConnectionConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self {
            client,
            token: config.token.clone().unwrap_or_default(),
            api_base: config.api_base(),
        })
    }

    /// The API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Check if the client has a token configured.
    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }

    /// Build common headers for API requests.
    fn headers(&self) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        if !self.token.is_empty() {
            let value = HeaderValue::from_str(&self.token)
                .map_err(|_| ApiError::AuthFailed("token contains invalid characters".into()))?;
            headers.insert(PRIVATE_TOKEN_HEADER, value);
        }
        Ok(headers)
    }

    /// Build URL for a project endpoint.
    fn project_url(&self, project_id: u64, path: &str) -> String {
        format!("{}/projects/{}/{}", self.api_base, project_id, path)
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: Response,
    ) -> Result<T, ApiError> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| ApiError::Api {
                status: status.as_u16(),
                message: format!("Failed to parse response: {}", e),
            })
        } else {
            Err(Self::map_error(status, error_message(response).await))
        }
    }

    fn map_error(status: StatusCode, message: String) -> ApiError {
        match status {
            StatusCode::UNAUTHORIZED => ApiError::AuthFailed("Invalid or expired token".into()),
            StatusCode::FORBIDDEN => ApiError::AuthFailed(format!("Permission denied: {}", message)),
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited,
            _ if status.is_server_error() => ApiError::Api {
                status: status.as_u16(),
                message: format!("GitLab server error: {}", message),
            },
            _ => ApiError::Api {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Drain a paginated list endpoint.
    async fn list_paginated<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
    ) -> Result<Vec<T>, ApiError> {
        let mut all = Vec::new();
        let mut page: u32 = 1;

        loop {
            let separator = if url.contains('?') { '&' } else { '?' };
            let page_url = format!("{}{}per_page={}&page={}", url, separator, PER_PAGE, page);

            let response = self
                .client
                .get(&page_url)
                .headers(self.headers()?)
                .send()
                .await
                .map_err(|e| ApiError::Network(e.to_string()))?;

            let items: Vec<T> = self.handle_response(response).await?;
            let page_count = items.len();
            all.extend(items);

            if page_count < PER_PAGE {
                break;
            }
            page += 1;
        }

        Ok(all)
    }
}

#[async_trait]
impl GitLabApi for GitLabClient {
    async fn list_branches(&self, project_id: u64) -> Result<Vec<Branch>, ApiError> {
        self.list_paginated(&self.project_url(project_id, "repository/branches"))
            .await
    }

    async fn list_tags(&self, project_id: u64) -> Result<Vec<Tag>, ApiError> {
        self.list_paginated(&self.project_url(project_id, "repository/tags"))
            .await
    }

    async fn list_open_merge_requests(
        &self,
        project_id: u64,
    ) -> Result<Vec<MergeRequest>, ApiError> {
        self.list_paginated(&self.project_url(project_id, "merge_requests?state=opened"))
            .await
    }

    async fn ref_tip(
        &self,
        project_id: u64,
        category: RefSpec,
        name: &str,
    ) -> Result<String, ApiError> {
        match category {
            RefSpec::Branches => {
                let url = self.project_url(
                    project_id,
                    &format!("repository/branches/{}", urlencoding::encode(name)),
                );
                let response = self
                    .client
                    .get(&url)
                    .headers(self.headers()?)
                    .send()
                    .await
                    .map_err(|e| ApiError::Network(e.to_string()))?;
                let branch: Branch = self.handle_response(response).await?;
                Ok(branch.commit.id)
            }
            RefSpec::Tags => {
                let url = self.project_url(
                    project_id,
                    &format!("repository/tags/{}", urlencoding::encode(name)),
                );
                let response = self
                    .client
                    .get(&url)
                    .headers(self.headers()?)
                    .send()
                    .await
                    .map_err(|e| ApiError::Network(e.to_string()))?;
                let tag: Tag = self.handle_response(response).await?;
                Ok(tag.commit.id)
            }
            RefSpec::MergeRequests => {
                let url = self.project_url(project_id, &format!("merge_requests/{}", name));
                let response = self
                    .client
                    .get(&url)
                    .headers(self.headers()?)
                    .send()
                    .await
                    .map_err(|e| ApiError::Network(e.to_string()))?;
                let mr: MergeRequest = self.handle_response(response).await?;
                mr.source_tip().map(str::to_string).ok_or_else(|| {
                    ApiError::NotFound(format!(
                        "merge request {} has no resolvable source tip",
                        name
                    ))
                })
            }
        }
    }

    async fn post_merge_request_note(
        &self,
        project_id: u64,
        merge_request_iid: u64,
        body: &str,
    ) -> Result<(), ApiError> {
        let url = self.project_url(
            project_id,
            &format!("merge_requests/{}/notes", merge_request_iid),
        );

        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .form(&[("body", body)])
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::map_error(status, error_message(response).await))
        }
    }
}

/// Extract an error message from a GitLab error body.
///
/// GitLab reports either `{"message": ...}` or `{"error": ...}`, and the
/// message is not always a string.
async fn error_message(response: Response) -> String {
    match response.json::<serde_json::Value>().await {
        Ok(value) => value
            .get("message")
            .or_else(|| value.get("error"))
            .map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| "Unknown error".to_string()),
        Err(_) => "Unknown error".to_string(),
    }
}

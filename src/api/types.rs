//! api::types
//!
//! Domain types for the GitLab REST API (v4 wire shapes).
//!
//! These deserialize directly from GitLab's JSON. Only the fields the
//! discovery engine and publisher consume are modeled; unknown fields are
//! ignored.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A commit as embedded in branch and tag payloads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Commit {
    /// Full commit SHA.
    pub id: String,
    /// Commit creation time, when the endpoint reports it.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A repository branch (`GET /projects/:id/repository/branches`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Branch {
    /// Branch name.
    pub name: String,
    /// Commit the branch currently points at.
    pub commit: Commit,
}

/// A repository tag (`GET /projects/:id/repository/tags`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Tag {
    /// Tag name.
    pub name: String,
    /// Tagged commit.
    pub commit: Commit,
}

/// Stored diff refs of a merge request.
///
/// These survive source branch deletion, which is why discovery falls back
/// to `head_sha` when the branch itself is gone.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct DiffRefs {
    /// Merge base of source and target at last diff.
    #[serde(default)]
    pub base_sha: Option<String>,
    /// Source branch tip at last diff.
    #[serde(default)]
    pub head_sha: Option<String>,
    /// Target branch tip at last diff.
    #[serde(default)]
    pub start_sha: Option<String>,
}

/// An open merge request (`GET /projects/:id/merge_requests?state=opened`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MergeRequest {
    /// Merge request iid, unique within the target project.
    pub iid: u64,
    /// Merge request title.
    pub title: String,
    /// Project owning the source branch (differs for forks).
    pub source_project_id: u64,
    /// Project the merge request targets.
    pub target_project_id: u64,
    /// Source branch name within the source project.
    pub source_branch: String,
    /// Target branch name within the target project.
    pub target_branch: String,
    /// Current source tip, when the endpoint reports it.
    #[serde(default)]
    pub sha: Option<String>,
    /// Stored diff refs; present on detailed payloads.
    #[serde(default)]
    pub diff_refs: Option<DiffRefs>,
}

impl MergeRequest {
    /// Whether the source branch lives in a different project.
    pub fn is_from_fork(&self) -> bool {
        self.source_project_id != self.target_project_id
    }

    /// Best known source tip: the live `sha` if reported, else the stored
    /// diff refs. `None` when neither survives (e.g. deleted fork).
    pub fn source_tip(&self) -> Option<&str> {
        self.sha
            .as_deref()
            .or_else(|| self.diff_refs.as_ref().and_then(|d| d.head_sha.as_deref()))
    }
}

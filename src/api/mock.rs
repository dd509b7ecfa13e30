//! api::mock
//!
//! In-memory GitLab fake for deterministic testing.
//!
//! # Design
//!
//! `MockGitLab` implements [`GitLabApi`] over seeded in-memory state. It
//! supports per-operation failure injection and records every operation for
//! verification, so tests can assert both results and interaction counts
//! (e.g. "suppressed publish performs zero network calls").
//!
//! # Example
//!
//! ```
//! use gitlab_branch_source::api::mock::MockGitLab;
//! use gitlab_branch_source::api::GitLabApi;
//!
//! # tokio_test::block_on(async {
//! let api = MockGitLab::new();
//! api.seed_branch(3, "main", "abc123");
//!
//! let branches = api.list_branches(3).await.unwrap();
//! assert_eq!(branches.len(), 1);
//! assert_eq!(branches[0].name, "main");
//! # });
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::traits::{ApiError, GitLabApi};
use super::types::{Branch, Commit, MergeRequest, Tag};
use crate::heads::RefSpec;

/// In-memory GitLab fake.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone)]
pub struct MockGitLab {
    /// Internal state shared across clones.
    inner: Arc<Mutex<MockGitLabInner>>,
}

/// Internal mutable state.
#[derive(Debug, Default)]
struct MockGitLabInner {
    /// Seeded project state by project id.
    projects: HashMap<u64, ProjectState>,
    /// Operation to fail (for testing error paths).
    fail_on: Option<FailOn>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

/// Seeded repository state for one project.
#[derive(Debug, Default)]
struct ProjectState {
    branches: Vec<Branch>,
    tags: Vec<Tag>,
    merge_requests: Vec<MergeRequest>,
    /// Posted notes as (merge request iid, body).
    notes: Vec<(u64, String)>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail list_branches with the given error.
    ListBranches(ApiError),
    /// Fail list_tags with the given error.
    ListTags(ApiError),
    /// Fail list_open_merge_requests with the given error.
    ListMergeRequests(ApiError),
    /// Fail ref_tip with the given error.
    RefTip(ApiError),
    /// Fail post_merge_request_note with the given error.
    PostNote(ApiError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    ListBranches {
        project_id: u64,
    },
    ListTags {
        project_id: u64,
    },
    ListMergeRequests {
        project_id: u64,
    },
    RefTip {
        project_id: u64,
        category: RefSpec,
        name: String,
    },
    PostNote {
        project_id: u64,
        merge_request_iid: u64,
        body: String,
    },
}

impl MockGitLab {
    /// Create a new empty mock.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockGitLabInner::default())),
        }
    }

    /// Seed a branch in a project.
    pub fn seed_branch(&self, project_id: u64, name: &str, hash: &str) {
        let mut inner = self.lock();
        inner
            .projects
            .entry(project_id)
            .or_default()
            .branches
            .push(Branch {
                name: name.to_string(),
                commit: Commit {
                    id: hash.to_string(),
                    created_at: None,
                },
            });
    }

    /// Seed a tag in a project.
    pub fn seed_tag(&self, project_id: u64, tag: Tag) {
        self.lock().projects.entry(project_id).or_default().tags.push(tag);
    }

    /// Seed an open merge request targeting a project.
    pub fn seed_merge_request(&self, project_id: u64, merge_request: MergeRequest) {
        self.lock()
            .projects
            .entry(project_id)
            .or_default()
            .merge_requests
            .push(merge_request);
    }

    /// Configure one operation to fail.
    pub fn set_fail_on(&self, fail_on: FailOn) {
        self.lock().fail_on = Some(fail_on);
    }

    /// Clear any configured failure.
    pub fn clear_fail_on(&self) {
        self.lock().fail_on = None;
    }

    /// All recorded operations, in call order.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.lock().operations.clone()
    }

    /// Notes posted on a merge request, in post order.
    pub fn notes(&self, project_id: u64, merge_request_iid: u64) -> Vec<String> {
        self.lock()
            .projects
            .get(&project_id)
            .map(|p| {
                p.notes
                    .iter()
                    .filter(|(iid, _)| *iid == merge_request_iid)
                    .map(|(_, body)| body.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockGitLabInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MockGitLab {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GitLabApi for MockGitLab {
    async fn list_branches(&self, project_id: u64) -> Result<Vec<Branch>, ApiError> {
        let mut inner = self.lock();
        inner
            .operations
            .push(MockOperation::ListBranches { project_id });
        if let Some(FailOn::ListBranches(err)) = &inner.fail_on {
            return Err(err.clone());
        }
        Ok(inner
            .projects
            .get(&project_id)
            .map(|p| p.branches.clone())
            .unwrap_or_default())
    }

    async fn list_tags(&self, project_id: u64) -> Result<Vec<Tag>, ApiError> {
        let mut inner = self.lock();
        inner.operations.push(MockOperation::ListTags { project_id });
        if let Some(FailOn::ListTags(err)) = &inner.fail_on {
            return Err(err.clone());
        }
        Ok(inner
            .projects
            .get(&project_id)
            .map(|p| p.tags.clone())
            .unwrap_or_default())
    }

    async fn list_open_merge_requests(
        &self,
        project_id: u64,
    ) -> Result<Vec<MergeRequest>, ApiError> {
        let mut inner = self.lock();
        inner
            .operations
            .push(MockOperation::ListMergeRequests { project_id });
        if let Some(FailOn::ListMergeRequests(err)) = &inner.fail_on {
            return Err(err.clone());
        }
        Ok(inner
            .projects
            .get(&project_id)
            .map(|p| p.merge_requests.clone())
            .unwrap_or_default())
    }

    async fn ref_tip(
        &self,
        project_id: u64,
        category: RefSpec,
        name: &str,
    ) -> Result<String, ApiError> {
        let mut inner = self.lock();
        inner.operations.push(MockOperation::RefTip {
            project_id,
            category,
            name: name.to_string(),
        });
        if let Some(FailOn::RefTip(err)) = &inner.fail_on {
            return Err(err.clone());
        }

        let project = inner
            .projects
            .get(&project_id)
            .ok_or_else(|| ApiError::NotFound(format!("project {}", project_id)))?;

        match category {
            RefSpec::Branches => project
                .branches
                .iter()
                .find(|b| b.name == name)
                .map(|b| b.commit.id.clone())
                .ok_or_else(|| ApiError::NotFound(format!("branch {}", name))),
            RefSpec::Tags => project
                .tags
                .iter()
                .find(|t| t.name == name)
                .map(|t| t.commit.id.clone())
                .ok_or_else(|| ApiError::NotFound(format!("tag {}", name))),
            RefSpec::MergeRequests => project
                .merge_requests
                .iter()
                .find(|mr| mr.iid.to_string() == name)
                .and_then(|mr| mr.source_tip().map(str::to_string))
                .ok_or_else(|| ApiError::NotFound(format!("merge request {}", name))),
        }
    }

    async fn post_merge_request_note(
        &self,
        project_id: u64,
        merge_request_iid: u64,
        body: &str,
    ) -> Result<(), ApiError> {
        let mut inner = self.lock();
        inner.operations.push(MockOperation::PostNote {
            project_id,
            merge_request_iid,
            body: body.to_string(),
        });
        if let Some(FailOn::PostNote(err)) = &inner.fail_on {
            return Err(err.clone());
        }
        inner
            .projects
            .entry(project_id)
            .or_default()
            .notes
            .push((merge_request_iid, body.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unseeded_project_lists_are_empty() {
        let api = MockGitLab::new();
        assert!(api.list_branches(3).await.unwrap().is_empty());
        assert!(api.list_tags(3).await.unwrap().is_empty());
        assert!(api.list_open_merge_requests(3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn seeded_branch_round_trips() {
        let api = MockGitLab::new();
        api.seed_branch(3, "main", "abc123");

        let branches = api.list_branches(3).await.unwrap();
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].commit.id, "abc123");

        let tip = api.ref_tip(3, RefSpec::Branches, "main").await.unwrap();
        assert_eq!(tip, "abc123");
    }

    #[tokio::test]
    async fn fail_on_scopes_to_one_operation() {
        let api = MockGitLab::new();
        api.seed_branch(3, "main", "abc123");
        api.set_fail_on(FailOn::ListTags(ApiError::RateLimited));

        assert!(api.list_branches(3).await.is_ok());
        assert!(matches!(api.list_tags(3).await, Err(ApiError::RateLimited)));

        api.clear_fail_on();
        assert!(api.list_tags(3).await.is_ok());
    }

    #[tokio::test]
    async fn operations_are_recorded_in_order() {
        let api = MockGitLab::new();
        api.list_branches(3).await.unwrap();
        api.post_merge_request_note(3, 1, "hello").await.unwrap();

        let ops = api.operations();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0], MockOperation::ListBranches { project_id: 3 });
        assert_eq!(
            ops[1],
            MockOperation::PostNote {
                project_id: 3,
                merge_request_iid: 1,
                body: "hello".to_string(),
            }
        );
        assert_eq!(api.notes(3, 1), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn clones_share_state() {
        let api = MockGitLab::new();
        let clone = api.clone();
        clone.seed_branch(3, "main", "abc123");
        assert_eq!(api.list_branches(3).await.unwrap().len(), 1);
    }
}

//! heads::checkout
//!
//! Fetch configuration for a resolved head.
//!
//! # Design
//!
//! The host checkout machinery needs three things per head: the remote to
//! fetch from, the exact refspec string, and the commit hash to check out.
//! [`CheckoutSpec`] bundles them. The owning project's clone URL — and, for
//! forked merge requests, the source project's — come from the host via
//! [`SourceContext`]; heads do not own connection details.
//!
//! GitLab publishes `refs/merge-requests/<iid>/head` on the target project,
//! so a merge request head always fetches from the owning remote. The
//! source project's remote is still reported for forks so the host can set
//! up a second remote when its merge strategy needs one.

use std::collections::HashMap;

use thiserror::Error;

use super::{GitLabHead, Revision};

/// Errors from building a checkout configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckoutError {
    /// No clone URL is known for a project referenced by the head.
    #[error("no clone url known for project {0}")]
    UnknownRemote(u64),
}

/// Clone URLs for the owning project and any fork projects referenced by
/// its merge requests. Supplied by the host, not owned by heads.
///
/// # Example
///
/// ```
/// use gitlab_branch_source::heads::SourceContext;
///
/// let ctx = SourceContext::new(3, "https://gitlab.example.com/group/app.git")
///     .with_fork_remote(9, "https://gitlab.example.com/contrib/app.git");
/// assert_eq!(ctx.clone_url(9), Some("https://gitlab.example.com/contrib/app.git"));
/// assert_eq!(ctx.clone_url(4), None);
/// ```
#[derive(Debug, Clone)]
pub struct SourceContext {
    project_id: u64,
    clone_urls: HashMap<u64, String>,
}

impl SourceContext {
    /// Create a context for the owning project.
    pub fn new(project_id: u64, clone_url: impl Into<String>) -> Self {
        let mut clone_urls = HashMap::new();
        clone_urls.insert(project_id, clone_url.into());
        Self {
            project_id,
            clone_urls,
        }
    }

    /// Register the clone URL of a fork project.
    pub fn with_fork_remote(mut self, project_id: u64, clone_url: impl Into<String>) -> Self {
        self.clone_urls.insert(project_id, clone_url.into());
        self
    }

    /// The owning project's id.
    pub fn project_id(&self) -> u64 {
        self.project_id
    }

    /// Clone URL for a project, if known.
    pub fn clone_url(&self, project_id: u64) -> Option<&str> {
        self.clone_urls.get(&project_id).map(String::as_str)
    }
}

/// The fetch configuration for one resolved head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSpec {
    /// Remote to fetch from (the owning project's clone URL).
    pub remote: String,
    /// Exact refspec string for the fetch operation.
    pub refspec: String,
    /// Commit hash to check out.
    pub hash: String,
    /// Source project remote for forked merge requests, when it differs
    /// from the owning remote.
    pub source_remote: Option<String>,
}

impl GitLabHead {
    /// Materialize the fetch configuration for this head.
    ///
    /// `revision` must have been resolved for this head; the returned
    /// configuration carries its concrete hash.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::UnknownRemote` when the context lacks a
    /// clone URL for the owning project, or for a forked merge request's
    /// source project.
    pub fn checkout_spec(
        &self,
        ctx: &SourceContext,
        revision: &Revision,
    ) -> Result<CheckoutSpec, CheckoutError> {
        let remote = ctx
            .clone_url(ctx.project_id())
            .ok_or(CheckoutError::UnknownRemote(ctx.project_id()))?
            .to_string();

        let source_remote = match self {
            GitLabHead::MergeRequest(mr) if mr.source_project_id() != ctx.project_id() => {
                let url = ctx
                    .clone_url(mr.source_project_id())
                    .ok_or(CheckoutError::UnknownRemote(mr.source_project_id()))?;
                Some(url.to_string())
            }
            _ => None,
        };

        Ok(CheckoutSpec {
            remote,
            refspec: self.ref_spec().fetch_refspec(&self.fetch_token()),
            hash: revision.hash().to_string(),
            source_remote,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockGitLab;
    use crate::heads::{resolve, ResolveMode};

    const PROJECT: u64 = 3;
    const ORIGIN: &str = "https://gitlab.example.com/group/app.git";

    async fn resolved(head: &GitLabHead) -> Revision {
        let api = MockGitLab::new();
        resolve(PROJECT, head, &api, ResolveMode::Pinned).await.unwrap()
    }

    #[tokio::test]
    async fn branch_checkout_uses_owning_remote() {
        let ctx = SourceContext::new(PROJECT, ORIGIN);
        let head: GitLabHead = GitLabHead::create_branch("main", "abc123").unwrap().into();
        let revision = resolved(&head).await;

        let spec = head.checkout_spec(&ctx, &revision).unwrap();
        assert_eq!(spec.remote, ORIGIN);
        assert_eq!(spec.refspec, "+refs/heads/main:refs/remotes/origin/main");
        assert_eq!(spec.hash, "abc123");
        assert!(spec.source_remote.is_none());
    }

    #[tokio::test]
    async fn merge_request_checkout_uses_iid_refspec() {
        let ctx = SourceContext::new(PROJECT, ORIGIN);
        let source = GitLabHead::create_branch("feature-x", "aaa111").unwrap();
        let target = GitLabHead::create_branch("main", "bbb222").unwrap();
        let head: GitLabHead =
            GitLabHead::create_merge_request(7, "add-login", PROJECT, source.into(), target)
                .unwrap()
                .into();
        let revision = resolved(&head).await;

        let spec = head.checkout_spec(&ctx, &revision).unwrap();
        assert_eq!(
            spec.refspec,
            "+refs/merge-requests/7/head:refs/remotes/origin/merge-requests/7"
        );
        assert_eq!(spec.hash, "aaa111");
        assert!(spec.source_remote.is_none());
    }

    #[tokio::test]
    async fn forked_merge_request_reports_source_remote() {
        let fork = "https://gitlab.example.com/contrib/app.git";
        let ctx = SourceContext::new(PROJECT, ORIGIN).with_fork_remote(9, fork);
        let source = GitLabHead::create_branch("patch-1", "cafe01").unwrap();
        let target = GitLabHead::create_branch("main", "bbb222").unwrap();
        let head: GitLabHead =
            GitLabHead::create_merge_request(9, "fix-typo", 9, source.into(), target)
                .unwrap()
                .into();
        let revision = resolved(&head).await;

        let spec = head.checkout_spec(&ctx, &revision).unwrap();
        assert_eq!(spec.remote, ORIGIN);
        assert_eq!(spec.source_remote.as_deref(), Some(fork));
    }

    #[tokio::test]
    async fn missing_fork_remote_is_an_error() {
        let ctx = SourceContext::new(PROJECT, ORIGIN);
        let source = GitLabHead::create_branch("patch-1", "cafe01").unwrap();
        let target = GitLabHead::create_branch("main", "bbb222").unwrap();
        let head: GitLabHead =
            GitLabHead::create_merge_request(9, "fix-typo", 9, source.into(), target)
                .unwrap()
                .into();
        let revision = resolved(&head).await;

        assert_eq!(
            head.checkout_spec(&ctx, &revision),
            Err(CheckoutError::UnknownRemote(9))
        );
    }
}

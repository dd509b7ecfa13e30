//! Integration tests for the discovery engine and revision resolution.
//!
//! These tests drive full reconciliation passes against the in-memory
//! GitLab fake and verify:
//! - merge-request linkage to source and target branches
//! - forked merge requests with sources in another project
//! - deduplication when several merge requests reference one branch
//! - partial results when one category fails
//! - value-equal results across passes over unchanged state

use gitlab_branch_source::api::mock::{FailOn, MockGitLab};
use gitlab_branch_source::api::types::{Commit, DiffRefs, MergeRequest, Tag};
use gitlab_branch_source::api::ApiError;
use gitlab_branch_source::discovery::{discover, DiscoveryGap};
use gitlab_branch_source::heads::{
    resolve, GitLabHead, MergeRequestHead, RefSpec, ResolveMode, SourceContext,
};

const PROJECT: u64 = 3;
const FORK_PROJECT: u64 = 9;

fn open_mr(iid: u64, title: &str, source_project: u64, source: &str, target: &str) -> MergeRequest {
    MergeRequest {
        iid,
        title: title.to_string(),
        source_project_id: source_project,
        target_project_id: PROJECT,
        source_branch: source.to_string(),
        target_branch: target.to_string(),
        sha: None,
        diff_refs: None,
    }
}

fn merge_request_heads(heads: &[GitLabHead]) -> Vec<&MergeRequestHead> {
    heads
        .iter()
        .filter_map(|h| match h {
            GitLabHead::MergeRequest(mr) => Some(mr),
            _ => None,
        })
        .collect()
}

mod same_project_linkage {
    use super::*;

    #[tokio::test]
    async fn one_merge_request_links_both_branches() {
        let api = MockGitLab::new();
        api.seed_branch(PROJECT, "main", "abc123");
        api.seed_branch(PROJECT, "feature-x", "def456");
        api.seed_merge_request(PROJECT, open_mr(7, "add-login", PROJECT, "feature-x", "main"));

        let result = discover(PROJECT, &api).await;
        assert!(result.is_complete());

        // BranchHead(main, true), BranchHead(feature-x, true), MergeRequestHead(7)
        assert_eq!(result.heads.len(), 3);
        for name in ["main", "feature-x"] {
            let branch = result
                .branches()
                .find(|b| b.name().as_str() == name)
                .unwrap();
            assert!(branch.has_merge_request(), "{} should be linked", name);
        }

        let mrs = merge_request_heads(&result.heads);
        assert_eq!(mrs.len(), 1);
        assert_eq!(mrs[0].iid(), 7);
        assert_eq!(mrs[0].source().name().as_str(), "feature-x");
        assert_eq!(mrs[0].target().name().as_str(), "main");
    }

    #[tokio::test]
    async fn unrelated_branches_stay_unflagged() {
        let api = MockGitLab::new();
        api.seed_branch(PROJECT, "main", "abc123");
        api.seed_branch(PROJECT, "feature-x", "def456");
        api.seed_branch(PROJECT, "docs", "777888");
        api.seed_merge_request(PROJECT, open_mr(7, "add-login", PROJECT, "feature-x", "main"));

        let result = discover(PROJECT, &api).await;
        let docs = result.branches().find(|b| b.name().as_str() == "docs").unwrap();
        assert!(!docs.has_merge_request());
    }

    #[tokio::test]
    async fn many_merge_requests_against_one_target_deduplicate() {
        let api = MockGitLab::new();
        api.seed_branch(PROJECT, "main", "abc123");
        api.seed_branch(PROJECT, "feature-x", "def456");
        api.seed_branch(PROJECT, "feature-y", "0a0b0c");
        api.seed_merge_request(PROJECT, open_mr(7, "first", PROJECT, "feature-x", "main"));
        api.seed_merge_request(PROJECT, open_mr(8, "second", PROJECT, "feature-y", "main"));

        let result = discover(PROJECT, &api).await;
        let main_entries: Vec<_> = result
            .branches()
            .filter(|b| b.name().as_str() == "main")
            .collect();
        assert_eq!(main_entries.len(), 1);
        assert!(main_entries[0].has_merge_request());
        assert_eq!(merge_request_heads(&result.heads).len(), 2);
    }
}

mod fork_linkage {
    use super::*;

    #[tokio::test]
    async fn fork_source_is_standalone() {
        let api = MockGitLab::new();
        api.seed_branch(PROJECT, "main", "abc123");
        let mut forked = open_mr(9, "fix-typo", FORK_PROJECT, "patch-1", "main");
        forked.sha = Some("cafe01".to_string());
        api.seed_merge_request(PROJECT, forked);

        let result = discover(PROJECT, &api).await;
        assert!(result.is_complete());

        // patch-1 must not appear in the project's own branch set.
        assert!(result.branches().all(|b| b.name().as_str() != "patch-1"));

        let mrs = merge_request_heads(&result.heads);
        assert_eq!(mrs[0].source_project_id(), FORK_PROJECT);
        assert_eq!(mrs[0].source().name().as_str(), "patch-1");
        assert!(mrs[0].target().has_merge_request());
    }

    #[tokio::test]
    async fn fork_revision_resolves_against_source_project() {
        let api = MockGitLab::new();
        api.seed_branch(PROJECT, "main", "abc123");
        api.seed_branch(FORK_PROJECT, "patch-1", "cafe01");
        let mut forked = open_mr(9, "fix-typo", FORK_PROJECT, "patch-1", "main");
        forked.sha = Some("cafe01".to_string());
        api.seed_merge_request(PROJECT, forked);

        let result = discover(PROJECT, &api).await;
        let head = result
            .heads
            .iter()
            .find(|h| matches!(h, GitLabHead::MergeRequest(_)))
            .unwrap();

        let revision = resolve(PROJECT, head, &api, ResolveMode::Pinned).await.unwrap();
        assert_eq!(revision.hash(), "cafe01");

        // Checkout config fetches the MR ref from the owning remote and
        // reports the fork remote separately.
        let ctx = SourceContext::new(PROJECT, "https://gitlab.example.com/group/app.git")
            .with_fork_remote(FORK_PROJECT, "https://gitlab.example.com/contrib/app.git");
        let spec = head.checkout_spec(&ctx, &revision).unwrap();
        assert_eq!(
            spec.refspec,
            "+refs/merge-requests/9/head:refs/remotes/origin/merge-requests/9"
        );
        assert_eq!(
            spec.source_remote.as_deref(),
            Some("https://gitlab.example.com/contrib/app.git")
        );
    }

    #[tokio::test]
    async fn deleted_fork_without_diff_refs_is_excluded() {
        let api = MockGitLab::new();
        api.seed_branch(PROJECT, "main", "abc123");
        api.seed_merge_request(PROJECT, open_mr(9, "fix-typo", FORK_PROJECT, "patch-1", "main"));

        let result = discover(PROJECT, &api).await;
        assert!(merge_request_heads(&result.heads).is_empty());
        assert!(matches!(
            result.gaps.as_slice(),
            [DiscoveryGap::MergeRequest { iid: 9, .. }]
        ));
        // The excluded merge request references no head, so its target
        // keeps an unflagged entry.
        let main = result.branches().find(|b| b.name().as_str() == "main").unwrap();
        assert!(!main.has_merge_request());
    }

    #[tokio::test]
    async fn deleted_fork_with_diff_refs_survives() {
        let api = MockGitLab::new();
        api.seed_branch(PROJECT, "main", "abc123");
        let mut forked = open_mr(9, "fix-typo", FORK_PROJECT, "patch-1", "main");
        forked.diff_refs = Some(DiffRefs {
            head_sha: Some("dead99".to_string()),
            ..Default::default()
        });
        api.seed_merge_request(PROJECT, forked);

        let result = discover(PROJECT, &api).await;
        assert!(result.is_complete());
        let mrs = merge_request_heads(&result.heads);
        assert!(matches!(
            mrs[0].source(),
            GitLabHead::Branch(b) if b.hash() == "dead99"
        ));
    }
}

mod partial_results {
    use super::*;

    #[tokio::test]
    async fn tag_failure_does_not_abort_branches_or_merge_requests() {
        let api = MockGitLab::new();
        api.seed_branch(PROJECT, "main", "abc123");
        api.seed_branch(PROJECT, "feature-x", "def456");
        api.seed_merge_request(PROJECT, open_mr(7, "add-login", PROJECT, "feature-x", "main"));
        api.set_fail_on(FailOn::ListTags(ApiError::Network("timeout".to_string())));

        let result = discover(PROJECT, &api).await;
        assert_eq!(result.branches().count(), 2);
        assert_eq!(merge_request_heads(&result.heads).len(), 1);
        assert!(matches!(
            result.gaps.as_slice(),
            [DiscoveryGap::Category {
                category: RefSpec::Tags,
                ..
            }]
        ));
    }

    #[tokio::test]
    async fn branch_failure_excludes_dependent_merge_requests() {
        let api = MockGitLab::new();
        api.seed_branch(PROJECT, "main", "abc123");
        api.seed_merge_request(PROJECT, open_mr(7, "add-login", PROJECT, "feature-x", "main"));
        api.set_fail_on(FailOn::ListBranches(ApiError::RateLimited));

        let result = discover(PROJECT, &api).await;
        // No branch set means no target to link against.
        assert_eq!(result.branches().count(), 0);
        assert!(merge_request_heads(&result.heads).is_empty());
        assert_eq!(result.gaps.len(), 2);
    }
}

mod idempotence {
    use super::*;

    #[tokio::test]
    async fn unchanged_state_yields_value_equal_head_sets() {
        let api = MockGitLab::new();
        api.seed_branch(PROJECT, "main", "abc123");
        api.seed_branch(PROJECT, "feature-x", "def456");
        api.seed_tag(
            PROJECT,
            Tag {
                name: "v1.0.0".to_string(),
                commit: Commit {
                    id: "ddd444".to_string(),
                    created_at: None,
                },
            },
        );
        api.seed_merge_request(PROJECT, open_mr(7, "add-login", PROJECT, "feature-x", "main"));

        let first = discover(PROJECT, &api).await;
        let second = discover(PROJECT, &api).await;
        assert_eq!(first.heads, second.heads);
        assert!(first.is_complete() && second.is_complete());
    }
}

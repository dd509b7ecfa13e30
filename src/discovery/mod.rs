//! discovery
//!
//! The reconciliation engine: one pass over a project's current GitLab
//! state producing its complete, self-consistent head set.
//!
//! # Algorithm
//!
//! 1. Fetch branches, tags and open merge requests concurrently. The
//!    branch set must be complete before merge-request linkage runs; that
//!    is the one hard ordering constraint, and awaiting all three fetches
//!    up front satisfies it.
//! 2. A fetch failure for one category contributes an empty category plus
//!    a [`DiscoveryGap::Category`]; the other categories proceed.
//! 3. Each merge request links to its source and target:
//!    - a same-project source reuses the discovered branch head;
//!    - a fork source becomes a standalone branch head that never enters
//!      the project's own branch set;
//!    - a source whose branch is gone falls back to the merge request's
//!      stored diff refs, and is excluded with a gap when no hash survives;
//!    - the target must be a discovered branch of this project.
//! 4. Every branch referenced by at least one merge request is replaced by
//!    a fresh head with `has_merge_request = true` — once, regardless of
//!    how many merge requests reference it.
//! 5. The result is branches, tags and merge requests in deterministic
//!    order, value-equal across passes over unchanged remote state.
//!
//! The engine holds no state across passes; it is safe to run concurrently
//! for different projects.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::api::types::MergeRequest;
use crate::api::{ApiError, GitLabApi};
use crate::heads::{BranchHead, GitLabHead, RefSpec};

/// A recoverable gap in a discovery pass.
///
/// Gaps are warnings scoped to a category or a single merge request, never
/// a failure of the pass itself.
#[derive(Debug)]
pub enum DiscoveryGap {
    /// One category's fetch failed; its contribution is empty.
    Category {
        /// The category that failed.
        category: RefSpec,
        /// The underlying API error.
        error: ApiError,
    },
    /// A merge request was excluded from the result.
    MergeRequest {
        /// The excluded merge request's iid.
        iid: u64,
        /// Why it was excluded.
        reason: String,
    },
}

/// The outcome of one discovery pass.
#[derive(Debug)]
pub struct DiscoveryResult {
    /// The current buildable head set.
    pub heads: Vec<GitLabHead>,
    /// Recoverable gaps encountered during the pass.
    pub gaps: Vec<DiscoveryGap>,
}

impl DiscoveryResult {
    /// Whether the pass completed with no gaps.
    pub fn is_complete(&self) -> bool {
        self.gaps.is_empty()
    }

    /// Iterate the branch heads in the result.
    pub fn branches(&self) -> impl Iterator<Item = &BranchHead> {
        self.heads.iter().filter_map(|h| match h {
            GitLabHead::Branch(b) => Some(b),
            _ => None,
        })
    }
}

/// Run one discovery pass for a project.
///
/// Never fails as a whole: collaborator errors and invalid entries become
/// [`DiscoveryGap`]s alongside the heads that could be discovered.
pub async fn discover(project_id: u64, api: &dyn GitLabApi) -> DiscoveryResult {
    let (branches, tags, merge_requests) = tokio::join!(
        api.list_branches(project_id),
        api.list_tags(project_id),
        api.list_open_merge_requests(project_id),
    );

    let mut gaps = Vec::new();

    // Step 1: branch set, keyed by name for linkage and deduplication.
    let mut branch_map: BTreeMap<String, BranchHead> = BTreeMap::new();
    match branches {
        Ok(list) => {
            for branch in list {
                match GitLabHead::create_branch(&branch.name, &branch.commit.id) {
                    Ok(head) => {
                        branch_map.insert(branch.name, head);
                    }
                    Err(err) => {
                        warn!(project_id, name = %branch.name, %err, "skipping invalid branch");
                    }
                }
            }
        }
        Err(error) => {
            warn!(project_id, %error, "branch discovery failed");
            gaps.push(DiscoveryGap::Category {
                category: RefSpec::Branches,
                error,
            });
        }
    }

    // Step 2: tags.
    let mut tag_heads = Vec::new();
    match tags {
        Ok(list) => {
            for tag in list {
                let timestamp = tag.commit.created_at.unwrap_or_default();
                match GitLabHead::create_tag(&tag.name, &tag.commit.id, timestamp) {
                    Ok(head) => tag_heads.push(head),
                    Err(err) => {
                        warn!(project_id, name = %tag.name, %err, "skipping invalid tag");
                    }
                }
            }
        }
        Err(error) => {
            warn!(project_id, %error, "tag discovery failed");
            gaps.push(DiscoveryGap::Category {
                category: RefSpec::Tags,
                error,
            });
        }
    }
    tag_heads.sort_by(|a, b| a.name().cmp(b.name()));

    // Step 3: merge-request linkage. First work out which branches are
    // referenced, so every linked branch is rebuilt exactly once before any
    // merge request head embeds it.
    let mut mr_list = Vec::new();
    match merge_requests {
        Ok(list) => mr_list = list,
        Err(error) => {
            warn!(project_id, %error, "merge request discovery failed");
            gaps.push(DiscoveryGap::Category {
                category: RefSpec::MergeRequests,
                error,
            });
        }
    }
    mr_list.sort_by_key(|mr| mr.iid);

    let mut linked: BTreeSet<String> = BTreeSet::new();
    for mr in &mr_list {
        // A merge request that will not form a head (target gone, or no
        // source hash obtainable) must not flag any branch.
        if !branch_map.contains_key(&mr.target_branch) {
            continue;
        }
        let source_discovered =
            mr.source_project_id == project_id && branch_map.contains_key(&mr.source_branch);
        if !source_discovered && mr.source_tip().is_none() {
            continue;
        }
        linked.insert(mr.target_branch.clone());
        if source_discovered {
            linked.insert(mr.source_branch.clone());
        }
    }

    // Step 4: substitute flagged heads. Heads are immutable, so marking a
    // branch replaces it at the same name.
    for name in &linked {
        if let Some(head) = branch_map.get(name) {
            let flagged = head.with_merge_request();
            branch_map.insert(name.clone(), flagged);
        }
    }

    // Construct merge request heads against the flagged branch set.
    let mut mr_heads = Vec::new();
    for mr in &mr_list {
        match link_merge_request(project_id, mr, &branch_map) {
            Ok(head) => mr_heads.push(head),
            Err(reason) => {
                warn!(project_id, iid = mr.iid, %reason, "excluding merge request");
                gaps.push(DiscoveryGap::MergeRequest {
                    iid: mr.iid,
                    reason,
                });
            }
        }
    }

    // Step 5: union, in deterministic order.
    let mut heads: Vec<GitLabHead> = Vec::with_capacity(branch_map.len() + tag_heads.len() + mr_heads.len());
    heads.extend(branch_map.into_values().map(GitLabHead::Branch));
    heads.extend(tag_heads.into_iter().map(GitLabHead::Tag));
    heads.extend(mr_heads.into_iter().map(GitLabHead::MergeRequest));

    debug!(
        project_id,
        heads = heads.len(),
        gaps = gaps.len(),
        "discovery pass complete"
    );

    DiscoveryResult { heads, gaps }
}

/// Link one merge request to its source and target heads.
///
/// Returns the exclusion reason on failure; the caller records it as a gap.
fn link_merge_request(
    project_id: u64,
    mr: &MergeRequest,
    branch_map: &BTreeMap<String, BranchHead>,
) -> Result<crate::heads::MergeRequestHead, String> {
    let target = branch_map
        .get(&mr.target_branch)
        .cloned()
        .ok_or_else(|| format!("target branch '{}' not found in project", mr.target_branch))?;

    let source: BranchHead = if mr.source_project_id == project_id {
        match branch_map.get(&mr.source_branch) {
            Some(head) => head.clone(),
            // Source branch deleted; fall back to the stored diff refs.
            None => standalone_source(mr)?,
        }
    } else {
        // Fork: a standalone head serving only as the source, never part of
        // this project's own branch set.
        standalone_source(mr)?
    };

    // Titles are neither unique nor refspec-safe; the iid is both.
    GitLabHead::create_merge_request(
        mr.iid,
        format!("MR-{}", mr.iid),
        mr.source_project_id,
        source.into(),
        target,
    )
    .map_err(|err| format!("invalid merge request head: {}", err))
}

/// Build a source branch head from the merge request's own record.
fn standalone_source(mr: &MergeRequest) -> Result<BranchHead, String> {
    let hash = mr
        .source_tip()
        .ok_or_else(|| format!("no commit hash obtainable for source branch '{}'", mr.source_branch))?;
    GitLabHead::create_branch_with_merge_request(&mr.source_branch, hash, true)
        .map_err(|err| format!("invalid source branch head: {}", err))
}

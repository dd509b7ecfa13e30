//! heads::revision
//!
//! Revision snapshots and head resolution.
//!
//! # Design
//!
//! A [`Revision`] pairs a head with the concrete commit hash needed to check
//! it out — and, for merge-result builds, the target branch tip as a second
//! hash. Revisions are immutable snapshots; a new discovery pass produces
//! new revisions rather than mutating prior ones.
//!
//! Resolution is a pure function of the head plus the collaborator's current
//! view: it never mutates the head, is reentrant, and queries the
//! collaborator exactly once per sentinel lookup. The `"HEAD"` sentinel
//! means "resolve lazily via the symbolic ref" and is replaced by a literal
//! hash before a revision exists.
//!
//! Merge request heads resolve through their source. GitLab does not nest
//! merge requests, so source chains terminate after one hop in practice;
//! resolution still walks chains iteratively so a chained reference can
//! never overflow the stack.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{BranchHead, GitLabHead, RefSpec, TagHead};
use crate::api::{ApiError, GitLabApi};

/// Sentinel hash meaning "resolve lazily via the symbolic ref".
pub const REVISION_HEAD: &str = "HEAD";

/// Errors from revision resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The collaborator could not report a tip for the ref.
    #[error("cannot resolve tip of {category} ref '{name}' in project {project_id}: {source}")]
    TipLookup {
        /// Ref category of the unresolvable ref.
        category: RefSpec,
        /// Ref name (or merge request iid) that failed to resolve.
        name: String,
        /// Project the lookup ran against.
        project_id: u64,
        /// Underlying API error.
        #[source]
        source: ApiError,
    },
}

/// How literal discovery-time hashes are treated at resolution.
///
/// A merge request's source branch may be force-pushed between discovery
/// and build. `Pinned` builds the hash recorded at discovery; `Refetch`
/// asks the collaborator for the current tip on every resolve. Both are
/// valid; `Pinned` is the default because it keeps a discovery pass
/// internally consistent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolveMode {
    /// Use the hash recorded at discovery; only the `"HEAD"` sentinel
    /// triggers a collaborator lookup.
    #[default]
    Pinned,
    /// Ask the collaborator for the current tip on every resolve.
    Refetch,
}

/// A resolved, concrete commit identity for a head at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Revision {
    head: GitLabHead,
    hash: String,
    target_hash: Option<String>,
}

impl Revision {
    fn new(head: GitLabHead, hash: String) -> Self {
        Self {
            head,
            hash,
            target_hash: None,
        }
    }

    fn with_target(head: GitLabHead, hash: String, target_hash: String) -> Self {
        Self {
            head,
            hash,
            target_hash: Some(target_hash),
        }
    }

    /// The head this revision was resolved for.
    pub fn head(&self) -> &GitLabHead {
        &self.head
    }

    /// The commit hash to check out. Never the `"HEAD"` sentinel.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// The target branch tip, present only for merge-result builds.
    pub fn target_hash(&self) -> Option<&str> {
        self.target_hash.as_deref()
    }
}

/// Resolve a head to a concrete revision.
///
/// `project_id` is the project owning the head; merge request sources are
/// looked up in their own `source_project_id`, which differs for forks.
///
/// # Errors
///
/// Returns `ResolveError::TipLookup` when the collaborator cannot report a
/// commit hash for a ref that requires lookup. Callers that need a revision
/// before use must exclude the head from buildable output on error.
pub async fn resolve(
    project_id: u64,
    head: &GitLabHead,
    api: &dyn GitLabApi,
    mode: ResolveMode,
) -> Result<Revision, ResolveError> {
    if let GitLabHead::MergeRequest(mr) = head {
        if mr.merge_result_build() {
            let (source_project, source) = terminal(mr.source_project_id(), mr.source());
            let source_hash = terminal_hash(source_project, source, api, mode).await?;
            let target_hash = hash_for(
                project_id,
                RefSpec::Branches,
                mr.target().name().as_str(),
                mr.target().hash(),
                api,
                mode,
            )
            .await?;
            return Ok(Revision::with_target(head.clone(), source_hash, target_hash));
        }
    }

    let (terminal_project, terminal_head) = terminal(project_id, head);
    let hash = terminal_hash(terminal_project, terminal_head, api, mode).await?;
    Ok(Revision::new(head.clone(), hash))
}

/// The end of a merge request source chain: always a branch or a tag.
enum Terminal<'a> {
    Branch(&'a BranchHead),
    Tag(&'a TagHead),
}

/// Walk merge request source chains to their terminal branch or tag.
fn terminal(mut project_id: u64, mut head: &GitLabHead) -> (u64, Terminal<'_>) {
    loop {
        match head {
            GitLabHead::MergeRequest(mr) => {
                project_id = mr.source_project_id();
                head = mr.source();
            }
            GitLabHead::Branch(b) => return (project_id, Terminal::Branch(b)),
            GitLabHead::Tag(t) => return (project_id, Terminal::Tag(t)),
        }
    }
}

async fn terminal_hash(
    project_id: u64,
    terminal: Terminal<'_>,
    api: &dyn GitLabApi,
    mode: ResolveMode,
) -> Result<String, ResolveError> {
    match terminal {
        Terminal::Branch(b) => {
            hash_for(
                project_id,
                RefSpec::Branches,
                b.name().as_str(),
                b.hash(),
                api,
                mode,
            )
            .await
        }
        Terminal::Tag(t) => {
            hash_for(
                project_id,
                RefSpec::Tags,
                t.name().as_str(),
                t.hash(),
                api,
                mode,
            )
            .await
        }
    }
}

async fn hash_for(
    project_id: u64,
    category: RefSpec,
    name: &str,
    stored: &str,
    api: &dyn GitLabApi,
    mode: ResolveMode,
) -> Result<String, ResolveError> {
    if stored != REVISION_HEAD && mode == ResolveMode::Pinned {
        return Ok(stored.to_string());
    }
    api.ref_tip(project_id, category, name)
        .await
        .map_err(|source| ResolveError::TipLookup {
            category,
            name: name.to_string(),
            project_id,
            source,
        })
}

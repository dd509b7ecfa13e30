//! heads
//!
//! The immutable head model: branches, tags and merge requests as
//! discoverable, buildable units of source.
//!
//! # Design
//!
//! A head is a named, immutable reference to a buildable line of history.
//! The three variants are modeled as a tagged union ([`GitLabHead`]) with
//! variant payload structs rather than an inheritance hierarchy; shared
//! accessors (`name`, `pronoun`, `ref_spec`) are exhaustive matches so a new
//! variant cannot be added without deciding its category behavior.
//!
//! Heads carry value semantics: equality and hashing are derived from
//! identity fields, and a discovery pass always produces fresh heads rather
//! than mutating prior ones. The only flag that looks mutable,
//! `BranchHead::has_merge_request`, is fixed at construction; "marking" a
//! branch means substituting a freshly built head at the same name.
//!
//! # Construction
//!
//! All heads are built through the factory functions on [`GitLabHead`]
//! (`create_branch`, `create_tag`, `create_merge_request`). The factories
//! are the only construction path and reject structurally invalid heads —
//! most importantly an empty name, which would otherwise collide with other
//! heads or corrupt the fetch-refspec substitution.
//!
//! # Modules
//!
//! - [`refspec`] - Ref categories and fetch-refspec templates
//! - [`revision`] - Revision snapshots and resolution
//! - [`checkout`] - Fetch configuration for a resolved head

pub mod checkout;
pub mod refspec;
pub mod revision;

pub use checkout::{CheckoutError, CheckoutSpec, SourceContext};
pub use refspec::RefSpec;
pub use revision::{resolve, ResolveError, ResolveMode, Revision, REVISION_HEAD};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from head construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeadError {
    /// The head name is empty or whitespace-only.
    #[error("invalid head name: {0}")]
    InvalidName(String),
}

/// A validated head name.
///
/// Head names identify a head within its variant and project scope and feed
/// directly into fetch-refspec substitution, so they must be non-empty and
/// free of whitespace.
///
/// # Example
///
/// ```
/// use gitlab_branch_source::heads::HeadName;
///
/// let name = HeadName::new("feature/login").unwrap();
/// assert_eq!(name.as_str(), "feature/login");
///
/// assert!(HeadName::new("").is_err());
/// assert!(HeadName::new("   ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HeadName(String);

impl HeadName {
    /// Create a new validated head name.
    ///
    /// # Errors
    ///
    /// Returns `HeadError::InvalidName` for empty or whitespace-only names.
    pub fn new(name: impl Into<String>) -> Result<Self, HeadError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(HeadError::InvalidName("name cannot be empty".into()));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(HeadError::InvalidName(format!(
                "name cannot contain whitespace: {:?}",
                name
            )));
        }
        Ok(Self(name))
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for HeadName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for HeadName {
    type Error = HeadError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<HeadName> for String {
    fn from(name: HeadName) -> Self {
        name.0
    }
}

/// A branch head.
///
/// Carries the commit the branch pointed at when discovered and whether at
/// least one open merge request currently sources from or targets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BranchHead {
    name: HeadName,
    hash: String,
    has_merge_request: bool,
}

impl BranchHead {
    /// The branch name.
    pub fn name(&self) -> &HeadName {
        &self.name
    }

    /// The commit hash recorded at discovery, or the `"HEAD"` sentinel.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Whether an open merge request sources from or targets this branch.
    pub fn has_merge_request(&self) -> bool {
        self.has_merge_request
    }

    /// Rebuild this branch with the merge-request flag set.
    ///
    /// Heads are immutable; marking substitutes a fresh value.
    pub(crate) fn with_merge_request(&self) -> Self {
        Self {
            name: self.name.clone(),
            hash: self.hash.clone(),
            has_merge_request: true,
        }
    }
}

/// A tag head.
///
/// The timestamp is the tag's creation time, used for ordering and display
/// only; build correctness depends solely on the hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagHead {
    name: HeadName,
    hash: String,
    timestamp: DateTime<Utc>,
}

impl TagHead {
    /// The tag name.
    pub fn name(&self) -> &HeadName {
        &self.name
    }

    /// The tagged commit hash, or the `"HEAD"` sentinel.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Tag creation time.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// A merge request head.
///
/// Identity spans two revisions and, for forked merge requests, two
/// projects: `source` is the head to build (the fork's branch lives in
/// `source_project_id`), `target` is the branch of the owning project the
/// merge request would merge into. Both are owned values — a merge request
/// head without a source or target cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MergeRequestHead {
    iid: u64,
    name: HeadName,
    source_project_id: u64,
    source: Box<GitLabHead>,
    target: BranchHead,
    merge_result_build: bool,
}

impl MergeRequestHead {
    /// The merge request iid (unique within the owning project).
    pub fn iid(&self) -> u64 {
        self.iid
    }

    /// The display name.
    pub fn name(&self) -> &HeadName {
        &self.name
    }

    /// The project owning the source branch.
    ///
    /// Differs from the owning project's id when the merge request comes
    /// from a fork.
    pub fn source_project_id(&self) -> u64 {
        self.source_project_id
    }

    /// The head representing the commit to build.
    pub fn source(&self) -> &GitLabHead {
        &self.source
    }

    /// The branch the merge request would merge into.
    pub fn target(&self) -> &BranchHead {
        &self.target
    }

    /// Whether resolution should produce a merge-result revision pair
    /// (source tip plus target tip) instead of the source tip alone.
    pub fn merge_result_build(&self) -> bool {
        self.merge_result_build
    }

    /// Rebuild this head with the merge-result flag set.
    ///
    /// The flag is chosen by the host's merge-strategy configuration, not
    /// at discovery time, so it is applied after construction.
    pub fn for_merge_result_build(&self) -> Self {
        Self {
            merge_result_build: true,
            ..self.clone()
        }
    }
}

/// An immutable named reference to a buildable line of source history.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GitLabHead {
    /// A branch of the project.
    Branch(BranchHead),
    /// A tag of the project.
    Tag(TagHead),
    /// An open merge request targeting the project.
    MergeRequest(MergeRequestHead),
}

impl GitLabHead {
    /// Create a branch head with no known merge request.
    ///
    /// # Errors
    ///
    /// Returns `HeadError::InvalidName` if `name` is empty.
    pub fn create_branch(
        name: impl Into<String>,
        hash: impl Into<String>,
    ) -> Result<BranchHead, HeadError> {
        Self::create_branch_with_merge_request(name, hash, false)
    }

    /// Create a branch head with an explicit merge-request flag.
    ///
    /// Used by the discovery engine once merge-request linkage is known.
    pub(crate) fn create_branch_with_merge_request(
        name: impl Into<String>,
        hash: impl Into<String>,
        has_merge_request: bool,
    ) -> Result<BranchHead, HeadError> {
        Ok(BranchHead {
            name: HeadName::new(name)?,
            hash: hash.into(),
            has_merge_request,
        })
    }

    /// Create a tag head.
    ///
    /// # Errors
    ///
    /// Returns `HeadError::InvalidName` if `name` is empty.
    pub fn create_tag(
        name: impl Into<String>,
        hash: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<TagHead, HeadError> {
        Ok(TagHead {
            name: HeadName::new(name)?,
            hash: hash.into(),
            timestamp,
        })
    }

    /// Create a merge request head.
    ///
    /// The merge-result flag defaults to false; use
    /// [`MergeRequestHead::for_merge_result_build`] to opt in.
    ///
    /// # Errors
    ///
    /// Returns `HeadError::InvalidName` if `name` is empty.
    pub fn create_merge_request(
        iid: u64,
        name: impl Into<String>,
        source_project_id: u64,
        source: GitLabHead,
        target: BranchHead,
    ) -> Result<MergeRequestHead, HeadError> {
        Ok(MergeRequestHead {
            iid,
            name: HeadName::new(name)?,
            source_project_id,
            source: Box::new(source),
            target,
            merge_result_build: false,
        })
    }

    /// The head's name.
    pub fn name(&self) -> &HeadName {
        match self {
            GitLabHead::Branch(b) => b.name(),
            GitLabHead::Tag(t) => t.name(),
            GitLabHead::MergeRequest(mr) => mr.name(),
        }
    }

    /// Human-readable category label. Presentation only.
    pub fn pronoun(&self) -> &'static str {
        match self {
            GitLabHead::Branch(_) => "Branch",
            GitLabHead::Tag(_) => "Tag",
            GitLabHead::MergeRequest(_) => "Merge Request",
        }
    }

    /// The ref category governing how this head is fetched.
    pub fn ref_spec(&self) -> RefSpec {
        match self {
            GitLabHead::Branch(_) => RefSpec::Branches,
            GitLabHead::Tag(_) => RefSpec::Tags,
            GitLabHead::MergeRequest(_) => RefSpec::MergeRequests,
        }
    }

    /// The token substituted into this head's fetch refspec.
    ///
    /// Branch and tag heads use their name; merge request heads use their
    /// iid, matching GitLab's `refs/merge-requests/<iid>/head` layout.
    pub fn fetch_token(&self) -> String {
        match self {
            GitLabHead::Branch(b) => b.name().to_string(),
            GitLabHead::Tag(t) => t.name().to_string(),
            GitLabHead::MergeRequest(mr) => mr.iid().to_string(),
        }
    }
}

impl From<BranchHead> for GitLabHead {
    fn from(head: BranchHead) -> Self {
        GitLabHead::Branch(head)
    }
}

impl From<TagHead> for GitLabHead {
    fn from(head: TagHead) -> Self {
        GitLabHead::Tag(head)
    }
}

impl From<MergeRequestHead> for GitLabHead {
    fn from(head: MergeRequestHead) -> Self {
        GitLabHead::MergeRequest(head)
    }
}

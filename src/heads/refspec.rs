//! heads::refspec
//!
//! Ref categories and fetch-refspec templates.
//!
//! # Design
//!
//! GitLab exposes three categories of fetchable refs: branches, tags and
//! merge requests. Each category has a fixed remote ref prefix and a fetch
//! refspec template in which `*` stands for the head's identifying token
//! (branch name, tag name, or merge request iid).
//!
//! `RefSpec` is a process-wide constant set. It has no state and no failure
//! modes; every method is a pure lookup.
//!
//! # Example
//!
//! ```
//! use gitlab_branch_source::heads::RefSpec;
//!
//! assert_eq!(RefSpec::Branches.remote_prefix(), "refs/heads/");
//! assert_eq!(
//!     RefSpec::MergeRequests.fetch_refspec("7"),
//!     "+refs/merge-requests/7/head:refs/remotes/origin/merge-requests/7"
//! );
//! ```

use serde::{Deserialize, Serialize};

/// Substitution token in fetch-refspec templates.
const DELIMITER: char = '*';

/// The three ref categories GitLab exposes for fetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefSpec {
    /// Branch refs under `refs/heads/`.
    Branches,
    /// Tag refs under `refs/tags/`.
    Tags,
    /// Merge request head refs under `refs/merge-requests/`.
    MergeRequests,
}

impl RefSpec {
    /// Remote ref-name prefix for this category.
    pub const fn remote_prefix(&self) -> &'static str {
        match self {
            RefSpec::Branches => "refs/heads/",
            RefSpec::Tags => "refs/tags/",
            RefSpec::MergeRequests => "refs/merge-requests/",
        }
    }

    /// Fetch-refspec template, with `*` standing for the head's token.
    pub const fn template(&self) -> &'static str {
        match self {
            RefSpec::Branches => "+refs/heads/*:refs/remotes/origin/*",
            RefSpec::Tags => "+refs/tags/*:refs/remotes/origin/tags/*",
            RefSpec::MergeRequests => {
                "+refs/merge-requests/*/head:refs/remotes/origin/merge-requests/*"
            }
        }
    }

    /// The full remote ref name for a head's token.
    ///
    /// # Example
    ///
    /// ```
    /// use gitlab_branch_source::heads::RefSpec;
    ///
    /// assert_eq!(RefSpec::Branches.remote_ref("main"), "refs/heads/main");
    /// assert_eq!(RefSpec::MergeRequests.remote_ref("7"), "refs/merge-requests/7/head");
    /// ```
    pub fn remote_ref(&self, token: &str) -> String {
        match self {
            RefSpec::MergeRequests => format!("{}{}/head", self.remote_prefix(), token),
            _ => format!("{}{}", self.remote_prefix(), token),
        }
    }

    /// The exact refspec string passed to the fetch operation for one head.
    ///
    /// Substitutes the head's token into every `*` of the template.
    pub fn fetch_refspec(&self, token: &str) -> String {
        self.template().replace(DELIMITER, token)
    }
}

impl std::fmt::Display for RefSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefSpec::Branches => write!(f, "branches"),
            RefSpec::Tags => write!(f, "tags"),
            RefSpec::MergeRequests => write!(f, "merge_requests"),
        }
    }
}

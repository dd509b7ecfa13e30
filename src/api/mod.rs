//! api
//!
//! GitLab REST API collaborator.
//!
//! # Architecture
//!
//! Everything above this module consumes GitLab through the [`GitLabApi`]
//! trait — discovery, revision resolution and the publisher never import
//! the concrete client. [`GitLabClient`] is the production implementation;
//! [`mock::MockGitLab`] is the deterministic in-memory fake used by tests.
//!
//! # Modules
//!
//! - `traits`: the `GitLabApi` capability trait and `ApiError`
//! - `types`: GitLab v4 wire/domain types
//! - `client`: `reqwest`-based implementation
//! - [`mock`]: in-memory fake for tests

mod client;
pub mod mock;
mod traits;
pub mod types;

pub use client::GitLabClient;
pub use traits::{ApiError, GitLabApi};

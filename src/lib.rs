//! GitLab branch source - head discovery for multibranch CI indexing
//!
//! This crate maps GitLab's mutable, event-driven repository state
//! (branches, tags, merge requests, forks) onto an immutable head/revision
//! model: each discovery pass produces a fresh, self-consistent set of
//! heads, every head resolves to a concrete revision, and build results
//! flow back to merge requests as notes.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`heads`] - Immutable head model: branches, tags, merge requests,
//!   refspecs, revision resolution, checkout configuration
//! - [`discovery`] - Reconciliation engine producing the current head set
//! - [`api`] - GitLab REST collaborator behind a capability trait
//! - [`publish`] - Build-result notes on merge requests
//! - [`config`] - Connection configuration schema and loading
//!
//! # Correctness Invariants
//!
//! 1. Heads are immutable values; a discovery pass substitutes fresh heads
//!    rather than mutating prior ones
//! 2. Structurally invalid heads cannot be constructed; factories fail fast
//! 3. A merge request head always owns a source and a target, even across
//!    forked projects
//! 4. Failures are scoped: one category's fetch error never aborts a pass,
//!    and one pass never shares state with another

pub mod api;
pub mod config;
pub mod discovery;
pub mod heads;
pub mod publish;

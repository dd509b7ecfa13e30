//! publish
//!
//! Build-result notes on merge requests.
//!
//! # Design
//!
//! The publisher formats a note for a finished build and posts it on the
//! merge request the build came from. Note text interpolates the build
//! result, job display name, build number and absolute build URL; each
//! outcome has a default template and an optional configured override.
//!
//! Suppression options can skip the post entirely — a suppressed publish
//! performs zero network calls. Post failures surface to the caller; the
//! publisher does not retry.
//!
//! # Example
//!
//! ```
//! use gitlab_branch_source::api::mock::MockGitLab;
//! use gitlab_branch_source::publish::{
//!     BuildContext, BuildOutcome, MessagePublisher, PublishOptions, PublishOutcome,
//! };
//!
//! # tokio_test::block_on(async {
//! let api = MockGitLab::new();
//! let publisher = MessagePublisher::new(&api, PublishOptions::default());
//! let ctx = BuildContext {
//!     job_name: "app".to_string(),
//!     build_number: 4,
//!     build_url: "https://jenkins.example.com/job/app/4/".to_string(),
//!     previous_outcome: None,
//! };
//!
//! let outcome = publisher.publish(3, 1, BuildOutcome::Success, &ctx).await.unwrap();
//! assert_eq!(outcome, PublishOutcome::Published);
//! # });
//! ```

use thiserror::Error;

use crate::api::{ApiError, GitLabApi};

/// The outcome of a finished build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The build succeeded.
    Success,
    /// The build completed with test failures or similar degradation.
    Unstable,
    /// The build failed.
    Failure,
    /// The build was aborted.
    Aborted,
}

impl std::fmt::Display for BuildOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildOutcome::Success => write!(f, "SUCCESS"),
            BuildOutcome::Unstable => write!(f, "UNSTABLE"),
            BuildOutcome::Failure => write!(f, "FAILURE"),
            BuildOutcome::Aborted => write!(f, "ABORTED"),
        }
    }
}

impl BuildOutcome {
    /// Emoji prefix of the default note template.
    fn emoji(&self) -> &'static str {
        match self {
            BuildOutcome::Success => ":white_check_mark:",
            BuildOutcome::Unstable => ":warning:",
            BuildOutcome::Failure => ":negative_squared_cross_mark:",
            BuildOutcome::Aborted => ":point_up:",
        }
    }
}

/// Metadata of the finished build, supplied by the host.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Job display name.
    pub job_name: String,
    /// Build number.
    pub build_number: u64,
    /// Absolute build URL.
    pub build_url: String,
    /// Outcome of the immediately preceding build, if any.
    pub previous_outcome: Option<BuildOutcome>,
}

/// Publisher configuration.
#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    /// Post only when the build failed.
    pub only_for_failure: bool,
    /// Post only when the outcome differs from the preceding build's.
    pub only_if_outcome_changed: bool,
    /// Override for the success note.
    pub success_note: Option<String>,
    /// Override for the failure note (also used for unstable builds).
    pub failure_note: Option<String>,
    /// Override for the aborted note.
    pub aborted_note: Option<String>,
}

/// Errors from publishing.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The note could not be posted.
    #[error("failed to post note: {0}")]
    Post(#[from] ApiError),
}

/// Whether a publish posted a note or was suppressed by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The note was posted.
    Published,
    /// Configuration suppressed the note; no network call was made.
    Suppressed,
}

/// Posts build-result notes on merge requests.
pub struct MessagePublisher<'a> {
    api: &'a dyn GitLabApi,
    options: PublishOptions,
}

impl<'a> MessagePublisher<'a> {
    /// Create a publisher over an API collaborator.
    pub fn new(api: &'a dyn GitLabApi, options: PublishOptions) -> Self {
        Self { api, options }
    }

    /// The note text for an outcome, applying configured overrides.
    pub fn note_for(&self, outcome: BuildOutcome, ctx: &BuildContext) -> String {
        let custom = match outcome {
            BuildOutcome::Success => self.options.success_note.as_ref(),
            BuildOutcome::Unstable | BuildOutcome::Failure => self.options.failure_note.as_ref(),
            BuildOutcome::Aborted => self.options.aborted_note.as_ref(),
        };
        if let Some(note) = custom {
            return note.clone();
        }

        format!(
            "{} Jenkins Build {}\n\nResults available at: [Jenkins [{} #{}]]({})",
            outcome.emoji(),
            outcome,
            ctx.job_name,
            ctx.build_number,
            ctx.build_url,
        )
    }

    /// Whether configuration suppresses this publish.
    fn is_suppressed(&self, outcome: BuildOutcome, ctx: &BuildContext) -> bool {
        if self.options.only_for_failure && outcome != BuildOutcome::Failure {
            return true;
        }
        if self.options.only_if_outcome_changed && ctx.previous_outcome == Some(outcome) {
            return true;
        }
        false
    }

    /// Publish the build outcome on a merge request.
    ///
    /// # Errors
    ///
    /// Returns `PublishError::Post` when the note-posting call fails. The
    /// failure belongs to this publish step, not to the build.
    pub async fn publish(
        &self,
        project_id: u64,
        merge_request_iid: u64,
        outcome: BuildOutcome,
        ctx: &BuildContext,
    ) -> Result<PublishOutcome, PublishError> {
        if self.is_suppressed(outcome, ctx) {
            return Ok(PublishOutcome::Suppressed);
        }

        let note = self.note_for(outcome, ctx);
        self.api
            .post_merge_request_note(project_id, merge_request_iid, &note)
            .await?;
        Ok(PublishOutcome::Published)
    }
}

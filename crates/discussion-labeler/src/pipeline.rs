//! Labeling pipeline - orchestrates one fetch-classify-apply run.
//!
//! A run moves through three phases: the App identity and repository are
//! validated, the unlabeled discussions are fetched, and each discussion is
//! classified and labeled in fetch order. Failures inside the loop are
//! recorded as that discussion's [`DiscussionOutcome`] and the loop moves
//! on; only failures while validating or fetching end the run early.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use github_app::{
    CredentialProvider, Discussion, DiscussionGateway, GitHubAppError, LabelAssignment, RepoRef,
    RequestExecutor,
};
use tracing::{debug, error, info, warn};

use crate::classifier::{classify_or_empty, Classifier};
use crate::config::LabelerConfig;

/// Settings for the labeling pipeline.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Repository to label, `owner/name`.
    pub repo: String,
    /// Tag taxonomy file, re-read for every discussion.
    pub tags_file: PathBuf,
    /// Classify but never mutate.
    pub dry_run: bool,
}

/// Where a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    ValidatingConfig,
    Fetching,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ValidatingConfig => "validating-config",
            Self::Fetching => "fetching",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// Every fetched discussion was visited.
    Completed,
    /// The repository has no unlabeled discussions.
    NothingToDo,
    Aborted { phase: RunPhase, reason: String },
}

/// Labels requested for one discussion and whether they were applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelAssignmentResult {
    pub discussion_number: u64,
    pub requested: Vec<String>,
    pub success: bool,
}

/// What happened to one discussion during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscussionOutcome {
    /// The mutation was accepted.
    Labeled {
        result: LabelAssignmentResult,
        assignment: LabelAssignment,
    },
    /// GitHub answered, but no label was attached.
    NotApplied {
        result: LabelAssignmentResult,
        assignment: LabelAssignment,
    },
    /// Dry run: the labels that would have been requested.
    WouldLabel { result: LabelAssignmentResult },
    /// The classifier had nothing to offer.
    NoSuggestions { discussion_number: u64 },
    /// The discussion has no usable number.
    Malformed { id: String },
    /// Applying labels failed with an error.
    Failed {
        result: LabelAssignmentResult,
        error: String,
    },
}

impl DiscussionOutcome {
    /// The assignment record, for outcomes where labels were requested.
    #[must_use]
    pub fn assignment_result(&self) -> Option<&LabelAssignmentResult> {
        match self {
            Self::Labeled { result, .. }
            | Self::NotApplied { result, .. }
            | Self::WouldLabel { result }
            | Self::Failed { result, .. } => Some(result),
            Self::NoSuggestions { .. } | Self::Malformed { .. } => None,
        }
    }
}

/// Result of a single run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub repo: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: RunStatus,
    /// One entry per discussion visited, in fetch order.
    pub outcomes: Vec<DiscussionOutcome>,
}

impl RunSummary {
    fn count(&self, pred: impl Fn(&DiscussionOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }

    #[must_use]
    pub fn labeled(&self) -> usize {
        self.count(|o| matches!(o, DiscussionOutcome::Labeled { .. }))
    }

    #[must_use]
    pub fn not_applied(&self) -> usize {
        self.count(|o| matches!(o, DiscussionOutcome::NotApplied { .. }))
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                DiscussionOutcome::NoSuggestions { .. } | DiscussionOutcome::Malformed { .. }
            )
        })
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, DiscussionOutcome::Failed { .. }))
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self.status, RunStatus::Aborted { .. })
    }

    /// Assignment records of every discussion that had labels requested.
    pub fn assignments(&self) -> impl Iterator<Item = &LabelAssignmentResult> {
        self.outcomes
            .iter()
            .filter_map(DiscussionOutcome::assignment_result)
    }
}

/// Labeling pipeline orchestrator.
pub struct LabelingPipeline {
    gateway: DiscussionGateway,
    classifier: Arc<dyn Classifier>,
    options: PipelineOptions,
}

impl LabelingPipeline {
    /// Create a new pipeline.
    #[must_use]
    pub fn new(
        gateway: DiscussionGateway,
        classifier: Arc<dyn Classifier>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            gateway,
            classifier,
            options,
        }
    }

    /// Wire the executor, credential provider and gateway from `config`.
    pub fn from_config(
        config: &LabelerConfig,
        classifier: Arc<dyn Classifier>,
        dry_run: bool,
    ) -> Result<Self, GitHubAppError> {
        let executor = RequestExecutor::new(config.request_timeout, config.retry)?;
        let credentials =
            CredentialProvider::new(config.identity.clone(), executor.clone(), config.api_url.clone());
        let gateway = DiscussionGateway::new(executor, credentials, &config.api_url);

        Ok(Self::new(
            gateway,
            classifier,
            PipelineOptions {
                repo: config.repo.clone(),
                tags_file: config.tags_file.clone(),
                dry_run,
            },
        ))
    }

    #[must_use]
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run once. Never fails: problems are reported in the summary so the
    /// scheduler can simply try again on the next tick.
    pub async fn run(&self) -> RunSummary {
        let started_at = Utc::now();
        info!(repo = %self.options.repo, dry_run = self.options.dry_run, "Processing discussions");

        let mut outcomes = Vec::new();
        let status = self.run_phases(&mut outcomes).await;

        let summary = RunSummary {
            repo: self.options.repo.clone(),
            started_at,
            finished_at: Utc::now(),
            status,
            outcomes,
        };
        log_summary(&summary);
        summary
    }

    async fn run_phases(&self, outcomes: &mut Vec<DiscussionOutcome>) -> RunStatus {
        let repo = match self.validate() {
            Ok(repo) => repo,
            Err(e) => return abort(RunPhase::ValidatingConfig, &e),
        };

        let discussions = match self.gateway.fetch_unlabeled_discussions(&repo).await {
            Ok(discussions) => discussions,
            Err(e) => return abort(RunPhase::Fetching, &e),
        };
        info!(count = discussions.len(), "Found unlabeled discussions");

        if discussions.is_empty() {
            return RunStatus::NothingToDo;
        }

        for discussion in &discussions {
            outcomes.push(self.process_discussion(&repo, discussion).await);
        }

        RunStatus::Completed
    }

    fn validate(&self) -> Result<RepoRef, GitHubAppError> {
        self.gateway.credentials().identity().validate()?;
        RepoRef::parse(&self.options.repo)
    }

    /// Classify and label one discussion. Every failure is recorded in the
    /// returned outcome.
    async fn process_discussion(
        &self,
        repo: &RepoRef,
        discussion: &Discussion,
    ) -> DiscussionOutcome {
        let Some(number) = discussion.usable_number() else {
            warn!(id = %discussion.id, "Skipping discussion without a number");
            return DiscussionOutcome::Malformed {
                id: discussion.id.clone(),
            };
        };

        debug!(discussion = number, title = %discussion.title, "Classifying discussion");
        let labels = classify_or_empty(
            self.classifier.as_ref(),
            &self.options.tags_file,
            &discussion.title,
            &discussion.body,
        )
        .await;

        if labels.is_empty() {
            info!(discussion = number, "No labels for discussion, skipping");
            return DiscussionOutcome::NoSuggestions {
                discussion_number: number,
            };
        }

        let mut result = LabelAssignmentResult {
            discussion_number: number,
            requested: labels,
            success: false,
        };

        if self.options.dry_run {
            info!(discussion = number, labels = ?result.requested, "Dry run: would apply labels");
            return DiscussionOutcome::WouldLabel { result };
        }

        let assignment = match self
            .gateway
            .assign_labels(repo, number, &result.requested)
            .await
        {
            Ok(assignment) => assignment,
            Err(e) => {
                error!(discussion = number, error = %e, "Failed to label discussion");
                return DiscussionOutcome::Failed {
                    result,
                    error: e.to_string(),
                };
            }
        };

        result.success = assignment.is_applied();
        info!(
            discussion = number,
            labels = ?result.requested,
            success = result.success,
            "Label assignment finished"
        );

        if result.success {
            DiscussionOutcome::Labeled { result, assignment }
        } else {
            DiscussionOutcome::NotApplied { result, assignment }
        }
    }
}

fn abort(phase: RunPhase, e: &GitHubAppError) -> RunStatus {
    error!(phase = %phase, error = %e, "Run aborted");
    RunStatus::Aborted {
        phase,
        reason: e.to_string(),
    }
}

fn log_summary(summary: &RunSummary) {
    let elapsed_ms = (summary.finished_at - summary.started_at).num_milliseconds();
    match &summary.status {
        RunStatus::Aborted { phase, reason } => warn!(
            repo = %summary.repo,
            phase = %phase,
            reason = %reason,
            labeled = summary.labeled(),
            elapsed_ms,
            "Run aborted"
        ),
        RunStatus::NothingToDo => info!(repo = %summary.repo, elapsed_ms, "No unlabeled discussions"),
        RunStatus::Completed => info!(
            repo = %summary.repo,
            visited = summary.outcomes.len(),
            labeled = summary.labeled(),
            not_applied = summary.not_applied(),
            skipped = summary.skipped(),
            failed = summary.failed(),
            elapsed_ms,
            "Run complete"
        ),
    }
}

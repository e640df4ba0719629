//! Scheduled labeling of GitHub discussions.
//!
//! This crate provides:
//! - [`LabelerConfig`]: immutable settings read from flags and environment
//! - [`classifier`]: tag taxonomy, prompts, the chat-completion classifier
//!   and its output decoder
//! - [`LabelingPipeline`]: one fetch-classify-apply run with per-discussion
//!   failure isolation
//! - [`scheduler`]: fixed-interval re-invocation

pub mod classifier;
pub mod config;
pub mod pipeline;
pub mod scheduler;

pub use classifier::{
    classify_or_empty, ChatCompletionClassifier, Classification, ClassificationError, Classifier,
    DecodeSource, LabelTaxonomy,
};
pub use config::{ConfigArgs, LabelerConfig};
pub use pipeline::{
    DiscussionOutcome, LabelAssignmentResult, LabelingPipeline, PipelineOptions, RunPhase,
    RunStatus, RunSummary,
};

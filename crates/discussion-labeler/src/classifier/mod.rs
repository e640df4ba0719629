//! Tag suggestions for discussions.
//!
//! A [`Classifier`] turns a discussion's title and body into candidate label
//! names drawn from a [`LabelTaxonomy`]. The pipeline only ever talks to it
//! through [`classify_or_empty`], which folds every failure into "no
//! suggestions" so a bad answer never costs more than one discussion.

mod azure;
mod decode;
mod prompts;
mod taxonomy;

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use azure::{
    AzureOpenAiSettings, ChatCompletionClassifier, DEFAULT_API_VERSION, DEFAULT_DEPLOYMENT,
};
pub use decode::{decode_tags, recover_tags, DecodeSource};
pub use prompts::PromptManager;
pub use taxonomy::{LabelDefinition, LabelTaxonomy};

/// Why a classification produced no usable tags.
#[derive(Debug, Error)]
pub enum ClassificationError {
    /// The taxonomy file is missing, unreadable or has no tags
    #[error("Invalid tag taxonomy: {0}")]
    Taxonomy(String),

    #[error("Prompt rendering failed: {0}")]
    Prompt(String),

    /// The model endpoint failed or is not configured
    #[error("Classifier provider error: {0}")]
    Provider(String),

    #[error("Classifier returned an empty or null response")]
    EmptyOutput,

    #[error("Could not parse classifier output: {0}")]
    Unparsable(String),
}

/// Tags proposed for one discussion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub tags: Vec<String>,
    pub source: DecodeSource,
}

/// Proposes label names for a discussion.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        title: &str,
        body: &str,
        taxonomy: &LabelTaxonomy,
    ) -> Result<Classification, ClassificationError>;
}

/// Load the taxonomy at `taxonomy_path` and classify, logging and
/// swallowing any failure.
///
/// The taxonomy is re-read on every call so edits to the file apply from
/// the next discussion on.
pub async fn classify_or_empty(
    classifier: &dyn Classifier,
    taxonomy_path: &Path,
    title: &str,
    body: &str,
) -> Vec<String> {
    let taxonomy = match LabelTaxonomy::load(taxonomy_path) {
        Ok(taxonomy) => taxonomy,
        Err(e) => {
            warn!(path = %taxonomy_path.display(), error = %e, "Could not load tag taxonomy");
            return Vec::new();
        }
    };
    debug!(path = %taxonomy_path.display(), tags = taxonomy.len(), "Loaded tag taxonomy");

    match classifier.classify(title, body, &taxonomy).await {
        Ok(Classification {
            tags,
            source: DecodeSource::Recovered,
        }) => {
            info!(tags = ?tags, "Recovered tags from malformed classifier output");
            tags
        }
        Ok(Classification { tags, .. }) => {
            debug!(tags = ?tags, "Classifier suggested tags");
            tags
        }
        Err(e) => {
            warn!(error = %e, "Classification failed");
            Vec::new()
        }
    }
}

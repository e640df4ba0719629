//! The tag taxonomy offered to the classifier.
//!
//! Loaded from a JSON document of the form
//!
//! ```json
//! { "tags": [ { "name": "bug", "description": "Something is broken" }, "docs" ] }
//! ```
//!
//! where each entry is either a described object or a bare name.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ClassificationError;

/// One candidate label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelDefinition {
    pub name: String,
    pub description: Option<String>,
    /// Optional identifier carried by the taxonomy file; not the GitHub node id.
    pub id: Option<String>,
}

impl LabelDefinition {
    /// `name: description`, or just the name for bare entries.
    #[must_use]
    pub fn prompt_line(&self) -> String {
        match self.description.as_deref() {
            Some(description) if !description.is_empty() => {
                format!("{}: {description}", self.name)
            }
            _ => self.name.clone(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Bare(String),
    Described {
        name: String,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        id: Option<serde_json::Value>,
    },
}

impl From<RawEntry> for LabelDefinition {
    fn from(entry: RawEntry) -> Self {
        match entry {
            RawEntry::Bare(name) => Self {
                name,
                description: None,
                id: None,
            },
            RawEntry::Described {
                name,
                description,
                id,
            } => Self {
                name,
                description,
                id: id.map(|v| match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                }),
            },
        }
    }
}

#[derive(Deserialize)]
struct RawTaxonomy {
    tags: Option<Vec<RawEntry>>,
}

/// Ordered, read-only set of candidate labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelTaxonomy {
    labels: Vec<LabelDefinition>,
}

impl LabelTaxonomy {
    pub fn load(path: &Path) -> Result<Self, ClassificationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClassificationError::Taxonomy(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ClassificationError> {
        let raw: RawTaxonomy = serde_json::from_str(content)
            .map_err(|e| ClassificationError::Taxonomy(format!("invalid tags document: {e}")))?;

        let labels: Vec<LabelDefinition> = raw
            .tags
            .ok_or_else(|| ClassificationError::Taxonomy("missing \"tags\" list".to_string()))?
            .into_iter()
            .map(LabelDefinition::from)
            .collect();

        if labels.is_empty() {
            return Err(ClassificationError::Taxonomy("no tags defined".to_string()));
        }
        Ok(Self { labels })
    }

    #[must_use]
    pub fn labels(&self) -> &[LabelDefinition] {
        &self.labels
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.labels.iter().map(|l| l.name.as_str()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// One `name: description` line per label, in file order.
    #[must_use]
    pub fn prompt_lines(&self) -> String {
        self.labels
            .iter()
            .map(LabelDefinition::prompt_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

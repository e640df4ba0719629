//! Discussion domain types and the GraphQL response schemas they are
//! decoded from.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GitHubAppError;

/// `owner/name` of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    /// Parse `owner/name`. Exactly two non-empty segments are accepted.
    pub fn parse(value: &str) -> Result<Self, GitHubAppError> {
        let invalid = || {
            GitHubAppError::Configuration(format!(
                "Invalid repository URL format: {value}. Expected format: owner/name"
            ))
        };

        let mut parts = value.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => Ok(Self {
                owner: owner.to_string(),
                name: name.to_string(),
            }),
            _ => Err(invalid()),
        }
    }
}

impl FromStr for RepoRef {
    type Err = GitHubAppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Snapshot of a discussion taken during one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discussion {
    pub id: String,
    /// Public number. `None` when the API omitted it.
    pub number: Option<u64>,
    pub title: String,
    pub body: String,
    pub category: Option<String>,
    /// Names of the labels currently applied, in API order.
    pub labels: Vec<String>,
}

impl Discussion {
    #[must_use]
    pub fn is_unlabeled(&self) -> bool {
        self.labels.is_empty()
    }

    /// The public number, if it is usable for lookups (present and non-zero).
    #[must_use]
    pub fn usable_number(&self) -> Option<u64> {
        self.number.filter(|n| *n > 0)
    }
}

/// A label defined on the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryLabel {
    pub id: String,
    pub name: String,
}

// =============================================================================
// Wire schemas
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQLResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQLError>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GraphQLError {
    pub message: String,
}

/// `{ "repository": ... }`, nullable when the repository is not visible.
#[derive(Debug, Deserialize)]
pub(crate) struct RepositoryData<T> {
    pub repository: Option<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Connection<T> {
    pub nodes: Option<Vec<Option<T>>>,
}

impl<T> Connection<T> {
    /// Non-null nodes, in order.
    pub fn into_nodes(self) -> Vec<T> {
        self.nodes.unwrap_or_default().into_iter().flatten().collect()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DiscussionsRepository {
    pub discussions: Option<Connection<DiscussionNode>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DiscussionNode {
    pub id: String,
    pub number: Option<u64>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub category: Option<CategoryNode>,
    pub labels: Option<Connection<LabelNameNode>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CategoryNode {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LabelNameNode {
    pub name: String,
}

impl From<DiscussionNode> for Discussion {
    fn from(node: DiscussionNode) -> Self {
        Self {
            id: node.id,
            number: node.number,
            title: node.title.unwrap_or_default(),
            body: node.body.unwrap_or_default(),
            category: node.category.map(|c| c.name),
            labels: node
                .labels
                .map(Connection::into_nodes)
                .unwrap_or_default()
                .into_iter()
                .map(|l| l.name)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DiscussionIdRepository {
    pub discussion: Option<IdNode>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IdNode {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LabelsRepository {
    pub labels: Option<Connection<RepositoryLabel>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AddLabelsData {
    pub add_labels_to_labelable: Option<AddLabelsPayload>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddLabelsPayload {
    pub labelable: Option<LabelableNode>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LabelableNode {
    pub labels: Option<Connection<LabelNameNode>>,
}

//! # Discussion repository gateway
//!
//! Typed access to the four GraphQL operations the labeler needs. Every
//! public operation obtains a fresh installation credential when it starts
//! and reuses it for the requests it makes; nothing is carried over between
//! operations.
//!
//! Responses are decoded into explicit schemas. A missing `data` object,
//! a null repository or a missing connection is reported as
//! [`GitHubAppError::Gateway`] instead of being read as "empty".

use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

use crate::auth::CredentialProvider;
use crate::error::{GitHubAppError, Result, TransportError};
use crate::executor::RequestExecutor;
use crate::models::{
    AddLabelsData, Connection, Discussion, DiscussionIdRepository, DiscussionsRepository,
    GraphQLResponse, LabelsRepository, RepoRef, RepositoryData,
};
use crate::queries::{
    ADD_LABELS_MUTATION, DISCUSSION_ID_QUERY, RECENT_DISCUSSIONS_QUERY, REPOSITORY_LABELS_QUERY,
};

/// Which requested label names exist in the repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelResolution {
    /// Node ids of the labels that exist, in repository order.
    pub ids: Vec<String>,
    /// Names matching `ids`.
    pub found: Vec<String>,
    /// Requested names the repository does not define.
    pub missing: Vec<String>,
}

/// Outcome of a label assignment that reached a verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelAssignment {
    /// No label names were requested; nothing was sent.
    NothingRequested,
    /// None of the requested names exist in the repository.
    NoMatchingLabels { missing: Vec<String> },
    /// The mutation came back with GraphQL errors.
    Rejected { errors: Vec<String> },
    /// The mutation succeeded. `missing` lists requested names that were
    /// skipped because the repository lacks them; `confirmed` is the label
    /// set GitHub echoed back, when it did.
    Applied {
        applied: Vec<String>,
        missing: Vec<String>,
        confirmed: Option<Vec<String>>,
    },
}

impl LabelAssignment {
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// GraphQL gateway for repository discussions.
#[derive(Debug, Clone)]
pub struct DiscussionGateway {
    executor: RequestExecutor,
    credentials: CredentialProvider,
    graphql_url: String,
}

impl DiscussionGateway {
    /// `api_url` is the API root, e.g. `https://api.github.com`.
    #[must_use]
    pub fn new(
        executor: RequestExecutor,
        credentials: CredentialProvider,
        api_url: &str,
    ) -> Self {
        Self {
            executor,
            credentials,
            graphql_url: format!("{}/graphql", api_url.trim_end_matches('/')),
        }
    }

    #[must_use]
    pub fn credentials(&self) -> &CredentialProvider {
        &self.credentials
    }

    /// The ten most recently created discussions, newest first.
    #[instrument(skip(self), fields(repo = %repo))]
    pub async fn fetch_recent_discussions(&self, repo: &RepoRef) -> Result<Vec<Discussion>> {
        let headers = self.credentials.auth_headers().await?;
        let variables = json!({ "owner": repo.owner, "name": repo.name });

        let response: GraphQLResponse<RepositoryData<DiscussionsRepository>> = self
            .graphql(&headers, RECENT_DISCUSSIONS_QUERY, &variables)
            .await?;
        let repository = require_repository(response, repo)?;

        let discussions: Vec<Discussion> = repository
            .discussions
            .ok_or_else(|| {
                GitHubAppError::Gateway(format!("{repo}: response has no discussions connection"))
            })?
            .into_nodes()
            .into_iter()
            .map(Discussion::from)
            .collect();

        if discussions.is_empty() {
            info!("No discussions found in the repository");
        } else {
            debug!(count = discussions.len(), "Fetched discussions");
        }
        Ok(discussions)
    }

    /// Recent discussions that carry no labels, in fetch order.
    pub async fn fetch_unlabeled_discussions(&self, repo: &RepoRef) -> Result<Vec<Discussion>> {
        let unlabeled: Vec<Discussion> = self
            .fetch_recent_discussions(repo)
            .await?
            .into_iter()
            .filter(Discussion::is_unlabeled)
            .collect();

        debug!(repo = %repo, count = unlabeled.len(), "Filtered unlabeled discussions");
        Ok(unlabeled)
    }

    /// Node id of discussion `number`.
    #[instrument(skip(self), fields(repo = %repo))]
    pub async fn fetch_discussion_id(&self, repo: &RepoRef, number: u64) -> Result<String> {
        let headers = self.credentials.auth_headers().await?;
        self.discussion_id_with(&headers, repo, number).await
    }

    /// Node ids of the requested labels that exist in the repository.
    #[instrument(skip(self), fields(repo = %repo))]
    pub async fn fetch_label_ids(&self, repo: &RepoRef, names: &[String]) -> Result<Vec<String>> {
        Ok(self.resolve_labels(repo, names).await?.ids)
    }

    /// Split the requested names into found (with ids) and missing.
    pub async fn resolve_labels(&self, repo: &RepoRef, names: &[String]) -> Result<LabelResolution> {
        let headers = self.credentials.auth_headers().await?;
        self.resolve_labels_with(&headers, repo, names).await
    }

    /// Attach `names` to discussion `number`.
    ///
    /// Labels are never created: names missing from the repository are
    /// logged and skipped.
    #[instrument(skip(self), fields(repo = %repo, discussion = number))]
    pub async fn assign_labels(
        &self,
        repo: &RepoRef,
        number: u64,
        names: &[String],
    ) -> Result<LabelAssignment> {
        if names.is_empty() {
            info!("No labels requested, skipping");
            return Ok(LabelAssignment::NothingRequested);
        }

        let headers = self.credentials.auth_headers().await?;

        let discussion_id = self.discussion_id_with(&headers, repo, number).await?;
        debug!(discussion_id = %discussion_id, "Resolved discussion id");

        let resolution = self.resolve_labels_with(&headers, repo, names).await?;
        if resolution.ids.is_empty() {
            error!(requested = ?names, "No matching label ids found");
            return Ok(LabelAssignment::NoMatchingLabels {
                missing: resolution.missing,
            });
        }

        let variables = json!({
            "labelableId": discussion_id,
            "labelIds": resolution.ids,
        });
        let response: GraphQLResponse<AddLabelsData> = self
            .graphql(&headers, ADD_LABELS_MUTATION, &variables)
            .await?;

        if let Some(errors) = response.errors.filter(|e| !e.is_empty()) {
            let errors: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            error!(errors = ?errors, "GraphQL error adding labels");
            return Ok(LabelAssignment::Rejected { errors });
        }

        let confirmed = response
            .data
            .and_then(|d| d.add_labels_to_labelable)
            .and_then(|p| p.labelable)
            .and_then(|l| l.labels)
            .map(|labels| {
                labels
                    .into_nodes()
                    .into_iter()
                    .map(|l| l.name)
                    .collect::<Vec<_>>()
            });

        if let Some(labels) = confirmed.as_ref().filter(|l| !l.is_empty()) {
            info!(labels = ?labels, "Confirmed labels on discussion");
        }
        info!(applied = ?resolution.found, "Labeled discussion");

        Ok(LabelAssignment::Applied {
            applied: resolution.found,
            missing: resolution.missing,
            confirmed,
        })
    }

    /// `true` only when the mutation was accepted.
    pub async fn apply_labels(&self, repo: &RepoRef, number: u64, names: &[String]) -> Result<bool> {
        Ok(self.assign_labels(repo, number, names).await?.is_applied())
    }

    async fn discussion_id_with(
        &self,
        headers: &HeaderMap,
        repo: &RepoRef,
        number: u64,
    ) -> Result<String> {
        let variables = json!({ "owner": repo.owner, "repo": repo.name, "number": number });
        let response: GraphQLResponse<RepositoryData<DiscussionIdRepository>> = self
            .graphql(headers, DISCUSSION_ID_QUERY, &variables)
            .await?;

        require_repository(response, repo)?
            .discussion
            .and_then(|d| d.id)
            .ok_or_else(|| GitHubAppError::Gateway(format!("{repo}: discussion #{number} not found")))
    }

    async fn resolve_labels_with(
        &self,
        headers: &HeaderMap,
        repo: &RepoRef,
        names: &[String],
    ) -> Result<LabelResolution> {
        let variables = json!({ "owner": repo.owner, "repo": repo.name });
        let response: GraphQLResponse<RepositoryData<LabelsRepository>> = self
            .graphql(headers, REPOSITORY_LABELS_QUERY, &variables)
            .await?;

        let available = require_repository(response, repo)?
            .labels
            .map(Connection::into_nodes)
            .ok_or_else(|| GitHubAppError::Gateway(format!("{repo}: response has no labels")))?;

        debug!(
            count = available.len(),
            labels = ?available.iter().map(|l| l.name.as_str()).collect::<Vec<_>>(),
            "Fetched repository labels"
        );

        let mut requested: Vec<&str> = Vec::with_capacity(names.len());
        for name in names {
            if !requested.contains(&name.as_str()) {
                requested.push(name.as_str());
            }
        }

        let mut resolution = LabelResolution::default();
        for label in available {
            if requested.contains(&label.name.as_str()) {
                resolution.ids.push(label.id);
                resolution.found.push(label.name);
            }
        }
        resolution.missing = requested
            .into_iter()
            .filter(|name| !resolution.found.iter().any(|f| f.as_str() == *name))
            .map(str::to_string)
            .collect();

        if !resolution.found.is_empty() {
            info!(labels = ?resolution.found, "Found label ids");
        }
        if !resolution.missing.is_empty() {
            warn!(
                labels = ?resolution.missing,
                "Labels not defined in repository; create them manually to have them applied"
            );
        }

        Ok(resolution)
    }

    async fn graphql<T: DeserializeOwned>(
        &self,
        headers: &HeaderMap,
        query: &'static str,
        variables: &serde_json::Value,
    ) -> Result<GraphQLResponse<T>> {
        let payload = json!({ "query": query, "variables": variables });
        let response = self
            .executor
            .execute(Method::POST, &self.graphql_url, headers, Some(&payload))
            .await?;

        let text = response.text().await.map_err(TransportError::from)?;
        serde_json::from_str(&text)
            .map_err(|e| GitHubAppError::Gateway(format!("malformed GraphQL response: {e}")))
    }
}

/// Unwrap `data.repository`, turning absences into gateway errors.
fn require_repository<T>(
    response: GraphQLResponse<RepositoryData<T>>,
    repo: &RepoRef,
) -> Result<T> {
    let GraphQLResponse { data, errors } = response;
    let Some(data) = data else {
        let detail = errors
            .map(|errors| {
                errors
                    .into_iter()
                    .map(|e| e.message)
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_else(|| "response has no data".to_string());
        return Err(GitHubAppError::Gateway(format!("{repo}: {detail}")));
    };

    data.repository.ok_or_else(|| {
        GitHubAppError::Gateway(format!("{repo}: repository not found or not accessible"))
    })
}

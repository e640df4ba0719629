//! GitHub App access for the discussion labeler.
//!
//! This crate provides:
//! - [`CredentialProvider`]: RS256 App assertion signing and installation
//!   token exchange
//! - [`RequestExecutor`]: the single HTTP egress point, with rate-limit
//!   aware retry and exponential backoff
//! - [`DiscussionGateway`]: discussion, label and label-assignment GraphQL
//!   operations

pub mod auth;
pub mod discussions;
pub mod error;
pub mod executor;
pub mod models;
pub mod queries;

pub use auth::{AppClaims, AppIdentity, CredentialProvider, InstallationCredential};
pub use discussions::{DiscussionGateway, LabelAssignment, LabelResolution};
pub use error::{GitHubAppError, Result, TransportError};
pub use executor::{RequestExecutor, RetryPolicy};
pub use models::{Discussion, RepoRef, RepositoryLabel};

/// Public GitHub API root.
pub const GITHUB_API_URL: &str = "https://api.github.com";

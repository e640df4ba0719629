//! Error types for GitHub App access.

use reqwest::Method;
use thiserror::Error;

/// Failures of a single HTTP exchange, after the retry budget is spent.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failure, timeout, or body decode failure
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-2xx response that was not a rate limit
    #[error("GitHub API error: {status} - {body}")]
    Status { status: u16, body: String },

    /// Every attempt was answered with a rate-limit 403
    #[error("Rate limit still exceeded after {attempts} attempts")]
    RateLimited { attempts: u32 },

    /// No attempt was made, or none produced an error to report
    #[error("All retry attempts failed")]
    Exhausted,
}

impl TransportError {
    /// Whether the underlying request hit the configured timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Request(e) if e.is_timeout())
    }
}

/// Errors surfaced by the credential provider, executor and gateway.
#[derive(Debug, Error)]
pub enum GitHubAppError {
    /// Missing or malformed App identity or repository reference
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The private key could not be loaded or could not sign
    #[error("Failed to sign app assertion: {0}")]
    Signing(String),

    /// The installation-token endpoint did not hand back a usable token
    #[error("Failed to obtain installation token: {0}")]
    CredentialExchange(String),

    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(Method),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The API answered, but not with the shape we asked for
    #[error("Unexpected GitHub response: {0}")]
    Gateway(String),
}

pub type Result<T, E = GitHubAppError> = std::result::Result<T, E>;

//! # GitHub App credential provider
//!
//! Turns the App's long-lived identity (app id, RSA private key,
//! installation id) into a short-lived installation token:
//!
//! 1. sign a fresh RS256 assertion valid for ten minutes,
//! 2. exchange it at `/app/installations/{id}/access_tokens`,
//! 3. hand the token back as request headers.
//!
//! Nothing here is cached. Each call signs a new assertion and fetches a new
//! token, so a run never depends on state left behind by a previous one.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::error::{GitHubAppError, Result};
use crate::executor::RequestExecutor;

/// Lifetime of a signed assertion, in seconds.
pub const ASSERTION_TTL_SECS: i64 = 10 * 60;

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

/// Identity material of a GitHub App installation.
///
/// Every field is optional at load time; completeness is checked when a
/// credential is requested.
#[derive(Clone, Default)]
pub struct AppIdentity {
    pub app_id: Option<String>,
    /// Inline PEM. Takes precedence over `private_key_path`.
    pub private_key: Option<String>,
    pub private_key_path: Option<PathBuf>,
    pub installation_id: Option<String>,
}

impl fmt::Debug for AppIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppIdentity")
            .field("app_id", &self.app_id)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("private_key_path", &self.private_key_path)
            .field("installation_id", &self.installation_id)
            .finish()
    }
}

fn present(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

impl AppIdentity {
    /// Check that an app id, a private key source and an installation id
    /// are all present.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if present(self.app_id.as_ref()).is_none() {
            missing.push("APP_ID");
        }
        if present(self.private_key.as_ref()).is_none()
            && self
                .private_key_path
                .as_ref()
                .map_or(true, |p| p.as_os_str().is_empty())
        {
            missing.push("APP_PRIVATE_KEY or APP_PRIVATE_KEY_PATH");
        }
        if present(self.installation_id.as_ref()).is_none() {
            missing.push("APP_INSTALLATION_ID");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(GitHubAppError::Configuration(format!(
                "GitHub App configuration missing: {}",
                missing.join(", ")
            )))
        }
    }

    fn app_id(&self) -> Result<&str> {
        present(self.app_id.as_ref())
            .ok_or_else(|| GitHubAppError::Configuration("APP_ID is not set".to_string()))
    }

    fn installation_id(&self) -> Result<&str> {
        present(self.installation_id.as_ref()).ok_or_else(|| {
            GitHubAppError::Configuration("APP_INSTALLATION_ID is not set".to_string())
        })
    }

    /// Inline key first, then the key file. The first non-empty source wins.
    pub fn resolve_private_key(&self) -> Result<String> {
        if let Some(key) = present(self.private_key.as_ref()) {
            debug!("Using inline private key");
            return Ok(key.to_string());
        }

        let path = self.private_key_path.as_ref().ok_or_else(|| {
            GitHubAppError::Configuration(
                "No private key available. Set APP_PRIVATE_KEY or APP_PRIVATE_KEY_PATH"
                    .to_string(),
            )
        })?;

        let key = std::fs::read_to_string(path).map_err(|e| {
            error!(path = %path.display(), error = %e, "Failed to read private key file");
            GitHubAppError::Signing(format!(
                "cannot read private key file {}: {e}",
                path.display()
            ))
        })?;
        debug!(path = %path.display(), "Loaded private key from file");
        Ok(key)
    }
}

/// Claims of the App assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppClaims {
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

impl AppClaims {
    /// Claims issued at `issued_at` (unix seconds), expiring ten minutes later.
    #[must_use]
    pub fn new(app_id: &str, issued_at: i64) -> Self {
        Self {
            iat: issued_at,
            exp: issued_at + ASSERTION_TTL_SECS,
            iss: app_id.to_string(),
        }
    }
}

/// Sign `claims` with RS256.
pub fn sign_assertion(claims: &AppClaims, private_key_pem: &str) -> Result<String> {
    let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
        .map_err(|e| GitHubAppError::Signing(format!("invalid RSA private key: {e}")))?;

    encode(&Header::new(Algorithm::RS256), claims, &key)
        .map_err(|e| GitHubAppError::Signing(e.to_string()))
}

/// Installation access token. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct InstallationCredential {
    token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for InstallationCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallationCredential")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl InstallationCredential {
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Headers for REST and GraphQL calls made with this credential.
    pub fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("token {}", self.token)).map_err(|_| {
            GitHubAppError::CredentialExchange(
                "installation token contains invalid header characters".to_string(),
            )
        })?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

/// Issues installation credentials for one App identity.
#[derive(Debug, Clone)]
pub struct CredentialProvider {
    identity: AppIdentity,
    executor: RequestExecutor,
    api_url: String,
}

impl CredentialProvider {
    #[must_use]
    pub fn new(identity: AppIdentity, executor: RequestExecutor, api_url: impl Into<String>) -> Self {
        Self {
            identity,
            executor,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn identity(&self) -> &AppIdentity {
        &self.identity
    }

    /// Sign a fresh assertion issued now.
    pub fn create_assertion(&self) -> Result<String> {
        self.identity.validate()?;
        let claims = AppClaims::new(self.identity.app_id()?, Utc::now().timestamp());
        let key = self.identity.resolve_private_key()?;
        sign_assertion(&claims, &key)
    }

    /// Exchange a freshly signed assertion for an installation token.
    ///
    /// Configuration is checked before anything touches the network.
    #[instrument(skip(self))]
    pub async fn issue_installation_credential(&self) -> Result<InstallationCredential> {
        self.identity.validate()?;
        let assertion = self.create_assertion()?;

        let url = format!(
            "{}/app/installations/{}/access_tokens",
            self.api_url,
            self.identity.installation_id()?
        );

        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {assertion}"))
            .map_err(|e| GitHubAppError::Signing(format!("assertion is not a valid header: {e}")))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));

        let response = self
            .executor
            .execute(Method::POST, &url, &headers, None)
            .await
            .map_err(|e| GitHubAppError::CredentialExchange(e.to_string()))?;

        let body: AccessTokenResponse = response.json().await.map_err(|e| {
            GitHubAppError::CredentialExchange(format!("unreadable token response: {e}"))
        })?;

        let token = body
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                error!("No token in installation token response");
                GitHubAppError::CredentialExchange("no token in response".to_string())
            })?;

        debug!(expires_at = ?body.expires_at, "Issued installation credential");
        Ok(InstallationCredential {
            token,
            expires_at: body.expires_at,
        })
    }

    /// Fresh credential, rendered as request headers.
    pub async fn auth_headers(&self) -> Result<HeaderMap> {
        self.issue_installation_credential().await?.headers()
    }
}

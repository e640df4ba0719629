//! Process configuration.
//!
//! Every setting is a flag with an environment-variable fallback. The parsed
//! [`ConfigArgs`] are converted once into an immutable [`LabelerConfig`],
//! which is handed to each component constructor.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use github_app::{AppIdentity, RetryPolicy, GITHUB_API_URL};

use crate::classifier::{AzureOpenAiSettings, DEFAULT_API_VERSION, DEFAULT_DEPLOYMENT};

/// Repository scanned when `--repo` / `DEFAULT_REPO` is not given.
pub const DEFAULT_REPO: &str = "azure-ai-foundry/discussions";

/// Command-line and environment settings.
#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// GitHub App id
    #[arg(long, env = "APP_ID", global = true)]
    pub app_id: Option<String>,

    /// GitHub App private key (PEM)
    #[arg(long, env = "APP_PRIVATE_KEY", hide_env_values = true, global = true)]
    pub private_key: Option<String>,

    /// Path to the GitHub App private key, used when no inline key is set
    #[arg(long, env = "APP_PRIVATE_KEY_PATH", global = true)]
    pub private_key_path: Option<PathBuf>,

    /// GitHub App installation id
    #[arg(long, env = "APP_INSTALLATION_ID", global = true)]
    pub installation_id: Option<String>,

    /// Repository to label (owner/name)
    #[arg(long, env = "DEFAULT_REPO", default_value = DEFAULT_REPO, global = true)]
    pub repo: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT", default_value = "30", global = true)]
    pub request_timeout: u64,

    /// Minutes between scheduled runs
    #[arg(
        long,
        env = "RUN_INTERVAL_MINUTES",
        default_value = "1",
        value_parser = clap::value_parser!(u64).range(1..),
        global = true
    )]
    pub run_interval_minutes: u64,

    /// Attempts per GitHub request
    #[arg(
        long,
        env = "MAX_RETRIES",
        default_value = "3",
        value_parser = clap::value_parser!(u32).range(1..),
        global = true
    )]
    pub max_retries: u32,

    /// Base backoff in seconds
    #[arg(long, env = "RETRY_BACKOFF", default_value = "2", global = true)]
    pub retry_backoff: u64,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = GITHUB_API_URL, global = true)]
    pub github_api_url: String,

    /// Tag taxonomy file
    #[arg(long, env = "TAGS_FILE", default_value = "tags.json", global = true)]
    pub tags_file: PathBuf,

    /// Azure OpenAI resource endpoint
    #[arg(long, env = "AZURE_OPENAI_ENDPOINT", global = true)]
    pub azure_openai_endpoint: Option<String>,

    /// Azure OpenAI api key
    #[arg(long, env = "AZURE_OPENAI_KEY", hide_env_values = true, global = true)]
    pub azure_openai_key: Option<String>,

    /// Azure OpenAI api version
    #[arg(long, env = "AZURE_OPENAI_API_VERSION", default_value = DEFAULT_API_VERSION, global = true)]
    pub azure_openai_api_version: String,

    /// Azure OpenAI deployment name
    #[arg(long, env = "AZURE_OPENAI_DEPLOYMENT", default_value = DEFAULT_DEPLOYMENT, global = true)]
    pub azure_openai_deployment: String,
}

/// Immutable, process-wide settings.
#[derive(Debug, Clone)]
pub struct LabelerConfig {
    pub identity: AppIdentity,
    /// `owner/name`; validated at the start of each run.
    pub repo: String,
    pub request_timeout: Duration,
    pub run_interval: Duration,
    pub retry: RetryPolicy,
    pub api_url: String,
    pub tags_file: PathBuf,
    pub azure: AzureOpenAiSettings,
}

impl From<ConfigArgs> for LabelerConfig {
    fn from(args: ConfigArgs) -> Self {
        Self {
            identity: AppIdentity {
                app_id: args.app_id,
                private_key: args.private_key,
                private_key_path: args.private_key_path,
                installation_id: args.installation_id,
            },
            repo: args.repo,
            request_timeout: Duration::from_secs(args.request_timeout),
            run_interval: Duration::from_secs(args.run_interval_minutes.saturating_mul(60)),
            retry: RetryPolicy {
                max_attempts: args.max_retries,
                base_backoff: Duration::from_secs(args.retry_backoff),
            },
            api_url: args.github_api_url,
            tags_file: args.tags_file,
            azure: AzureOpenAiSettings {
                endpoint: args.azure_openai_endpoint,
                api_key: args.azure_openai_key,
                api_version: args.azure_openai_api_version,
                deployment: args.azure_openai_deployment,
            },
        }
    }
}

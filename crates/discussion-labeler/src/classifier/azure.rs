//! Azure OpenAI chat-completion classifier.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::decode::decode_tags;
use super::prompts::PromptManager;
use super::{Classification, ClassificationError, Classifier, LabelTaxonomy};

/// Default chat-completions API version.
pub const DEFAULT_API_VERSION: &str = "2024-06-01";

/// Default deployment name.
pub const DEFAULT_DEPLOYMENT: &str = "gpt-4o-mini";

const TEMPERATURE: f32 = 0.1;
const MAX_TOKENS: u32 = 200;

/// Where and how to reach the chat-completions deployment.
#[derive(Clone, Default)]
pub struct AzureOpenAiSettings {
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`.
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub api_version: String,
    pub deployment: String,
}

impl std::fmt::Debug for AzureOpenAiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureOpenAiSettings")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_version", &self.api_version)
            .field("deployment", &self.deployment)
            .finish()
    }
}

impl AzureOpenAiSettings {
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.completions_url().is_some() && self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    fn completions_url(&self) -> Option<String> {
        let endpoint = self.endpoint.as_deref()?.trim_end_matches('/');
        if endpoint.is_empty() {
            return None;
        }
        Some(format!(
            "{endpoint}/openai/deployments/{}/chat/completions?api-version={}",
            self.deployment, self.api_version
        ))
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

/// Classifies discussions with a chat-completions deployment in JSON mode.
pub struct ChatCompletionClassifier {
    client: Client,
    settings: AzureOpenAiSettings,
    prompts: PromptManager,
}

impl ChatCompletionClassifier {
    pub fn new(settings: AzureOpenAiSettings, timeout: Duration) -> Result<Self, ClassificationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClassificationError::Provider(format!("failed to build client: {e}")))?;
        Ok(Self {
            client,
            settings,
            prompts: PromptManager::new()?,
        })
    }

    #[must_use]
    pub fn settings(&self) -> &AzureOpenAiSettings {
        &self.settings
    }

    async fn complete(&self, prompt: &str) -> Result<String, ClassificationError> {
        let url = self.settings.completions_url().ok_or_else(|| {
            ClassificationError::Provider("AZURE_OPENAI_ENDPOINT not set".to_string())
        })?;
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ClassificationError::Provider("AZURE_OPENAI_KEY not set".to_string()))?;

        let request = ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: self.prompts.system_prompt(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let response = self
            .client
            .post(&url)
            .header("api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClassificationError::Provider(format!("request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClassificationError::Provider(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            if let Ok(error_response) = serde_json::from_str::<ApiErrorResponse>(&body) {
                return Err(ClassificationError::Provider(format!(
                    "API error ({status}): {}",
                    error_response.error.message
                )));
            }
            return Err(ClassificationError::Provider(format!(
                "API error ({status}): {body}"
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| ClassificationError::Provider(format!("failed to parse response: {e}")))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}

#[async_trait]
impl Classifier for ChatCompletionClassifier {
    #[instrument(skip_all, fields(deployment = %self.settings.deployment))]
    async fn classify(
        &self,
        title: &str,
        body: &str,
        taxonomy: &LabelTaxonomy,
    ) -> Result<Classification, ClassificationError> {
        let prompt = self.prompts.render_classification(title, body, taxonomy)?;
        let raw = self.complete(&prompt).await?;
        debug!(raw = %raw, "Raw classifier output");
        decode_tags(&raw)
    }
}

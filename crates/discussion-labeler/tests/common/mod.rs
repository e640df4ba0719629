//! Shared fixtures for the labeler integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use discussion_labeler::classifier::{
    AzureOpenAiSettings, Classification, ClassificationError, Classifier, DecodeSource,
    LabelTaxonomy,
};
use discussion_labeler::LabelerConfig;
use github_app::{AppIdentity, RetryPolicy};
use serde_json::{json, Value};
use tempfile::NamedTempFile;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const APP_KEY_PATH: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../github-app/tests/fixtures/app-key.pem"
);
pub const INSTALLATION_ID: &str = "4242";
pub const INSTALLATION_TOKEN: &str = "ghs_labeler_token";

pub const TAXONOMY: &str = r#"{
    "tags": [
        { "name": "bug", "description": "Something is broken" },
        { "name": "docs", "description": "Documentation gaps" },
        "question"
    ]
}"#;

pub fn taxonomy_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(TAXONOMY.as_bytes()).unwrap();
    file
}

pub fn identity() -> AppIdentity {
    AppIdentity {
        app_id: Some("12345".to_string()),
        private_key: None,
        private_key_path: Some(PathBuf::from(APP_KEY_PATH)),
        installation_id: Some(INSTALLATION_ID.to_string()),
    }
}

pub fn config(server: &MockServer, tags_file: &NamedTempFile) -> LabelerConfig {
    LabelerConfig {
        identity: identity(),
        repo: "octo-org/discussions".to_string(),
        request_timeout: Duration::from_secs(5),
        run_interval: Duration::from_secs(60),
        retry: RetryPolicy {
            max_attempts: 2,
            base_backoff: Duration::from_millis(5),
        },
        api_url: server.uri(),
        tags_file: tags_file.path().to_path_buf(),
        azure: AzureOpenAiSettings::default(),
    }
}

/// Classifier that answers by discussion title and records what it saw.
#[derive(Default)]
pub struct ScriptedClassifier {
    answers: HashMap<String, Vec<String>>,
    seen: Mutex<Vec<String>>,
}

impl ScriptedClassifier {
    pub fn new(answers: &[(&str, &[&str])]) -> Arc<Self> {
        Arc::new(Self {
            answers: answers
                .iter()
                .map(|(title, tags)| {
                    (
                        (*title).to_string(),
                        tags.iter().map(ToString::to_string).collect(),
                    )
                })
                .collect(),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(
        &self,
        title: &str,
        _body: &str,
        taxonomy: &LabelTaxonomy,
    ) -> Result<Classification, ClassificationError> {
        assert!(!taxonomy.is_empty());
        self.seen.lock().unwrap().push(title.to_string());
        self.answers
            .get(title)
            .cloned()
            .map(|tags| Classification {
                tags,
                source: DecodeSource::Strict,
            })
            .ok_or_else(|| ClassificationError::Provider(format!("no answer for {title}")))
    }
}

pub async fn mount_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(format!(
            "/app/installations/{INSTALLATION_ID}/access_tokens"
        )))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "token": INSTALLATION_TOKEN })),
        )
        .mount(server)
        .await;
}

pub async fn mount_graphql(server: &MockServer, fragment: &str, body: Value) {
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains(fragment))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub fn discussion_node(number: Option<u64>, title: &str, labels: &[&str]) -> Value {
    json!({
        "id": format!("D_kwDO{}", number.unwrap_or_default()),
        "number": number,
        "title": title,
        "body": format!("Body of {title}"),
        "category": { "name": "General" },
        "labels": {
            "nodes": labels.iter().map(|name| json!({ "name": name })).collect::<Vec<_>>()
        }
    })
}

pub async fn mount_discussions(server: &MockServer, nodes: Vec<Value>) {
    mount_graphql(
        server,
        "RepoDiscussions",
        json!({ "data": { "repository": { "discussions": { "nodes": nodes } } } }),
    )
    .await;
}

/// Answer the id lookup for discussion `number` with `D_kwDO{number}`.
pub async fn mount_discussion_id(server: &MockServer, number: u64) {
    mount_graphql(
        server,
        &format!("\"number\":{number}"),
        json!({
            "data": { "repository": { "discussion": { "id": format!("D_kwDO{number}") } } }
        }),
    )
    .await;
}

pub async fn mount_labels(server: &MockServer, labels: &[(&str, &str)]) {
    mount_graphql(
        server,
        "RepositoryLabels",
        json!({
            "data": {
                "repository": {
                    "labels": {
                        "nodes": labels
                            .iter()
                            .map(|(id, name)| json!({ "id": id, "name": name }))
                            .collect::<Vec<_>>()
                    }
                }
            }
        }),
    )
    .await;
}

pub fn mutation_response(labels: &[&str]) -> Value {
    json!({
        "data": {
            "addLabelsToLabelable": {
                "labelable": {
                    "labels": {
                        "nodes": labels.iter().map(|name| json!({ "name": name })).collect::<Vec<_>>()
                    }
                }
            }
        }
    })
}

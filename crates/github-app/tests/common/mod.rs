//! Shared fixtures for the GitHub App integration tests.

#![allow(dead_code)]

use std::time::Duration;

use github_app::{
    AppIdentity, CredentialProvider, DiscussionGateway, RepoRef, RequestExecutor, RetryPolicy,
};
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const APP_KEY_PEM: &str = include_str!("../fixtures/app-key.pem");
pub const APP_PUBLIC_KEY_PEM: &str = include_str!("../fixtures/app-key.pub.pem");

pub const APP_ID: &str = "12345";
pub const INSTALLATION_ID: &str = "4242";
pub const INSTALLATION_TOKEN: &str = "ghs_test_installation_token";

pub fn token_path() -> String {
    format!("/app/installations/{INSTALLATION_ID}/access_tokens")
}

/// Millisecond backoff so retry tests stay fast.
pub fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_backoff: Duration::from_millis(5),
    }
}

pub fn executor(max_attempts: u32) -> RequestExecutor {
    RequestExecutor::new(Duration::from_secs(5), fast_policy(max_attempts)).unwrap()
}

pub fn identity() -> AppIdentity {
    AppIdentity {
        app_id: Some(APP_ID.to_string()),
        private_key: Some(APP_KEY_PEM.to_string()),
        private_key_path: None,
        installation_id: Some(INSTALLATION_ID.to_string()),
    }
}

pub fn credentials(server: &MockServer, identity: AppIdentity) -> CredentialProvider {
    CredentialProvider::new(identity, executor(2), server.uri())
}

pub fn gateway(server: &MockServer) -> DiscussionGateway {
    DiscussionGateway::new(executor(2), credentials(server, identity()), &server.uri())
}

pub fn repo() -> RepoRef {
    RepoRef::parse("octo-org/discussions").unwrap()
}

/// Token endpoint that hands out [`INSTALLATION_TOKEN`].
pub async fn mount_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(token_path()))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "token": INSTALLATION_TOKEN,
            "expires_at": "2030-01-01T00:00:00Z"
        })))
        .mount(server)
        .await;
}

/// Answer GraphQL documents whose body contains `operation`.
pub async fn mount_graphql(server: &MockServer, operation: &str, body: Value) {
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains(operation))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub fn discussion_node(number: u64, title: &str, labels: &[&str]) -> Value {
    json!({
        "id": format!("D_kwDO{number}"),
        "number": number,
        "title": title,
        "body": format!("Body of {title}"),
        "category": { "name": "Q&A" },
        "labels": {
            "nodes": labels.iter().map(|name| json!({ "name": name })).collect::<Vec<_>>()
        }
    })
}

pub fn discussions_response(nodes: Vec<Value>) -> Value {
    json!({
        "data": {
            "repository": {
                "discussions": { "nodes": nodes }
            }
        }
    })
}

pub fn labels_response(labels: &[(&str, &str)]) -> Value {
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
    })
}

pub fn discussion_id_response(id: &str) -> Value {
    json!({
        "data": {
            "repository": {
                "discussion": { "id": id }
            }
        }
    })
}

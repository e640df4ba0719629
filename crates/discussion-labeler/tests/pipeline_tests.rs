//! End-to-end labeling runs against a mock GitHub API.

mod common;

use discussion_labeler::{
    DiscussionOutcome, LabelAssignmentResult, LabelingPipeline, RunPhase, RunStatus,
};
use github_app::{AppIdentity, LabelAssignment};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{
    config, discussion_node, mount_discussion_id, mount_discussions, mount_labels,
    mount_token_endpoint, mutation_response, taxonomy_file, ScriptedClassifier, INSTALLATION_ID,
    INSTALLATION_TOKEN,
};

fn requested(number: u64, labels: &[&str], success: bool) -> LabelAssignmentResult {
    LabelAssignmentResult {
        discussion_number: number,
        requested: labels.iter().map(ToString::to_string).collect(),
        success,
    }
}

async fn mount_mutation(server: &MockServer, discussion_id: &str, times: u64) {
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("addLabelsToLabelable"))
        .and(body_string_contains(discussion_id))
        .respond_with(ResponseTemplate::new(200).set_body_json(mutation_response(&["bug"])))
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_one_failing_discussion_does_not_stop_the_batch() {
    let server = MockServer::start().await;
    let tags = taxonomy_file();
    mount_token_endpoint(&server).await;
    mount_discussions(
        &server,
        vec![
            discussion_node(Some(1), "First", &[]),
            discussion_node(Some(2), "Second", &[]),
            discussion_node(Some(3), "Third", &[]),
        ],
    )
    .await;
    // The id lookup for #2 always fails
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("\"number\":2"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .with_priority(1)
        .mount(&server)
        .await;
    mount_discussion_id(&server, 1).await;
    mount_discussion_id(&server, 3).await;
    mount_labels(&server, &[("LA_bug", "bug"), ("LA_docs", "docs")]).await;
    mount_mutation(&server, "D_kwDO1", 1).await;
    mount_mutation(&server, "D_kwDO3", 1).await;

    let classifier = ScriptedClassifier::new(&[
        ("First", &["bug"]),
        ("Second", &["bug"]),
        ("Third", &["bug"]),
    ]);
    let pipeline =
        LabelingPipeline::from_config(&config(&server, &tags), classifier.clone(), false).unwrap();

    let summary = pipeline.run().await;

    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(classifier.seen(), vec!["First", "Second", "Third"]);
    assert_eq!(summary.outcomes.len(), 3);
    assert!(matches!(
        &summary.outcomes[0],
        DiscussionOutcome::Labeled { result, .. } if *result == requested(1, &["bug"], true)
    ));
    assert!(matches!(
        &summary.outcomes[1],
        DiscussionOutcome::Failed { result, error }
            if *result == requested(2, &["bug"], false) && error.contains("500")
    ));
    assert!(matches!(
        &summary.outcomes[2],
        DiscussionOutcome::Labeled { result, .. } if *result == requested(3, &["bug"], true)
    ));
    assert_eq!(summary.labeled(), 2);
    assert_eq!(summary.failed(), 1);
}

#[tokio::test]
async fn test_token_failure_mid_run_is_contained_to_one_discussion() {
    let server = MockServer::start().await;
    let tags = taxonomy_file();
    // Fetch and #1 get tokens, both attempts for #2 hit a 502, #3 gets one again
    Mock::given(method("POST"))
        .and(path(format!(
            "/app/installations/{INSTALLATION_ID}/access_tokens"
        )))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "token": INSTALLATION_TOKEN })),
        )
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!(
            "/app/installations/{INSTALLATION_ID}/access_tokens"
        )))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .up_to_n_times(2)
        .with_priority(2)
        .mount(&server)
        .await;
    mount_token_endpoint(&server).await;
    mount_discussions(
        &server,
        vec![
            discussion_node(Some(1), "First", &[]),
            discussion_node(Some(2), "Second", &[]),
            discussion_node(Some(3), "Third", &[]),
        ],
    )
    .await;
    mount_discussion_id(&server, 1).await;
    mount_discussion_id(&server, 3).await;
    mount_labels(&server, &[("LA_bug", "bug")]).await;
    mount_mutation(&server, "D_kwDO1", 1).await;
    mount_mutation(&server, "D_kwDO2", 0).await;
    mount_mutation(&server, "D_kwDO3", 1).await;

    let classifier = ScriptedClassifier::new(&[
        ("First", &["bug"]),
        ("Second", &["bug"]),
        ("Third", &["bug"]),
    ]);
    let pipeline =
        LabelingPipeline::from_config(&config(&server, &tags), classifier.clone(), false).unwrap();

    let summary = pipeline.run().await;

    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(classifier.seen(), vec!["First", "Second", "Third"]);
    assert_eq!(summary.outcomes.len(), 3);
    assert!(matches!(
        &summary.outcomes[1],
        DiscussionOutcome::Failed { result, error }
            if *result == requested(2, &["bug"], false)
                && error.contains("installation token")
    ));
    assert!(matches!(
        &summary.outcomes[2],
        DiscussionOutcome::Labeled { result, .. } if *result == requested(3, &["bug"], true)
    ));
    assert_eq!(summary.labeled(), 2);
    assert_eq!(summary.failed(), 1);
}

#[tokio::test]
async fn test_incomplete_identity_aborts_before_any_request() {
    let server = MockServer::start().await;
    let tags = taxonomy_file();
    let mut config = config(&server, &tags);
    config.identity = AppIdentity {
        app_id: Some("12345".to_string()),
        ..AppIdentity::default()
    };

    let pipeline =
        LabelingPipeline::from_config(&config, ScriptedClassifier::new(&[]), false).unwrap();
    let summary = pipeline.run().await;

    assert!(matches!(
        summary.status,
        RunStatus::Aborted { phase: RunPhase::ValidatingConfig, ref reason }
            if reason.contains("APP_INSTALLATION_ID")
    ));
    assert!(summary.outcomes.is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_repository_aborts_before_any_request() {
    let server = MockServer::start().await;
    let tags = taxonomy_file();
    let mut config = config(&server, &tags);
    config.repo = "just-a-name".to_string();

    let pipeline =
        LabelingPipeline::from_config(&config, ScriptedClassifier::new(&[]), false).unwrap();
    let summary = pipeline.run().await;

    assert!(matches!(
        summary.status,
        RunStatus::Aborted { phase: RunPhase::ValidatingConfig, ref reason }
            if reason.contains("owner/name")
    ));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rejected_credentials_abort_the_run() {
    let server = MockServer::start().await;
    let tags = taxonomy_file();
    Mock::given(method("POST"))
        .and(path("/app/installations/4242/access_tokens"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Bad credentials"))
        .mount(&server)
        .await;

    let pipeline =
        LabelingPipeline::from_config(&config(&server, &tags), ScriptedClassifier::new(&[]), false)
            .unwrap();
    let summary = pipeline.run().await;

    assert!(matches!(
        summary.status,
        RunStatus::Aborted {
            phase: RunPhase::Fetching,
            ..
        }
    ));
    assert!(summary.is_aborted());
}

#[tokio::test]
async fn test_no_unlabeled_discussions() {
    let server = MockServer::start().await;
    let tags = taxonomy_file();
    mount_token_endpoint(&server).await;
    mount_discussions(&server, vec![discussion_node(Some(1), "Done", &["bug"])]).await;

    let classifier = ScriptedClassifier::new(&[("Done", &["docs"])]);
    let pipeline =
        LabelingPipeline::from_config(&config(&server, &tags), classifier.clone(), false).unwrap();
    let summary = pipeline.run().await;

    assert_eq!(summary.status, RunStatus::NothingToDo);
    assert!(classifier.seen().is_empty());
}

#[tokio::test]
async fn test_skips_without_touching_the_gateway() {
    let server = MockServer::start().await;
    let tags = taxonomy_file();
    mount_token_endpoint(&server).await;
    mount_discussions(
        &server,
        vec![
            discussion_node(None, "Numberless", &[]),
            discussion_node(Some(5), "Unclear", &[]),
        ],
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("DiscussionId"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    // No answer for "Unclear": the classifier fails and suggests nothing
    let classifier = ScriptedClassifier::new(&[("Numberless", &["bug"])]);
    let pipeline =
        LabelingPipeline::from_config(&config(&server, &tags), classifier.clone(), false).unwrap();
    let summary = pipeline.run().await;

    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(classifier.seen(), vec!["Unclear"]);
    assert_eq!(
        summary.outcomes,
        vec![
            DiscussionOutcome::Malformed {
                id: "D_kwDO0".to_string()
            },
            DiscussionOutcome::NoSuggestions {
                discussion_number: 5
            },
        ]
    );
    assert_eq!(summary.skipped(), 2);
}

#[tokio::test]
async fn test_unknown_labels_are_reported_not_applied() {
    let server = MockServer::start().await;
    let tags = taxonomy_file();
    mount_token_endpoint(&server).await;
    mount_discussions(&server, vec![discussion_node(Some(7), "Odd", &[])]).await;
    mount_discussion_id(&server, 7).await;
    mount_labels(&server, &[("LA_bug", "bug"), ("LA_docs", "docs")]).await;
    mount_mutation(&server, "D_kwDO7", 0).await;

    let classifier = ScriptedClassifier::new(&[("Odd", &["foo"])]);
    let pipeline =
        LabelingPipeline::from_config(&config(&server, &tags), classifier, false).unwrap();
    let summary = pipeline.run().await;

    assert_eq!(
        summary.outcomes,
        vec![DiscussionOutcome::NotApplied {
            result: requested(7, &["foo"], false),
            assignment: LabelAssignment::NoMatchingLabels {
                missing: vec!["foo".to_string()]
            },
        }]
    );
}

#[tokio::test]
async fn test_dry_run_never_mutates() {
    let server = MockServer::start().await;
    let tags = taxonomy_file();
    mount_token_endpoint(&server).await;
    mount_discussions(&server, vec![discussion_node(Some(9), "Docs gap", &[])]).await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("DiscussionId"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let classifier = ScriptedClassifier::new(&[("Docs gap", &["docs"])]);
    let pipeline =
        LabelingPipeline::from_config(&config(&server, &tags), classifier, true).unwrap();
    let summary = pipeline.run().await;

    assert_eq!(
        summary.outcomes,
        vec![DiscussionOutcome::WouldLabel {
            result: requested(9, &["docs"], false),
        }]
    );
    assert_eq!(summary.labeled(), 0);
}

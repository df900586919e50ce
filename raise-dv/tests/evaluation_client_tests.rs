//! Evaluation client tests against a local stand-in service

mod helpers;

use axum::http::StatusCode;
use helpers::MockEvaluationService;
use raise_common::config::{EvaluationConfig, TomlConfig};
use raise_common::{MemoryQueue, QueueAdapter};
use raise_dv::evaluation::{EvaluationClient, Evaluator};
use raise_dv::VerifyError;
use serde_json::{json, Value};
use std::io::Write;
use std::sync::Arc;

fn client_for(endpoint: &str) -> EvaluationClient {
    EvaluationClient::new(&EvaluationConfig {
        endpoint: endpoint.to_string(),
        timeout_secs: 5,
        ..EvaluationConfig::default()
    })
    .unwrap()
}

fn fair_enough_body() -> Value {
    json!({
        "subject": "https://doi.org/10.1/xyz",
        "score": 1,
        "contains": [
            {"indicatorId": "F1", "passed": true, "comment": "ok"},
            {"indicatorId": "A1", "passed": false, "comment": "missing"}
        ]
    })
}

#[tokio::test]
async fn test_ok_status_returns_outcomes_and_sends_resolved_subject() {
    let service = MockEvaluationService::start(StatusCode::OK, fair_enough_body()).await;
    let client = client_for(&service.endpoint);

    let outcomes = client.evaluate("10.1/xyz").await.unwrap();

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].indicator_id, "F1");
    assert!(outcomes[0].passed);
    assert_eq!(outcomes[1].comment, "missing");
    assert_eq!(
        service.requests(),
        vec![json!({"subject": "https://doi.org/10.1/xyz", "collection": "fair-enough-data"})]
    );
}

#[tokio::test]
async fn test_created_status_is_success() {
    let service = MockEvaluationService::start(StatusCode::CREATED, fair_enough_body()).await;
    let client = client_for(&service.endpoint);

    assert_eq!(client.evaluate("10.1/xyz").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_other_statuses_fail_with_code_and_subject() {
    for status in [
        StatusCode::ACCEPTED,
        StatusCode::BAD_REQUEST,
        StatusCode::INTERNAL_SERVER_ERROR,
    ] {
        let service = MockEvaluationService::start(status, json!({"detail": "nope"})).await;
        let client = client_for(&service.endpoint);

        match client.evaluate("10.1/xyz").await {
            Err(VerifyError::EvaluationService {
                status_code,
                subject_identifier,
            }) => {
                assert_eq!(status_code, status.as_u16());
                assert_eq!(subject_identifier, "10.1/xyz");
            }
            other => panic!("Expected EvaluationService for {}, got {:?}", status, other),
        }
        // Called exactly once: no retry
        assert_eq!(service.requests().len(), 1);
    }
}

#[tokio::test]
async fn test_success_without_outcome_field_is_response_error() {
    let service = MockEvaluationService::start(StatusCode::OK, json!({"score": 0})).await;
    let client = client_for(&service.endpoint);

    let result = client.evaluate("10.1/xyz").await;
    assert!(matches!(result, Err(VerifyError::EvaluationResponse { .. })));
}

#[tokio::test]
async fn test_unreachable_service_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let client = client_for(&format!("http://{}/evaluations", addr));

    let result = client.evaluate("10.1/xyz").await;
    assert!(matches!(result, Err(VerifyError::EvaluationTransport { .. })));
}

#[tokio::test]
async fn test_build_worker_end_to_end() {
    let service = MockEvaluationService::start(StatusCode::OK, fair_enough_body()).await;

    let mut map_file = tempfile::NamedTempFile::new().unwrap();
    write!(map_file, r#"{{"F1": "Findable", "A1": "Accessible"}}"#).unwrap();

    let mut config = TomlConfig::default();
    config.evaluation.endpoint = service.endpoint.clone();
    config.evaluation.timeout_secs = 5;
    config.indicators.path = map_file.path().to_path_buf();

    let queue = Arc::new(MemoryQueue::new());
    queue
        .declare_durable_queue(&config.queues.verification)
        .await
        .unwrap();
    queue
        .publish(
            &config.queues.verification,
            br#"{"instanceId": "i1", "uniqueIdentifier": "10.1/xyz"}"#.to_vec(),
        )
        .await
        .unwrap();
    queue.close(&config.queues.verification).unwrap();

    let worker = raise_dv::build_worker(&config, queue.clone()).unwrap();
    let stats = worker.run().await.unwrap();
    assert_eq!(stats.published, 1);

    let responses = queue.drain(&config.queues.response).await.unwrap();
    assert_eq!(
        String::from_utf8(responses[0].clone()).unwrap(),
        r#"{"instanceId":"i1","result":{"Findable":[{"indicatorId":"F1","commentValue":"ok","isValid":true}],"Accessible":[{"indicatorId":"A1","commentValue":"missing","isValid":false}]}}"#
    );
}

#[tokio::test]
async fn test_build_worker_fails_without_category_map() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = TomlConfig::default();
    config.indicators.path = dir.path().join("tests_relations.json");

    let result = raise_dv::build_worker(&config, Arc::new(MemoryQueue::new()));
    assert!(matches!(result, Err(VerifyError::CategoryMap(_))));
}

//! Shared fixtures for raise-dv integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use raise_dv::evaluation::{EvaluationOutcome, Evaluator};
use raise_dv::VerifyError;
use serde_json::Value;
use std::sync::{Arc, Mutex};

pub fn outcome(id: &str, passed: bool, comment: &str) -> EvaluationOutcome {
    EvaluationOutcome {
        indicator_id: id.to_string(),
        passed,
        comment: comment.to_string(),
    }
}

/// Evaluator returning canned outcomes (or a canned status failure) and
/// recording every subject it was asked about
#[derive(Default)]
pub struct StubEvaluator {
    outcomes: Vec<EvaluationOutcome>,
    fail_status: Option<u16>,
    calls: Mutex<Vec<String>>,
}

impl StubEvaluator {
    pub fn returning(outcomes: Vec<EvaluationOutcome>) -> Self {
        Self {
            outcomes,
            ..Self::default()
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            fail_status: Some(status),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Evaluator for StubEvaluator {
    async fn evaluate(&self, subject_identifier: &str) -> raise_dv::Result<Vec<EvaluationOutcome>> {
        self.calls
            .lock()
            .unwrap()
            .push(subject_identifier.to_string());
        match self.fail_status {
            Some(status_code) => Err(VerifyError::EvaluationService {
                status_code,
                subject_identifier: subject_identifier.to_string(),
            }),
            None => Ok(self.outcomes.clone()),
        }
    }
}

/// Local stand-in for the evaluation service
///
/// Answers every `POST /evaluations` with `status` and `body`, recording the
/// request bodies it received.
pub struct MockEvaluationService {
    pub endpoint: String,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl MockEvaluationService {
    pub async fn start(status: StatusCode, body: Value) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&requests);

        let app = Router::new().route(
            "/evaluations",
            post(move |Json(request): Json<Value>| {
                let captured = Arc::clone(&captured);
                let body = body.clone();
                async move {
                    captured.lock().unwrap().push(request);
                    (status, Json(body))
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            endpoint: format!("http://{}/evaluations", addr),
            requests,
        }
    }

    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }
}

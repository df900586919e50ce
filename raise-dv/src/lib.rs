//! # RAISE Dataset Verification (raise-dv)
//!
//! Consumes dataset-verification requests from a queue, asks the FAIR
//! evaluation service to score the dataset, groups the per-indicator outcomes
//! by FAIR category and publishes the grouped report to a response queue.
//!
//! Pipeline: [`handler::RequestHandler`] decodes a message, calls an
//! [`evaluation::Evaluator`], runs [`aggregator::aggregate`] against the
//! [`category_map::IndicatorCategoryMap`] and returns a publish action that
//! [`worker::Worker`] hands to the queue adapter.

pub mod aggregator;
pub mod category_map;
pub mod error;
pub mod evaluation;
pub mod handler;
pub mod report;
pub mod settings;
pub mod worker;

pub use error::{Result, VerifyError};

use category_map::IndicatorCategoryMap;
use evaluation::EvaluationClient;
use handler::RequestHandler;
use raise_common::config::TomlConfig;
use raise_common::QueueAdapter;
use std::sync::Arc;
use worker::Worker;

/// Wire a worker from validated configuration
///
/// Loads the category map (startup-fatal on failure) and builds the HTTP
/// evaluation client.
pub fn build_worker(config: &TomlConfig, queue: Arc<dyn QueueAdapter>) -> Result<Worker> {
    settings::validate(config)?;

    let categories = Arc::new(IndicatorCategoryMap::load(&config.indicators.path)?);
    let evaluator = Arc::new(EvaluationClient::new(&config.evaluation)?);
    tracing::info!(endpoint = %evaluator.endpoint(), "Evaluation client ready");

    let handler = RequestHandler::new(
        categories,
        evaluator,
        config.fields.clone(),
        config.queues.response.clone(),
    );

    Ok(Worker::new(
        queue,
        handler,
        config.queues.verification.clone(),
        config.worker.on_evaluation_failure,
    ))
}

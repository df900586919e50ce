//! Consume loop: one message at a time, end to end
//!
//! Each cycle runs receive → handle → publish-or-discard to completion before
//! the next message is received. Shutdown is only observed while waiting for
//! a message, never mid-cycle.

use crate::error::Result;
use crate::handler::{HandleOutcome, RequestHandler};
use raise_common::config::FailurePolicy;
use raise_common::QueueAdapter;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};

/// Counters for one worker run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub received: u64,
    pub published: u64,
    pub discarded: u64,
    pub failed: u64,
}

/// Single logical worker bound to one inbound and one response queue
pub struct Worker {
    queue: Arc<dyn QueueAdapter>,
    handler: RequestHandler,
    verification_queue: String,
    failure_policy: FailurePolicy,
}

impl Worker {
    pub fn new(
        queue: Arc<dyn QueueAdapter>,
        handler: RequestHandler,
        verification_queue: impl Into<String>,
        failure_policy: FailurePolicy,
    ) -> Self {
        Self {
            queue,
            handler,
            verification_queue: verification_queue.into(),
            failure_policy,
        }
    }

    /// Run until the inbound stream closes
    pub async fn run(&self) -> Result<WorkerStats> {
        self.run_until(std::future::pending()).await
    }

    /// Run until the inbound stream closes or `shutdown` resolves
    ///
    /// # Returns
    /// * `Ok(stats)` - clean stop
    /// * `Err(_)` - queue failure, or an evaluation failure under
    ///   `FailurePolicy::Terminate`
    pub async fn run_until<F>(&self, shutdown: F) -> Result<WorkerStats>
    where
        F: Future<Output = ()>,
    {
        self.queue
            .declare_durable_queue(&self.verification_queue)
            .await?;
        self.queue
            .declare_durable_queue(self.handler.response_queue())
            .await?;

        info!(
            inbound = %self.verification_queue,
            response = %self.handler.response_queue(),
            "Waiting for verification requests"
        );

        let mut stats = WorkerStats::default();
        tokio::pin!(shutdown);

        loop {
            let message = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                message = self.queue.receive(&self.verification_queue) => message?,
            };

            let Some(raw) = message else {
                info!("Inbound queue closed");
                break;
            };

            stats.received += 1;
            let span = info_span!("cycle", seq = stats.received);
            self.process(&raw, &mut stats).instrument(span).await?;
        }

        info!(
            received = stats.received,
            published = stats.published,
            discarded = stats.discarded,
            failed = stats.failed,
            "Worker stopped"
        );
        Ok(stats)
    }

    async fn process(&self, raw: &[u8], stats: &mut WorkerStats) -> Result<()> {
        match self.handler.handle(raw).await {
            Ok(HandleOutcome::Publish { queue, payload }) => {
                self.queue.publish(&queue, payload).await?;
                stats.published += 1;
            }
            Ok(HandleOutcome::Discarded(reason)) => {
                info!("No response published: {}", reason);
                stats.discarded += 1;
            }
            Err(e) if e.is_evaluation_failure() => {
                stats.failed += 1;
                if self.failure_policy == FailurePolicy::Terminate {
                    error!("Evaluation failed, stopping worker: {}", e);
                    return Err(e);
                }
                warn!("Evaluation failed, skipping message: {}", e);
            }
            Err(e) => {
                stats.failed += 1;
                error!("Verification cycle aborted: {}", e);
            }
        }
        Ok(())
    }
}

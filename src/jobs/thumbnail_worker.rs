use anyhow::Result;
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::app::thumbnails::{InvocationContext, ThumbnailService};
use crate::error::ThumbnailError;
use crate::infra::queue::QueueClient;

const POLL_WAIT_SECONDS: i32 = 10;
const IDLE_SLEEP_MS: u64 = 200;
const ERROR_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingOutcome {
    Completed,
    RetryLater,
}

/// Retryable failures stay on the queue for redelivery; anything else is
/// acknowledged so it does not loop forever.
pub fn outcome_for(result: &Result<Value, ThumbnailError>) -> ProcessingOutcome {
    match result {
        Err(err) if err.is_retryable() => ProcessingOutcome::RetryLater,
        _ => ProcessingOutcome::Completed,
    }
}

pub async fn run(service: ThumbnailService, queue: QueueClient) -> Result<()> {
    info!(queue = %queue.queue_name(), "thumbnail worker started");
    loop {
        match queue.receive_event(POLL_WAIT_SECONDS).await {
            Ok(Some(message)) => {
                let ctx = InvocationContext::new(message.message_id.clone());
                let result = service.handle(message.event, &ctx).await;
                if let Err(err) = &result {
                    error!(
                        error = %err,
                        request_id = %ctx.request_id,
                        retryable = err.is_retryable(),
                        "failed to generate thumbnail"
                    );
                }

                if matches!(outcome_for(&result), ProcessingOutcome::Completed) {
                    if let Err(err) = queue.delete_message(&message.receipt_handle).await {
                        warn!(error = ?err, "failed to delete queue message");
                    }
                }
            }
            Ok(None) => {
                tokio::time::sleep(Duration::from_millis(IDLE_SLEEP_MS)).await;
            }
            Err(err) => {
                warn!(error = ?err, "queue receive failed, backing off");
                tokio::time::sleep(Duration::from_millis(ERROR_BACKOFF_MS)).await;
            }
        }
    }
}

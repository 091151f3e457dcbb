use anyhow::{anyhow, Result};
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_sdk_sqs::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::AppConfig;

/// SQS queue that receives storage notifications.
#[derive(Clone)]
pub struct QueueClient {
    client: Client,
    queue_name: String,
    queue_url: String,
}

#[derive(Debug)]
pub struct ReceivedEvent {
    pub message_id: String,
    pub event: Value,
    pub receipt_handle: String,
}

impl QueueClient {
    pub async fn new(config: &AppConfig) -> Result<Self> {
        let queue_name = config
            .queue_name
            .clone()
            .ok_or_else(|| anyhow!("missing required env var: QUEUE_NAME"))?;

        let region_provider = RegionProviderChain::first_try(Region::new(config.queue_region.clone()));
        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;

        let mut sqs_builder = aws_sdk_sqs::config::Builder::from(&shared_config)
            .region(shared_config.region().cloned());
        if let Some(endpoint) = &config.queue_endpoint {
            sqs_builder = sqs_builder.endpoint_url(endpoint.clone());
        }
        if let Some(provider) = shared_config.credentials_provider() {
            sqs_builder = sqs_builder.credentials_provider(provider);
        }
        let sqs_config = sqs_builder.build();

        let client = Client::from_conf(sqs_config);
        let queue_url = client
            .get_queue_url()
            .queue_name(&queue_name)
            .send()
            .await
            .map_err(|err| anyhow!("failed to resolve queue {}: {}", queue_name, err))?
            .queue_url()
            .ok_or_else(|| anyhow!("missing queue url"))?
            .to_string();

        Ok(Self {
            client,
            queue_name,
            queue_url,
        })
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    pub async fn receive_event(&self, wait_time_seconds: i32) -> Result<Option<ReceivedEvent>> {
        let response = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(1)
            .wait_time_seconds(wait_time_seconds)
            .send()
            .await?;

        let message = match response.messages().first() {
            Some(message) => message,
            None => return Ok(None),
        };

        let receipt_handle = match message.receipt_handle() {
            Some(handle) => handle.to_string(),
            None => {
                warn!("queue message missing receipt handle");
                return Ok(None);
            }
        };

        let body = match message.body() {
            Some(body) => body,
            None => {
                warn!("queue message missing body, deleting");
                self.discard(&receipt_handle).await;
                return Ok(None);
            }
        };

        let event: Value = match serde_json::from_str(body) {
            Ok(event) => event,
            Err(err) => {
                warn!(error = ?err, "queue message body is not JSON, deleting");
                self.discard(&receipt_handle).await;
                return Ok(None);
            }
        };

        let message_id = message.message_id().unwrap_or("unknown").to_string();
        debug!(message_id = %message_id, "received storage event");
        Ok(Some(ReceivedEvent {
            message_id,
            event,
            receipt_handle,
        }))
    }

    async fn discard(&self, receipt_handle: &str) {
        if let Err(err) = self.delete_message(receipt_handle).await {
            warn!(error = ?err, "failed to delete unusable queue message");
        }
    }

    pub async fn delete_message(&self, receipt_handle: &str) -> Result<()> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await?;

        Ok(())
    }
}

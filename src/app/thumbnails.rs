use image::ImageError;
use serde_json::Value;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, info_span, Instrument};

use crate::app::publisher::{self, UploadResult};
use crate::app::transform::{render_thumbnail, RenderedThumbnail};
use crate::domain::event::{interpret, SourceObject};
use crate::domain::thumbnail::{Dimensions, ExtensionPolicy, ThumbnailSpec};
use crate::error::{ThumbnailError, TransformError};
use crate::infra::storage::BlobStore;

/// Identifies one run of the pipeline in diagnostics.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub request_id: String,
}

impl InvocationContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ThumbnailOutcome {
    pub source: SourceObject,
    pub source_dimensions: Dimensions,
    pub thumbnail_dimensions: Dimensions,
    pub upload: UploadResult,
}

#[derive(Clone)]
pub struct ThumbnailService {
    store: Arc<dyn BlobStore>,
    destination_bucket: String,
    spec: ThumbnailSpec,
    extension_policy: ExtensionPolicy,
    timeout: Duration,
}

impl ThumbnailService {
    pub fn new(
        store: Arc<dyn BlobStore>,
        destination_bucket: String,
        spec: ThumbnailSpec,
        extension_policy: ExtensionPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            destination_bucket,
            spec,
            extension_policy,
            timeout,
        }
    }

    pub fn destination_bucket(&self) -> &str {
        &self.destination_bucket
    }

    /// Runs the pipeline for `event` and hands the event back once exactly one
    /// thumbnail has been written.
    pub async fn handle(&self, event: Value, ctx: &InvocationContext) -> Result<Value, ThumbnailError> {
        let span = info_span!("invocation", request_id = %ctx.request_id);
        self.run_with_deadline(&event)
            .instrument(span)
            .await?;
        Ok(event)
    }

    /// Fetching and rendering are cancelled at the deadline. The upload only
    /// starts before the deadline and is never cancelled once sent.
    async fn run_with_deadline(&self, event: &Value) -> Result<ThumbnailOutcome, ThumbnailError> {
        info!(event = %event, "received event");
        let deadline = Instant::now() + self.timeout;

        let (source, rendered) = match tokio::time::timeout_at(deadline, self.prepare(event)).await {
            Ok(prepared) => prepared?,
            Err(_) => return Err(self.deadline_exceeded(event)),
        };

        if Instant::now() >= deadline {
            return Err(self.deadline_exceeded(event));
        }

        self.publish(source, rendered).await
    }

    /// Interprets, fetches, transforms and publishes without a deadline.
    pub async fn process(&self, event: &Value) -> Result<ThumbnailOutcome, ThumbnailError> {
        let (source, rendered) = self.prepare(event).await?;
        self.publish(source, rendered).await
    }

    async fn prepare(&self, event: &Value) -> Result<(SourceObject, RenderedThumbnail), ThumbnailError> {
        let source = interpret(event)?;
        info!(
            bucket = %source.bucket,
            key = %source.key,
            destination_bucket = %self.destination_bucket,
            "resolved source object"
        );

        let data = self
            .store
            .get(&source.bucket, &source.key)
            .await
            .map_err(|err| ThumbnailError::from_store(err, &source.bucket, &source.key))?;

        let spec = self.spec.clone();
        let rendered = tokio::task::spawn_blocking(move || render_thumbnail(&data, &spec))
            .await
            .map_err(|err| {
                TransformError::Decode(ImageError::IoError(io::Error::new(
                    io::ErrorKind::Other,
                    format!("transform task failed: {}", err),
                )))
            })
            .and_then(|result| result)
            .map_err(|err| ThumbnailError::from_transform(err, &source.bucket, &source.key))?;
        info!(format = ?rendered.source_format, size = %rendered.source, "size before resize");
        info!(size = %rendered.thumbnail, bytes = rendered.bytes.len(), "size after resize");

        Ok((source, rendered))
    }

    async fn publish(
        &self,
        source: SourceObject,
        rendered: RenderedThumbnail,
    ) -> Result<ThumbnailOutcome, ThumbnailError> {
        let upload = publisher::publish(
            self.store.as_ref(),
            &self.destination_bucket,
            &source.key,
            rendered.bytes,
            self.extension_policy,
        )
        .await?;

        Ok(ThumbnailOutcome {
            source,
            source_dimensions: rendered.source,
            thumbnail_dimensions: rendered.thumbnail,
            upload,
        })
    }

    fn deadline_exceeded(&self, event: &Value) -> ThumbnailError {
        let (bucket, key) = match interpret(event) {
            Ok(source) => (source.bucket, source.key),
            Err(_) => (String::new(), String::new()),
        };
        ThumbnailError::StorageUnavailable {
            bucket,
            key,
            reason: format!("deadline exceeded after {:?}", self.timeout),
        }
    }
}

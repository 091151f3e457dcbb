use bytes::Bytes;
use serde::Serialize;
use tracing::{error, info};

use crate::domain::thumbnail::{destination_key, ExtensionPolicy, THUMBNAIL_CONTENT_TYPE};
use crate::error::{StoreError, ThumbnailError};
use crate::infra::storage::BlobStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    pub bucket: String,
    pub key: String,
    pub status: u16,
}

impl UploadResult {
    pub fn succeeded(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Uploads `body` as the thumbnail of `source_key` and checks the status the
/// store answered with.
pub async fn publish(
    store: &dyn BlobStore,
    destination_bucket: &str,
    source_key: &str,
    body: Bytes,
    policy: ExtensionPolicy,
) -> Result<UploadResult, ThumbnailError> {
    let key = destination_key(source_key, policy);

    let status = store
        .put(destination_bucket, &key, body, THUMBNAIL_CONTENT_TYPE)
        .await
        .map_err(|err| match err {
            StoreError::Unavailable(reason) => ThumbnailError::StorageUnavailable {
                bucket: destination_bucket.to_string(),
                key: key.clone(),
                reason: format!("{} (thumbnail of {})", reason, source_key),
            },
            other => ThumbnailError::from_store(other, destination_bucket, &key),
        })?;

    let result = UploadResult {
        bucket: destination_bucket.to_string(),
        key,
        status,
    };

    if !result.succeeded() {
        error!(
            source_key,
            bucket = %result.bucket,
            key = %result.key,
            status,
            "thumbnail upload was not accepted"
        );
        return Err(ThumbnailError::UploadVerification {
            source_key: source_key.to_string(),
            destination_bucket: result.bucket,
            destination_key: result.key,
            status,
        });
    }

    info!(bucket = %result.bucket, key = %result.key, status, "thumbnail uploaded");
    Ok(result)
}

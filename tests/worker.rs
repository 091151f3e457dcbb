//! Worker Acknowledgement Tests
//!
//! The worker deletes a queue message unless the failure could succeed on
//! redelivery.

mod common;

use serde_json::json;

use common::{ctx, png, s3_event, service, MemoryStore, SOURCE_BUCKET};
use thumbnailer::error::{StoreError, ThumbnailError};
use thumbnailer::jobs::thumbnail_worker::{outcome_for, ProcessingOutcome};

#[tokio::test]
async fn successful_invocation_is_acknowledged() {
    let store = MemoryStore::new();
    store.insert(SOURCE_BUCKET, "photo.png", png(30, 30));

    let result = service(&store)
        .handle(s3_event(SOURCE_BUCKET, &["photo.png"]), &ctx())
        .await;

    assert_eq!(outcome_for(&result), ProcessingOutcome::Completed);
}

#[tokio::test]
async fn permanent_failures_are_acknowledged() {
    let store = MemoryStore::new();
    store.insert(SOURCE_BUCKET, "text.png", b"hello".to_vec());

    let malformed = service(&store).handle(json!({ "Records": [] }), &ctx()).await;
    let undecodable = service(&store)
        .handle(s3_event(SOURCE_BUCKET, &["text.png"]), &ctx())
        .await;
    let missing = service(&store)
        .handle(s3_event(SOURCE_BUCKET, &["missing.png"]), &ctx())
        .await;

    assert_eq!(outcome_for(&malformed), ProcessingOutcome::Completed);
    assert_eq!(outcome_for(&undecodable), ProcessingOutcome::Completed);
    assert_eq!(outcome_for(&missing), ProcessingOutcome::Completed);
}

#[tokio::test]
async fn unavailable_store_is_left_for_redelivery() {
    let store = MemoryStore::new();
    store.fail_get(StoreError::Unavailable("throttled".to_string()));

    let result = service(&store)
        .handle(s3_event(SOURCE_BUCKET, &["photo.png"]), &ctx())
        .await;

    assert_eq!(outcome_for(&result), ProcessingOutcome::RetryLater);
}

#[test]
fn upload_status_decides_retry() {
    let rejected = |status| -> Result<serde_json::Value, ThumbnailError> {
        Err(ThumbnailError::UploadVerification {
            source_key: "photo.png".to_string(),
            destination_bucket: "thumbs".to_string(),
            destination_key: "photo_thumbnail.png".to_string(),
            status,
        })
    };

    assert_eq!(outcome_for(&rejected(500)), ProcessingOutcome::RetryLater);
    assert_eq!(outcome_for(&rejected(400)), ProcessingOutcome::Completed);
}

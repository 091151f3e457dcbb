//! Shape of the storage notification that triggers a thumbnail, and the
//! extraction of the source object it points at.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ThumbnailError;

#[derive(Debug, Deserialize)]
pub struct S3EventRecord {
    #[serde(rename = "eventName", default)]
    pub event_name: Option<String>,
    pub s3: S3Entity,
}

#[derive(Debug, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Deserialize)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct S3Object {
    pub key: String,
}

/// The object a trigger event refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceObject {
    pub bucket: String,
    pub key: String,
}

/// Resolves the source object from the first record of `event`.
pub fn interpret(event: &Value) -> Result<SourceObject, ThumbnailError> {
    let records = match event.get("Records") {
        Some(Value::Array(records)) => records,
        Some(_) => return Err(malformed("Records is not an array")),
        None => return Err(malformed("missing Records")),
    };

    let first = records
        .first()
        .ok_or_else(|| malformed("event contains no records"))?;

    if records.len() > 1 {
        warn!(
            discarded = records.len() - 1,
            "event carries multiple records, only the first is processed"
        );
    }

    let record = S3EventRecord::deserialize(first)
        .map_err(|err| malformed(format!("invalid record: {}", err)))?;

    debug!(event_name = ?record.event_name, "interpreting event record");

    let bucket = record.s3.bucket.name;
    if bucket.is_empty() {
        return Err(malformed("empty bucket name"));
    }
    let key = decode_object_key(&record.s3.object.key)?;
    if key.is_empty() {
        return Err(malformed("empty object key"));
    }

    Ok(SourceObject { bucket, key })
}

/// Object keys in storage notifications are form-encoded.
pub fn decode_object_key(raw: &str) -> Result<String, ThumbnailError> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|key| key.into_owned())
        .map_err(|err| malformed(format!("object key is not valid UTF-8: {}", err)))
}

fn malformed(message: impl Into<String>) -> ThumbnailError {
    ThumbnailError::MalformedEvent(message.into())
}

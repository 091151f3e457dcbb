use thiserror::Error;

/// Failure of a single blob store call, before it is tied to a pipeline step.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("object not found")]
    NotFound,
    #[error("access denied")]
    AccessDenied,
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("failed to encode thumbnail: {0}")]
    Encode(#[source] image::ImageError),
}

#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    #[error("object {key} not found in bucket {bucket}")]
    ObjectNotFound { bucket: String, key: String },

    #[error("access denied to object {key} in bucket {bucket}")]
    AccessDenied { bucket: String, key: String },

    #[error("storage unavailable for object {key} in bucket {bucket}: {reason}")]
    StorageUnavailable {
        bucket: String,
        key: String,
        reason: String,
    },

    #[error("failed to decode image {key} from bucket {bucket}: {source}")]
    Decode {
        bucket: String,
        key: String,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to encode thumbnail for {key} from bucket {bucket}: {source}")]
    Encode {
        bucket: String,
        key: String,
        #[source]
        source: image::ImageError,
    },

    #[error(
        "failed to upload thumbnail of {source_key} to bucket {destination_bucket} \
         as {destination_key}: status {status}"
    )]
    UploadVerification {
        source_key: String,
        destination_bucket: String,
        destination_key: String,
        status: u16,
    },
}

impl ThumbnailError {
    pub fn from_store(err: StoreError, bucket: &str, key: &str) -> Self {
        let bucket = bucket.to_string();
        let key = key.to_string();
        match err {
            StoreError::NotFound => Self::ObjectNotFound { bucket, key },
            StoreError::AccessDenied => Self::AccessDenied { bucket, key },
            StoreError::Unavailable(reason) => Self::StorageUnavailable {
                bucket,
                key,
                reason,
            },
        }
    }

    pub fn from_transform(err: TransformError, bucket: &str, key: &str) -> Self {
        let bucket = bucket.to_string();
        let key = key.to_string();
        match err {
            TransformError::Decode(source) => Self::Decode {
                bucket,
                key,
                source,
            },
            TransformError::Encode(source) => Self::Encode {
                bucket,
                key,
                source,
            },
        }
    }

    /// Whether redelivering the same event could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::StorageUnavailable { .. } => true,
            Self::UploadVerification { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

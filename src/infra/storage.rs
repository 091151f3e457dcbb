use anyhow::Result;
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::debug;

use crate::config::AppConfig;
use crate::error::StoreError;

/// Blob store addressed by `(bucket, key)`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError>;

    /// Writes `body` and returns the HTTP status the store answered with.
    /// Transport failures that never produced a status are errors.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<u16, StoreError>;
}

#[derive(Clone)]
pub struct ObjectStorage {
    client: Client,
}

impl ObjectStorage {
    pub async fn new(config: &AppConfig) -> Result<Self> {
        let region_provider = RegionProviderChain::first_try(Region::new(config.s3_region.clone()));
        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;

        let mut s3_builder = aws_sdk_s3::config::Builder::from(&shared_config)
            .region(shared_config.region().cloned())
            .force_path_style(config.s3_force_path_style);
        if let Some(endpoint) = &config.s3_endpoint {
            s3_builder = s3_builder.endpoint_url(endpoint.clone());
        }
        if let Some(provider) = shared_config.credentials_provider() {
            s3_builder = s3_builder.credentials_provider(provider);
        }
        let s3_config = s3_builder.build();

        Ok(Self {
            client: Client::from_conf(s3_config),
        })
    }
}

#[async_trait]
impl BlobStore for ObjectStorage {
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError> {
        let object = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                let not_found = err
                    .as_service_error()
                    .map_or(false, |service_err| service_err.is_no_such_key());
                if not_found {
                    StoreError::NotFound
                } else {
                    classify_sdk_error(&err)
                }
            })?;

        let data = object
            .body
            .collect()
            .await
            .map_err(|err| StoreError::Unavailable(format!("failed to read object body: {}", err)))?
            .into_bytes();

        debug!(bucket, key, bytes = data.len(), "fetched object");
        Ok(data)
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<u16, StoreError> {
        let result = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await;

        match result {
            // The SDK only yields an output for a 2xx response.
            Ok(_) => Ok(200),
            Err(SdkError::ServiceError(service_err)) => {
                let status = service_err.raw().status().as_u16();
                debug!(
                    bucket,
                    key,
                    status,
                    code = service_err.err().code().unwrap_or("unknown"),
                    "store rejected put"
                );
                Ok(status)
            }
            Err(err) => Err(classify_sdk_error(&err)),
        }
    }
}

fn classify_sdk_error<E>(err: &SdkError<E, HttpResponse>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    match err {
        SdkError::ServiceError(service_err) => {
            let code = service_err.err().code().unwrap_or_default();
            let status = service_err.raw().status().as_u16();
            match (code, status) {
                ("NoSuchKey" | "NotFound" | "NoSuchBucket", _) | (_, 404) => StoreError::NotFound,
                ("AccessDenied" | "Forbidden" | "InvalidAccessKeyId", _) | (_, 403) => {
                    StoreError::AccessDenied
                }
                _ => StoreError::Unavailable(format!(
                    "status {} {}: {}",
                    status,
                    code,
                    service_err.err().message().unwrap_or("no message")
                )),
            }
        }
        SdkError::TimeoutError(_) => StoreError::Unavailable("request timed out".to_string()),
        SdkError::DispatchFailure(_) => StoreError::Unavailable("dispatch failure".to_string()),
        other => StoreError::Unavailable(format!("{:?}", other)),
    }
}

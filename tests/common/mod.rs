#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, RgbImage, Rgba, RgbaImage};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thumbnailer::app::thumbnails::{InvocationContext, ThumbnailService};
use thumbnailer::domain::thumbnail::{ExtensionPolicy, ThumbnailSpec};
use thumbnailer::error::StoreError;
use thumbnailer::infra::storage::BlobStore;

pub const SOURCE_BUCKET: &str = "uploads";
pub const DESTINATION_BUCKET: &str = "uploads-thumbnails";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Get { bucket: String, key: String },
    Put { bucket: String, key: String, content_type: String },
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: String,
}

/// In-memory blob store that records every call and can be told to fail.
pub struct MemoryStore {
    objects: Mutex<HashMap<(String, String), StoredObject>>,
    calls: Mutex<Vec<StoreCall>>,
    get_failure: Mutex<Option<StoreError>>,
    put_failure: Mutex<Option<StoreError>>,
    put_status: Mutex<u16>,
    get_delay: Mutex<Option<Duration>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            objects: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            get_failure: Mutex::new(None),
            put_failure: Mutex::new(None),
            put_status: Mutex::new(200),
            get_delay: Mutex::new(None),
        })
    }

    pub fn insert(&self, bucket: &str, key: &str, body: Vec<u8>) {
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body: Bytes::from(body),
                content_type: "application/octet-stream".to_string(),
            },
        );
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn object_count(&self, bucket: &str) -> usize {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, _)| b == bucket)
            .count()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn put_calls(&self) -> Vec<StoreCall> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, StoreCall::Put { .. }))
            .collect()
    }

    pub fn fail_get(&self, err: StoreError) {
        *self.get_failure.lock().unwrap() = Some(err);
    }

    pub fn fail_put(&self, err: StoreError) {
        *self.put_failure.lock().unwrap() = Some(err);
    }

    pub fn respond_to_put_with(&self, status: u16) {
        *self.put_status.lock().unwrap() = status;
    }

    pub fn delay_get(&self, delay: Duration) {
        *self.get_delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError> {
        self.calls.lock().unwrap().push(StoreCall::Get {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });

        let delay = *self.get_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.get_failure.lock().unwrap().clone() {
            return Err(err);
        }

        self.object(bucket, key)
            .map(|object| object.body)
            .ok_or(StoreError::NotFound)
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<u16, StoreError> {
        self.calls.lock().unwrap().push(StoreCall::Put {
            bucket: bucket.to_string(),
            key: key.to_string(),
            content_type: content_type.to_string(),
        });

        if let Some(err) = self.put_failure.lock().unwrap().clone() {
            return Err(err);
        }

        let status = *self.put_status.lock().unwrap();
        if (200..300).contains(&status) {
            self.objects.lock().unwrap().insert(
                (bucket.to_string(), key.to_string()),
                StoredObject {
                    body,
                    content_type: content_type.to_string(),
                },
            );
        }
        Ok(status)
    }
}

pub fn service(store: &Arc<MemoryStore>) -> ThumbnailService {
    service_with(store, ExtensionPolicy::Preserve, Duration::from_secs(30))
}

pub fn service_with(
    store: &Arc<MemoryStore>,
    policy: ExtensionPolicy,
    timeout: Duration,
) -> ThumbnailService {
    ThumbnailService::new(
        store.clone(),
        DESTINATION_BUCKET.to_string(),
        ThumbnailSpec::default(),
        policy,
        timeout,
    )
}

pub fn ctx() -> InvocationContext {
    InvocationContext::new("test-invocation")
}

/// Storage notification with one record per key.
pub fn s3_event(bucket: &str, keys: &[&str]) -> Value {
    let records: Vec<Value> = keys
        .iter()
        .map(|key| {
            json!({
                "eventSource": "aws:s3",
                "eventName": "ObjectCreated:Put",
                "s3": {
                    "bucket": { "name": bucket },
                    "object": { "key": key, "size": 1024 }
                }
            })
        })
        .collect();
    json!({ "Records": records })
}

pub fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), format)
        .expect("failed to encode test image");
    buffer
}

/// Opaque gradient so resampling has something to work on.
pub fn rgb_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    encode(rgb_image(width, height), ImageFormat::Png)
}

pub fn transparent_png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
    encode(DynamicImage::ImageRgba8(image), ImageFormat::Png)
}

pub fn decode(bytes: &[u8]) -> DynamicImage {
    image::load_from_memory(bytes).expect("thumbnail should decode")
}

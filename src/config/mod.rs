use anyhow::{anyhow, Result};
use std::str::FromStr;

use crate::domain::thumbnail::{ExtensionPolicy, ThumbnailSpec};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub app_mode: String,
    pub destination_bucket: String,
    pub thumbnail_max_width: u32,
    pub thumbnail_max_height: u32,
    pub jpeg_quality: u8,
    pub key_extension: ExtensionPolicy,
    pub invocation_timeout_seconds: u64,
    pub s3_endpoint: Option<String>,
    pub s3_region: String,
    pub s3_force_path_style: bool,
    pub queue_endpoint: Option<String>,
    pub queue_region: String,
    pub queue_name: Option<String>,
    pub event_path: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let app_mode = env_or("APP_MODE", "worker");
        let s3_region = env_or("S3_REGION", "us-east-1");
        let queue_region = std::env::var("QUEUE_REGION").unwrap_or_else(|_| s3_region.clone());

        let config = Self {
            app_mode,
            destination_bucket: env_or_err("DESTINATION_BUCKET")?,
            thumbnail_max_width: env_or_parse("THUMBNAIL_MAX_WIDTH", "500")?,
            thumbnail_max_height: env_or_parse("THUMBNAIL_MAX_HEIGHT", "500")?,
            jpeg_quality: env_or_parse("THUMBNAIL_JPEG_QUALITY", "75")?,
            key_extension: env_or_parse("THUMBNAIL_KEY_EXTENSION", "preserve")?,
            invocation_timeout_seconds: env_or_parse("INVOCATION_TIMEOUT_SECONDS", "60")?,
            s3_endpoint: std::env::var("S3_ENDPOINT").ok(),
            s3_region,
            s3_force_path_style: env_or_parse("S3_FORCE_PATH_STYLE", "false")?,
            queue_endpoint: std::env::var("QUEUE_ENDPOINT").ok(),
            queue_region,
            queue_name: std::env::var("QUEUE_NAME").ok(),
            event_path: std::env::var("EVENT_PATH").ok(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.destination_bucket.trim().is_empty() {
            return Err(anyhow!("invalid DESTINATION_BUCKET: must not be empty"));
        }
        if self.thumbnail_max_width == 0 || self.thumbnail_max_height == 0 {
            return Err(anyhow!("invalid thumbnail bounding box: dimensions must be greater than 0"));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(anyhow!("invalid THUMBNAIL_JPEG_QUALITY: expected 1..=100"));
        }
        if self.invocation_timeout_seconds == 0 {
            return Err(anyhow!("invalid INVOCATION_TIMEOUT_SECONDS: must be greater than 0"));
        }
        if self.app_mode == "worker" && self.queue_name.is_none() {
            return Err(anyhow!("missing required env var: QUEUE_NAME"));
        }
        Ok(())
    }

    pub fn thumbnail_spec(&self) -> ThumbnailSpec {
        ThumbnailSpec {
            max_width: self.thumbnail_max_width,
            max_height: self.thumbnail_max_height,
            jpeg_quality: self.jpeg_quality,
            ..ThumbnailSpec::default()
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_err(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("missing required env var: {}", key))
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}

//! S3-backed uploader for logs and rendered reports.

use super::Uploader;
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::path::Path;
use tracing::info;

/// Object-storage settings, environment-driven like the rest of the run
/// context. A custom endpoint selects an S3-compatible store.
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub bucket: String,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub force_path_style: bool,
}

impl S3Settings {
    pub fn from_env() -> Self {
        S3Settings {
            bucket: std::env::var("S3_TEST_REPORTS_BUCKET")
                .unwrap_or_else(|_| "test-reports".to_string()),
            region: std::env::var("AWS_REGION").ok(),
            endpoint: std::env::var("S3_URL").ok(),
            force_path_style: std::env::var("S3_FORCE_PATH_STYLE").is_ok(),
        }
    }
}

/// Uploader backed by an S3 (or S3-compatible) bucket.
pub struct S3Uploader {
    client: Client,
    bucket: String,
    public_base: String,
}

impl S3Uploader {
    /// Build the client from ambient AWS configuration plus our settings.
    pub async fn new(settings: &S3Settings) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &settings.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let shared = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &settings.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        if settings.force_path_style {
            builder = builder.force_path_style(true);
        }
        let client = Client::from_conf(builder.build());

        S3Uploader {
            client,
            bucket: settings.bucket.clone(),
            public_base: public_base(settings),
        }
    }
}

/// Public URL prefix objects become reachable under. Virtual-hosted AWS
/// addressing by default; path-style under a custom endpoint.
fn public_base(settings: &S3Settings) -> String {
    match &settings.endpoint {
        Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), settings.bucket),
        None => format!("https://{}.s3.amazonaws.com", settings.bucket),
    }
}

#[async_trait]
impl Uploader for S3Uploader {
    async fn upload(&self, local: &Path, key: &str) -> Result<String> {
        let body = ByteStream::from_path(local)
            .await
            .with_context(|| format!("cannot open {} for upload", local.display()))?;

        let content_type = if key.ends_with(".html") {
            "text/html; charset=utf-8"
        } else {
            "text/plain; charset=utf-8"
        };

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .with_context(|| {
                format!(
                    "cannot upload {} to s3://{}/{}",
                    local.display(),
                    self.bucket,
                    key
                )
            })?;

        info!(%key, "Uploaded to object storage");
        Ok(format!("{}/{}", self.public_base, key))
    }
}

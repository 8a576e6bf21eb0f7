//! Picks the cheapest encoding that keeps a response under the size limit.
//!
//! Responses are returned inline when they fit, gzipped and base64 encoded
//! when that fits, and otherwise uploaded to S3 with a pre-signed URL
//! returned in their place.

use anyhow::Context;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::codec::{Codec, GzipCodec};
use crate::error::EnvelopeError;
use crate::response::{Encoding, Response};
use crate::store::ObjectStore;

/// Lambda's synchronous response payload limit (6 MiB).
pub const DEFAULT_THRESHOLD: usize = 6_291_456;
pub const DEFAULT_URL_TTL: Duration = Duration::from_secs(30);

pub const BUCKET_ENV: &str = "ENVELOPE_BUCKET";
pub const THRESHOLD_ENV: &str = "ENVELOPE_THRESHOLD";
pub const URL_TTL_ENV: &str = "ENVELOPE_URL_TTL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderConfig {
    /// Bucket that oversized responses are uploaded to.
    pub bucket: String,
    /// Largest envelope, in bytes, returned inline or gzipped.
    pub threshold: usize,
    /// How long a pre-signed URL stays valid.
    pub url_ttl: Duration,
}

impl BuilderConfig {
    pub fn new(bucket: impl Into<String>) -> Self {
        BuilderConfig {
            bucket: bucket.into(),
            threshold: DEFAULT_THRESHOLD,
            url_ttl: DEFAULT_URL_TTL,
        }
    }

    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_url_ttl(mut self, url_ttl: Duration) -> Self {
        self.url_ttl = url_ttl;
        self
    }

    /// Reads `ENVELOPE_BUCKET`, `ENVELOPE_THRESHOLD` and `ENVELOPE_URL_TTL`
    /// (seconds).
    pub fn from_env() -> Result<Self, anyhow::Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, anyhow::Error> {
        let bucket = lookup(BUCKET_ENV)
            .with_context(|| format!("{} is required but not set", BUCKET_ENV))?;
        let mut config = BuilderConfig::new(bucket);

        if let Some(threshold) = lookup(THRESHOLD_ENV) {
            config.threshold = threshold
                .parse()
                .with_context(|| format!("parsing {}={}", THRESHOLD_ENV, threshold))?;
        }

        if let Some(ttl) = lookup(URL_TTL_ENV) {
            let secs: u64 = ttl
                .parse()
                .with_context(|| format!("parsing {}={}", URL_TTL_ENV, ttl))?;
            config.url_ttl = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

pub struct ResponseBuilder {
    config: BuilderConfig,
    store: Arc<dyn ObjectStore>,
    codec: Arc<dyn Codec>,
}

impl ResponseBuilder {
    pub fn new(
        config: BuilderConfig,
        store: Arc<dyn ObjectStore>,
    ) -> Result<ResponseBuilder, EnvelopeError> {
        if config.bucket.is_empty() {
            return Err(EnvelopeError::MissingBucket());
        }

        Ok(ResponseBuilder {
            config,
            store,
            codec: Arc::new(GzipCodec::default()),
        })
    }

    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Size of the response exactly as it goes over the wire.
    pub fn byte_size(response: &Response) -> usize {
        response.byte_len()
    }

    /// Builds the smallest envelope for `response` that fits the threshold,
    /// falling back to S3 when neither the raw nor the gzipped form does.
    pub async fn build(&self, response: impl Into<Response>) -> Result<Response, EnvelopeError> {
        let response = self.raw(response);

        let size = Self::byte_size(&response);
        if size <= self.config.threshold {
            log::debug!(
                "returning response inline, size={}, threshold={}",
                size,
                self.config.threshold
            );
            return Ok(response);
        }

        let compressed = self.compressed(&response)?;
        let compressed_size = Self::byte_size(&compressed);
        if compressed_size <= self.config.threshold {
            log::info!(
                "returning gzip response, size={}, compressed_size={}, threshold={}",
                size,
                compressed_size,
                self.config.threshold
            );
            return Ok(compressed);
        }

        log::info!(
            "uploading response to s3, size={}, compressed_size={}, threshold={}",
            size,
            compressed_size,
            self.config.threshold
        );
        self.stored(&response).await
    }

    pub fn raw(&self, response: impl Into<Response>) -> Response {
        response.into()
    }

    /// The gzip envelope: base64 of the gzipped JSON of the whole response.
    pub fn compressed(&self, response: &Response) -> Result<Response, EnvelopeError> {
        let compressed = self
            .codec
            .compress(response.to_string().as_bytes())
            .map_err(EnvelopeError::Compression)?;

        Ok(Response::from_parts(
            response.status_code(),
            Encoding::Gzip,
            Value::String(STANDARD.encode(compressed)),
        ))
    }

    /// Uploads the response JSON under a fresh key and returns the s3
    /// envelope pointing at it.
    pub async fn stored(&self, response: &Response) -> Result<Response, EnvelopeError> {
        let key = Uuid::new_v4().to_string();

        self.store
            .put(&self.config.bucket, &key, response.to_string().into_bytes())
            .await
            .map_err(EnvelopeError::StorageUpload)?;

        let url = self
            .store
            .presign_get(&self.config.bucket, &key, self.config.url_ttl)
            .await
            .map_err(EnvelopeError::Presign)?;

        log::debug!("stored response at {}/{}", self.config.bucket, key);

        Ok(Response::from_parts(
            response.status_code(),
            Encoding::S3,
            Value::String(url),
        ))
    }
}

use anyhow::{anyhow, Context};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::sync::Arc;

use crate::codec::{Codec, GzipCodec};
use crate::error::EnvelopeError;
use crate::http::HttpFetcher;
use crate::normalize::RawInvocationResult;
use crate::response::{Encoding, Response};
use crate::store::Fetcher;

/// Reverses whichever encoding a [`crate::ResponseBuilder`] picked.
pub struct ResponseResolver {
    fetcher: Arc<dyn Fetcher>,
    codec: Arc<dyn Codec>,
}

impl Default for ResponseResolver {
    fn default() -> Self {
        ResponseResolver::new(Arc::new(HttpFetcher::new()))
    }
}

impl ResponseResolver {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        ResponseResolver {
            fetcher,
            codec: Arc::new(GzipCodec::default()),
        }
    }

    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    /// Normalizes a raw invocation result and resolves the envelope it
    /// carries.
    pub async fn from_raw_result(
        &self,
        raw: &RawInvocationResult,
    ) -> Result<Response, EnvelopeError> {
        let envelope = Response::from_raw_result(raw)?;
        self.resolve(envelope).await
    }

    pub async fn resolve(&self, envelope: Response) -> Result<Response, EnvelopeError> {
        match envelope.encoding() {
            Encoding::Identity => Ok(envelope),
            Encoding::Gzip => self.decompress(&envelope),
            Encoding::S3 => self.fetch(&envelope).await,
        }
    }

    /// Decodes a gzip envelope back into the response it wraps.
    pub fn decompress(&self, envelope: &Response) -> Result<Response, EnvelopeError> {
        let text = envelope
            .body()
            .as_str()
            .ok_or_else(|| anyhow!("compressed body is not a string"))
            .map_err(EnvelopeError::Decompression)?;

        let compressed = STANDARD
            .decode(text)
            .context("decoding base64 body")
            .map_err(EnvelopeError::Decompression)?;

        let decompressed = self
            .codec
            .decompress(&compressed)
            .map_err(EnvelopeError::Decompression)?;

        serde_json::from_slice(&decompressed)
            .context("decoding decompressed response")
            .map_err(EnvelopeError::Decompression)
    }

    /// Downloads the response an s3 envelope points at.
    pub async fn fetch(&self, envelope: &Response) -> Result<Response, EnvelopeError> {
        let url = envelope
            .body()
            .as_str()
            .ok_or_else(|| anyhow!("s3 body is not a url"))
            .map_err(EnvelopeError::RemoteFetch)?;

        let bytes = self
            .fetcher
            .get(url)
            .await
            .map_err(EnvelopeError::RemoteFetch)?;

        log::debug!("fetched stored response, size={}", bytes.len());

        serde_json::from_slice(&bytes)
            .context("decoding stored response")
            .map_err(EnvelopeError::RemoteFetch)
    }
}

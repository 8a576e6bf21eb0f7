use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use aws_types::sdk_config;
use std::time::Duration;

use crate::store::ObjectStore;

/// [`ObjectStore`] backed by S3.
#[derive(Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    pub fn new(config: &sdk_config::SdkConfig) -> S3Store {
        S3Store {
            client: Client::new(config),
        }
    }

    pub fn from_client(client: Client) -> S3Store {
        S3Store { client }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), anyhow::Error> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type("application/json")
            .body(ByteStream::from(body))
            .send()
            .await
            .with_context(|| format!("failed to put object {}/{}", bucket, key))?;

        Ok(())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> Result<String, anyhow::Error> {
        let presigning = PresigningConfig::expires_in(ttl)
            .with_context(|| format!("invalid url ttl {}s", ttl.as_secs()))?;

        let req = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .with_context(|| format!("failed to presign object {}/{}", bucket, key))?;

        Ok(req.uri().to_string())
    }
}

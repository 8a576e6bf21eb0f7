use anyhow::{anyhow, Context};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

/// Object storage used by the s3 tier.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), anyhow::Error>;

    /// A read-only URL for the object that stays valid for `ttl`.
    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> Result<String, anyhow::Error>;
}

/// Reads back whatever a pre-signed URL points at.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &str) -> Result<Vec<u8>, anyhow::Error>;
}

const MEMORY_SCHEME: &str = "memory://";

/// An in-process store handing out `memory://bucket/key` URLs. It is both
/// the [`ObjectStore`] and the [`Fetcher`] for those URLs.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub async fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.lock().await.is_empty()
    }
}

fn parse_memory_url(url: &str) -> Result<(&str, &str), anyhow::Error> {
    let rest = url
        .strip_prefix(MEMORY_SCHEME)
        .ok_or_else(|| anyhow!("unsupported url {}", url))?;
    let path = rest.split('?').next().unwrap_or(rest);
    path.split_once('/')
        .filter(|(bucket, key)| !bucket.is_empty() && !key.is_empty())
        .ok_or_else(|| anyhow!("url {} has no bucket and key", url))
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), anyhow::Error> {
        self.objects
            .lock()
            .await
            .insert((bucket.to_string(), key.to_string()), body);
        Ok(())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> Result<String, anyhow::Error> {
        Ok(format!(
            "{}{}/{}?X-Amz-Expires={}",
            MEMORY_SCHEME,
            bucket,
            key,
            ttl.as_secs()
        ))
    }
}

#[async_trait]
impl Fetcher for MemoryStore {
    async fn get(&self, url: &str) -> Result<Vec<u8>, anyhow::Error> {
        let (bucket, key) = parse_memory_url(url)?;
        self.object(bucket, key)
            .await
            .with_context(|| format!("no object stored at {}", url))
    }
}

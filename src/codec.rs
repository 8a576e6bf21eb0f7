//! Compression used by the gzip tier.

use anyhow::Context;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Default gzip level (range: 0-9)
pub const DEFAULT_GZIP_LEVEL: u32 = 6;

/// A compression codec. `decompress` must invert `compress` exactly.
pub trait Codec: Send + Sync {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, anyhow::Error>;
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, anyhow::Error>;
}

#[derive(Debug, Clone, Copy)]
pub struct GzipCodec {
    level: u32,
}

impl GzipCodec {
    pub fn new(level: u32) -> Self {
        GzipCodec {
            level: level.clamp(0, 9),
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }
}

impl Default for GzipCodec {
    fn default() -> Self {
        GzipCodec::new(DEFAULT_GZIP_LEVEL)
    }
}

impl Codec for GzipCodec {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, anyhow::Error> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::new(self.level));
        encoder.write_all(data).context("gzip compression failed")?;
        encoder.finish().context("gzip finish failed")
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, anyhow::Error> {
        let mut decoder = GzDecoder::new(data);
        let mut output = Vec::new();
        decoder
            .read_to_end(&mut output)
            .context("gzip decompression failed")?;
        Ok(output)
    }
}

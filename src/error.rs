use anyhow::Error;

/// Failures surfaced by the normalize, build and resolve pipelines.
///
/// Every variant carries the underlying cause; `{0:#}` renders the whole
/// context chain so the upstream diagnostic survives into logs.
#[derive(thiserror::Error, Debug)]
pub enum EnvelopeError {
    #[error("failed to parse response payload: {0:#}")]
    PayloadParse(Error),
    #[error("failed to compress response: {0:#}")]
    Compression(Error),
    #[error("failed to parse compressed response: {0:#}")]
    Decompression(Error),
    #[error("failed to upload response object to S3: {0:#}")]
    StorageUpload(Error),
    #[error("failed to generate S3 pre-signed url: {0:#}")]
    Presign(Error),
    #[error("failed to parse s3 response: {0:#}")]
    RemoteFetch(Error),
    #[error("bucket is required")]
    MissingBucket(),
}

impl EnvelopeError {
    /// The wrapped cause, if this failure has one.
    pub fn cause(&self) -> Option<&Error> {
        match self {
            EnvelopeError::PayloadParse(e)
            | EnvelopeError::Compression(e)
            | EnvelopeError::Decompression(e)
            | EnvelopeError::StorageUpload(e)
            | EnvelopeError::Presign(e)
            | EnvelopeError::RemoteFetch(e) => Some(e),
            EnvelopeError::MissingBucket() => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_display_keeps_cause_chain() {
        let cause = Err::<(), _>(anyhow::anyhow!("upload error"))
            .context("putting object")
            .unwrap_err();
        let err = EnvelopeError::StorageUpload(cause);

        let text = err.to_string();
        assert!(text.starts_with("failed to upload response object to S3"));
        assert!(text.contains("putting object"));
        assert!(text.contains("upload error"));
    }

    #[test]
    fn test_cause_is_exposed() {
        let err = EnvelopeError::RemoteFetch(anyhow::anyhow!("resource not found"));
        let cause = err.cause().expect("remote fetch has a cause");
        assert_eq!(cause.root_cause().to_string(), "resource not found");

        assert!(EnvelopeError::MissingBucket().cause().is_none());
    }
}

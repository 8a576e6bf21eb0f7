use anyhow::Context;
use async_trait::async_trait;
use reqwest::{header, Client};
use tokio::sync::OnceCell;

use crate::store::Fetcher;

/// Fetches pre-signed URLs over HTTPS.
#[derive(Clone, Default)]
pub struct HttpFetcher {
    client: Option<Client>,
}

impl HttpFetcher {
    /// Uses the process-wide shared client.
    pub fn new() -> Self {
        HttpFetcher { client: None }
    }

    pub fn with_client(client: Client) -> Self {
        HttpFetcher {
            client: Some(client),
        }
    }

    async fn client(&self) -> &Client {
        static SHARED: OnceCell<Client> = OnceCell::const_new();

        match &self.client {
            Some(client) => client,
            None => SHARED.get_or_init(|| async { Client::new() }).await,
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str) -> Result<Vec<u8>, anyhow::Error> {
        let res = self
            .client()
            .await
            .get(url)
            .header(header::USER_AGENT, "lambda-envelope")
            .send()
            .await
            .context("sending stored response request")?;

        let status = res.status();
        if !status.is_success() {
            let text = res
                .text()
                .await
                .unwrap_or_else(|_| "no error message".to_string());

            log::warn!(
                "fetching stored response, status={}, text={}",
                status.as_u16(),
                text
            );
            return Err(anyhow::anyhow!(
                "stored response request failed, status={}, text={}",
                status.as_u16(),
                text
            ));
        }

        let body = res
            .bytes()
            .await
            .context("reading stored response body")?;
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/test-bucket/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_string("stored"))
            .expect(1)
            .mount(&server)
            .await;

        let body = HttpFetcher::new()
            .get(&format!("{}/test-bucket/abc", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, b"stored".to_vec());
    }

    #[tokio::test]
    async fn test_default_fetchers_share_one_client() {
        let first = HttpFetcher::new();
        let second = HttpFetcher::default();
        assert!(std::ptr::eq(first.client().await, second.client().await));

        let own = HttpFetcher::with_client(Client::new());
        assert!(!std::ptr::eq(own.client().await, first.client().await));
    }

    #[tokio::test]
    async fn test_get_fails_on_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Request has expired"))
            .mount(&server)
            .await;

        let err = HttpFetcher::with_client(Client::new())
            .get(&format!("{}/test-bucket/abc", server.uri()))
            .await
            .unwrap_err();
        let text = format!("{:#}", err);
        assert!(text.contains("status=403"));
        assert!(text.contains("Request has expired"));
    }

    #[tokio::test]
    async fn test_get_fails_on_transport_error() {
        let err = HttpFetcher::with_client(Client::new())
            .get("http://127.0.0.1:1/unreachable")
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("sending stored response request"));
    }
}

//! ImgBB client: multipart upload with bounded timeout and retry.
//!
//! The wire contract is fixed by the third party: a form POST with a `key`
//! text field (the API key) and an `image` file part, answered by a JSON
//! envelope carrying `data.url` and a `success` boolean.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::sleep;

use vitrine_core::{PipelineConfig, UploadError};
use vitrine_processing::WebpImage;

use crate::host::ImageHost;

/// HTTP client for an ImgBB-compatible image host.
pub struct ImgbbClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    retry_count: u32,
    retry_wait: Duration,
}

/// Per-attempt failure, split by whether another attempt is worthwhile.
enum AttemptError {
    /// Connection-level failure; retried.
    Transport(String),
    /// Server-side status (5xx/429); retried.
    RemoteRetryable(u16),
    /// Final for the job; surfaced as-is.
    Fatal(UploadError),
}

#[derive(Debug, Deserialize)]
struct ImgbbResponse {
    #[serde(default)]
    data: Option<ImgbbData>,
    #[serde(default)]
    success: bool,
}

#[derive(Debug, Deserialize)]
struct ImgbbData {
    #[serde(default)]
    url: Option<String>,
}

impl ImgbbClient {
    /// Build a client from pipeline configuration. The request timeout covers
    /// the whole of each attempt (connect, send, read).
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to create HTTP client for image host")?;

        Ok(Self {
            http,
            endpoint: config.upload_endpoint.clone(),
            api_key: config.api_key.clone(),
            retry_count: config.retry_count,
            retry_wait: Duration::from_millis(config.retry_wait_ms),
        })
    }

    async fn try_upload(&self, api_key: &str, image: &WebpImage) -> Result<String, AttemptError> {
        let part = reqwest::multipart::Part::bytes(image.data.to_vec())
            .file_name(image.filename.clone());
        let form = reqwest::multipart::Form::new()
            .text("key", api_key.to_string())
            .part("image", part);

        let response = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AttemptError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            if status.is_server_error() || status.as_u16() == 429 {
                return Err(AttemptError::RemoteRetryable(status.as_u16()));
            }
            // Retrying a client error is not meaningful.
            return Err(AttemptError::Fatal(UploadError::Remote {
                status: status.as_u16(),
            }));
        }

        let envelope: ImgbbResponse = response
            .json()
            .await
            .map_err(|_| AttemptError::Fatal(UploadError::ResponseParse))?;

        if !envelope.success {
            return Err(AttemptError::Fatal(UploadError::ResponseParse));
        }

        envelope
            .data
            .and_then(|d| d.url)
            .filter(|url| !url.is_empty())
            .ok_or(AttemptError::Fatal(UploadError::ResponseParse))
    }
}

#[async_trait]
impl ImageHost for ImgbbClient {
    async fn upload(&self, image: &WebpImage) -> Result<String, UploadError> {
        // Fail fast before touching the network.
        let api_key = self.api_key.as_deref().ok_or(UploadError::MissingApiKey)?;

        let max_attempts = self.retry_count + 1;
        let mut attempt = 1;
        loop {
            let detail = match self.try_upload(api_key, image).await {
                Ok(url) => {
                    tracing::debug!(filename = %image.filename, url = %url, "Image uploaded");
                    return Ok(url);
                }
                Err(AttemptError::Fatal(e)) => return Err(e),
                Err(AttemptError::Transport(message)) => {
                    if attempt >= max_attempts {
                        return Err(UploadError::Transport {
                            message,
                            attempts: attempt,
                        });
                    }
                    message
                }
                Err(AttemptError::RemoteRetryable(status)) => {
                    if attempt >= max_attempts {
                        return Err(UploadError::Remote { status });
                    }
                    format!("status {status}")
                }
            };

            tracing::warn!(
                filename = %image.filename,
                attempt,
                max_attempts,
                error = %detail,
                "Upload attempt failed, retrying"
            );

            sleep(self.retry_wait).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use mockito::Matcher;

    fn test_image() -> WebpImage {
        WebpImage {
            data: Bytes::from_static(b"webp-payload"),
            filename: "photo.webp".to_string(),
        }
    }

    fn test_config(endpoint: String, api_key: Option<&str>) -> PipelineConfig {
        PipelineConfig {
            upload_endpoint: endpoint,
            api_key: api_key.map(str::to_string),
            retry_wait_ms: 10,
            ..PipelineConfig::default()
        }
    }

    #[tokio::test]
    async fn test_upload_success_extracts_url() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("name=\"key\"".to_string()),
                Matcher::Regex("test-key".to_string()),
                Matcher::Regex("name=\"image\"".to_string()),
                Matcher::Regex("filename=\"photo.webp\"".to_string()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":{"url":"https://i.example/abc.webp"},"success":true}"#)
            .create_async()
            .await;

        let client = ImgbbClient::new(&test_config(server.url(), Some("test-key"))).unwrap();
        let url = client.upload(&test_image()).await.unwrap();

        assert_eq!(url, "https://i.example/abc.webp");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_api_key_makes_no_network_call() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/").expect(0).create_async().await;

        let client = ImgbbClient::new(&test_config(server.url(), None)).unwrap();
        let err = client.upload(&test_image()).await.unwrap_err();

        assert_eq!(err, UploadError::MissingApiKey);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_error_fails_without_retry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .with_status(400)
            .expect(1)
            .create_async()
            .await;

        let client = ImgbbClient::new(&test_config(server.url(), Some("k"))).unwrap();
        let err = client.upload(&test_image()).await.unwrap_err();

        assert_eq!(err, UploadError::Remote { status: 400 });
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_retried_then_surfaced() {
        let mut server = mockito::Server::new_async().await;
        // 2 retries = 3 attempts total
        let mock = server
            .mock("POST", "/")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let client = ImgbbClient::new(&test_config(server.url(), Some("k"))).unwrap();
        let err = client.upload(&test_image()).await.unwrap_err();

        assert_eq!(err, UploadError::Remote { status: 503 });
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_connection_failure_surfaces_transport_after_retries() {
        // Nothing listens here; every attempt is a connection error.
        let config = test_config("http://127.0.0.1:1".to_string(), Some("k"));
        let client = ImgbbClient::new(&config).unwrap();

        let err = client.upload(&test_image()).await.unwrap_err();
        match err {
            UploadError::Transport { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_success_without_url_is_parse_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":{},"success":true}"#)
            .expect(1)
            .create_async()
            .await;

        let client = ImgbbClient::new(&test_config(server.url(), Some("k"))).unwrap();
        let err = client.upload(&test_image()).await.unwrap_err();

        assert_eq!(err, UploadError::ResponseParse);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_parse_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_body("not json at all")
            .create_async()
            .await;

        let client = ImgbbClient::new(&test_config(server.url(), Some("k"))).unwrap();
        let err = client.upload(&test_image()).await.unwrap_err();

        assert_eq!(err, UploadError::ResponseParse);
    }
}

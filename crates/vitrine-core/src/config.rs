//! Configuration module
//!
//! Environment-driven settings for the upload pipeline. Every field has a
//! default so a bare environment still yields a working pipeline; the image
//! host API key is the one value with no sensible default and stays `None`
//! until provided.

use std::env;

// Defaults
const DEFAULT_MAX_WORKERS: usize = 5;
const DEFAULT_QUEUE_CAPACITY: usize = 100;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRY_COUNT: u32 = 2;
const DEFAULT_RETRY_WAIT_MS: u64 = 1000;
const DEFAULT_BATCH_TIMEOUT_SECS: u64 = 600;

/// WebP encoding quality (0-100 scale). 80 balances file size and quality.
pub const DEFAULT_WEBP_QUALITY: f32 = 80.0;

/// ImgBB upload endpoint. Overridable so tests can point at a local mock.
pub const DEFAULT_UPLOAD_ENDPOINT: &str = "https://api.imgbb.com/1/upload";

/// Upload pipeline configuration
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Number of capacity tokens: simultaneous transcode+upload executions.
    pub max_workers: usize,
    /// Bounded job queue capacity. Enqueueing blocks once full (backpressure).
    pub queue_capacity: usize,
    /// WebP encoding quality, 0-100.
    pub webp_quality: f32,
    /// Image host endpoint for multipart uploads.
    pub upload_endpoint: String,
    /// Image host API key. Jobs fail with a config error when absent.
    pub api_key: Option<String>,
    /// Total timeout for one upload HTTP request.
    pub request_timeout_secs: u64,
    /// Automatic retries after the first upload attempt.
    pub retry_count: u32,
    /// Fixed wait between upload retries.
    pub retry_wait_ms: u64,
    /// Upper bound on one batch's synchronous wait.
    pub batch_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            webp_quality: DEFAULT_WEBP_QUALITY,
            upload_endpoint: DEFAULT_UPLOAD_ENDPOINT.to_string(),
            api_key: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            retry_count: DEFAULT_RETRY_COUNT,
            retry_wait_ms: DEFAULT_RETRY_WAIT_MS,
            batch_timeout_secs: DEFAULT_BATCH_TIMEOUT_SECS,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from the environment (reading `.env` if present),
    /// falling back to defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            max_workers: parse_env("UPLOAD_MAX_WORKERS", DEFAULT_MAX_WORKERS),
            queue_capacity: parse_env("UPLOAD_QUEUE_CAPACITY", DEFAULT_QUEUE_CAPACITY),
            webp_quality: parse_env("UPLOAD_WEBP_QUALITY", DEFAULT_WEBP_QUALITY),
            upload_endpoint: env::var("UPLOAD_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_UPLOAD_ENDPOINT.to_string()),
            api_key: env::var("IMGBB_API_KEY").ok().filter(|k| !k.is_empty()),
            request_timeout_secs: parse_env(
                "UPLOAD_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            ),
            retry_count: parse_env("UPLOAD_RETRY_COUNT", DEFAULT_RETRY_COUNT),
            retry_wait_ms: parse_env("UPLOAD_RETRY_WAIT_MS", DEFAULT_RETRY_WAIT_MS),
            batch_timeout_secs: parse_env("UPLOAD_BATCH_TIMEOUT_SECS", DEFAULT_BATCH_TIMEOUT_SECS),
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_workers, 5);
        assert_eq!(config.queue_capacity, 100);
        assert_eq!(config.webp_quality, 80.0);
        assert_eq!(config.upload_endpoint, DEFAULT_UPLOAD_ENDPOINT);
        assert!(config.api_key.is_none());
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.retry_count, 2);
        assert_eq!(config.retry_wait_ms, 1000);
        assert_eq!(config.batch_timeout_secs, 600);
    }

    #[test]
    fn test_parse_env_falls_back_on_garbage() {
        // Unset variable
        assert_eq!(parse_env("VITRINE_TEST_UNSET_VAR", 7usize), 7);
    }
}

//! Per-job error taxonomy for the upload pipeline.
//!
//! Every failure mode a single transcode+upload job can hit is a variant here,
//! so callers branch on kind instead of matching message strings. Payloads are
//! plain data (messages, status codes, attempt counts) to keep the enum `Clone`
//! and serializable into API responses.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UploadError {
    /// Input bytes were not recognizable as a supported raster image.
    #[error("failed to decode image: {message}")]
    Decode { message: String },

    /// The decoded image could not be encoded to the target codec.
    #[error("failed to encode to WebP: {message}")]
    Encode { message: String },

    /// The image host credential is not configured. No network call is made.
    #[error("image host API key not configured")]
    MissingApiKey,

    /// Network-level failure talking to the image host, after retries.
    #[error("upload failed after {attempts} attempts: {message}")]
    Transport { message: String, attempts: u32 },

    /// The image host answered with a non-success status, after any retries.
    #[error("upload failed with status {status}")]
    Remote { status: u16 },

    /// The host reported success but the response carried no usable URL.
    #[error("URL not found in upload response")]
    ResponseParse,
}

impl UploadError {
    /// Machine-readable error code for API responses and logs.
    pub fn code(&self) -> &'static str {
        match self {
            UploadError::Decode { .. } => "DECODE_ERROR",
            UploadError::Encode { .. } => "ENCODE_ERROR",
            UploadError::MissingApiKey => "CONFIG_ERROR",
            UploadError::Transport { .. } => "TRANSPORT_ERROR",
            UploadError::Remote { .. } => "REMOTE_ERROR",
            UploadError::ResponseParse => "RESPONSE_PARSE_ERROR",
        }
    }

    /// Whether resubmitting the same job could plausibly succeed.
    /// Decode/encode/config/parse failures are deterministic; only a
    /// transport-level failure qualifies.
    pub fn is_retryable(&self) -> bool {
        matches!(self, UploadError::Transport { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let decode = UploadError::Decode {
            message: "bad magic".to_string(),
        };
        assert_eq!(decode.code(), "DECODE_ERROR");
        assert_eq!(UploadError::MissingApiKey.code(), "CONFIG_ERROR");
        assert_eq!(UploadError::Remote { status: 503 }.code(), "REMOTE_ERROR");
        assert_eq!(UploadError::ResponseParse.code(), "RESPONSE_PARSE_ERROR");
    }

    #[test]
    fn test_only_transport_is_retryable() {
        let transport = UploadError::Transport {
            message: "connection reset".to_string(),
            attempts: 3,
        };
        assert!(transport.is_retryable());
        assert!(!UploadError::MissingApiKey.is_retryable());
        assert!(!UploadError::Remote { status: 500 }.is_retryable());
        assert!(!UploadError::ResponseParse.is_retryable());
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let json = serde_json::to_value(UploadError::Remote { status: 404 }).unwrap();
        assert_eq!(json["kind"], "remote");
        assert_eq!(json["status"], 404);
    }

    #[test]
    fn test_display_includes_attempts() {
        let e = UploadError::Transport {
            message: "timed out".to_string(),
            attempts: 3,
        };
        assert_eq!(e.to_string(), "upload failed after 3 attempts: timed out");
    }
}

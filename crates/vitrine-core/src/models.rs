//! Domain types carried through the upload pipeline.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::UploadError;

/// Catalog entity identifier (product or category id).
pub type EntityId = u64;

/// One file submitted for upload: raw bytes plus the original filename.
/// How the caller obtained it (multipart request, disk, ...) is not this
/// crate's concern.
#[derive(Clone, Debug)]
pub struct FileSource {
    pub data: Bytes,
    pub filename: String,
}

impl FileSource {
    pub fn new(data: impl Into<Bytes>, filename: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            filename: filename.into(),
        }
    }
}

/// Outcome of one upload job.
///
/// `index` is the batch-relative submission index and the only correlation
/// key: results arrive in completion order, not submission order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadResult {
    pub index: usize,
    /// Hosted public URL; empty when the job failed.
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<UploadError>,
}

impl UploadResult {
    pub fn success(index: usize, url: String) -> Self {
        Self {
            index,
            url,
            error: None,
        }
    }

    pub fn failure(index: usize, error: UploadError) -> Self {
        Self {
            index,
            url: String::new(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregated view of a finished batch for API surfacing: counts, hosted URLs,
/// and per-index error messages. Both lists are ordered by submission index.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub urls: Vec<String>,
    pub errors: Vec<String>,
}

impl BatchSummary {
    pub fn from_results(results: &[UploadResult]) -> Self {
        let mut ordered: Vec<&UploadResult> = results.iter().collect();
        ordered.sort_by_key(|r| r.index);

        let mut summary = BatchSummary::default();
        for result in ordered {
            match &result.error {
                Some(error) => {
                    summary.failed += 1;
                    summary
                        .errors
                        .push(format!("image {}: {}", result.index, error));
                }
                None => {
                    summary.succeeded += 1;
                    summary.urls.push(result.url.clone());
                }
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_partitions_and_orders_by_index() {
        // Completion order deliberately scrambled
        let results = vec![
            UploadResult::failure(
                2,
                UploadError::Decode {
                    message: "not an image".to_string(),
                },
            ),
            UploadResult::success(0, "https://host/a.webp".to_string()),
            UploadResult::success(1, "https://host/b.webp".to_string()),
        ];

        let summary = BatchSummary::from_results(&results);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(
            summary.urls,
            vec!["https://host/a.webp", "https://host/b.webp"]
        );
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].starts_with("image 2:"));
    }

    #[test]
    fn test_summary_of_empty_batch() {
        let summary = BatchSummary::from_results(&[]);
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.failed, 0);
        assert!(summary.urls.is_empty());
        assert!(summary.errors.is_empty());
    }

    #[test]
    fn test_failure_result_has_empty_url() {
        let result = UploadResult::failure(0, UploadError::MissingApiKey);
        assert!(!result.is_success());
        assert!(result.url.is_empty());
        assert!(result.error.is_some());
    }
}

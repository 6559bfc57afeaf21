//! Image host trait.

use async_trait::async_trait;

use vitrine_core::UploadError;
use vitrine_processing::WebpImage;

/// Pushes one encoded image to a remote host and returns its public URL.
///
/// Implementations own their timeout and retry behavior; a returned error is
/// final for the job. Tests substitute stub implementations here.
#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(&self, image: &WebpImage) -> Result<String, UploadError>;
}

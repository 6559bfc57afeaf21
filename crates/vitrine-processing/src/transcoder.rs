//! WebP transcoder: decode a raster image, re-encode at a fixed quality, and
//! derive the output filename.
//!
//! Pure CPU/memory work with no network or disk side effects. Image decode and
//! encode are CPU-bound; callers on the async runtime run
//! [`WebpTranscoder::transcode`] under `spawn_blocking`.

use bytes::Bytes;
use image::DynamicImage;

use vitrine_core::config::DEFAULT_WEBP_QUALITY;
use vitrine_core::UploadError;

/// A transcoded image ready for upload.
#[derive(Clone, Debug)]
pub struct WebpImage {
    pub data: Bytes,
    pub filename: String,
}

/// Converts supported raster inputs (JPEG, PNG, GIF, WebP) to WebP.
#[derive(Clone, Copy, Debug)]
pub struct WebpTranscoder {
    quality: f32,
}

impl Default for WebpTranscoder {
    fn default() -> Self {
        Self {
            quality: DEFAULT_WEBP_QUALITY,
        }
    }
}

impl WebpTranscoder {
    /// Quality is on the 0-100 scale; out-of-range values are clamped.
    pub fn new(quality: f32) -> Self {
        Self {
            quality: quality.clamp(0.0, 100.0),
        }
    }

    /// Decode `data`, encode it to WebP, and rename `original_name` to the
    /// `.webp` extension. Fails with [`UploadError::Decode`] on unrecognizable
    /// input and [`UploadError::Encode`] when encoding fails; neither is
    /// retryable.
    pub fn transcode(&self, data: &[u8], original_name: &str) -> Result<WebpImage, UploadError> {
        let img = image::load_from_memory(data).map_err(|e| UploadError::Decode {
            message: e.to_string(),
        })?;

        let encoded = Self::encode_webp(&img, self.quality)?;

        tracing::debug!(
            original = original_name,
            input_bytes = data.len(),
            output_bytes = encoded.len(),
            "Transcoded image to WebP"
        );

        Ok(WebpImage {
            data: encoded,
            filename: derive_webp_name(original_name),
        })
    }

    fn encode_webp(img: &DynamicImage, quality: f32) -> Result<Bytes, UploadError> {
        // Convert to RGBA for WebP encoding
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        let encoder = webp::Encoder::from_rgba(&rgba, width, height);
        let webp_data = encoder
            .encode_simple(false, quality)
            .map_err(|e| UploadError::Encode {
                message: format!("{e:?}"),
            })?;

        Ok(Bytes::copy_from_slice(&webp_data))
    }
}

/// Replace the original filename's extension with `.webp` (append when there
/// is none).
pub fn derive_webp_name(original: &str) -> String {
    match original.rsplit_once('.') {
        Some((base, _ext)) => format!("{base}.webp"),
        None => format!("{original}.webp"),
    }
}

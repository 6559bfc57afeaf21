//! Image transcoding for the Vitrine upload pipeline.

pub mod transcoder;

pub use transcoder::{derive_webp_name, WebpImage, WebpTranscoder};

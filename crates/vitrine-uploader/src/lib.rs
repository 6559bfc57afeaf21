//! Remote image host client for the Vitrine upload pipeline.
//!
//! [`ImageHost`] is the seam between the worker pool and the outside world;
//! [`ImgbbClient`] is the production implementation against the ImgBB API.

pub mod host;
pub mod imgbb;

pub use host::ImageHost;
pub use imgbb::ImgbbClient;

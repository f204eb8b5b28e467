//! The extraction pipeline: drives one open browser session from listing
//! page to persisted articles, with per-article retries, best-effort title
//! translation, and best-effort image capture.

pub mod analyze;
pub mod pipeline;

pub use pipeline::{run, ImageSink, NoopImageSink, PipelineConfig};

pub mod config;
pub mod detection;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod session;

pub use config::SegmentationConfig;
pub use detection::{Method, Segmenter};
pub use error::{Result, SegmentationError};
pub use models::{BoundingBox, Contour, PipelineResult, Region, Segments};
pub use pipeline::{NoopObserver, Pipeline, PipelineStep, StageObserver};
pub use session::{load_image, ResultSink, Session};

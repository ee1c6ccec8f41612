#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from planeseg for tests
pub use planeseg::{
    BoundingBox, Method, PipelineResult, ResultSink, SegmentationConfig, Segmenter, Session,
};

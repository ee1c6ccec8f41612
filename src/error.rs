use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SegmentationError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Failed to decode image {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl SegmentationError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }
}

pub type Result<T> = std::result::Result<T, SegmentationError>;

use image::{ImageError, ImageReader, RgbImage};
use std::path::Path;

use crate::detection::{Method, Segmenter};
use crate::error::{Result, SegmentationError};
use crate::models::PipelineResult;
use crate::pipeline::{NoopObserver, StageObserver};

/// Decode an image file into a canonical 8-bit RGB buffer
pub fn load_image(path: impl AsRef<Path>) -> Result<RgbImage> {
    let path = path.as_ref();
    let decode = || -> std::result::Result<RgbImage, ImageError> {
        let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
        Ok(image.to_rgb8())
    };
    decode().map_err(|source| SegmentationError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Receives finished results, typically to display or save them
pub trait ResultSink {
    fn on_result_ready(&mut self, image: &RgbImage, message: &str) -> Result<()>;
}

/// Holds the most recently loaded image and the most recent result
pub struct Session {
    segmenter: Segmenter,
    input: Option<RgbImage>,
    result: Option<PipelineResult>,
}

impl Session {
    pub fn new(segmenter: Segmenter) -> Self {
        Self {
            segmenter,
            input: None,
            result: None,
        }
    }

    /// Load `path` as the new input. On failure the previous state is kept.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let image = load_image(path)?;
        self.set_image(image);
        Ok(())
    }

    /// Replace the input and drop any result computed from the old one
    pub fn set_image(&mut self, image: RgbImage) {
        tracing::debug!("Input set: {}x{}", image.width(), image.height());
        self.input = Some(image);
        self.result = None;
    }

    pub fn input(&self) -> Option<&RgbImage> {
        self.input.as_ref()
    }

    pub fn result(&self) -> Option<&PipelineResult> {
        self.result.as_ref()
    }

    /// Run `method` on the current input and hand the result to `sink`.
    ///
    /// Returns `Ok(None)` without touching `sink` when nothing is loaded.
    pub fn process(
        &mut self,
        method: Method,
        sink: &mut dyn ResultSink,
    ) -> Result<Option<&PipelineResult>> {
        self.process_observed(method, sink, &mut NoopObserver)
    }

    /// Like [`Session::process`], also reporting every stage to `observer`
    pub fn process_observed(
        &mut self,
        method: Method,
        sink: &mut dyn ResultSink,
        observer: &mut dyn StageObserver,
    ) -> Result<Option<&PipelineResult>> {
        let Some(input) = &self.input else {
            tracing::debug!(method = %method, "No input loaded, nothing to process");
            return Ok(None);
        };

        let result = self.segmenter.segment_observed(method, input, observer)?;
        sink.on_result_ready(&result.image, &result.summary())?;
        self.result = Some(result);
        Ok(self.result.as_ref())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Segmenter::default())
    }
}

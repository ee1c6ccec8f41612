pub mod annotate;
pub mod components;
pub mod contours;
pub mod morphology;
pub mod preprocessing;
pub mod steps;
pub mod threshold;

use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::config::{CannyConfig, OtsuConfig, PixelDifferenceConfig, SegmentationConfig};
use crate::error::Result;
use crate::models::PipelineResult;
use crate::pipeline::{NoopObserver, Pipeline, StageObserver};
use annotate::{extract_and_annotate, mask_to_rgb, Extraction};
use steps::*;
use threshold::ThresholdMode;

/// Segmentation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Edge map, counted by external contours
    Canny,
    /// Difference of two blur scales, opened and thresholded
    PixelDifference,
    /// Illumination-normalised Otsu binarisation
    Otsu,
}

impl Method {
    pub const ALL: [Method; 3] = [Method::Canny, Method::PixelDifference, Method::Otsu];

    /// Short name used in logs and file names
    pub fn name(&self) -> &'static str {
        match self {
            Method::Canny => "canny",
            Method::PixelDifference => "pixel",
            Method::Otsu => "otsu",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Blur, close gaps, then trace edges
pub fn build_canny_pipeline(config: &CannyConfig) -> Result<Pipeline> {
    Ok(Pipeline::new(Method::Canny.name())
        .add_step(Arc::new(BlurStep {
            kernel: config.blur.kernel,
            sigma: config.blur.sigma,
        }))
        .add_step(Arc::new(CloseStep {
            element: config.close.build()?,
        }))
        .add_step(Arc::new(EdgeDetectionStep {
            low_threshold: config.low_threshold,
            high_threshold: config.high_threshold,
        })))
}

/// Strong blur, blur difference, opening, fixed threshold
pub fn build_pixel_difference_pipeline(config: &PixelDifferenceConfig) -> Result<Pipeline> {
    Ok(Pipeline::new(Method::PixelDifference.name())
        .add_step(Arc::new(BlurStep {
            kernel: config.strong_blur.kernel,
            sigma: config.strong_blur.sigma,
        }))
        .add_step(Arc::new(BlurDifferenceStep {
            kernel: config.mild_blur.kernel,
            sigma: config.mild_blur.sigma,
        }))
        .add_step(Arc::new(ErodeStep {
            element: config.erode.element.build()?,
            iterations: config.erode.iterations,
        }))
        .add_step(Arc::new(DilateStep {
            element: config.dilate.element.build()?,
            iterations: config.dilate.iterations,
        }))
        .add_step(Arc::new(ThresholdStep {
            mode: ThresholdMode::Fixed(config.threshold),
        })))
}

/// Light blur, background division, Otsu binarisation, erosion
pub fn build_otsu_pipeline(config: &OtsuConfig) -> Result<Pipeline> {
    Ok(Pipeline::new(Method::Otsu.name())
        .add_step(Arc::new(BlurStep {
            kernel: config.blur.kernel,
            sigma: config.blur.sigma,
        }))
        .add_step(Arc::new(BackgroundNormalizationStep {
            element: config.background.build()?,
            scale: config.scale,
        }))
        .add_step(Arc::new(ThresholdStep {
            mode: ThresholdMode::Otsu,
        }))
        .add_step(Arc::new(ErodeStep {
            element: config.erode.element.build()?,
            iterations: config.erode.iterations,
        })))
}

/// Runs any of the three pipelines on an RGB image
#[derive(Debug, Clone)]
pub struct Segmenter {
    config: SegmentationConfig,
}

impl Segmenter {
    /// Validates the configuration before accepting it
    pub fn new(config: SegmentationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    /// The filtering chain `method` runs before region extraction
    pub fn pipeline(&self, method: Method) -> Result<Pipeline> {
        match method {
            Method::Canny => build_canny_pipeline(&self.config.canny),
            Method::PixelDifference => build_pixel_difference_pipeline(&self.config.pixel),
            Method::Otsu => build_otsu_pipeline(&self.config.otsu),
        }
    }

    pub fn segment(&self, method: Method, image: &RgbImage) -> Result<PipelineResult> {
        self.segment_observed(method, image, &mut NoopObserver)
    }

    /// Segment `image`, reporting every intermediate stage to `observer`
    pub fn segment_observed(
        &self,
        method: Method,
        image: &RgbImage,
        observer: &mut dyn StageObserver,
    ) -> Result<PipelineResult> {
        let pipeline = self.pipeline(method)?;
        let gray = preprocessing::to_grayscale(image);
        let binary = pipeline.run(gray, observer)?;
        let stroke = self.config.annotation.stroke();

        let result = match method {
            Method::Canny => {
                let canvas = RgbImage::new(image.width(), image.height());
                extract_and_annotate(&binary, canvas, Extraction::ExternalContours, stroke)
            }
            Method::PixelDifference | Method::Otsu => {
                let filter = if method == Method::Otsu {
                    self.config.otsu.filter
                } else {
                    self.config.pixel.filter
                };
                let canvas = mask_to_rgb(&binary);
                extract_and_annotate(
                    &binary,
                    canvas,
                    Extraction::BoundingBoxes {
                        connectivity: filter.connectivity,
                        min_area: filter.min_area,
                    },
                    stroke,
                )
            }
        };

        tracing::info!(method = %method, count = result.count(), "segmentation finished");
        Ok(result)
    }
}

impl Default for Segmenter {
    fn default() -> Self {
        Self {
            config: SegmentationConfig::default(),
        }
    }
}

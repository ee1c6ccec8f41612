//! Tunable parameters for the three segmentation pipelines.
//!
//! Every section has defaults, so a JSON file only needs to name what it changes.

use image::Rgb;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::detection::annotate::Stroke;
use crate::detection::components::{Connectivity, DEFAULT_MIN_AREA};
use crate::detection::morphology::{ElementShape, StructuringElement};
use crate::detection::preprocessing::KernelSize;
use crate::error::{Result, SegmentationError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlurConfig {
    pub kernel: KernelSize,
    /// 0 derives sigma from the kernel size
    #[serde(default)]
    pub sigma: f64,
}

impl BlurConfig {
    pub const fn square(size: u32) -> Self {
        Self {
            kernel: KernelSize::square(size),
            sigma: 0.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.kernel.validate()?;
        if !self.sigma.is_finite() || self.sigma < 0.0 {
            return Err(SegmentationError::invalid(format!(
                "blur sigma must be finite and non-negative, got {}",
                self.sigma
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementConfig {
    pub shape: ElementShape,
    pub width: u32,
    pub height: u32,
}

impl ElementConfig {
    pub const fn rect(width: u32, height: u32) -> Self {
        Self {
            shape: ElementShape::Rect,
            width,
            height,
        }
    }

    pub fn build(&self) -> Result<StructuringElement> {
        StructuringElement::with_shape(self.shape, self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MorphConfig {
    pub element: ElementConfig,
    pub iterations: u32,
}

impl MorphConfig {
    pub fn validate(&self) -> Result<()> {
        self.element.build()?;
        if self.iterations == 0 {
            return Err(SegmentationError::invalid(
                "morphology needs at least one iteration",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionFilterConfig {
    pub connectivity: Connectivity,
    pub min_area: u32,
}

impl Default for RegionFilterConfig {
    fn default() -> Self {
        Self {
            connectivity: Connectivity::Eight,
            min_area: DEFAULT_MIN_AREA,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CannyConfig {
    pub blur: BlurConfig,
    pub close: ElementConfig,
    pub low_threshold: f32,
    pub high_threshold: f32,
}

impl Default for CannyConfig {
    fn default() -> Self {
        Self {
            blur: BlurConfig::square(5),
            close: ElementConfig::rect(5, 5),
            // canny smooths again internally, so gradients reach it already softened
            low_threshold: 25.0,
            high_threshold: 75.0,
        }
    }
}

impl CannyConfig {
    pub fn validate(&self) -> Result<()> {
        self.blur.validate()?;
        self.close.build()?;
        if !(self.low_threshold >= 0.0 && self.low_threshold <= self.high_threshold) {
            return Err(SegmentationError::invalid(format!(
                "Canny thresholds must satisfy 0 <= low <= high, got {} / {}",
                self.low_threshold, self.high_threshold
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PixelDifferenceConfig {
    pub strong_blur: BlurConfig,
    pub mild_blur: BlurConfig,
    pub erode: MorphConfig,
    pub dilate: MorphConfig,
    pub threshold: u8,
    pub filter: RegionFilterConfig,
}

impl Default for PixelDifferenceConfig {
    fn default() -> Self {
        Self {
            strong_blur: BlurConfig::square(31),
            mild_blur: BlurConfig::square(9),
            erode: MorphConfig {
                element: ElementConfig::rect(3, 3),
                iterations: 2,
            },
            dilate: MorphConfig {
                element: ElementConfig::rect(3, 3),
                iterations: 2,
            },
            threshold: 128,
            filter: RegionFilterConfig::default(),
        }
    }
}

impl PixelDifferenceConfig {
    pub fn validate(&self) -> Result<()> {
        self.strong_blur.validate()?;
        self.mild_blur.validate()?;
        self.erode.validate()?;
        self.dilate.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtsuConfig {
    pub blur: BlurConfig,
    pub background: ElementConfig,
    pub scale: f64,
    pub erode: MorphConfig,
    pub filter: RegionFilterConfig,
}

impl Default for OtsuConfig {
    fn default() -> Self {
        Self {
            blur: BlurConfig::square(3),
            background: ElementConfig::rect(40, 40),
            scale: 255.0,
            erode: MorphConfig {
                element: ElementConfig::rect(2, 2),
                iterations: 2,
            },
            filter: RegionFilterConfig::default(),
        }
    }
}

impl OtsuConfig {
    pub fn validate(&self) -> Result<()> {
        self.blur.validate()?;
        self.background.build()?;
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(SegmentationError::invalid(format!(
                "background scale must be positive, got {}",
                self.scale
            )));
        }
        self.erode.validate()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    pub color: [u8; 3],
    pub thickness: u32,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            color: [0, 255, 0],
            thickness: 2,
        }
    }
}

impl AnnotationConfig {
    pub fn stroke(&self) -> Stroke {
        Stroke {
            color: Rgb(self.color),
            thickness: self.thickness,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.thickness == 0 {
            return Err(SegmentationError::invalid("stroke thickness must be at least 1"));
        }
        Ok(())
    }
}

/// Parameters for every pipeline plus the annotation style they share
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    pub canny: CannyConfig,
    pub pixel: PixelDifferenceConfig,
    pub otsu: OtsuConfig,
    pub annotation: AnnotationConfig,
}

impl SegmentationConfig {
    /// Load a (possibly partial) JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every parameter up front
    pub fn validate(&self) -> Result<()> {
        self.canny.validate()?;
        self.pixel.validate()?;
        self.otsu.validate()?;
        self.annotation.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        SegmentationConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config = SegmentationConfig::from_json_str(
            r#"{ "canny": { "low_threshold": 50, "high_threshold": 200 },
                 "otsu": { "filter": { "connectivity": "four", "min_area": 25 } } }"#,
        )
        .unwrap();
        assert_eq!(config.canny.low_threshold, 50.0);
        assert_eq!(config.canny.high_threshold, 200.0);
        assert_eq!(config.canny.blur, BlurConfig::square(5));
        assert_eq!(config.otsu.filter.connectivity, Connectivity::Four);
        assert_eq!(config.otsu.filter.min_area, 25);
        assert_eq!(config.pixel, PixelDifferenceConfig::default());
    }

    #[test]
    fn even_kernel_rejected() {
        let err = SegmentationConfig::from_json_str(
            r#"{ "pixel": { "mild_blur": { "kernel": { "width": 8, "height": 9 } } } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, SegmentationError::InvalidParameter(_)));
    }

    #[test]
    fn oversized_kernel_rejected_at_load() {
        let err = SegmentationConfig::from_json_str(
            r#"{ "pixel": { "strong_blur": { "kernel": { "width": 2000001, "height": 2000001 } } } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, SegmentationError::InvalidParameter(_)));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = SegmentationConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, SegmentationError::Config(_)));
    }

    #[test]
    fn inverted_canny_thresholds_rejected() {
        let mut config = SegmentationConfig::default();
        config.canny.low_threshold = 300.0;
        config.canny.high_threshold = 100.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_iterations_rejected() {
        let mut config = SegmentationConfig::default();
        config.otsu.erode.iterations = 0;
        assert!(config.validate().is_err());
    }
}

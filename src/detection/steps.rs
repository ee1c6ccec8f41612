use crate::detection::morphology::{self, StructuringElement};
use crate::detection::preprocessing::{self, KernelSize};
use crate::detection::threshold::{self, ThresholdMode};
use crate::error::Result;
use crate::pipeline::PipelineStep;
use image::GrayImage;

/// Apply Gaussian blur
pub struct BlurStep {
    pub kernel: KernelSize,
    pub sigma: f64,
}

impl PipelineStep for BlurStep {
    fn process(&self, image: &GrayImage) -> Result<GrayImage> {
        preprocessing::gaussian_blur(image, self.kernel, self.sigma)
    }

    fn name(&self) -> &str {
        "Gaussian Blur"
    }
}

/// Blur the input once more and keep `blurred - input` (8-bit wrapping).
///
/// Run after a strong blur, this leaves the interior of bright plateaus near
/// 255 (the second blur lowers them) and flat or dark areas near 0.
pub struct BlurDifferenceStep {
    pub kernel: KernelSize,
    pub sigma: f64,
}

impl PipelineStep for BlurDifferenceStep {
    fn process(&self, image: &GrayImage) -> Result<GrayImage> {
        let blurred = preprocessing::gaussian_blur(image, self.kernel, self.sigma)?;
        preprocessing::subtract_wrapping(&blurred, image)
    }

    fn name(&self) -> &str {
        "Blur Difference"
    }
}

/// Morphological closing to bridge small gaps
pub struct CloseStep {
    pub element: StructuringElement,
}

impl PipelineStep for CloseStep {
    fn process(&self, image: &GrayImage) -> Result<GrayImage> {
        morphology::close(image, &self.element)
    }

    fn name(&self) -> &str {
        "Morphological Close"
    }
}

pub struct ErodeStep {
    pub element: StructuringElement,
    pub iterations: u32,
}

impl PipelineStep for ErodeStep {
    fn process(&self, image: &GrayImage) -> Result<GrayImage> {
        morphology::erode(image, &self.element, self.iterations)
    }

    fn name(&self) -> &str {
        "Erosion"
    }
}

pub struct DilateStep {
    pub element: StructuringElement,
    pub iterations: u32,
}

impl PipelineStep for DilateStep {
    fn process(&self, image: &GrayImage) -> Result<GrayImage> {
        morphology::dilate(image, &self.element, self.iterations)
    }

    fn name(&self) -> &str {
        "Dilation"
    }
}

/// Detect edges using Canny
pub struct EdgeDetectionStep {
    pub low_threshold: f32,
    pub high_threshold: f32,
}

impl PipelineStep for EdgeDetectionStep {
    fn process(&self, image: &GrayImage) -> Result<GrayImage> {
        preprocessing::detect_edges(image, self.low_threshold, self.high_threshold)
    }

    fn name(&self) -> &str {
        "Edge Detection"
    }
}

/// Divide the image by a dilation-based background estimate to flatten
/// uneven illumination
pub struct BackgroundNormalizationStep {
    pub element: StructuringElement,
    pub scale: f64,
}

impl PipelineStep for BackgroundNormalizationStep {
    fn process(&self, image: &GrayImage) -> Result<GrayImage> {
        let background = morphology::dilate(image, &self.element, 1)?;
        preprocessing::divide(image, &background, self.scale)
    }

    fn name(&self) -> &str {
        "Background Normalization"
    }
}

/// Binarise with a fixed or Otsu level
pub struct ThresholdStep {
    pub mode: ThresholdMode,
}

impl PipelineStep for ThresholdStep {
    fn process(&self, image: &GrayImage) -> Result<GrayImage> {
        let result = threshold::threshold(image, self.mode);
        if self.mode == ThresholdMode::Otsu {
            tracing::debug!("Otsu level: {}", result.level);
        }
        Ok(result.mask)
    }

    fn name(&self) -> &str {
        "Threshold"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn background_normalization_flattens_gradient() {
        // Bright object on a left-to-right illumination ramp
        let img = GrayImage::from_fn(60, 20, |x, y| {
            let base = 60 + x as u8 * 2;
            if (25..35).contains(&x) && (5..15).contains(&y) {
                Luma([base.saturating_add(60)])
            } else {
                Luma([base])
            }
        });
        let step = BackgroundNormalizationStep {
            element: StructuringElement::rect(5, 5).unwrap(),
            scale: 255.0,
        };
        let out = step.process(&img).unwrap();
        assert_eq!(out.dimensions(), img.dimensions());
        // Object interior sits near its local maximum, so it maps close to full scale
        assert!(out.get_pixel(30, 10)[0] > 240);
        // Background at both ends of the ramp ends up near the top of the range too
        let left = out.get_pixel(2, 18)[0];
        let right = out.get_pixel(57, 18)[0];
        assert!(left > 230 && right > 230, "left {} right {}", left, right);
        // While the ramp itself spanned more than 100 levels
        assert!(img.get_pixel(57, 18)[0] - img.get_pixel(2, 18)[0] > 100);
    }

    #[test]
    fn blur_difference_marks_plateau_interior() {
        let img = GrayImage::from_fn(40, 40, |x, y| {
            if (10..30).contains(&x) && (10..30).contains(&y) {
                Luma([255])
            } else {
                Luma([0])
            }
        });
        let strong = BlurStep {
            kernel: KernelSize::square(9),
            sigma: 0.0,
        }
        .process(&img)
        .unwrap();
        let diff = BlurDifferenceStep {
            kernel: KernelSize::square(5),
            sigma: 0.0,
        }
        .process(&strong)
        .unwrap();
        // Just inside the plateau edge the second blur lowers the value, which wraps high
        assert!(diff.get_pixel(11, 20)[0] > 127);
        // Far background stays untouched
        assert_eq!(diff.get_pixel(1, 1)[0], 0);
    }

    #[test]
    fn threshold_step_produces_binary_output() {
        let img = GrayImage::from_fn(16, 1, |x, _| Luma([(x * 16) as u8]));
        let out = ThresholdStep {
            mode: ThresholdMode::Fixed(128),
        }
        .process(&img)
        .unwrap();
        assert!(out.pixels().all(|p| p[0] == 0 || p[0] == 255));
        assert_eq!(out.get_pixel(7, 0)[0], 0);
        assert_eq!(out.get_pixel(8, 0)[0], 255);
    }
}

use image::{GrayImage, Luma, RgbImage};
use imageproc::definitions::Image;
use imageproc::edges::canny;
use imageproc::filter::separable_filter;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SegmentationError};

/// Largest side a smoothing kernel may have
pub const MAX_KERNEL_SIDE: u32 = 511;

/// Width and height of a smoothing kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelSize {
    pub width: u32,
    pub height: u32,
}

impl KernelSize {
    pub const fn square(size: u32) -> Self {
        Self { width: size, height: size }
    }

    /// Both sides must be odd and at most [`MAX_KERNEL_SIDE`]
    pub fn validate(&self) -> Result<()> {
        for (side, value) in [("width", self.width), ("height", self.height)] {
            if value == 0 || value % 2 == 0 {
                return Err(SegmentationError::invalid(format!(
                    "Gaussian kernel {} must be a positive odd integer, got {}",
                    side, value
                )));
            }
            if value > MAX_KERNEL_SIDE {
                return Err(SegmentationError::invalid(format!(
                    "Gaussian kernel {} must be at most {}, got {}",
                    side, MAX_KERNEL_SIDE, value
                )));
            }
        }
        Ok(())
    }
}

/// Convert image to grayscale
pub fn to_grayscale(img: &RgbImage) -> GrayImage {
    image::imageops::grayscale(img)
}

/// Sigma used for a kernel side when none is given explicitly
fn sigma_for_size(size: u32) -> f64 {
    0.3 * ((size as f64 - 1.0) * 0.5 - 1.0) + 0.8
}

fn gaussian_kernel(size: u32, sigma: f64) -> Vec<f32> {
    let sigma = if sigma > 0.0 { sigma } else { sigma_for_size(size) };
    let radius = (size / 2) as f64;
    let weights: Vec<f64> = (0..size)
        .map(|i| {
            let d = i as f64 - radius;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.iter().map(|w| (w / sum) as f32).collect()
}

/// Apply separable Gaussian smoothing.
///
/// Both passes run in `f32` and round once at the end. Borders are padded by
/// repeating the edge pixel. A `sigma` of 0 derives the spread from the kernel size.
pub fn gaussian_blur(img: &GrayImage, kernel: KernelSize, sigma: f64) -> Result<GrayImage> {
    kernel.validate()?;
    if !sigma.is_finite() || sigma < 0.0 {
        return Err(SegmentationError::invalid(format!(
            "Gaussian sigma must be finite and non-negative, got {}",
            sigma
        )));
    }

    let kx = gaussian_kernel(kernel.width, sigma);
    let ky = gaussian_kernel(kernel.height, sigma);
    let levels: Image<Luma<f32>> = Image::from_fn(img.width(), img.height(), |x, y| {
        Luma([img.get_pixel(x, y)[0] as f32])
    });
    let smoothed = separable_filter(&levels, &kx, &ky);

    Ok(GrayImage::from_fn(img.width(), img.height(), |x, y| {
        Luma([smoothed.get_pixel(x, y)[0].round().clamp(0.0, 255.0) as u8])
    }))
}

fn check_same_size(a: &GrayImage, b: &GrayImage, op: &str) -> Result<()> {
    if a.dimensions() != b.dimensions() {
        return Err(SegmentationError::invalid(format!(
            "{} needs equally sized images, got {:?} and {:?}",
            op,
            a.dimensions(),
            b.dimensions()
        )));
    }
    Ok(())
}

/// Per-pixel `a / b * scale`, rounded and clipped to `[0, 255]`.
/// A zero divisor yields 0.
pub fn divide(a: &GrayImage, b: &GrayImage, scale: f64) -> Result<GrayImage> {
    check_same_size(a, b, "divide")?;
    if !scale.is_finite() || scale <= 0.0 {
        return Err(SegmentationError::invalid(format!(
            "divide scale must be positive, got {}",
            scale
        )));
    }

    let mut out = GrayImage::new(a.width(), a.height());
    for ((o, pa), pb) in out.pixels_mut().zip(a.pixels()).zip(b.pixels()) {
        let value = if pb[0] == 0 {
            0
        } else {
            (pa[0] as f64 * scale / pb[0] as f64).round().clamp(0.0, 255.0) as u8
        };
        *o = Luma([value]);
    }
    Ok(out)
}

/// Per-pixel `a - b` in 8-bit modular arithmetic
pub fn subtract_wrapping(a: &GrayImage, b: &GrayImage) -> Result<GrayImage> {
    check_same_size(a, b, "subtract")?;
    let mut out = GrayImage::new(a.width(), a.height());
    for ((o, pa), pb) in out.pixels_mut().zip(a.pixels()).zip(b.pixels()) {
        *o = Luma([pa[0].wrapping_sub(pb[0])]);
    }
    Ok(out)
}

/// Detect edges using Canny edge detector
pub fn detect_edges(img: &GrayImage, low_threshold: f32, high_threshold: f32) -> Result<GrayImage> {
    if !(low_threshold >= 0.0 && low_threshold <= high_threshold) {
        return Err(SegmentationError::invalid(format!(
            "Canny thresholds must satisfy 0 <= low <= high, got {} / {}",
            low_threshold, high_threshold
        )));
    }
    // canny reads a 3x3 neighbourhood around every interior pixel
    if img.width() < 3 || img.height() < 3 {
        return Ok(GrayImage::new(img.width(), img.height()));
    }
    Ok(canny(img, low_threshold, high_threshold))
}

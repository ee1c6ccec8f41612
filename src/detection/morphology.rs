use image::{GrayImage, Luma};
use imageproc::morphology::{grayscale_dilate, grayscale_erode, Mask};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SegmentationError};

/// Footprint shape of a structuring element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementShape {
    Rect,
    Cross,
    Ellipse,
}

/// Largest side a structuring element may have
pub const MAX_ELEMENT_SIDE: u32 = 511;

/// Neighbourhood used by erosion and dilation, anchored at `(width / 2, height / 2)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    width: u32,
    height: u32,
    cells: Vec<bool>,
    erode_mask: Mask,
    dilate_mask: Mask,
}

impl StructuringElement {
    pub fn rect(width: u32, height: u32) -> Result<Self> {
        Self::from_mask(width, height, vec![true; (width as usize) * (height as usize)])
    }

    pub fn cross(width: u32, height: u32) -> Result<Self> {
        let (ax, ay) = (width / 2, height / 2);
        let cells = (0..height)
            .flat_map(|y| (0..width).map(move |x| x == ax || y == ay))
            .collect();
        Self::from_mask(width, height, cells)
    }

    /// Ellipse inscribed in the `width` x `height` box
    pub fn ellipse(width: u32, height: u32) -> Result<Self> {
        let rx = width as f64 / 2.0;
        let ry = height as f64 / 2.0;
        let cells = (0..height)
            .flat_map(|y| {
                (0..width).map(move |x| {
                    let dx = (x as f64 + 0.5 - rx) / rx;
                    let dy = (y as f64 + 0.5 - ry) / ry;
                    dx * dx + dy * dy <= 1.0
                })
            })
            .collect();
        Self::from_mask(width, height, cells)
    }

    pub fn with_shape(shape: ElementShape, width: u32, height: u32) -> Result<Self> {
        match shape {
            ElementShape::Rect => Self::rect(width, height),
            ElementShape::Cross => Self::cross(width, height),
            ElementShape::Ellipse => Self::ellipse(width, height),
        }
    }

    /// Build from a row-major footprint
    pub fn from_mask(width: u32, height: u32, cells: Vec<bool>) -> Result<Self> {
        if width == 0 || height == 0 || width > MAX_ELEMENT_SIDE || height > MAX_ELEMENT_SIDE {
            return Err(SegmentationError::invalid(format!(
                "structuring element sides must be in 1..={}, got {}x{}",
                MAX_ELEMENT_SIDE, width, height
            )));
        }
        if cells.len() != (width as usize) * (height as usize) {
            return Err(SegmentationError::invalid(format!(
                "structuring element footprint has {} cells, expected {}",
                cells.len(),
                width * height
            )));
        }
        if !cells.iter().any(|&c| c) {
            return Err(SegmentationError::invalid(
                "structuring element footprint is empty",
            ));
        }

        let footprint = |reflected: bool| {
            GrayImage::from_fn(width, height, |x, y| {
                let (sx, sy) = if reflected {
                    (width - 1 - x, height - 1 - y)
                } else {
                    (x, y)
                };
                if cells[(sy * width + sx) as usize] {
                    Luma([255])
                } else {
                    Luma([0])
                }
            })
        };
        // Sides are at most 511, so both anchors fit in a u8
        let (ax, ay) = (width / 2, height / 2);
        let erode_mask = Mask::from_image(&footprint(false), ax as u8, ay as u8);
        let dilate_mask = Mask::from_image(
            &footprint(true),
            (width - 1 - ax) as u8,
            (height - 1 - ay) as u8,
        );

        Ok(Self {
            width,
            height,
            cells,
            erode_mask,
            dilate_mask,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn anchor(&self) -> (u32, u32) {
        (self.width / 2, self.height / 2)
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.cells[(y * self.width + x) as usize]
    }
}

fn repeat(
    img: &GrayImage,
    iterations: u32,
    op: impl Fn(&GrayImage) -> GrayImage,
) -> Result<GrayImage> {
    if iterations == 0 {
        return Err(SegmentationError::invalid(
            "morphology needs at least one iteration",
        ));
    }
    let mut current = op(img);
    for _ in 1..iterations {
        current = op(&current);
    }
    Ok(current)
}

/// Minimum over the footprint placed at its anchor, repeated `iterations` times.
/// Samples outside the image are ignored.
pub fn erode(img: &GrayImage, element: &StructuringElement, iterations: u32) -> Result<GrayImage> {
    repeat(img, iterations, |current| {
        grayscale_erode(current, &element.erode_mask)
    })
}

/// Maximum over the reflected footprint, repeated `iterations` times.
///
/// Reflection makes `dilate` the adjoint of [`erode`], so an opening never
/// leaves the input and a closing never loses any of it, also for even-sized
/// elements.
pub fn dilate(img: &GrayImage, element: &StructuringElement, iterations: u32) -> Result<GrayImage> {
    repeat(img, iterations, |current| {
        grayscale_dilate(current, &element.dilate_mask)
    })
}

/// Dilation followed by erosion with the same element
pub fn close(img: &GrayImage, element: &StructuringElement) -> Result<GrayImage> {
    let dilated = dilate(img, element, 1)?;
    erode(&dilated, element, 1)
}

/// Erosion followed by dilation with the same element and iteration count
pub fn open(img: &GrayImage, element: &StructuringElement, iterations: u32) -> Result<GrayImage> {
    let eroded = erode(img, element, iterations)?;
    dilate(&eroded, element, iterations)
}

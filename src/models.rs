use image::RgbImage;
use imageproc::point::Point;

/// Axis-aligned bounding box in image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Build a box from inclusive pixel extents
    pub fn from_extents(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        Self {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        }
    }

    /// Last column covered by the box
    pub fn max_x(&self) -> u32 {
        self.x + self.width - 1
    }

    /// Last row covered by the box
    pub fn max_y(&self) -> u32 {
        self.y + self.height - 1
    }
}

/// One connected foreground blob of a binary mask
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// Label assigned during extraction, >= 1 (0 is background)
    pub label: u32,
    pub bbox: BoundingBox,
    /// Number of foreground pixels in the blob
    pub area: u32,
}

/// Closed boundary curve of one edge structure, as an ordered point sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contour {
    pub points: Vec<Point<i32>>,
}

/// What a pipeline counted
#[derive(Debug, Clone)]
pub enum Segments {
    Regions(Vec<Region>),
    Contours(Vec<Contour>),
}

impl Segments {
    pub fn len(&self) -> usize {
        match self {
            Segments::Regions(regions) => regions.len(),
            Segments::Contours(contours) => contours.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn regions(&self) -> &[Region] {
        match self {
            Segments::Regions(regions) => regions,
            Segments::Contours(_) => &[],
        }
    }

    pub fn contours(&self) -> &[Contour] {
        match self {
            Segments::Regions(_) => &[],
            Segments::Contours(contours) => contours,
        }
    }
}

/// Annotated image plus what was detected on it
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub image: RgbImage,
    pub segments: Segments,
}

impl PipelineResult {
    /// Number of detected planes
    pub fn count(&self) -> usize {
        self.segments.len()
    }

    /// Human-readable summary for the presentation layer
    pub fn summary(&self) -> String {
        format!("Approximate number of planes on the image: {}", self.count())
    }
}

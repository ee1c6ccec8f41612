use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use crate::detection::components::{find_regions, Connectivity};
use crate::detection::contours::find_external_contours;
use crate::models::{Contour, PipelineResult, Region, Segments};

/// Stroke used for every annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stroke {
    pub color: Rgb<u8>,
    pub thickness: u32,
}

/// How the final binary map is turned into countable segments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    /// Connected blobs, area-filtered, outlined with their bounding boxes
    BoundingBoxes { connectivity: Connectivity, min_area: u32 },
    /// External contours, unfiltered, stroked along their curve
    ExternalContours,
}

/// Extract segments from `mask` and draw them onto `canvas`
pub fn extract_and_annotate(
    mask: &GrayImage,
    mut canvas: RgbImage,
    extraction: Extraction,
    stroke: Stroke,
) -> PipelineResult {
    let segments = match extraction {
        Extraction::BoundingBoxes { connectivity, min_area } => {
            let regions = find_regions(mask, connectivity, min_area);
            for region in &regions {
                draw_region_box(&mut canvas, region, stroke);
            }
            Segments::Regions(regions)
        }
        Extraction::ExternalContours => {
            let contours = find_external_contours(mask);
            for contour in &contours {
                draw_contour(&mut canvas, contour, stroke);
            }
            Segments::Contours(contours)
        }
    };

    PipelineResult { image: canvas, segments }
}

/// Grayscale mask as a 3-channel image, the background for box annotations
pub fn mask_to_rgb(mask: &GrayImage) -> RgbImage {
    RgbImage::from_fn(mask.width(), mask.height(), |x, y| {
        let v = mask.get_pixel(x, y)[0];
        Rgb([v, v, v])
    })
}

/// Rectangle from the region's top-left corner to one past its bottom-right
/// pixel, stroked with the same pen extent as contours
pub fn draw_region_box(canvas: &mut RgbImage, region: &Region, stroke: Stroke) {
    let bbox = region.bbox;
    let (lo, hi) = pen_range(stroke.thickness);
    // Ring `o` sits `o` pixels outside the base rectangle, negative rings inside
    for o in lo..=hi {
        let width = bbox.width as i32 + 1 + 2 * o;
        let height = bbox.height as i32 + 1 + 2 * o;
        if width <= 0 || height <= 0 {
            continue;
        }
        let rect =
            Rect::at(bbox.x as i32 - o, bbox.y as i32 - o).of_size(width as u32, height as u32);
        draw_hollow_rect_mut(canvas, rect, stroke.color);
    }
}

/// Closed polyline through the contour points
pub fn draw_contour(canvas: &mut RgbImage, contour: &Contour, stroke: Stroke) {
    let n = contour.points.len();
    let offsets = stroke_offsets(stroke.thickness);
    for i in 0..n {
        let p1 = contour.points[i];
        let p2 = contour.points[(i + 1) % n];
        for &(dx, dy) in &offsets {
            draw_line_segment_mut(
                canvas,
                ((p1.x + dx) as f32, (p1.y + dy) as f32),
                ((p2.x + dx) as f32, (p2.y + dy) as f32),
                stroke.color,
            );
        }
    }
}

/// Offsets a pen of the given width covers across the line it follows.
/// Odd widths are centred, even widths lean one pixel to the positive side.
fn pen_range(thickness: u32) -> (i32, i32) {
    let thickness = thickness.max(1) as i32;
    (-(thickness - 1) / 2, thickness / 2)
}

/// Pixel offsets covering a square pen of the given width
fn stroke_offsets(thickness: u32) -> Vec<(i32, i32)> {
    let (lo, hi) = pen_range(thickness);
    (lo..=hi)
        .flat_map(|dy| (lo..=hi).map(move |dx| (dx, dy)))
        .collect()
}

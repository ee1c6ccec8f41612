use image::{Rgb, RgbImage};
use planeseg::{BoundingBox, ResultSink};
use tempfile::NamedTempFile;

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);

/// Black canvas with white axis-aligned rectangles `(x, y, width, height)`
pub fn image_with_rects(width: u32, height: u32, rects: &[(u32, u32, u32, u32)]) -> RgbImage {
    let mut img = RgbImage::from_pixel(width, height, BLACK);
    for &(rx, ry, rw, rh) in rects {
        for y in ry..ry + rh {
            for x in rx..rx + rw {
                img.put_pixel(x, y, WHITE);
            }
        }
    }
    img
}

/// 100x100 black image with one 30x30 white square at (35, 35)
pub fn single_square() -> RgbImage {
    image_with_rects(100, 100, &[(35, 35, 30, 30)])
}

/// Two 20x20 squares plus a 5-pixel speck on a 120x120 canvas
pub fn two_squares_and_speck() -> RgbImage {
    let mut img = image_with_rects(120, 120, &[(10, 10, 20, 20), (70, 10, 20, 20)]);
    for (x, y) in [(50, 80), (51, 80), (52, 80), (50, 81), (51, 81)] {
        img.put_pixel(x, y, WHITE);
    }
    img
}

pub fn all_black(size: u32) -> RgbImage {
    RgbImage::from_pixel(size, size, BLACK)
}

/// Writes `img` to a temporary PNG file.
/// The file will be automatically cleaned up when dropped.
pub fn save_temp_png(img: &RgbImage) -> NamedTempFile {
    let file = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .expect("Failed to create temp image file");
    img.save_with_format(file.path(), image::ImageFormat::Png)
        .expect("Failed to save test image");
    file
}

/// Every box edge within `tolerance` pixels of the expected one
pub fn bbox_close(actual: BoundingBox, expected: BoundingBox, tolerance: u32) -> bool {
    actual.x.abs_diff(expected.x) <= tolerance
        && actual.y.abs_diff(expected.y) <= tolerance
        && actual.max_x().abs_diff(expected.max_x()) <= tolerance
        && actual.max_y().abs_diff(expected.max_y()) <= tolerance
}

/// Sink that remembers every delivered result
#[derive(Default)]
pub struct RecordingSink {
    pub delivered: Vec<(RgbImage, String)>,
}

impl ResultSink for RecordingSink {
    fn on_result_ready(&mut self, image: &RgbImage, message: &str) -> planeseg::Result<()> {
        self.delivered.push((image.clone(), message.to_string()));
        Ok(())
    }
}

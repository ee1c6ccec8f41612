use image::{GrayImage, Luma};
use imageproc::contrast::{self, ThresholdType};
use serde::{Deserialize, Serialize};

/// How the binarisation level is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "value")]
pub enum ThresholdMode {
    /// Pixels `>= value` become foreground
    Fixed(u8),
    /// Level picked from the image histogram; any fixed value is ignored
    Otsu,
}

/// Binary mask with the level that produced it
#[derive(Debug, Clone)]
pub struct Thresholded {
    pub mask: GrayImage,
    pub level: u8,
}

/// Binarise `img`: 255 where the pixel is at or above the level, 0 elsewhere
pub fn threshold(img: &GrayImage, mode: ThresholdMode) -> Thresholded {
    let level = match mode {
        ThresholdMode::Fixed(value) => value,
        ThresholdMode::Otsu => otsu_level(img),
    };
    Thresholded {
        mask: apply_level(img, level),
        level,
    }
}

fn apply_level(img: &GrayImage, level: u8) -> GrayImage {
    match level.checked_sub(1) {
        // `contrast::threshold` keeps pixels strictly above its argument
        Some(below) => contrast::threshold(img, below, ThresholdType::Binary),
        None => GrayImage::from_pixel(img.width(), img.height(), Luma([255])),
    }
}

/// Otsu's level as a `>=` cut: the first pixel value of the upper class.
///
/// A flat image gives 1, so an all-black image stays empty.
pub fn otsu_level(img: &GrayImage) -> u8 {
    contrast::otsu_level(img).saturating_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::stats::histogram;

    /// Weighted intra-class variance (times pixel count) of splitting at `t`
    fn intra_class_variance(hist: &[u32; 256], t: usize) -> f64 {
        let class = |range: std::ops::Range<usize>| {
            let n: f64 = range.clone().map(|i| hist[i] as f64).sum();
            if n == 0.0 {
                return 0.0;
            }
            let mean = range.clone().map(|i| i as f64 * hist[i] as f64).sum::<f64>() / n;
            range.map(|i| hist[i] as f64 * (i as f64 - mean).powi(2)).sum()
        };
        class(0..t) + class(t..256)
    }

    fn lcg_image(width: u32, height: u32, seed: u32, modes: &[u8]) -> GrayImage {
        let mut state = seed;
        GrayImage::from_fn(width, height, |_, _| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let mode = modes[(state >> 16) as usize % modes.len()];
            let noise = ((state >> 8) % 31) as i32 - 15;
            Luma([(mode as i32 + noise).clamp(0, 255) as u8])
        })
    }

    #[test]
    fn fixed_threshold_is_exact() {
        let img = GrayImage::from_fn(16, 16, |x, y| Luma([(x * 16 + y) as u8]));
        for value in [0u8, 1, 100, 128, 255] {
            let out = threshold(&img, ThresholdMode::Fixed(value));
            assert_eq!(out.level, value);
            for (p, q) in img.pixels().zip(out.mask.pixels()) {
                let expected = if p[0] >= value { 255 } else { 0 };
                assert_eq!(q[0], expected);
            }
        }
    }

    #[test]
    fn otsu_matches_brute_force_minimum() {
        let cases = [
            lcg_image(12, 10, 1, &[40, 200]),
            lcg_image(9, 9, 7, &[20, 90, 220]),
            lcg_image(16, 4, 42, &[128]),
            lcg_image(5, 5, 3, &[0, 255]),
        ];
        for img in &cases {
            let hist = histogram(img).channels[0];
            let level = otsu_level(img) as usize;
            let best = (0..256)
                .map(|t| intra_class_variance(&hist, t))
                .fold(f64::INFINITY, f64::min);
            let chosen = intra_class_variance(&hist, level);
            assert!(
                chosen <= best + 1e-6 * best.max(1.0),
                "level {} has variance {} but minimum is {}",
                level,
                chosen,
                best
            );
        }
    }

    #[test]
    fn otsu_separates_two_populations() {
        let img = GrayImage::from_fn(20, 20, |x, _| if x < 10 { Luma([30]) } else { Luma([220]) });
        let out = threshold(&img, ThresholdMode::Otsu);
        assert!(out.level > 30 && out.level <= 220);
        assert_eq!(out.mask.get_pixel(0, 0)[0], 0);
        assert_eq!(out.mask.get_pixel(19, 0)[0], 255);
    }

    #[test]
    fn otsu_cut_starts_just_above_lower_class() {
        let img = GrayImage::from_fn(20, 20, |x, _| if x < 10 { Luma([30]) } else { Luma([220]) });
        let out = threshold(&img, ThresholdMode::Otsu);
        assert_eq!(out.level, 31);
        assert_eq!(out.mask, threshold(&img, ThresholdMode::Fixed(31)).mask);
    }

    #[test]
    fn otsu_on_flat_bright_image_keeps_everything() {
        let img = GrayImage::from_pixel(6, 6, Luma([200]));
        let out = threshold(&img, ThresholdMode::Otsu);
        assert_eq!(out.level, 1);
        assert!(out.mask.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn otsu_on_black_image_keeps_it_empty() {
        let img = GrayImage::new(8, 8);
        let out = threshold(&img, ThresholdMode::Otsu);
        assert_eq!(out.level, 1);
        assert!(out.mask.pixels().all(|p| p[0] == 0));
    }
}

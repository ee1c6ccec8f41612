use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity as LabelConnectivity};
use serde::{Deserialize, Serialize};

use crate::models::{BoundingBox, Region};

/// Neighbourhood used when joining foreground pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    Four,
    Eight,
}

impl From<Connectivity> for LabelConnectivity {
    fn from(value: Connectivity) -> Self {
        match value {
            Connectivity::Four => LabelConnectivity::Four,
            Connectivity::Eight => LabelConnectivity::Eight,
        }
    }
}

/// Regions below this many pixels are treated as noise
pub const DEFAULT_MIN_AREA: u32 = 10;

/// Label the foreground (non-zero) blobs of `mask` and keep those with at least
/// `min_area` pixels.
///
/// Labels follow the raster order of each blob's first pixel, so the result is
/// ordered by label and reproducible. Dropped blobs leave gaps in the label
/// sequence of the survivors.
pub fn find_regions(mask: &GrayImage, connectivity: Connectivity, min_area: u32) -> Vec<Region> {
    let labeled = connected_components(mask, connectivity.into(), Luma([0u8]));

    // (min_x, min_y, max_x, max_y, count) per label, indexed by label - 1
    let mut stats: Vec<(u32, u32, u32, u32, u32)> = Vec::new();

    for (x, y, label) in labeled.enumerate_pixels() {
        let label_val = label[0];
        if label_val == 0 {
            continue; // Skip background
        }

        let idx = (label_val - 1) as usize;
        if idx >= stats.len() {
            stats.resize(idx + 1, (u32::MAX, u32::MAX, 0, 0, 0));
        }
        let (min_x, min_y, max_x, max_y, count) = &mut stats[idx];
        *min_x = (*min_x).min(x);
        *min_y = (*min_y).min(y);
        *max_x = (*max_x).max(x);
        *max_y = (*max_y).max(y);
        *count += 1;
    }

    stats
        .into_iter()
        .enumerate()
        .filter_map(|(idx, (min_x, min_y, max_x, max_y, count))| {
            let label = idx as u32 + 1;
            if count == 0 {
                return None;
            }
            if count < min_area {
                tracing::trace!("dropping region {} with area {} < {}", label, count, min_area);
                return None;
            }
            Some(Region {
                label,
                bbox: BoundingBox::from_extents(min_x, min_y, max_x, max_y),
                area: count,
            })
        })
        .collect()
}

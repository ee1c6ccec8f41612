use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point;

use crate::models::Contour;

/// Find the outermost boundary of every edge structure in a binary edge map.
///
/// Holes and anything nested inside another structure are skipped. No size
/// filtering is applied: every external border counts.
pub fn find_external_contours(edges: &GrayImage) -> Vec<Contour> {
    find_contours::<i32>(edges)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| Contour {
            points: compress_straight_runs(&c.points),
        })
        .collect()
}

fn step(from: Point<i32>, to: Point<i32>) -> (i32, i32) {
    ((to.x - from.x).signum(), (to.y - from.y).signum())
}

/// Drop points lying in the middle of a straight horizontal, vertical or
/// diagonal run of the closed curve, keeping only the run end points.
pub fn compress_straight_runs(points: &[Point<i32>]) -> Vec<Point<i32>> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let kept: Vec<Point<i32>> = (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            step(prev, points[i]) != step(points[i], next)
        })
        .map(|i| points[i])
        .collect();

    if kept.is_empty() {
        // Degenerate curve whose every point is colinear in one direction
        vec![points[0]]
    } else {
        kept
    }
}

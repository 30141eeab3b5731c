//! Greedy non-maximum suppression over palm candidates.

use crate::types::PalmRegion;

/// Intersection-over-union of two `[x_min, y_min, x_max, y_max]` rectangles.
///
/// Corners may be given in either order. A zero-area rectangle has an IoU of 0 with anything.
pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let (ax0, ax1) = (a[0].min(a[2]), a[0].max(a[2]));
    let (ay0, ay1) = (a[1].min(a[3]), a[1].max(a[3]));
    let (bx0, bx1) = (b[0].min(b[2]), b[0].max(b[2]));
    let (by0, by1) = (b[1].min(b[3]), b[1].max(b[3]));

    let area_a = (ax1 - ax0) * (ay1 - ay0);
    let area_b = (bx1 - bx0) * (by1 - by0);
    if area_a <= 0.0 || area_b <= 0.0 {
        return 0.0;
    }

    let ix = (ax1.min(bx1) - ax0.max(bx0)).max(0.0);
    let iy = (ay1.min(by1) - ay0.max(by0)).max(0.0);
    let intersection = ix * iy;
    intersection / (area_a + area_b - intersection)
}

/// Keeps the highest-scoring candidates whose boxes overlap every kept box by less than
/// `iou_thresh`, stopping after `max_keep`.
pub fn non_max_suppression(
    mut candidates: Vec<PalmRegion>,
    iou_thresh: f32,
    max_keep: usize,
) -> Vec<PalmRegion> {
    // Stable, so equal scores keep anchor order.
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<PalmRegion> = Vec::with_capacity(max_keep.min(candidates.len()));
    for candidate in candidates {
        if kept.len() >= max_keep {
            break;
        }
        let overlaps = kept
            .iter()
            .any(|selected| iou(&candidate.bbox, &selected.bbox) >= iou_thresh);
        if !overlaps {
            kept.push(candidate);
        }
    }
    kept
}

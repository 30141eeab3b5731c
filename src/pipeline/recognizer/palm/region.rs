//! Rotated hand rectangle derived from a palm detection.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use crate::types::PalmRegion;

/// Palm box to hand box growth factor.
const HAND_SCALE: f32 = 2.6;
/// Center shift along the palm's "up" axis, in units of box height.
const HAND_SHIFT_Y: f32 = -0.5;

/// Wraps an angle into `[-PI, PI)`.
pub fn normalize_radians(angle: f32) -> f32 {
    if (-PI..PI).contains(&angle) {
        return angle;
    }
    let mut wrapped = angle - TAU * ((angle + PI) / TAU).floor();
    if wrapped >= PI {
        wrapped -= TAU;
    }
    if wrapped < -PI {
        wrapped += TAU;
    }
    wrapped
}

/// Rotates `(x, y)` counter-clockwise (in image coordinates: clockwise) by `rotation`.
pub fn rotate(x: f32, y: f32, rotation: f32) -> (f32, f32) {
    let (sin, cos) = rotation.sin_cos();
    (x * cos - y * sin, x * sin + y * cos)
}

/// Rotation that makes the wrist (keypoint 0) to middle-finger-base (keypoint 2) axis point up.
pub fn compute_rotation(palm: &PalmRegion) -> f32 {
    let (x0, y0) = palm.keypoints[0];
    let (x2, y2) = palm.keypoints[2];
    normalize_radians(FRAC_PI_2 - (-(y2 - y0)).atan2(x2 - x0))
}

/// Fills in `rotation`, `hand_center`, `hand_size` and `hand_corners` from the box and keypoints.
pub fn compute_hand_region(palm: &mut PalmRegion) {
    let rotation = compute_rotation(palm);
    let (w, h) = (palm.width(), palm.height());
    let (cx, cy) = palm.center();

    let (dx, dy) = rotate(0.0, h * HAND_SHIFT_Y, rotation);
    let hand_center = (cx + dx, cy + dy);

    let side = w.max(h) * HAND_SCALE;
    let (half_w, half_h) = (side * 0.5, side * 0.5);
    let corners = [
        (-half_w, -half_h),
        (half_w, -half_h),
        (half_w, half_h),
        (-half_w, half_h),
    ];

    palm.rotation = rotation;
    palm.hand_center = hand_center;
    palm.hand_size = (side, side);
    palm.hand_corners = corners.map(|(x, y)| {
        let (rx, ry) = rotate(x, y, rotation);
        (rx + hand_center.0, ry + hand_center.1)
    });
}

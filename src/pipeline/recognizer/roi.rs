//! Next-frame ROI from the current landmarks.

use std::f32::consts::FRAC_PI_2;

use crate::{
    pipeline::recognizer::palm::region::rotate,
    types::{HandRoi, LandmarkResult},
};

pub const WRIST: usize = 0;
pub const INDEX_MCP: usize = 5;
pub const MIDDLE_MCP: usize = 9;
pub const PINKY_MCP: usize = 17;

const SPINE_SCALE: f32 = 2.6;
const PALM_SCALE: f32 = 3.5;
const SHIFT_Y: f32 = -0.15;

/// Derives the tracking ROI for the next frame from wrist and MCP joints only.
pub fn estimate_roi(hand: &LandmarkResult) -> HandRoi {
    let (x0, y0) = hand.joint(WRIST);
    let (x9, y9) = hand.joint(MIDDLE_MCP);

    let rotation = (y9 - y0).atan2(x9 - x0) + FRAC_PI_2;

    let size = (hand.joint_distance(WRIST, MIDDLE_MCP) * SPINE_SCALE)
        .max(hand.joint_distance(INDEX_MCP, PINKY_MCP) * PALM_SCALE);

    let (dx, dy) = rotate(0.0, SHIFT_Y, rotation);
    let cx = (x0 + x9) * 0.5 + dx * size;
    let cy = (y0 + y9) * 0.5 + dy * size;

    let (fw, fh) = (hand.frame_width as f32, hand.frame_height as f32);
    HandRoi {
        x_center: cx / fw,
        y_center: cy / fh,
        width: size / fw,
        height: size / fh,
        rotation,
    }
}

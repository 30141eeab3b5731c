use std::time::Duration;

use crate::error::FrameDecodeError;

pub const HAND_JOINT_NUM: usize = 21;
pub const PALM_KEYPOINT_NUM: usize = 7;

/// Tightly packed RGB8 image owned by whichever pipeline stage holds it.
#[derive(Clone, Debug)]
pub struct Frame {
    pub rgb: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Arrival order assigned by the capture stage.
    pub sequence: u64,
}

impl Frame {
    pub fn new(rgb: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        Self {
            rgb,
            width,
            height,
            sequence,
        }
    }

    pub fn black(width: u32, height: u32) -> Self {
        Self::new(vec![0; width as usize * height as usize * 3], width, height, 0)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.rgb.is_empty()
    }

    pub fn validate(&self) -> Result<(), FrameDecodeError> {
        if self.is_empty() {
            return Err(FrameDecodeError::Empty);
        }
        let expected = self.width as usize * self.height as usize * 3;
        if self.rgb.len() != expected {
            return Err(FrameDecodeError::SizeMismatch {
                expected,
                actual: self.rgb.len(),
            });
        }
        Ok(())
    }
}

/// A palm detector candidate. All coordinates are normalized to the frame size.
#[derive(Clone, Debug, PartialEq)]
pub struct PalmRegion {
    pub score: f32,
    /// `[x_min, y_min, x_max, y_max]`
    pub bbox: [f32; 4],
    pub keypoints: [(f32, f32); PALM_KEYPOINT_NUM],
    /// Filled in after non-max suppression.
    pub rotation: f32,
    pub hand_center: (f32, f32),
    pub hand_size: (f32, f32),
    pub hand_corners: [(f32, f32); 4],
}

impl PalmRegion {
    pub fn new(score: f32, bbox: [f32; 4], keypoints: [(f32, f32); PALM_KEYPOINT_NUM]) -> Self {
        Self {
            score,
            bbox,
            keypoints,
            rotation: 0.0,
            hand_center: (0.0, 0.0),
            hand_size: (0.0, 0.0),
            hand_corners: [(0.0, 0.0); 4],
        }
    }

    pub fn width(&self) -> f32 {
        self.bbox[2] - self.bbox[0]
    }

    pub fn height(&self) -> f32 {
        self.bbox[3] - self.bbox[1]
    }

    pub fn center(&self) -> (f32, f32) {
        (
            self.bbox[0] + self.width() * 0.5,
            self.bbox[1] + self.height() * 0.5,
        )
    }

    /// Tracking region derived from this candidate's rotated hand rectangle.
    pub fn hand_roi(&self) -> HandRoi {
        HandRoi {
            x_center: self.hand_center.0,
            y_center: self.hand_center.1,
            width: self.hand_size.0,
            height: self.hand_size.1,
            rotation: self.rotation,
        }
    }
}

/// Rotated region of interest, normalized to the frame size.
///
/// Validity is expressed by the tracker holding `Some(HandRoi)`; there is no invalid `HandRoi`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandRoi {
    pub x_center: f32,
    pub y_center: f32,
    pub width: f32,
    pub height: f32,
    /// Radians.
    pub rotation: f32,
}

/// 21 hand joints in full-frame pixel coordinates. `z` is always zero.
#[derive(Clone, Debug, PartialEq)]
pub struct LandmarkResult {
    pub score: f32,
    pub joints: [[f32; 3]; HAND_JOINT_NUM],
    pub frame_width: u32,
    pub frame_height: u32,
}

impl LandmarkResult {
    pub fn joint(&self, index: usize) -> (f32, f32) {
        let [x, y, _] = self.joints[index];
        (x, y)
    }

    pub fn joint_distance(&self, a: usize, b: usize) -> f32 {
        let (ax, ay) = self.joint(a);
        let (bx, by) = self.joint(b);
        (ax - bx).hypot(ay - by)
    }

    pub fn points(&self) -> Vec<(f32, f32)> {
        (0..HAND_JOINT_NUM).map(|i| self.joint(i)).collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackingMode {
    Searching,
    Tracking,
}

impl TrackingMode {
    pub fn label(&self) -> &'static str {
        match self {
            TrackingMode::Searching => "Searching",
            TrackingMode::Tracking => "Tracking",
        }
    }
}

/// What the inference stage learned about one frame.
#[derive(Clone, Debug)]
pub struct TrackingReport {
    /// Mode the tracker will start the next frame in.
    pub mode: TrackingMode,
    /// True when this frame was served by the tracking path (overlay shows "Tracking").
    pub is_tracking: bool,
    pub hand: Option<LandmarkResult>,
    pub palms: Vec<PalmRegion>,
    pub palm_time: Duration,
    pub hand_time: Duration,
}

impl TrackingReport {
    pub fn idle(mode: TrackingMode) -> Self {
        Self {
            mode,
            is_tracking: false,
            hand: None,
            palms: Vec::new(),
            palm_time: Duration::ZERO,
            hand_time: Duration::ZERO,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RecognizedFrame {
    pub frame: Frame,
    pub report: TrackingReport,
}

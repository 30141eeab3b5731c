use std::{path::PathBuf, time::Duration};

use crate::error::InitError;

pub const MAX_PALM_NUM: usize = 4;

pub const DEFAULT_PALM_MODEL_PATH: &str = "./models/palm_detection_lite.onnx";
pub const DEFAULT_HAND_LANDMARK_MODEL_PATH: &str = "./models/hand_landmark_lite.onnx";

/// SSD anchor layout of the palm detection network.
#[derive(Clone, Debug, PartialEq)]
pub struct AnchorConfig {
    pub input_width: u32,
    pub input_height: u32,
    pub min_scale: f32,
    pub max_scale: f32,
    pub anchor_offset_x: f32,
    pub anchor_offset_y: f32,
    pub strides: Vec<u32>,
    pub aspect_ratios: Vec<f32>,
    pub reduce_boxes_in_lowest_layer: bool,
    pub interpolated_scale_aspect_ratio: f32,
    pub fixed_anchor_size: bool,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            input_width: 192,
            input_height: 192,
            min_scale: 0.1484375,
            max_scale: 0.75,
            anchor_offset_x: 0.5,
            anchor_offset_y: 0.5,
            strides: vec![8, 16, 16, 16],
            aspect_ratios: vec![1.0],
            reduce_boxes_in_lowest_layer: false,
            interpolated_scale_aspect_ratio: 1.0,
            fixed_anchor_size: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PalmDetectorConfig {
    pub conf_threshold: f32,
    pub nms_threshold: f32,
    pub max_palms: usize,
    pub anchors: AnchorConfig,
}

impl PalmDetectorConfig {
    pub fn input_size(&self) -> (u32, u32) {
        (self.anchors.input_width, self.anchors.input_height)
    }
}

impl Default for PalmDetectorConfig {
    fn default() -> Self {
        Self {
            conf_threshold: 0.5,
            nms_threshold: 0.3,
            max_palms: MAX_PALM_NUM,
            anchors: AnchorConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LandmarkConfig {
    pub input_width: u32,
    pub input_height: u32,
    /// Results at or below this score are treated as "hand lost".
    pub min_score: f32,
}

impl Default for LandmarkConfig {
    fn default() -> Self {
        Self {
            input_width: 224,
            input_height: 224,
            min_score: 0.1,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrackerConfig {
    /// Landmark score required to switch from searching to tracking.
    pub enter_threshold: f32,
    /// Landmark score at or below which tracking is dropped.
    pub exit_threshold: f32,
    /// Landmark score required to move the ROI and drive the pointer while tracking.
    pub refresh_threshold: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            enter_threshold: 0.5,
            exit_threshold: 0.4,
            refresh_threshold: 0.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GestureConfig {
    pub screen_width: u32,
    pub screen_height: u32,
    /// Size of the frame-centered rectangle that maps onto the whole screen.
    pub region_width: u32,
    pub region_height: u32,
    /// Click distance threshold as a multiple of the index-MCP to middle-MCP distance.
    pub click_scale: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            screen_width: 1920,
            screen_height: 1080,
            region_width: 560,
            region_height: 315,
            click_scale: 1.3,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    pub frame_width: u32,
    pub frame_height: u32,
    pub queue_capacity: usize,
    /// Flip captured frames horizontally so the pointer follows the hand like a mirror.
    pub mirror: bool,
    /// Upper bound on how long the capture stage waits when the camera has no frame ready.
    pub poll_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_width: 800,
            frame_height: 600,
            queue_capacity: 2,
            mirror: true,
            poll_interval: Duration::from_millis(1),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub palm_model_path: PathBuf,
    pub landmark_model_path: PathBuf,
    pub inference_threads: usize,
    pub camera_index: u32,
    pub palm: PalmDetectorConfig,
    pub landmark: LandmarkConfig,
    pub tracker: TrackerConfig,
    pub gesture: GestureConfig,
    pub pipeline: PipelineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            palm_model_path: PathBuf::from(DEFAULT_PALM_MODEL_PATH),
            landmark_model_path: PathBuf::from(DEFAULT_HAND_LANDMARK_MODEL_PATH),
            inference_threads: 2,
            camera_index: 0,
            palm: PalmDetectorConfig::default(),
            landmark: LandmarkConfig::default(),
            tracker: TrackerConfig::default(),
            gesture: GestureConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), InitError> {
        let invalid = |msg: String| Err(InitError::Config(msg));

        let pipeline = &self.pipeline;
        if pipeline.frame_width == 0 || pipeline.frame_height == 0 {
            return invalid(format!(
                "frame size {}x{} must be non-zero",
                pipeline.frame_width, pipeline.frame_height
            ));
        }
        if pipeline.queue_capacity == 0 {
            return invalid("queue capacity must be at least 1".to_string());
        }

        let gesture = &self.gesture;
        if gesture.region_width == 0
            || gesture.region_height == 0
            || gesture.region_width > pipeline.frame_width
            || gesture.region_height > pipeline.frame_height
        {
            return invalid(format!(
                "capture region {}x{} must be non-empty and fit inside the {}x{} frame",
                gesture.region_width,
                gesture.region_height,
                pipeline.frame_width,
                pipeline.frame_height
            ));
        }
        if gesture.screen_width == 0 || gesture.screen_height == 0 {
            return invalid("screen size must be non-zero".to_string());
        }

        for (name, value) in [
            ("confidence threshold", self.palm.conf_threshold),
            ("nms threshold", self.palm.nms_threshold),
            ("landmark min score", self.landmark.min_score),
            ("track enter threshold", self.tracker.enter_threshold),
            ("track exit threshold", self.tracker.exit_threshold),
            ("track refresh threshold", self.tracker.refresh_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return invalid(format!("{name} {value} is outside [0, 1]"));
            }
        }
        if self.tracker.exit_threshold > self.tracker.enter_threshold {
            return invalid(format!(
                "track exit threshold {} exceeds enter threshold {}",
                self.tracker.exit_threshold, self.tracker.enter_threshold
            ));
        }
        if self.palm.max_palms == 0 {
            return invalid("max palms must be at least 1".to_string());
        }
        if self.palm.anchors.strides.is_empty() || self.palm.anchors.strides.contains(&0) {
            return invalid("anchor strides must be non-empty and non-zero".to_string());
        }
        if self.landmark.input_width == 0 || self.landmark.input_height == 0 {
            return invalid("landmark input size must be non-zero".to_string());
        }
        if self.inference_threads == 0 {
            return invalid("inference threads must be at least 1".to_string());
        }

        Ok(())
    }
}

use std::path::PathBuf;

use clap::Parser;

use crate::config::AppConfig;

/// Drive the mouse pointer with one hand in front of a camera.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Palm detection model (ONNX)
    #[arg(long, value_name = "FILE")]
    pub palm_model: Option<PathBuf>,

    /// Hand landmark model (ONNX)
    #[arg(long, value_name = "FILE")]
    pub landmark_model: Option<PathBuf>,

    /// Camera index
    #[arg(long, value_name = "INDEX")]
    pub camera: Option<u32>,

    /// Capture width in pixels
    #[arg(long, value_name = "PIXELS")]
    pub width: Option<u32>,

    /// Capture height in pixels
    #[arg(long, value_name = "PIXELS")]
    pub height: Option<u32>,

    /// Target screen width for pointer mapping
    #[arg(long, value_name = "PIXELS")]
    pub screen_width: Option<u32>,

    /// Target screen height for pointer mapping
    #[arg(long, value_name = "PIXELS")]
    pub screen_height: Option<u32>,

    /// Width of the frame-centered capture region mapped onto the screen
    #[arg(long, value_name = "PIXELS")]
    pub region_width: Option<u32>,

    /// Height of the frame-centered capture region mapped onto the screen
    #[arg(long, value_name = "PIXELS")]
    pub region_height: Option<u32>,

    /// Palm detection confidence threshold (0.0 - 1.0)
    #[arg(long, value_name = "THRESHOLD")]
    pub confidence: Option<f32>,

    /// NMS IoU threshold (0.0 - 1.0)
    #[arg(long, value_name = "THRESHOLD")]
    pub nms_threshold: Option<f32>,

    /// Threads used inside each inference engine
    #[arg(long, value_name = "COUNT")]
    pub threads: Option<usize>,

    /// Do not mirror captured frames
    #[arg(long)]
    pub no_mirror: bool,

    /// Do not create a virtual pointer device (vision only)
    #[arg(long)]
    pub no_pointer: bool,

    /// Periodically write the annotated frame to this PNG file
    #[arg(long, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,

    /// Write a snapshot every N rendered frames
    #[arg(long, default_value = "30", value_name = "COUNT")]
    pub snapshot_every: u64,
}

impl From<&Args> for AppConfig {
    fn from(args: &Args) -> Self {
        let mut config = AppConfig::default();

        if let Some(path) = &args.palm_model {
            config.palm_model_path = path.clone();
        }
        if let Some(path) = &args.landmark_model {
            config.landmark_model_path = path.clone();
        }
        if let Some(index) = args.camera {
            config.camera_index = index;
        }
        if let Some(width) = args.width {
            config.pipeline.frame_width = width;
        }
        if let Some(height) = args.height {
            config.pipeline.frame_height = height;
        }
        if let Some(width) = args.screen_width {
            config.gesture.screen_width = width;
        }
        if let Some(height) = args.screen_height {
            config.gesture.screen_height = height;
        }
        if let Some(width) = args.region_width {
            config.gesture.region_width = width;
        }
        if let Some(height) = args.region_height {
            config.gesture.region_height = height;
        }
        if let Some(threshold) = args.confidence {
            config.palm.conf_threshold = threshold;
        }
        if let Some(threshold) = args.nms_threshold {
            config.palm.nms_threshold = threshold;
        }
        if let Some(threads) = args.threads {
            config.inference_threads = threads;
        }
        config.pipeline.mirror = !args.no_mirror;

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let args = Args::parse_from([
            "gesture-pointer",
            "--width",
            "640",
            "--height",
            "480",
            "--confidence",
            "0.7",
            "--no-mirror",
        ]);
        let config = AppConfig::from(&args);
        assert_eq!(config.pipeline.frame_width, 640);
        assert_eq!(config.pipeline.frame_height, 480);
        assert_eq!(config.palm.conf_threshold, 0.7);
        assert!(!config.pipeline.mirror);
        assert_eq!(config.gesture, AppConfig::default().gesture);
    }

    #[test]
    fn no_flags_means_defaults() {
        let args = Args::parse_from(["gesture-pointer"]);
        assert_eq!(AppConfig::from(&args), AppConfig::default());
    }
}

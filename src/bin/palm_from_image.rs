use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use image::RgbImage;

use gesture_pointer::{
    config::{AppConfig, DEFAULT_HAND_LANDMARK_MODEL_PATH, DEFAULT_PALM_MODEL_PATH},
    pipeline::{
        recognizer::{
            engine::OrtEngine,
            landmark::LandmarkTracker,
            palm::{PalmDetector, anchors::Anchors},
        },
        skeleton,
    },
    types::Frame,
};

/// Run palm detection (and landmarks on the best palm) on a still image.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input image
    #[arg(default_value = "demo/hand.png")]
    input: PathBuf,

    /// Annotated output image
    #[arg(default_value = "demo/hand_with_landmarks.png")]
    output: PathBuf,

    #[arg(long, default_value = DEFAULT_PALM_MODEL_PATH, value_name = "FILE")]
    palm_model: PathBuf,

    #[arg(long, default_value = DEFAULT_HAND_LANDMARK_MODEL_PATH, value_name = "FILE")]
    landmark_model: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = AppConfig::default();

    let mut frame = load_frame(&args.input).context("failed to read input image")?;

    let anchors = Arc::new(Anchors::generate(&config.palm.anchors));
    let mut palm_detector = PalmDetector::new(
        OrtEngine::load(&args.palm_model, config.inference_threads, "palm")?,
        anchors,
        config.palm.clone(),
    );

    let palms = palm_detector.detect(&frame)?;
    if palms.is_empty() {
        println!("No palms detected in {}", args.input.display());
        return Ok(());
    }
    println!("Detected {} palms in {}", palms.len(), args.input.display());
    for (i, palm) in palms.iter().enumerate() {
        let (cx, cy) = palm.center();
        println!(
            "  #{i}: score {:.3} center ({cx:.3}, {cy:.3}) rotation {:.1} deg",
            palm.score,
            palm.rotation.to_degrees()
        );
    }

    let mut landmark_tracker = LandmarkTracker::new(
        OrtEngine::load(&args.landmark_model, config.inference_threads, "landmark")?,
        config.landmark.clone(),
    );
    let hand = landmark_tracker.run(&frame, &palms[0].hand_roi())?;

    let (width, height) = (frame.width, frame.height);
    skeleton::draw_palm_regions(&mut frame.rgb, width, height, &palms);
    match &hand {
        Some(hand) => {
            println!("Hand landmarks score {:.3}", hand.score);
            skeleton::draw_skeleton(&mut frame.rgb, width, height, &hand.points());
        }
        None => println!("No hand landmarks for the best palm"),
    }

    let output = RgbImage::from_raw(width, height, frame.rgb)
        .ok_or_else(|| anyhow!("failed to build image buffer"))?;
    output
        .save(&args.output)
        .with_context(|| format!("failed to save {}", args.output.display()))?;
    println!("Wrote {}", args.output.display());

    Ok(())
}

fn load_frame(path: &PathBuf) -> Result<Frame> {
    let image = image::open(path)
        .with_context(|| format!("failed to open image {}", path.display()))?
        .to_rgb8();
    let (width, height) = image.dimensions();
    Ok(Frame::new(image.into_raw(), width, height, 0))
}

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;

use gesture_pointer::{
    args::Args,
    camera::{NokhwaCamera, available_cameras},
    config::AppConfig,
    display::{Display, LogDisplay, SnapshotDisplay},
    error::InitError,
    gesture::GestureMapper,
    pipeline::{
        recognizer::{
            Recognizer,
            engine::OrtEngine,
            landmark::LandmarkTracker,
            palm::{PalmDetector, anchors::Anchors},
            tracker::HandTracker,
        },
        start_pipeline,
    },
    pointer::{self, NullPointer, PointerDevice},
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = AppConfig::from(&args);
    config.validate()?;

    // Fail fast on models and camera before any thread starts.
    let palm_engine = OrtEngine::load(&config.palm_model_path, config.inference_threads, "palm")?;
    let landmark_engine = OrtEngine::load(
        &config.landmark_model_path,
        config.inference_threads,
        "landmark",
    )?;
    let anchors = Arc::new(Anchors::generate(&config.palm.anchors));

    match available_cameras() {
        Ok(cameras) => {
            for camera in cameras {
                log::info!("found camera #{}: {}", camera.index, camera.label);
            }
        }
        Err(err) => log::warn!("failed to list cameras: {err:?}"),
    }
    let (camera_index, width, height) = (
        config.camera_index,
        config.pipeline.frame_width,
        config.pipeline.frame_height,
    );
    drop(NokhwaCamera::open(camera_index, width, height).map_err(InitError::Camera)?);

    let display: Box<dyn Display + Send> = match &args.snapshot {
        Some(path) => Box::new(SnapshotDisplay::new(path.clone(), args.snapshot_every)),
        None => Box::new(LogDisplay::default()),
    };

    let no_pointer = args.no_pointer;
    let build_recognizer = {
        let config = config.clone();
        move || -> Result<_> {
            let pointer = if no_pointer {
                log::info!("pointer output disabled");
                Box::new(NullPointer) as Box<dyn PointerDevice>
            } else {
                pointer::open_or_null(|| open_pointer(&config))
            };
            Ok(Recognizer::new(
                PalmDetector::new(palm_engine, anchors, config.palm.clone()),
                LandmarkTracker::new(landmark_engine, config.landmark.clone()),
                HandTracker::new(config.tracker.clone()),
                GestureMapper::new(pointer, config.gesture.clone()),
            ))
        }
    };

    let pipeline = start_pipeline(
        &config.pipeline,
        config.gesture.clone(),
        move || NokhwaCamera::open(camera_index, width, height),
        build_recognizer,
        display,
    )?;

    let shutdown = pipeline.shutdown();
    ctrlc::set_handler(move || shutdown.trigger()).context("failed to install Ctrl-C handler")?;

    pipeline.wait();
    log::info!("bye");
    Ok(())
}

#[cfg(feature = "pointer-enigo")]
fn open_pointer(
    config: &AppConfig,
) -> Result<Box<dyn PointerDevice>, gesture_pointer::error::DeviceUnavailable> {
    let device = pointer::VirtualPointer::open(
        config.gesture.screen_width,
        config.gesture.screen_height,
    )?;
    Ok(Box::new(device))
}

#[cfg(not(feature = "pointer-enigo"))]
fn open_pointer(
    _config: &AppConfig,
) -> Result<Box<dyn PointerDevice>, gesture_pointer::error::DeviceUnavailable> {
    Err(gesture_pointer::error::DeviceUnavailable {
        reason: "built without the pointer-enigo feature".to_string(),
    })
}

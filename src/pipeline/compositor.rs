use std::time::{Duration, Instant};

use crate::{
    config::GestureConfig,
    display::{Display, DisplayAction},
    pipeline::skeleton::{self, Color, GREEN, RED, YELLOW},
    types::{Frame, RecognizedFrame, TrackingMode, TrackingReport},
};

use super::queue::{HandoffQueue, Shutdown};

const FPS_WINDOW: Duration = Duration::from_secs(1);
const FPS_LABEL_INSET: u32 = 130;

/// Text for the display to draw, anchored at its baseline start.
#[derive(Clone, Debug, PartialEq)]
pub struct TextLabel {
    pub text: String,
    pub x: u32,
    pub y: u32,
    pub color: Color,
}

/// A frame with its overlay rasterised, plus the text the display should put on top.
#[derive(Clone, Debug)]
pub struct AnnotatedFrame {
    pub frame: Frame,
    pub labels: Vec<TextLabel>,
    pub mode: TrackingMode,
    pub is_tracking: bool,
    pub fps: f32,
}

/// Frames per second, refreshed once per window of at least [`FPS_WINDOW`].
#[derive(Debug)]
pub struct FpsCounter {
    window_start: Instant,
    frames: u32,
    fps: f32,
}

impl FpsCounter {
    pub fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames: 0,
            fps: 0.0,
        }
    }

    pub fn tick(&mut self, now: Instant) -> f32 {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed >= FPS_WINDOW {
            self.fps = self.frames as f32 / elapsed.as_secs_f32();
            self.frames = 0;
            self.window_start = now;
        }
        self.fps
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

pub fn overlay_labels(report: &TrackingReport, fps: f32, frame_width: u32) -> Vec<TextLabel> {
    let (mode, mode_color) = if report.is_tracking {
        ("Tracking", GREEN)
    } else {
        ("Searching", RED)
    };
    vec![
        TextLabel {
            text: mode.to_string(),
            x: 10,
            y: 20,
            color: mode_color,
        },
        TextLabel {
            text: format!("Palm: {:.1}ms", millis(report.palm_time)),
            x: 10,
            y: 40,
            color: YELLOW,
        },
        TextLabel {
            text: format!("Hand: {:.1}ms", millis(report.hand_time)),
            x: 10,
            y: 60,
            color: YELLOW,
        },
        TextLabel {
            text: format!("FPS: {fps:.1}"),
            x: frame_width.saturating_sub(FPS_LABEL_INSET),
            y: 20,
            color: GREEN,
        },
    ]
}

/// Rasterises the capture region, palm candidates and hand skeleton onto the frame.
pub fn annotate(recognized: RecognizedFrame, fps: f32, gesture: &GestureConfig) -> AnnotatedFrame {
    let RecognizedFrame { mut frame, report } = recognized;
    let (width, height) = (frame.width, frame.height);

    skeleton::draw_capture_region(
        &mut frame.rgb,
        width,
        height,
        gesture.region_width,
        gesture.region_height,
    );
    if !report.palms.is_empty() {
        skeleton::draw_palm_regions(&mut frame.rgb, width, height, &report.palms);
    }
    if let Some(hand) = &report.hand {
        skeleton::draw_skeleton(&mut frame.rgb, width, height, &hand.points());
    }

    AnnotatedFrame {
        labels: overlay_labels(&report, fps, width),
        frame,
        mode: report.mode,
        is_tracking: report.is_tracking,
        fps,
    }
}

/// Render stage: annotates each result and hands it to `display` until shutdown.
///
/// A display asking to quit triggers shutdown for the whole pipeline.
pub fn run_render_loop<D: Display + ?Sized>(
    display: &mut D,
    results: &HandoffQueue<RecognizedFrame>,
    shutdown: &Shutdown,
    gesture: &GestureConfig,
) {
    let mut fps = FpsCounter::new(Instant::now());

    while !shutdown.is_triggered() {
        let Some(recognized) = results.pop() else {
            break;
        };
        if recognized.frame.is_empty() {
            continue;
        }

        let current_fps = fps.tick(Instant::now());
        let annotated = annotate(recognized, current_fps, gesture);
        match display.present(&annotated) {
            Ok(DisplayAction::Continue) => {}
            Ok(DisplayAction::Quit) => {
                log::info!("display requested quit");
                shutdown.trigger();
                break;
            }
            Err(err) => log::warn!("failed to present frame {}: {err:?}", annotated.frame.sequence),
        }
    }

    log::info!("render stage stopped at {:.1} fps", fps.fps());
}

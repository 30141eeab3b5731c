pub mod engine;
pub mod landmark;
pub mod palm;
pub mod roi;
pub mod tracker;
pub mod transform;

use crate::{
    error::InferenceError,
    gesture::GestureMapper,
    pointer::PointerDevice,
    types::{Frame, RecognizedFrame, TrackingReport},
};

use self::tracker::{HandTracker, LandmarkStage, PalmStage};
use super::queue::{HandoffQueue, Shutdown};

/// Everything the inference stage owns: both networks, the tracking state and the click latch.
pub struct Recognizer<P, L, D> {
    palm: P,
    landmark: L,
    tracker: HandTracker,
    gesture: GestureMapper<D>,
}

impl<P, L, D> Recognizer<P, L, D>
where
    P: PalmStage,
    L: LandmarkStage,
    D: PointerDevice,
{
    pub fn new(palm: P, landmark: L, tracker: HandTracker, gesture: GestureMapper<D>) -> Self {
        Self {
            palm,
            landmark,
            tracker,
            gesture,
        }
    }

    pub fn tracker(&self) -> &HandTracker {
        &self.tracker
    }

    /// Tracks the hand in one frame and drives the pointer from confident tracking results.
    pub fn process(&mut self, frame: &Frame) -> Result<TrackingReport, InferenceError> {
        let gesture = &mut self.gesture;
        self.tracker
            .process(frame, &mut self.palm, &mut self.landmark, |hand| {
                gesture.apply(hand)
            })
    }
}

/// Inference stage: one frame in, one annotated frame out, until shutdown.
///
/// A frame whose inference fails is still forwarded, with an empty report, so the display keeps
/// running.
pub fn run_inference_loop<P, L, D>(
    recognizer: &mut Recognizer<P, L, D>,
    frames: &HandoffQueue<Frame>,
    results: &HandoffQueue<RecognizedFrame>,
    shutdown: &Shutdown,
) where
    P: PalmStage,
    L: LandmarkStage,
    D: PointerDevice,
{
    let mut processed = 0u64;

    while !shutdown.is_triggered() {
        let Some(frame) = frames.pop() else {
            break;
        };
        if frame.is_empty() {
            continue;
        }

        let report = match recognizer.process(&frame) {
            Ok(report) => {
                log::trace!(
                    "frame {}: {} palm {:.1}ms hand {:.1}ms",
                    frame.sequence,
                    report.mode.label(),
                    report.palm_time.as_secs_f64() * 1000.0,
                    report.hand_time.as_secs_f64() * 1000.0
                );
                report
            }
            Err(err) => {
                log::warn!("inference failed on frame {}: {err:?}", frame.sequence);
                TrackingReport::idle(recognizer.tracker().mode())
            }
        };

        processed += 1;
        results.push(RecognizedFrame { frame, report });
    }

    log::info!("inference stage stopped after {processed} frames");
}

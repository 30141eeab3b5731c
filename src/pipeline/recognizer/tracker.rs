//! Searching/tracking state machine.
//!
//! While tracking, the landmark network is run on the ROI carried over from the previous frame
//! and the palm detector is skipped. Entering tracking needs a landmark score above
//! `enter_threshold`; leaving it happens at or below `exit_threshold`. Between the two the
//! overlay keeps showing the hand but the ROI is only refreshed above `refresh_threshold`.

use std::time::{Duration, Instant};

use crate::{
    config::TrackerConfig,
    error::InferenceError,
    types::{Frame, HandRoi, LandmarkResult, PalmRegion, TrackingMode, TrackingReport},
};

use super::{
    engine::InferenceEngine, landmark::LandmarkTracker, palm::PalmDetector, roi::estimate_roi,
};

pub trait PalmStage {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<PalmRegion>, InferenceError>;
}

pub trait LandmarkStage {
    fn track(
        &mut self,
        frame: &Frame,
        roi: &HandRoi,
    ) -> Result<Option<LandmarkResult>, InferenceError>;
}

impl<E: InferenceEngine> PalmStage for PalmDetector<E> {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<PalmRegion>, InferenceError> {
        PalmDetector::detect(self, frame)
    }
}

impl<E: InferenceEngine> LandmarkStage for LandmarkTracker<E> {
    fn track(
        &mut self,
        frame: &Frame,
        roi: &HandRoi,
    ) -> Result<Option<LandmarkResult>, InferenceError> {
        self.run(frame, roi)
    }
}

fn timed<T>(elapsed: &mut Duration, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let out = f();
    *elapsed += start.elapsed();
    out
}

/// Owns the only cross-frame tracking state: the ROI to try on the next frame.
pub struct HandTracker {
    roi: Option<HandRoi>,
    config: TrackerConfig,
}

impl HandTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self { roi: None, config }
    }

    pub fn mode(&self) -> TrackingMode {
        if self.roi.is_some() {
            TrackingMode::Tracking
        } else {
            TrackingMode::Searching
        }
    }

    pub fn roi(&self) -> Option<&HandRoi> {
        self.roi.as_ref()
    }

    /// Processes one frame. `on_confident` runs for a tracked hand whose score clears the
    /// refresh threshold.
    ///
    /// On error the ROI is left exactly as it was before the call.
    pub fn process<P, L, F>(
        &mut self,
        frame: &Frame,
        palm: &mut P,
        landmark: &mut L,
        mut on_confident: F,
    ) -> Result<TrackingReport, InferenceError>
    where
        P: PalmStage + ?Sized,
        L: LandmarkStage + ?Sized,
        F: FnMut(&LandmarkResult),
    {
        let mut next_roi = self.roi;
        let mut report = TrackingReport::idle(self.mode());
        let mut hand_found = false;

        if let Some(roi) = self.roi {
            let result = timed(&mut report.hand_time, || landmark.track(frame, &roi))?;
            match result {
                Some(hand) if hand.score > self.config.exit_threshold => {
                    hand_found = true;
                    report.is_tracking = true;
                    if hand.score > self.config.refresh_threshold {
                        next_roi = Some(estimate_roi(&hand));
                        on_confident(&hand);
                    }
                    report.hand = Some(hand);
                }
                other => {
                    log::debug!(
                        "frame {}: lost hand (score {:?})",
                        frame.sequence,
                        other.as_ref().map(|hand| hand.score)
                    );
                    next_roi = None;
                    report.hand = other;
                }
            }
        }

        if !hand_found {
            let palms = timed(&mut report.palm_time, || palm.detect(frame))?;
            if let Some(best) = palms.first() {
                let candidate_roi = best.hand_roi();
                let result =
                    timed(&mut report.hand_time, || landmark.track(frame, &candidate_roi))?;
                if let Some(hand) = result {
                    if hand.score > self.config.enter_threshold {
                        log::debug!(
                            "frame {}: acquired hand (score {})",
                            frame.sequence,
                            hand.score
                        );
                        next_roi = Some(estimate_roi(&hand));
                    }
                    report.hand = Some(hand);
                }
            }
            report.palms = palms;
        }

        self.roi = next_roi;
        report.mode = self.mode();
        Ok(report)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::types::{HAND_JOINT_NUM, PALM_KEYPOINT_NUM};

    /// Returns queued palm lists, then nothing.
    #[derive(Default)]
    pub(crate) struct ScriptedPalms {
        pub results: VecDeque<Result<Vec<PalmRegion>, InferenceError>>,
        pub calls: usize,
    }

    impl PalmStage for ScriptedPalms {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<PalmRegion>, InferenceError> {
            self.calls += 1;
            self.results.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    /// Returns a hand with each queued score (`None` for no hand), then nothing.
    #[derive(Default)]
    pub(crate) struct ScriptedLandmarks {
        pub scores: VecDeque<Result<Option<f32>, InferenceError>>,
        pub rois: Vec<HandRoi>,
    }

    impl ScriptedLandmarks {
        pub(crate) fn with_scores(scores: &[f32]) -> Self {
            Self {
                scores: scores.iter().map(|&s| Ok(Some(s))).collect(),
                rois: Vec::new(),
            }
        }
    }

    impl LandmarkStage for ScriptedLandmarks {
        fn track(
            &mut self,
            frame: &Frame,
            roi: &HandRoi,
        ) -> Result<Option<LandmarkResult>, InferenceError> {
            self.rois.push(*roi);
            let score = self.scores.pop_front().unwrap_or(Ok(None))?;
            Ok(score.map(|score| hand_at(score, frame, 400.0, 300.0)))
        }
    }

    /// A hand whose wrist sits at `(x, y)` with the middle MCP 100 px above it.
    pub(crate) fn hand_at(score: f32, frame: &Frame, x: f32, y: f32) -> LandmarkResult {
        let mut joints = [[x, y - 50.0, 0.0]; HAND_JOINT_NUM];
        joints[0] = [x, y, 0.0];
        joints[9] = [x, y - 100.0, 0.0];
        LandmarkResult {
            score,
            joints,
            frame_width: frame.width,
            frame_height: frame.height,
        }
    }

    pub(crate) fn palm() -> PalmRegion {
        let mut palm = PalmRegion::new(0.9, [0.4, 0.4, 0.6, 0.6], [(0.5, 0.5); PALM_KEYPOINT_NUM]);
        palm.hand_center = (0.5, 0.45);
        palm.hand_size = (0.5, 0.5);
        palm
    }

    fn frame() -> Frame {
        Frame::black(800, 600)
    }

    #[test]
    fn searching_without_palms_stays_searching() {
        let mut tracker = HandTracker::new(TrackerConfig::default());
        let mut palms = ScriptedPalms::default();
        let mut landmarks = ScriptedLandmarks::default();

        let report = tracker
            .process(&frame(), &mut palms, &mut landmarks, |_| {})
            .unwrap();

        assert_eq!(report.mode, TrackingMode::Searching);
        assert!(!report.is_tracking);
        assert!(report.hand.is_none());
        assert_eq!(palms.calls, 1);
        assert!(landmarks.rois.is_empty());
    }

    #[test]
    fn confident_landmarks_after_detection_enter_tracking() {
        let mut tracker = HandTracker::new(TrackerConfig::default());
        let mut palms = ScriptedPalms {
            results: VecDeque::from([Ok(vec![palm()])]),
            ..Default::default()
        };
        let mut landmarks = ScriptedLandmarks::with_scores(&[0.8]);
        let mut confident = 0;

        let report = tracker
            .process(&frame(), &mut palms, &mut landmarks, |_| confident += 1)
            .unwrap();

        assert_eq!(report.mode, TrackingMode::Tracking);
        // Acquisition frames are drawn as searching and do not move the pointer.
        assert!(!report.is_tracking);
        assert_eq!(confident, 0);
        assert_eq!(report.palms.len(), 1);
        assert_eq!(landmarks.rois[0], palm().hand_roi());
        assert!(tracker.roi().is_some());
    }

    #[test]
    fn weak_landmarks_after_detection_keep_searching() {
        let mut tracker = HandTracker::new(TrackerConfig::default());
        let mut palms = ScriptedPalms {
            results: VecDeque::from([Ok(vec![palm()])]),
            ..Default::default()
        };
        let mut landmarks = ScriptedLandmarks::with_scores(&[0.5]);

        let report = tracker
            .process(&frame(), &mut palms, &mut landmarks, |_| {})
            .unwrap();

        assert_eq!(report.mode, TrackingMode::Searching);
        assert!(report.hand.is_some());
        assert!(tracker.roi().is_none());
    }

    #[test]
    fn hysteresis_band_keeps_tracking_until_exit_threshold() {
        let mut tracker = HandTracker::new(TrackerConfig::default());
        let mut palms = ScriptedPalms {
            results: VecDeque::from([Ok(vec![palm()])]),
            ..Default::default()
        };
        // Acquisition, then the tracked scores.
        let mut landmarks = ScriptedLandmarks::with_scores(&[0.9, 0.6, 0.45, 0.35, 0.6]);
        let mut confident = Vec::new();

        let acquired = tracker
            .process(&frame(), &mut palms, &mut landmarks, |hand| confident.push(hand.score))
            .unwrap();
        assert_eq!(acquired.mode, TrackingMode::Tracking);

        let mut modes = Vec::new();
        let mut shown = Vec::new();
        for _ in 0..4 {
            let report = tracker
                .process(&frame(), &mut palms, &mut landmarks, |hand| {
                    confident.push(hand.score)
                })
                .unwrap();
            modes.push(report.mode);
            shown.push(report.is_tracking);
        }

        assert_eq!(
            modes,
            vec![
                TrackingMode::Tracking,
                TrackingMode::Tracking,
                TrackingMode::Searching,
                TrackingMode::Searching,
            ]
        );
        assert_eq!(shown, vec![true, true, false, false]);
        // Only the 0.6 frame drives the pointer; 0.45 is inside the band.
        assert_eq!(confident, vec![0.6]);
        // After losing the hand, detection runs on the same frame and the next one.
        assert_eq!(palms.calls, 3);
        // The unused 0.6 score was never requested: no palm, no landmark run.
        assert_eq!(landmarks.scores.len(), 1);
    }

    #[test]
    fn band_score_keeps_the_previous_roi() {
        let mut tracker = HandTracker::new(TrackerConfig::default());
        let mut palms = ScriptedPalms {
            results: VecDeque::from([Ok(vec![palm()])]),
            ..Default::default()
        };
        let mut landmarks = ScriptedLandmarks::with_scores(&[0.9, 0.45]);

        tracker
            .process(&frame(), &mut palms, &mut landmarks, |_| {})
            .unwrap();
        let before = *tracker.roi().unwrap();
        tracker
            .process(&frame(), &mut palms, &mut landmarks, |_| {})
            .unwrap();

        assert_eq!(*tracker.roi().unwrap(), before);
        assert_eq!(landmarks.rois[1], before);
    }

    #[test]
    fn lost_hand_falls_through_to_detection_in_the_same_frame() {
        let mut tracker = HandTracker::new(TrackerConfig::default());
        let mut palms = ScriptedPalms {
            results: VecDeque::from([Ok(vec![palm()]), Ok(vec![palm()])]),
            ..Default::default()
        };
        let mut landmarks = ScriptedLandmarks {
            scores: VecDeque::from([Ok(Some(0.9)), Ok(None), Ok(Some(0.7))]),
            rois: Vec::new(),
        };

        tracker
            .process(&frame(), &mut palms, &mut landmarks, |_| {})
            .unwrap();
        let report = tracker
            .process(&frame(), &mut palms, &mut landmarks, |_| {})
            .unwrap();

        assert_eq!(palms.calls, 2);
        assert_eq!(report.mode, TrackingMode::Tracking);
        assert!(!report.is_tracking);
        assert_eq!(report.palms.len(), 1);
        assert_eq!(landmarks.rois.len(), 3);
    }

    #[test]
    fn inference_error_preserves_tracking_state() {
        let mut tracker = HandTracker::new(TrackerConfig::default());
        let mut palms = ScriptedPalms {
            results: VecDeque::from([
                Ok(vec![palm()]),
                Err(InferenceError::MissingOutput(0)),
            ]),
            ..Default::default()
        };
        let mut landmarks = ScriptedLandmarks {
            scores: VecDeque::from([
                Ok(Some(0.9)),
                Err(InferenceError::MissingOutput(1)),
                Ok(Some(0.2)),
            ]),
            rois: Vec::new(),
        };

        tracker
            .process(&frame(), &mut palms, &mut landmarks, |_| {})
            .unwrap();
        let roi = *tracker.roi().unwrap();

        // Landmark failure while tracking.
        assert!(
            tracker
                .process(&frame(), &mut palms, &mut landmarks, |_| {})
                .is_err()
        );
        assert_eq!(tracker.roi(), Some(&roi));

        // Hand lost, then the detector fails: the ROI survives for the next frame.
        assert!(
            tracker
                .process(&frame(), &mut palms, &mut landmarks, |_| {})
                .is_err()
        );
        assert_eq!(tracker.roi(), Some(&roi));
        assert_eq!(tracker.mode(), TrackingMode::Tracking);
    }
}

use crate::{
    config::LandmarkConfig,
    error::InferenceError,
    types::{Frame, HAND_JOINT_NUM, HandRoi, LandmarkResult},
};

use super::{
    engine::InferenceEngine,
    transform::{roi_to_input_transform, warp_affine},
};

/// `x, y, z` per joint, in input pixels.
const LANDMARKS_OUTPUT: usize = 0;
const SCORE_OUTPUT: usize = 1;
const VALUES_PER_JOINT: usize = 3;

/// Hand landmark network run on a rotated crop of the full frame.
pub struct LandmarkTracker<E> {
    engine: E,
    config: LandmarkConfig,
}

impl<E: InferenceEngine> LandmarkTracker<E> {
    pub fn new(engine: E, config: LandmarkConfig) -> Self {
        Self { engine, config }
    }

    pub fn config(&self) -> &LandmarkConfig {
        &self.config
    }

    /// Crops `roi` out of `frame`, runs the network and maps the joints back to frame pixels.
    ///
    /// `Ok(None)` means the hand is lost: the score is at or below `min_score`, or the ROI is
    /// degenerate.
    pub fn run(
        &mut self,
        frame: &Frame,
        roi: &HandRoi,
    ) -> Result<Option<LandmarkResult>, InferenceError> {
        frame.validate()?;
        let (in_w, in_h) = (self.config.input_width, self.config.input_height);

        let Some(frame_to_input) = roi_to_input_transform(roi, frame.width, frame.height, in_w, in_h)
        else {
            log::trace!("skipping degenerate roi {roi:?}");
            return Ok(None);
        };
        let Some(input_to_frame) = frame_to_input.invert() else {
            return Ok(None);
        };

        let input = warp_affine(frame, &input_to_frame, in_w, in_h)?;
        let outputs = self.engine.run(input)?;

        let score = outputs.tensor_min_len(SCORE_OUTPUT, 1)?[0];
        if score <= self.config.min_score {
            return Ok(None);
        }

        let landmarks =
            outputs.tensor_min_len(LANDMARKS_OUTPUT, HAND_JOINT_NUM * VALUES_PER_JOINT)?;
        let mut joints = [[0.0f32; 3]; HAND_JOINT_NUM];
        for (joint, raw) in joints
            .iter_mut()
            .zip(landmarks.chunks_exact(VALUES_PER_JOINT))
        {
            let (x, y) = input_to_frame.apply(raw[0] as f64, raw[1] as f64);
            *joint = [x as f32, y as f32, 0.0];
        }

        Ok(Some(LandmarkResult {
            score,
            joints,
            frame_width: frame.width,
            frame_height: frame.height,
        }))
    }
}

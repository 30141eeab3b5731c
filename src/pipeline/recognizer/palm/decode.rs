use crate::{
    error::InferenceError,
    types::{PALM_KEYPOINT_NUM, PalmRegion},
};

use super::anchors::Anchors;

/// Values per anchor in the regressor output: box (4) + 7 keypoints (14).
pub const REGRESSOR_STRIDE: usize = 4 + 2 * PALM_KEYPOINT_NUM;

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Turns raw detector outputs into candidates whose sigmoid score exceeds `score_thresh`.
///
/// `scores` holds one logit per anchor; `boxes` holds [`REGRESSOR_STRIDE`] values per anchor,
/// as offsets in input pixels relative to the anchor center. Empty outputs decode to nothing.
pub fn decode_palms(
    scores: &[f32],
    boxes: &[f32],
    anchors: &Anchors,
    input_size: (u32, u32),
    score_thresh: f32,
) -> Result<Vec<PalmRegion>, InferenceError> {
    if scores.is_empty() {
        return Ok(Vec::new());
    }
    if scores.len() < anchors.len() {
        return Err(InferenceError::OutputTooShort {
            index: 1,
            expected: anchors.len(),
            actual: scores.len(),
        });
    }
    let expected_boxes = anchors.len() * REGRESSOR_STRIDE;
    if boxes.len() < expected_boxes {
        return Err(InferenceError::OutputTooShort {
            index: 0,
            expected: expected_boxes,
            actual: boxes.len(),
        });
    }

    let in_w = input_size.0 as f32;
    let in_h = input_size.1 as f32;
    let mut palms = Vec::new();

    for (i, anchor) in anchors.iter().enumerate() {
        let score = sigmoid(scores[i]);
        if score <= score_thresh {
            continue;
        }

        let p = &boxes[i * REGRESSOR_STRIDE..(i + 1) * REGRESSOR_STRIDE];
        let anchor_x = anchor.x_center * in_w;
        let anchor_y = anchor.y_center * in_h;

        let cx = (p[0] + anchor_x) / in_w;
        let cy = (p[1] + anchor_y) / in_h;
        let w = p[2] / in_w;
        let h = p[3] / in_h;
        let bbox = [cx - w * 0.5, cy - h * 0.5, cx + w * 0.5, cy + h * 0.5];

        let mut keypoints = [(0.0, 0.0); PALM_KEYPOINT_NUM];
        for (j, keypoint) in keypoints.iter_mut().enumerate() {
            let lx = p[4 + 2 * j] + anchor_x;
            let ly = p[4 + 2 * j + 1] + anchor_y;
            *keypoint = (lx / in_w, ly / in_h);
        }

        palms.push(PalmRegion::new(score, bbox, keypoints));
    }

    Ok(palms)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::config::AnchorConfig;

    fn outputs(anchors: &Anchors) -> (Vec<f32>, Vec<f32>) {
        (
            vec![-10.0; anchors.len()],
            vec![0.0; anchors.len() * REGRESSOR_STRIDE],
        )
    }

    #[test]
    fn empty_scores_decode_to_nothing() {
        let anchors = Anchors::generate(&AnchorConfig::default());
        let palms = decode_palms(&[], &[], &anchors, (192, 192), 0.5).unwrap();
        assert!(palms.is_empty());
    }

    #[test]
    fn low_scores_are_dropped() {
        let anchors = Anchors::generate(&AnchorConfig::default());
        let (scores, boxes) = outputs(&anchors);
        let palms = decode_palms(&scores, &boxes, &anchors, (192, 192), 0.5).unwrap();
        assert!(palms.is_empty());
    }

    #[test]
    fn offsets_are_applied_relative_to_the_anchor() {
        let anchors = Anchors::generate(&AnchorConfig::default());
        let (mut scores, mut boxes) = outputs(&anchors);

        // Anchor 50 sits in row 1, column 1 of the 24x24 map: center (12, 12) px.
        let i = 50;
        scores[i] = 4.0;
        let row = &mut boxes[i * REGRESSOR_STRIDE..(i + 1) * REGRESSOR_STRIDE];
        row[0] = 12.0;
        row[1] = -6.0;
        row[2] = 48.0;
        row[3] = 24.0;
        row[4] = 1.0;
        row[5] = 2.0;

        let palms = decode_palms(&scores, &boxes, &anchors, (192, 192), 0.5).unwrap();
        assert_eq!(palms.len(), 1);

        let palm = &palms[0];
        assert_relative_eq!(palm.score, sigmoid(4.0));
        let (cx, cy) = palm.center();
        assert_relative_eq!(cx, 24.0 / 192.0, epsilon = 1e-6);
        assert_relative_eq!(cy, 6.0 / 192.0, epsilon = 1e-6);
        assert_relative_eq!(palm.width(), 48.0 / 192.0, epsilon = 1e-6);
        assert_relative_eq!(palm.height(), 24.0 / 192.0, epsilon = 1e-6);
        assert_relative_eq!(palm.keypoints[0].0, 13.0 / 192.0, epsilon = 1e-6);
        assert_relative_eq!(palm.keypoints[0].1, 14.0 / 192.0, epsilon = 1e-6);
        assert_relative_eq!(palm.keypoints[1].0, 12.0 / 192.0, epsilon = 1e-6);
    }

    #[test]
    fn truncated_regressor_output_is_an_error() {
        let anchors = Anchors::generate(&AnchorConfig::default());
        let scores = vec![0.0; anchors.len()];
        let err = decode_palms(&scores, &[0.0; 18], &anchors, (192, 192), 0.5).unwrap_err();
        assert!(matches!(err, InferenceError::OutputTooShort { index: 0, .. }));
    }
}

pub mod anchors;
pub mod decode;
pub mod nms;
pub mod region;

use std::sync::Arc;

use fast_image_resize::{
    FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer,
    images::{Image, ImageRef},
};
use ndarray::Array4;
use rayon::prelude::*;

use crate::{
    config::PalmDetectorConfig,
    error::{FrameDecodeError, InferenceError},
    types::{Frame, PalmRegion},
};

use self::{
    anchors::Anchors,
    decode::decode_palms,
    nms::non_max_suppression,
    region::compute_hand_region,
};
use super::engine::{InferenceEngine, InferenceOutputs, check_input_shape};

/// Output tensor holding the box + keypoint regressors.
const BOXES_OUTPUT: usize = 0;
/// Output tensor holding one score logit per anchor.
const SCORES_OUTPUT: usize = 1;

/// Palm detection network plus its post-processing.
pub struct PalmDetector<E> {
    engine: E,
    anchors: Arc<Anchors>,
    config: PalmDetectorConfig,
    resizer: Resizer,
}

impl<E: InferenceEngine> PalmDetector<E> {
    pub fn new(engine: E, anchors: Arc<Anchors>, config: PalmDetectorConfig) -> Self {
        log::debug!("palm detector uses {} anchors", anchors.len());
        Self {
            engine,
            anchors,
            config,
            resizer: Resizer::new(),
        }
    }

    pub fn config(&self) -> &PalmDetectorConfig {
        &self.config
    }

    /// Resizes `frame` to the network input and detects palms in it.
    pub fn detect(&mut self, frame: &Frame) -> Result<Vec<PalmRegion>, InferenceError> {
        let (width, height) = self.config.input_size();
        let input = prepare_input(&mut self.resizer, frame, width, height)?;
        self.run(input)
    }

    /// Runs the network on an already normalized `[1, H, W, 3]` RGB tensor.
    ///
    /// Returns at most `max_palms` regions, best first. An empty result means "no hand".
    pub fn run(&mut self, input: Array4<f32>) -> Result<Vec<PalmRegion>, InferenceError> {
        if input.is_empty() {
            return Ok(Vec::new());
        }
        let (width, height) = self.config.input_size();
        check_input_shape(&input, height, width)?;

        let outputs = self.engine.run(input)?;
        self.postprocess(&outputs)
    }

    fn postprocess(&self, outputs: &InferenceOutputs) -> Result<Vec<PalmRegion>, InferenceError> {
        let boxes = outputs.tensor(BOXES_OUTPUT)?;
        let scores = outputs.tensor(SCORES_OUTPUT)?;
        postprocess_palms(boxes, scores, &self.anchors, &self.config)
    }
}

/// Decode, rank, suppress and derive hand regions from raw detector outputs.
pub fn postprocess_palms(
    boxes: &[f32],
    scores: &[f32],
    anchors: &Anchors,
    config: &PalmDetectorConfig,
) -> Result<Vec<PalmRegion>, InferenceError> {
    let candidates = decode_palms(
        scores,
        boxes,
        anchors,
        config.input_size(),
        config.conf_threshold,
    )?;
    let mut palms = non_max_suppression(candidates, config.nms_threshold, config.max_palms);
    for palm in &mut palms {
        compute_hand_region(palm);
    }
    Ok(palms)
}

/// Stretches `frame` to `width`x`height` and scales it to `[0, 1]` floats in NHWC layout.
pub fn prepare_input(
    resizer: &mut Resizer,
    frame: &Frame,
    width: u32,
    height: u32,
) -> Result<Array4<f32>, FrameDecodeError> {
    frame.validate()?;

    let resized;
    let rgb: &[u8] = if frame.width == width && frame.height == height {
        &frame.rgb
    } else {
        let src = ImageRef::new(frame.width, frame.height, &frame.rgb, PixelType::U8x3)
            .map_err(|err| FrameDecodeError::Resize(err.to_string()))?;
        let mut dst = Image::new(width, height, PixelType::U8x3);
        let options =
            ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));
        resizer
            .resize(&src, &mut dst, Some(&options))
            .map_err(|err| FrameDecodeError::Resize(err.to_string()))?;
        resized = dst.into_vec();
        &resized
    };

    let mut input = Array4::<f32>::zeros((1, height as usize, width as usize, 3));
    if let Some(values) = input.as_slice_mut() {
        values
            .par_iter_mut()
            .zip(rgb.par_iter())
            .for_each(|(dst, &src)| *dst = src as f32 / 255.0);
    }
    Ok(input)
}

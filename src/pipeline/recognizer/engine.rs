//! Inference collaborator: "given a tensor of the expected shape, produce flat float outputs".

use ndarray::Array4;

use crate::error::InferenceError;

/// Flat output tensors of one inference run, in model output order.
#[derive(Clone, Debug, Default)]
pub struct InferenceOutputs {
    tensors: Vec<Vec<f32>>,
}

impl InferenceOutputs {
    pub fn new(tensors: Vec<Vec<f32>>) -> Self {
        Self { tensors }
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    pub fn tensor(&self, index: usize) -> Result<&[f32], InferenceError> {
        self.tensors
            .get(index)
            .map(Vec::as_slice)
            .ok_or(InferenceError::MissingOutput(index))
    }

    /// Like [`Self::tensor`], but also checks that at least `min_len` values are present.
    pub fn tensor_min_len(&self, index: usize, min_len: usize) -> Result<&[f32], InferenceError> {
        let tensor = self.tensor(index)?;
        if tensor.len() < min_len {
            return Err(InferenceError::OutputTooShort {
                index,
                expected: min_len,
                actual: tensor.len(),
            });
        }
        Ok(tensor)
    }
}

/// A loaded network taking one NHWC float tensor.
pub trait InferenceEngine: Send + 'static {
    fn run(&mut self, input: Array4<f32>) -> Result<InferenceOutputs, InferenceError>;
}

impl<E: InferenceEngine + ?Sized> InferenceEngine for Box<E> {
    fn run(&mut self, input: Array4<f32>) -> Result<InferenceOutputs, InferenceError> {
        (**self).run(input)
    }
}

/// Checks `input` against an expected `[1, height, width, 3]` shape.
pub fn check_input_shape(input: &Array4<f32>, height: u32, width: u32) -> Result<(), InferenceError> {
    let expected = [1, height as usize, width as usize, 3];
    if input.shape() != expected {
        return Err(InferenceError::InputShape {
            expected,
            actual: input.shape().to_vec(),
        });
    }
    Ok(())
}

#[cfg(feature = "backend-ort")]
pub use self::ort_backend::OrtEngine;

#[cfg(feature = "backend-ort")]
mod ort_backend {
    use std::path::Path;

    use anyhow::{Context, anyhow};
    use ndarray::Array4;
    use ort::session::{Session, builder::GraphOptimizationLevel};
    use ort::value::Tensor;

    use super::{InferenceEngine, InferenceOutputs};
    use crate::error::{InferenceError, InitError};

    /// ONNX Runtime session.
    pub struct OrtEngine {
        session: Session,
        label: &'static str,
    }

    impl OrtEngine {
        pub fn load(path: &Path, threads: usize, label: &'static str) -> Result<Self, InitError> {
            let session = Session::builder()
                .and_then(|builder| builder.with_optimization_level(GraphOptimizationLevel::Level3))
                .and_then(|builder| builder.with_intra_threads(threads))
                .and_then(|builder| builder.commit_from_file(path))
                .with_context(|| format!("failed to load ORT session from {}", path.display()))
                .map_err(|source| InitError::ModelLoad {
                    path: path.to_path_buf(),
                    source,
                })?;

            log::info!("{label} model ready using {}", path.display());

            Ok(Self { session, label })
        }
    }

    impl InferenceEngine for OrtEngine {
        fn run(&mut self, input: Array4<f32>) -> Result<InferenceOutputs, InferenceError> {
            let tensor = Tensor::from_array(input)
                .map_err(|err| InferenceError::Runtime(anyhow!(err)))?;
            let outputs = self
                .session
                .run(ort::inputs![tensor])
                .with_context(|| format!("failed to run {} session", self.label))
                .map_err(InferenceError::Runtime)?;

            let mut tensors = Vec::with_capacity(outputs.len());
            for index in 0..outputs.len() {
                let array = outputs[index]
                    .try_extract_array::<f32>()
                    .with_context(|| format!("{} output #{index} is not f32", self.label))
                    .map_err(InferenceError::Runtime)?;
                tensors.push(array.iter().copied().collect());
            }

            Ok(InferenceOutputs::new(tensors))
        }
    }
}

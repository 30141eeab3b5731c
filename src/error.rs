use std::path::PathBuf;

use thiserror::Error;

/// Startup failures. Any of these aborts the process before the pipeline runs.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("failed to load model from {}", path.display())]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to open camera")]
    Camera(#[source] anyhow::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to spawn {stage} thread")]
    Spawn {
        stage: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// A captured buffer that cannot be turned into a [`crate::types::Frame`]. The frame is skipped.
#[derive(Debug, Error)]
pub enum FrameDecodeError {
    #[error("frame is empty")]
    Empty,
    #[error("frame buffer holds {actual} bytes, expected at least {expected}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("row stride {stride} is smaller than a {width} pixel row")]
    InvalidStride { stride: usize, width: u32 },
    #[error("failed to resize frame: {0}")]
    Resize(String),
}

/// The inference engine (or its output) failed for one frame. Tracking state is left untouched.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("inference engine reported a failure")]
    Runtime(#[source] anyhow::Error),
    #[error("input tensor shape {actual:?} does not match the expected {expected:?}")]
    InputShape {
        expected: [usize; 4],
        actual: Vec<usize>,
    },
    #[error("model returned no output tensor #{0}")]
    MissingOutput(usize),
    #[error("output tensor #{index} holds {actual} values, expected at least {expected}")]
    OutputTooShort {
        index: usize,
        expected: usize,
        actual: usize,
    },
    #[error(transparent)]
    Frame(#[from] FrameDecodeError),
}

/// The pointer device could not be initialised; gesture output becomes a no-op.
#[derive(Debug, Error)]
#[error("pointer device unavailable: {reason}")]
pub struct DeviceUnavailable {
    pub reason: String,
}

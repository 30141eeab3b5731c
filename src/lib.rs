pub mod args;
pub mod camera;
pub mod config;
pub mod display;
pub mod error;
pub mod gesture;
pub mod pipeline;
pub mod pointer;
pub mod types;

//! Display collaborator: where annotated frames end up.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use image::RgbImage;

use crate::{pipeline::compositor::AnnotatedFrame, types::TrackingMode};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayAction {
    Continue,
    /// Stop the whole pipeline.
    Quit,
}

pub trait Display {
    fn present(&mut self, frame: &AnnotatedFrame) -> Result<DisplayAction>;
}

impl<D: Display + ?Sized> Display for Box<D> {
    fn present(&mut self, frame: &AnnotatedFrame) -> Result<DisplayAction> {
        (**self).present(frame)
    }
}

/// Headless display: logs mode changes and the overlay text about once per second.
#[derive(Debug, Default)]
pub struct LogDisplay {
    last_mode: Option<(TrackingMode, bool)>,
    last_fps: f32,
}

impl Display for LogDisplay {
    fn present(&mut self, frame: &AnnotatedFrame) -> Result<DisplayAction> {
        let state = (frame.mode, frame.is_tracking);
        if self.last_mode != Some(state) {
            log::info!(
                "frame {}: {}",
                frame.frame.sequence,
                frame.labels.first().map_or("", |l| l.text.as_str())
            );
            self.last_mode = Some(state);
        }
        // The FPS value only changes when a one-second window closes.
        if frame.fps != self.last_fps {
            self.last_fps = frame.fps;
            let text: Vec<_> = frame.labels.iter().map(|l| l.text.as_str()).collect();
            log::info!("{}", text.join(" | "));
        }
        Ok(DisplayAction::Continue)
    }
}

pub fn save_png(frame: &AnnotatedFrame, path: &Path) -> Result<()> {
    let image = RgbImage::from_raw(frame.frame.width, frame.frame.height, frame.frame.rgb.clone())
        .ok_or_else(|| anyhow!("failed to build image buffer"))?;
    image
        .save(path)
        .with_context(|| format!("failed to save {}", path.display()))
}

/// Writes every `every`-th frame to one PNG file, overwriting the previous snapshot.
#[derive(Debug)]
pub struct SnapshotDisplay {
    path: PathBuf,
    every: u64,
    presented: u64,
    inner: LogDisplay,
}

impl SnapshotDisplay {
    pub fn new(path: PathBuf, every: u64) -> Self {
        Self {
            path,
            every: every.max(1),
            presented: 0,
            inner: LogDisplay::default(),
        }
    }
}

impl Display for SnapshotDisplay {
    fn present(&mut self, frame: &AnnotatedFrame) -> Result<DisplayAction> {
        let action = self.inner.present(frame)?;
        if self.presented % self.every == 0 {
            save_png(frame, &self.path)?;
            log::debug!("snapshot of frame {} written", frame.frame.sequence);
        }
        self.presented += 1;
        Ok(action)
    }
}

use std::time::Duration;

use crate::{
    camera::{CameraSource, acquire, copy_frame},
    config::PipelineConfig,
    types::Frame,
};

use super::queue::{HandoffQueue, Shutdown};

/// Capture stage: copies camera frames into `frames` until shutdown.
pub fn run_capture_loop<C: CameraSource>(
    camera: &mut C,
    frames: &HandoffQueue<Frame>,
    shutdown: &Shutdown,
    config: &PipelineConfig,
) {
    let mut sequence = 0u64;
    let mut dropped = 0usize;
    let mut idle_wait = config.poll_interval;

    while !shutdown.is_triggered() {
        let lease = match acquire(camera) {
            Ok(Some(lease)) => lease,
            Ok(None) => {
                shutdown.wait_timeout(idle_wait);
                idle_wait = (idle_wait * 2).min(config.poll_interval * 16);
                continue;
            }
            Err(err) => {
                log::warn!("camera frame read failed: {err:?}");
                shutdown.wait_timeout(config.poll_interval.max(Duration::from_millis(10)));
                continue;
            }
        };
        idle_wait = config.poll_interval;

        let frame = copy_frame(&*lease, config.mirror, sequence);
        drop(lease);

        match frame {
            Ok(frame) => {
                sequence += 1;
                dropped += frames.push(frame);
                if dropped > 0 && sequence % 300 == 0 {
                    log::debug!("capture: {dropped} stale frames dropped so far");
                }
            }
            Err(err) => log::warn!("skipping camera frame: {err}"),
        }
    }

    log::info!("capture stage stopped after {sequence} frames");
}

pub mod camera;
pub mod compositor;
pub mod queue;
pub mod recognizer;
pub mod skeleton;

use std::thread::{self, JoinHandle};

use crate::{
    camera::CameraSource,
    config::{GestureConfig, PipelineConfig},
    display::Display,
    error::InitError,
    pointer::PointerDevice,
    types::{Frame, RecognizedFrame},
};

use self::{
    queue::{HandoffQueue, Shutdown},
    recognizer::{
        Recognizer,
        tracker::{LandmarkStage, PalmStage},
    },
};

/// The three running stages. Dropping the handle stops and joins them.
pub struct PipelineHandle {
    shutdown: Shutdown,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl PipelineHandle {
    pub fn shutdown(&self) -> Shutdown {
        self.shutdown.clone()
    }

    pub fn stop(self) {
        self.shutdown.trigger();
        self.wait();
    }

    /// Blocks until every stage has exited.
    pub fn wait(mut self) {
        self.join_all();
    }

    fn join_all(&mut self) {
        for (stage, handle) in self.handles.drain(..) {
            if handle.join().is_err() {
                log::error!("{stage} thread panicked");
            }
        }
    }

    fn spawn(
        &mut self,
        stage: &'static str,
        body: impl FnOnce(Shutdown) + Send + 'static,
    ) -> Result<(), InitError> {
        let shutdown = self.shutdown.clone();
        let handle = thread::Builder::new()
            .name(stage.to_string())
            .spawn(move || {
                body(shutdown.clone());
                // A stage that ends for any reason takes the rest down with it.
                shutdown.trigger();
            })
            .map_err(|source| InitError::Spawn { stage, source })?;
        self.handles.push((stage, handle));
        Ok(())
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            self.shutdown.trigger();
            self.join_all();
        }
    }
}

/// Spawns the capture, inference and render threads.
///
/// Camera and recognizer are built on their own threads from the given factories, since neither
/// has to be `Send`. A factory that fails stops the whole pipeline.
pub fn start_pipeline<C, P, L, D, OpenCamera, BuildRecognizer>(
    config: &PipelineConfig,
    gesture: GestureConfig,
    open_camera: OpenCamera,
    build_recognizer: BuildRecognizer,
    mut display: D,
) -> Result<PipelineHandle, InitError>
where
    C: CameraSource,
    P: PalmStage,
    L: LandmarkStage,
    D: Display + Send + 'static,
    OpenCamera: FnOnce() -> anyhow::Result<C> + Send + 'static,
    BuildRecognizer:
        FnOnce() -> anyhow::Result<Recognizer<P, L, Box<dyn PointerDevice>>> + Send + 'static,
{
    let shutdown = Shutdown::new();
    let frames: HandoffQueue<Frame> = HandoffQueue::new(config.queue_capacity, &shutdown);
    let results: HandoffQueue<RecognizedFrame> =
        HandoffQueue::new(config.queue_capacity, &shutdown);

    let mut pipeline = PipelineHandle {
        shutdown,
        handles: Vec::with_capacity(3),
    };

    {
        let frames = frames.clone();
        let config = config.clone();
        pipeline.spawn("capture", move |shutdown| {
            let mut camera = match open_camera() {
                Ok(camera) => camera,
                Err(err) => {
                    log::error!("failed to open camera: {err:?}");
                    return;
                }
            };
            camera::run_capture_loop(&mut camera, &frames, &shutdown, &config);
        })?;
    }

    {
        let results = results.clone();
        pipeline.spawn("inference", move |shutdown| {
            let mut recognizer = match build_recognizer() {
                Ok(recognizer) => recognizer,
                Err(err) => {
                    log::error!("failed to build recognizer: {err:?}");
                    return;
                }
            };
            recognizer::run_inference_loop(&mut recognizer, &frames, &results, &shutdown);
        })?;
    }

    pipeline.spawn("render", move |shutdown| {
        compositor::run_render_loop(&mut display, &results, &shutdown, &gesture);
    })?;

    log::info!(
        "pipeline started ({}x{}, queue capacity {})",
        config.frame_width,
        config.frame_height,
        config.queue_capacity
    );

    Ok(pipeline)
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{Arc, Mutex},
        time::{Duration, Instant},
    };

    use super::{
        recognizer::tracker::{
            HandTracker,
            tests::{ScriptedLandmarks, ScriptedPalms, palm},
        },
        *,
    };
    use crate::{
        camera::{RgbBuffer, tests::MemoryCamera},
        config::TrackerConfig,
        display::DisplayAction,
        gesture::GestureMapper,
        pipeline::compositor::AnnotatedFrame,
        pointer::tests::{PointerCall, RecordingPointer},
    };

    /// Records what it is shown and quits after `limit` frames.
    struct CollectingDisplay {
        seen: Arc<Mutex<Vec<(u64, bool)>>>,
        limit: usize,
    }

    impl Display for CollectingDisplay {
        fn present(&mut self, frame: &AnnotatedFrame) -> anyhow::Result<DisplayAction> {
            let mut seen = self.seen.lock().unwrap();
            seen.push((frame.frame.sequence, frame.is_tracking));
            if seen.len() >= self.limit {
                Ok(DisplayAction::Quit)
            } else {
                Ok(DisplayAction::Continue)
            }
        }
    }

    fn camera(frames: usize) -> MemoryCamera {
        MemoryCamera {
            frames: (0..frames)
                .map(|_| {
                    Some(RgbBuffer {
                        pixels: vec![0; 800 * 600 * 3],
                        width: 800,
                        height: 600,
                    })
                })
                .collect(),
            released: 0,
        }
    }

    fn wait_until_stopped(shutdown: &Shutdown) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !shutdown.is_triggered() && Instant::now() < deadline {
            shutdown.wait_timeout(Duration::from_millis(10));
        }
    }

    #[test]
    fn frames_flow_end_to_end_until_the_display_quits() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let pointer = RecordingPointer::default();
        let config = PipelineConfig {
            queue_capacity: 8,
            ..PipelineConfig::default()
        };

        let recorded = pointer.clone();
        let pipeline = start_pipeline(
            &config,
            GestureConfig::default(),
            || Ok(camera(3)),
            move || {
                Ok(Recognizer::new(
                    ScriptedPalms {
                        results: VecDeque::from([Ok(vec![palm()])]),
                        ..Default::default()
                    },
                    ScriptedLandmarks::with_scores(&[0.9, 0.8, 0.8]),
                    HandTracker::new(TrackerConfig::default()),
                    GestureMapper::new(
                        Box::new(recorded) as Box<dyn PointerDevice>,
                        GestureConfig::default(),
                    ),
                ))
            },
            CollectingDisplay {
                seen: seen.clone(),
                limit: 3,
            },
        )
        .unwrap();

        wait_until_stopped(&pipeline.shutdown());
        pipeline.wait();

        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 3);
        assert!(seen.windows(2).all(|w| w[0].0 < w[1].0));
        // The acquisition frame is still drawn as searching.
        let tracking: Vec<_> = seen.iter().map(|&(_, tracking)| tracking).collect();
        assert_eq!(tracking, vec![false, true, true]);
        assert!(
            pointer
                .calls()
                .iter()
                .any(|call| matches!(call, PointerCall::Move(..)))
        );
    }

    #[test]
    fn failing_camera_factory_stops_the_pipeline() {
        let pipeline = start_pipeline(
            &PipelineConfig::default(),
            GestureConfig::default(),
            || -> anyhow::Result<MemoryCamera> { Err(anyhow::anyhow!("no camera")) },
            || {
                Ok(Recognizer::new(
                    ScriptedPalms::default(),
                    ScriptedLandmarks::default(),
                    HandTracker::new(TrackerConfig::default()),
                    GestureMapper::new(
                        Box::new(RecordingPointer::default()) as Box<dyn PointerDevice>,
                        GestureConfig::default(),
                    ),
                ))
            },
            CollectingDisplay {
                seen: Arc::default(),
                limit: usize::MAX,
            },
        )
        .unwrap();

        let shutdown = pipeline.shutdown();
        wait_until_stopped(&shutdown);
        assert!(shutdown.is_triggered());
        pipeline.wait();
    }

    #[test]
    fn stop_joins_idle_stages() {
        let pipeline = start_pipeline(
            &PipelineConfig::default(),
            GestureConfig::default(),
            || Ok(camera(0)),
            || {
                Ok(Recognizer::new(
                    ScriptedPalms::default(),
                    ScriptedLandmarks::default(),
                    HandTracker::new(TrackerConfig::default()),
                    GestureMapper::new(
                        Box::new(RecordingPointer::default()) as Box<dyn PointerDevice>,
                        GestureConfig::default(),
                    ),
                ))
            },
            CollectingDisplay {
                seen: Arc::default(),
                limit: usize::MAX,
            },
        )
        .unwrap();

        let shutdown = pipeline.shutdown();
        pipeline.stop();
        assert!(shutdown.is_triggered());
    }
}

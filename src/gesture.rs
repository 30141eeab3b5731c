//! Hand pose to pointer intents.
//!
//! Joint 9 (middle finger MCP) steers the pointer inside a capture rectangle centered in the
//! frame. Pinching the index and middle fingertips holds the left button; touching the thumb
//! tip to the index PIP fires one right click.

use crate::{config::GestureConfig, pointer::PointerDevice, types::LandmarkResult};

const THUMB_TIP: usize = 4;
const INDEX_MCP: usize = 5;
const INDEX_PIP: usize = 6;
const INDEX_TIP: usize = 8;
const MIDDLE_MCP: usize = 9;
const MIDDLE_TIP: usize = 12;

/// Button state carried between frames so clicks are edge-triggered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClickLatch {
    pub left_down: bool,
    pub right_armed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerEvent {
    MoveTo { x: i32, y: i32 },
    PressLeft,
    ReleaseLeft,
    ClickRight,
}

/// Maps joint 9 through the capture region onto screen coordinates.
pub fn screen_position(hand: &LandmarkResult, config: &GestureConfig) -> (i32, i32) {
    let region_w = config.region_width as f32;
    let region_h = config.region_height as f32;
    let offset_x = (hand.frame_width as f32 - region_w) / 2.0;
    let offset_y = (hand.frame_height as f32 - region_h) / 2.0;

    let (hx, hy) = hand.joint(MIDDLE_MCP);
    let hx = hx.clamp(offset_x, offset_x + region_w);
    let hy = hy.clamp(offset_y, offset_y + region_h);

    let x_norm = (hx - offset_x) / region_w;
    let y_norm = (hy - offset_y) / region_h;
    (
        (x_norm * config.screen_width as f32) as i32,
        (y_norm * config.screen_height as f32) as i32,
    )
}

/// One frame of gesture logic. Returns the updated latch and the events to emit, in order.
pub fn map_gesture(
    latch: ClickLatch,
    hand: &LandmarkResult,
    config: &GestureConfig,
) -> (ClickLatch, Vec<PointerEvent>) {
    let mut events = Vec::with_capacity(3);
    let mut next = latch;

    let (x, y) = screen_position(hand, config);
    events.push(PointerEvent::MoveTo { x, y });

    let click_thresh = hand.joint_distance(INDEX_MCP, MIDDLE_MCP) * config.click_scale;
    let d_left = hand.joint_distance(INDEX_TIP, MIDDLE_TIP);
    let d_right = hand.joint_distance(THUMB_TIP, INDEX_PIP);

    if d_left < click_thresh {
        if !next.left_down {
            events.push(PointerEvent::PressLeft);
            next.left_down = true;
        }
    } else if next.left_down {
        events.push(PointerEvent::ReleaseLeft);
        next.left_down = false;
    }

    if !next.left_down && d_right < click_thresh {
        if !next.right_armed {
            events.push(PointerEvent::ClickRight);
            next.right_armed = true;
        }
    } else {
        next.right_armed = false;
    }

    (next, events)
}

/// Owns the click latch and forwards events to a pointer device.
pub struct GestureMapper<P> {
    latch: ClickLatch,
    device: P,
    config: GestureConfig,
}

impl<P: PointerDevice> GestureMapper<P> {
    pub fn new(device: P, config: GestureConfig) -> Self {
        Self {
            latch: ClickLatch::default(),
            device,
            config,
        }
    }

    pub fn latch(&self) -> ClickLatch {
        self.latch
    }

    pub fn apply(&mut self, hand: &LandmarkResult) {
        let (latch, events) = map_gesture(self.latch, hand, &self.config);
        self.latch = latch;
        for event in events {
            match event {
                PointerEvent::MoveTo { x, y } => self.device.move_absolute(x, y),
                PointerEvent::PressLeft => {
                    log::debug!("left button down");
                    self.device.press_left();
                }
                PointerEvent::ReleaseLeft => {
                    log::debug!("left button up");
                    self.device.release_left();
                }
                PointerEvent::ClickRight => {
                    log::debug!("right click");
                    self.device.click_right();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        pointer::tests::{PointerCall, RecordingPointer},
        types::HAND_JOINT_NUM,
    };

    /// Open hand in an 800x600 frame: MCP 5 to 9 is 20 px, so the click threshold is 26 px.
    fn open_hand() -> LandmarkResult {
        let mut joints = [[0.0; 3]; HAND_JOINT_NUM];
        joints[MIDDLE_MCP] = [400.0, 300.0, 0.0];
        joints[INDEX_MCP] = [380.0, 300.0, 0.0];
        joints[INDEX_PIP] = [380.0, 260.0, 0.0];
        joints[INDEX_TIP] = [370.0, 200.0, 0.0];
        joints[MIDDLE_TIP] = [420.0, 200.0, 0.0];
        joints[THUMB_TIP] = [330.0, 300.0, 0.0];
        LandmarkResult {
            score: 0.9,
            joints,
            frame_width: 800,
            frame_height: 600,
        }
    }

    fn pinched(mut hand: LandmarkResult) -> LandmarkResult {
        hand.joints[MIDDLE_TIP] = [380.0, 200.0, 0.0];
        hand
    }

    fn thumb_touch(mut hand: LandmarkResult) -> LandmarkResult {
        hand.joints[THUMB_TIP] = [385.0, 265.0, 0.0];
        hand
    }

    fn clicks(events: &[PointerEvent]) -> Vec<PointerEvent> {
        events
            .iter()
            .copied()
            .filter(|e| !matches!(e, PointerEvent::MoveTo { .. }))
            .collect()
    }

    #[test]
    fn frame_center_maps_to_screen_center() {
        let pos = screen_position(&open_hand(), &GestureConfig::default());
        assert_eq!(pos, (960, 540));
    }

    #[test]
    fn positions_outside_the_region_are_clamped() {
        let config = GestureConfig::default();
        let mut hand = open_hand();
        hand.joints[MIDDLE_MCP] = [10.0, 590.0, 0.0];
        assert_eq!(screen_position(&hand, &config), (0, 1080));
        hand.joints[MIDDLE_MCP] = [790.0, 5.0, 0.0];
        assert_eq!(screen_position(&hand, &config), (1920, 0));
    }

    #[test]
    fn pinch_emits_exactly_one_press_and_one_release() {
        let config = GestureConfig::default();
        let sequence = [
            open_hand(),
            pinched(open_hand()),
            pinched(open_hand()),
            pinched(open_hand()),
            open_hand(),
            open_hand(),
        ];

        let mut latch = ClickLatch::default();
        let mut all = Vec::new();
        for hand in &sequence {
            let (next, events) = map_gesture(latch, hand, &config);
            latch = next;
            all.extend(clicks(&events));
        }

        assert_eq!(all, vec![PointerEvent::PressLeft, PointerEvent::ReleaseLeft]);
        assert!(!latch.left_down);
    }

    #[test]
    fn every_frame_moves_the_pointer_first() {
        let (_, events) = map_gesture(
            ClickLatch::default(),
            &pinched(open_hand()),
            &GestureConfig::default(),
        );
        assert_eq!(events[0], PointerEvent::MoveTo { x: 960, y: 540 });
        assert_eq!(events[1], PointerEvent::PressLeft);
    }

    #[test]
    fn right_click_fires_once_per_touch() {
        let config = GestureConfig::default();
        let sequence = [
            thumb_touch(open_hand()),
            thumb_touch(open_hand()),
            open_hand(),
            thumb_touch(open_hand()),
        ];

        let mut latch = ClickLatch::default();
        let mut all = Vec::new();
        for hand in &sequence {
            let (next, events) = map_gesture(latch, hand, &config);
            latch = next;
            all.extend(clicks(&events));
        }

        assert_eq!(all, vec![PointerEvent::ClickRight, PointerEvent::ClickRight]);
    }

    #[test]
    fn right_click_is_suppressed_while_left_is_held() {
        let config = GestureConfig::default();
        let both = thumb_touch(pinched(open_hand()));

        let (latch, events) = map_gesture(ClickLatch::default(), &both, &config);
        assert_eq!(clicks(&events), vec![PointerEvent::PressLeft]);
        assert!(!latch.right_armed);

        // Releasing the pinch with the thumb still down fires the right click.
        let (latch, events) = map_gesture(latch, &thumb_touch(open_hand()), &config);
        assert_eq!(
            clicks(&events),
            vec![PointerEvent::ReleaseLeft, PointerEvent::ClickRight]
        );
        assert!(latch.right_armed);
    }

    #[test]
    fn mapper_drives_the_device() {
        let recorder = RecordingPointer::default();
        let mut mapper = GestureMapper::new(recorder.clone(), GestureConfig::default());

        mapper.apply(&pinched(open_hand()));
        mapper.apply(&open_hand());

        assert_eq!(
            recorder.calls(),
            vec![
                PointerCall::Move(960, 540),
                PointerCall::PressLeft,
                PointerCall::Move(960, 540),
                PointerCall::ReleaseLeft,
            ]
        );
        assert_eq!(mapper.latch(), ClickLatch::default());
    }
}

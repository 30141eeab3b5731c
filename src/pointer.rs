//! Pointer-device collaborator: absolute moves and button events on the host.

use crate::error::DeviceUnavailable;

/// Best-effort pointer output. Implementations never fail the caller; a device that cannot
/// honour a request drops it.
pub trait PointerDevice {
    fn move_absolute(&mut self, x: i32, y: i32);
    fn press_left(&mut self);
    fn release_left(&mut self);
    fn click_right(&mut self);
}

impl<P: PointerDevice + ?Sized> PointerDevice for Box<P> {
    fn move_absolute(&mut self, x: i32, y: i32) {
        (**self).move_absolute(x, y)
    }

    fn press_left(&mut self) {
        (**self).press_left()
    }

    fn release_left(&mut self) {
        (**self).release_left()
    }

    fn click_right(&mut self) {
        (**self).click_right()
    }
}

/// Vision-only mode: every request is dropped.
#[derive(Debug, Default)]
pub struct NullPointer;

impl PointerDevice for NullPointer {
    fn move_absolute(&mut self, _x: i32, _y: i32) {}
    fn press_left(&mut self) {}
    fn release_left(&mut self) {}
    fn click_right(&mut self) {}
}

/// Clamps a position to `[0, width] x [0, height]`.
pub fn clamp_to_screen(x: i32, y: i32, width: u32, height: u32) -> (i32, i32) {
    let max_x = i32::try_from(width).unwrap_or(i32::MAX);
    let max_y = i32::try_from(height).unwrap_or(i32::MAX);
    (x.clamp(0, max_x), y.clamp(0, max_y))
}

/// Opens the host pointer, or falls back to [`NullPointer`] with a single warning.
pub fn open_or_null(
    open: impl FnOnce() -> Result<Box<dyn PointerDevice>, DeviceUnavailable>,
) -> Box<dyn PointerDevice> {
    match open() {
        Ok(device) => device,
        Err(err) => {
            log::warn!("{err}; continuing in vision-only mode");
            Box::new(NullPointer)
        }
    }
}

#[cfg(feature = "pointer-enigo")]
pub use self::enigo_backend::VirtualPointer;

#[cfg(feature = "pointer-enigo")]
mod enigo_backend {
    use enigo::{Button, Coordinate, Direction, Enigo, Mouse, Settings};

    use super::{PointerDevice, clamp_to_screen};
    use crate::error::DeviceUnavailable;

    /// Host pointer driven through `enigo`.
    pub struct VirtualPointer {
        enigo: Enigo,
        screen_width: u32,
        screen_height: u32,
    }

    impl VirtualPointer {
        pub fn open(screen_width: u32, screen_height: u32) -> Result<Self, DeviceUnavailable> {
            let enigo = Enigo::new(&Settings::default()).map_err(|err| DeviceUnavailable {
                reason: err.to_string(),
            })?;
            log::info!("virtual pointer ready for a {screen_width}x{screen_height} screen");
            Ok(Self {
                enigo,
                screen_width,
                screen_height,
            })
        }

        fn button(&mut self, button: Button, direction: Direction) {
            if let Err(err) = self.enigo.button(button, direction) {
                log::trace!("pointer {button:?} {direction:?} dropped: {err}");
            }
        }
    }

    impl PointerDevice for VirtualPointer {
        fn move_absolute(&mut self, x: i32, y: i32) {
            let (x, y) = clamp_to_screen(x, y, self.screen_width, self.screen_height);
            if let Err(err) = self.enigo.move_mouse(x, y, Coordinate::Abs) {
                log::trace!("pointer move dropped: {err}");
            }
        }

        fn press_left(&mut self) {
            self.button(Button::Left, Direction::Press);
        }

        fn release_left(&mut self) {
            self.button(Button::Left, Direction::Release);
        }

        fn click_right(&mut self) {
            self.button(Button::Right, Direction::Press);
            self.button(Button::Right, Direction::Release);
        }
    }
}

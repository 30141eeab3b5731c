use std::ops::Deref;

use anyhow::Result;
use rayon::prelude::*;

use crate::{error::FrameDecodeError, types::Frame};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb,
    Bgr,
}

/// A captured image still owned by the camera.
pub trait FrameBuffer {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Bytes per row, at least `width * 3`.
    fn stride(&self) -> usize;
    fn format(&self) -> PixelFormat;
    fn data(&self) -> &[u8];
}

/// Camera collaborator. `try_acquire` never blocks for long; `Ok(None)` means "no frame yet".
pub trait CameraSource {
    type Buffer: FrameBuffer;

    fn try_acquire(&mut self) -> Result<Option<Self::Buffer>>;

    /// Hands a buffer back to the camera once its pixels have been copied out.
    fn release(&mut self, buffer: Self::Buffer);
}

/// A buffer borrowed from a camera, released when the lease is dropped.
pub struct Lease<'a, C: CameraSource> {
    camera: &'a mut C,
    buffer: Option<C::Buffer>,
}

impl<C: CameraSource> Deref for Lease<'_, C> {
    type Target = C::Buffer;

    fn deref(&self) -> &C::Buffer {
        // Only `Drop` takes the buffer out.
        match &self.buffer {
            Some(buffer) => buffer,
            None => unreachable!("lease used after release"),
        }
    }
}

impl<C: CameraSource> Drop for Lease<'_, C> {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            self.camera.release(buffer);
        }
    }
}

/// Acquires the next frame, if any, as a scoped lease.
pub fn acquire<C: CameraSource>(camera: &mut C) -> Result<Option<Lease<'_, C>>> {
    Ok(camera.try_acquire()?.map(|buffer| Lease {
        camera,
        buffer: Some(buffer),
    }))
}

/// Copies `buffer` into an owned, tightly packed RGB frame, optionally flipped horizontally.
pub fn copy_frame<B: FrameBuffer + ?Sized>(
    buffer: &B,
    mirror: bool,
    sequence: u64,
) -> Result<Frame, FrameDecodeError> {
    let (width, height) = (buffer.width(), buffer.height());
    if width == 0 || height == 0 || buffer.data().is_empty() {
        return Err(FrameDecodeError::Empty);
    }

    let row_bytes = width as usize * 3;
    let stride = buffer.stride();
    if stride < row_bytes {
        return Err(FrameDecodeError::InvalidStride { stride, width });
    }
    let required = stride * (height as usize - 1) + row_bytes;
    let data = buffer.data();
    if data.len() < required {
        return Err(FrameDecodeError::SizeMismatch {
            expected: required,
            actual: data.len(),
        });
    }

    let swap = buffer.format() == PixelFormat::Bgr;
    let mut rgb = vec![0u8; row_bytes * height as usize];
    rgb.par_chunks_mut(row_bytes)
        .enumerate()
        .for_each(|(y, dst_row)| {
            let src_row = &data[y * stride..y * stride + row_bytes];
            for (x, dst) in dst_row.chunks_exact_mut(3).enumerate() {
                let sx = if mirror { width as usize - 1 - x } else { x };
                let src = &src_row[sx * 3..sx * 3 + 3];
                if swap {
                    dst.copy_from_slice(&[src[2], src[1], src[0]]);
                } else {
                    dst.copy_from_slice(src);
                }
            }
        });

    Ok(Frame::new(rgb, width, height, sequence))
}

/// Tightly packed RGB pixels already owned by the caller.
#[derive(Clone, Debug)]
pub struct RgbBuffer {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl FrameBuffer for RgbBuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn stride(&self) -> usize {
        self.width as usize * 3
    }

    fn format(&self) -> PixelFormat {
        PixelFormat::Rgb
    }

    fn data(&self) -> &[u8] {
        &self.pixels
    }
}

#[cfg(feature = "camera-nokhwa")]
pub use self::nokhwa_backend::{CameraDevice, NokhwaCamera, available_cameras};

#[cfg(feature = "camera-nokhwa")]
mod nokhwa_backend {
    use anyhow::{Result, anyhow};
    use nokhwa::{
        Camera,
        pixel_format::RgbFormat,
        query,
        utils::{
            ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat,
            RequestedFormatType,
        },
    };

    use super::{CameraSource, RgbBuffer};

    const PREFERRED_PIXEL_FORMATS: &[FrameFormat] = &[
        FrameFormat::MJPEG,
        FrameFormat::YUYV,
        FrameFormat::NV12,
        FrameFormat::RAWRGB,
        FrameFormat::RAWBGR,
    ];

    fn requested_formats(width: u32, height: u32) -> [RequestedFormat<'static>; 3] {
        [
            RequestedFormat::with_formats(
                RequestedFormatType::Closest(CameraFormat::new_from(
                    width,
                    height,
                    FrameFormat::MJPEG,
                    30,
                )),
                PREFERRED_PIXEL_FORMATS,
            ),
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate),
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::None),
        ]
    }

    #[derive(Clone, Debug)]
    pub struct CameraDevice {
        pub index: u32,
        pub label: String,
    }

    pub fn available_cameras() -> Result<Vec<CameraDevice>> {
        let cameras = query(ApiBackend::Auto)?;
        Ok(cameras
            .into_iter()
            .filter_map(|info| {
                let index = info.index().as_index().ok()?;
                Some(CameraDevice {
                    index,
                    label: info.human_name(),
                })
            })
            .collect())
    }

    /// Webcam opened through `nokhwa`, decoded to RGB.
    pub struct NokhwaCamera {
        camera: Camera,
    }

    impl NokhwaCamera {
        pub fn open(index: u32, width: u32, height: u32) -> Result<Self> {
            let mut last_err = None;

            for requested in requested_formats(width, height) {
                match Camera::new(CameraIndex::Index(index), requested) {
                    Ok(mut camera) => match camera.open_stream() {
                        Ok(()) => {
                            let format = camera.camera_format();
                            log::info!(
                                "camera #{index} streaming {}x{} {:?} @ {} fps",
                                format.width(),
                                format.height(),
                                format.format(),
                                format.frame_rate()
                            );
                            return Ok(Self { camera });
                        }
                        Err(err) => last_err = Some(err.into()),
                    },
                    Err(err) => last_err = Some(err.into()),
                }
            }

            Err(last_err.unwrap_or_else(|| anyhow!("failed to open camera with any supported format")))
        }
    }

    impl CameraSource for NokhwaCamera {
        type Buffer = RgbBuffer;

        fn try_acquire(&mut self) -> Result<Option<RgbBuffer>> {
            let frame = self.camera.frame()?;
            let decoded = frame.decode_image::<RgbFormat>()?;
            let (width, height) = decoded.dimensions();
            let pixels = decoded.into_raw();
            if pixels.is_empty() {
                return Ok(None);
            }
            Ok(Some(RgbBuffer {
                pixels,
                width,
                height,
            }))
        }

        // Decoded frames are owned copies; nothing to hand back.
        fn release(&mut self, _buffer: RgbBuffer) {}
    }

    impl Drop for NokhwaCamera {
        fn drop(&mut self) {
            if let Err(err) = self.camera.stop_stream() {
                log::warn!("failed to stop camera stream: {err}");
            }
        }
    }
}

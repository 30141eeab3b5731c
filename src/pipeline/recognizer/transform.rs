//! Rotated-ROI crop and un-crop.

use ndarray::Array4;
use rayon::prelude::*;

use crate::{
    error::FrameDecodeError,
    pipeline::recognizer::palm::region::rotate,
    types::{Frame, HandRoi},
};

/// Row-major 2x3 affine matrix: `[x', y'] = [[a, b, c], [d, e, f]] * [x, y, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AffineTransform {
    pub m: [[f64; 3]; 2],
}

impl AffineTransform {
    pub const IDENTITY: Self = Self {
        m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
    };

    /// The transform taking each `src[i]` onto `dst[i]`. `None` when the source points are collinear.
    pub fn from_triangles(src: [(f64, f64); 3], dst: [(f64, f64); 3]) -> Option<Self> {
        let [(x0, y0), (x1, y1), (x2, y2)] = src;
        let det = x0 * (y1 - y2) - y0 * (x1 - x2) + (x1 * y2 - x2 * y1);
        if det.abs() < f64::EPSILON {
            return None;
        }

        // Cramer's rule on [x y 1] * [a b c]^T = u, once per output axis.
        let solve = |u0: f64, u1: f64, u2: f64| -> [f64; 3] {
            let a = (u0 * (y1 - y2) - y0 * (u1 - u2) + (u1 * y2 - u2 * y1)) / det;
            let b = (x0 * (u1 - u2) - u0 * (x1 - x2) + (x1 * u2 - x2 * u1)) / det;
            let c = (x0 * (y1 * u2 - y2 * u1) - y0 * (x1 * u2 - x2 * u1)
                + u0 * (x1 * y2 - x2 * y1))
                / det;
            [a, b, c]
        };

        Some(Self {
            m: [
                solve(dst[0].0, dst[1].0, dst[2].0),
                solve(dst[0].1, dst[1].1, dst[2].1),
            ],
        })
    }

    /// Closed-form inverse. `None` for a singular linear part.
    pub fn invert(&self) -> Option<Self> {
        let [[a, b, c], [d, e, f]] = self.m;
        let det = a * e - b * d;
        if det.abs() < f64::EPSILON {
            return None;
        }
        let inv = 1.0 / det;
        Some(Self {
            m: [
                [e * inv, -b * inv, (b * f - e * c) * inv],
                [-d * inv, a * inv, (d * c - a * f) * inv],
            ],
        })
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let [[a, b, c], [d, e, f]] = self.m;
        (a * x + b * y + c, d * x + e * y + f)
    }
}

/// Maps the frame-space ROI onto an `input_w` x `input_h` image: center to center,
/// the rotated top edge midpoint to the top middle and the rotated left edge midpoint to the
/// left middle.
pub fn roi_to_input_transform(
    roi: &HandRoi,
    frame_w: u32,
    frame_h: u32,
    input_w: u32,
    input_h: u32,
) -> Option<AffineTransform> {
    let cx = roi.x_center * frame_w as f32;
    let cy = roi.y_center * frame_h as f32;
    let w = roi.width * frame_w as f32;
    let h = roi.height * frame_h as f32;

    let (top_x, top_y) = rotate(0.0, -h * 0.5, roi.rotation);
    let (left_x, left_y) = rotate(-w * 0.5, 0.0, roi.rotation);

    let src = [
        (cx as f64, cy as f64),
        ((cx + top_x) as f64, (cy + top_y) as f64),
        ((cx + left_x) as f64, (cy + left_y) as f64),
    ];
    let (iw, ih) = (input_w as f64, input_h as f64);
    let dst = [(iw * 0.5, ih * 0.5), (iw * 0.5, 0.0), (0.0, ih * 0.5)];

    AffineTransform::from_triangles(src, dst)
}

/// Builds a `[1, height, width, 3]` tensor scaled to `[0, 1]` whose pixel `(x, y)` is sampled
/// from `frame` at `input_to_frame(x, y)`.
///
/// Bilinear sampling; pixels sampled outside the frame are black.
pub fn warp_affine(
    frame: &Frame,
    input_to_frame: &AffineTransform,
    width: u32,
    height: u32,
) -> Result<Array4<f32>, FrameDecodeError> {
    frame.validate()?;

    let (out_w, out_h) = (width as usize, height as usize);
    let mut data = vec![0.0f32; out_w * out_h * 3];

    data.par_chunks_mut(out_w * 3)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, px) in row.chunks_exact_mut(3).enumerate() {
                let (sx, sy) = input_to_frame.apply(x as f64, y as f64);
                let rgb = sample_bilinear(frame, sx, sy);
                for (dst, value) in px.iter_mut().zip(rgb) {
                    *dst = value / 255.0;
                }
            }
        });

    Array4::from_shape_vec((1, out_h, out_w, 3), data)
        .map_err(|err| FrameDecodeError::Resize(err.to_string()))
}

fn sample_bilinear(frame: &Frame, x: f64, y: f64) -> [f32; 3] {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = (x - x0) as f32;
    let fy = (y - y0) as f32;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let mut out = [0.0f32; 3];
    let taps = [
        (x0, y0, (1.0 - fx) * (1.0 - fy)),
        (x0 + 1, y0, fx * (1.0 - fy)),
        (x0, y0 + 1, (1.0 - fx) * fy),
        (x0 + 1, y0 + 1, fx * fy),
    ];
    for (px, py, weight) in taps {
        if weight == 0.0 {
            continue;
        }
        if let Some(pixel) = pixel_at(frame, px, py) {
            for (acc, &channel) in out.iter_mut().zip(pixel) {
                *acc += channel as f32 * weight;
            }
        }
    }
    out
}

fn pixel_at(frame: &Frame, x: i64, y: i64) -> Option<&[u8]> {
    if x < 0 || y < 0 || x >= frame.width as i64 || y >= frame.height as i64 {
        return None;
    }
    let offset = (y as usize * frame.width as usize + x as usize) * 3;
    frame.rgb.get(offset..offset + 3)
}

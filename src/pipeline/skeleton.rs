//! Overlay rasterisation onto tightly packed RGB8 buffers.

use crate::types::{HAND_JOINT_NUM, PalmRegion};

pub type Color = [u8; 3];

pub const RED: Color = [255, 0, 0];
pub const GREEN: Color = [0, 255, 0];
pub const YELLOW: Color = [255, 255, 0];
pub const CYAN: Color = [0, 255, 255];
pub const MAGENTA: Color = [255, 0, 255];

/// Bones of the 21-joint hand skeleton.
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 4),
    (0, 5),
    (5, 6),
    (6, 7),
    (7, 8),
    (5, 9),
    (9, 10),
    (10, 11),
    (11, 12),
    (9, 13),
    (13, 14),
    (14, 15),
    (15, 16),
    (13, 17),
    (0, 17),
    (17, 18),
    (18, 19),
    (19, 20),
];

/// The joint the pointer follows.
pub const PALM_CENTER_JOINT: usize = 9;

const BONE_THICKNESS: i32 = 2;
const JOINT_RADIUS: i32 = 4;
const PALM_CENTER_RADIUS: i32 = 6;

fn put_pixel(rgb: &mut [u8], width: u32, height: u32, x: i32, y: i32, color: Color) {
    if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
        return;
    }
    let offset = (y as usize * width as usize + x as usize) * 3;
    if let Some(px) = rgb.get_mut(offset..offset + 3) {
        px.copy_from_slice(&color);
    }
}

pub fn fill_disc(
    rgb: &mut [u8],
    width: u32,
    height: u32,
    center: (f32, f32),
    radius: i32,
    color: Color,
) {
    if !center.0.is_finite() || !center.1.is_finite() {
        return;
    }
    let (cx, cy) = (center.0.round() as i32, center.1.round() as i32);
    let r2 = radius * radius;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= r2 {
                put_pixel(rgb, width, height, cx + dx, cy + dy, color);
            }
        }
    }
}

pub fn draw_line(
    rgb: &mut [u8],
    width: u32,
    height: u32,
    from: (f32, f32),
    to: (f32, f32),
    thickness: i32,
    color: Color,
) {
    if ![from.0, from.1, to.0, to.1].iter().all(|v| v.is_finite()) {
        return;
    }
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as i32;
    // Keep wildly off-screen joints from stalling the render loop.
    let steps = steps.min(4 * (width + height) as i32);
    let half = thickness / 2;
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        let x = (from.0 + dx * t).round() as i32;
        let y = (from.1 + dy * t).round() as i32;
        for oy in -half..=half {
            for ox in -half..=half {
                put_pixel(rgb, width, height, x + ox, y + oy, color);
            }
        }
    }
}

/// Closed outline through `points`.
pub fn draw_polygon(
    rgb: &mut [u8],
    width: u32,
    height: u32,
    points: &[(f32, f32)],
    thickness: i32,
    color: Color,
) {
    for (i, &from) in points.iter().enumerate() {
        let to = points[(i + 1) % points.len()];
        draw_line(rgb, width, height, from, to, thickness, color);
    }
}

pub fn draw_rect(
    rgb: &mut [u8],
    width: u32,
    height: u32,
    origin: (f32, f32),
    size: (f32, f32),
    thickness: i32,
    color: Color,
) {
    let (x, y) = origin;
    let (w, h) = size;
    draw_polygon(
        rgb,
        width,
        height,
        &[(x, y), (x + w, y), (x + w, y + h), (x, y + h)],
        thickness,
        color,
    );
}

/// Capture region outline, centered in the frame.
pub fn draw_capture_region(
    rgb: &mut [u8],
    width: u32,
    height: u32,
    region_width: u32,
    region_height: u32,
) {
    let x = (width as f32 - region_width as f32) / 2.0;
    let y = (height as f32 - region_height as f32) / 2.0;
    draw_rect(
        rgb,
        width,
        height,
        (x.floor(), y.floor()),
        (region_width as f32, region_height as f32),
        2,
        YELLOW,
    );
}

/// Bones, then joints: the wrist in red, the palm center larger and red, the rest green.
pub fn draw_skeleton(rgb: &mut [u8], width: u32, height: u32, points: &[(f32, f32)]) {
    if points.len() < HAND_JOINT_NUM {
        return;
    }
    for &(a, b) in &HAND_CONNECTIONS {
        draw_line(rgb, width, height, points[a], points[b], BONE_THICKNESS, CYAN);
    }
    fill_disc(
        rgb,
        width,
        height,
        points[PALM_CENTER_JOINT],
        PALM_CENTER_RADIUS,
        RED,
    );
    for (i, &point) in points.iter().enumerate().take(HAND_JOINT_NUM) {
        if i == PALM_CENTER_JOINT {
            continue;
        }
        let color = if i == 0 { RED } else { GREEN };
        fill_disc(rgb, width, height, point, JOINT_RADIUS, color);
    }
}

/// Rotated hand rectangles of detector candidates.
pub fn draw_palm_regions(rgb: &mut [u8], width: u32, height: u32, palms: &[PalmRegion]) {
    let (fw, fh) = (width as f32, height as f32);
    for palm in palms {
        let corners = palm.hand_corners.map(|(x, y)| (x * fw, y * fh));
        draw_polygon(rgb, width, height, &corners, 2, MAGENTA);
        for &(x, y) in &palm.keypoints {
            fill_disc(rgb, width, height, (x * fw, y * fh), 2, MAGENTA);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel(rgb: &[u8], width: u32, x: usize, y: usize) -> Color {
        let o = (y * width as usize + x) * 3;
        [rgb[o], rgb[o + 1], rgb[o + 2]]
    }

    #[test]
    fn connections_cover_every_joint() {
        let mut seen = [false; HAND_JOINT_NUM];
        for (a, b) in HAND_CONNECTIONS {
            seen[a] = true;
            seen[b] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn line_reaches_both_ends() {
        let mut rgb = vec![0u8; 10 * 10 * 3];
        draw_line(&mut rgb, 10, 10, (1.0, 1.0), (8.0, 5.0), 1, GREEN);
        assert_eq!(pixel(&rgb, 10, 1, 1), GREEN);
        assert_eq!(pixel(&rgb, 10, 8, 5), GREEN);
        assert_eq!(pixel(&rgb, 10, 8, 1), [0, 0, 0]);
    }

    #[test]
    fn drawing_off_screen_is_clipped() {
        let mut rgb = vec![0u8; 4 * 4 * 3];
        draw_line(&mut rgb, 4, 4, (-100.0, -100.0), (1e9, 2.0), 2, RED);
        fill_disc(&mut rgb, 4, 4, (f32::NAN, 1.0), 3, RED);
        fill_disc(&mut rgb, 4, 4, (50.0, 50.0), 3, RED);
        assert_eq!(rgb.len(), 4 * 4 * 3);
    }

    #[test]
    fn skeleton_marks_palm_center_and_wrist_red() {
        let (w, h) = (64u32, 64u32);
        let mut rgb = vec![0u8; (w * h * 3) as usize];
        let mut points = vec![(10.0, 10.0); HAND_JOINT_NUM];
        points[0] = (32.0, 56.0);
        points[PALM_CENTER_JOINT] = (32.0, 32.0);
        points[20] = (56.0, 10.0);

        draw_skeleton(&mut rgb, w, h, &points);

        assert_eq!(pixel(&rgb, w, 32, 32), RED);
        assert_eq!(pixel(&rgb, w, 32 + 6, 32), RED);
        assert_eq!(pixel(&rgb, w, 32, 56), RED);
        assert_eq!(pixel(&rgb, w, 56, 10), GREEN);
    }

    #[test]
    fn short_point_lists_draw_nothing() {
        let mut rgb = vec![0u8; 8 * 8 * 3];
        draw_skeleton(&mut rgb, 8, 8, &[(1.0, 1.0); 5]);
        assert!(rgb.iter().all(|&v| v == 0));
    }

    #[test]
    fn capture_region_is_centered() {
        let (w, h) = (100u32, 60u32);
        let mut rgb = vec![0u8; (w * h * 3) as usize];
        draw_capture_region(&mut rgb, w, h, 50, 30);
        assert_eq!(pixel(&rgb, w, 25, 15), YELLOW);
        assert_eq!(pixel(&rgb, w, 75, 45), YELLOW);
        assert_eq!(pixel(&rgb, w, 50, 30), [0, 0, 0]);
    }
}

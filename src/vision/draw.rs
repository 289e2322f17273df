//! Debug overlays drawn onto copies of the frame

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use imageproc::point::Point;

use super::contour::Quad;

pub const OUTLINE_GREEN: Rgb<u8> = Rgb([0, 255, 0]);

/// Every contour point stamped as a dot of the given thickness
pub fn draw_contours(frame: &RgbImage, contours: &[Vec<Point<i32>>], thickness: u32) -> RgbImage {
    let mut canvas = frame.clone();
    let radius = (thickness / 2).max(1) as i32;
    for contour in contours {
        for point in contour {
            draw_filled_circle_mut(&mut canvas, (point.x, point.y), radius, OUTLINE_GREEN);
        }
    }
    canvas
}

/// Corner dots plus the four outline edges of the detected document
pub fn draw_quad(frame: &RgbImage, quad: &Quad, dot_size: u32, line_thickness: u32) -> RgbImage {
    let mut canvas = frame.clone();
    let radius = (dot_size / 2).max(1) as i32;

    for corner in quad.corners {
        draw_filled_circle_mut(&mut canvas, (corner.x, corner.y), radius, OUTLINE_GREEN);
    }
    for (a, b) in quad.edges() {
        draw_thick_line(&mut canvas, a, b, line_thickness, OUTLINE_GREEN);
    }

    canvas
}

fn draw_thick_line(canvas: &mut RgbImage, a: Point<i32>, b: Point<i32>, thickness: u32, color: Rgb<u8>) {
    let (dx, dy) = ((b.x - a.x) as f32, (b.y - a.y) as f32);
    let length = (dx * dx + dy * dy).sqrt().max(1.0);
    // Unit normal, offsets spread the strokes across the thickness
    let (nx, ny) = (-dy / length, dx / length);
    let half = (thickness.max(1) as f32 - 1.0) / 2.0;

    for step in 0..thickness.max(1) {
        let offset = step as f32 - half;
        let (ox, oy) = (nx * offset, ny * offset);
        draw_line_segment_mut(
            canvas,
            (a.x as f32 + ox, a.y as f32 + oy),
            (b.x as f32 + ox, b.y as f32 + oy),
            color,
        );
    }
}

//! Perspective rectification

use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};

use super::contour::{contour_area, Quad};

/// Quads enclosing less than this many square pixels cannot be rectified
const MIN_QUAD_AREA: f64 = 1.0;

/// Projection taking the quad corners onto an upright `width` x `height` page
pub fn document_projection(quad: &Quad, width: u32, height: u32) -> Option<Projection> {
    let ring = [quad.top_left(), quad.top_right(), quad.bottom_right(), quad.bottom_left()];
    if contour_area(&ring) < MIN_QUAD_AREA || width == 0 || height == 0 {
        return None;
    }

    let (w, h) = (width as f32, height as f32);
    let target = [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)];
    Projection::from_control_points(quad.as_f32(), target)
}

/// Warp the document inside `quad` to a top-down view
///
/// Returns `None` when the corners are degenerate (collinear or repeated).
pub fn rectify(image: &RgbImage, quad: &Quad, width: u32, height: u32) -> Option<RgbImage> {
    let projection = document_projection(quad, width, height)?;
    let mut out = RgbImage::new(width, height);
    warp_into(
        image,
        &projection,
        Interpolation::Bilinear,
        Rgb([0, 0, 0]),
        &mut out,
    );
    Some(out)
}

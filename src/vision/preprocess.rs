//! Image preprocessing for document detection
//!
//! Working-size normalisation, edge map construction and the binarisation
//! applied to the rectified document.

use image::imageops::FilterType;
use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::{gaussian_blur_f32, median_filter};
use imageproc::morphology::{dilate, erode};

use crate::config::DetectionSettings;

/// Resize a frame to the working size (bilinear)
pub fn resize_frame(image: &RgbImage, width: u32, height: u32) -> RgbImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    image::imageops::resize(image, width, height, FilterType::Triangle)
}

/// Luminance conversion
pub fn to_gray(image: &RgbImage) -> GrayImage {
    image::imageops::grayscale(image)
}

/// Gaussian blur; a non-positive sigma leaves the image untouched
pub fn blur(image: &GrayImage, sigma: f32) -> GrayImage {
    if sigma <= 0.0 {
        return image.clone();
    }
    gaussian_blur_f32(image, sigma)
}

/// Canny edges thickened by dilation and thinned back by erosion
///
/// The closing step joins the broken edge fragments of a card border so the
/// outline comes out as one connected contour.
pub fn edge_map(blurred: &GrayImage, low: u8, high: u8, settings: &DetectionSettings) -> GrayImage {
    let (low, high) = if low <= high { (low, high) } else { (high, low) };
    let mut edges = canny(blurred, low as f32, high as f32);

    for _ in 0..settings.dilate_iterations {
        edges = dilate(&edges, Norm::LInf, settings.morph_radius);
    }
    for _ in 0..settings.erode_iterations {
        edges = erode(&edges, Norm::LInf, settings.morph_radius);
    }

    edges
}

/// Sigma of the standard Gaussian kernel for a given block size
pub fn gaussian_sigma_for_block(block_size: u32) -> f32 {
    0.3 * ((block_size.max(3) as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Gaussian adaptive threshold: white where the pixel is brighter than its
/// weighted neighbourhood mean minus `c`, black elsewhere
pub fn adaptive_threshold(gray: &GrayImage, block_size: u32, c: f32) -> GrayImage {
    let local_mean = gaussian_blur_f32(gray, gaussian_sigma_for_block(block_size));

    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let value = gray.get_pixel(x, y).0[0] as f32;
        let threshold = local_mean.get_pixel(x, y).0[0] as f32 - c;
        if value > threshold {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Binarised document for display: adaptive threshold plus median cleanup
pub fn binarize_document(gray: &GrayImage, settings: &DetectionSettings) -> GrayImage {
    let binary = adaptive_threshold(gray, settings.adaptive_block_size, settings.adaptive_c);
    if settings.median_radius == 0 {
        return binary;
    }
    median_filter(&binary, settings.median_radius, settings.median_radius)
}

//! Synthetic sky frames
//!
//! Each generator produces a frame whose darkness, sharpness and bright
//! regions are known ahead of time.

use image::codecs::jpeg::JpegEncoder;
use image::{imageops, Rgb, RgbImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Every pixel set to the same gray `level`
pub fn uniform_frame(width: u32, height: u32, level: u8) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([level, level, level]))
}

/// Black/white checkerboard with square cells of `cell` pixels
pub fn checkerboard_frame(width: u32, height: u32, cell: u32) -> RgbImage {
    let cell = cell.max(1);
    RgbImage::from_fn(width, height, |x, y| {
        let level = if ((x / cell) + (y / cell)) % 2 == 0 {
            255
        } else {
            0
        };
        Rgb([level, level, level])
    })
}

/// Gaussian-smoothed copy of `image`
pub fn smoothed_frame(image: &RgbImage, sigma: f32) -> RgbImage {
    imageops::blur(image, sigma)
}

/// `background` frame with one filled rectangle `(x, y, width, height)` at `foreground`
pub fn bright_rect_frame(
    width: u32,
    height: u32,
    rect: (u32, u32, u32, u32),
    background: u8,
    foreground: u8,
) -> RgbImage {
    let (rx, ry, rw, rh) = rect;
    RgbImage::from_fn(width, height, |x, y| {
        let inside = x >= rx && x < rx + rw && y >= ry && y < ry + rh;
        let level = if inside { foreground } else { background };
        Rgb([level, level, level])
    })
}

/// Night sky stand-in: gray 70 background with isolated 2x2 white stars
/// every 8 pixels.
///
/// Bright enough and sharp enough to pass the default quality gate, while no
/// single bright region is large enough to trigger a crop.
pub fn star_field_frame(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let level = if x % 8 >= 3 && x % 8 < 5 && y % 8 >= 3 && y % 8 < 5 {
            255
        } else {
            70
        };
        Rgb([level, level, level])
    })
}

/// Encode `image` as a maximum-quality JPEG at `path`
pub fn write_jpeg(image: &RgbImage, path: &Path) -> image::ImageResult<()> {
    let file = File::create(path)?;
    let mut encoder = JpegEncoder::new_with_quality(BufWriter::new(file), 100);
    encoder.encode_image(image)
}

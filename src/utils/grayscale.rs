//! RGB/RGBA to luma conversion
//!
//! Y = 0.299*R + 0.587*G + 0.114*B, computed with integer arithmetic:
//! Y = (76*R + 150*G + 29*B) >> 8

use rayon::prelude::*;

/// Coefficients for grayscale conversion: Y = (76*R + 150*G + 29*B) >> 8
const COEF_R: u32 = 76;
const COEF_G: u32 = 150;
const COEF_B: u32 = 29;

/// Frames at or above this many pixels are converted row-parallel
pub const PARALLEL_PIXEL_THRESHOLD: usize = 640 * 480;

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    let lum = (COEF_R * r as u32 + COEF_G * g as u32 + COEF_B * b as u32) >> 8;
    lum.min(255) as u8
}

/// Convert packed RGB bytes to luma
///
/// Picks the parallel path for large frames.
pub fn rgb_to_grayscale(rgb: &[u8], width: usize, height: usize) -> Vec<u8> {
    if width * height >= PARALLEL_PIXEL_THRESHOLD {
        return rgb_to_grayscale_parallel(rgb, width, height);
    }
    rgb.chunks_exact(3)
        .take(width * height)
        .map(|px| luma(px[0], px[1], px[2]))
        .collect()
}

/// Convert packed RGBA bytes to luma (alpha is ignored)
pub fn rgba_to_grayscale(rgba: &[u8], width: usize, height: usize) -> Vec<u8> {
    if width * height >= PARALLEL_PIXEL_THRESHOLD {
        return rgba_to_grayscale_parallel(rgba, width, height);
    }
    rgba.chunks_exact(4)
        .take(width * height)
        .map(|px| luma(px[0], px[1], px[2]))
        .collect()
}

/// Convert RGB to grayscale processing rows in parallel
pub fn rgb_to_grayscale_parallel(rgb: &[u8], width: usize, height: usize) -> Vec<u8> {
    convert_rows_parallel(rgb, width, height, 3)
}

/// Convert RGBA to grayscale processing rows in parallel
pub fn rgba_to_grayscale_parallel(rgba: &[u8], width: usize, height: usize) -> Vec<u8> {
    convert_rows_parallel(rgba, width, height, 4)
}

fn convert_rows_parallel(src: &[u8], width: usize, height: usize, channels: usize) -> Vec<u8> {
    let mut gray = vec![0u8; width * height];
    if width == 0 {
        return gray;
    }

    gray.par_chunks_mut(width)
        .zip(src.par_chunks(width * channels))
        .for_each(|(row, src_row)| {
            for (dst, px) in row.iter_mut().zip(src_row.chunks_exact(channels)) {
                *dst = luma(px[0], px[1], px[2]);
            }
        });

    gray
}

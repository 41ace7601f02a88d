//! Thresholding helpers used to clean up frames before decoding
//!
//! Outputs are luma buffers holding only 0 (black) and 255 (white) so they can
//! be fed straight back into a decoding backend.

const BLACK: u8 = 0;
const WHITE: u8 = 255;

/// Convert grayscale to black/white using Otsu's global threshold
pub fn otsu_binarize(gray: &[u8]) -> Vec<u8> {
    let threshold = calculate_otsu_threshold(gray);
    threshold_binarize(gray, threshold)
}

/// Calculate Otsu's optimal threshold
///
/// Single pass over the histogram using running class sums.
pub fn calculate_otsu_threshold(gray: &[u8]) -> u8 {
    let mut histogram = [0u64; 256];
    for &pixel in gray {
        histogram[pixel as usize] += 1;
    }

    let total = gray.len() as f64;
    if total == 0.0 {
        return 128;
    }
    let total_sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum();

    let mut background_pixels = 0f64;
    let mut background_sum = 0f64;
    let mut max_variance = 0.0;
    let mut optimal_threshold = 128u8;

    for (intensity, &count) in histogram.iter().enumerate() {
        // Pixels below `intensity` are class 1
        if background_pixels > 0.0 && background_pixels < total {
            let foreground_pixels = total - background_pixels;
            let mean_bg = background_sum / background_pixels;
            let mean_fg = (total_sum - background_sum) / foreground_pixels;
            let variance = background_pixels * foreground_pixels * (mean_bg - mean_fg).powi(2);
            if variance > max_variance {
                max_variance = variance;
                optimal_threshold = intensity as u8;
            }
        }
        background_pixels += count as f64;
        background_sum += intensity as f64 * count as f64;
    }

    optimal_threshold
}

/// Simple global threshold binarization (pixels below `threshold` become black)
pub fn threshold_binarize(gray: &[u8], threshold: u8) -> Vec<u8> {
    gray.iter()
        .map(|&v| if v < threshold { BLACK } else { WHITE })
        .collect()
}

/// Local mean thresholding over a `window`-sized square using an integral image
///
/// Handles uneven lighting (glare, shadows across a printed code) that a single
/// global threshold cannot.
pub fn adaptive_binarize(gray: &[u8], width: usize, height: usize, window: usize) -> Vec<u8> {
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let half = (window.max(3) / 2).max(1);
    let integral = integral_image(gray, width, height);
    let stride = width + 1;

    let mut out = vec![WHITE; width * height];
    for y in 0..height {
        let y0 = y.saturating_sub(half);
        let y1 = (y + half + 1).min(height);
        for x in 0..width {
            let x0 = x.saturating_sub(half);
            let x1 = (x + half + 1).min(width);
            let area = ((x1 - x0) * (y1 - y0)) as u64;
            let sum = integral[y1 * stride + x1] + integral[y0 * stride + x0]
                - integral[y0 * stride + x1]
                - integral[y1 * stride + x0];
            // Slight bias toward white keeps flat regions from speckling
            let pixel = gray[y * width + x] as u64;
            if pixel * area * 100 < sum * 93 {
                out[y * width + x] = BLACK;
            }
        }
    }
    out
}

fn integral_image(gray: &[u8], width: usize, height: usize) -> Vec<u64> {
    let stride = width + 1;
    let mut integral = vec![0u64; stride * (height + 1)];
    for y in 0..height {
        let mut row_sum = 0u64;
        for x in 0..width {
            row_sum += gray[y * width + x] as u64;
            integral[(y + 1) * stride + x + 1] = integral[y * stride + x + 1] + row_sum;
        }
    }
    integral
}

/// Swap dark and light (for light-on-dark codes)
pub fn invert(gray: &[u8]) -> Vec<u8> {
    gray.iter().map(|&v| 255 - v).collect()
}

use std::fmt;

use image::{DynamicImage, GrayImage, Luma, imageops::FilterType};

use crate::error::FrameError;
use crate::utils::grayscale::{rgb_to_grayscale, rgba_to_grayscale};

/// Luma pixel buffer ready for decoding
///
/// One byte per pixel, row-major. Dimensions are never zero and always match
/// the buffer length.
#[derive(Clone, PartialEq, Eq)]
pub struct RasterFrame {
    width: usize,
    height: usize,
    luma: Vec<u8>,
}

impl RasterFrame {
    /// Wrap an existing luma buffer
    pub fn from_luma(width: usize, height: usize, luma: Vec<u8>) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::Empty { width, height });
        }
        let expected = width.checked_mul(height).ok_or(FrameError::BufferSize {
            expected: usize::MAX,
            actual: luma.len(),
        })?;
        if luma.len() != expected {
            return Err(FrameError::BufferSize {
                expected,
                actual: luma.len(),
            });
        }
        Ok(Self {
            width,
            height,
            luma,
        })
    }

    /// Build from packed RGB bytes (3 bytes per pixel)
    pub fn from_rgb(rgb: &[u8], width: usize, height: usize) -> Result<Self, FrameError> {
        check_packed(rgb.len(), width, height, 3)?;
        Self::from_luma(width, height, rgb_to_grayscale(rgb, width, height))
    }

    /// Build from packed RGBA bytes (4 bytes per pixel), the layout canvases
    /// and most camera APIs hand out
    pub fn from_rgba(rgba: &[u8], width: usize, height: usize) -> Result<Self, FrameError> {
        check_packed(rgba.len(), width, height, 4)?;
        Self::from_luma(width, height, rgba_to_grayscale(rgba, width, height))
    }

    /// Build from a decoded image of any color type
    pub fn from_image(image: &DynamicImage) -> Result<Self, FrameError> {
        match image {
            DynamicImage::ImageLuma8(gray) => {
                let (w, h) = gray.dimensions();
                Self::from_luma(w as usize, h as usize, gray.as_raw().clone())
            }
            DynamicImage::ImageRgba8(rgba) => {
                let (w, h) = rgba.dimensions();
                Self::from_rgba(rgba.as_raw(), w as usize, h as usize)
            }
            other => {
                let rgb = other.to_rgb8();
                let (w, h) = rgb.dimensions();
                Self::from_rgb(rgb.as_raw(), w as usize, h as usize)
            }
        }
    }

    /// Frame width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Frame height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw luma bytes
    pub fn luma(&self) -> &[u8] {
        &self.luma
    }

    /// Luma at (x, y); out-of-range coordinates read as white
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        if x >= self.width || y >= self.height {
            return 255;
        }
        self.luma[y * self.width + x]
    }

    /// Same dimensions, different pixels
    pub fn with_luma(&self, luma: Vec<u8>) -> Result<Self, FrameError> {
        Self::from_luma(self.width, self.height, luma)
    }

    /// Downscale so the longest side is at most `max_dim`
    ///
    /// Returns the frame unchanged when it already fits.
    pub fn downscaled(self, max_dim: u32) -> Self {
        let max_side = self.width.max(self.height);
        if max_dim == 0 || max_side <= max_dim as usize {
            return self;
        }
        let scale = max_dim as f32 / max_side as f32;
        let new_w = ((self.width as f32 * scale).round() as u32).max(1);
        let new_h = ((self.height as f32 * scale).round() as u32).max(1);

        let width = self.width;
        let gray = GrayImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            Luma([self.luma[y as usize * width + x as usize]])
        });
        let resized = image::imageops::resize(&gray, new_w, new_h, FilterType::Triangle);
        Self {
            width: new_w as usize,
            height: new_h as usize,
            luma: resized.into_raw(),
        }
    }
}

fn check_packed(len: usize, width: usize, height: usize, channels: usize) -> Result<(), FrameError> {
    if width == 0 || height == 0 {
        return Err(FrameError::Empty { width, height });
    }
    let expected = width
        .checked_mul(height)
        .and_then(|pixels| pixels.checked_mul(channels))
        .ok_or(FrameError::BufferSize {
            expected: usize::MAX,
            actual: len,
        })?;
    if len != expected {
        return Err(FrameError::BufferSize {
            expected,
            actual: len,
        });
    }
    Ok(())
}

impl fmt::Debug for RasterFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

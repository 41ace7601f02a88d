//! Utility functions for frame preparation
//!
//! - Grayscale conversion (RGB/RGBA to luminance)
//! - Binarization (Otsu, adaptive, inversion)

pub mod binarization;
pub mod grayscale;

use tracing::trace;

use super::DecodeBackend;
use super::rqrr_backend::{decode_luma, guarded};
use crate::error::BackendError;
use crate::models::{Decoded, RasterFrame};
use crate::utils::binarization::{adaptive_binarize, invert, otsu_binarize};

pub(crate) const NAME: &str = "binarized";

/// One way of preparing a frame before decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Threshold {
    /// Global Otsu threshold
    Otsu,
    /// Local mean threshold with a window sized from the frame
    Adaptive,
    /// Otsu on the inverted frame (light modules on a dark background)
    InvertedOtsu,
}

/// Thresholds the frame before handing it to `rqrr`
///
/// Catches codes the plain backend misses: glare, shadows, low contrast
/// prints, and inverted codes. Strategies run in order; first payload wins.
#[derive(Debug, Clone)]
pub struct BinarizedBackend {
    strategies: Vec<Threshold>,
}

impl BinarizedBackend {
    /// Backend running only the given strategies, in order
    pub fn with_strategies(strategies: Vec<Threshold>) -> Self {
        Self { strategies }
    }
}

impl Default for BinarizedBackend {
    fn default() -> Self {
        Self::with_strategies(vec![
            Threshold::Otsu,
            Threshold::Adaptive,
            Threshold::InvertedOtsu,
        ])
    }
}

/// Local window: about an eighth of the short side, odd, within 15..=101
fn adaptive_window(frame: &RasterFrame) -> usize {
    ((frame.width().min(frame.height()) / 8).clamp(15, 101)) | 1
}

fn prepare(frame: &RasterFrame, threshold: Threshold) -> Vec<u8> {
    match threshold {
        Threshold::Otsu => otsu_binarize(frame.luma()),
        Threshold::Adaptive => adaptive_binarize(
            frame.luma(),
            frame.width(),
            frame.height(),
            adaptive_window(frame),
        ),
        Threshold::InvertedOtsu => otsu_binarize(&invert(frame.luma())),
    }
}

impl DecodeBackend for BinarizedBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn decode(&self, frame: &RasterFrame) -> Result<Option<Decoded>, BackendError> {
        for &threshold in &self.strategies {
            let prepared = frame
                .with_luma(prepare(frame, threshold))
                .map_err(|err| BackendError::Rejected {
                    backend: NAME,
                    reason: err.to_string(),
                })?;
            if let Some(decoded) = guarded(NAME, frame, || decode_luma(&prepared, NAME))? {
                trace!(?threshold, "binarized decode succeeded");
                return Ok(Some(decoded));
            }
        }
        Ok(None)
    }
}

use std::panic::{self, AssertUnwindSafe};

use tracing::trace;

use super::DecodeBackend;
use crate::error::BackendError;
use crate::models::{Decoded, ECLevel, RasterFrame};

pub(crate) const NAME: &str = "rqrr";

/// Frames above this many pixels are refused (~33 MP)
pub const DEFAULT_MAX_PIXELS: usize = 8192 * 4096;

/// Decodes the frame's luma directly with `rqrr`
#[derive(Debug, Clone)]
pub struct RqrrBackend {
    max_pixels: usize,
}

impl RqrrBackend {
    /// Backend refusing frames larger than `max_pixels`
    pub fn with_max_pixels(max_pixels: usize) -> Self {
        Self { max_pixels }
    }
}

impl Default for RqrrBackend {
    fn default() -> Self {
        Self::with_max_pixels(DEFAULT_MAX_PIXELS)
    }
}

impl DecodeBackend for RqrrBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn decode(&self, frame: &RasterFrame) -> Result<Option<Decoded>, BackendError> {
        let pixels = frame.width() * frame.height();
        if pixels > self.max_pixels {
            return Err(BackendError::Rejected {
                backend: NAME,
                reason: format!("{pixels} pixels exceeds limit of {}", self.max_pixels),
            });
        }
        guarded(NAME, frame, || decode_luma(frame, NAME))
    }
}

/// Run a decode, turning a panic inside the third-party decoder into a
/// [`BackendError`]
pub(crate) fn guarded<F>(
    backend: &'static str,
    frame: &RasterFrame,
    decode: F,
) -> Result<Option<Decoded>, BackendError>
where
    F: FnOnce() -> Option<Decoded>,
{
    panic::catch_unwind(AssertUnwindSafe(decode)).map_err(|_| BackendError::Panicked {
        backend,
        width: frame.width(),
        height: frame.height(),
    })
}

/// Detect grids in a luma frame and return the first one that decodes
pub(crate) fn decode_luma(frame: &RasterFrame, backend: &'static str) -> Option<Decoded> {
    let mut prepared =
        rqrr::PreparedImage::prepare_from_greyscale(frame.width(), frame.height(), |x, y| {
            frame.pixel(x, y)
        });
    let grids = prepared.detect_grids();
    trace!(backend, grids = grids.len(), "grids detected");

    for grid in grids {
        match grid.decode() {
            Ok((meta, content)) => {
                return Some(Decoded {
                    content,
                    backend,
                    version: u8::try_from(meta.version.0).ok(),
                    error_correction: ECLevel::from_format_bits(meta.ecc_level),
                });
            }
            Err(err) => trace!(backend, error = ?err, "grid failed to decode"),
        }
    }
    None
}

use std::fmt;

use image::DynamicImage;
use tracing::{debug, warn};

use super::{BackendKind, DecodeBackend};
use crate::error::{ConfigError, DecodeFailure, ScanError};
use crate::models::{Decoded, RasterFrame};

/// Ordered list of backends with first-success-wins fallback
///
/// A backend that reports "not found" or raises an error hands the frame to
/// the next one. When none succeeds the failure is `NotFound` if any backend
/// merely found nothing, and `AllBackendsFailed` only if every backend errored.
pub struct DecoderChain {
    backends: Vec<Box<dyn DecodeBackend>>,
}

impl DecoderChain {
    /// Chain over the given backends, tried in order
    pub fn new(backends: Vec<Box<dyn DecodeBackend>>) -> Result<Self, ConfigError> {
        if backends.is_empty() {
            return Err(ConfigError::NoBackends);
        }
        Ok(Self { backends })
    }

    /// Chain over built-in backends
    pub fn from_kinds(kinds: &[BackendKind]) -> Result<Self, ConfigError> {
        Self::new(kinds.iter().map(|kind| kind.build()).collect())
    }

    /// `rqrr` first, then the thresholding backend
    pub fn standard() -> Self {
        Self {
            backends: vec![BackendKind::Rqrr.build(), BackendKind::Binarized.build()],
        }
    }

    /// Backend names in the order they are tried
    pub fn backend_names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Decode a raster frame
    pub fn decode_frame(&self, frame: &RasterFrame) -> Result<Decoded, DecodeFailure> {
        let mut errors = Vec::new();

        for backend in &self.backends {
            match backend.decode(frame) {
                Ok(Some(decoded)) => {
                    debug!(backend = backend.name(), "frame decoded");
                    return Ok(decoded);
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(backend = backend.name(), error = %err, "backend failed, falling back");
                    errors.push(err);
                }
            }
        }

        if errors.len() == self.backends.len() {
            Err(DecodeFailure::AllBackendsFailed(errors))
        } else {
            Err(DecodeFailure::NotFound)
        }
    }

    /// Decode a still image of any color type
    pub fn decode_image(&self, image: &DynamicImage) -> Result<Decoded, ScanError> {
        let frame = RasterFrame::from_image(image).map_err(|err| ScanError::ResourceLoad(err.into()))?;
        Ok(self.decode_frame(&frame)?)
    }
}

impl Default for DecoderChain {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for DecoderChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderChain")
            .field("backends", &self.backend_names())
            .finish()
    }
}

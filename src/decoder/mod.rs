//! Decoding backends and the fallback chain that orders them
//!
//! The QR decoding itself is delegated to the `rqrr` crate; backends differ
//! in how they prepare a frame before handing it over:
//! - [`RqrrBackend`]: the frame's luma as-is
//! - [`BinarizedBackend`]: Otsu, adaptive and inverted thresholding first
//!
//! [`DecoderChain`] tries them in order and reports the first payload.

/// Thresholding backend for low-contrast, unevenly lit or inverted codes
pub mod binarized;
/// Ordered fallback across backends
pub mod chain;
/// Plain `rqrr` backend
pub mod rqrr_backend;

use std::fmt;
use std::str::FromStr;

use crate::error::{BackendError, ConfigError};
use crate::models::{Decoded, RasterFrame};

pub use binarized::BinarizedBackend;
pub use chain::DecoderChain;
pub use rqrr_backend::RqrrBackend;

/// A capability that extracts a payload from a raster frame
///
/// `Ok(None)` means the frame holds no decodable code. That is the normal
/// outcome for most camera frames and must not be reported as an error.
pub trait DecodeBackend: Send + Sync {
    /// Short stable name, used in logs and success messages
    fn name(&self) -> &'static str;

    /// Attempt to decode one frame
    fn decode(&self, frame: &RasterFrame) -> Result<Option<Decoded>, BackendError>;
}

/// Built-in backends, selectable by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// [`RqrrBackend`]
    Rqrr,
    /// [`BinarizedBackend`]
    Binarized,
}

impl BackendKind {
    /// Instantiate the backend with default settings
    pub fn build(self) -> Box<dyn DecodeBackend> {
        match self {
            BackendKind::Rqrr => Box::new(RqrrBackend::default()),
            BackendKind::Binarized => Box::new(BinarizedBackend::default()),
        }
    }

    /// Parse a comma separated, ordered list such as `"binarized,rqrr"`
    pub fn parse_list(list: &str) -> Result<Vec<BackendKind>, ConfigError> {
        let kinds = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<_>, _>>()?;
        if kinds.is_empty() {
            return Err(ConfigError::NoBackends);
        }
        Ok(kinds)
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rqrr" => Ok(BackendKind::Rqrr),
            "binarized" | "binarised" => Ok(BackendKind::Binarized),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Rqrr => rqrr_backend::NAME,
            BackendKind::Binarized => binarized::NAME,
        };
        f.write_str(name)
    }
}

//! Session configuration with environment overrides
//!
//! | Variable                  | Default       |
//! |---------------------------|---------------|
//! | `QR_MAX_SCANS_PER_SECOND` | 1 (1..=60)    |
//! | `QR_FRAME_TIMEOUT_MS`     | 5000          |
//! | `QR_MAX_DIM`              | unset (0)     |
//! | `QR_BACKENDS`             | `rqrr,binarized` |
//! | `QR_FACING_MODE`          | `environment` |
//!
//! Unparseable values fall back to the default.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::camera::{CameraConstraints, FacingMode};
use crate::decoder::{BackendKind, DecoderChain};
use crate::error::ConfigError;

/// Default polling rate for camera frames
pub const DEFAULT_MAX_SCANS_PER_SECOND: u32 = 1;
/// Default time to wait for a single camera frame
pub const DEFAULT_FRAME_TIMEOUT: Duration = Duration::from_secs(5);

fn parse_var<T, F>(lookup: &F, name: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "ignoring unparseable setting");
            None
        }
    }
}

/// Knobs for a [`crate::ScanSession`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Upper bound on camera decode attempts per second
    pub max_scans_per_second: u32,
    /// How long to wait for the camera to deliver a frame before failing
    pub frame_timeout: Duration,
    /// Downscale images whose longest side exceeds this
    pub max_image_dim: Option<u32>,
    /// Backends in fallback order
    pub backends: Vec<BackendKind>,
    /// Requested camera settings
    pub camera: CameraConstraints,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_scans_per_second: DEFAULT_MAX_SCANS_PER_SECOND,
            frame_timeout: DEFAULT_FRAME_TIMEOUT,
            max_image_dim: None,
            backends: vec![BackendKind::Rqrr, BackendKind::Binarized],
            camera: CameraConstraints::default(),
        }
    }
}

impl ScanConfig {
    /// Defaults overridden by `QR_*` environment variables
    pub fn from_env() -> Self {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `QR_*` name
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(rate) = parse_var::<u32, _>(&lookup, "QR_MAX_SCANS_PER_SECOND") {
            config.max_scans_per_second = rate.clamp(1, 60);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "QR_FRAME_TIMEOUT_MS") {
            config.frame_timeout = Duration::from_millis(ms.max(1));
        }
        if let Some(dim) = parse_var::<u32, _>(&lookup, "QR_MAX_DIM") {
            config.max_image_dim = (dim != 0).then_some(dim);
        }
        if let Some(list) = lookup("QR_BACKENDS") {
            match BackendKind::parse_list(&list) {
                Ok(kinds) => config.backends = kinds,
                Err(err) => warn!(error = %err, "ignoring QR_BACKENDS"),
            }
        }
        if let Some(mode) = parse_var::<FacingMode, _>(&lookup, "QR_FACING_MODE") {
            config.camera.facing_mode = mode;
        }

        config
    }

    /// Time between camera decode attempts
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(1) / self.max_scans_per_second.clamp(1, 60)
    }

    /// Put `primary` first, keeping the relative order of the rest
    pub fn with_primary(mut self, primary: BackendKind) -> Self {
        self.backends.retain(|kind| *kind != primary);
        self.backends.insert(0, primary);
        self
    }

    /// Build the decoder chain for the configured backends
    pub fn decoder_chain(&self) -> Result<DecoderChain, ConfigError> {
        DecoderChain::from_kinds(&self.backends)
    }
}

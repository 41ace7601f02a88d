//! Error taxonomy for scan sessions
//!
//! Failures are split by where they originate:
//! - [`BackendError`]: a single decoding backend broke on a frame
//! - [`DecodeFailure`]: the outcome of the whole fallback chain
//! - [`DeviceError`]: camera hardware or permission problems
//! - [`ResourceLoadError`]: a still image could not be turned into a raster
//!
//! [`ScanError`] unifies them for the session, and [`ScanFailure`] is the
//! cloneable form handed to the presentation layer.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// A decoding backend failed on a frame (not the same as "no code present").
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The backend panicked while processing the frame
    #[error("{backend} panicked while decoding a {width}x{height} frame")]
    Panicked {
        /// Name of the backend
        backend: &'static str,
        /// Frame width in pixels
        width: usize,
        /// Frame height in pixels
        height: usize,
    },
    /// The backend refused the frame as input
    #[error("{backend} rejected the frame: {reason}")]
    Rejected {
        /// Name of the backend
        backend: &'static str,
        /// Why the frame was rejected
        reason: String,
    },
}

impl BackendError {
    /// Name of the backend that produced this error
    pub fn backend(&self) -> &'static str {
        match self {
            BackendError::Panicked { backend, .. } | BackendError::Rejected { backend, .. } => {
                backend
            }
        }
    }
}

/// Final outcome of a decoder chain that produced no payload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeFailure {
    /// No backend found a decodable code
    #[error("no QR code found")]
    NotFound,
    /// Every backend raised a [`BackendError`]
    #[error("all {} decoding backends failed", .0.len())]
    AllBackendsFailed(Vec<BackendError>),
}

/// Camera capability failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeviceError {
    /// The platform exposes no camera API at all
    #[error("camera access is not supported on this device")]
    Unsupported,
    /// The user or the OS refused camera access
    #[error("camera permission denied")]
    PermissionDenied,
    /// Another stream already holds the camera
    #[error("camera is already in use")]
    Busy,
    /// The camera could not be opened
    #[error("camera unavailable: {0}")]
    Unavailable(String),
    /// The stream stopped delivering frames (track ended externally)
    #[error("camera stream ended unexpectedly")]
    StreamEnded,
    /// No frame arrived within the configured timeout
    #[error("no camera frame within {0:?}")]
    FrameTimeout(Duration),
}

/// Raster construction failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FrameError {
    /// Width or height was zero
    #[error("frame has empty dimensions {width}x{height}")]
    Empty {
        /// Requested width
        width: usize,
        /// Requested height
        height: usize,
    },
    /// Buffer length does not match the dimensions
    #[error("expected {expected} bytes for frame, got {actual}")]
    BufferSize {
        /// Bytes required by the dimensions
        expected: usize,
        /// Bytes supplied
        actual: usize,
    },
}

/// A selected image could not be loaded as a raster.
#[derive(Debug, Error)]
pub enum ResourceLoadError {
    /// Reading the file failed
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File that was being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
    /// The bytes are not an image format we can decode
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    /// The decoded image cannot be used as a frame
    #[error(transparent)]
    Raster(#[from] FrameError),
}

/// Invalid configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A decoder chain needs at least one backend
    #[error("decoder chain has no backends")]
    NoBackends,
    /// Unknown backend name
    #[error("unknown decoding backend '{0}' (expected rqrr or binarized)")]
    UnknownBackend(String),
    /// Unknown camera facing mode
    #[error("unknown facing mode '{0}' (expected environment or user)")]
    UnknownFacingMode(String),
}

/// Any terminal failure of a scan attempt.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The image or frames contained no decodable code
    #[error("no QR code found")]
    NotFound,
    /// All backends raised errors
    #[error("all decoding backends failed")]
    Backend(Vec<BackendError>),
    /// Camera failure
    #[error(transparent)]
    Device(#[from] DeviceError),
    /// Still image could not be loaded
    #[error(transparent)]
    ResourceLoad(#[from] ResourceLoadError),
}

impl From<DecodeFailure> for ScanError {
    fn from(failure: DecodeFailure) -> Self {
        match failure {
            DecodeFailure::NotFound => ScanError::NotFound,
            DecodeFailure::AllBackendsFailed(errors) => ScanError::Backend(errors),
        }
    }
}

/// Broad category of a [`ScanFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No decodable code
    NotFound,
    /// Decoding backends broke
    Backend,
    /// Camera problem
    Device,
    /// Image could not be loaded
    ResourceLoad,
}

/// Presentation-ready failure carried by the session's Error state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFailure {
    /// Category of the failure
    pub kind: FailureKind,
    /// Message suitable for showing to the user
    pub message: String,
}

impl From<&ScanError> for ScanFailure {
    fn from(err: &ScanError) -> Self {
        let (kind, message) = match err {
            ScanError::NotFound => (
                FailureKind::NotFound,
                "No QR code found in the image.".to_string(),
            ),
            ScanError::Backend(_) => (
                FailureKind::Backend,
                "All QR code scanning methods failed.".to_string(),
            ),
            ScanError::Device(DeviceError::Unsupported) => (
                FailureKind::Device,
                "Camera access is not supported on this device.".to_string(),
            ),
            ScanError::Device(DeviceError::StreamEnded) => (
                FailureKind::Device,
                "Camera stream ended unexpectedly. Please try again.".to_string(),
            ),
            ScanError::Device(DeviceError::FrameTimeout(_)) => (
                FailureKind::Device,
                "Camera stopped producing frames. Please try again.".to_string(),
            ),
            ScanError::Device(device) => (
                FailureKind::Device,
                format!("Error starting camera. Please try again or use file upload. {device}"),
            ),
            ScanError::ResourceLoad(_) => (
                FailureKind::ResourceLoad,
                "Error loading image. Please try a different file.".to_string(),
            ),
        };
        ScanFailure { kind, message }
    }
}

impl From<ScanError> for ScanFailure {
    fn from(err: ScanError) -> Self {
        ScanFailure::from(&err)
    }
}

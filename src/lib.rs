//! qr_scan - interactive QR code scan sessions
//!
//! Turns a still image or a live camera feed into a decoded QR payload while
//! exposing a single observable state (`Idle`, `Loading`, `Success`, `Error`)
//! to the presentation layer.
//!
//! ```no_run
//! use std::sync::Arc;
//! use qr_scan::{ReplayCamera, ScanConfig, ScanSession};
//!
//! # async fn run() -> Result<(), qr_scan::ConfigError> {
//! let session = ScanSession::new(ScanConfig::from_env(), Arc::new(ReplayCamera::new(Vec::new())))?;
//! session.start_with_image(std::path::PathBuf::from("code.png"));
//! let snapshot = session.settled().await;
//! if let Some(result) = snapshot.result() {
//!     println!("{}", result.payload());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

/// Camera capability, stream leases and a replay camera
pub mod camera;
/// Session configuration
pub mod config;
/// Decoding backends and the fallback chain
pub mod decoder;
/// Error types and user-facing failure messages
pub mod error;
/// Core data structures (frames, payloads, session state)
pub mod models;
/// Rate-bounded frame polling
pub mod sampler;
/// The scan session state machine
pub mod session;
/// Image inputs and frame loading
pub mod source;
/// Dataset helpers for the CLI and benchmarks
pub mod tools;
/// Utility functions (grayscale, binarization)
pub mod utils;

pub use camera::{Camera, CameraConstraints, CameraLease, FacingMode, ReplayCamera, StreamId};
pub use config::ScanConfig;
pub use decoder::{BackendKind, BinarizedBackend, DecodeBackend, DecoderChain, RqrrBackend};
pub use error::{
    BackendError, ConfigError, DecodeFailure, DeviceError, FailureKind, FrameError,
    ResourceLoadError, ScanError, ScanFailure,
};
pub use models::{
    AttemptId, Decoded, ECLevel, RasterFrame, ScanResult, ScanSnapshot, ScanState, ScanStatus,
};
pub use sampler::FrameSampler;
pub use session::ScanSession;
pub use source::{FrameSource, ImageInput, load_frame};

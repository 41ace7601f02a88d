use crate::error::ScanFailure;
use crate::source::FrameSource;

use super::Decoded;

/// Coarse session status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    /// Nothing in progress
    Idle,
    /// Loading an image or scanning camera frames
    Loading,
    /// A payload was decoded
    Success,
    /// The attempt failed
    Error,
}

/// Payload of a successful scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    /// The decoded code
    pub decoded: Decoded,
    /// Whether it came from the live camera rather than a still image
    pub from_camera: bool,
}

impl ScanResult {
    /// Decoded text
    pub fn payload(&self) -> &str {
        &self.decoded.content
    }

    /// Status line for the presentation layer
    pub fn message(&self) -> String {
        if self.from_camera {
            "QR code scanned successfully from camera!".to_string()
        } else {
            format!("QR code scanned successfully with {}!", self.decoded.backend)
        }
    }
}

/// Session state with its payload
///
/// A result exists only in `Success` and a failure only in `Error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanState {
    /// Nothing in progress
    Idle,
    /// Attempt running; `camera_active` once a stream is being sampled
    Loading {
        /// A camera stream is held and being sampled
        camera_active: bool,
    },
    /// Terminal success
    Success(ScanResult),
    /// Terminal failure
    Error(ScanFailure),
}

impl ScanState {
    /// Project to the coarse status
    pub fn status(&self) -> ScanStatus {
        match self {
            ScanState::Idle => ScanStatus::Idle,
            ScanState::Loading { .. } => ScanStatus::Loading,
            ScanState::Success(_) => ScanStatus::Success,
            ScanState::Error(_) => ScanStatus::Error,
        }
    }

    /// Whether the state is Success or Error
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanState::Success(_) | ScanState::Error(_))
    }
}

/// Identifies one scan attempt; later attempts have larger ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttemptId(pub u64);

/// Point-in-time view of a session handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSnapshot {
    /// Current state
    pub state: ScanState,
    /// Active source, if any
    pub source: Option<FrameSource>,
    /// Most recent attempt
    pub attempt: AttemptId,
}

impl ScanSnapshot {
    pub(crate) fn idle() -> Self {
        Self {
            state: ScanState::Idle,
            source: None,
            attempt: AttemptId(0),
        }
    }

    /// Coarse status
    pub fn status(&self) -> ScanStatus {
        self.state.status()
    }

    /// Decoded result, present only on Success
    pub fn result(&self) -> Option<&ScanResult> {
        match &self.state {
            ScanState::Success(result) => Some(result),
            _ => None,
        }
    }

    /// Failure, present only on Error
    pub fn error(&self) -> Option<&ScanFailure> {
        match &self.state {
            ScanState::Error(failure) => Some(failure),
            _ => None,
        }
    }

    /// Whether a camera stream is being sampled
    pub fn camera_active(&self) -> bool {
        matches!(
            self.state,
            ScanState::Loading {
                camera_active: true
            }
        )
    }
}

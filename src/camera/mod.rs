//! Camera capability and scoped stream ownership
//!
//! A [`Camera`] hands out at most one stream at a time. [`CameraLease`] ties
//! a stream to a scope so every exit path (cancel, success, error, teardown)
//! gives it back exactly once.

/// Camera that replays still images as frames
pub mod replay;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{ConfigError, DeviceError};
use crate::models::RasterFrame;

pub use replay::ReplayCamera;

/// Handle to an open camera stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(pub u64);

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream-{}", self.0)
    }
}

/// Which way the camera should face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacingMode {
    /// Rear camera, pointed at the code
    #[default]
    Environment,
    /// Front camera
    User,
}

impl FromStr for FacingMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "environment" | "rear" | "back" => Ok(FacingMode::Environment),
            "user" | "front" => Ok(FacingMode::User),
            other => Err(ConfigError::UnknownFacingMode(other.to_string())),
        }
    }
}

/// Settings requested when opening a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraConstraints {
    /// Preferred camera
    pub facing_mode: FacingMode,
    /// Preferred resolution; the device may pick the closest it supports
    pub ideal_resolution: Option<(u32, u32)>,
}

impl Default for CameraConstraints {
    fn default() -> Self {
        Self {
            facing_mode: FacingMode::Environment,
            ideal_resolution: Some((1280, 720)),
        }
    }
}

/// A source of live frames
#[async_trait]
pub trait Camera: Send + Sync {
    /// Whether camera access exists at all on this platform
    fn is_supported(&self) -> bool {
        true
    }

    /// Open a stream; fails with `Busy` while another stream is open
    async fn acquire(&self, constraints: &CameraConstraints) -> Result<StreamId, DeviceError>;

    /// Wait for the next frame
    ///
    /// `Ok(None)` means the stream is open but not producing frames yet.
    /// A stopped or released stream yields `Err(DeviceError::StreamEnded)`.
    async fn next_frame(&self, stream: StreamId) -> Result<Option<RasterFrame>, DeviceError>;

    /// Close a stream. Releasing an unknown or already released stream is a
    /// no-op.
    fn release(&self, stream: StreamId);
}

/// Exclusive ownership of one open stream, released on drop
pub struct CameraLease {
    camera: Arc<dyn Camera>,
    stream: Option<StreamId>,
}

impl CameraLease {
    /// Open a stream on `camera`
    pub async fn acquire(
        camera: Arc<dyn Camera>,
        constraints: &CameraConstraints,
    ) -> Result<Self, DeviceError> {
        if !camera.is_supported() {
            return Err(DeviceError::Unsupported);
        }
        let stream = camera.acquire(constraints).await?;
        debug!(%stream, "camera stream acquired");
        Ok(Self {
            camera,
            stream: Some(stream),
        })
    }

    /// The held stream, or `None` once released
    pub fn stream(&self) -> Option<StreamId> {
        self.stream
    }

    /// Give the stream back; later calls do nothing
    pub fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            self.camera.release(stream);
            debug!(%stream, "camera stream released");
        }
    }
}

impl Drop for CameraLease {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for CameraLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraLease")
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facing_mode_parses_aliases() {
        assert_eq!("rear".parse::<FacingMode>(), Ok(FacingMode::Environment));
        assert_eq!("USER".parse::<FacingMode>(), Ok(FacingMode::User));
        assert!("sideways".parse::<FacingMode>().is_err());
    }

    #[tokio::test]
    async fn lease_releases_once() {
        let camera = Arc::new(ReplayCamera::new(Vec::new()));
        let mut lease = CameraLease::acquire(camera.clone(), &CameraConstraints::default())
            .await
            .expect("acquire");
        assert!(lease.stream().is_some());
        assert!(camera.open_stream().is_some());

        lease.release();
        lease.release();
        drop(lease);
        assert_eq!(camera.open_stream(), None);
        assert_eq!(camera.releases(), 1);
    }

    #[tokio::test]
    async fn unsupported_camera_is_never_acquired() {
        let camera = Arc::new(ReplayCamera::new(Vec::new()).unsupported());
        let err = CameraLease::acquire(camera.clone(), &CameraConstraints::default())
            .await
            .expect_err("unsupported");
        assert_eq!(err, DeviceError::Unsupported);
        assert_eq!(camera.acquisitions(), 0);
    }
}

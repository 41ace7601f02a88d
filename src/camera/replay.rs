use std::path::Path;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, trace};

use super::{Camera, CameraConstraints, StreamId};
use crate::error::{DeviceError, ResourceLoadError};
use crate::models::RasterFrame;
use crate::source::load_frame_blocking;
use crate::tools::collect_images;

/// Camera whose "live" feed is a fixed list of frames
///
/// Useful for replaying captured footage through a full session and for
/// exercising device edge cases: a warm-up period with no frames, a feed that
/// ends, denied permission, or no camera support at all. Like real hardware
/// it serves one stream at a time.
#[derive(Debug)]
pub struct ReplayCamera {
    frames: Vec<RasterFrame>,
    warmup: usize,
    looping: bool,
    supported: bool,
    deny_permission: bool,
    state: Mutex<ReplayState>,
}

#[derive(Debug, Default)]
struct ReplayState {
    open: Option<StreamId>,
    next_id: u64,
    cursor: usize,
    warmup_left: usize,
    ended: bool,
    acquisitions: usize,
    releases: usize,
    frames_served: usize,
}

impl ReplayCamera {
    /// Camera replaying `frames` once, then ending the stream
    pub fn new(frames: Vec<RasterFrame>) -> Self {
        Self {
            frames,
            warmup: 0,
            looping: false,
            supported: true,
            deny_permission: false,
            state: Mutex::new(ReplayState::default()),
        }
    }

    /// Load every image under `dir` (recursively, sorted by path) as a frame
    pub fn from_dir<P: AsRef<Path>>(
        dir: P,
        max_dim: Option<u32>,
    ) -> Result<Self, ResourceLoadError> {
        let frames = collect_images(dir.as_ref())
            .iter()
            .map(|path| load_frame_blocking(path, max_dim))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(frames = frames.len(), dir = %dir.as_ref().display(), "replay frames loaded");
        Ok(Self::new(frames))
    }

    /// Restart from the first frame instead of ending
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Report "no frame yet" this many times after each acquire
    pub fn with_warmup(mut self, polls: usize) -> Self {
        self.warmup = polls;
        self
    }

    /// Refuse every acquire with `PermissionDenied`
    pub fn deny_permission(mut self) -> Self {
        self.deny_permission = true;
        self
    }

    /// Pretend the platform has no camera API
    pub fn unsupported(mut self) -> Self {
        self.supported = false;
        self
    }

    /// Currently open stream
    pub fn open_stream(&self) -> Option<StreamId> {
        self.state.lock().open
    }

    /// Successful acquires so far
    pub fn acquisitions(&self) -> usize {
        self.state.lock().acquisitions
    }

    /// Streams closed so far (no-op releases are not counted)
    pub fn releases(&self) -> usize {
        self.state.lock().releases
    }

    /// Frames handed out so far
    pub fn frames_served(&self) -> usize {
        self.state.lock().frames_served
    }

    /// Stop the open stream from the outside, as when the device is unplugged
    pub fn end_stream(&self) {
        self.state.lock().ended = true;
    }
}

#[async_trait]
impl Camera for ReplayCamera {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn acquire(&self, constraints: &CameraConstraints) -> Result<StreamId, DeviceError> {
        if self.deny_permission {
            return Err(DeviceError::PermissionDenied);
        }
        let mut state = self.state.lock();
        if state.open.is_some() {
            return Err(DeviceError::Busy);
        }
        state.next_id += 1;
        let stream = StreamId(state.next_id);
        state.open = Some(stream);
        state.cursor = 0;
        state.warmup_left = self.warmup;
        state.ended = false;
        state.acquisitions += 1;
        trace!(%stream, ?constraints, "replay stream opened");
        Ok(stream)
    }

    async fn next_frame(&self, stream: StreamId) -> Result<Option<RasterFrame>, DeviceError> {
        let mut state = self.state.lock();
        if state.open != Some(stream) || state.ended {
            return Err(DeviceError::StreamEnded);
        }
        if state.warmup_left > 0 {
            state.warmup_left -= 1;
            return Ok(None);
        }
        if self.frames.is_empty() {
            return Ok(None);
        }
        if state.cursor >= self.frames.len() {
            if !self.looping {
                return Err(DeviceError::StreamEnded);
            }
            state.cursor = 0;
        }
        let frame = self.frames[state.cursor].clone();
        state.cursor += 1;
        state.frames_served += 1;
        Ok(Some(frame))
    }

    fn release(&self, stream: StreamId) {
        let mut state = self.state.lock();
        if state.open == Some(stream) {
            state.open = None;
            state.releases += 1;
            trace!(%stream, "replay stream closed");
        }
    }
}

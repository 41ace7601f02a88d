//! Rate-bounded frame polling over a camera stream

use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use tokio::time::{self, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::camera::{Camera, StreamId};
use crate::error::DeviceError;
use crate::models::RasterFrame;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Pulls frames from a camera stream at most once per interval
///
/// Polls that find no frame yet (the camera is still warming up) are skipped
/// and retried on the next tick. A stream that ends, or a frame that takes
/// longer than the timeout to arrive, is surfaced as an error. Cancelling the
/// token ends the sequence at the next suspension point.
pub struct FrameSampler {
    camera: Arc<dyn Camera>,
    stream: StreamId,
    ticker: Interval,
    frame_timeout: Duration,
    max_dim: Option<u32>,
    cancel: CancellationToken,
    polls: u64,
    skipped: u64,
}

impl FrameSampler {
    /// Sampler over `stream`, ticking every `interval` (at least 1ms)
    pub fn new(
        camera: Arc<dyn Camera>,
        stream: StreamId,
        interval: Duration,
        frame_timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let mut ticker = time::interval(interval.max(MIN_INTERVAL));
        // A slow decode must not trigger a burst of catch-up polls
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            camera,
            stream,
            ticker,
            frame_timeout,
            max_dim: None,
            cancel,
            polls: 0,
            skipped: 0,
        }
    }

    /// Downscale sampled frames whose longest side exceeds `max_dim`
    pub fn with_max_dim(mut self, max_dim: Option<u32>) -> Self {
        self.max_dim = max_dim;
        self
    }

    /// Camera polls made so far
    pub fn polls(&self) -> u64 {
        self.polls
    }

    /// Polls that returned no frame
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Wait for the next frame
    ///
    /// Returns `None` once cancelled, `Some(Err(..))` when the stream failed.
    pub async fn next_frame(&mut self) -> Option<Result<RasterFrame, DeviceError>> {
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                _ = self.ticker.tick() => {}
            }

            self.polls += 1;
            let polled = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                polled = time::timeout(self.frame_timeout, self.camera.next_frame(self.stream)) => polled,
            };

            match polled {
                Ok(Ok(Some(frame))) => {
                    trace!(stream = %self.stream, poll = self.polls, "frame sampled");
                    let frame = match self.max_dim {
                        Some(max_dim) => frame.downscaled(max_dim),
                        None => frame,
                    };
                    return Some(Ok(frame));
                }
                Ok(Ok(None)) => {
                    self.skipped += 1;
                    trace!(stream = %self.stream, poll = self.polls, "no frame yet, retrying");
                }
                Ok(Err(err)) => return Some(Err(err)),
                Err(_elapsed) => return Some(Err(DeviceError::FrameTimeout(self.frame_timeout))),
            }
        }
    }

    /// Lazy, unbounded sequence of frames ending on cancellation
    pub fn into_stream(self) -> impl Stream<Item = Result<RasterFrame, DeviceError>> + Send {
        futures::stream::unfold(self, |mut sampler| async move {
            let item = sampler.next_frame().await?;
            Some((item, sampler))
        })
    }
}

//! Scan session state machine
//!
//! ```text
//! Idle ──start──▶ Loading ──decoded──▶ Success
//!   ▲                │  └────failed───▶ Error
//!   └──cancel/reset──┴──────────────────────┘
//! ```
//!
//! Every start supersedes the previous attempt: its cancellation token fires,
//! any camera stream it held is released, and whatever it later produces is
//! discarded because its [`AttemptId`] is no longer current.

use std::fmt;
use std::pin::pin;
use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::camera::{Camera, CameraLease};
use crate::config::ScanConfig;
use crate::decoder::DecoderChain;
use crate::error::{ConfigError, DecodeFailure, DeviceError, ScanError, ScanFailure};
use crate::models::{AttemptId, Decoded, RasterFrame, ScanResult, ScanSnapshot, ScanState};
use crate::sampler::FrameSampler;
use crate::source::{FrameSource, ImageInput, load_frame};

/// Orchestrates one interactive scanning session
///
/// Must be used from within a tokio runtime: attempts run as spawned tasks.
/// The presentation layer reads state through [`ScanSession::snapshot`] or
/// [`ScanSession::subscribe`] and drives it with the `start_*`, `cancel`,
/// `reset` and `retry` operations. Dropping the session releases the camera.
pub struct ScanSession {
    shared: Arc<Shared>,
    decoder: Arc<DecoderChain>,
    camera: Arc<dyn Camera>,
    config: ScanConfig,
}

struct Shared {
    state: Mutex<SessionState>,
    updates: watch::Sender<ScanSnapshot>,
    // Held for the duration of each decode so attempts never decode concurrently
    decode_slot: tokio::sync::Mutex<()>,
}

struct SessionState {
    snapshot: ScanSnapshot,
    next_attempt: u64,
    active: Option<ActiveAttempt>,
}

struct ActiveAttempt {
    id: AttemptId,
    cancel: CancellationToken,
    lease: Option<CameraLease>,
}

impl SessionState {
    /// Cancel the running attempt and release its camera stream
    fn stop_active(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.cancel.cancel();
            if let Some(mut lease) = active.lease.take() {
                lease.release();
            }
            trace!(attempt = active.id.0, "attempt stopped");
        }
    }

    fn begin(&mut self) -> (AttemptId, CancellationToken) {
        self.stop_active();
        self.next_attempt += 1;
        let id = AttemptId(self.next_attempt);
        let cancel = CancellationToken::new();
        self.active = Some(ActiveAttempt {
            id,
            cancel: cancel.clone(),
            lease: None,
        });
        self.snapshot.attempt = id;
        (id, cancel)
    }

    fn is_current(&self, id: AttemptId) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.id == id && !active.cancel.is_cancelled())
    }

    fn to_idle(&mut self) {
        self.stop_active();
        self.snapshot.state = ScanState::Idle;
        self.snapshot.source = None;
    }
}

impl Shared {
    fn new() -> Self {
        let snapshot = ScanSnapshot::idle();
        let (updates, _) = watch::channel(snapshot.clone());
        Self {
            state: Mutex::new(SessionState {
                snapshot,
                next_attempt: 0,
                active: None,
            }),
            updates,
            decode_slot: tokio::sync::Mutex::new(()),
        }
    }

    /// Mutate state under the lock and publish the snapshot if it changed
    fn update<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut state = self.state.lock();
        let before = state.snapshot.clone();
        let out = f(&mut state);
        if state.snapshot != before {
            debug!(
                attempt = state.snapshot.attempt.0,
                from = ?before.status(),
                to = ?state.snapshot.status(),
                "scan state changed"
            );
            self.updates.send_replace(state.snapshot.clone());
        }
        out
    }

    /// Apply a terminal outcome if `id` is still the current attempt
    fn finish(&self, id: AttemptId, outcome: Result<ScanResult, ScanError>) -> bool {
        self.update(|state| {
            if !state.is_current(id) {
                debug!(attempt = id.0, "discarding outcome of superseded attempt");
                return false;
            }
            state.stop_active();
            if matches!(state.snapshot.source, Some(FrameSource::LiveCamera(_))) {
                state.snapshot.source = None;
            }
            state.snapshot.state = match outcome {
                Ok(result) => {
                    info!(
                        attempt = id.0,
                        backend = result.decoded.backend,
                        from_camera = result.from_camera,
                        "scan succeeded"
                    );
                    ScanState::Success(result)
                }
                Err(err) => {
                    warn!(attempt = id.0, error = %err, "scan failed");
                    ScanState::Error(ScanFailure::from(&err))
                }
            };
            true
        })
    }

    /// Decode under the session's decode slot, unless cancelled meanwhile
    async fn decode(
        &self,
        decoder: &DecoderChain,
        frame: &RasterFrame,
        cancel: &CancellationToken,
    ) -> Option<Result<Decoded, DecodeFailure>> {
        let _slot = self.decode_slot.lock().await;
        if cancel.is_cancelled() {
            return None;
        }
        Some(decoder.decode_frame(frame))
    }
}

impl ScanSession {
    /// Session using the backends named in `config`
    pub fn new(config: ScanConfig, camera: Arc<dyn Camera>) -> Result<Self, ConfigError> {
        let decoder = config.decoder_chain()?;
        Ok(Self::with_decoder(config, camera, decoder))
    }

    /// Session with an explicit decoder chain (custom backends)
    pub fn with_decoder(config: ScanConfig, camera: Arc<dyn Camera>, decoder: DecoderChain) -> Self {
        Self {
            shared: Arc::new(Shared::new()),
            decoder: Arc::new(decoder),
            camera,
            config,
        }
    }

    /// Current state
    pub fn snapshot(&self) -> ScanSnapshot {
        self.shared.state.lock().snapshot.clone()
    }

    /// Receive every published state change
    pub fn subscribe(&self) -> watch::Receiver<ScanSnapshot> {
        self.shared.updates.subscribe()
    }

    /// Wait until the session is no longer Loading
    ///
    /// A camera scan that never sees a code keeps this pending until it is
    /// cancelled or reset.
    pub async fn settled(&self) -> ScanSnapshot {
        let mut updates = self.subscribe();
        let settled = updates
            .wait_for(|snapshot| snapshot.state.is_terminal() || snapshot.state == ScanState::Idle)
            .await
            .map(|snapshot| snapshot.clone());
        settled.unwrap_or_else(|_| self.snapshot())
    }

    /// Session configuration
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Decoder chain in use
    pub fn decoder(&self) -> &DecoderChain {
        &self.decoder
    }

    /// Decode a still image
    ///
    /// Supersedes any running attempt (releasing the camera), enters Loading
    /// immediately and finishes in Success or Error in the background.
    pub fn start_with_image(&self, input: impl Into<ImageInput>) -> AttemptId {
        let input = input.into();
        let (id, cancel) = self.shared.update(|state| {
            let begun = state.begin();
            state.snapshot.source = Some(FrameSource::StaticImage(input.clone()));
            state.snapshot.state = ScanState::Loading {
                camera_active: false,
            };
            begun
        });
        debug!(attempt = id.0, "image scan started");

        let shared = Arc::clone(&self.shared);
        let decoder = Arc::clone(&self.decoder);
        let max_dim = self.config.max_image_dim;
        tokio::spawn(async move {
            let frame = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                loaded = load_frame(&input, max_dim) => loaded,
            };
            let outcome = match frame {
                Ok(frame) => match shared.decode(&decoder, &frame, &cancel).await {
                    Some(decoded) => decoded.map_err(ScanError::from),
                    None => return,
                },
                Err(err) => Err(ScanError::ResourceLoad(err)),
            };
            shared.finish(
                id,
                outcome.map(|decoded| ScanResult {
                    decoded,
                    from_camera: false,
                }),
            );
        });

        id
    }

    /// Open the camera and scan frames until one decodes
    ///
    /// Supersedes any running attempt first. Returns once the stream is being
    /// sampled (Loading with `camera_active`) or the camera failed to start,
    /// in which case the session goes straight to Error without holding a
    /// stream.
    pub async fn start_with_camera(&self) -> AttemptId {
        let (id, cancel) = self.shared.update(|state| {
            let begun = state.begin();
            state.snapshot.source = None;
            state.snapshot.state = ScanState::Idle;
            begun
        });
        debug!(attempt = id.0, facing = ?self.config.camera.facing_mode, "camera scan starting");

        let acquired = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(attempt = id.0, "camera start superseded");
                return id;
            }
            acquired = CameraLease::acquire(Arc::clone(&self.camera), &self.config.camera) => acquired,
        };
        let lease = match acquired {
            Ok(lease) => lease,
            Err(err) => {
                self.shared.finish(id, Err(ScanError::Device(err)));
                return id;
            }
        };
        let Some(stream) = lease.stream() else {
            self.shared
                .finish(id, Err(ScanError::Device(DeviceError::StreamEnded)));
            return id;
        };

        let attached = self.shared.update(move |state| {
            if !state.is_current(id) {
                // Superseded while acquiring; dropping the lease releases it
                return false;
            }
            if let Some(active) = state.active.as_mut() {
                active.lease = Some(lease);
            }
            state.snapshot.source = Some(FrameSource::LiveCamera(stream));
            state.snapshot.state = ScanState::Loading {
                camera_active: true,
            };
            true
        });
        if !attached {
            return id;
        }

        let sampler = FrameSampler::new(
            Arc::clone(&self.camera),
            stream,
            self.config.scan_interval(),
            self.config.frame_timeout,
            cancel.clone(),
        )
        .with_max_dim(self.config.max_image_dim);
        tokio::spawn(run_camera_scan(
            Arc::clone(&self.shared),
            Arc::clone(&self.decoder),
            sampler,
            id,
            cancel,
        ));

        id
    }

    /// Stop the running attempt, release the camera, return to Idle
    pub fn cancel(&self) {
        self.shared.update(|state| {
            if state.active.is_some() {
                debug!(attempt = state.snapshot.attempt.0, "scan cancelled");
            }
            state.to_idle();
        });
    }

    /// Clear any result or error, release held resources, return to Idle
    pub fn reset(&self) {
        self.shared.update(|state| {
            debug!(attempt = state.snapshot.attempt.0, "session reset");
            state.to_idle();
        });
    }

    /// "Try again": re-scan the selected still image, or reset when there is
    /// none
    pub fn retry(&self) -> Option<AttemptId> {
        match self.snapshot().source {
            Some(FrameSource::StaticImage(input)) => Some(self.start_with_image(input)),
            _ => {
                self.reset();
                None
            }
        }
    }

    /// Tear down: stop any attempt and release the camera without changing
    /// the published state
    pub fn shutdown(&self) {
        self.shared.update(SessionState::stop_active);
    }
}

async fn run_camera_scan(
    shared: Arc<Shared>,
    decoder: Arc<DecoderChain>,
    sampler: FrameSampler,
    id: AttemptId,
    cancel: CancellationToken,
) {
    let mut frames = pin!(sampler.into_stream());
    let mut sampled = 0u64;

    while let Some(item) = frames.next().await {
        let outcome = match item {
            Ok(frame) => {
                sampled += 1;
                match shared.decode(&decoder, &frame, &cancel).await {
                    None => break,
                    Some(Ok(decoded)) => Ok(ScanResult {
                        decoded,
                        from_camera: true,
                    }),
                    Some(Err(DecodeFailure::NotFound)) => {
                        trace!(attempt = id.0, frame = sampled, "no code in frame");
                        continue;
                    }
                    Some(Err(failure)) => Err(ScanError::from(failure)),
                }
            }
            Err(err) => Err(ScanError::Device(err)),
        };
        shared.finish(id, outcome);
        return;
    }

    debug!(attempt = id.0, frames = sampled, "camera scan stopped");
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for ScanSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanSession")
            .field("snapshot", &self.snapshot())
            .field("decoder", &self.decoder)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

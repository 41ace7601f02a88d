//! Live camera scans driven by a replayed feed under paused time

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{blank_frame, inverted, png_bytes, qr_frame, session, session_with};
use parking_lot::Mutex;
use qr_scan::{
    BackendError, DecodeBackend, Decoded, DecoderChain, FailureKind, FrameSource, RasterFrame,
    ReplayCamera, ScanConfig, ScanSession, ScanStatus,
};
use tokio::time;

/// Backend that never finds anything but remembers the frame sizes it saw
#[derive(Clone, Default)]
struct SizeRecorder(Arc<Mutex<Vec<(usize, usize)>>>);

impl DecodeBackend for SizeRecorder {
    fn name(&self) -> &'static str {
        "recorder"
    }

    fn decode(&self, frame: &RasterFrame) -> Result<Option<Decoded>, BackendError> {
        self.0.lock().push((frame.width(), frame.height()));
        Ok(None)
    }
}

fn blank_feed() -> Arc<ReplayCamera> {
    Arc::new(ReplayCamera::new(vec![blank_frame(64)]).looping(true))
}

async fn wait_for_frames(camera: &ReplayCamera, count: usize) {
    while camera.frames_served() < count {
        time::sleep(Duration::from_millis(100)).await;
    }
}

#[tokio::test(start_paused = true)]
async fn cancel_releases_the_stream_and_returns_to_idle() {
    let camera = blank_feed();
    let session = session(camera.clone());

    session.start_with_camera().await;
    let snapshot = session.snapshot();
    assert_eq!(snapshot.status(), ScanStatus::Loading);
    assert!(snapshot.camera_active());
    assert!(matches!(snapshot.source, Some(FrameSource::LiveCamera(_))));
    assert!(camera.open_stream().is_some());

    wait_for_frames(&camera, 5).await;
    session.cancel();

    let snapshot = session.snapshot();
    assert_eq!(snapshot.status(), ScanStatus::Idle);
    assert!(snapshot.result().is_none());
    assert!(snapshot.error().is_none());
    assert!(!snapshot.camera_active());
    assert_eq!(snapshot.source, None);
    assert_eq!(camera.open_stream(), None);
    assert_eq!(camera.releases(), 1);

    // Sampling stops with the attempt
    let served = camera.frames_served();
    time::sleep(Duration::from_secs(5)).await;
    assert_eq!(camera.frames_served(), served);
    assert_eq!(session.snapshot().status(), ScanStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn denied_permission_goes_straight_to_error() {
    let camera = Arc::new(ReplayCamera::new(Vec::new()).deny_permission());
    let session = session(camera.clone());

    session.start_with_camera().await;
    let snapshot = session.snapshot();
    let failure = snapshot.error().expect("error state");
    assert_eq!(failure.kind, FailureKind::Device);
    assert!(
        failure
            .message
            .starts_with("Error starting camera. Please try again or use file upload.")
    );
    assert!(!snapshot.camera_active());
    assert_eq!(camera.acquisitions(), 0);
    assert_eq!(camera.open_stream(), None);
}

#[tokio::test(start_paused = true)]
async fn unsupported_camera_reports_it() {
    let camera = Arc::new(ReplayCamera::new(Vec::new()).unsupported());
    let session = session(camera);

    session.start_with_camera().await;
    assert_eq!(
        session.snapshot().error().map(|f| f.message.as_str()),
        Some("Camera access is not supported on this device.")
    );
}

#[tokio::test(start_paused = true)]
async fn decodes_after_blank_frames_and_releases() {
    let code = qr_frame("https://example.com/camera");
    let blank = blank_frame(code.width());
    let camera = Arc::new(ReplayCamera::new(vec![blank.clone(), blank, code]).with_warmup(2));
    let session = session(camera.clone());

    session.start_with_camera().await;
    let settled = session.settled().await;

    let result = settled.result().expect("success");
    assert_eq!(result.payload(), "https://example.com/camera");
    assert!(result.from_camera);
    assert_eq!(result.message(), "QR code scanned successfully from camera!");
    assert_eq!(settled.source, None);
    assert_eq!(camera.frames_served(), 3);
    assert_eq!(camera.open_stream(), None);
    assert_eq!(camera.releases(), 1);
}

#[tokio::test(start_paused = true)]
async fn ended_stream_is_a_device_error() {
    let camera = Arc::new(ReplayCamera::new(vec![blank_frame(64)]));
    let session = session(camera.clone());

    session.start_with_camera().await;
    let settled = session.settled().await;
    let failure = settled.error().expect("error state");
    assert_eq!(failure.kind, FailureKind::Device);
    assert_eq!(
        failure.message,
        "Camera stream ended unexpectedly. Please try again."
    );
    assert_eq!(camera.open_stream(), None);
}

#[tokio::test(start_paused = true)]
async fn polling_respects_the_scan_rate() {
    let camera = blank_feed();
    let config = ScanConfig {
        max_scans_per_second: 2,
        ..ScanConfig::default()
    };
    let session = session_with(config, camera.clone());

    session.start_with_camera().await;
    time::sleep(Duration::from_millis(10_100)).await;
    let served = camera.frames_served();
    // Ticks at 0.0s, 0.5s, ..., 10.0s
    assert!(served <= 21, "served {served} frames in ~10s");
    assert!(served >= 10, "served only {served} frames in ~10s");
    session.cancel();
}

#[tokio::test(start_paused = true)]
async fn camera_frames_are_downscaled_before_decoding() {
    let camera = Arc::new(ReplayCamera::new(vec![blank_frame(400)]));
    let recorder = SizeRecorder::default();
    let chain = DecoderChain::new(vec![Box::new(recorder.clone())]).expect("one backend");
    let config = ScanConfig {
        max_image_dim: Some(100),
        ..ScanConfig::default()
    };
    let session = ScanSession::with_decoder(config, camera, chain);

    session.start_with_camera().await;
    assert_eq!(session.settled().await.status(), ScanStatus::Error);
    assert_eq!(*recorder.0.lock(), vec![(100, 100)]);
}

#[tokio::test(start_paused = true)]
async fn standard_chain_reads_an_inverted_camera_frame() {
    let camera = Arc::new(ReplayCamera::new(vec![inverted(&qr_frame("dark mode badge"))]));
    let session = session(camera.clone());

    session.start_with_camera().await;
    let settled = session.settled().await;
    let result = settled.result().expect("success");
    assert_eq!(result.payload(), "dark mode badge");
    assert_eq!(result.decoded.backend, "binarized");
    assert!(result.from_camera);
    assert_eq!(camera.open_stream(), None);
}

#[tokio::test(start_paused = true)]
async fn starting_again_replaces_the_stream() {
    let camera = blank_feed();
    let session = session(camera.clone());

    let first = session.start_with_camera().await;
    let second = session.start_with_camera().await;
    assert!(second > first);
    assert_eq!(session.snapshot().status(), ScanStatus::Loading);
    assert_eq!(camera.acquisitions(), 2);
    assert_eq!(camera.releases(), 1);
    assert!(camera.open_stream().is_some());
    session.cancel();
    assert_eq!(camera.releases(), 2);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_session_releases_the_camera() {
    let camera = blank_feed();
    let session = session(camera.clone());
    session.start_with_camera().await;
    wait_for_frames(&camera, 2).await;

    drop(session);
    assert_eq!(camera.open_stream(), None);
    assert_eq!(camera.releases(), 1);

    let served = camera.frames_served();
    time::sleep(Duration::from_secs(3)).await;
    assert_eq!(camera.frames_served(), served);
}

#[tokio::test]
async fn image_upload_supersedes_camera() {
    let camera = blank_feed();
    let session = session(camera.clone());

    session.start_with_camera().await;
    assert!(session.snapshot().camera_active());

    session.start_with_image(png_bytes(&qr_frame("uploaded instead")));
    // Stream is given back before the image is even decoded
    assert_eq!(camera.open_stream(), None);
    assert_eq!(camera.releases(), 1);

    let settled = session.settled().await;
    let result = settled.result().expect("success");
    assert_eq!(result.payload(), "uploaded instead");
    assert!(!result.from_camera);
}

#[tokio::test(start_paused = true)]
async fn retry_after_camera_error_resets() {
    let camera = Arc::new(ReplayCamera::new(vec![blank_frame(64)]));
    let session = session(camera);
    session.start_with_camera().await;
    assert_eq!(session.settled().await.status(), ScanStatus::Error);

    assert_eq!(session.retry(), None);
    assert_eq!(session.snapshot().status(), ScanStatus::Idle);
}

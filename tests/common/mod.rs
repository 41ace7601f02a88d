#![allow(dead_code)]

use std::env;
use std::fs;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use image::{DynamicImage, GrayImage, ImageOutputFormat};
use qr_scan::{
    BackendError, DecodeBackend, Decoded, RasterFrame, ReplayCamera, ScanConfig, ScanSession,
};
use qrcode::{Color, QrCode};

static TEMP_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Render `content` at 8 pixels per module with a 4-module quiet zone
pub fn qr_frame(content: &str) -> RasterFrame {
    let code = QrCode::new(content.as_bytes()).expect("encodable content");
    let modules = code.width();
    let scale = 8;
    let side = (modules + 8) * scale;
    let colors = code.to_colors();

    let mut luma = vec![255u8; side * side];
    for y in 0..side {
        for x in 0..side {
            let (mx, my) = ((x / scale) as isize - 4, (y / scale) as isize - 4);
            if mx < 0 || my < 0 || mx as usize >= modules || my as usize >= modules {
                continue;
            }
            if colors[my as usize * modules + mx as usize] == Color::Dark {
                luma[y * side + x] = 0;
            }
        }
    }
    RasterFrame::from_luma(side, side, luma).expect("valid frame")
}

/// Uniform white frame
pub fn blank_frame(side: usize) -> RasterFrame {
    RasterFrame::from_luma(side, side, vec![255u8; side * side]).expect("valid frame")
}

/// Light modules on a dark background
pub fn inverted(frame: &RasterFrame) -> RasterFrame {
    frame
        .with_luma(frame.luma().iter().map(|v| 255 - v).collect())
        .expect("same dimensions")
}

/// PNG encoding of `frame`
pub fn png_bytes(frame: &RasterFrame) -> Vec<u8> {
    let image = GrayImage::from_raw(
        frame.width() as u32,
        frame.height() as u32,
        frame.luma().to_vec(),
    )
    .expect("buffer matches dimensions");
    let mut bytes = Vec::new();
    DynamicImage::ImageLuma8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
        .expect("encode png");
    bytes
}

/// Fresh scratch directory
pub fn temp_dir() -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before UNIX epoch")
        .as_nanos();
    let sequence = TEMP_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = env::temp_dir().join(format!("qr_scan_it_{nanos}_{sequence}"));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

/// Write `frame` as `name` (PNG) into a fresh scratch directory
pub fn write_png(name: &str, frame: &RasterFrame) -> PathBuf {
    let path = temp_dir().join(name);
    fs::write(&path, png_bytes(frame)).expect("write png");
    path
}

/// Session over `camera` with default settings
pub fn session(camera: Arc<ReplayCamera>) -> ScanSession {
    session_with(ScanConfig::default(), camera)
}

pub fn session_with(config: ScanConfig, camera: Arc<ReplayCamera>) -> ScanSession {
    ScanSession::new(config, camera).expect("valid config")
}

/// Backend returning a fixed answer for every frame
pub enum Scripted {
    Payload(&'static str, &'static str),
    Nothing(&'static str),
    Broken(&'static str),
}

impl DecodeBackend for Scripted {
    fn name(&self) -> &'static str {
        match self {
            Scripted::Payload(name, _) | Scripted::Nothing(name) | Scripted::Broken(name) => *name,
        }
    }

    fn decode(&self, _frame: &RasterFrame) -> Result<Option<Decoded>, BackendError> {
        match self {
            Scripted::Payload(name, content) => Ok(Some(Decoded::new(*content, *name))),
            Scripted::Nothing(_) => Ok(None),
            Scripted::Broken(name) => Err(BackendError::Rejected {
                backend: *name,
                reason: "scripted failure".to_string(),
            }),
        }
    }
}

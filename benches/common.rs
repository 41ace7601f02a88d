#![allow(dead_code)]

use qr_scan::RasterFrame;
use qrcode::{Color, QrCode};

/// Render `content` as a QR code, `scale` pixels per module with a 4-module
/// quiet zone, centered on a white canvas of at least `min_side` pixels
pub fn rendered_qr(content: &str, scale: usize, min_side: usize) -> RasterFrame {
    let code = QrCode::new(content.as_bytes()).expect("encodable content");
    let modules = code.width();
    let colors = code.to_colors();
    let code_side = (modules + 8) * scale;
    let side = code_side.max(min_side);
    let offset = (side - code_side) / 2 + 4 * scale;

    let mut luma = vec![255u8; side * side];
    for (i, color) in colors.iter().enumerate() {
        if *color != Color::Dark {
            continue;
        }
        let (mx, my) = (i % modules, i / modules);
        for y in 0..scale {
            let row = (offset + my * scale + y) * side;
            let start = row + offset + mx * scale;
            luma[start..start + scale].fill(0);
        }
    }
    RasterFrame::from_luma(side, side, luma).expect("valid frame")
}

/// Smooth left-to-right gradient, the worst case for a global threshold
pub fn gradient(width: usize, height: usize) -> Vec<u8> {
    (0..width * height)
        .map(|i| ((i % width) * 255 / width.max(1)) as u8)
        .collect()
}

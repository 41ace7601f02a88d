//! Image sources: still images selected by the user, or a live camera stream

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::camera::StreamId;
use crate::error::ResourceLoadError;
use crate::models::RasterFrame;

/// A still image selected for scanning
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInput {
    /// Image file on disk
    Path(PathBuf),
    /// Encoded image bytes already in memory (an upload)
    Bytes(Arc<[u8]>),
}

impl From<PathBuf> for ImageInput {
    fn from(path: PathBuf) -> Self {
        ImageInput::Path(path)
    }
}

impl From<&Path> for ImageInput {
    fn from(path: &Path) -> Self {
        ImageInput::Path(path.to_path_buf())
    }
}

impl From<Vec<u8>> for ImageInput {
    fn from(bytes: Vec<u8>) -> Self {
        ImageInput::Bytes(bytes.into())
    }
}

/// Where the current session's frames come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameSource {
    /// A single still image
    StaticImage(ImageInput),
    /// A held camera stream
    LiveCamera(StreamId),
}

/// Load and rasterize a still image without blocking the runtime on file I/O
///
/// `max_dim` downscales images whose longest side exceeds it.
pub async fn load_frame(
    input: &ImageInput,
    max_dim: Option<u32>,
) -> Result<RasterFrame, ResourceLoadError> {
    let frame = match input {
        ImageInput::Path(path) => {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|source| ResourceLoadError::Io {
                    path: path.clone(),
                    source,
                })?;
            decode_bytes(&bytes)?
        }
        ImageInput::Bytes(bytes) => decode_bytes(bytes)?,
    };
    Ok(fit(frame, max_dim))
}

/// Blocking variant of [`load_frame`] for batch tools
pub fn load_frame_blocking<P: AsRef<Path>>(
    path: P,
    max_dim: Option<u32>,
) -> Result<RasterFrame, ResourceLoadError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| ResourceLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(fit(decode_bytes(&bytes)?, max_dim))
}

fn decode_bytes(bytes: &[u8]) -> Result<RasterFrame, ResourceLoadError> {
    let image = image::load_from_memory(bytes)?;
    debug!(
        width = image.width(),
        height = image.height(),
        "image loaded"
    );
    Ok(RasterFrame::from_image(&image)?)
}

fn fit(frame: RasterFrame, max_dim: Option<u32>) -> RasterFrame {
    match max_dim {
        Some(max_dim) => frame.downscaled(max_dim),
        None => frame,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn garbage_bytes_are_a_load_error() {
        let input = ImageInput::from(b"definitely not an image".to_vec());
        let err = load_frame(&input, None).await.expect_err("should fail");
        assert!(matches!(err, ResourceLoadError::Decode(_)));
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let input = ImageInput::from(PathBuf::from("/nonexistent/qr_scan/missing.png"));
        let err = load_frame(&input, None).await.expect_err("should fail");
        assert!(matches!(err, ResourceLoadError::Io { .. }));
    }

    #[tokio::test]
    async fn png_bytes_load_and_downscale() {
        let gray = image::GrayImage::from_pixel(64, 32, image::Luma([200]));
        let mut encoded = Vec::new();
        image::DynamicImage::ImageLuma8(gray)
            .write_to(
                &mut std::io::Cursor::new(&mut encoded),
                image::ImageOutputFormat::Png,
            )
            .expect("encode png");

        let frame = load_frame(&ImageInput::from(encoded), Some(16))
            .await
            .expect("load");
        assert_eq!((frame.width(), frame.height()), (16, 8));
        assert_eq!(frame.pixel(3, 3), 200);
    }
}

//! Dataset helpers shared by the CLI and benchmarks

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::debug;

use crate::decoder::DecoderChain;
use crate::error::ScanError;
use crate::models::Decoded;
use crate::source::load_frame_blocking;

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "bmp"];

/// Default dataset root from `QR_DATASET_ROOT`
pub fn dataset_root_from_env() -> PathBuf {
    env::var("QR_DATASET_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("benches/images"))
}

/// Image limit from `QR_BENCH_LIMIT`; unset or `0` means the full dataset
pub fn bench_limit_from_env() -> Option<usize> {
    match env::var("QR_BENCH_LIMIT") {
        Ok(value) => value
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|v| if v == 0 { None } else { Some(v) }),
        Err(_) => None,
    }
}

/// Every image under `root`, recursively, sorted by path
pub fn collect_images(root: &Path) -> Vec<PathBuf> {
    let mut stack = vec![root.to_path_buf()];
    let mut images = Vec::new();

    while let Some(dir) = stack.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            let is_image = path
                .extension()
                .map(|ext| ext.to_string_lossy().to_lowercase())
                .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()));
            if is_image {
                images.push(path);
            }
        }
    }

    images.sort();
    images
}

/// Dataset image paths, optionally truncated
pub fn dataset_iter<P: AsRef<Path>>(root: P, limit: Option<usize>) -> impl Iterator<Item = PathBuf> {
    let mut images = collect_images(root.as_ref());
    if let Some(limit) = limit {
        images.truncate(limit);
    }
    images.into_iter()
}

/// Outcome of decoding one dataset image
#[derive(Debug)]
pub struct BatchEntry {
    /// Image path
    pub path: PathBuf,
    /// Decoded payload or the reason there is none
    pub outcome: Result<Decoded, ScanError>,
}

/// Aggregate reading rate over a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadingRate {
    /// Images attempted
    pub total: usize,
    /// Images that decoded
    pub decoded: usize,
    /// Images that could not be loaded
    pub load_errors: usize,
}

impl ReadingRate {
    /// Summarize a batch
    pub fn from_entries(entries: &[BatchEntry]) -> Self {
        let mut rate = ReadingRate {
            total: entries.len(),
            ..Self::default()
        };
        for entry in entries {
            match &entry.outcome {
                Ok(_) => rate.decoded += 1,
                Err(ScanError::ResourceLoad(_)) => rate.load_errors += 1,
                Err(_) => {}
            }
        }
        rate
    }

    /// Decoded share in percent
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.decoded as f64 / self.total as f64 * 100.0
        }
    }
}

/// Decode every path in parallel through the same chain
///
/// Results keep the input order.
pub fn scan_paths(chain: &DecoderChain, paths: &[PathBuf], max_dim: Option<u32>) -> Vec<BatchEntry> {
    paths
        .par_iter()
        .map(|path| {
            let outcome = load_frame_blocking(path, max_dim)
                .map_err(ScanError::from)
                .and_then(|frame| chain.decode_frame(&frame).map_err(ScanError::from));
            debug!(path = %path.display(), ok = outcome.is_ok(), "batch image scanned");
            BatchEntry {
                path: path.clone(),
                outcome,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static TEMP_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock before UNIX epoch")
            .as_nanos();
        let sequence = TEMP_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = env::temp_dir().join(format!("qr_scan_tools_{nanos}_{sequence}"));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[test]
    fn collect_images_filters_and_sorts() {
        let root = temp_dir();
        fs::create_dir_all(root.join("nested")).expect("nested dir");
        for name in ["b.png", "a.JPG", "notes.txt", "nested/c.bmp"] {
            fs::write(root.join(name), b"x").expect("write file");
        }

        let found: Vec<_> = collect_images(&root)
            .into_iter()
            .map(|p| p.strip_prefix(&root).expect("under root").to_path_buf())
            .collect();
        assert_eq!(
            found,
            vec![
                PathBuf::from("a.JPG"),
                PathBuf::from("b.png"),
                PathBuf::from("nested/c.bmp")
            ]
        );
        assert_eq!(dataset_iter(&root, Some(1)).count(), 1);
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn unreadable_images_count_as_load_errors() {
        let root = temp_dir();
        let path = root.join("broken.png");
        fs::write(&path, b"not a png").expect("write file");

        let entries = scan_paths(&DecoderChain::standard(), &[path], None);
        let rate = ReadingRate::from_entries(&entries);
        assert_eq!(
            rate,
            ReadingRate {
                total: 1,
                decoded: 0,
                load_errors: 1
            }
        );
        assert_eq!(rate.percent(), 0.0);
        let _ = fs::remove_dir_all(root);
    }
}

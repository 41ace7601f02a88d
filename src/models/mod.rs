/// Luma raster frames
pub mod frame;
/// Decoded payloads
pub mod payload;
/// Observable session state
pub mod state;

pub use frame::RasterFrame;
pub use payload::{Decoded, ECLevel};
pub use state::{AttemptId, ScanResult, ScanSnapshot, ScanState, ScanStatus};

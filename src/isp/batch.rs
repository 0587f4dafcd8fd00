//! Batch processing module
//!
//! Drives the per-file read -> resolve -> pipeline -> quantize -> write
//! sequence over a deterministically ordered input list, with cooperative
//! interrupt handling and wall-clock timing.

mod driver;
mod timing;

pub use driver::{BatchDriver, CancelToken, FrameSink, FrameSource, FsSink, FsSource};
pub use timing::{BatchTimings, StepTiming, Timer};

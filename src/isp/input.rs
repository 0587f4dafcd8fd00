//! Input reading module
//!
//! Format-specific decoders behind a single dispatch entry point. Every
//! reader produces a [`DecodedFrame`]: floating-point samples plus whatever
//! metadata the container reports.

mod camera;
mod npy;
mod pfm;
mod png;
mod pnm;
mod rawdump;
pub mod types;

pub use types::{CameraParams, DecodedFrame, ReadHints, SourceKind};

use std::path::Path;

use crate::isp::common::{IspError, Result};

/// Decodes one input file, selecting the reader by extension.
pub fn read_frame(path: &Path, hints: &ReadHints) -> Result<DecodedFrame> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pgm" | "ppm" | "pnm" => pnm::read(path),
        "pfm" => pfm::read(path),
        "png" => png::read(path),
        "npy" | "npz" => npy::read(path),
        "raw" => rawdump::read(path, hints),
        "dng" | "nef" | "cr2" | "arw" | "raf" | "orf" | "rw2" | "pef" | "srw" => {
            camera::read(path)
        }
        other => Err(IspError::Format(format!(
            "{}: unrecognized extension '{other}'",
            path.display()
        ))),
    }
}

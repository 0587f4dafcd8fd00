//! Output writing module
//!
//! Container writers for the quantized result, one per output format
//! family.

mod pfm;
mod png;
mod pnm;
mod tiff;

use std::path::Path;

use crate::isp::common::Result;
use crate::isp::config::types::OutputFormat;
use crate::isp::pipeline::QuantizedFrame;

/// Writes a quantized frame in the requested container.
pub fn write_frame(path: &Path, frame: &QuantizedFrame, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Ppm | OutputFormat::Ppm8 => pnm::write(path, frame),
        OutputFormat::Png | OutputFormat::Png16 => png::write(path, frame),
        OutputFormat::Tiff => tiff::write(path, frame),
        OutputFormat::Pfm => pfm::write(path, frame),
    }
}

//! Headerless binary raw dump reader.
//!
//! Dumps carry no geometry of their own, so the caller must supply one via
//! hints (`--size` on the command line). Samples are little-endian u16, or
//! single bytes when the hinted bit depth is 8 or less.

use std::fs;
use std::path::Path;

use crate::isp::common::{IspError, Result};
use crate::isp::frame::Frame;
use crate::isp::input::types::{DecodedFrame, ReadHints, SourceKind};

pub(super) fn read(path: &Path, hints: &ReadHints) -> Result<DecodedFrame> {
    let (Some(width), Some(height)) = (hints.width, hints.height) else {
        return Err(IspError::Usage(format!(
            "{}: headerless raw input requires --size",
            path.display()
        )));
    };
    let bpp = hints.bpp.unwrap_or(16);

    let bytes = fs::read(path)?;
    let samples = width * height;
    let data: Vec<f32> = if bpp <= 8 {
        if bytes.len() != samples {
            return Err(IspError::Decode(format!(
                "{}: expected {samples} bytes for {width}x{height}x{bpp}bpp, got {}",
                path.display(),
                bytes.len()
            )));
        }
        bytes.iter().map(|&v| v as f32).collect()
    } else {
        if bytes.len() != samples * 2 {
            return Err(IspError::Decode(format!(
                "{}: expected {} bytes for {width}x{height}x{bpp}bpp, got {}",
                path.display(),
                samples * 2,
                bytes.len()
            )));
        }
        bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]) as f32)
            .collect()
    };

    Ok(DecodedFrame {
        frame: Frame::new(width, height, 1, data),
        kind: SourceKind::RawDump,
        bpp: Some(bpp),
        camera: None,
    })
}

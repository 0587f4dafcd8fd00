//! 16-bit uncompressed TIFF writer.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::isp::common::{IspError, Result};
use crate::isp::pipeline::QuantizedFrame;

pub(super) fn write(path: &Path, frame: &QuantizedFrame) -> Result<()> {
    let QuantizedFrame::U16 {
        width,
        height,
        channels,
        data,
    } = frame
    else {
        return Err(IspError::Encode(
            "only 16-bit data can be written as TIFF".into(),
        ));
    };
    debug!("Encoding TIFF image: {width}x{height}x{channels}");

    let mut buffer = Vec::new();
    let mut encoder = tiff::encoder::TiffEncoder::new(std::io::Cursor::new(&mut buffer))
        .map_err(|e| IspError::Encode(e.to_string()))?;
    match channels {
        1 => encoder
            .write_image::<tiff::encoder::colortype::Gray16>(
                *width as u32,
                *height as u32,
                data,
            )
            .map_err(|e| IspError::Encode(e.to_string()))?,
        3 => encoder
            .write_image::<tiff::encoder::colortype::RGB16>(
                *width as u32,
                *height as u32,
                data,
            )
            .map_err(|e| IspError::Encode(e.to_string()))?,
        n => {
            return Err(IspError::Encode(format!(
                "TIFF output supports 1 or 3 channels, got {n}"
            )));
        }
    }
    fs::write(path, &buffer)?;
    Ok(())
}

//! PNG writer built on the image crate.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::{DynamicImage, ImageBuffer, ImageFormat, Luma, Rgb};

use crate::isp::common::{IspError, Result};
use crate::isp::pipeline::QuantizedFrame;

pub(super) fn write(path: &Path, frame: &QuantizedFrame) -> Result<()> {
    let (width, height, channels) = frame.dimensions();
    let (w, h) = (width as u32, height as u32);

    let img = match frame {
        QuantizedFrame::U8 { data, .. } => match channels {
            1 => ImageBuffer::<Luma<u8>, _>::from_raw(w, h, data.clone())
                .map(DynamicImage::ImageLuma8),
            3 => ImageBuffer::<Rgb<u8>, _>::from_raw(w, h, data.clone())
                .map(DynamicImage::ImageRgb8),
            _ => None,
        },
        QuantizedFrame::U16 { data, .. } => match channels {
            1 => ImageBuffer::<Luma<u16>, _>::from_raw(w, h, data.clone())
                .map(DynamicImage::ImageLuma16),
            3 => ImageBuffer::<Rgb<u16>, _>::from_raw(w, h, data.clone())
                .map(DynamicImage::ImageRgb16),
            _ => None,
        },
        QuantizedFrame::F32(_) => {
            return Err(IspError::Encode(
                "float data cannot be written as PNG".into(),
            ));
        }
    }
    .ok_or_else(|| IspError::Encode(format!("invalid PNG buffer shape {width}x{height}x{channels}")))?;

    let mut out = BufWriter::new(File::create(path)?);
    img.write_to(&mut out, ImageFormat::Png)
        .map_err(|e| IspError::Encode(format!("{}: {e}", path.display())))?;
    Ok(())
}

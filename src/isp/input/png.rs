//! PNG reader built on the image crate.

use std::path::Path;

use crate::isp::common::{IspError, Result};
use crate::isp::frame::Frame;
use crate::isp::input::types::{DecodedFrame, SourceKind};

pub(super) fn read(path: &Path) -> Result<DecodedFrame> {
    let img = image::open(path)
        .map_err(|e| IspError::Decode(format!("{}: {e}", path.display())))?;

    use image::DynamicImage;
    let (frame, bpp) = match img {
        DynamicImage::ImageLuma8(buf) => {
            let (w, h) = buf.dimensions();
            let data = buf.into_raw().iter().map(|&v| v as f32).collect();
            (Frame::new(w as usize, h as usize, 1, data), 8)
        }
        DynamicImage::ImageLuma16(buf) => {
            let (w, h) = buf.dimensions();
            let data = buf.into_raw().iter().map(|&v| v as f32).collect();
            (Frame::new(w as usize, h as usize, 1, data), 16)
        }
        DynamicImage::ImageRgb8(buf) => {
            let (w, h) = buf.dimensions();
            let data = buf.into_raw().iter().map(|&v| v as f32).collect();
            (Frame::new(w as usize, h as usize, 3, data), 8)
        }
        DynamicImage::ImageRgb16(buf) => {
            let (w, h) = buf.dimensions();
            let data = buf.into_raw().iter().map(|&v| v as f32).collect();
            (Frame::new(w as usize, h as usize, 3, data), 16)
        }
        // Alpha and exotic layouts collapse to RGB16.
        other => {
            let buf = other.to_rgb16();
            let (w, h) = buf.dimensions();
            let data = buf.into_raw().iter().map(|&v| v as f32).collect();
            (Frame::new(w as usize, h as usize, 3, data), 16)
        }
    };

    Ok(DecodedFrame {
        frame,
        kind: SourceKind::Png,
        bpp: Some(bpp),
        camera: None,
    })
}

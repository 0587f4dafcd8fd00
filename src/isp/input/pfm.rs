//! PFM float-map reader.
//!
//! "PF" is three-channel, "Pf" single-channel. The scale field's sign gives
//! the byte order (negative = little endian) and rows are stored bottom-up.

use std::fs;
use std::path::Path;

use crate::isp::common::{IspError, Result};
use crate::isp::frame::Frame;
use crate::isp::input::types::{DecodedFrame, SourceKind};

pub(super) fn read(path: &Path) -> Result<DecodedFrame> {
    let bytes = fs::read(path)?;
    let frame =
        parse(&bytes).map_err(|e| IspError::Decode(format!("{}: {e}", path.display())))?;
    Ok(DecodedFrame {
        frame,
        kind: SourceKind::Pfm,
        bpp: None,
        camera: None,
    })
}

fn parse(bytes: &[u8]) -> std::result::Result<Frame, String> {
    let channels = match bytes.get(..2) {
        Some(b"PF") => 3,
        Some(b"Pf") => 1,
        _ => return Err("not a PFM file".into()),
    };
    let mut pos = 2;
    let width = next_token(bytes, &mut pos)?
        .parse::<usize>()
        .map_err(|_| "invalid width".to_string())?;
    let height = next_token(bytes, &mut pos)?
        .parse::<usize>()
        .map_err(|_| "invalid height".to_string())?;
    let scale = next_token(bytes, &mut pos)?
        .parse::<f32>()
        .map_err(|_| "invalid scale".to_string())?;
    if scale == 0.0 {
        return Err("scale must be non-zero".into());
    }
    let little_endian = scale < 0.0;
    pos += 1; // single whitespace after the scale line

    let samples = width * height * channels;
    let raster = &bytes[pos.min(bytes.len())..];
    if raster.len() < samples * 4 {
        return Err(format!("truncated: {} of {} bytes", raster.len(), samples * 4));
    }

    let mut data = vec![0.0f32; samples];
    let row_len = width * channels;
    for row in 0..height {
        // Bottom row first in the file.
        let dst_row = height - 1 - row;
        for i in 0..row_len {
            let off = (row * row_len + i) * 4;
            let quad = [raster[off], raster[off + 1], raster[off + 2], raster[off + 3]];
            let v = if little_endian {
                f32::from_le_bytes(quad)
            } else {
                f32::from_be_bytes(quad)
            };
            data[dst_row * row_len + i] = v;
        }
    }
    Ok(Frame::new(width, height, channels, data))
}

fn next_token<'a>(bytes: &'a [u8], pos: &mut usize) -> std::result::Result<&'a str, String> {
    while *pos < bytes.len() && bytes[*pos].is_ascii_whitespace() {
        *pos += 1;
    }
    let start = *pos;
    while *pos < bytes.len() && !bytes[*pos].is_ascii_whitespace() {
        *pos += 1;
    }
    if start == *pos {
        return Err("truncated header".into());
    }
    std::str::from_utf8(&bytes[start..*pos]).map_err(|_| "invalid header".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_little_endian_color_bottom_up() {
        let mut bytes = b"PF\n2 2\n-1.0".to_vec();
        bytes.push(b'\n');
        // File rows bottom-up: first stored row is the image's bottom row.
        let bottom = [0.1f32, 0.2, 0.3, 0.4, 0.5, 0.6];
        let top = [0.7f32, 0.8, 0.9, 1.0, 1.1, 1.2];
        for v in bottom.iter().chain(top.iter()) {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let frame = parse(&bytes).unwrap();
        assert_eq!((frame.width, frame.height, frame.channels), (2, 2, 3));
        assert_eq!(frame.get(0, 0, 0), 0.7);
        assert_eq!(frame.get(0, 1, 0), 0.1);
        assert_eq!(frame.get(1, 1, 2), 0.6);
    }

    #[test]
    fn parses_big_endian_gray() {
        let mut bytes = b"Pf\n1 1\n1.0\n".to_vec();
        bytes.extend_from_slice(&2.5f32.to_be_bytes());
        let frame = parse(&bytes).unwrap();
        assert_eq!(frame.channels, 1);
        assert_eq!(frame.get(0, 0, 0), 2.5);
    }
}

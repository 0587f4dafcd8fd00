//! Binary PGM (P5) and PPM (P6) reader.
//!
//! Samples above maxval 255 are two bytes, most significant first, per the
//! PNM specification. The container-reported bit depth is the number of bits
//! needed to represent maxval.

use std::fs;
use std::path::Path;

use crate::isp::common::{IspError, Result};
use crate::isp::frame::Frame;
use crate::isp::input::types::{DecodedFrame, SourceKind};

pub(super) fn read(path: &Path) -> Result<DecodedFrame> {
    let bytes = fs::read(path)?;
    let (frame, maxval) =
        parse(&bytes).map_err(|e| IspError::Decode(format!("{}: {e}", path.display())))?;
    let bpp = 32 - maxval.leading_zeros();
    Ok(DecodedFrame {
        frame,
        kind: SourceKind::Pnm,
        bpp: Some(bpp),
        camera: None,
    })
}

fn parse(bytes: &[u8]) -> std::result::Result<(Frame, u32), String> {
    let mut cursor = HeaderCursor { bytes, pos: 0 };
    let channels = match cursor.magic()? {
        b'5' => 1,
        b'6' => 3,
        other => return Err(format!("unsupported PNM magic 'P{}'", other as char)),
    };
    let width = cursor.next_number()? as usize;
    let height = cursor.next_number()? as usize;
    let maxval = cursor.next_number()?;
    if maxval == 0 || maxval > 65535 {
        return Err(format!("invalid maxval {maxval}"));
    }
    cursor.skip_single_whitespace()?;

    let samples = width * height * channels;
    let data = &bytes[cursor.pos..];
    let values: Vec<f32> = if maxval < 256 {
        if data.len() < samples {
            return Err(format!("truncated: {} of {samples} samples", data.len()));
        }
        data[..samples].iter().map(|&v| v as f32).collect()
    } else {
        if data.len() < samples * 2 {
            return Err(format!("truncated: {} of {} bytes", data.len(), samples * 2));
        }
        data[..samples * 2]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]) as f32)
            .collect()
    };
    Ok((Frame::new(width, height, channels, values), maxval))
}

struct HeaderCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl HeaderCursor<'_> {
    fn magic(&mut self) -> std::result::Result<u8, String> {
        if self.bytes.len() < 2 || self.bytes[0] != b'P' {
            return Err("not a PNM file".into());
        }
        self.pos = 2;
        Ok(self.bytes[1])
    }

    /// Reads the next decimal header field, skipping whitespace and
    /// '#'-comments.
    fn next_number(&mut self) -> std::result::Result<u32, String> {
        loop {
            match self.bytes.get(self.pos) {
                Some(b) if b.is_ascii_whitespace() => self.pos += 1,
                Some(b'#') => {
                    while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                }
                Some(b) if b.is_ascii_digit() => break,
                Some(b) => return Err(format!("unexpected header byte 0x{b:02x}")),
                None => return Err("truncated header".into()),
            }
        }
        let mut value: u64 = 0;
        while let Some(b) = self.bytes.get(self.pos) {
            if !b.is_ascii_digit() {
                break;
            }
            value = value * 10 + (b - b'0') as u64;
            if value > u32::MAX as u64 {
                return Err("header field out of range".into());
            }
            self.pos += 1;
        }
        Ok(value as u32)
    }

    /// Exactly one whitespace byte separates the header from the raster.
    fn skip_single_whitespace(&mut self) -> std::result::Result<(), String> {
        match self.bytes.get(self.pos) {
            Some(b) if b.is_ascii_whitespace() => {
                self.pos += 1;
                Ok(())
            }
            _ => Err("missing raster separator".into()),
        }
    }
}

//! Binary PGM/PPM writer. 16-bit samples are written most significant byte
//! first, per the PNM specification.

use std::fs;
use std::path::Path;

use crate::isp::common::{IspError, Result};
use crate::isp::pipeline::QuantizedFrame;

pub(super) fn write(path: &Path, frame: &QuantizedFrame) -> Result<()> {
    let (width, height, channels) = frame.dimensions();
    let magic = match channels {
        1 => "P5",
        3 => "P6",
        n => {
            return Err(IspError::Encode(format!(
                "PNM supports 1 or 3 channels, got {n}"
            )));
        }
    };

    let mut out = Vec::new();
    match frame {
        QuantizedFrame::U8 { data, .. } => {
            out.extend_from_slice(format!("{magic}\n{width} {height}\n255\n").as_bytes());
            out.extend_from_slice(data);
        }
        QuantizedFrame::U16 { data, .. } => {
            out.extend_from_slice(format!("{magic}\n{width} {height}\n65535\n").as_bytes());
            for v in data {
                out.extend_from_slice(&v.to_be_bytes());
            }
        }
        QuantizedFrame::F32(_) => {
            return Err(IspError::Encode(
                "float data cannot be written as PNM".into(),
            ));
        }
    }
    fs::write(path, out)?;
    Ok(())
}

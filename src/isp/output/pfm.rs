//! PFM float-map writer: little-endian (scale -1.0), rows bottom-up.

use std::fs;
use std::path::Path;

use crate::isp::common::{IspError, Result};
use crate::isp::pipeline::QuantizedFrame;

pub(super) fn write(path: &Path, frame: &QuantizedFrame) -> Result<()> {
    let QuantizedFrame::F32(img) = frame else {
        return Err(IspError::Encode(
            "only float data can be written as PFM".into(),
        ));
    };
    let magic = match img.channels {
        1 => "Pf",
        3 => "PF",
        n => {
            return Err(IspError::Encode(format!(
                "PFM supports 1 or 3 channels, got {n}"
            )));
        }
    };

    let mut out = Vec::new();
    out.extend_from_slice(format!("{magic}\n{} {}\n-1.0\n", img.width, img.height).as_bytes());
    let row_len = img.width * img.channels;
    for row in (0..img.height).rev() {
        for i in 0..row_len {
            out.extend_from_slice(&img.data[row * row_len + i].to_le_bytes());
        }
    }
    fs::write(path, out)?;
    Ok(())
}

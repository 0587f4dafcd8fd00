//! Side-file loaders
//!
//! CSV files carry white-balance pairs, 3x3 color matrices and gamma lookup
//! curves. CSV values that are all integral are auto-detected as fixed-point
//! and divided by 1024. Lens-shading tables are image containers: integer
//! containers hold fixed-point gains (1024 = unity), PFM gains are taken
//! as-is.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::isp::common::{IspError, Result};
use crate::isp::config::types::LensShadingTable;
use crate::isp::input::{self, ReadHints, SourceKind};

/// Unity gain in fixed-point side files.
const FIXED_POINT_ONE: f32 = 1024.0;

/// Loads a white-balance (rGain, bGain) pair.
pub fn load_wb_csv(path: &Path) -> Result<(f32, f32)> {
    let values = read_csv_values(path)?;
    if values.len() != 2 {
        return Err(IspError::Config(format!(
            "{}: white balance file must hold exactly 2 values, got {}",
            path.display(),
            values.len()
        )));
    }
    Ok((values[0], values[1]))
}

/// Loads a 3x3 color correction matrix, row-major.
pub fn load_ccm_csv(path: &Path) -> Result<[[f32; 3]; 3]> {
    let values = read_csv_values(path)?;
    if values.len() != 9 {
        return Err(IspError::Config(format!(
            "{}: color matrix file must hold exactly 9 values, got {}",
            path.display(),
            values.len()
        )));
    }
    let mut ccm = [[0.0f32; 3]; 3];
    for (i, v) in values.iter().enumerate() {
        ccm[i / 3][i % 3] = *v;
    }
    Ok(ccm)
}

/// Loads a gamma lookup curve: a column of output samples spanning input
/// [0, 1] uniformly.
pub fn load_gamma_csv(path: &Path) -> Result<Vec<f32>> {
    let values = read_csv_values(path)?;
    if values.len() < 2 {
        return Err(IspError::Config(format!(
            "{}: gamma curve needs at least 2 samples, got {}",
            path.display(),
            values.len()
        )));
    }
    if values.iter().any(|v| !(0.0..=1.0).contains(v)) {
        return Err(IspError::Config(format!(
            "{}: gamma curve samples must lie in [0, 1]",
            path.display()
        )));
    }
    Ok(values)
}

/// Loads a lens-shading table from an image container. A single-plane image
/// becomes a raw-domain table, a three-plane image an RGB-domain table.
pub fn load_shading_table(path: &Path) -> Result<LensShadingTable> {
    if !path.exists() {
        return Err(IspError::ResourceNotFound(path.to_path_buf()));
    }
    let decoded = input::read_frame(path, &ReadHints::default())?;
    let mut frame = decoded.frame;
    match decoded.kind {
        SourceKind::Pfm => {}
        SourceKind::Pnm | SourceKind::Png => {
            for v in &mut frame.data {
                *v /= FIXED_POINT_ONE;
            }
        }
        other => {
            return Err(IspError::Config(format!(
                "{}: lens-shading table must be a PGM, PPM, PNG or PFM image, got {other:?}",
                path.display()
            )));
        }
    }
    debug!(
        "Loaded lens-shading table {}x{}x{} from {}",
        frame.width,
        frame.height,
        frame.channels,
        path.display()
    );
    LensShadingTable::from_frame(frame)
}

fn read_csv_values(path: &Path) -> Result<Vec<f32>> {
    if !path.exists() {
        return Err(IspError::ResourceNotFound(path.to_path_buf()));
    }
    let text = fs::read_to_string(path)?;
    let mut values = Vec::new();
    for token in text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
    {
        let v = token.parse::<f32>().map_err(|_| {
            IspError::Config(format!("{}: invalid number '{token}'", path.display()))
        })?;
        values.push(v);
    }
    undo_fixed_point(&mut values);
    Ok(values)
}

/// All-integral CSV content is fixed-point by 1024.
fn undo_fixed_point(values: &mut [f32]) {
    if !values.is_empty() && values.iter().all(|v| v.fract() == 0.0) {
        for v in values.iter_mut() {
            *v /= FIXED_POINT_ONE;
        }
    }
}

//! Camera-native raw reader built on the rawloader library.
//!
//! This module decodes camera raw containers (DNG, NEF, CR2, ARW and the
//! other formats rawloader understands) and derives the ISP parameters that
//! travel embedded in them: the Bayer arrangement, the as-shot white-balance
//! gains, the color correction matrix and the sensor black level.

use std::path::Path;

use tracing::{debug, warn};

use crate::isp::common::{IspError, Result};
use crate::isp::config::types::BayerPattern;
use crate::isp::frame::Frame;
use crate::isp::input::types::{CameraParams, DecodedFrame, SourceKind};

/// Scale of fixed-point camera white-balance vectors.
const WB_FIXED_POINT: f32 = 1024.0;

/// Nominal bit depth assigned to camera-native containers. Linearization
/// rescales into [blackLevel, whiteLevel] anyway, so the sensor's native
/// depth is irrelevant to correctness.
const CAMERA_BPP: u32 = 16;

/// Reads and decodes a camera raw file.
///
/// The returned samples cover the **entire** sensor image including any
/// non-image border rows and columns; cropping to the visible image area is
/// explicitly out of scope for this reader (a known limitation, not
/// corrected here).
///
/// Integer sensor data is used as-is; float data (normalized 0.0-1.0) is
/// scaled to the 16-bit range.
pub(super) fn read(path: &Path) -> Result<DecodedFrame> {
    debug!("Decoding camera raw {}", path.display());

    let decoded = rawloader::decode_file(path)
        .map_err(|e| IspError::Decode(format!("{}: {e}", path.display())))?;

    let width = decoded.width;
    let height = decoded.height;
    let channels = decoded.cpp;
    debug!("Decoded sensor image: {width}x{height}, {channels} components per pixel");

    if channels != 1 && channels != 3 {
        return Err(IspError::Decode(format!(
            "{}: unsupported component count {channels}",
            path.display()
        )));
    }

    let data: Vec<f32> = match &decoded.data {
        rawloader::RawImageData::Integer(values) => values.iter().map(|&v| v as f32).collect(),
        rawloader::RawImageData::Float(values) => {
            values.iter().map(|&v| v * u16::MAX as f32).collect()
        }
    };
    if data.len() != width * height * channels {
        return Err(IspError::Decode(format!(
            "{}: sample count {} does not match {width}x{height}x{channels}",
            path.display(),
            data.len()
        )));
    }

    // Pre-demultiplexed sensors carry no meaningful CFA descriptor; the
    // pattern is only derived for single-channel data.
    let bayer = if channels == 1 {
        let indices = [
            decoded.cfa.color_at(0, 0),
            decoded.cfa.color_at(0, 1),
            decoded.cfa.color_at(1, 0),
            decoded.cfa.color_at(1, 1),
        ];
        pattern_from_indices(indices)?
    } else {
        BayerPattern::Rggb
    };

    let wb_gains = white_balance_gains(decoded.wb_coeffs);
    // rawloader exposes only the RGB-to-XYZ style matrix; the DNG 3x4 color
    // matrix slot stays zero and the fallback path below selects the
    // transpose.
    let ccm = color_matrix(&[[0.0; 4]; 3], &decoded.xyz_to_cam)?;
    let black_level = average_black_level(&decoded.blacklevels);

    Ok(DecodedFrame {
        frame: Frame::new(width, height, channels, data),
        kind: SourceKind::Camera,
        bpp: Some(CAMERA_BPP),
        camera: Some(CameraParams {
            bayer,
            wb_gains,
            ccm,
            black_level,
        }),
    })
}

/// Maps the channel index of each 2x2 tile position through the color
/// description table RGBG (0 = R, 1 = G, 2 = B, 3 = second green) into a
/// 4-letter pattern code, e.g. indices `[0, 1, 3, 2]` name RGGB.
fn pattern_from_indices(indices: [usize; 4]) -> Result<BayerPattern> {
    let mut code = String::with_capacity(4);
    for index in indices {
        code.push(match index {
            0 => 'R',
            1 | 3 => 'G',
            2 => 'B',
            other => {
                return Err(IspError::Config(format!(
                    "unsupported CFA color index {other}"
                )));
            }
        });
    }
    code.parse::<BayerPattern>()
        .map_err(|_| IspError::Config(format!("unsupported CFA arrangement {code}")))
}

/// Red and blue components of the camera white-balance vector; both green
/// components are dropped. Vectors with any component at or above 1024 are
/// fixed-point and the whole vector is rescaled.
fn white_balance_gains(coeffs: [f32; 4]) -> (f32, f32) {
    let mut c = coeffs;
    if c.iter().any(|&v| v >= WB_FIXED_POINT) {
        for v in &mut c {
            *v /= WB_FIXED_POINT;
        }
    }
    if !c[0].is_finite() || !c[2].is_finite() {
        warn!("camera white balance is undefined, using unity gains");
        return (1.0, 1.0);
    }
    (c[0], c[2])
}

/// Selects the color correction matrix from the two camera profile sources.
///
/// The 3x4 color matrix (with its expected all-zero fourth column dropped)
/// is preferred when non-zero; otherwise the transpose of the 4x3 RGB-to-XYZ
/// matrix's top three rows is used. Exactly one of the two is expected to be
/// all-zero for a given profile; both zero means the image cannot be
/// color-corrected.
fn color_matrix(
    color_matrix_3x4: &[[f32; 4]; 3],
    rgb_xyz_4x3: &[[f32; 3]; 4],
) -> Result<[[f32; 3]; 3]> {
    let primary_nonzero = color_matrix_3x4
        .iter()
        .flatten()
        .any(|&v| v != 0.0);
    if primary_nonzero {
        let mut ccm = [[0.0f32; 3]; 3];
        for r in 0..3 {
            for c in 0..3 {
                ccm[r][c] = color_matrix_3x4[r][c];
            }
        }
        return Ok(ccm);
    }

    let fallback_nonzero = rgb_xyz_4x3[..3].iter().flatten().any(|&v| v != 0.0);
    if fallback_nonzero {
        let mut ccm = [[0.0f32; 3]; 3];
        for r in 0..3 {
            for c in 0..3 {
                ccm[r][c] = rgb_xyz_4x3[c][r];
            }
        }
        return Ok(ccm);
    }

    Err(IspError::Config(
        "camera profile holds no usable color matrix; the image cannot be color-corrected".into(),
    ))
}

/// Per-channel black levels are averaged; sensors with non-uniform channel
/// blacks draw an advisory and the average is used regardless.
fn average_black_level(levels: &[u16; 4]) -> f32 {
    if levels.iter().any(|&v| v != levels[0]) {
        warn!("per-channel black levels {levels:?} are not uniform, using their average");
    }
    levels.iter().map(|&v| v as f32).sum::<f32>() / levels.len() as f32
}

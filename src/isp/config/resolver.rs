//! Per-file configuration resolution.
//!
//! Reconciles CLI overrides, container-reported metadata and camera-embedded
//! parameters into one concrete [`FrameConfig`]. Precedence: explicit CLI
//! value over auto-detected value over hard default. The base configuration
//! is never mutated; every file gets a fresh record.

use tracing::{debug, warn};

use crate::isp::common::{IspError, Result};
use crate::isp::config::types::{
    BayerPattern, FrameConfig, IspConfig, LevelSpec, max_value_for_bpp,
};
use crate::isp::input::{DecodedFrame, SourceKind};

const SUPPORTED_BPP: [u32; 5] = [8, 10, 12, 14, 16];

/// Outliers disregarded by the auto level estimators. A straight min/max
/// would always land on a dead or stuck pixel.
const AUTO_LEVEL_OUTLIERS: usize = 100;

/// Fraction of the code range above which an estimated black level draws an
/// advisory.
const HIGH_BLACK_LEVEL_FRACTION: f32 = 0.125;

/// Tolerance for the color-matrix row-sum advisory.
const CCM_ROW_SUM_TOLERANCE: f32 = 0.01;

pub fn resolve(base: &IspConfig, decoded: &DecodedFrame) -> Result<FrameConfig> {
    let frame = &decoded.frame;

    if frame.channels != 1 && frame.channels != 3 {
        return Err(IspError::Config(format!(
            "decoded buffer has {} channels, expected 1 or 3",
            frame.channels
        )));
    }

    // Geometry. Camera-native and serialized-array containers dictate their
    // own pixel geometry; elsewhere an explicit CLI size must agree with the
    // decoded buffer.
    let (width, height) = match decoded.kind {
        SourceKind::Camera | SourceKind::Npy => (frame.width, frame.height),
        _ => {
            let width = base.width.unwrap_or(frame.width);
            let height = base.height.unwrap_or(frame.height);
            if width != frame.width || height != frame.height {
                return Err(IspError::Config(format!(
                    "requested size {width}x{height} does not match decoded {}x{}",
                    frame.width, frame.height
                )));
            }
            (width, height)
        }
    };

    // Bit depth. Camera-native containers are fixed at 16 regardless of
    // sensor native depth (linearization rescales by [black, white] anyway);
    // serialized arrays bypass introspection entirely. Float containers
    // default to 16 when the CLI is silent.
    let bpp = match decoded.kind {
        SourceKind::Camera | SourceKind::Npy => 16,
        SourceKind::Pfm => base.bpp.unwrap_or(16),
        _ => base.bpp.or(decoded.bpp).unwrap_or(16),
    };
    if !SUPPORTED_BPP.contains(&bpp) {
        return Err(IspError::Config(format!(
            "unsupported bit depth {bpp} (expected one of {SUPPORTED_BPP:?})"
        )));
    }
    let max_value = max_value_for_bpp(bpp);

    let bayer = base
        .bayer
        .or(decoded.camera.as_ref().map(|c| c.bayer))
        .unwrap_or(BayerPattern::Rggb);

    // Not a config knob: single-channel sources get demosaiced, RGB sources
    // do not.
    let demosaic = frame.channels == 1;

    let camera_black = decoded.camera.as_ref().map(|c| c.black_level);
    let black_level = match base.black_level {
        Some(LevelSpec::Explicit(v)) => v,
        Some(LevelSpec::Max) => max_value,
        Some(LevelSpec::Auto) => {
            let estimate = auto_black_level(&frame.data, AUTO_LEVEL_OUTLIERS);
            if estimate > max_value * HIGH_BLACK_LEVEL_FRACTION {
                warn!(
                    "estimated black level {estimate:.1} is unusually high \
                     ({:.0}% of the {max_value:.0} code range)",
                    estimate / max_value * 100.0
                );
            }
            estimate
        }
        None => camera_black.unwrap_or(0.0),
    };
    let white_level = match base.white_level {
        Some(LevelSpec::Explicit(v)) => v,
        Some(LevelSpec::Auto) => auto_white_level(&frame.data, AUTO_LEVEL_OUTLIERS),
        Some(LevelSpec::Max) | None => max_value,
    };

    if !(0.0..=max_value).contains(&black_level) || !(0.0..=max_value).contains(&white_level) {
        return Err(IspError::Config(format!(
            "levels [{black_level}, {white_level}] fall outside [0, {max_value}]"
        )));
    }
    if black_level >= white_level {
        return Err(IspError::Config(format!(
            "black level {black_level} must be below white level {white_level}"
        )));
    }

    let wb_gains = base
        .wb_gains
        .or(decoded.camera.as_ref().map(|c| c.wb_gains));
    let ccm = base.ccm.or(decoded.camera.as_ref().map(|c| c.ccm));
    if let Some(ccm) = &ccm {
        check_row_sums(ccm);
    }

    if base.denoise < 0.0 {
        return Err(IspError::Usage(format!(
            "denoise strength must be non-negative, got {}",
            base.denoise
        )));
    }

    let config = FrameConfig {
        width,
        height,
        bpp,
        max_value,
        black_level,
        white_level,
        bayer,
        demosaic,
        downsample: base.downsample,
        lsc: base.lsc.clone(),
        wb_gains,
        ccm,
        tonemap: base.tonemap,
        denoise: base.denoise,
        gamma: base.gamma.clone(),
        out_format: base.out_format,
        debug: base.debug,
    };
    debug!(
        "Resolved config: {}x{} {}bpp [{:.1}, {:.1}] {} demosaic={}",
        config.width,
        config.height,
        config.bpp,
        config.black_level,
        config.white_level,
        config.bayer,
        config.demosaic
    );
    Ok(config)
}

/// Row sums far from 1.0 usually mean a mis-scaled matrix; advisory only,
/// processing continues with the matrix as given.
fn check_row_sums(ccm: &[[f32; 3]; 3]) {
    for (i, row) in ccm.iter().enumerate() {
        let sum: f32 = row.iter().sum();
        if (sum - 1.0).abs() > CCM_ROW_SUM_TOLERANCE {
            warn!("color matrix row {i} sums to {sum:.3}, expected ~1.0");
        }
    }
}

/// Practical lower bound of the given samples, disregarding up to
/// `max_outliers` dead pixels.
pub fn auto_black_level(samples: &[f32], max_outliers: usize) -> f32 {
    let pct = max_outliers as f64 / samples.len().max(1) as f64 * 100.0;
    percentile(samples, pct)
}

/// Practical upper bound of the given samples, disregarding up to
/// `max_outliers` stuck pixels.
pub fn auto_white_level(samples: &[f32], max_outliers: usize) -> f32 {
    let pct = (1.0 - max_outliers as f64 / samples.len().max(1) as f64) * 100.0;
    percentile(samples, pct)
}

/// Linear-interpolated percentile over a sorted copy of the samples.
fn percentile(samples: &[f32], pct: f64) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = pct.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = (rank - lo as f64) as f32;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

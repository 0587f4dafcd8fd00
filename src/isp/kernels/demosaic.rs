//! Bayer demosaic kernels.
//!
//! Two variants: full-resolution bilinear interpolation and a half-resolution
//! variant that collapses each 2x2 tile into one RGB pixel.

use crate::isp::config::types::{BayerPattern, CfaColor};
use crate::isp::frame::Frame;

/// Full-resolution bilinear demosaic. A cell's own color is taken as-is;
/// each missing color is the mean of the matching samples in the 3x3
/// neighborhood, with coordinates clamped at the borders.
pub fn bilinear(frame: &Frame, pattern: BayerPattern) -> Frame {
    debug_assert_eq!(frame.channels, 1);
    let (w, h) = (frame.width, frame.height);
    let mut out = Frame::filled(w, h, 3, 0.0);
    for y in 0..h {
        for x in 0..w {
            for (c, color) in [CfaColor::R, CfaColor::G, CfaColor::B]
                .into_iter()
                .enumerate()
            {
                let v = if pattern.color_at(x, y) == color {
                    frame.get(x, y, 0)
                } else {
                    neighborhood_mean(frame, pattern, x, y, color)
                };
                out.set(x, y, c, v);
            }
        }
    }
    out
}

fn neighborhood_mean(
    frame: &Frame,
    pattern: BayerPattern,
    x: usize,
    y: usize,
    color: CfaColor,
) -> f32 {
    let mut sum = 0.0f32;
    let mut count = 0u32;
    for dy in -1i32..=1 {
        for dx in -1i32..=1 {
            let nx = (x as i32 + dx).clamp(0, frame.width as i32 - 1) as usize;
            let ny = (y as i32 + dy).clamp(0, frame.height as i32 - 1) as usize;
            if pattern.color_at(nx, ny) == color {
                sum += frame.get(nx, ny, 0);
                count += 1;
            }
        }
    }
    sum / count as f32
}

/// Half-resolution demosaic: one RGB pixel per 2x2 Bayer tile, the two green
/// cells averaged. Odd trailing rows/columns are dropped.
pub fn downsample2(frame: &Frame, pattern: BayerPattern) -> Frame {
    debug_assert_eq!(frame.channels, 1);
    let (w, h) = (frame.width / 2, frame.height / 2);
    let colors = pattern.cfa_colors();
    let mut out = Frame::filled(w, h, 3, 0.0);
    for ty in 0..h {
        for tx in 0..w {
            let mut rgb = [0.0f32; 3];
            let mut green_sum = 0.0f32;
            for (i, color) in colors.iter().enumerate() {
                let v = frame.get(tx * 2 + (i & 1), ty * 2 + (i >> 1), 0);
                match color {
                    CfaColor::R => rgb[0] = v,
                    CfaColor::G => green_sum += v,
                    CfaColor::B => rgb[2] = v,
                }
            }
            rgb[1] = green_sum / 2.0;
            for (c, v) in rgb.into_iter().enumerate() {
                out.set(tx, ty, c, v);
            }
        }
    }
    out
}

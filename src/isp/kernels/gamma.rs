//! Gamma encoding kernels.
//!
//! Standard curves follow IEC 61966-2-1 (sRGB) and ITU-R BT.709; custom
//! curves are lookup tables sampled uniformly on [0, 1] with linear
//! interpolation between samples.

use crate::isp::config::types::GammaMode;
use crate::isp::frame::Frame;

pub fn encode(frame: &mut Frame, mode: &GammaMode) {
    match mode {
        GammaMode::Srgb => {
            for v in &mut frame.data {
                *v = srgb_encode(v.max(0.0));
            }
        }
        GammaMode::Rec709 => {
            for v in &mut frame.data {
                *v = rec709_encode(v.max(0.0));
            }
        }
        GammaMode::Lut(lut) => {
            for v in &mut frame.data {
                *v = lut_lookup(lut, *v);
            }
        }
    }
}

fn srgb_encode(v: f32) -> f32 {
    if v > 0.0031308 {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    } else {
        12.92 * v
    }
}

fn rec709_encode(v: f32) -> f32 {
    if v > 0.018 {
        1.099 * v.powf(0.45) - 0.099
    } else {
        4.5 * v
    }
}

fn lut_lookup(lut: &[f32], v: f32) -> f32 {
    let t = v.clamp(0.0, 1.0) * (lut.len() - 1) as f32;
    let lo = t.floor() as usize;
    let hi = t.ceil() as usize;
    lut[lo] + (lut[hi] - lut[lo]) * (t - lo as f32)
}

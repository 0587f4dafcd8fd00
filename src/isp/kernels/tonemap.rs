//! Tone mapping kernels.

use crate::isp::config::types::ToneMapMode;
use crate::isp::frame::Frame;

pub fn apply(frame: &mut Frame, mode: ToneMapMode) {
    match mode {
        // Reinhard global operator, x / (1 + x).
        ToneMapMode::Reinhard => {
            for v in &mut frame.data {
                let x = v.max(0.0);
                *v = x / (1.0 + x);
            }
        }
    }
}

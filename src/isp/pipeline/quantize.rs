//! Output quantization.
//!
//! Maps the final floating-point image into the numeric representation of
//! the requested output class. Integer classes clip to [0, 1] and round
//! half up; the float class passes values through unclipped.

use crate::isp::config::types::OutputClass;
use crate::isp::frame::Frame;

#[derive(Debug, Clone, PartialEq)]
pub enum QuantizedFrame {
    /// Unclipped pass-through; nominal max value 1.0.
    F32(Frame),
    U8 {
        width: usize,
        height: usize,
        channels: usize,
        data: Vec<u8>,
    },
    U16 {
        width: usize,
        height: usize,
        channels: usize,
        data: Vec<u16>,
    },
}

impl QuantizedFrame {
    pub fn dimensions(&self) -> (usize, usize, usize) {
        match self {
            QuantizedFrame::F32(frame) => (frame.width, frame.height, frame.channels),
            QuantizedFrame::U8 {
                width,
                height,
                channels,
                ..
            }
            | QuantizedFrame::U16 {
                width,
                height,
                channels,
                ..
            } => (*width, *height, *channels),
        }
    }

    pub fn max_value(&self) -> f32 {
        match self {
            QuantizedFrame::F32(_) => 1.0,
            QuantizedFrame::U8 { .. } => 255.0,
            QuantizedFrame::U16 { .. } => 65535.0,
        }
    }
}

pub fn quantize(frame: Frame, class: OutputClass) -> QuantizedFrame {
    match class {
        OutputClass::Float => QuantizedFrame::F32(frame),
        OutputClass::Bits8 => QuantizedFrame::U8 {
            width: frame.width,
            height: frame.height,
            channels: frame.channels,
            data: frame
                .data
                .iter()
                .map(|v| (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8)
                .collect(),
        },
        OutputClass::Bits16 => QuantizedFrame::U16 {
            width: frame.width,
            height: frame.height,
            channels: frame.channels,
            data: frame
                .data
                .iter()
                .map(|v| (v.clamp(0.0, 1.0) * 65535.0 + 0.5) as u16)
                .collect(),
        },
    }
}

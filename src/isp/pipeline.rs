//! Pipeline module
//!
//! The ordered stage engine and the output quantizer.

pub mod engine;
pub mod quantize;

pub use engine::{OverflowMasks, PipelineOutput, run};
pub use quantize::{QuantizedFrame, quantize};

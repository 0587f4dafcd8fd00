//! ISP processing module
//!
//! This module contains the full raw-to-RGB conversion machinery: per-file
//! configuration resolution, input readers, the ordered transform pipeline,
//! output quantization and writers, and the batch driver.

pub mod batch;
pub mod common;
pub mod config;
pub mod frame;
pub mod input;
pub mod kernels;
pub mod output;
pub mod pipeline;

pub use common::{IspError, Result};

pub use config::{
    BayerPattern, CfaColor, FrameConfig, GammaMode, IspConfig, LensShadingTable, LevelSpec,
    OutputClass, OutputFormat, ToneMapMode, resolve,
};

pub use frame::Frame;

pub use input::{CameraParams, DecodedFrame, ReadHints, SourceKind, read_frame};

pub use pipeline::{OverflowMasks, PipelineOutput, QuantizedFrame, quantize, run};

pub use batch::{BatchDriver, BatchTimings, CancelToken, FrameSink, FrameSource};

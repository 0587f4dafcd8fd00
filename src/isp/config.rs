//! Configuration module
//!
//! Holds the closed configuration vocabulary (Bayer patterns, level specs,
//! gamma/tonemap modes, output formats), the CLI-built base configuration,
//! the per-file resolved configuration, and the side-file loaders.

mod resolver;
mod sidecar;
pub mod types;

pub use resolver::{auto_black_level, auto_white_level, resolve};
pub use sidecar::{load_ccm_csv, load_gamma_csv, load_shading_table, load_wb_csv};
pub use types::{
    BayerPattern, CfaColor, FrameConfig, GammaMode, IspConfig, LensShadingTable, LevelSpec,
    OutputClass, OutputFormat, ToneMapMode,
};

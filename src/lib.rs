//! rawtorgb converts Bayer raw sensor images (or pre-demultiplexed RGB raw
//! data) into standard RGB raster images through a configurable ISP pipeline:
//! linearization, lens-shading correction, demosaic, white balance, color
//! correction, tone mapping, chroma denoise, gamma encoding and output
//! quantization.

pub mod isp;
pub mod logger;

//! Decoded-input data types.

use crate::isp::config::types::BayerPattern;
use crate::isp::frame::Frame;

/// Container class an input was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Pnm,
    Pfm,
    Png,
    /// Serialized numpy array (.npy or .npz).
    Npy,
    /// Headerless binary dump.
    RawDump,
    /// Camera-native raw container (DNG/NEF/CR2 class).
    Camera,
}

/// Caller-supplied hints for containers that carry no geometry of their own.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadHints {
    pub width: Option<usize>,
    pub height: Option<usize>,
    pub bpp: Option<u32>,
}

/// ISP parameters extracted from camera-embedded metadata.
#[derive(Debug, Clone)]
pub struct CameraParams {
    pub bayer: BayerPattern,
    /// (rGain, bGain); green is 1.0.
    pub wb_gains: (f32, f32),
    pub ccm: [[f32; 3]; 3],
    pub black_level: f32,
}

/// One decoded input: samples plus container-reported metadata.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub frame: Frame,
    pub kind: SourceKind,
    /// Bit depth reported by the container, when it has one.
    pub bpp: Option<u32>,
    /// Camera-embedded parameters, present for camera-native containers.
    pub camera: Option<CameraParams>,
}

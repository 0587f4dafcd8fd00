//! Configuration vocabulary and the base/resolved configuration records.

use std::fmt;
use std::str::FromStr;

use crate::isp::common::IspError;
use crate::isp::frame::Frame;

/// Color of a single color-filter-array cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CfaColor {
    R,
    G,
    B,
}

/// The 2x2 repeating color-filter arrangement of a Bayer sensor, named by its
/// row-major cell order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BayerPattern {
    Rggb,
    Gbrg,
    Bggr,
    Grbg,
}

impl BayerPattern {
    /// Cell colors in row-major order: (0,0), (0,1), (1,0), (1,1).
    pub fn cfa_colors(self) -> [CfaColor; 4] {
        use CfaColor::*;
        match self {
            BayerPattern::Rggb => [R, G, G, B],
            BayerPattern::Gbrg => [G, B, R, G],
            BayerPattern::Bggr => [B, G, G, R],
            BayerPattern::Grbg => [G, R, B, G],
        }
    }

    /// Color of the cell at absolute sensor coordinates.
    #[inline]
    pub fn color_at(self, x: usize, y: usize) -> CfaColor {
        self.cfa_colors()[(y & 1) * 2 + (x & 1)]
    }

    pub fn code(self) -> &'static str {
        match self {
            BayerPattern::Rggb => "RGGB",
            BayerPattern::Gbrg => "GBRG",
            BayerPattern::Bggr => "BGGR",
            BayerPattern::Grbg => "GRBG",
        }
    }
}

impl fmt::Display for BayerPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for BayerPattern {
    type Err = IspError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "RGGB" => Ok(BayerPattern::Rggb),
            "GBRG" => Ok(BayerPattern::Gbrg),
            "BGGR" => Ok(BayerPattern::Bggr),
            "GRBG" => Ok(BayerPattern::Grbg),
            other => Err(IspError::Usage(format!(
                "unrecognized bayer pattern '{other}' (expected RGGB, GBRG, BGGR or GRBG)"
            ))),
        }
    }
}

/// Black or white level specification: an explicit value, an estimate from
/// the frame content, or the full code range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LevelSpec {
    Explicit(f32),
    Auto,
    Max,
}

impl FromStr for LevelSpec {
    type Err = IspError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(LevelSpec::Auto),
            "max" => Ok(LevelSpec::Max),
            _ => s.parse::<f32>().map(LevelSpec::Explicit).map_err(|_| {
                IspError::Usage(format!(
                    "invalid level '{s}' (expected a number, 'auto' or 'max')"
                ))
            }),
        }
    }
}

/// Gamma encoding applied as the last pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub enum GammaMode {
    Srgb,
    Rec709,
    /// Custom curve sampled uniformly on [0, 1], linearly interpolated.
    Lut(Vec<f32>),
}

/// Tone mapping curve identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneMapMode {
    Reinhard,
}

/// Numeric class of an output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputClass {
    Float,
    Bits8,
    Bits16,
}

/// Supported output containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// 16-bit binary PPM (default).
    Ppm,
    /// 8-bit binary PPM.
    Ppm8,
    /// 8-bit PNG.
    Png,
    /// 16-bit PNG.
    Png16,
    /// 16-bit uncompressed TIFF.
    Tiff,
    /// Float PFM, values passed through unclipped.
    Pfm,
}

impl OutputFormat {
    pub fn class(self) -> OutputClass {
        match self {
            OutputFormat::Pfm => OutputClass::Float,
            OutputFormat::Ppm8 | OutputFormat::Png => OutputClass::Bits8,
            OutputFormat::Ppm | OutputFormat::Png16 | OutputFormat::Tiff => OutputClass::Bits16,
        }
    }

    /// Extension of the written file, by container convention.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Ppm | OutputFormat::Ppm8 => "ppm",
            OutputFormat::Png | OutputFormat::Png16 => "png",
            OutputFormat::Tiff => "tif",
            OutputFormat::Pfm => "pfm",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = IspError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ppm" => Ok(OutputFormat::Ppm),
            "ppm8" => Ok(OutputFormat::Ppm8),
            "png" => Ok(OutputFormat::Png),
            "png16" => Ok(OutputFormat::Png16),
            "tiff" | "tif" => Ok(OutputFormat::Tiff),
            "pfm" => Ok(OutputFormat::Pfm),
            other => Err(IspError::Usage(format!(
                "unrecognized output format '{other}' (expected ppm, ppm8, png, png16, tiff or pfm)"
            ))),
        }
    }
}

/// Lens-shading gain table, distinguished by shape: a single-plane table is
/// applied per Bayer cell before demosaic, a three-plane table per RGB
/// channel after demosaic. Never both.
#[derive(Debug, Clone, PartialEq)]
pub enum LensShadingTable {
    Raw(Frame),
    Rgb(Frame),
}

impl LensShadingTable {
    /// Classifies a loaded gain image by channel count.
    pub fn from_frame(frame: Frame) -> Result<Self, IspError> {
        match frame.channels {
            1 => Ok(LensShadingTable::Raw(frame)),
            3 => Ok(LensShadingTable::Rgb(frame)),
            n => Err(IspError::Config(format!(
                "lens-shading table must have 1 or 3 channels, got {n}"
            ))),
        }
    }
}

/// Base configuration, built once from the CLI. Every overridable field is
/// optional so explicitly supplied values are distinguishable from values
/// left for per-file auto-detection.
#[derive(Debug, Clone)]
pub struct IspConfig {
    pub width: Option<usize>,
    pub height: Option<usize>,
    pub bpp: Option<u32>,
    pub black_level: Option<LevelSpec>,
    pub white_level: Option<LevelSpec>,
    pub bayer: Option<BayerPattern>,
    pub downsample: bool,
    pub lsc: Option<LensShadingTable>,
    pub wb_gains: Option<(f32, f32)>,
    pub ccm: Option<[[f32; 3]; 3]>,
    pub tonemap: Option<ToneMapMode>,
    pub denoise: f32,
    pub gamma: Option<GammaMode>,
    pub out_format: OutputFormat,
    pub debug: bool,
}

impl Default for IspConfig {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            bpp: None,
            black_level: None,
            white_level: None,
            bayer: None,
            downsample: false,
            lsc: None,
            wb_gains: None,
            ccm: None,
            tonemap: None,
            denoise: 0.0,
            gamma: None,
            out_format: OutputFormat::Ppm,
            debug: false,
        }
    }
}

/// Fully resolved per-file configuration. Produced fresh for every input so
/// auto-detected values never leak into the next file.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    pub width: usize,
    pub height: usize,
    pub bpp: u32,
    pub max_value: f32,
    pub black_level: f32,
    pub white_level: f32,
    pub bayer: BayerPattern,
    /// True iff the decoded buffer has exactly one channel.
    pub demosaic: bool,
    pub downsample: bool,
    pub lsc: Option<LensShadingTable>,
    pub wb_gains: Option<(f32, f32)>,
    pub ccm: Option<[[f32; 3]; 3]>,
    pub tonemap: Option<ToneMapMode>,
    pub denoise: f32,
    pub gamma: Option<GammaMode>,
    pub out_format: OutputFormat,
    pub debug: bool,
}

/// `2^bpp - 1` for the supported bit depths.
pub(crate) fn max_value_for_bpp(bpp: u32) -> f32 {
    ((1u64 << bpp) - 1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn max_value_per_bit_depth() {
        let expected = [(8, 255.0), (10, 1023.0), (12, 4095.0), (14, 16383.0), (16, 65535.0)];
        for (bpp, maxval) in expected {
            assert_eq!(max_value_for_bpp(bpp), maxval);
        }
    }

    #[test]
    fn bayer_patterns_are_permutations() {
        for pattern in [
            BayerPattern::Rggb,
            BayerPattern::Gbrg,
            BayerPattern::Bggr,
            BayerPattern::Grbg,
        ] {
            let colors = pattern.cfa_colors();
            let reds = colors.iter().filter(|&&c| c == CfaColor::R).count();
            let greens = colors.iter().filter(|&&c| c == CfaColor::G).count();
            let blues = colors.iter().filter(|&&c| c == CfaColor::B).count();
            assert_eq!((reds, greens, blues), (1, 2, 1), "{pattern}");
        }
    }

    #[test]
    fn cell_gain_mapping_round_trips() {
        // Mapping each cell through a per-color gain table and back through
        // the pattern recovers the original gains for every pattern.
        let gains: HashMap<CfaColor, f32> =
            [(CfaColor::R, 2.0), (CfaColor::G, 1.0), (CfaColor::B, 1.5)].into();
        for pattern in [
            BayerPattern::Rggb,
            BayerPattern::Gbrg,
            BayerPattern::Bggr,
            BayerPattern::Grbg,
        ] {
            let cell_gains: Vec<f32> = pattern.cfa_colors().iter().map(|c| gains[c]).collect();
            for (i, color) in pattern.cfa_colors().iter().enumerate() {
                assert_eq!(cell_gains[i], gains[color]);
            }
            // One red cell, one blue cell per tile.
            assert_eq!(cell_gains.iter().filter(|&&g| g == 2.0).count(), 1);
            assert_eq!(cell_gains.iter().filter(|&&g| g == 1.5).count(), 1);
        }
    }

    #[test]
    fn bayer_code_round_trip() {
        for code in ["RGGB", "GBRG", "BGGR", "GRBG"] {
            let pattern: BayerPattern = code.parse().unwrap();
            assert_eq!(pattern.code(), code);
        }
        assert!("XYZW".parse::<BayerPattern>().is_err());
    }

    #[test]
    fn level_spec_parsing() {
        assert_eq!("auto".parse::<LevelSpec>().unwrap(), LevelSpec::Auto);
        assert_eq!("MAX".parse::<LevelSpec>().unwrap(), LevelSpec::Max);
        assert_eq!(
            "63.5".parse::<LevelSpec>().unwrap(),
            LevelSpec::Explicit(63.5)
        );
        assert!("foo".parse::<LevelSpec>().is_err());
    }

    #[test]
    fn output_format_classes() {
        assert_eq!(OutputFormat::Pfm.class(), OutputClass::Float);
        assert_eq!(OutputFormat::Ppm8.class(), OutputClass::Bits8);
        assert_eq!(OutputFormat::Png.class(), OutputClass::Bits8);
        assert_eq!(OutputFormat::Ppm.class(), OutputClass::Bits16);
        assert_eq!(OutputFormat::Png16.class(), OutputClass::Bits16);
        assert_eq!(OutputFormat::Tiff.class(), OutputClass::Bits16);
    }

    #[test]
    fn shading_table_shape_dispatch() {
        let raw = LensShadingTable::from_frame(Frame::filled(4, 4, 1, 1.0)).unwrap();
        assert!(matches!(raw, LensShadingTable::Raw(_)));
        let rgb = LensShadingTable::from_frame(Frame::filled(4, 4, 3, 1.0)).unwrap();
        assert!(matches!(rgb, LensShadingTable::Rgb(_)));
        assert!(LensShadingTable::from_frame(Frame::filled(4, 4, 2, 1.0)).is_err());
    }
}

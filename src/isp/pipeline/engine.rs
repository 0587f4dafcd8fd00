//! Pipeline engine
//!
//! Executes the fixed ordered stage sequence over one image buffer:
//! linearize, raw-domain shading, clip, demosaic, RGB-domain shading, white
//! balance, color correction, tone map, chroma denoise, gamma. Stages whose
//! governing configuration field is absent are skipped, never reordered.
//!
//! Debug mode runs the same stage functions but leaves values unclipped and
//! captures per-stage overflow masks, rendered into a tinted grayscale
//! diagnostic after the pipeline completes.

use tracing::debug;

use crate::isp::common::{IspError, Result};
use crate::isp::config::types::{CfaColor, FrameConfig, LensShadingTable};
use crate::isp::frame::Frame;
use crate::isp::kernels::{demosaic, denoise, gamma, tonemap};

/// Per-pixel "any channel >= 1.0" masks captured at three stage boundaries.
/// Visualization only; never fed back into the numeric pipeline.
#[derive(Debug, Clone)]
pub struct OverflowMasks {
    pub width: usize,
    pub height: usize,
    /// Captured immediately after demosaic.
    pub raw: Vec<bool>,
    /// Captured immediately after white balance.
    pub wb: Vec<bool>,
    /// Captured immediately after color correction.
    pub ccm: Vec<bool>,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub frame: Frame,
    pub masks: Option<OverflowMasks>,
    /// Tinted grayscale overflow diagnostic, present in debug mode.
    pub diagnostic: Option<Frame>,
}

pub fn run(frame: Frame, config: &FrameConfig) -> Result<PipelineOutput> {
    validate(&frame, config)?;
    let mut img = frame;

    linearize(&mut img, config.black_level, config.white_level);

    // Raw-domain shading correction. When independent white-balance gains
    // are also configured they are folded into this pass, cell by cell, so
    // the raw buffer is traversed once; the standalone white-balance stage
    // is skipped in that case.
    let mut wb_folded = false;
    if let Some(LensShadingTable::Raw(table)) = &config.lsc {
        apply_raw_shading(&mut img, table, config);
        wb_folded = config.wb_gains.is_some();
        debug!("Applied raw-domain lens shading (wb folded: {wb_folded})");
    }

    if !config.debug {
        clip01(&mut img);
    }

    if config.demosaic {
        img = if config.downsample {
            demosaic::downsample2(&img, config.bayer)
        } else {
            demosaic::bilinear(&img, config.bayer)
        };
        debug!("Demosaiced to {}x{}", img.width, img.height);
    }
    let mask_raw = config.debug.then(|| overflow_mask(&img));

    if let Some(LensShadingTable::Rgb(table)) = &config.lsc {
        apply_rgb_shading(&mut img, table);
        debug!("Applied RGB-domain lens shading");
    }

    if let Some((r_gain, b_gain)) = config.wb_gains {
        if !wb_folded {
            white_balance(&mut img, r_gain, b_gain);
        }
    }
    let mask_wb = config.debug.then(|| overflow_mask(&img));

    if let Some(ccm) = &config.ccm {
        color_correct(&mut img, ccm);
    }
    let mask_ccm = config.debug.then(|| overflow_mask(&img));

    if let Some(mode) = config.tonemap {
        tonemap::apply(&mut img, mode);
    }
    if config.denoise > 0.0 {
        denoise::chroma_denoise(&mut img, config.denoise);
    }
    if let Some(mode) = &config.gamma {
        gamma::encode(&mut img, mode);
    }

    let masks = match (mask_raw, mask_wb, mask_ccm) {
        (Some(raw), Some(wb), Some(ccm)) => Some(OverflowMasks {
            width: img.width,
            height: img.height,
            raw,
            wb,
            ccm,
        }),
        _ => None,
    };
    let diagnostic = masks.as_ref().map(|m| render_diagnostic(&img, m));

    Ok(PipelineOutput {
        frame: img,
        masks,
        diagnostic,
    })
}

/// Shape checks for everything the stages will consume. Runs before any
/// stage so a malformed table or matrix never fails mid-pipeline.
fn validate(frame: &Frame, config: &FrameConfig) -> Result<()> {
    if let Some((r, b)) = config.wb_gains {
        if !r.is_finite() || !b.is_finite() || r <= 0.0 || b <= 0.0 {
            return Err(IspError::Config(format!(
                "white balance gains ({r}, {b}) must be positive finite values"
            )));
        }
    }
    if let Some(ccm) = &config.ccm {
        if ccm.iter().flatten().any(|v| !v.is_finite()) {
            return Err(IspError::Config("color matrix holds non-finite values".into()));
        }
    }

    let (out_w, out_h) = if config.demosaic && config.downsample {
        (frame.width / 2, frame.height / 2)
    } else {
        (frame.width, frame.height)
    };
    match &config.lsc {
        Some(LensShadingTable::Raw(table)) => {
            if !config.demosaic {
                return Err(IspError::Config(
                    "single-plane lens-shading table requires single-channel input".into(),
                ));
            }
            if table.width != frame.width || table.height != frame.height {
                return Err(IspError::Config(format!(
                    "raw-domain lens-shading table is {}x{}, sensor is {}x{}",
                    table.width, table.height, frame.width, frame.height
                )));
            }
        }
        Some(LensShadingTable::Rgb(table)) => {
            if table.width != out_w || table.height != out_h {
                return Err(IspError::Config(format!(
                    "RGB-domain lens-shading table is {}x{}, output is {out_w}x{out_h}",
                    table.width, table.height
                )));
            }
        }
        None => {}
    }
    Ok(())
}

/// Maps [black, white] to [0, 1], clamping outside values.
fn linearize(img: &mut Frame, black: f32, white: f32) {
    let scale = 1.0 / (white - black);
    for v in &mut img.data {
        *v = ((*v - black) * scale).clamp(0.0, 1.0);
    }
}

fn clip01(img: &mut Frame) {
    for v in &mut img.data {
        *v = v.clamp(0.0, 1.0);
    }
}

fn apply_raw_shading(img: &mut Frame, table: &Frame, config: &FrameConfig) {
    let gains = config.wb_gains;
    for y in 0..img.height {
        for x in 0..img.width {
            let mut g = table.get(x, y, 0);
            if let Some((r_gain, b_gain)) = gains {
                g *= match config.bayer.color_at(x, y) {
                    CfaColor::R => r_gain,
                    CfaColor::G => 1.0,
                    CfaColor::B => b_gain,
                };
            }
            let i = img.index(x, y, 0);
            img.data[i] *= g;
        }
    }
}

fn apply_rgb_shading(img: &mut Frame, table: &Frame) {
    for (v, g) in img.data.iter_mut().zip(&table.data) {
        *v *= g;
    }
}

fn white_balance(img: &mut Frame, r_gain: f32, b_gain: f32) {
    for pixel in img.data.chunks_exact_mut(3) {
        pixel[0] *= r_gain;
        pixel[2] *= b_gain;
    }
}

fn color_correct(img: &mut Frame, ccm: &[[f32; 3]; 3]) {
    for pixel in img.data.chunks_exact_mut(3) {
        let (r, g, b) = (pixel[0], pixel[1], pixel[2]);
        for c in 0..3 {
            pixel[c] = ccm[c][0] * r + ccm[c][1] * g + ccm[c][2] * b;
        }
    }
}

/// True where any channel of the pixel reached or exceeded 1.0.
fn overflow_mask(img: &Frame) -> Vec<bool> {
    img.data
        .chunks_exact(img.channels)
        .map(|pixel| pixel.iter().any(|&v| v >= 1.0))
        .collect()
}

/// Grayscale rendition of the final image with overflow pixels tinted:
/// red for raw/demosaic overflow, green for white-balance/shading overflow,
/// yellow for color-matrix overflow. Red wins over green wins over yellow.
fn render_diagnostic(final_img: &Frame, masks: &OverflowMasks) -> Frame {
    let (w, h) = (masks.width, masks.height);
    let mut diag = Frame::filled(w, h, 3, 0.0);
    for i in 0..w * h {
        let pixel = &final_img.data[i * final_img.channels..(i + 1) * final_img.channels];
        let gray =
            (pixel.iter().sum::<f32>() / final_img.channels as f32).clamp(0.0, 1.0);
        let rgb = if masks.raw[i] {
            [1.0, 0.0, 0.0]
        } else if masks.wb[i] {
            [0.0, 1.0, 0.0]
        } else if masks.ccm[i] {
            [1.0, 1.0, 0.0]
        } else {
            [gray, gray, gray]
        };
        diag.data[i * 3..i * 3 + 3].copy_from_slice(&rgb);
    }
    diag
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isp::config::types::{BayerPattern, OutputFormat};
    use crate::isp::pipeline::quantize::{QuantizedFrame, quantize};

    fn base_config(width: usize, height: usize) -> FrameConfig {
        FrameConfig {
            width,
            height,
            bpp: 16,
            max_value: 65535.0,
            black_level: 0.0,
            white_level: 65535.0,
            bayer: BayerPattern::Rggb,
            demosaic: true,
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

    fn rgb_config(width: usize, height: usize) -> FrameConfig {
        FrameConfig {
            demosaic: false,
            ..base_config(width, height)
        }
    }

    const IDENTITY: [[f32; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

    #[test]
    fn linearize_is_idempotent_once_normalized() {
        let mut img = Frame::new(2, 2, 1, vec![0.0, 250.0, 500.0, 1000.0]);
        linearize(&mut img, 0.0, 1000.0);
        let once = img.clone();
        // With levels already at 0/max of the normalized domain, a second
        // application is a no-op.
        linearize(&mut img, 0.0, 1.0);
        assert_eq!(img, once);
        assert_eq!(img.data, vec![0.0, 0.25, 0.5, 1.0]);
    }

    #[test]
    fn linearize_clamps_outside_values() {
        let mut img = Frame::new(2, 1, 1, vec![50.0, 1100.0]);
        linearize(&mut img, 100.0, 1000.0);
        assert_eq!(img.data, vec![0.0, 1.0]);
    }

    #[test]
    fn full_pipeline_ramp_saturates_top_left_red() {
        // 4x4 RGGB ramp in [0, 1000] with the (0,0) red cell at 1000.
        let mut data = Vec::new();
        for i in 0..16u32 {
            data.push((i * 1000 / 15) as f32);
        }
        data[0] = 1000.0;
        let frame = Frame::new(4, 4, 1, data);
        let config = FrameConfig {
            black_level: 0.0,
            white_level: 1000.0,
            ccm: Some(IDENTITY),
            ..base_config(4, 4)
        };
        let out = run(frame, &config).unwrap();
        assert_eq!((out.frame.width, out.frame.height, out.frame.channels), (4, 4, 3));
        match quantize(out.frame, config.out_format.class()) {
            QuantizedFrame::U16 { data, .. } => {
                assert_eq!(data.len(), 4 * 4 * 3);
                assert_eq!(data[0], 65535, "top-left red must hit full scale");
            }
            other => panic!("expected 16-bit output, got {other:?}"),
        }
    }

    #[test]
    fn identity_ccm_matches_no_ccm() {
        let data: Vec<f32> = (0..32).map(|i| (i * 97 % 1000) as f32).collect();
        let frame = Frame::new(8, 4, 1, data);
        let mut config = base_config(8, 4);
        config.white_level = 1000.0;
        let plain = run(frame.clone(), &config).unwrap();
        config.ccm = Some(IDENTITY);
        let with_ccm = run(frame, &config).unwrap();
        for (a, b) in plain.frame.data.iter().zip(&with_ccm.frame.data) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn folded_white_balance_matches_standalone() {
        let data: Vec<f32> = (0..16).map(|i| 100.0 + i as f32 * 10.0).collect();
        let frame = Frame::new(4, 4, 1, data);
        let mut config = base_config(4, 4);
        config.white_level = 1000.0;
        config.wb_gains = Some((1.6, 1.3));
        let standalone = run(frame.clone(), &config).unwrap();

        // A unity shading table folds the same gains into the raw pass.
        config.lsc = Some(LensShadingTable::Raw(Frame::filled(4, 4, 1, 1.0)));
        let folded = run(frame, &config).unwrap();
        for (a, b) in standalone.frame.data.iter().zip(&folded.frame.data) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn rgb_shading_applies_after_demosaic() {
        let frame = Frame::new(2, 2, 1, vec![400.0, 400.0, 400.0, 400.0]);
        let mut config = base_config(2, 2);
        config.white_level = 1000.0;
        let mut table = Frame::filled(2, 2, 3, 1.0);
        table.set(0, 0, 0, 2.0);
        config.lsc = Some(LensShadingTable::Rgb(table));
        let out = run(frame, &config).unwrap();
        assert!((out.frame.get(0, 0, 0) - 0.8).abs() < 1e-6);
        assert!((out.frame.get(0, 0, 1) - 0.4).abs() < 1e-6);
    }

    #[test]
    fn wrong_shaped_tables_fail_before_execution() {
        let frame = Frame::filled(4, 4, 1, 100.0);
        let mut config = base_config(4, 4);
        config.lsc = Some(LensShadingTable::Raw(Frame::filled(2, 2, 1, 1.0)));
        assert!(matches!(
            run(frame.clone(), &config).unwrap_err(),
            IspError::Config(_)
        ));

        // Raw-domain table on an already-RGB source.
        let rgb_frame = Frame::filled(4, 4, 3, 100.0);
        let mut config = rgb_config(4, 4);
        config.lsc = Some(LensShadingTable::Raw(Frame::filled(4, 4, 1, 1.0)));
        assert!(matches!(
            run(rgb_frame, &config).unwrap_err(),
            IspError::Config(_)
        ));

        // RGB-domain table must match the downsampled geometry.
        let mut config = base_config(4, 4);
        config.downsample = true;
        config.lsc = Some(LensShadingTable::Rgb(Frame::filled(4, 4, 3, 1.0)));
        assert!(matches!(
            run(frame, &config).unwrap_err(),
            IspError::Config(_)
        ));
    }

    #[test]
    fn degenerate_wb_gains_fail_fast() {
        let frame = Frame::filled(4, 4, 1, 100.0);
        let mut config = base_config(4, 4);
        config.wb_gains = Some((0.0, 1.0));
        assert!(matches!(
            run(frame, &config).unwrap_err(),
            IspError::Config(_)
        ));
    }

    #[test]
    fn overflow_masks_follow_stage_boundaries() {
        // Three pixels engineered to overflow at distinct stages:
        // pixel 0 saturates at linearization (raw), pixel 1 only after white
        // balance, pixel 2 only after color correction. Pixel 3 stays in
        // range.
        let data = vec![
            1.0, 1.0, 1.0, // saturated at raw
            0.6, 0.2, 0.2, // 0.6 * 2.0 = 1.2 after wb
            0.2, 0.32, 0.2, // 0.96 after ccm row scale 3.0
            0.1, 0.1, 0.1,
        ];
        let frame = Frame::new(4, 1, 3, data);
        let mut config = rgb_config(4, 1);
        config.max_value = 1.0;
        config.white_level = 1.0;
        config.wb_gains = Some((2.0, 1.0));
        config.ccm = Some([[3.0, 0.0, 0.0], [0.0, 3.0, 0.0], [0.0, 0.0, 3.0]]);
        config.debug = true;

        let out = run(frame, &config).unwrap();
        let masks = out.masks.expect("debug mode captures masks");
        assert_eq!(masks.raw, vec![true, false, false, false]);
        assert_eq!(masks.wb, vec![true, true, false, false]);
        assert_eq!(masks.ccm, vec![true, true, true, false]);

        // Red > green > yellow precedence in the rendered diagnostic.
        let diag = out.diagnostic.expect("debug mode renders a diagnostic");
        assert_eq!(&diag.data[0..3], &[1.0, 0.0, 0.0]);
        assert_eq!(&diag.data[3..6], &[0.0, 1.0, 0.0]);
        assert_eq!(&diag.data[6..9], &[1.0, 1.0, 0.0]);
        let tail = &diag.data[9..12];
        assert!(tail[0] == tail[1] && tail[1] == tail[2], "clean pixel stays gray");
    }

    #[test]
    fn normal_mode_produces_no_masks() {
        let frame = Frame::filled(4, 4, 1, 100.0);
        let config = base_config(4, 4);
        let out = run(frame, &config).unwrap();
        assert!(out.masks.is_none());
        assert!(out.diagnostic.is_none());
    }
}

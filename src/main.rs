use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing::{debug, error, info, warn};

use rawtorgb::isp::config::{load_ccm_csv, load_gamma_csv, load_shading_table, load_wb_csv};
use rawtorgb::isp::{
    BatchDriver, CancelToken, GammaMode, IspConfig, IspError, OutputFormat, ToneMapMode,
};
use rawtorgb::logger;

const SUPPORTED_BPP: [u32; 5] = [8, 10, 12, 14, 16];

/// Convert Bayer raw (or RGB raw) images into standard RGB rasters.
#[derive(Parser, Debug)]
#[command(name = "rawtorgb", version, about, long_about = None)]
struct Cli {
    /// Input files to convert
    #[arg(value_name = "FILE", required = true)]
    inputs: Vec<PathBuf>,

    /// Sensor bit depth (8, 10, 12, 14 or 16)
    #[arg(long, value_name = "N")]
    bpp: Option<u32>,

    /// Frame size, required for headerless .raw input
    #[arg(long, num_args = 2, value_names = ["W", "H"])]
    size: Option<Vec<usize>>,

    /// Halve output resolution during demosaic
    #[arg(long)]
    downsample: bool,

    /// Bayer arrangement (RGGB, GBRG, BGGR or GRBG)
    #[arg(long, value_name = "ORDER")]
    bayer: Option<String>,

    /// Black level: a number, 'auto' or 'max'
    #[arg(long, value_name = "LEVEL")]
    blacklevel: Option<String>,

    /// White level: a number, 'auto' or 'max'
    #[arg(long, value_name = "LEVEL")]
    whitelevel: Option<String>,

    /// White balance gains for the red and blue channels
    #[arg(long, num_args = 2, value_names = ["R", "B"], conflicts_with = "wb")]
    wbgain: Option<Vec<f32>>,

    /// White balance gain pair from a CSV file
    #[arg(long, value_name = "FILE")]
    wb: Option<PathBuf>,

    /// Lens shading table image (PGM/PPM/PNG/PFM)
    #[arg(long, value_name = "FILE")]
    lsc: Option<PathBuf>,

    /// Color correction matrix: 'identity' or a CSV file
    #[arg(long, value_name = "FILE")]
    ccm: Option<String>,

    /// Apply Reinhard tone mapping
    #[arg(long)]
    tonemap: bool,

    /// Chroma denoise strength
    #[arg(long, value_name = "N", default_value_t = 0.0)]
    denoise: f32,

    /// Gamma: 'sRGB', 'rec709' or a CSV curve file
    #[arg(long, value_name = "MODE")]
    gamma: Option<String>,

    /// Output format (ppm, ppm8, png, png16, tiff or pfm)
    #[arg(long, value_name = "FMT")]
    outformat: Option<String>,

    /// Output directory
    #[arg(long, value_name = "DIR")]
    outdir: Option<PathBuf>,

    /// Write the per-stage overflow diagnostic beside each output
    #[arg(long)]
    debug: bool,

    /// Suppress progress output
    #[arg(long)]
    quiet: bool,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            use clap::error::ErrorKind;
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => -1,
            };
            let _ = e.print();
            std::process::exit(code);
        }
    };
    logger::init(cli.quiet);

    if let Err(e) = run(cli) {
        if matches!(e.downcast_ref::<IspError>(), Some(IspError::Interrupted)) {
            warn!("Interrupted; already-written outputs remain valid");
        } else {
            error!("{e:#}");
            debug!("{e:?}");
        }
        std::process::exit(-1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let quiet = cli.quiet;
    let config = build_config(&cli)?;

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || cancel.cancel())
            .context("failed to install interrupt handler")?;
    }

    let driver = BatchDriver::new(config, cli.outdir.clone(), cancel);
    let timings = driver.process_all(&cli.inputs)?;

    info!(
        "Processed {} file(s) in {:.3}s",
        timings.steps().len(),
        timings.total_duration().as_secs_f64()
    );
    if !quiet {
        timings.print_summary();
    }
    Ok(())
}

/// Builds the base configuration from the CLI, loading every referenced side
/// file up front so a missing file fails before any conversion begins.
fn build_config(cli: &Cli) -> anyhow::Result<IspConfig> {
    if let Some(bpp) = cli.bpp {
        if !SUPPORTED_BPP.contains(&bpp) {
            return Err(IspError::Usage(format!(
                "--bpp {bpp} is not supported (expected one of {SUPPORTED_BPP:?})"
            ))
            .into());
        }
    }
    if cli.denoise < 0.0 {
        return Err(IspError::Usage(format!(
            "--denoise must be non-negative, got {}",
            cli.denoise
        ))
        .into());
    }

    let (width, height) = match &cli.size {
        Some(pair) => (Some(pair[0]), Some(pair[1])),
        None => (None, None),
    };

    let wb_gains = match (&cli.wbgain, &cli.wb) {
        (Some(pair), _) => Some((pair[0], pair[1])),
        (None, Some(path)) => Some(load_wb_csv(path)?),
        (None, None) => None,
    };

    let ccm = match cli.ccm.as_deref() {
        Some("identity") => Some([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]),
        Some(path) => Some(load_ccm_csv(Path::new(path))?),
        None => None,
    };

    let gamma = match cli.gamma.as_deref() {
        None => None,
        Some(s) if s.eq_ignore_ascii_case("srgb") => Some(GammaMode::Srgb),
        Some(s) if s.eq_ignore_ascii_case("rec709") => Some(GammaMode::Rec709),
        Some(path) => Some(GammaMode::Lut(load_gamma_csv(Path::new(path))?)),
    };

    Ok(IspConfig {
        width,
        height,
        bpp: cli.bpp,
        black_level: cli.blacklevel.as_deref().map(str::parse).transpose()?,
        white_level: cli.whitelevel.as_deref().map(str::parse).transpose()?,
        bayer: cli.bayer.as_deref().map(str::parse).transpose()?,
        downsample: cli.downsample,
        lsc: cli.lsc.as_deref().map(load_shading_table).transpose()?,
        wb_gains,
        ccm,
        tonemap: cli.tonemap.then_some(ToneMapMode::Reinhard),
        denoise: cli.denoise,
        gamma,
        out_format: cli
            .outformat
            .as_deref()
            .map(str::parse)
            .transpose()?
            .unwrap_or(OutputFormat::Ppm),
        debug: cli.debug,
    })
}

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use tracing::{info, warn};

use crate::isp::batch::timing::{BatchTimings, Timer};
use crate::isp::common::{IspError, Result};
use crate::isp::config::types::{IspConfig, OutputClass, OutputFormat};
use crate::isp::config::resolve;
use crate::isp::input::{self, DecodedFrame, ReadHints};
use crate::isp::output;
use crate::isp::pipeline::{self, QuantizedFrame, quantize};

/// Cooperative cancellation flag. Set from the interrupt handler, polled at
/// file boundaries only, so an in-flight file always finishes and no partial
/// output is ever written.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, AtomicOrdering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(AtomicOrdering::SeqCst)
    }
}

pub trait FrameSource {
    fn read(&self, path: &Path, hints: &ReadHints) -> Result<DecodedFrame>;
}

pub trait FrameSink {
    fn write(&self, path: &Path, frame: &QuantizedFrame, format: OutputFormat) -> Result<()>;
}

/// Filesystem-backed source dispatching on the input extension.
pub struct FsSource;

impl FrameSource for FsSource {
    fn read(&self, path: &Path, hints: &ReadHints) -> Result<DecodedFrame> {
        input::read_frame(path, hints)
    }
}

/// Filesystem-backed sink dispatching on the output format.
pub struct FsSink;

impl FrameSink for FsSink {
    fn write(&self, path: &Path, frame: &QuantizedFrame, format: OutputFormat) -> Result<()> {
        output::write_frame(path, frame, format)
    }
}

pub struct BatchDriver<S: FrameSource, K: FrameSink> {
    source: S,
    sink: K,
    config: IspConfig,
    outdir: Option<PathBuf>,
    cancel: CancelToken,
}

impl BatchDriver<FsSource, FsSink> {
    pub fn new(config: IspConfig, outdir: Option<PathBuf>, cancel: CancelToken) -> Self {
        Self {
            source: FsSource,
            sink: FsSink,
            config,
            outdir,
            cancel,
        }
    }
}

impl<S: FrameSource, K: FrameSink> BatchDriver<S, K> {
    pub fn with_custom(
        source: S,
        sink: K,
        config: IspConfig,
        outdir: Option<PathBuf>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            source,
            sink,
            config,
            outdir,
            cancel,
        }
    }

    pub fn config(&self) -> &IspConfig {
        &self.config
    }

    /// Processes every input in natural-sort order. The first failing file
    /// aborts the batch; outputs already written stay valid.
    pub fn process_all(&self, inputs: &[PathBuf]) -> Result<BatchTimings> {
        if inputs.is_empty() {
            return Err(IspError::Usage("no input files given".into()));
        }
        let mut files = inputs.to_vec();
        files.sort_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));
        files.dedup();

        let mut timings = BatchTimings::new();
        for path in &files {
            if self.cancel.is_cancelled() {
                warn!("Interrupt requested, stopping before {}", path.display());
                return Err(IspError::Interrupted);
            }
            let timer = Timer::start(path.to_string_lossy());
            self.process_one(path)?;
            let (name, duration) = timer.stop();
            info!("{}: {:.3}ms", name, duration.as_secs_f64() * 1000.0);
            timings.add_step(name, duration);
        }
        Ok(timings)
    }

    fn process_one(&self, path: &Path) -> Result<()> {
        let hints = ReadHints {
            width: self.config.width,
            height: self.config.height,
            bpp: self.config.bpp,
        };
        let decoded = self.source.read(path, &hints)?;
        // Fresh per-file configuration; the shared base is never mutated, so
        // auto-detected values cannot leak into the next file.
        let config = resolve(&self.config, &decoded)?;
        let result = pipeline::run(decoded.frame, &config)?;

        let out_path = self.output_path(path, config.out_format);
        let quantized = quantize(result.frame, config.out_format.class());
        self.sink.write(&out_path, &quantized, config.out_format)?;
        info!("Wrote {}", out_path.display());

        if let Some(diagnostic) = result.diagnostic {
            let diag_path = match &self.outdir {
                Some(dir) => dir.join("overflow.ppm"),
                None => out_path.with_file_name("overflow.ppm"),
            };
            let diag = quantize(diagnostic, OutputClass::Bits8);
            self.sink.write(&diag_path, &diag, OutputFormat::Ppm8)?;
            info!("Wrote overflow diagnostic {}", diag_path.display());
        }
        Ok(())
    }

    fn output_path(&self, input: &Path, format: OutputFormat) -> PathBuf {
        match &self.outdir {
            Some(dir) => {
                let stem = input.file_stem().unwrap_or(input.as_os_str());
                let mut name = PathBuf::from(stem);
                name.set_extension(format.extension());
                dir.join(name)
            }
            None => input.with_extension(format.extension()),
        }
    }
}

/// Orders paths so embedded digit runs compare numerically ("img2" before
/// "img10"); non-digit runs compare case-insensitively.
fn natural_cmp(a: &str, b: &str) -> Ordering {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i].is_ascii_digit() && b[j].is_ascii_digit() {
            let si = i;
            while i < a.len() && a[i].is_ascii_digit() {
                i += 1;
            }
            let sj = j;
            while j < b.len() && b[j].is_ascii_digit() {
                j += 1;
            }
            let da = trim_leading_zeros(&a[si..i]);
            let db = trim_leading_zeros(&b[sj..j]);
            let ord = da.len().cmp(&db.len()).then_with(|| da.cmp(db));
            if ord != Ordering::Equal {
                return ord;
            }
        } else {
            let (ca, cb) = (a[i].to_ascii_lowercase(), b[j].to_ascii_lowercase());
            if ca != cb {
                return ca.cmp(&cb);
            }
            i += 1;
            j += 1;
        }
    }
    (a.len() - i).cmp(&(b.len() - j))
}

fn trim_leading_zeros(digits: &[u8]) -> &[u8] {
    let first = digits.iter().position(|&d| d != b'0').unwrap_or(digits.len() - 1);
    &digits[first..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::isp::frame::Frame;
    use crate::isp::input::SourceKind;

    fn mock_frame() -> DecodedFrame {
        DecodedFrame {
            frame: Frame::filled(4, 4, 1, 100.0),
            kind: SourceKind::Pnm,
            bpp: Some(10),
            camera: None,
        }
    }

    struct MockSource {
        should_fail: bool,
    }

    impl FrameSource for MockSource {
        fn read(&self, _path: &Path, _hints: &ReadHints) -> Result<DecodedFrame> {
            if self.should_fail {
                return Err(IspError::Decode("mock decode error".to_string()));
            }
            Ok(mock_frame())
        }
    }

    #[derive(Clone)]
    struct MockSink {
        should_fail: bool,
        written: Arc<Mutex<Vec<(PathBuf, OutputFormat)>>>,
    }

    impl MockSink {
        fn new() -> Self {
            Self {
                should_fail: false,
                written: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl FrameSink for MockSink {
        fn write(&self, path: &Path, _frame: &QuantizedFrame, format: OutputFormat) -> Result<()> {
            if self.should_fail {
                return Err(IspError::Encode("mock encode error".to_string()));
            }
            self.written.lock().unwrap().push((path.to_path_buf(), format));
            Ok(())
        }
    }

    fn driver_with(source: MockSource, sink: MockSink, config: IspConfig) -> BatchDriver<MockSource, MockSink> {
        BatchDriver::with_custom(source, sink, config, None, CancelToken::new())
    }

    #[test]
    fn successful_batch_writes_every_file() {
        let sink = MockSink::new();
        let driver = driver_with(
            MockSource { should_fail: false },
            sink.clone(),
            IspConfig::default(),
        );
        let inputs = vec![PathBuf::from("a.pgm"), PathBuf::from("b.pgm")];
        let timings = driver.process_all(&inputs).unwrap();
        assert_eq!(timings.steps().len(), 2);
        let written = sink.written.lock().unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0].0, PathBuf::from("a.ppm"));
    }

    #[test]
    fn inputs_process_in_natural_sort_order() {
        let sink = MockSink::new();
        let driver = driver_with(
            MockSource { should_fail: false },
            sink.clone(),
            IspConfig::default(),
        );
        let inputs = vec![
            PathBuf::from("img10.pgm"),
            PathBuf::from("img2.pgm"),
            PathBuf::from("img1.pgm"),
        ];
        driver.process_all(&inputs).unwrap();
        let written = sink.written.lock().unwrap();
        let names: Vec<_> = written.iter().map(|(p, _)| p.clone()).collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("img1.ppm"),
                PathBuf::from("img2.ppm"),
                PathBuf::from("img10.ppm"),
            ]
        );
    }

    #[test]
    fn source_failure_aborts_the_batch() {
        let sink = MockSink::new();
        let driver = driver_with(MockSource { should_fail: true }, sink.clone(), IspConfig::default());
        let err = driver
            .process_all(&[PathBuf::from("a.pgm")])
            .unwrap_err();
        assert!(matches!(err, IspError::Decode(_)));
        assert!(sink.written.lock().unwrap().is_empty());
    }

    #[test]
    fn sink_failure_aborts_the_batch() {
        let mut sink = MockSink::new();
        sink.should_fail = true;
        let driver = driver_with(MockSource { should_fail: false }, sink, IspConfig::default());
        let err = driver
            .process_all(&[PathBuf::from("a.pgm")])
            .unwrap_err();
        assert!(matches!(err, IspError::Encode(_)));
    }

    #[test]
    fn cancelled_token_stops_before_any_processing() {
        let sink = MockSink::new();
        let cancel = CancelToken::new();
        cancel.cancel();
        let driver = BatchDriver::with_custom(
            MockSource { should_fail: false },
            sink.clone(),
            IspConfig::default(),
            None,
            cancel,
        );
        let err = driver
            .process_all(&[PathBuf::from("a.pgm")])
            .unwrap_err();
        assert!(matches!(err, IspError::Interrupted));
        assert!(sink.written.lock().unwrap().is_empty());
    }

    #[test]
    fn empty_input_list_is_a_usage_error() {
        let driver = driver_with(
            MockSource { should_fail: false },
            MockSink::new(),
            IspConfig::default(),
        );
        assert!(matches!(
            driver.process_all(&[]).unwrap_err(),
            IspError::Usage(_)
        ));
    }

    #[test]
    fn debug_mode_adds_the_overflow_diagnostic() {
        let sink = MockSink::new();
        let config = IspConfig {
            debug: true,
            ..Default::default()
        };
        let driver = driver_with(MockSource { should_fail: false }, sink.clone(), config);
        driver.process_all(&[PathBuf::from("a.pgm")]).unwrap();
        let written = sink.written.lock().unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(written[1].0, PathBuf::from("overflow.ppm"));
        assert_eq!(written[1].1, OutputFormat::Ppm8);
    }

    #[test]
    fn end_to_end_pgm_to_ppm_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("shot.pgm");
        // 2x2 10-bit PGM ramp.
        let mut bytes = b"P5\n2 2\n1023\n".to_vec();
        for v in [0u16, 341, 682, 1023] {
            bytes.extend_from_slice(&v.to_be_bytes());
        }
        std::fs::write(&input, bytes).unwrap();

        let outdir = dir.path().join("out");
        std::fs::create_dir(&outdir).unwrap();
        let driver = BatchDriver::new(
            IspConfig::default(),
            Some(outdir.clone()),
            CancelToken::new(),
        );
        driver.process_all(&[input]).unwrap();

        let produced = outdir.join("shot.ppm");
        let decoded = input::read_frame(&produced, &ReadHints::default()).unwrap();
        assert_eq!(
            (decoded.frame.width, decoded.frame.height, decoded.frame.channels),
            (2, 2, 3)
        );
        // The saturated B cell of the RGGB tile maps to full scale.
        assert_eq!(decoded.frame.get(1, 1, 2), 65535.0);
    }

    #[test]
    fn natural_ordering_rules() {
        assert_eq!(natural_cmp("img2.pgm", "img10.pgm"), Ordering::Less);
        assert_eq!(natural_cmp("img10.pgm", "img10.pgm"), Ordering::Equal);
        assert_eq!(natural_cmp("b1", "a2"), Ordering::Greater);
        assert_eq!(natural_cmp("IMG5", "img07"), Ordering::Less);
        assert_eq!(natural_cmp("frame", "frame1"), Ordering::Less);
    }
}

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rawtorgb::isp::{
    BayerPattern, Frame, FrameConfig, GammaMode, OutputClass, OutputFormat, quantize, run,
};

fn synthetic_bayer(width: usize, height: usize) -> Frame {
    let data = (0..width * height)
        .map(|i| ((i.wrapping_mul(2654435761)) % 4096) as f32)
        .collect();
    Frame::new(width, height, 1, data)
}

fn full_config(width: usize, height: usize) -> FrameConfig {
    FrameConfig {
        width,
        height,
        bpp: 12,
        max_value: 4095.0,
        black_level: 64.0,
        white_level: 4095.0,
        bayer: BayerPattern::Rggb,
        demosaic: true,
        downsample: false,
        lsc: None,
        wb_gains: Some((1.8, 1.4)),
        ccm: Some([[1.5, -0.3, -0.2], [-0.1, 1.2, -0.1], [0.0, -0.4, 1.4]]),
        tonemap: None,
        denoise: 0.0,
        gamma: Some(GammaMode::Srgb),
        out_format: OutputFormat::Ppm,
        debug: false,
    }
}

fn benchmark_pipeline_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_by_size");

    let sizes = vec![(256, 256, "256x256"), (512, 512, "512x512"), (1024, 1024, "1024x1024")];

    for (width, height, label) in sizes {
        let frame = synthetic_bayer(width, height);
        let config = full_config(width, height);

        group.bench_with_input(BenchmarkId::from_parameter(label), &frame, |b, frame| {
            b.iter(|| {
                let out = run(black_box(frame.clone()), &config).unwrap();
                quantize(out.frame, OutputClass::Bits16)
            })
        });
    }

    group.finish();
}

fn benchmark_debug_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("debug_mode");
    let frame = synthetic_bayer(512, 512);

    for debug in [false, true] {
        let config = FrameConfig {
            debug,
            ..full_config(512, 512)
        };
        group.bench_with_input(
            BenchmarkId::from_parameter(if debug { "debug" } else { "normal" }),
            &frame,
            |b, frame| b.iter(|| run(black_box(frame.clone()), &config).unwrap()),
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_pipeline_sizes, benchmark_debug_overhead);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use speech_emotion::audio::{normalize_duration, resample, Waveform};
use speech_emotion::features::{package, LogMelExtractor, MelConfig};

fn speech_like(n: usize, sample_rate: u32) -> Vec<f32> {
    (0..n)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            let f1 = (2.0 * std::f32::consts::PI * 200.0 * t).sin() * 0.3;
            let f2 = (2.0 * std::f32::consts::PI * 500.0 * t).sin() * 0.2;
            let f3 = (2.0 * std::f32::consts::PI * 1500.0 * t).sin() * 0.1;
            f1 + f2 + f3
        })
        .collect()
}

fn benchmark_log_mel(c: &mut Criterion) {
    let mut group = c.benchmark_group("Log-mel 3s utterance");
    let extractor = LogMelExtractor::new(MelConfig::default()).unwrap();
    let audio = speech_like(66150, 22050);

    group.bench_function("compute", |b| {
        b.iter(|| {
            let _ = black_box(extractor.compute(black_box(&audio)));
        });
    });

    group.bench_function("compute_and_package", |b| {
        b.iter(|| {
            let spec = extractor.compute(black_box(&audio)).unwrap();
            let _ = black_box(package(spec, 128));
        });
    });

    group.finish();
}

fn benchmark_resample_to_canonical(c: &mut Criterion) {
    let mut group = c.benchmark_group("Resample 3s to 22.05kHz");

    for rate in [16000u32, 44100, 48000].iter() {
        let input = speech_like(*rate as usize * 3, *rate);
        group.bench_with_input(BenchmarkId::new("rate", rate), rate, |b, &rate| {
            b.iter(|| {
                let _ = black_box(resample(black_box(&input), rate, 22050));
            });
        });
    }

    group.finish();
}

fn benchmark_front_end(c: &mut Criterion) {
    let extractor = LogMelExtractor::new(MelConfig::default()).unwrap();
    let samples = speech_like(48000 * 4, 48000);

    c.bench_function("front end 4s at 48kHz", |b| {
        b.iter(|| {
            let waveform = Waveform::new(samples.clone(), 48000).resampled(22050).unwrap();
            let fixed = normalize_duration(waveform, 3.0);
            let _ = black_box(extractor.extract(&fixed));
        });
    });
}

criterion_group!(
    benches,
    benchmark_log_mel,
    benchmark_resample_to_canonical,
    benchmark_front_end
);

criterion_main!(benches);

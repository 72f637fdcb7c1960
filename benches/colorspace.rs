//! Benchmarks for color conversion across the color-services spaces.
//!
//! Run with:
//!   cargo bench -- colorspace

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use filterhost::color::{ColorSpace, Components, convert, rgb_components};

/// Colors converted per iteration
const SAMPLES: usize = 4096;

fn samples() -> Vec<Components> {
    (0..SAMPLES)
        .map(|i| rgb_components((i * 7) as u8, (i * 13) as u8, (i * 29) as u8))
        .collect()
}

fn bench_from_rgb(c: &mut Criterion) {
    let mut group = c.benchmark_group("from_rgb");
    let input = samples();
    group.throughput(Throughput::Elements(SAMPLES as u64));

    for to in ColorSpace::ALL {
        group.bench_with_input(BenchmarkId::new("convert", format!("{to:?}")), &input, |b, input| {
            b.iter(|| {
                for c in input {
                    std::hint::black_box(convert(ColorSpace::Rgb, to, *c));
                }
            });
        });
    }

    group.finish();
}

fn bench_indirect(c: &mut Criterion) {
    let mut group = c.benchmark_group("indirect");
    let lab: Vec<Components> = samples()
        .into_iter()
        .map(|c| convert(ColorSpace::Rgb, ColorSpace::Lab, c))
        .collect();
    group.throughput(Throughput::Elements(SAMPLES as u64));

    for to in [ColorSpace::Xyz, ColorSpace::Hsb, ColorSpace::Cmyk] {
        group.bench_with_input(BenchmarkId::new("from_lab", format!("{to:?}")), &lab, |b, input| {
            b.iter(|| {
                for c in input {
                    std::hint::black_box(convert(ColorSpace::Lab, to, *c));
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_from_rgb, bench_indirect);
criterion_main!(benches);

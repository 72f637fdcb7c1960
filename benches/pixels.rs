//! Benchmarks for tile delivery: planar gathers and scatters, padded reads
//! and selection blending.
//!
//! Run with:
//!   cargo bench -- pixels

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use filterhost::engine::pixels;
use filterhost::engine::tiles::{self, Padding, TileRequest};
use filterhost::geometry::Rect;
use filterhost::surface::{Bgra8, Surface};

/// Common tile sizes to benchmark
const TILES: &[(u32, u32, &str)] = &[(64, 64, "64"), (256, 256, "256"), (1024, 1024, "1024")];

fn gradient(width: u32, height: u32) -> Surface {
    let mut surface = Surface::new(width, height).unwrap();
    for y in 0..height {
        for (x, p) in surface.row_mut(y).iter_mut().enumerate() {
            *p = Bgra8::from_rgba(x as u8, y as u8, (x ^ y as usize) as u8, 255);
        }
    }
    surface
}

fn bench_gather(c: &mut Criterion) {
    let mut group = c.benchmark_group("gather");

    for &(width, height, name) in TILES {
        let surface = gradient(width, height);
        group.throughput(Throughput::Elements(u64::from(width * height)));

        for planes in [1usize, 3, 4] {
            let mut out = vec![0u8; surface.pixels().len() * planes];
            group.bench_with_input(
                BenchmarkId::new(format!("{planes}_planes"), name),
                &surface,
                |b, surface| {
                    b.iter(|| {
                        pixels::gather(surface.pixels(), 0, planes, &mut out);
                        std::hint::black_box(&out);
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_scatter(c: &mut Criterion) {
    let mut group = c.benchmark_group("scatter");

    for &(width, height, name) in TILES {
        let mut surface = gradient(width, height);
        let bytes = vec![0x80u8; (width * height * 3) as usize];
        group.throughput(Throughput::Bytes(bytes.len() as u64));

        group.bench_with_input(BenchmarkId::new("rgb", name), &bytes, |b, bytes| {
            b.iter(|| {
                pixels::scatter(bytes, 0, 3, surface.pixels_mut());
                std::hint::black_box(surface.pixels());
            });
        });
    }

    group.finish();
}

fn bench_padded_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("padded_read");
    let surface = gradient(512, 512);

    for (padding, name) in [
        (Padding::None, "none"),
        (Padding::EdgeReplicate, "edge"),
        (Padding::Fixed(0xFF), "fixed"),
    ] {
        // A tile hanging 32 pixels over every edge.
        let request = TileRequest {
            rect: Rect::new(-32, -32, 544, 544),
            lo_plane: 0,
            planes: 4,
            padding,
        };
        let mut out = Vec::new();
        group.throughput(Throughput::Bytes(request.len() as u64));
        group.bench_function(name, |b| {
            b.iter(|| {
                tiles::read_surface(&surface, &request, &mut out).unwrap();
                std::hint::black_box(&out);
            });
        });
    }

    group.finish();
}

fn bench_blend(c: &mut Criterion) {
    let original = gradient(512, 512);
    let mut filtered = original.clone();
    for p in filtered.pixels_mut() {
        p.r = 255 - p.r;
    }

    c.bench_function("blend_512", |b| {
        b.iter(|| {
            let mut acc = 0u32;
            for (i, (o, f)) in original.pixels().iter().zip(filtered.pixels()).enumerate() {
                acc = acc.wrapping_add(u32::from(pixels::blend(*o, *f, i as u8).r));
            }
            std::hint::black_box(acc)
        });
    });
}

criterion_group!(benches, bench_gather, bench_scatter, bench_padded_read, bench_blend);
criterion_main!(benches);

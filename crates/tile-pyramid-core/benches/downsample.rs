use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use image::{Rgba, RgbaImage};
use std::hint::black_box;
use tile_pyramid_core::blank_tile;
use tile_pyramid_core::prelude::*;

fn noise_tile(size: u32) -> RgbaImage {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    RgbaImage::from_fn(size, size, |_, _| {
        Rgba([rng.r#gen(), rng.r#gen(), rng.r#gen(), rng.gen_range(1..=255)])
    })
}

fn bench_downsample(c: &mut Criterion) {
    let mut group = c.benchmark_group("downsample");

    for size in [64u32, 256, 512] {
        let children: Vec<RgbaImage> = (0..4).map(|_| noise_tile(size)).collect();
        group.throughput(Throughput::Elements(u64::from(size) * u64::from(size) * 4));

        group.bench_with_input(BenchmarkId::new("group_of_four", size), &children, |b, children| {
            b.iter(|| {
                let mut dst = blank_tile(size);
                for (sector, src) in Sector::ALL.iter().zip(children) {
                    downsample_into(src, &mut dst, *sector, size).expect("downsample");
                }
                black_box(dst)
            });
        });
    }

    group.finish();
}

fn bench_tree_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("quadtree");

    for depth in [3usize, 5] {
        let paths = all_possible_paths(depth);
        group.throughput(Throughput::Elements(paths.len() as u64));
        group.bench_with_input(BenchmarkId::new("insert_full_level", depth), &paths, |b, paths| {
            b.iter(|| {
                let tree = QuadTree::new();
                for p in paths {
                    let _ = tree.insert(p, ());
                }
                black_box(tree.depth())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_downsample, bench_tree_insert);
criterion_main!(benches);

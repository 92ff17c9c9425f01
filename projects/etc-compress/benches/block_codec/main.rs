use criterion::{black_box, criterion_group, criterion_main, Criterion};
use etc_compress::decode::decode_block;
use etc_compress::encode::{process_rgb, process_rgb_etc2};

fn gradient_tile() -> [u32; 16] {
    core::array::from_fn(|k| {
        let val = 40 + (k as u32 / 4) * 12 + (k as u32 % 4) * 6;
        0xFF00_0000 | val << 16 | val << 8 | val
    })
}

fn bench_kernels(c: &mut Criterion) {
    let tile = gradient_tile();

    let mut group = c.benchmark_group("block_encode");
    group.bench_function("process_rgb", |b| {
        b.iter(|| process_rgb(black_box(&tile)));
    });
    group.bench_function("process_rgb_etc2", |b| {
        b.iter(|| process_rgb_etc2(black_box(&tile)));
    });

    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    if etc_compress::cpu_detect::has_avx2() {
        use etc_compress::encode::avx2;
        group.bench_function("process_rgb_avx2", |b| {
            b.iter(|| unsafe { avx2::process_rgb_avx2(black_box(&tile)) });
        });
        group.bench_function("process_rgb_etc2_avx2", |b| {
            b.iter(|| unsafe { avx2::process_rgb_etc2_avx2(black_box(&tile)) });
        });
    }
    group.finish();

    let word = process_rgb(&tile);
    c.bench_function("block_decode", |b| {
        b.iter(|| decode_block(black_box(word)));
    });
}

criterion_group!(benches, bench_kernels);
criterion_main!(benches);

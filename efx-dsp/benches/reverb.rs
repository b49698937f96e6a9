//! Late-reflection reverberator benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use efx_dsp::reverb::{IoMode, ReverbInstance};

fn bench_reverb_insert_block(c: &mut Criterion) {
    let mut reverb = ReverbInstance::init(IoMode::Insert, 48_000.0);
    reverb.set_enabled(true);

    let in_l: Vec<f32> = (0..256).map(|i| (i as f32 * 0.02).sin()).collect();
    let in_r: Vec<f32> = (0..256).map(|i| (i as f32 * 0.02).cos()).collect();
    let mut out_l = vec![0.0_f32; 256];
    let mut out_r = vec![0.0_f32; 256];

    c.bench_function("reverb_insert_256", |b| {
        b.iter(|| {
            reverb
                .process_insert(
                    black_box(&in_l),
                    black_box(&in_r),
                    &mut out_l,
                    &mut out_r,
                    256,
                )
                .unwrap();
        })
    });
}

fn bench_reverb_auxiliary_block(c: &mut Criterion) {
    let mut reverb = ReverbInstance::init(IoMode::Auxiliary, 48_000.0);
    reverb.set_enabled(true);

    let mono_in: Vec<f32> = (0..256).map(|i| (i as f32 * 0.02).sin()).collect();
    let mut out_l = vec![0.0_f32; 256];
    let mut out_r = vec![0.0_f32; 256];

    c.bench_function("reverb_auxiliary_256", |b| {
        b.iter(|| {
            reverb
                .process_auxiliary(black_box(&mono_in), &mut out_l, &mut out_r, 256)
                .unwrap();
        })
    });
}

criterion_group!(benches, bench_reverb_insert_block, bench_reverb_auxiliary_block);
criterion_main!(benches);

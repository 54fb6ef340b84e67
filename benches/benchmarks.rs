use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use faer::Mat;
use runica::{Runica, RunicaConfig};
use std::hint::black_box;

fn generate_data(channels: usize, samples: usize, seed: u64) -> Mat<f64> {
    let mut data = Mat::zeros(channels, samples);
    let mut state = seed;

    for i in 0..channels {
        for j in 0..samples {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            let u = (state >> 33) as f64 / (1u64 << 31) as f64;
            // Laplace distribution
            data[(i, j)] = if u < 0.5 {
                (2.0 * u).ln()
            } else {
                -(2.0 * (1.0 - u)).ln()
            };
        }
    }

    // Mix with random matrix
    let mut mixing = Mat::zeros(channels, channels);
    for i in 0..channels {
        for j in 0..channels {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            mixing[(i, j)] = (state >> 33) as f64 / (1u64 << 31) as f64 - 0.5;
        }
    }

    &mixing * &data
}

fn bench_runica(c: &mut Criterion) {
    let mut group = c.benchmark_group("runica");

    for samples in [1000, 5000, 10000] {
        for channels in [4, 16, 32] {
            let data = generate_data(channels, samples, 42);

            group.bench_with_input(
                BenchmarkId::new("fit", format!("{}x{}", channels, samples)),
                &data,
                |b, data| {
                    let config = RunicaConfig::builder().maxsteps(50).seed(42).build();
                    b.iter(|| Runica::fit_with_config(black_box(data.as_ref()), &config))
                },
            );
        }
    }

    group.finish();
}

fn bench_extended(c: &mut Criterion) {
    let mut group = c.benchmark_group("runica_extended");

    for channels in [4, 16] {
        let data = generate_data(channels, 5000, 7);

        group.bench_with_input(
            BenchmarkId::new("fit", format!("{}x5000", channels)),
            &data,
            |b, data| {
                let config = RunicaConfig::builder()
                    .extended(true)
                    .maxsteps(50)
                    .seed(7)
                    .build();
                b.iter(|| Runica::fit_with_config(black_box(data.as_ref()), &config))
            },
        );
    }

    group.finish();
}

fn criterion_config() -> Criterion {
    Criterion::default()
        .measurement_time(std::time::Duration::from_secs(15))
        .sample_size(20)
}

criterion_group! {
    name = benches;
    config = criterion_config();
    targets = bench_runica, bench_extended
}
criterion_main!(benches);

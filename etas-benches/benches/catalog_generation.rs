//! Catalog generation throughput benchmarks.
//!
//! Measures the time to drive `calc_all_gen` to exhaustion across catalog
//! sizes and branch ratios, using the productivity exponent solved by
//! `calc_inv_branch_ratio` so each series targets a known branch ratio.
#![allow(missing_docs, reason = "Criterion macros generate undocumented items")]
#![allow(
    clippy::expect_used,
    reason = "benchmark setup is infallible for valid constants"
)]
#![allow(
    clippy::shadow_reuse,
    reason = "Criterion bench_with_input closures rebind parameter names"
)]
#![allow(
    clippy::excessive_nesting,
    reason = "Criterion bench_with_input + b.iter pattern requires deep nesting"
)]

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use etas_benches::params::CatalogBenchParams;
use etas_core::{
    CatalogBuilder, CatalogGenerator, CatalogParams, EtasRng, GenerationInfo, Rupture,
    calc_inv_branch_ratio,
};

/// Seed used for all PRNG streams in this benchmark.
const SEED: u64 = 42;

/// Target generation sizes to benchmark.
const GEN_SIZE_TARGETS: &[f64] = &[50.0, 200.0, 1_000.0];

/// Branch ratios to benchmark, spanning sub-critical to near-critical.
const BRANCH_RATIOS: &[f64] = &[0.5, 0.9];

fn build_params(gen_size_target: f64, branch_ratio: f64) -> CatalogParams {
    let tint = 365.0;
    let seed_params = CatalogParams::new(
        0.0, 1.1, 0.01, 1.0, 1.0, 3.0, 8.0, 3.0, 3.5, 8.0, 0.0, tint, 0.0, gen_size_target, 30,
    )
    .expect("seed parameters must be valid");
    let a = calc_inv_branch_ratio(branch_ratio, &seed_params, tint);
    CatalogParams::new(
        a, 1.1, 0.01, 1.0, 1.0, 3.0, 8.0, 3.0, 3.5, 8.0, 0.0, tint, 0.0, gen_size_target, 30,
    )
    .expect("solved parameters must be valid")
}

fn catalog_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("catalog_generation");
    group.sample_size(10);

    for &gen_size_target in GEN_SIZE_TARGETS {
        for &branch_ratio in BRANCH_RATIOS {
            let bench_params = CatalogBenchParams {
                gen_size_target,
                branch_ratio,
                gen_count_max: 30,
            };
            let params = build_params(gen_size_target, branch_ratio);
            let seed = Rupture::seed(0.0, 6.0, 0.0, 0.0, 0.0);
            let seed_info = GenerationInfo::new(6.0, 6.0);

            group.bench_with_input(
                BenchmarkId::from_parameter(&bench_params),
                &(params, seed, seed_info),
                |b, (params, seed, seed_info)| {
                    b.iter(|| {
                        let mut builder = CatalogBuilder::new();
                        builder
                            .begin_catalog(*params, &[*seed], *seed_info)
                            .expect("begin_catalog must succeed");
                        let mut generator = CatalogGenerator::new();
                        let mut rng = EtasRng::from_seed(SEED);
                        generator
                            .calc_all_gen(&mut builder, &mut rng)
                            .expect("calc_all_gen must succeed");
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, catalog_generation);
criterion_main!(benches);

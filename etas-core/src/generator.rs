//! Drives a [`CatalogBuilder`] through successive generations (§4.5), the
//! algorithmic heart of the simulation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::catalog::CatalogBuilder;
use crate::error::Result;
use crate::rng::EtasRng;
use crate::rupture::{GenerationInfo, Rupture};
use crate::stats::{
    SMALL_EXPECTED_COUNT_TERMINATION, TOTAL_RATE_UNDERFLOW, calc_k_corr, gr_inv_rate, gr_rate,
};

/// Cooperative cancellation handle, polled at the top of each generation
/// step (§5). Cloning shares the same underlying flag; call
/// [`CancellationToken::cancel`] from any thread that owns a clone to
/// request the generator stop at the next generation boundary.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that is not yet cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. The generator observes this at the next
    /// generation boundary, not mid-generation (§5).
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Returns `true` if cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Scratch workspace reused across `calc_next_gen` calls, growing by
/// doubling to avoid per-generation reallocation (§3, §5).
#[derive(Clone, Debug, Default)]
struct Workspace {
    cumulative_omori_rate: Vec<f64>,
    child_count: Vec<u64>,
}

impl Workspace {
    fn ensure_capacity(&mut self, n: usize) {
        if self.cumulative_omori_rate.len() < n {
            let mut capacity = self.cumulative_omori_rate.len().max(1);
            while capacity < n {
                capacity *= 2;
            }
            self.cumulative_omori_rate.resize(capacity, 0.0);
            self.child_count.resize(capacity, 0);
        }
    }
}

/// Drives a [`CatalogBuilder`] through successive generations using the
/// random generator (C1) and stats kernel (C2) (§2, §4.5).
///
/// Strictly single-owner (§5): only one thread may drive a given
/// `CatalogGenerator` at a time. Independent simulations should each own
/// their own generator, builder, and RNG.
#[derive(Debug)]
pub struct CatalogGenerator {
    workspace: Workspace,
    cancellation: CancellationToken,
}

impl Default for CatalogGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogGenerator {
    /// Builds a generator with an empty scratch workspace and no
    /// cancellation requested.
    #[must_use]
    pub fn new() -> Self {
        Self {
            workspace: Workspace::default(),
            cancellation: CancellationToken::new(),
        }
    }

    /// Builds a generator sharing the given cancellation token.
    #[must_use]
    pub fn with_cancellation(cancellation: CancellationToken) -> Self {
        Self {
            workspace: Workspace::default(),
            cancellation,
        }
    }

    /// The cancellation token this generator observes.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Produces the next generation of aftershocks from the builder's last
    /// generation, returning the number of children produced (0 signals
    /// termination) (§4.5).
    ///
    /// Precondition: `builder` is `CatalogOpen` with at least one
    /// generation already populated.
    ///
    /// # Errors
    /// Propagates any [`crate::error::EtasError`] from builder protocol
    /// misuse (the caller is expected to have `builder` in the correct
    /// state; this is not a normal-path error).
    #[instrument(level = "debug", skip(self, builder, rng), err)]
    #[expect(
        clippy::float_arithmetic,
        reason = "the generation step is inherently numerical: rate sums, the GR/Omori closed forms, and expected-count recomputation"
    )]
    #[expect(
        clippy::indexing_slicing,
        reason = "all indices into the scratch workspace are bounded by n, which ensure_capacity grew the workspace to cover"
    )]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "gen_count is bounded by gen_count_max (a u32) once the catalog is under way"
    )]
    pub fn calc_next_gen(&mut self, builder: &mut CatalogBuilder, rng: &mut EtasRng) -> Result<u64> {
        if self.cancellation.is_cancelled() {
            debug!("cancellation observed at generation boundary");
            return Ok(0);
        }

        let params = builder.catalog().cat_params()?;
        let gen_count = builder.catalog().gen_count();
        if gen_count as u32 >= params.gen_count_max() {
            return Ok(0);
        }

        let last_gen = gen_count - 1;
        let n = builder.catalog().gen_size(last_gen)?;
        if n == 0 {
            return Ok(0);
        }

        self.workspace.ensure_capacity(n);
        let cum_omori_rate = &mut self.workspace.cumulative_omori_rate[..n];
        let child_count = &mut self.workspace.child_count[..n];
        child_count.fill(0);

        let mut running = 0.0_f64;
        for j in 0..n {
            let parent = builder.catalog().rup(last_gen, j)?;
            let rate = parent.k_prod
                * crate::rng::omori_rate_shifted(
                    params.p(),
                    params.c(),
                    parent.t_day,
                    params.teps(),
                    params.t_begin(),
                    params.t_end(),
                );
            running += rate;
            cum_omori_rate[j] = running;
        }

        let omega = running;
        if omega < TOTAL_RATE_UNDERFLOW {
            debug!(omega, "total Omori rate underflowed, terminating");
            return Ok(0);
        }

        let e_target_over_omega = params.gen_size_target() / omega;
        let mut next_m_min =
            gr_inv_rate(params.b(), params.m_ref(), params.m_max_sim(), e_target_over_omega);

        let mut expected = params.gen_size_target();
        if next_m_min < params.m_min_lo() {
            next_m_min = params.m_min_lo();
            expected = omega * gr_rate(params.b(), params.m_ref(), next_m_min, params.m_max_sim());
        } else if next_m_min > params.m_min_hi() {
            next_m_min = params.m_min_hi();
            expected = omega * gr_rate(params.b(), params.m_ref(), next_m_min, params.m_max_sim());
        }

        if expected < SMALL_EXPECTED_COUNT_TERMINATION {
            debug!(expected, "expected child count below termination threshold");
            return Ok(0);
        }

        let total_children = rng.poisson_sample(expected);
        if total_children == 0 {
            return Ok(0);
        }

        for _ in 0..total_children {
            let i = rng.cumulative_sample(cum_omori_rate, n);
            child_count[i] += 1;
        }

        let next_info = GenerationInfo::new(next_m_min, params.m_max_sim());
        builder.begin_generation(next_info)?;
        for j in 0..n {
            let count = child_count[j];
            if count == 0 {
                continue;
            }
            let parent = builder.catalog().rup(last_gen, j)?;
            for _ in 0..count {
                let t_day = rng.omori_sample_shifted(
                    params.p(),
                    params.c(),
                    parent.t_day,
                    params.t_begin(),
                    params.t_end(),
                );
                let rup_mag = rng.gr_sample(params.b(), next_m_min, params.m_max_sim());
                let k_prod = calc_k_corr(parent.rup_mag, &params, next_m_min, params.m_max_sim());
                builder.add_rup(Rupture::child(
                    t_day,
                    rup_mag,
                    k_prod,
                    j,
                    parent.x_km,
                    parent.y_km,
                ))?;
            }
        }
        builder.end_generation()?;

        Ok(total_children)
    }

    /// Drives `calc_next_gen` to exhaustion, then freezes the catalog via
    /// `end_catalog`. Returns the total number of generations produced.
    ///
    /// # Errors
    /// Propagates any [`crate::error::EtasError`] surfaced by the builder.
    #[instrument(level = "debug", skip(self, builder, rng), err)]
    pub fn calc_all_gen(&mut self, builder: &mut CatalogBuilder, rng: &mut EtasRng) -> Result<usize> {
        loop {
            let produced = self.calc_next_gen(builder, rng)?;
            if produced == 0 {
                break;
            }
        }
        if self.cancellation.is_cancelled() {
            warn!("catalog generation stopped early due to cancellation");
        }
        builder.end_catalog()?;
        Ok(builder.catalog().gen_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::CatalogParams;

    fn dead_catalog_params() -> CatalogParams {
        // Scenario 1: a = -10 drives productivity to near-zero, so the
        // catalog should die out quickly.
        CatalogParams::new(
            -10.0, 1.1, 0.01, 1.0, 1.0, 3.0, 8.0, 3.0, 3.0, 8.0, 0.0, 30.0, 0.0, 100.0, 10,
        )
        .expect("valid scenario parameters")
    }

    fn seed_rupture(params: &CatalogParams, mag: f64) -> Rupture {
        let k = crate::stats::calc_k_corr(mag, params, params.m_min_lo(), params.m_max_sim());
        Rupture::seed(0.0, mag, k, 0.0, 0.0)
    }

    #[test]
    fn dead_catalog_terminates_within_gen_count_max() {
        let params = dead_catalog_params();
        let seed = seed_rupture(&params, 5.0);
        let mut builder = CatalogBuilder::new();
        builder
            .begin_catalog(params, &[seed], GenerationInfo::new(3.0, 8.0))
            .expect("begin_catalog succeeds");

        let mut generator = CatalogGenerator::new();
        let mut rng = EtasRng::from_seed(0xDEAD_BEEF);
        let gen_count = generator
            .calc_all_gen(&mut builder, &mut rng)
            .expect("calc_all_gen succeeds");

        assert!(gen_count <= 10);
        assert!(builder.catalog().total_rupture_count() < 50);
    }

    #[test]
    fn underflow_seed_terminates_after_one_generation() {
        // Scenario 5: a seed with k_prod = 0 makes calc_next_gen return 0
        // on its first call, leaving exactly one generation.
        let params = dead_catalog_params();
        let seed = Rupture::seed(0.0, 5.0, 0.0, 0.0, 0.0);
        let mut builder = CatalogBuilder::new();
        builder
            .begin_catalog(params, &[seed], GenerationInfo::new(3.0, 8.0))
            .expect("begin_catalog succeeds");

        let mut generator = CatalogGenerator::new();
        let mut rng = EtasRng::from_seed(1);
        let gen_count = generator
            .calc_all_gen(&mut builder, &mut rng)
            .expect("calc_all_gen succeeds");

        assert_eq!(gen_count, 1);
    }

    #[test]
    fn identical_seeds_produce_identical_catalogs() {
        // Scenario 6 / P10: determinism under identical seed, params, and
        // seed generation.
        let run = || {
            let params = dead_catalog_params();
            let seed = seed_rupture(&params, 5.0);
            let mut builder = CatalogBuilder::new();
            builder
                .begin_catalog(params, &[seed], GenerationInfo::new(3.0, 8.0))
                .expect("begin_catalog succeeds");
            let mut generator = CatalogGenerator::new();
            let mut rng = EtasRng::from_seed(0xDEAD_BEEF);
            generator
                .calc_all_gen(&mut builder, &mut rng)
                .expect("calc_all_gen succeeds");
            builder.catalog().clone()
        };

        let a = run();
        let b = run();
        assert_eq!(a.gen_count(), b.gen_count());
        assert_eq!(a.total_rupture_count(), b.total_rupture_count());
        for gi in 0..a.gen_count() {
            let size = a.gen_size(gi).expect("generation exists");
            assert_eq!(size, b.gen_size(gi).expect("generation exists"));
            for ri in 0..size {
                assert_eq!(
                    a.rup(gi, ri).expect("rupture exists"),
                    b.rup(gi, ri).expect("rupture exists")
                );
            }
        }
    }

    #[test]
    fn cancellation_stops_generation_at_next_boundary() {
        let params = dead_catalog_params();
        let seed = seed_rupture(&params, 7.5);
        let mut builder = CatalogBuilder::new();
        builder
            .begin_catalog(params, &[seed], GenerationInfo::new(3.0, 8.0))
            .expect("begin_catalog succeeds");

        let token = CancellationToken::new();
        token.cancel();
        let mut generator = CatalogGenerator::with_cancellation(token);
        let mut rng = EtasRng::from_seed(3);
        let gen_count = generator
            .calc_all_gen(&mut builder, &mut rng)
            .expect("calc_all_gen succeeds even when cancelled");

        assert_eq!(gen_count, 1);
    }
}

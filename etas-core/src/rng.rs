//! Deterministic random sampling for the ETAS simulation (§4.1).
//!
//! [`EtasRng`] wraps a `SplitMix64`-seeded [`SmallRng`]: given identical
//! seeds and call sequences, every sampler here produces byte-identical
//! output across platforms, satisfying the cross-platform determinism
//! requirement in spec §4.1. The seed-mixing constants and scheme mirror the
//! per-worker RNG derivation used elsewhere in this codebase for
//! reproducible parallel sampling.

use rand::{Rng, SeedableRng, distributions::Standard, rngs::SmallRng};

/// Below this expected count, `poisson_sample` always returns zero rather
/// than risk an unstable direct-method draw.
pub const SMALL_EXPECTED_COUNT: f64 = 1e-12;

/// `SplitMix64` increment (the 64-bit golden ratio), used for seed mixing.
const SPLITMIX_INCREMENT: u64 = 0x9E37_79B9_7F4A_7C15;
const SPLITMIX_MULT_A: u64 = 0xBF58_476D_1CE4_E5B9;
const SPLITMIX_MULT_B: u64 = 0x94D0_49BB_1331_11EB;

#[inline]
const fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(SPLITMIX_INCREMENT);
    state = (state ^ (state >> 30)).wrapping_mul(SPLITMIX_MULT_A);
    state = (state ^ (state >> 27)).wrapping_mul(SPLITMIX_MULT_B);
    state ^ (state >> 31)
}

/// Derives an independent 64-bit seed for catalog `index` from a caller
/// base seed, so that `num_sim` independent forecast simulations each get a
/// distinct, reproducible PRNG stream.
#[inline]
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    reason = "catalog index is bounded by num_sim, never exceeds u64 range in practice"
)]
pub const fn mix_catalog_seed(base_seed: u64, index: usize) -> u64 {
    let index_u64 = index as u64;
    splitmix64(base_seed ^ (index_u64.wrapping_add(1).wrapping_mul(SPLITMIX_INCREMENT)))
}

/// Closed-form integral `∫_{t1}^{t2} (t+c)^(−p) dt` (§4.1).
///
/// Handles `p` very near 1 via the logarithmic branch, avoiding the
/// cancellation that the `(1−p)`-denominator form would suffer there.
#[must_use]
#[expect(clippy::float_arithmetic, reason = "closed-form Omori rate integral")]
pub fn omori_rate(p: f64, c: f64, t1: f64, t2: f64) -> f64 {
    if (p - 1.0).abs() < 1e-12 {
        ((t2 + c) / (t1 + c)).ln()
    } else {
        let one_minus_p = 1.0 - p;
        ((t2 + c).powf(one_minus_p) - (t1 + c).powf(one_minus_p)) / one_minus_p
    }
}

/// Omori rate shifted to a parent at `t0`, excluding a dead zone of width
/// `teps` immediately after the parent (§4.1). Returns 0 when the window
/// `[t1, t2]` lies entirely within the dead zone.
#[must_use]
#[expect(clippy::float_arithmetic, reason = "shifted-window Omori rate integral")]
pub fn omori_rate_shifted(p: f64, c: f64, t0: f64, teps: f64, t1: f64, t2: f64) -> f64 {
    if t2 <= t0 + teps {
        return 0.0;
    }
    let lo = (t1 - t0).max(teps);
    omori_rate(p, c, lo, t2 - t0)
}

/// Deterministic random source backing the ETAS samplers in §4.1.
///
/// A single `EtasRng` drives exactly one [`crate::generator::CatalogGenerator`]
/// at a time (§5 single-owner rule); independent simulations each own their
/// own instance, seeded via [`mix_catalog_seed`] when run in parallel.
#[derive(Debug)]
pub struct EtasRng {
    inner: SmallRng,
}

impl EtasRng {
    /// Builds a generator seeded deterministically from a 64-bit seed.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            inner: SmallRng::seed_from_u64(splitmix64(seed)),
        }
    }

    /// Draws `u ∈ [0,1)`, uniform and independent between calls.
    #[expect(clippy::float_arithmetic, reason = "uniform draw is a direct float sample")]
    pub fn uniform(&mut self) -> f64 {
        self.inner.sample(Standard)
    }

    /// Draws a non-negative integer with mean `mu` (§4.1).
    ///
    /// Returns 0 for `mu < SMALL_EXPECTED_COUNT`. Uses Knuth's direct
    /// product-of-uniforms method for `mu < 30`, and Hörmann's
    /// ratio-of-uniforms rejection method (PTRS) for larger `mu`, which
    /// stays accurate and bounded in time up to `mu` = 1e18 without
    /// overflow.
    #[expect(
        clippy::float_arithmetic,
        reason = "Poisson sampling is inherently floating-point"
    )]
    #[expect(
        clippy::cast_precision_loss,
        reason = "counts are bounded well under 2^53 for any realistic catalog"
    )]
    #[expect(
        clippy::cast_sign_loss,
        reason = "poisson counts are always non-negative by construction"
    )]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "k is clamped to fit u64 before truncation"
    )]
    pub fn poisson_sample(&mut self, mu: f64) -> u64 {
        if mu < SMALL_EXPECTED_COUNT {
            return 0;
        }
        if mu < 30.0 {
            self.poisson_knuth(mu)
        } else {
            self.poisson_ptrs(mu)
        }
    }

    #[expect(clippy::float_arithmetic, reason = "Knuth's direct product-of-uniforms method")]
    fn poisson_knuth(&mut self, mu: f64) -> u64 {
        let limit = (-mu).exp();
        let mut product = 1.0_f64;
        let mut k: u64 = 0;
        loop {
            product *= self.uniform();
            if product <= limit {
                return k;
            }
            k += 1;
        }
    }

    /// Hörmann's transformed rejection with squeeze (PTRS), suitable for
    /// large `mu` without the overflow risk of the direct method.
    #[expect(clippy::float_arithmetic, reason = "Hörmann's PTRS sampling loop")]
    #[expect(
        clippy::cast_sign_loss,
        clippy::cast_possible_truncation,
        reason = "candidate is checked non-negative before every cast to u64"
    )]
    fn poisson_ptrs(&mut self, mu: f64) -> u64 {
        let b = 0.931 + 2.53 * mu.sqrt();
        let a = -0.059 + 0.02483 * b;
        let inv_alpha = 1.1239 + 1.1328 / (b - 3.4);
        let v_r = 0.9277 - 3.6224 / (b - 2.0);

        loop {
            let u = self.uniform() - 0.5;
            let v = self.uniform();
            let us = 0.5 - u.abs();
            let candidate = ((2.0 * a / us + b) * u + mu + 0.43).floor();
            if candidate < 0.0 {
                continue;
            }
            if us >= 0.07 && v <= v_r {
                return candidate as u64;
            }
            if let Some(k) = self.poisson_ptrs_accept(candidate, us, v, mu, a, b, inv_alpha) {
                return k;
            }
        }
    }

    #[expect(
        clippy::float_arithmetic,
        reason = "acceptance test for the PTRS rejection method"
    )]
    #[expect(clippy::too_many_arguments, reason = "mirrors Hörmann's PTRS acceptance formula")]
    #[expect(
        clippy::cast_sign_loss,
        clippy::cast_possible_truncation,
        reason = "candidate was checked non-negative by the caller"
    )]
    fn poisson_ptrs_accept(
        &self,
        candidate: f64,
        us: f64,
        v: f64,
        mu: f64,
        a: f64,
        b: f64,
        inv_alpha: f64,
    ) -> Option<u64> {
        if candidate > 253.0 || candidate < 0.0 {
            return None;
        }
        let log_v = v.ln() + inv_alpha.ln() - (a / (us * us) + b).ln();
        let log_f = candidate.mul_add(mu.ln(), -mu) - log_factorial(candidate);
        if log_v <= log_f { Some(candidate as u64) } else { None }
    }

    /// Draws a magnitude from Gutenberg–Richter truncated to `[m1, m2]`
    /// (§4.1), falling back to a uniform draw when `b·ln10·(m2−m1)` is too
    /// small to invert without catastrophic cancellation.
    #[expect(clippy::float_arithmetic, reason = "inverse-CDF magnitude sampling")]
    pub fn gr_sample(&mut self, b: f64, m1: f64, m2: f64) -> f64 {
        let u = self.uniform();
        let beta = crate::stats::C_LOG_10 * b;
        let delta = m2 - m1;
        if (beta * delta).abs() <= 1e-16 {
            return u.mul_add(delta, m1);
        }
        m1 - (1.0 - u * (1.0 - (-beta * delta).exp())).ln() / (b * crate::stats::C_LOG_10)
    }

    /// Samples an event time shifted around a parent at `t0`, restricted to
    /// `[max(t1, t0), t2]`, from density ∝ `(τ − t0 + c)^(−p)` (§4.1).
    #[expect(clippy::float_arithmetic, reason = "inverse-CDF time sampling")]
    pub fn omori_sample_shifted(&mut self, p: f64, c: f64, t0: f64, t1: f64, t2: f64) -> f64 {
        let u = self.uniform();
        let lo = (t1 - t0).max(0.0) + c;
        let hi = t2 - t0 + c;
        if (p - 1.0).abs() < 1e-12 {
            t0 - c + lo * (hi / lo).powf(u)
        } else {
            let one_minus_p = 1.0 - p;
            let lo_pow = lo.powf(one_minus_p);
            let hi_pow = hi.powf(one_minus_p);
            let mixed = u.mul_add(hi_pow - lo_pow, lo_pow);
            t0 - c + mixed.powf(1.0 / one_minus_p)
        }
    }

    /// Returns the index `i ∈ [0,n)` selected with probability
    /// proportional to `cum_weights[i] − cum_weights[i−1]` (§4.1), via
    /// binary search on `u · cum_weights[n−1]`.
    ///
    /// # Panics
    /// Panics if `cum_weights` is empty.
    #[expect(clippy::float_arithmetic, reason = "weighted-sample threshold is a float product")]
    #[expect(clippy::indexing_slicing, reason = "bounds checked by the assertion above")]
    pub fn cumulative_sample(&mut self, cum_weights: &[f64], n: usize) -> usize {
        assert!(n > 0 && n <= cum_weights.len(), "cumulative_sample requires a non-empty weight prefix");
        let total = cum_weights[n - 1];
        let target = self.uniform() * total;
        crate::stats::bsearch(&cum_weights[..n], target)
    }
}

/// `ln(n!)` via the Stirling-series approximation used by the PTRS
/// acceptance test; accurate to within float epsilon for the candidate
/// range PTRS explores.
#[expect(clippy::float_arithmetic, reason = "Stirling series for log-factorial")]
fn log_factorial(n: f64) -> f64 {
    if n <= 1.0 {
        return 0.0;
    }
    let inv_n = 1.0 / n;
    n.mul_add(n.ln(), -n)
        + 0.5 * (2.0 * std::f64::consts::PI * n).ln()
        + inv_n / 12.0
        - inv_n.powi(3) / 360.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poisson_sample_below_threshold_is_always_zero() {
        let mut rng = EtasRng::from_seed(1);
        for _ in 0..50 {
            assert_eq!(rng.poisson_sample(1e-13), 0);
        }
    }

    #[test]
    fn uniform_draws_stay_in_unit_interval() {
        let mut rng = EtasRng::from_seed(42);
        for _ in 0..1000 {
            let u = rng.uniform();
            assert!((0.0..1.0).contains(&u));
        }
    }

    #[test]
    fn identical_seeds_reproduce_identical_sequences() {
        let mut a = EtasRng::from_seed(0xDEAD_BEEF);
        let mut b = EtasRng::from_seed(0xDEAD_BEEF);
        for _ in 0..200 {
            assert_eq!(a.uniform(), b.uniform());
        }
    }

    #[test]
    fn gr_sample_stays_within_truncation_bounds() {
        let mut rng = EtasRng::from_seed(7);
        for _ in 0..2000 {
            let m = rng.gr_sample(1.0, 3.0, 8.0);
            assert!((3.0..=8.0).contains(&m));
        }
    }

    #[test]
    fn cumulative_sample_respects_weight_prefix_length() {
        let mut rng = EtasRng::from_seed(9);
        let weights = [1.0, 1.0, 2.0, 2.0];
        for _ in 0..200 {
            let i = rng.cumulative_sample(&weights, weights.len());
            assert!(i < weights.len());
        }
    }

    #[test]
    fn mix_catalog_seed_is_deterministic_and_diverges_across_indices() {
        let a = mix_catalog_seed(123, 0);
        let b = mix_catalog_seed(123, 0);
        let c = mix_catalog_seed(123, 1);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn poisson_sample_mean_is_close_for_moderate_mu() {
        let mut rng = EtasRng::from_seed(99);
        let mu = 12.0;
        let draws = 20_000;
        let mut total = 0.0_f64;
        for _ in 0..draws {
            total += f64_from_u64(rng.poisson_sample(mu));
        }
        let mean = total / f64::from(draws);
        assert!((mean - mu).abs() < 0.5, "mean {mean} too far from {mu}");
    }

    #[test]
    fn poisson_sample_mean_is_close_for_large_mu() {
        let mut rng = EtasRng::from_seed(100);
        let mu = 500.0;
        let draws = 20_000;
        let mut total = 0.0_f64;
        for _ in 0..draws {
            total += f64_from_u64(rng.poisson_sample(mu));
        }
        let mean = total / f64::from(draws);
        assert!((mean - mu).abs() < mu * 0.05, "mean {mean} too far from {mu}");
    }

    #[expect(
        clippy::cast_precision_loss,
        reason = "test-only conversion of a small bounded count for averaging"
    )]
    fn f64_from_u64(value: u64) -> f64 {
        value as f64
    }
}

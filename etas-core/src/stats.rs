//! Pure numerical kernels: productivity/branch-ratio math and array
//! primitives (§4.2).

use crate::params::CatalogParams;
use crate::rng::omori_rate;

/// `ln(10)`, used throughout the productivity and Gutenberg–Richter math.
pub const C_LOG_10: f64 = std::f64::consts::LN_10;

/// Total-rate underflow threshold (§6): below this, a generation's summed
/// Omori rate is treated as zero.
pub const TOTAL_RATE_UNDERFLOW: f64 = 1e-150;

/// Expected-count termination threshold (§4.5 step 6): below this, a
/// generation's adaptively-clamped expected child count is treated as
/// negligible.
pub const SMALL_EXPECTED_COUNT_TERMINATION: f64 = 0.001;

/// `W(x) = (e^x − 1) / x`, the cancellation-safe kernel behind the
/// productivity correction and branch-ratio formulas (§4.2). Uses the
/// degenerate `W ≡ 1` form for `|x| ≤ 1e-16` and `expm1` otherwise.
#[must_use]
#[expect(clippy::float_arithmetic, reason = "cancellation-safe exponential kernel")]
pub fn w_kernel(x: f64) -> f64 {
    if x.abs() <= 1e-16 { 1.0 } else { x.exp_m1() / x }
}

/// Uncorrected productivity `k = 10^(a + α(m0 − m_ref))` (§4.2).
#[must_use]
#[expect(clippy::float_arithmetic, reason = "log-productivity formula")]
pub fn calc_k_uncorr(a: f64, alpha: f64, m0: f64, m_ref: f64) -> f64 {
    10.0_f64.powf(a + alpha * (m0 - m_ref))
}

/// Corrected productivity `k_corr = k · Q` (§4.2), preserving branch ratio
/// across magnitude-range truncations.
#[must_use]
#[expect(clippy::float_arithmetic, reason = "productivity correction formula")]
pub fn calc_k_corr(m0: f64, params: &CatalogParams, gen_mag_min: f64, gen_mag_max: f64) -> f64 {
    let k = calc_k_uncorr(params.a(), params.alpha(), m0, params.m_ref());
    let v = C_LOG_10 * (params.alpha() - params.b());

    let delta_sup_ref = params.m_sup() - params.m_ref();
    let delta_max_min = gen_mag_max - gen_mag_min;

    let numerator = (v * (params.m_ref() - gen_mag_min)).exp()
        * w_kernel(v * delta_sup_ref)
        * delta_sup_ref;
    let denominator = w_kernel(v * delta_max_min) * delta_max_min;

    k * numerator / denominator
}

/// Expected direct-child count per parent at `m_ref` over `[0, tint]`
/// (§4.2): `R = b·ln10 · 10^a · W(v·Δ)·Δ · OmoriIntegral(p,c,0,tint)`.
#[must_use]
#[expect(clippy::float_arithmetic, reason = "branch-ratio closed form")]
pub fn calc_branch_ratio(params: &CatalogParams, tint: f64) -> f64 {
    let v = C_LOG_10 * (params.alpha() - params.b());
    let delta = params.m_sup() - params.m_ref();
    let omori_integral = omori_rate(params.p(), params.c(), 0.0, tint);
    params.b() * C_LOG_10 * 10.0_f64.powf(params.a()) * w_kernel(v * delta) * delta * omori_integral
}

/// Solves for the productivity exponent `a` such that `calc_branch_ratio`
/// evaluates to `n` (§4.2 inverse branch ratio, P9).
#[must_use]
#[expect(clippy::float_arithmetic, reason = "inverse branch-ratio closed form")]
pub fn calc_inv_branch_ratio(n: f64, params: &CatalogParams, tint: f64) -> f64 {
    let v = C_LOG_10 * (params.alpha() - params.b());
    let delta = params.m_sup() - params.m_ref();
    let omori_integral = omori_rate(params.p(), params.c(), 0.0, tint);
    let r_prime = params.b() * C_LOG_10 * w_kernel(v * delta) * delta * omori_integral;
    (n / r_prime).log10()
}

/// Solves `m1` such that the Gutenberg–Richter rate on `[m1, m2]` equals
/// `r` relative to `mref` (§4.1): `m1 = m2 + log10(1 − r(1 − 10^(−b(m2−mref)))) / b`.
///
/// Domain: `r ∈ (0, 10^(b(m2−mref))]`.
#[must_use]
#[expect(clippy::float_arithmetic, reason = "inverse-rate closed form")]
pub fn gr_inv_rate(b: f64, mref: f64, m2: f64, r: f64) -> f64 {
    m2 + (1.0 - r * (1.0 - 10.0_f64.powf(-b * (m2 - mref)))).log10() / b
}

/// Gutenberg–Richter rate (expected count relative to `mref`) on `[m1,m2]`
/// — the inverse of [`gr_inv_rate`], used to recompute a true expected
/// count once `next_m_min` has been clamped (§4.5 step 6):
/// `r = (1 − 10^(−b(m2−m1))) / (1 − 10^(−b(m2−mref)))`.
#[must_use]
#[expect(clippy::float_arithmetic, reason = "GR rate closed form")]
pub fn gr_rate(b: f64, mref: f64, m1: f64, m2: f64) -> f64 {
    let top = 1.0 - 10.0_f64.powf(-b * (m2 - m1));
    let bottom = 1.0 - 10.0_f64.powf(-b * (m2 - mref));
    top / bottom
}

/// Forward (or backward) prefix sum over `x`, written in place (§4.2).
/// `forward = true` computes `y[i] = Σ_{j≤i} x[j]`; `false` computes the
/// suffix sum `y[i] = Σ_{j≥i} x[j]`.
#[expect(clippy::float_arithmetic, reason = "prefix-sum accumulation")]
pub fn cumulate(x: &mut [f64], forward: bool) {
    if forward {
        let mut running = 0.0_f64;
        for v in x.iter_mut() {
            running += *v;
            *v = running;
        }
    } else {
        let mut running = 0.0_f64;
        for v in x.iter_mut().rev() {
            running += *v;
            *v = running;
        }
    }
}

/// Inverse of [`cumulate`]: successive differences reproduce the original
/// array (P8).
#[expect(clippy::float_arithmetic, reason = "successive-difference decumulation")]
#[expect(clippy::indexing_slicing, reason = "every index is bounded by the loop range")]
pub fn decumulate(x: &mut [f64], forward: bool) {
    if forward {
        for i in (1..x.len()).rev() {
            x[i] -= x[i - 1];
        }
    } else {
        for i in 0..x.len().saturating_sub(1) {
            x[i] -= x[i + 1];
        }
    }
}

/// Returns the first index `n` in `(lo, hi]` with `x[n] > v`, treating
/// `x[lo−1] = −∞` and `x[hi] = +∞` (§4.2, P7). `x` must be sorted
/// non-decreasing on `[lo, hi)`.
///
/// # Panics
/// Panics if `hi > x.len()` or `lo > hi`.
#[must_use]
#[expect(clippy::indexing_slicing, reason = "mid is in [left, right) which is within x")]
pub fn bsearch_range(x: &[f64], v: f64, lo: usize, hi: usize) -> usize {
    assert!(lo <= hi && hi <= x.len(), "bsearch_range requires lo <= hi <= x.len()");
    let mut left = lo;
    let mut right = hi;
    while left < right {
        let mid = left + (right - left) / 2;
        let above = x[mid] > v;
        if above {
            right = mid;
        } else {
            left = mid + 1;
        }
    }
    left
}

/// Convenience wrapper over [`bsearch_range`] searching the whole slice.
#[must_use]
pub fn bsearch(x: &[f64], v: f64) -> usize {
    bsearch_range(x, v, 0, x.len())
}

/// Probability-of-exceedance at-or-above index `bsearch(x, v)` within
/// `(lo, hi]` (§4.2): `(hi − bsearch) / (hi − lo)`.
#[must_use]
#[expect(clippy::float_arithmetic, reason = "rank-to-probability conversion")]
#[expect(clippy::cast_precision_loss, reason = "rank counts are small, bounded by num_sim")]
pub fn probex(x: &[f64], v: f64, lo: usize, hi: usize) -> f64 {
    let n = bsearch_range(x, v, lo, hi);
    (hi - n) as f64 / (hi - lo) as f64
}

/// Arithmetic mean of a slice.
///
/// # Panics
/// Panics if `x` is empty.
#[must_use]
#[expect(clippy::float_arithmetic, reason = "mean computation")]
#[expect(clippy::cast_precision_loss, reason = "sample counts fit comfortably in f64")]
pub fn array_average(x: &[f64]) -> f64 {
    assert!(!x.is_empty(), "array_average requires a non-empty slice");
    x.iter().sum::<f64>() / x.len() as f64
}

/// In-place Poisson injection (§4.2): `x[i] += poisson_sample(mean[i])`
/// whenever `mean[i] ≥ SMALL_EXPECTED_COUNT`.
///
/// # Panics
/// Panics if `x` and `mean` differ in length.
pub fn add_poisson_array(x: &mut [u64], mean: &[f64], rng: &mut crate::rng::EtasRng) {
    assert_eq!(x.len(), mean.len(), "add_poisson_array requires matching lengths");
    for (count, &m) in x.iter_mut().zip(mean) {
        if m >= crate::rng::SMALL_EXPECTED_COUNT {
            *count += rng.poisson_sample(m);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::CatalogParams;
    use proptest::prelude::*;

    fn params_for(a: f64, alpha: f64, b: f64) -> CatalogParams {
        CatalogParams::new(
            a, 1.1, 0.01, b, alpha, 3.0, 8.0, 3.0, 3.5, 8.0, 0.0, 365.0, 0.0, 100.0, 20,
        )
        .expect("valid test parameters")
    }

    #[test]
    fn w_kernel_is_one_at_origin() {
        assert!((w_kernel(0.0) - 1.0).abs() < 1e-15);
    }

    #[test]
    fn k_corr_reduces_to_simple_ratio_when_alpha_equals_b() {
        // Scenario 3: for α = b, calc_k_corr reduces exactly to
        // k_uncorr · (m_sup − m_ref) / (m_max − m_min).
        let params = params_for(-2.0, 1.0, 1.0);
        let m0 = 6.0;
        let gen_mag_min = 3.5;
        let gen_mag_max = 7.5;
        let k_uncorr = calc_k_uncorr(params.a(), params.alpha(), m0, params.m_ref());
        let expected =
            k_uncorr * (params.m_sup() - params.m_ref()) / (gen_mag_max - gen_mag_min);
        let actual = calc_k_corr(m0, &params, gen_mag_min, gen_mag_max);
        assert!(
            (actual - expected).abs() < 1e-9 * expected.abs().max(1.0),
            "actual={actual} expected={expected}"
        );
    }

    #[test]
    fn inverse_branch_ratio_round_trips() {
        // P9: calc_branch_ratio(a = calc_inv_branch_ratio(n, ...)) ≈ n.
        let base = params_for(-2.0, 1.0, 1.0);
        let tint = base.t_end() - base.t_begin();
        let target = 0.95;
        let a = calc_inv_branch_ratio(target, &base, tint);
        let params = params_for(a, 1.0, 1.0);
        let achieved = calc_branch_ratio(&params, tint);
        assert!((achieved - target).abs() < 1e-9, "achieved={achieved}");
    }

    #[test]
    fn gr_rate_inverts_gr_inv_rate() {
        // Scenario 4: once next_m_min is clamped, gr_rate must recover the
        // rate gr_inv_rate was solved for.
        let (b, mref, m2, target) = (1.0, 3.0, 8.0, 0.5);
        let m1 = gr_inv_rate(b, mref, m2, target);
        let recovered = gr_rate(b, mref, m1, m2);
        assert!(
            (recovered - target).abs() < 1e-9,
            "recovered={recovered} target={target}"
        );
    }

    #[test]
    #[expect(clippy::indexing_slicing, reason = "windows(2) guarantees two elements")]
    fn cumulate_is_non_decreasing_for_non_negative_input() {
        let mut x = vec![0.1, 0.0, 0.4, 0.2, 0.0, 0.9];
        cumulate(&mut x, true);
        for pair in x.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
    }

    #[test]
    fn decumulate_inverts_cumulate() {
        let original = vec![0.1, 0.0, 0.4, 0.2, 0.0, 0.9];
        let mut x = original.clone();
        cumulate(&mut x, true);
        decumulate(&mut x, true);
        for (a, b) in x.iter().zip(&original) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn bsearch_round_trips_on_sorted_array() {
        let x = [1.0, 2.0, 2.0, 5.0, 9.0];
        for (i, &v) in x.iter().enumerate() {
            assert_eq!(bsearch(&x, v), i + 1, "bsearch({v}) at index {i}");
            assert_eq!(bsearch(&x, v - 1e-9), i, "bsearch({v} - eps) at index {i}");
        }
    }

    proptest! {
        #[test]
        fn bsearch_is_monotonic_in_query(mut xs in proptest::collection::vec(0.0..1000.0_f64, 1..50), v1 in 0.0..1000.0_f64, v2 in 0.0..1000.0_f64) {
            xs.sort_by(|a, b| a.partial_cmp(b).expect("no NaNs in generated floats"));
            let (lo, hi) = if v1 <= v2 { (v1, v2) } else { (v2, v1) };
            prop_assert!(bsearch(&xs, lo) <= bsearch(&xs, hi));
        }

        #[test]
        fn cumulate_decumulate_round_trips_arbitrary_input(xs in proptest::collection::vec(-1e6..1e6_f64, 0..64)) {
            let original = xs.clone();
            let mut buf = xs;
            cumulate(&mut buf, true);
            decumulate(&mut buf, true);
            for (a, b) in buf.iter().zip(&original) {
                prop_assert!((a - b).abs() < 1e-6 * b.abs().max(1.0));
            }
        }
    }
}

//! Parameter handling for the ETAS catalog simulation.
//!
//! [`CatalogParams`] bundles the productivity, Omori decay, Gutenberg–Richter,
//! and simulation-window knobs (§3). It is immutable after construction; the
//! only way to obtain one is [`CatalogParams::new`], which checks every
//! invariant up front so invalid parameters can never reach the simulation
//! loop.

use serde::{Deserialize, Serialize};

use crate::error::{EtasError, Result};

/// Immutable bundle of ETAS productivity, decay, magnitude, and simulation
/// window parameters (§3).
///
/// # Examples
/// ```
/// use etas_core::CatalogParams;
///
/// let params = CatalogParams::new(
///     -2.0, 1.1, 0.01, 1.0, 1.0, 3.0, 8.0, 3.0, 3.5, 8.0, 0.0, 365.0, 0.0, 100.0, 20,
/// )
/// .expect("parameters satisfy all invariants");
/// assert_eq!(params.m_ref(), 3.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogParams {
    a: f64,
    p: f64,
    c: f64,
    b: f64,
    alpha: f64,
    m_ref: f64,
    m_sup: f64,
    m_min_lo: f64,
    m_min_hi: f64,
    m_max_sim: f64,
    t_begin: f64,
    t_end: f64,
    teps: f64,
    gen_size_target: f64,
    gen_count_max: u32,
}

impl CatalogParams {
    /// Constructs a parameter set, validating every invariant from §3.
    ///
    /// # Errors
    /// Returns [`EtasError::InvariantViolated`] when any ordering constraint
    /// (`m_ref ≤ m_min_lo ≤ m_min_hi ≤ m_max_sim ≤ m_sup`, `t_begin < t_end`)
    /// or positivity constraint (`c > 0`, `b > 0`, `teps ≥ 0`,
    /// `gen_size_target ≥ 1`, `gen_count_max ≥ 1`) fails. `p > 0` is checked;
    /// the spec notes typical values are 0.9–1.3 but does not enforce that
    /// range.
    #[expect(clippy::too_many_arguments, reason = "mirrors the flat parameter bundle in spec.md §3")]
    pub fn new(
        a: f64,
        p: f64,
        c: f64,
        b: f64,
        alpha: f64,
        m_ref: f64,
        m_sup: f64,
        m_min_lo: f64,
        m_min_hi: f64,
        m_max_sim: f64,
        t_begin: f64,
        t_end: f64,
        teps: f64,
        gen_size_target: f64,
        gen_count_max: u32,
    ) -> Result<Self> {
        let params = Self {
            a,
            p,
            c,
            b,
            alpha,
            m_ref,
            m_sup,
            m_min_lo,
            m_min_hi,
            m_max_sim,
            t_begin,
            t_end,
            teps,
            gen_size_target,
            gen_count_max,
        };
        params.validate()?;
        Ok(params)
    }

    fn validate(&self) -> Result<()> {
        let invariant = |ok: bool, reason: &str| -> Result<()> {
            if ok {
                Ok(())
            } else {
                Err(EtasError::InvariantViolated {
                    reason: reason.to_owned(),
                })
            }
        };

        invariant(
            self.m_ref <= self.m_min_lo,
            &format!("m_ref ({}) must be <= m_min_lo ({})", self.m_ref, self.m_min_lo),
        )?;
        invariant(
            self.m_min_lo <= self.m_min_hi,
            &format!(
                "m_min_lo ({}) must be <= m_min_hi ({})",
                self.m_min_lo, self.m_min_hi
            ),
        )?;
        invariant(
            self.m_min_hi <= self.m_max_sim,
            &format!(
                "m_min_hi ({}) must be <= m_max_sim ({})",
                self.m_min_hi, self.m_max_sim
            ),
        )?;
        invariant(
            self.m_max_sim <= self.m_sup,
            &format!(
                "m_max_sim ({}) must be <= m_sup ({})",
                self.m_max_sim, self.m_sup
            ),
        )?;
        invariant(self.p > 0.0, &format!("p ({}) must be > 0", self.p))?;
        invariant(self.c > 0.0, &format!("c ({}) must be > 0", self.c))?;
        invariant(self.b > 0.0, &format!("b ({}) must be > 0", self.b))?;
        invariant(
            self.t_begin < self.t_end,
            &format!(
                "t_begin ({}) must be < t_end ({})",
                self.t_begin, self.t_end
            ),
        )?;
        invariant(self.teps >= 0.0, &format!("teps ({}) must be >= 0", self.teps))?;
        invariant(
            self.gen_size_target >= 1.0,
            &format!(
                "gen_size_target ({}) must be >= 1",
                self.gen_size_target
            ),
        )?;
        invariant(
            self.gen_count_max >= 1,
            &format!("gen_count_max ({}) must be >= 1", self.gen_count_max),
        )?;
        Ok(())
    }

    /// Productivity scaling exponent.
    #[must_use]
    pub const fn a(&self) -> f64 {
        self.a
    }

    /// Omori decay exponent.
    #[must_use]
    pub const fn p(&self) -> f64 {
        self.p
    }

    /// Omori time offset.
    #[must_use]
    pub const fn c(&self) -> f64 {
        self.c
    }

    /// Gutenberg–Richter slope.
    #[must_use]
    pub const fn b(&self) -> f64 {
        self.b
    }

    /// Productivity magnitude-scaling exponent.
    #[must_use]
    pub const fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Reference magnitude productivity is quoted at.
    #[must_use]
    pub const fn m_ref(&self) -> f64 {
        self.m_ref
    }

    /// Upper magnitude bound used by the productivity correction.
    #[must_use]
    pub const fn m_sup(&self) -> f64 {
        self.m_sup
    }

    /// Lower clamp for the adaptive next-generation minimum magnitude.
    #[must_use]
    pub const fn m_min_lo(&self) -> f64 {
        self.m_min_lo
    }

    /// Upper clamp for the adaptive next-generation minimum magnitude.
    #[must_use]
    pub const fn m_min_hi(&self) -> f64 {
        self.m_min_hi
    }

    /// Maximum magnitude simulated in any generation.
    #[must_use]
    pub const fn m_max_sim(&self) -> f64 {
        self.m_max_sim
    }

    /// Start of the simulation time window (days).
    #[must_use]
    pub const fn t_begin(&self) -> f64 {
        self.t_begin
    }

    /// End of the simulation time window (days).
    #[must_use]
    pub const fn t_end(&self) -> f64 {
        self.t_end
    }

    /// Dead-zone excluded immediately after a parent event.
    #[must_use]
    pub const fn teps(&self) -> f64 {
        self.teps
    }

    /// Target number of direct children per generation, used to adapt the
    /// next generation's minimum magnitude.
    #[must_use]
    pub const fn gen_size_target(&self) -> f64 {
        self.gen_size_target
    }

    /// Maximum number of generations a catalog may contain, including
    /// generation 0.
    #[must_use]
    pub const fn gen_count_max(&self) -> u32 {
        self.gen_count_max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn valid_params() -> [f64; 10] {
        // a, p, c, b, alpha, m_ref, m_sup, m_min_lo, m_min_hi, m_max_sim
        [-2.0, 1.1, 0.01, 1.0, 1.0, 3.0, 8.0, 3.0, 3.5, 8.0]
    }

    fn build(overrides: impl FnOnce([f64; 10]) -> [f64; 10]) -> Result<CatalogParams> {
        let [a, p, c, b, alpha, m_ref, m_sup, m_min_lo, m_min_hi, m_max_sim] =
            overrides(valid_params());
        CatalogParams::new(
            a, p, c, b, alpha, m_ref, m_sup, m_min_lo, m_min_hi, m_max_sim, 0.0, 365.0, 0.0, 100.0,
            20,
        )
    }

    #[test]
    fn accepts_well_ordered_parameters() {
        assert!(build(|p| p).is_ok());
    }

    #[rstest]
    #[case::m_ref_above_m_min_lo(5.0, 8.0, 3.0, 3.5, 8.0)]
    #[case::m_min_lo_above_m_min_hi(3.0, 8.0, 4.0, 3.5, 8.0)]
    #[case::m_min_hi_above_m_max_sim(3.0, 8.0, 3.0, 9.0, 8.0)]
    #[case::m_max_sim_above_m_sup(3.0, 8.0, 3.0, 3.5, 9.0)]
    fn rejects_out_of_order_magnitudes(
        #[case] m_ref: f64,
        #[case] m_sup: f64,
        #[case] m_min_lo: f64,
        #[case] m_min_hi: f64,
        #[case] m_max_sim: f64,
    ) {
        let result = build(|mut p| {
            p[5] = m_ref;
            p[6] = m_sup;
            p[7] = m_min_lo;
            p[8] = m_min_hi;
            p[9] = m_max_sim;
            p
        });
        assert!(matches!(result, Err(EtasError::InvariantViolated { .. })));
    }

    #[test]
    fn rejects_non_positive_c() {
        let result = build(|mut p| {
            p[2] = 0.0;
            p
        });
        assert!(matches!(result, Err(EtasError::InvariantViolated { .. })));
    }

    #[test]
    fn rejects_non_positive_b() {
        let result = build(|mut p| {
            p[3] = 0.0;
            p
        });
        assert!(matches!(result, Err(EtasError::InvariantViolated { .. })));
    }

    #[test]
    fn rejects_zero_gen_size_target() {
        let err = CatalogParams::new(
            -2.0, 1.1, 0.01, 1.0, 1.0, 3.0, 8.0, 3.0, 3.5, 8.0, 0.0, 365.0, 0.0, 0.0, 20,
        );
        assert!(matches!(err, Err(EtasError::InvariantViolated { .. })));
    }

    #[test]
    fn rejects_zero_gen_count_max() {
        let err = CatalogParams::new(
            -2.0, 1.1, 0.01, 1.0, 1.0, 3.0, 8.0, 3.0, 3.5, 8.0, 0.0, 365.0, 0.0, 100.0, 0,
        );
        assert!(matches!(err, Err(EtasError::InvariantViolated { .. })));
    }

    #[test]
    fn rejects_inverted_time_window() {
        let err = CatalogParams::new(
            -2.0, 1.1, 0.01, 1.0, 1.0, 3.0, 8.0, 3.0, 3.5, 8.0, 365.0, 0.0, 0.0, 100.0, 20,
        );
        assert!(matches!(err, Err(EtasError::InvariantViolated { .. })));
    }
}

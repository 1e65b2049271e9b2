//! Runs many independent catalog simulations and reduces them into
//! forecast-evaluation statistics (§4.6).

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::instrument;

use crate::catalog::{Catalog, CatalogBuilder};
use crate::error::{EtasError, Result};
use crate::generator::CatalogGenerator;
use crate::params::CatalogParams;
use crate::rng::{EtasRng, mix_catalog_seed};
use crate::rupture::{GenerationInfo, Rupture};
use crate::stats::{add_poisson_array, array_average, probex};

/// One forecast lag: the elapsed time since the mainshock at which a
/// forecast is issued (§4.6).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForecastLag {
    /// Days since the mainshock.
    pub days_since_mainshock: f64,
}

/// One advisory window: the duration over which aftershock counts are
/// forecast, starting at a [`ForecastLag`] (§4.6).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdvisoryWindow {
    /// Length of the window, in days.
    pub duration_days: f64,
}

/// One magnitude bin: ruptures fall into this bin when their magnitude lies
/// in `[m_lo, m_hi)` (§4.6). `m_hi` may be `f64::INFINITY` for an
/// open-ended top bin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MagnitudeBin {
    /// Inclusive lower bound.
    pub m_lo: f64,
    /// Exclusive upper bound.
    pub m_hi: f64,
}

impl MagnitudeBin {
    /// Returns whether `magnitude` falls within this bin.
    #[must_use]
    pub fn contains(&self, magnitude: f64) -> bool {
        magnitude >= self.m_lo && magnitude < self.m_hi
    }
}

/// Forecast model family a grid's counts were produced under (§4.6). Only
/// the ETAS model this crate implements is represented; Bayesian and
/// Reasenberg–Jones model families remain external collaborators (§1).
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ModelKind {
    /// The ETAS model driven by [`crate::generator::CatalogGenerator`].
    Etas,
}

/// The axes a [`ForecastAggregator`] run is evaluated over (§4.6): every
/// simulated catalog is tallied into one cell per `(lag, model, window,
/// bin)` combination.
#[derive(Clone, Debug)]
pub struct ForecastSpec {
    /// Forecast lags to evaluate.
    pub lags: Vec<ForecastLag>,
    /// Advisory windows to evaluate at each lag.
    pub windows: Vec<AdvisoryWindow>,
    /// Magnitude bins to evaluate within each window.
    pub bins: Vec<MagnitudeBin>,
    /// Model families represented in the resulting grid.
    pub models: Vec<ModelKind>,
}

impl ForecastSpec {
    fn cell_count(&self) -> usize {
        self.lags.len() * self.models.len() * self.windows.len() * self.bins.len()
    }

    fn cell_index(&self, lag: usize, model: usize, window: usize, bin: usize) -> usize {
        ((lag * self.models.len() + model) * self.windows.len() + window) * self.bins.len() + bin
    }
}

/// Bounds on the gamma goodness-of-fit score (§4.6, GLOSSARY): the
/// probability that simulated counts are strictly above (`gamma_lo`) or
/// at-or-above (`gamma_hi`) the observed count, derived from the observed
/// count's rank within the simulated distribution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GammaScore {
    /// Probability of exceeding the observed count (strict).
    pub gamma_lo: f64,
    /// Probability of meeting or exceeding the observed count.
    pub gamma_hi: f64,
}

/// Per-cell summary statistics over `num_sim` simulated counts for one
/// (forecast lag, model, advisory window, magnitude bin) combination.
#[derive(Clone, Debug, PartialEq)]
pub struct ForecastCell {
    /// Sorted simulated counts across every catalog run.
    pub simulated_counts: Vec<f64>,
    /// Arithmetic mean of the simulated counts.
    pub mean: f64,
    /// Median simulated count.
    pub median: f64,
    /// 5th percentile simulated count.
    pub p05: f64,
    /// 95th percentile simulated count.
    pub p95: f64,
}

impl ForecastCell {
    fn from_counts(mut counts: Vec<f64>) -> Self {
        counts.sort_by(|a, b| a.total_cmp(b));
        let mean = array_average(&counts);
        let median = percentile(&counts, 0.5);
        let p05 = percentile(&counts, 0.05);
        let p95 = percentile(&counts, 0.95);
        Self {
            simulated_counts: counts,
            mean,
            median,
            p05,
            p95,
        }
    }

    /// Derives the gamma score bounding how extreme `observed` is relative
    /// to this cell's simulated distribution (§4.6).
    #[must_use]
    pub fn gamma_score(&self, observed: f64) -> GammaScore {
        let n = self.simulated_counts.len();
        GammaScore {
            gamma_lo: probex(&self.simulated_counts, observed, 0, n),
            gamma_hi: probex(&self.simulated_counts, observed - f64::EPSILON, 0, n),
        }
    }
}

/// A full per-(forecast lag × model × advisory window × magnitude bin)
/// grid of [`ForecastCell`]s produced by [`ForecastAggregator::run`]
/// (§4.6).
#[derive(Clone, Debug)]
pub struct ForecastGrid {
    spec: ForecastSpec,
    num_sim: usize,
    cells: Vec<ForecastCell>,
}

impl ForecastGrid {
    /// The axes this grid was evaluated over.
    #[must_use]
    pub const fn spec(&self) -> &ForecastSpec {
        &self.spec
    }

    /// Number of independent catalog simulations each cell was built from.
    #[must_use]
    pub const fn num_sim(&self) -> usize {
        self.num_sim
    }

    /// The cell at `(lag, model, window, bin)`.
    ///
    /// # Errors
    /// Returns [`EtasError::OutOfBounds`] if any index is outside the
    /// corresponding axis of [`Self::spec`].
    #[expect(
        clippy::indexing_slicing,
        reason = "idx is computed from four axis indices already validated against spec's bounds"
    )]
    pub fn cell(&self, lag: usize, model: usize, window: usize, bin: usize) -> Result<&ForecastCell> {
        if lag >= self.spec.lags.len() {
            return Err(EtasError::OutOfBounds {
                what: "forecast lag index",
                index: lag,
                len: self.spec.lags.len(),
            });
        }
        if model >= self.spec.models.len() {
            return Err(EtasError::OutOfBounds {
                what: "model index",
                index: model,
                len: self.spec.models.len(),
            });
        }
        if window >= self.spec.windows.len() {
            return Err(EtasError::OutOfBounds {
                what: "advisory window index",
                index: window,
                len: self.spec.windows.len(),
            });
        }
        if bin >= self.spec.bins.len() {
            return Err(EtasError::OutOfBounds {
                what: "magnitude bin index",
                index: bin,
                len: self.spec.bins.len(),
            });
        }
        let idx = self.spec.cell_index(lag, model, window, bin);
        Ok(&self.cells[idx])
    }

    /// Combines the cells at `lag_indices` (same model/window/bin) into a
    /// single cell covering their union, by summing each simulation's
    /// per-lag count (§4.6: "aggregation across forecast lags via per-cell
    /// add_poisson-style combination of count distributions"). When
    /// `gap_mean` is positive, an additional contribution is sampled per
    /// simulation via [`add_poisson_array`] to cover a lag interval that
    /// was not itself simulated, rather than re-running the full generator
    /// for every window boundary.
    ///
    /// # Errors
    /// Returns [`EtasError::OutOfBounds`] if any of `lag_indices`, `model`,
    /// `window`, or `bin` is out of range.
    pub fn combine_lags(
        &self,
        lag_indices: &[usize],
        model: usize,
        window: usize,
        bin: usize,
        gap_mean: f64,
        rng: &mut EtasRng,
    ) -> Result<ForecastCell> {
        let mut combined = vec![0_u64; self.num_sim];
        for &lag in lag_indices {
            let cell = self.cell(lag, model, window, bin)?;
            for (slot, &count) in combined.iter_mut().zip(&cell.simulated_counts) {
                *slot += count_as_u64(count);
            }
        }
        if gap_mean > 0.0 {
            let means = vec![gap_mean; self.num_sim];
            add_poisson_array(&mut combined, &means, rng);
        }
        Ok(ForecastCell::from_counts(
            combined.into_iter().map(count_as_f64).collect(),
        ))
    }
}

#[expect(clippy::cast_precision_loss, reason = "rupture counts are far below 2^53")]
fn count_as_f64(count: u64) -> f64 {
    count as f64
}

#[expect(
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    reason = "simulated counts are always non-negative whole numbers"
)]
fn count_as_u64(count: f64) -> u64 {
    count as u64
}

#[expect(clippy::float_arithmetic, reason = "fractile interpolation over a sorted sample")]
#[expect(clippy::cast_precision_loss, reason = "sample sizes are small, bounded by num_sim")]
#[expect(clippy::cast_sign_loss, clippy::cast_possible_truncation, reason = "position is non-negative by construction")]
#[expect(clippy::indexing_slicing, reason = "lower and upper are both clamped to sorted.len() - 1")]
fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = (lower + 1).min(sorted.len() - 1);
    let frac = position - position.floor();
    let (lo_val, hi_val) = (sorted[lower], sorted[upper]);
    frac.mul_add(hi_val - lo_val, lo_val)
}

/// Counts ruptures of `catalog` that fall in `[lag, lag+window)` and within
/// `bin` (§4.6).
#[expect(clippy::float_arithmetic, reason = "window bounds are a sum of two simulation-time floats")]
fn rupture_count_in_window(
    catalog: &Catalog,
    lag: ForecastLag,
    window: AdvisoryWindow,
    bin: MagnitudeBin,
) -> Result<u64> {
    let start = lag.days_since_mainshock;
    let end = start + window.duration_days;
    let mut count: u64 = 0;
    for gi in 0..catalog.gen_count() {
        let size = catalog.gen_size(gi)?;
        for ri in 0..size {
            let rupture = catalog.rup(gi, ri)?;
            if rupture.t_day >= start && rupture.t_day < end && bin.contains(rupture.rup_mag) {
                count += 1;
            }
        }
    }
    Ok(count)
}

/// Runs `num_sim` independent catalog simulations from the same seed
/// ruptures and parameters, reducing results into a [`ForecastGrid`] over a
/// caller-supplied [`ForecastSpec`].
///
/// Independent runs are embarrassingly parallel (§5): with the `parallel`
/// feature enabled, catalogs are generated concurrently via `rayon`, each
/// with its own [`EtasRng`] derived by splitting `base_seed`.
#[derive(Clone, Debug)]
pub struct ForecastAggregator {
    params: CatalogParams,
    seed_ruptures: Vec<Rupture>,
    seed_info: GenerationInfo,
    num_sim: usize,
    base_seed: u64,
}

impl ForecastAggregator {
    /// Builds an aggregator that will run `num_sim` independent catalogs,
    /// each starting from `seed_ruptures` under `params`.
    #[must_use]
    pub fn new(
        params: CatalogParams,
        seed_ruptures: Vec<Rupture>,
        seed_info: GenerationInfo,
        num_sim: usize,
        base_seed: u64,
    ) -> Self {
        Self {
            params,
            seed_ruptures,
            seed_info,
            num_sim,
            base_seed,
        }
    }

    fn run_one(&self, index: usize) -> Result<Catalog> {
        let seed = mix_catalog_seed(self.base_seed, index);
        let mut rng = EtasRng::from_seed(seed);
        let mut builder = CatalogBuilder::new();
        builder.begin_catalog(self.params, &self.seed_ruptures, self.seed_info)?;
        let mut generator = CatalogGenerator::new();
        generator.calc_all_gen(&mut builder, &mut rng)?;
        Ok(builder.catalog().clone())
    }

    /// Runs every simulation and reduces the resulting per-(lag, model,
    /// window, bin) rupture counts into a [`ForecastGrid`].
    ///
    /// # Errors
    /// Propagates the first [`crate::error::EtasError`] encountered while
    /// driving any individual catalog, or while tallying its ruptures into
    /// `spec`'s cells.
    #[instrument(level = "info", skip(self, spec), fields(num_sim = self.num_sim, cells = spec.cell_count()), err)]
    pub fn run(&self, spec: &ForecastSpec) -> Result<ForecastGrid> {
        let catalogs = self.run_catalogs()?;
        let cell_count = spec.cell_count();
        let mut columns: Vec<Vec<f64>> = vec![Vec::with_capacity(catalogs.len()); cell_count];

        for catalog in &catalogs {
            for (lag_idx, &lag) in spec.lags.iter().enumerate() {
                for (model_idx, _model) in spec.models.iter().enumerate() {
                    for (window_idx, &window) in spec.windows.iter().enumerate() {
                        for (bin_idx, &bin) in spec.bins.iter().enumerate() {
                            let count = rupture_count_in_window(catalog, lag, window, bin)?;
                            let idx = spec.cell_index(lag_idx, model_idx, window_idx, bin_idx);
                            columns[idx].push(count_as_f64(count));
                        }
                    }
                }
            }
        }

        let cells = columns.into_iter().map(ForecastCell::from_counts).collect();
        Ok(ForecastGrid {
            spec: spec.clone(),
            num_sim: catalogs.len(),
            cells,
        })
    }

    /// Runs every simulation and returns the raw catalogs, for callers that
    /// need per-catalog detail rather than a reduced [`ForecastGrid`].
    ///
    /// # Errors
    /// Propagates the first [`crate::error::EtasError`] encountered while
    /// driving any individual catalog.
    #[cfg(feature = "parallel")]
    pub fn run_catalogs(&self) -> Result<Vec<Catalog>> {
        (0..self.num_sim)
            .into_par_iter()
            .map(|index| self.run_one(index))
            .collect()
    }

    /// Sequential fallback used when the `parallel` feature is disabled.
    ///
    /// # Errors
    /// Propagates the first [`crate::error::EtasError`] encountered while
    /// driving any individual catalog.
    #[cfg(not(feature = "parallel"))]
    pub fn run_catalogs(&self) -> Result<Vec<Catalog>> {
        (0..self.num_sim).map(|index| self.run_one(index)).collect()
    }
}

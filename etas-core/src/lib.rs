//! ETAS core library: an operational ETAS (Epidemic-Type Aftershock
//! Sequence) catalog simulator.
//!
//! Given a seed earthquake (or set of seeds) and a parameter set describing
//! productivity, Omori decay, and Gutenberg–Richter magnitude distribution,
//! this crate produces stochastic synthetic aftershock catalogs and the
//! forecast-evaluation statistics (expected counts, fractiles, gamma score)
//! derived from many independent runs.

mod catalog;
mod error;
mod forecast;
mod generator;
mod memory;
mod params;
mod rng;
mod rupture;
mod stats;

pub use crate::{
    catalog::{Catalog, CatalogBuilder},
    error::{BuilderState, EtasError, EtasErrorCode, Result},
    forecast::{
        AdvisoryWindow, ForecastAggregator, ForecastCell, ForecastGrid, ForecastLag, ForecastSpec,
        GammaScore, MagnitudeBin, ModelKind,
    },
    generator::{CancellationToken, CatalogGenerator},
    memory::{estimate_forecast_peak_bytes, estimate_peak_bytes, format_bytes},
    params::CatalogParams,
    rng::{EtasRng, SMALL_EXPECTED_COUNT, mix_catalog_seed, omori_rate, omori_rate_shifted},
    rupture::{GenerationInfo, Rupture},
    stats::{
        C_LOG_10, add_poisson_array, array_average, bsearch, calc_branch_ratio, calc_inv_branch_ratio,
        calc_k_corr, calc_k_uncorr, cumulate, decumulate, gr_inv_rate, gr_rate, probex, w_kernel,
    },
};

//! Benchmark support crate for the ETAS simulator.
//!
//! Provides the parameter types used by Criterion benchmarks of catalog
//! generation throughput.

pub mod params;

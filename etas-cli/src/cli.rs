//! Command-line interface orchestration for the ETAS demonstration CLI.
//!
//! The CLI offers a single `simulate` command: it builds a [`CatalogParams`]
//! from flags, seeds one rupture, drives the generator to exhaustion, and
//! renders a text summary. It is a thin caller exercising the core
//! end-to-end, not the out-of-scope scheduling harness described in the
//! core's design notes.

use std::io::{self, Write};

use clap::{Args, Parser, Subcommand};
use etas_core::{
    CatalogBuilder, CatalogGenerator, CatalogParams, EtasError, EtasRng, GenerationInfo, Rupture,
};
use thiserror::Error;

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(name = "etas", about = "Run an operational ETAS catalog simulation.")]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Simulate a single aftershock catalog from one seed rupture.
    Simulate(SimulateCommand),
}

/// Options accepted by the `simulate` command.
#[derive(Debug, Args, Clone)]
pub struct SimulateCommand {
    /// Productivity exponent `a`.
    #[arg(long)]
    pub a: f64,
    /// Omori decay exponent `p`.
    #[arg(long)]
    pub p: f64,
    /// Omori time offset `c` (days).
    #[arg(long)]
    pub c: f64,
    /// Gutenberg–Richter b-value.
    #[arg(long)]
    pub b: f64,
    /// Productivity magnitude-scaling exponent `alpha`.
    #[arg(long)]
    pub alpha: f64,
    /// Reference magnitude for productivity.
    #[arg(long)]
    pub m_ref: f64,
    /// Magnitude ceiling used by the productivity correction.
    #[arg(long)]
    pub m_sup: f64,
    /// Minimum simulated magnitude, at-capacity floor.
    #[arg(long)]
    pub m_min_lo: f64,
    /// Minimum simulated magnitude, uncapped ceiling.
    #[arg(long)]
    pub m_min_hi: f64,
    /// Maximum simulated magnitude.
    #[arg(long)]
    pub m_max_sim: f64,
    /// Simulation start time (days).
    #[arg(long, default_value_t = 0.0)]
    pub t_begin: f64,
    /// Simulation end time (days).
    #[arg(long)]
    pub t_end: f64,
    /// Dead-zone width immediately after a parent event (days).
    #[arg(long, default_value_t = 0.0)]
    pub teps: f64,
    /// Target number of ruptures per generation.
    #[arg(long)]
    pub gen_size_target: f64,
    /// Maximum number of generations, including generation 0.
    #[arg(long)]
    pub gen_count_max: u32,
    /// Seed rupture's origin time (days).
    #[arg(long, default_value_t = 0.0)]
    pub seed_time: f64,
    /// Seed rupture's magnitude.
    #[arg(long)]
    pub seed_mag: f64,
    /// PRNG seed.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Core orchestration failed.
    #[error(transparent)]
    Core(#[from] EtasError),
    /// Writing the rendered summary to the output stream failed.
    #[error("failed to write command output: {0}")]
    Io(#[from] std::io::Error),
}

/// Summarises the outcome of executing a CLI command.
#[derive(Debug, Clone)]
pub struct ExecutionSummary {
    /// Number of generations produced, including generation 0.
    pub gen_count: usize,
    /// Total rupture count across every generation.
    pub total_ruptures: usize,
}

/// Executes the CLI command represented by `cli`.
///
/// # Errors
/// Returns [`CliError`] when core orchestration fails.
pub fn run_cli(cli: Cli) -> Result<ExecutionSummary, CliError> {
    match cli.command {
        Command::Simulate(command) => run_simulate(command),
    }
}

fn run_simulate(command: SimulateCommand) -> Result<ExecutionSummary, CliError> {
    let params = CatalogParams::new(
        command.a,
        command.p,
        command.c,
        command.b,
        command.alpha,
        command.m_ref,
        command.m_sup,
        command.m_min_lo,
        command.m_min_hi,
        command.m_max_sim,
        command.t_begin,
        command.t_end,
        command.teps,
        command.gen_size_target,
        command.gen_count_max,
    )?;

    let seed_rupture = Rupture::seed(command.seed_time, command.seed_mag, 0.0, 0.0, 0.0);
    let seed_info = GenerationInfo::new(command.seed_mag, command.seed_mag);

    let mut builder = CatalogBuilder::new();
    builder.begin_catalog(params, &[seed_rupture], seed_info)?;

    let mut generator = CatalogGenerator::new();
    let mut rng = EtasRng::from_seed(command.seed);
    let gen_count = generator.calc_all_gen(&mut builder, &mut rng)?;

    Ok(ExecutionSummary {
        gen_count,
        total_ruptures: builder.catalog().total_rupture_count(),
    })
}

/// Renders `summary` to `writer` in a human-readable text format.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
pub fn render_summary(summary: &ExecutionSummary, mut writer: impl Write) -> io::Result<()> {
    writeln!(writer, "generations: {}", summary.gen_count)?;
    writeln!(writer, "total ruptures: {}", summary.total_ruptures)?;
    Ok(())
}

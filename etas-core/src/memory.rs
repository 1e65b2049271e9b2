//! Pre-flight memory estimation for catalog simulation (§A5).
//!
//! Provides a conservative estimate of peak memory consumption for a
//! requested simulation so callers can reject runs likely to exhaust memory
//! before any allocation occurs. The estimate is intentionally pessimistic —
//! it uses a safety multiplier to account for heap fragmentation, scratch
//! workspace doubling, and transient allocations that are difficult to
//! predict statically.

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Safety multiplier applied to the raw estimate to cover heap
/// fragmentation and the scratch workspace's doubling-growth overshoot.
/// 1.5× is chosen as a balance between avoiding false positives and
/// catching genuine OOM risks.
const SAFETY_MULTIPLIER_NUMERATOR: u64 = 3;
const SAFETY_MULTIPLIER_DENOMINATOR: u64 = 2;

/// Size of a single `Rupture` (`t_day`, `rup_mag`, `k_prod`: 3×f64;
/// `rup_parent`: `Option<usize>`; `x_km`, `y_km`: 2×f64), including
/// alignment padding on 64-bit platforms.
const RUPTURE_BYTES: u64 = 56;

/// Size of a single `GenerationInfo` (`gen_mag_min`, `gen_mag_max`: 2×f64).
const GENERATION_INFO_BYTES: u64 = 16;

/// Per-generation index overhead: offset, len, and the embedded
/// `GenerationInfo`.
const GENERATION_INDEX_BYTES: u64 = 16 + GENERATION_INFO_BYTES;

/// Size of one scratch workspace slot: one `f64` cumulative rate entry plus
/// one `u64` child count entry.
const WORKSPACE_SLOT_BYTES: u64 = 8 + 8;

// ---------------------------------------------------------------------------
// Estimation
// ---------------------------------------------------------------------------

/// Returns a conservative estimate of peak memory (in bytes) a single
/// catalog simulation will require, given the expected total rupture count
/// across every generation and the expected generation count.
///
/// The estimate covers:
///
/// - The catalog's contiguous rupture buffer (`expected_ruptures × sizeof(Rupture)`).
/// - The per-generation `(offset, len, info)` index.
/// - The generator's scratch workspace, sized to the largest single
///   generation and doubled by the capacity-growth policy (§3, §5); this
///   function conservatively assumes the largest generation is as large as
///   `expected_ruptures` itself, since the simulation does not know the
///   per-generation split in advance.
///
/// A 1.5× safety multiplier is applied to the raw total to account for heap
/// fragmentation and the scratch workspace's doubling overshoot.
///
/// # Examples
///
/// ```
/// use etas_core::estimate_peak_bytes;
///
/// let bytes = estimate_peak_bytes(10_000, 20);
/// assert!(bytes > 0, "estimate must be positive for non-empty simulations");
///
/// let zero = estimate_peak_bytes(0, 0);
/// assert_eq!(zero, 0, "an empty simulation requires no memory");
/// ```
#[must_use]
pub fn estimate_peak_bytes(expected_ruptures: u64, expected_generations: u64) -> u64 {
    if expected_ruptures == 0 {
        return 0;
    }

    let rupture_storage = expected_ruptures.saturating_mul(RUPTURE_BYTES);
    let generation_index = expected_generations.saturating_mul(GENERATION_INDEX_BYTES);
    let workspace = expected_ruptures.saturating_mul(WORKSPACE_SLOT_BYTES);

    let subtotal = rupture_storage
        .saturating_add(generation_index)
        .saturating_add(workspace);

    subtotal
        .saturating_mul(SAFETY_MULTIPLIER_NUMERATOR)
        .saturating_div(SAFETY_MULTIPLIER_DENOMINATOR)
}

/// Returns a conservative estimate of peak memory (in bytes) for a forecast
/// aggregation run of `num_sim` independent catalogs, each estimated via
/// [`estimate_peak_bytes`]. Assumes catalogs do not run concurrently beyond
/// what the caller's thread pool allows; this is a simulation-wide ceiling,
/// not a per-thread one.
#[must_use]
pub fn estimate_forecast_peak_bytes(
    num_sim: u64,
    expected_ruptures: u64,
    expected_generations: u64,
) -> u64 {
    estimate_peak_bytes(expected_ruptures, expected_generations).saturating_mul(num_sim)
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Formats a byte count as a human-readable string using binary units.
///
/// Returns values like `"0 B"`, `"1.0 KiB"`, `"2.4 GiB"`.  The result uses
/// one decimal place for values ≥ 1 KiB.
///
/// # Examples
///
/// ```
/// use etas_core::format_bytes;
///
/// assert_eq!(format_bytes(0), "0 B");
/// assert_eq!(format_bytes(1023), "1023 B");
/// assert_eq!(format_bytes(1024), "1.0 KiB");
/// assert_eq!(format_bytes(1_073_741_824), "1.0 GiB");
/// ```
#[must_use]
#[expect(clippy::float_arithmetic, reason = "human-readable byte-size formatting")]
#[expect(clippy::cast_precision_loss, reason = "byte counts are formatted to one decimal place, not exactly")]
pub fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;
    const GIB: u64 = 1024 * MIB;
    const TIB: u64 = 1024 * GIB;

    if bytes >= TIB {
        format!("{:.1} TiB", bytes as f64 / TIB as f64)
    } else if bytes >= GIB {
        format!("{:.1} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

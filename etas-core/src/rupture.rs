//! Value types shared by the catalog builder and generator (§3, §4.3).

use serde::{Deserialize, Serialize};

/// A single earthquake (seed or simulated aftershock) in a catalog.
///
/// Invariants enforced by the producing code, not by this type itself:
/// `t_day` is at least the parent's `t_day`; `rup_mag` lies within the
/// owning generation's `[gen_mag_min, gen_mag_max]`; `k_prod` is
/// non-negative.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rupture {
    /// Event time in days since a shared epoch.
    pub t_day: f64,
    /// Event magnitude.
    pub rup_mag: f64,
    /// Corrected productivity used to generate this event's own children.
    pub k_prod: f64,
    /// Index of the parent rupture within the previous generation, or
    /// `None` for a seed rupture.
    pub rup_parent: Option<usize>,
    /// Spatial x coordinate (kilometres), inherited from the parent.
    pub x_km: f64,
    /// Spatial y coordinate (kilometres), inherited from the parent.
    pub y_km: f64,
}

impl Rupture {
    /// Constructs a seed rupture with no parent.
    #[must_use]
    pub const fn seed(t_day: f64, rup_mag: f64, k_prod: f64, x_km: f64, y_km: f64) -> Self {
        Self {
            t_day,
            rup_mag,
            k_prod,
            rup_parent: None,
            x_km,
            y_km,
        }
    }

    /// Constructs a child rupture descending from `rup_parent`.
    #[must_use]
    #[expect(
        clippy::too_many_arguments,
        reason = "mirrors the flat rupture field list in spec.md §3"
    )]
    pub const fn child(
        t_day: f64,
        rup_mag: f64,
        k_prod: f64,
        rup_parent: usize,
        x_km: f64,
        y_km: f64,
    ) -> Self {
        Self {
            t_day,
            rup_mag,
            k_prod,
            rup_parent: Some(rup_parent),
            x_km,
            y_km,
        }
    }

    /// Returns `true` if this rupture has no parent, i.e. it was supplied
    /// as a seed rather than generated.
    #[must_use]
    pub const fn is_seed(&self) -> bool {
        self.rup_parent.is_none()
    }
}

/// Header describing the magnitude range a generation's ruptures were drawn
/// from (§3). Invariant: `gen_mag_min ≤ gen_mag_max`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationInfo {
    /// Lower bound of the truncated Gutenberg–Richter interval.
    pub gen_mag_min: f64,
    /// Upper bound of the truncated Gutenberg–Richter interval.
    pub gen_mag_max: f64,
}

impl GenerationInfo {
    /// Constructs a generation header.
    #[must_use]
    pub const fn new(gen_mag_min: f64, gen_mag_max: f64) -> Self {
        Self {
            gen_mag_min,
            gen_mag_max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_rupture_has_no_parent() {
        let r = Rupture::seed(0.0, 5.0, 1.0, 0.0, 0.0);
        assert!(r.is_seed());
        assert_eq!(r.rup_parent, None);
    }

    #[test]
    fn child_rupture_records_parent_index() {
        let r = Rupture::child(1.5, 4.2, 0.3, 7, 1.0, -2.0);
        assert!(!r.is_seed());
        assert_eq!(r.rup_parent, Some(7));
    }

    #[test]
    fn generation_info_round_trips_through_serde() {
        let info = GenerationInfo::new(3.0, 8.0);
        let json = serde_json::to_string(&info).expect("serialize generation info");
        let back: GenerationInfo = serde_json::from_str(&json).expect("deserialize generation info");
        assert_eq!(info, back);
    }
}

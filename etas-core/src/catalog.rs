//! Append-only, generation-partitioned catalog storage and its builder
//! state machine (§3, §4.4).

use tracing::instrument;

use crate::error::{BuilderState, EtasError, Result};
use crate::params::CatalogParams;
use crate::rupture::{GenerationInfo, Rupture};

/// A single generation's slice into the builder's contiguous rupture
/// buffer, per the storage strategy recommended in spec §4.4 and §9.
#[derive(Clone, Copy, Debug)]
struct GenerationSlice {
    offset: usize,
    len: usize,
    info: GenerationInfo,
}

/// Append-only, generation-partitioned earthquake catalog.
///
/// Produced by [`CatalogBuilder::end_catalog`]; gives O(1) random access to
/// any rupture by `(generation_index, rupture_index)` over a single
/// contiguous buffer plus a per-generation `(offset, len, info)` index
/// (§9), rather than the source's jagged array of object references.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    ruptures: Vec<Rupture>,
    generations: Vec<GenerationSlice>,
    params: Option<CatalogParams>,
}

impl Catalog {
    /// Number of generations recorded, including generation 0.
    #[must_use]
    pub fn gen_count(&self) -> usize {
        self.generations.len()
    }

    /// Number of ruptures in generation `gi`.
    ///
    /// # Errors
    /// Returns [`EtasError::OutOfBounds`] if `gi` is not a valid generation
    /// index.
    pub fn gen_size(&self, gi: usize) -> Result<usize> {
        self.slice(gi).map(|s| s.len)
    }

    /// Header describing generation `gi`'s magnitude range.
    ///
    /// # Errors
    /// Returns [`EtasError::OutOfBounds`] if `gi` is not a valid generation
    /// index.
    pub fn gen_info(&self, gi: usize) -> Result<GenerationInfo> {
        self.slice(gi).map(|s| s.info)
    }

    /// The `ri`-th rupture of generation `gi`.
    ///
    /// # Errors
    /// Returns [`EtasError::OutOfBounds`] if `gi` is not a valid generation
    /// index, or `ri` is not a valid rupture index within it.
    #[expect(
        clippy::indexing_slicing,
        reason = "ri was checked against slice.len above, offset+ri stays within ruptures"
    )]
    pub fn rup(&self, gi: usize, ri: usize) -> Result<Rupture> {
        let slice = self.slice(gi)?;
        if ri >= slice.len {
            return Err(EtasError::OutOfBounds {
                what: "rupture index",
                index: ri,
                len: slice.len,
            });
        }
        Ok(self.ruptures[slice.offset + ri])
    }

    /// The parameter set this catalog was generated under.
    ///
    /// # Errors
    /// Returns [`EtasError::ProtocolMisuse`] if no catalog has been started.
    pub fn cat_params(&self) -> Result<CatalogParams> {
        self.params.ok_or(EtasError::ProtocolMisuse {
            operation: "get_cat_params",
            expected: "a catalog to have been started",
            actual: BuilderState::Empty,
        })
    }

    /// Total rupture count across every generation.
    #[must_use]
    pub fn total_rupture_count(&self) -> usize {
        self.ruptures.len()
    }

    fn slice(&self, gi: usize) -> Result<GenerationSlice> {
        self.generations
            .get(gi)
            .copied()
            .ok_or(EtasError::OutOfBounds {
                what: "generation index",
                index: gi,
                len: self.generations.len(),
            })
    }
}

/// Drives a [`Catalog`] through the append-only lifecycle described in
/// spec §4.4:
///
/// `Empty --begin_catalog--> CatalogOpen --begin_generation--> GenerationOpen
/// --(add_rup)*--> GenerationOpen --end_generation--> CatalogOpen
/// --end_catalog--> Frozen`
///
/// Violating the sequence (e.g. calling `add_rup` before `begin_generation`)
/// is a programming error and fails fast with
/// [`EtasError::ProtocolMisuse`].
#[derive(Clone, Debug, Default)]
pub struct CatalogBuilder {
    state: BuilderState,
    catalog: Catalog,
    open_generation: Option<OpenGeneration>,
}

#[derive(Clone, Debug)]
struct OpenGeneration {
    offset: usize,
    info: GenerationInfo,
}

impl CatalogBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the builder's current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> BuilderState {
        self.state
    }

    fn require_state(&self, operation: &'static str, expected: &'static str, wanted: BuilderState) -> Result<()> {
        if self.state == wanted {
            Ok(())
        } else {
            Err(EtasError::ProtocolMisuse {
                operation,
                expected,
                actual: self.state,
            })
        }
    }

    /// Starts a new catalog with `params` and generation 0 populated from
    /// `seed_ruptures`.
    ///
    /// # Errors
    /// Returns [`EtasError::ProtocolMisuse`] unless the builder is
    /// [`BuilderState::Empty`].
    #[instrument(level = "debug", skip(self, seed_ruptures), fields(seed_count = seed_ruptures.len()))]
    pub fn begin_catalog(
        &mut self,
        params: CatalogParams,
        seed_ruptures: &[Rupture],
        seed_info: GenerationInfo,
    ) -> Result<()> {
        self.require_state("begin_catalog", "Empty", BuilderState::Empty)?;
        self.catalog = Catalog {
            ruptures: Vec::new(),
            generations: Vec::new(),
            params: Some(params),
        };
        self.state = BuilderState::CatalogOpen;
        self.begin_generation(seed_info)?;
        for rupture in seed_ruptures {
            self.add_rup(*rupture)?;
        }
        self.end_generation()
    }

    /// Opens a new generation for appending, recording its magnitude range
    /// header.
    ///
    /// # Errors
    /// Returns [`EtasError::ProtocolMisuse`] unless the builder is in
    /// [`BuilderState::CatalogOpen`].
    pub fn begin_generation(&mut self, info: GenerationInfo) -> Result<()> {
        self.require_state("begin_generation", "CatalogOpen", BuilderState::CatalogOpen)?;
        self.open_generation = Some(OpenGeneration {
            offset: self.catalog.ruptures.len(),
            info,
        });
        self.state = BuilderState::GenerationOpen;
        Ok(())
    }

    /// Appends a rupture to the currently open generation.
    ///
    /// # Errors
    /// Returns [`EtasError::ProtocolMisuse`] unless the builder is in
    /// [`BuilderState::GenerationOpen`].
    pub fn add_rup(&mut self, rupture: Rupture) -> Result<()> {
        self.require_state("add_rup", "GenerationOpen", BuilderState::GenerationOpen)?;
        self.catalog.ruptures.push(rupture);
        Ok(())
    }

    /// Closes the currently open generation, committing it to the catalog
    /// index.
    ///
    /// # Errors
    /// Returns [`EtasError::ProtocolMisuse`] unless the builder is in
    /// [`BuilderState::GenerationOpen`].
    pub fn end_generation(&mut self) -> Result<()> {
        self.require_state("end_generation", "GenerationOpen", BuilderState::GenerationOpen)?;
        let open = self.open_generation.take().ok_or(EtasError::ProtocolMisuse {
            operation: "end_generation",
            expected: "an open generation",
            actual: self.state,
        })?;
        let len = self.catalog.ruptures.len() - open.offset;
        self.catalog.generations.push(GenerationSlice {
            offset: open.offset,
            len,
            info: open.info,
        });
        self.state = BuilderState::CatalogOpen;
        Ok(())
    }

    /// Finalizes the catalog, freezing it for read-only access.
    ///
    /// # Errors
    /// Returns [`EtasError::ProtocolMisuse`] unless the builder is in
    /// [`BuilderState::CatalogOpen`].
    #[instrument(level = "debug", skip(self), fields(gen_count = self.catalog.gen_count()))]
    pub fn end_catalog(&mut self) -> Result<Catalog> {
        self.require_state("end_catalog", "CatalogOpen", BuilderState::CatalogOpen)?;
        self.state = BuilderState::Frozen;
        Ok(self.catalog.clone())
    }

    /// Resets the builder to [`BuilderState::Empty`], discarding any
    /// in-progress or frozen catalog so the builder may be reused.
    pub fn clear(&mut self) {
        self.state = BuilderState::Empty;
        self.catalog = Catalog::default();
        self.open_generation = None;
    }

    /// Read-only view of the catalog built so far. Valid in
    /// [`BuilderState::CatalogOpen`] and [`BuilderState::Frozen`].
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_params() -> CatalogParams {
        CatalogParams::new(
            -2.0, 1.1, 0.01, 1.0, 1.0, 3.0, 8.0, 3.0, 3.5, 8.0, 0.0, 365.0, 0.0, 100.0, 20,
        )
        .expect("valid test parameters")
    }

    #[test]
    fn begin_catalog_populates_generation_zero() {
        let mut builder = CatalogBuilder::new();
        let seed = Rupture::seed(0.0, 5.0, 1.0, 0.0, 0.0);
        builder
            .begin_catalog(test_params(), &[seed], GenerationInfo::new(5.0, 5.0))
            .expect("begin_catalog succeeds from Empty");
        assert_eq!(builder.state(), BuilderState::CatalogOpen);
        assert_eq!(builder.catalog().gen_count(), 1);
        assert_eq!(builder.catalog().gen_size(0).expect("generation 0 exists"), 1);
    }

    #[test]
    fn add_rup_before_begin_generation_is_protocol_misuse() {
        let mut builder = CatalogBuilder::new();
        let err = builder.add_rup(Rupture::seed(0.0, 5.0, 1.0, 0.0, 0.0));
        assert!(matches!(err, Err(EtasError::ProtocolMisuse { .. })));
    }

    #[test]
    fn end_catalog_freezes_the_builder() {
        let mut builder = CatalogBuilder::new();
        builder
            .begin_catalog(
                test_params(),
                &[Rupture::seed(0.0, 5.0, 1.0, 0.0, 0.0)],
                GenerationInfo::new(5.0, 5.0),
            )
            .expect("begin_catalog succeeds");
        let catalog = builder.end_catalog().expect("end_catalog succeeds from CatalogOpen");
        assert_eq!(builder.state(), BuilderState::Frozen);
        assert_eq!(catalog.gen_count(), 1);
    }

    #[test]
    fn begin_generation_after_frozen_is_protocol_misuse() {
        let mut builder = CatalogBuilder::new();
        builder
            .begin_catalog(
                test_params(),
                &[Rupture::seed(0.0, 5.0, 1.0, 0.0, 0.0)],
                GenerationInfo::new(5.0, 5.0),
            )
            .expect("begin_catalog succeeds");
        builder.end_catalog().expect("end_catalog succeeds");
        let err = builder.begin_generation(GenerationInfo::new(3.0, 8.0));
        assert!(matches!(err, Err(EtasError::ProtocolMisuse { .. })));
    }

    #[test]
    fn out_of_bounds_generation_query_is_reported() {
        let mut builder = CatalogBuilder::new();
        builder
            .begin_catalog(
                test_params(),
                &[Rupture::seed(0.0, 5.0, 1.0, 0.0, 0.0)],
                GenerationInfo::new(5.0, 5.0),
            )
            .expect("begin_catalog succeeds");
        let catalog = builder.end_catalog().expect("end_catalog succeeds");
        assert!(matches!(
            catalog.gen_info(7),
            Err(EtasError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn clear_resets_to_empty() {
        let mut builder = CatalogBuilder::new();
        builder
            .begin_catalog(
                test_params(),
                &[Rupture::seed(0.0, 5.0, 1.0, 0.0, 0.0)],
                GenerationInfo::new(5.0, 5.0),
            )
            .expect("begin_catalog succeeds");
        builder.clear();
        assert_eq!(builder.state(), BuilderState::Empty);
        assert_eq!(builder.catalog().gen_count(), 0);
    }
}

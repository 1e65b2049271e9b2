//! Error types for the ETAS core library.
//!
//! Defines the error taxonomy described by the core's error-handling design:
//! parameter invariant failures and builder protocol misuse are fatal and
//! surfaced as [`EtasError`]; normal simulation termination (generation
//! limits, underflow, a tiny expected count, a zero Poisson draw) is encoded
//! in the `u64` return value of `calc_next_gen` rather than as an error.

use std::fmt;

use thiserror::Error;

/// Stable codes describing [`EtasError`] variants.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum EtasErrorCode {
    /// A [`crate::params::CatalogParams`] invariant was violated at construction.
    InvariantViolated,
    /// A [`crate::catalog::CatalogBuilder`] method was called in the wrong state.
    ProtocolMisuse,
    /// A query referenced a generation or rupture index that does not exist.
    OutOfBounds,
}

impl EtasErrorCode {
    /// Returns the stable machine-readable representation of this error code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvariantViolated => "ETAS_INVARIANT_VIOLATED",
            Self::ProtocolMisuse => "ETAS_PROTOCOL_MISUSE",
            Self::OutOfBounds => "ETAS_OUT_OF_BOUNDS",
        }
    }
}

impl fmt::Display for EtasErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error produced by the ETAS core when constructing parameters or driving
/// the catalog builder.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum EtasError {
    /// A [`crate::params::CatalogParams`] invariant (§3) was violated.
    #[error("catalog parameter invariant violated: {reason}")]
    InvariantViolated {
        /// Human-readable description of the violated invariant.
        reason: String,
    },
    /// A builder method was invoked outside the state that allows it.
    #[error(
        "builder operation `{operation}` is not valid in state {actual} (expected {expected})"
    )]
    ProtocolMisuse {
        /// Name of the offending operation.
        operation: &'static str,
        /// Human-readable description of the state(s) the operation requires.
        expected: &'static str,
        /// The state the builder was actually in.
        actual: BuilderState,
    },
    /// A query referenced a generation or rupture index outside the stored
    /// catalog.
    #[error("index out of bounds: {what} {index} (have {len})")]
    OutOfBounds {
        /// Description of what kind of index was out of bounds.
        what: &'static str,
        /// The offending index.
        index: usize,
        /// The number of valid entries.
        len: usize,
    },
}

impl EtasError {
    /// Retrieve the stable [`EtasErrorCode`] for this error.
    #[must_use]
    pub const fn code(&self) -> EtasErrorCode {
        match self {
            Self::InvariantViolated { .. } => EtasErrorCode::InvariantViolated,
            Self::ProtocolMisuse { .. } => EtasErrorCode::ProtocolMisuse,
            Self::OutOfBounds { .. } => EtasErrorCode::OutOfBounds,
        }
    }
}

/// The lifecycle state of a [`crate::catalog::CatalogBuilder`], used to
/// report [`EtasError::ProtocolMisuse`].
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum BuilderState {
    /// No catalog has been started yet.
    #[default]
    Empty,
    /// A catalog is open but no generation is currently being appended to.
    CatalogOpen,
    /// A generation is open and accepting ruptures.
    GenerationOpen,
    /// The catalog has been finalized and is read-only.
    Frozen,
}

impl fmt::Display for BuilderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Empty => "Empty",
            Self::CatalogOpen => "CatalogOpen",
            Self::GenerationOpen => "GenerationOpen",
            Self::Frozen => "Frozen",
        };
        f.write_str(label)
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T> = core::result::Result<T, EtasError>;

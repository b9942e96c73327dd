//! Lattice-level error types.

use std::error::Error;
use std::fmt;

use accel_core::AccessError;

/// Errors from element and lattice operations.
#[derive(Clone, Debug, PartialEq)]
pub enum LatticeError {
    /// A lookup matched no elements.
    NoElements {
        /// What was searched for.
        reason: String,
    },
    /// A value list does not match the size of the family it targets.
    LengthMismatch {
        /// Number of elements in the family.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },
    /// A value cannot be stored in the requested numeric type.
    NotRepresentable {
        /// The offending value (`None` for a failed read).
        value: Option<f64>,
        /// Name of the requested type.
        dtype: &'static str,
    },
    /// An element length is negative or not finite.
    InvalidLength {
        /// The rejected length.
        length: f64,
    },
    /// Resolving a field failed.
    Access(AccessError),
}

impl LatticeError {
    /// The underlying resolution error, if this is one.
    pub fn as_access(&self) -> Option<&AccessError> {
        match self {
            Self::Access(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for LatticeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoElements { reason } => write!(f, "{reason}"),
            Self::LengthMismatch { expected, actual } => write!(
                f,
                "number of values given ({actual}) must equal the number of \
                 elements in the family ({expected})"
            ),
            Self::NotRepresentable { value: Some(v), dtype } => {
                write!(f, "value {v} cannot be represented as {dtype}")
            }
            Self::NotRepresentable { value: None, dtype } => {
                write!(f, "missing value cannot be represented as {dtype}")
            }
            Self::InvalidLength { length } => {
                write!(f, "element length must be finite and non-negative, got {length}")
            }
            Self::Access(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LatticeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Access(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AccessError> for LatticeError {
    fn from(err: AccessError) -> Self {
        Self::Access(err)
    }
}

//! Error types for the accel lattice model.
//!
//! Organized by layer: unit conversion, control-system transport, and
//! field/data-source resolution. Resolution errors are raised at the
//! lowest layer that detects them and annotated with the identity of
//! each owner they pass through on the way up.

use std::error::Error;
use std::fmt;

use crate::id::Units;

/// Errors from unit conversion.
///
/// `conv` fields carry the display identity of the conversion object
/// (its type name and, if set, its name).
#[derive(Clone, Debug, PartialEq)]
pub enum UnitsError {
    /// The engineering input is below the lower conversion limit.
    BelowLowerLimit {
        /// The conversion that rejected the input.
        conv: String,
        /// The rejected input.
        value: f64,
        /// The lower limit.
        limit: f64,
    },
    /// The engineering input is above the upper conversion limit.
    AboveUpperLimit {
        /// The conversion that rejected the input.
        conv: String,
        /// The rejected input.
        value: f64,
        /// The upper limit.
        limit: f64,
    },
    /// The forward mapping produced no physics value.
    NoSolution {
        /// The conversion that failed.
        conv: String,
    },
    /// None of the inverse candidates fall within the conversion limits.
    NoSolutionWithinLimits {
        /// The conversion that failed.
        conv: String,
        /// Every real candidate before limit filtering.
        candidates: Vec<f64>,
        /// The lower limit, if any.
        lower: Option<f64>,
        /// The upper limit, if any.
        upper: Option<f64>,
    },
    /// More than one candidate survived, so the result is ambiguous.
    MultipleSolutions {
        /// The conversion that failed.
        conv: String,
        /// The unit system being converted into.
        target: Units,
        /// The surviving candidates.
        candidates: Vec<f64>,
    },
    /// Lower limit is not below the upper limit.
    InvalidLimits {
        /// The requested lower limit.
        lower: f64,
        /// The requested upper limit.
        upper: f64,
    },
    /// The conversion model itself is malformed (bad knots or coefficients).
    InvalidModel {
        /// What is wrong with the model.
        reason: String,
    },
}

impl fmt::Display for UnitsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BelowLowerLimit { conv, value, limit } => write!(
                f,
                "{conv}: input {value} less than lower conversion limit ({limit})"
            ),
            Self::AboveUpperLimit { conv, value, limit } => write!(
                f,
                "{conv}: input {value} greater than upper conversion limit ({limit})"
            ),
            Self::NoSolution { conv } => {
                write!(f, "{conv}: no corresponding physics value exists")
            }
            Self::NoSolutionWithinLimits {
                conv,
                candidates,
                lower,
                upper,
            } => write!(
                f,
                "{conv}: none of conversion results {candidates:?} within \
                 conversion limits ({lower:?}, {upper:?})"
            ),
            Self::MultipleSolutions {
                conv,
                target,
                candidates,
            } => write!(
                f,
                "{conv}: multiple corresponding {target} values ({candidates:?})"
            ),
            Self::InvalidLimits { lower, upper } => write!(
                f,
                "lower conversion limit ({lower}) must be less than the upper limit ({upper})"
            ),
            Self::InvalidModel { reason } => write!(f, "invalid conversion model: {reason}"),
        }
    }
}

impl Error for UnitsError {}

/// Errors reported by a control-system transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlSystemError {
    /// A channel could not be read or written.
    Connection {
        /// The process variable that failed.
        pv: String,
        /// Transport-specific description.
        reason: String,
    },
    /// A batched write was given different numbers of channels and values.
    LengthMismatch {
        /// Number of channels.
        pvs: usize,
        /// Number of values.
        values: usize,
    },
}

impl fmt::Display for ControlSystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection { pv, reason } => write!(f, "cannot connect to {pv}: {reason}"),
            Self::LengthMismatch { pvs, values } => write!(
                f,
                "{pvs} process variables given but {values} values supplied"
            ),
        }
    }
}

impl Error for ControlSystemError {}

/// Errors from resolving a field's value through a data-source manager.
#[derive(Clone, Debug, PartialEq)]
pub enum AccessError {
    /// The field is not registered on the owner or data source.
    Field {
        /// Human-readable description.
        reason: String,
    },
    /// The requested data source is not registered, or a device is
    /// misconfigured.
    DataSource {
        /// Human-readable description.
        reason: String,
    },
    /// The requested readback or setpoint channel does not exist.
    Handle {
        /// Human-readable description.
        reason: String,
    },
    /// Conversion between unit systems failed.
    Units(UnitsError),
    /// The control-system transport reported a failure.
    ControlSystem(ControlSystemError),
    /// An error annotated with the identity of the element or lattice
    /// it passed through.
    Owner {
        /// Display identity of the owner.
        owner: String,
        /// The annotated error.
        source: Box<AccessError>,
    },
}

impl AccessError {
    /// Shorthand for an [`AccessError::Field`].
    pub fn field(reason: impl Into<String>) -> Self {
        Self::Field {
            reason: reason.into(),
        }
    }

    /// Shorthand for an [`AccessError::DataSource`].
    pub fn data_source(reason: impl Into<String>) -> Self {
        Self::DataSource {
            reason: reason.into(),
        }
    }

    /// Shorthand for an [`AccessError::Handle`].
    pub fn handle(reason: impl Into<String>) -> Self {
        Self::Handle {
            reason: reason.into(),
        }
    }

    /// Wrap this error with the identity of an owner.
    pub fn with_owner(self, owner: impl fmt::Display) -> Self {
        Self::Owner {
            owner: owner.to_string(),
            source: Box::new(self),
        }
    }

    /// The underlying error with every owner annotation removed.
    pub fn root(&self) -> &AccessError {
        let mut err = self;
        while let Self::Owner { source, .. } = err {
            err = source;
        }
        err
    }

    /// Returns `true` if the root cause is an unregistered field.
    pub fn is_field(&self) -> bool {
        matches!(self.root(), Self::Field { .. })
    }

    /// Returns `true` if the root cause is a data-source problem.
    pub fn is_data_source(&self) -> bool {
        matches!(self.root(), Self::DataSource { .. })
    }

    /// Returns `true` if the root cause is a missing channel handle.
    pub fn is_handle(&self) -> bool {
        matches!(self.root(), Self::Handle { .. })
    }

    /// Returns `true` if the root cause is a unit conversion failure.
    pub fn is_units(&self) -> bool {
        matches!(self.root(), Self::Units(_))
    }

    /// Returns `true` if the root cause is a transport failure.
    pub fn is_control_system(&self) -> bool {
        matches!(self.root(), Self::ControlSystem(_))
    }
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field { reason } | Self::DataSource { reason } | Self::Handle { reason } => {
                write!(f, "{reason}")
            }
            Self::Units(err) => write!(f, "{err}"),
            Self::ControlSystem(err) => write!(f, "{err}"),
            Self::Owner { owner, source } => write!(f, "{owner}: {source}"),
        }
    }
}

impl Error for AccessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Units(err) => Some(err),
            Self::ControlSystem(err) => Some(err),
            Self::Owner { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<UnitsError> for AccessError {
    fn from(err: UnitsError) -> Self {
        Self::Units(err)
    }
}

impl From<ControlSystemError> for AccessError {
    fn from(err: ControlSystemError) -> Self {
        Self::ControlSystem(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_annotation_prefixes_message() {
        let err = AccessError::field("no field x")
            .with_owner("<Element 'bpm1'>")
            .with_owner("Lattice ring");
        assert_eq!(err.to_string(), "Lattice ring: <Element 'bpm1'>: no field x");
        assert!(err.is_field());
        assert!(!err.is_data_source());
        assert_eq!(err.root(), &AccessError::field("no field x"));
    }

    #[test]
    fn units_error_classifies_through_owner() {
        let err: AccessError = UnitsError::NoSolution {
            conv: "NullUnitConv".into(),
        }
        .into();
        let err = err.with_owner("owner");
        assert!(err.is_units());
        assert!(err.source().is_some());
    }

    #[test]
    fn multiple_solutions_lists_candidates() {
        let err = UnitsError::MultipleSolutions {
            conv: "PolyUnitConv".into(),
            target: Units::Eng,
            candidates: vec![-1.0, 1.0],
        };
        assert_eq!(
            err.to_string(),
            "PolyUnitConv: multiple corresponding engineering values ([-1.0, 1.0])"
        );
    }
}

//! Unit systems, handles, data-source kinds, and the [`LatticeId`] handle.

use smallvec::SmallVec;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// The unit system a value is expressed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Units {
    /// Engineering units: the raw hardware scale (e.g. amps).
    Eng,
    /// Physics units: the physically meaningful scale (e.g. m^-2).
    Phys,
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eng => write!(f, "engineering"),
            Self::Phys => write!(f, "physics"),
        }
    }
}

/// Which of a channel's two process variables is addressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Handle {
    /// The observed, actual value.
    Readback,
    /// The settable target value.
    Setpoint,
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Readback => write!(f, "readback"),
            Self::Setpoint => write!(f, "setpoint"),
        }
    }
}

/// Where a field's value comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataSourceKind {
    /// Real hardware, reached through the control system.
    Live,
    /// A simulation of the machine.
    Sim,
}

impl fmt::Display for DataSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live => write!(f, "live"),
            Self::Sim => write!(f, "simulation"),
        }
    }
}

/// Counter for unique [`LatticeId`] allocation.
static LATTICE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique per-instance identifier for a lattice.
///
/// Allocated from a monotonic atomic counter via [`LatticeId::next`].
/// Elements store the id of the lattice that owns them instead of a
/// reference, so position queries can check that the lattice they are
/// handed is really the one the element belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LatticeId(u64);

impl LatticeId {
    /// Allocate a fresh, unique lattice ID. Thread-safe.
    pub fn next() -> Self {
        Self(LATTICE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for LatticeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Candidate results of a raw unit conversion.
///
/// Almost every conversion yields zero, one, or two candidates, so four
/// inline slots avoid heap allocation in practice.
pub type Candidates = SmallVec<[f64; 4]>;

//! The control-system collaborator trait.

use crate::error::ControlSystemError;

/// Batched remote get/set of named process variables (PVs).
///
/// Implemented outside this workspace by the transport that talks to the
/// hardware; the lattice model only consumes it. Timeouts, waiting, and
/// retry policy belong to the implementation.
///
/// Every method takes a `throw` flag. When `true`, failure of any channel
/// is returned as an error. When `false`, the failing position yields
/// `None` (reads) or `false` (writes), a warning is logged, and the call
/// still completes for every other channel.
pub trait ControlSystem: Send + Sync {
    /// Read one PV.
    fn get_single(&self, pv: &str, throw: bool) -> Result<Option<f64>, ControlSystemError>;

    /// Read several PVs in one round trip, in the order given.
    fn get_multiple(
        &self,
        pvs: &[String],
        throw: bool,
    ) -> Result<Vec<Option<f64>>, ControlSystemError>;

    /// Write one PV. Returns whether the write succeeded.
    fn set_single(&self, pv: &str, value: f64, throw: bool) -> Result<bool, ControlSystemError>;

    /// Write several PVs in one round trip.
    ///
    /// Returns one success flag per PV. `pvs` and `values` must have the
    /// same length.
    fn set_multiple(
        &self,
        pvs: &[String],
        values: &[f64],
        throw: bool,
    ) -> Result<Vec<bool>, ControlSystemError>;
}

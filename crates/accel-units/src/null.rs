//! Identity conversion for fields without a physical model.

use accel_core::Candidates;
use smallvec::smallvec;

use crate::unitconv::{ConversionCore, UnitConv};

/// Returns its input unchanged in both directions.
///
/// Still subject to limits, transforms, and the uniqueness check, so it
/// can be used to range-check fields such as beam positions that have no
/// engineering/physics distinction.
#[derive(Clone, Debug, Default)]
pub struct NullUnitConv {
    core: ConversionCore,
}

impl NullUnitConv {
    /// Create an unlimited identity conversion.
    pub fn new() -> Self {
        Self::default()
    }
}

impl UnitConv for NullUnitConv {
    fn type_name(&self) -> &'static str {
        "NullUnitConv"
    }

    fn core(&self) -> &ConversionCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ConversionCore {
        &mut self.core
    }

    fn raw_eng_to_phys(&self, value: f64) -> Candidates {
        smallvec![value]
    }

    fn raw_phys_to_eng(&self, value: f64) -> Candidates {
        smallvec![value]
    }
}

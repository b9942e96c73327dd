//! Reusable lattice fixtures.
//!
//! - [`drift_lattice`]: plain elements with no fields, for position tests.
//! - [`corrector_lattice`]: a batched lattice of horizontal correctors,
//!   each with its own linear conversion and both PVs seeded.

use std::sync::Arc;

use accel_core::DataSourceKind;
use accel_lattice::{Element, EpicsLattice, Lattice};
use accel_source::{DeviceDataSource, EpicsDevice};
use accel_units::PolyUnitConv;

use crate::MockControlSystem;

/// Family name used by [`corrector_lattice`].
pub const CORRECTOR_FAMILY: &str = "HSTR";
/// Field name used by [`corrector_lattice`].
pub const CORRECTOR_FIELD: &str = "x_kick";

/// Readback PV of corrector `i` (0-based).
pub fn corrector_rb_pv(i: usize) -> String {
    format!("SR{:02}A-PC-HSTR-01:I", i + 1)
}

/// Setpoint PV of corrector `i` (0-based).
pub fn corrector_sp_pv(i: usize) -> String {
    format!("SR{:02}A-PC-HSTR-01:SETI", i + 1)
}

/// `n` one-metre drifts.
pub fn drift_lattice(n: usize, symmetry: Option<usize>) -> Lattice {
    let mut lattice = Lattice::new("drifts", symmetry);
    for _ in 0..n {
        lattice.add_element(Element::new("DRIFT", 1.0).unwrap());
    }
    lattice
}

/// A batched lattice of `n` correctors interleaved with drifts.
///
/// Corrector `i` converts with `phys = (i + 1) * eng` and its readback PV
/// holds `i as f64` in engineering units.
pub fn corrector_lattice(cs: &Arc<MockControlSystem>, n: usize) -> EpicsLattice {
    let mut lattice = EpicsLattice::new("ring", cs.clone(), Some(n.max(1)));
    for i in 0..n {
        lattice.add_element(Element::new("DRIFT", 1.0).unwrap());

        let mut corrector = Element::new("HSTR", 0.5)
            .unwrap()
            .named(format!("hstr{}", i + 1));
        corrector.add_to_family(CORRECTOR_FAMILY);
        corrector.set_data_source(Box::new(DeviceDataSource::new()), DataSourceKind::Live);
        let device = EpicsDevice::new(
            format!("SR{:02}A-PC-HSTR-01", i + 1),
            cs.clone(),
            Some(corrector_rb_pv(i)),
            Some(corrector_sp_pv(i)),
        )
        .unwrap();
        let uc = PolyUnitConv::new(vec![(i + 1) as f64, 0.0]).unwrap();
        corrector
            .add_device(CORRECTOR_FIELD, Box::new(device), Arc::new(uc))
            .unwrap();
        cs.put(&corrector_rb_pv(i), i as f64);
        cs.put(&corrector_sp_pv(i), i as f64);
        lattice.add_element(corrector);
    }
    lattice
}

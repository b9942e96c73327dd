//! UnitConv contract test helpers.
//!
//! These functions verify that a conversion model honours the invariants
//! of the [`UnitConv`] trait. Reused across the Poly, Pchip, and Null test
//! modules.

use crate::unitconv::UnitConv;
use accel_core::{Units, UnitsError};

/// Assert that engineering inputs outside the limits are rejected.
pub fn assert_eng_limits_enforced(uc: &dyn UnitConv) {
    let core = uc.core();
    if let Some(lo) = core.lower_limit() {
        let below = lo - 1.0 - lo.abs() * 0.5;
        let err = uc.eng_to_phys(below).unwrap_err();
        assert!(
            matches!(err, UnitsError::BelowLowerLimit { .. }),
            "{}: eng_to_phys({below}) gave {err:?}",
            uc.label()
        );
    }
    if let Some(hi) = core.upper_limit() {
        let above = hi + 1.0 + hi.abs() * 0.5;
        let err = uc.eng_to_phys(above).unwrap_err();
        assert!(
            matches!(err, UnitsError::AboveUpperLimit { .. }),
            "{}: eng_to_phys({above}) gave {err:?}",
            uc.label()
        );
    }
}

/// Assert that `phys_to_eng(eng_to_phys(x)) == x` at each sample.
pub fn assert_round_trip(uc: &dyn UnitConv, samples: &[f64]) {
    for &x in samples {
        let phys = uc.eng_to_phys(x).unwrap_or_else(|e| panic!("{}: {e}", uc.label()));
        let back = uc.phys_to_eng(phys).unwrap_or_else(|e| panic!("{}: {e}", uc.label()));
        assert!(
            (back - x).abs() <= 1e-9 * x.abs().max(1.0),
            "{}: {x} -> {phys} -> {back}",
            uc.label()
        );
    }
}

/// Assert that converting to the same unit system is the identity.
pub fn assert_same_units_identity(uc: &dyn UnitConv, samples: &[f64]) {
    for &x in samples {
        for units in [Units::Eng, Units::Phys] {
            assert_eq!(uc.convert(x, units, units).unwrap(), x);
        }
    }
}

/// Run all compliance checks on a conversion with unique inverses at
/// `samples`.
pub fn run_full_compliance(uc: &dyn UnitConv, samples: &[f64]) {
    assert_eng_limits_enforced(uc);
    assert_round_trip(uc, samples);
    assert_same_units_identity(uc, samples);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NullUnitConv, PchipUnitConv, PolyUnitConv};
    use proptest::prelude::*;

    #[test]
    fn every_model_complies() {
        let poly = PolyUnitConv::new(vec![2.0, 3.0])
            .unwrap()
            .with_limits(Some(-10.0), Some(10.0))
            .unwrap();
        let pchip = PchipUnitConv::new(vec![0.0, 2.0, 5.0, 9.0], vec![0.0, 1.0, 4.0, 5.0]).unwrap();
        let null = NullUnitConv::new().with_limits(Some(-1.0), Some(1.0)).unwrap();
        run_full_compliance(&poly, &[-10.0, -2.5, 0.0, 7.0, 10.0]);
        run_full_compliance(&pchip, &[0.0, 1.0, 2.0, 4.5, 8.0, 9.0]);
        run_full_compliance(&null, &[-1.0, 0.0, 0.3, 1.0]);
    }

    proptest! {
        #[test]
        fn out_of_limit_input_always_rejected(
            lo in -100.0f64..100.0,
            width in 0.1f64..50.0,
            overshoot in 0.001f64..1000.0,
        ) {
            let hi = lo + width;
            let models: Vec<Box<dyn UnitConv>> = vec![
                Box::new(PolyUnitConv::new(vec![1.5, -2.0]).unwrap().with_limits(Some(lo), Some(hi)).unwrap()),
                Box::new(PchipUnitConv::new(vec![lo, hi], vec![0.0, 1.0]).unwrap()),
                Box::new(NullUnitConv::new().with_limits(Some(lo), Some(hi)).unwrap()),
            ];
            for uc in &models {
                prop_assert!(uc.eng_to_phys(lo - overshoot).is_err());
                prop_assert!(uc.eng_to_phys(hi + overshoot).is_err());
            }
        }
    }
}

//! Beam rigidity and the transforms that fold it into magnet conversions.
//!
//! Magnet calibrations map current to integrated field; dividing by the
//! rigidity of the stored beam turns that into a normalised strength.
//! The rigidity depends on the lattice energy, which is only known once
//! the lattice is loaded, so it is injected as a pre/post transform.

use std::sync::Arc;

use accel_core::UnitsError;

use crate::unitconv::Transform;

/// Electron rest energy in MeV (CODATA 2018).
pub const ELECTRON_MASS_MEV: f64 = 0.510_998_950_00;
/// Speed of light in vacuum, m/s.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Magnetic rigidity `p / e` in tesla-metres of an electron beam with
/// total energy `energy_mev`.
///
/// Returns [`UnitsError::InvalidModel`] if the energy is not finite or is
/// below the electron rest energy.
pub fn rigidity(energy_mev: f64) -> Result<f64, UnitsError> {
    if !energy_mev.is_finite() || energy_mev < ELECTRON_MASS_MEV {
        return Err(UnitsError::InvalidModel {
            reason: format!(
                "beam energy {energy_mev} MeV is below the electron rest energy"
            ),
        });
    }
    let gamma = energy_mev / ELECTRON_MASS_MEV;
    let beta = (1.0 - gamma.powi(-2)).sqrt();
    // p/e = beta * E[J] / (c * e) = beta * E[eV] / c
    Ok(beta * energy_mev * 1e6 / SPEED_OF_LIGHT)
}

/// A transform dividing by the rigidity at `energy_mev`.
///
/// Used as the post eng-to-phys transform of magnet conversions.
pub fn div_rigidity(energy_mev: f64) -> Result<Transform, UnitsError> {
    let brho = rigidity(energy_mev)?;
    Ok(Arc::new(move |value| value / brho))
}

/// A transform multiplying by the rigidity at `energy_mev`.
///
/// Used as the pre phys-to-eng transform of magnet conversions.
pub fn mult_rigidity(energy_mev: f64) -> Result<Transform, UnitsError> {
    let brho = rigidity(energy_mev)?;
    Ok(Arc::new(move |value| value * brho))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PolyUnitConv, UnitConv};

    #[test]
    fn rigidity_of_3_gev_beam() {
        // 3 GeV electrons: B rho = 10.0069 T m.
        let brho = rigidity(3000.0).unwrap();
        assert!((brho - 10.0069).abs() < 1e-3, "{brho}");
    }

    #[test]
    fn rigidity_rejects_sub_rest_energy() {
        assert!(rigidity(0.1).is_err());
        assert!(rigidity(f64::NAN).is_err());
        assert!(div_rigidity(-1.0).is_err());
    }

    #[test]
    fn transforms_are_inverse() {
        let div = div_rigidity(3000.0).unwrap();
        let mult = mult_rigidity(3000.0).unwrap();
        assert!((mult(div(12.5)) - 12.5).abs() < 1e-12);
    }

    #[test]
    fn rigidity_scaled_conversion_round_trips() {
        let uc = PolyUnitConv::new(vec![0.05, 0.0])
            .unwrap()
            .with_transforms(div_rigidity(3000.0).unwrap(), mult_rigidity(3000.0).unwrap());
        let k = uc.eng_to_phys(100.0).unwrap();
        assert!((k - 5.0 / rigidity(3000.0).unwrap()).abs() < 1e-12);
        assert!((uc.phys_to_eng(k).unwrap() - 100.0).abs() < 1e-9);
    }
}

//! Polynomial unit conversion.

use accel_core::{Candidates, UnitsError};
use smallvec::smallvec;

use crate::roots::{evaluate, real_roots};
use crate::unitconv::{ConversionCore, UnitConv};

/// Converts through a fixed-coefficient polynomial.
///
/// The forward mapping evaluates `p(eng)`. The inverse solves
/// `p(x) - phys == 0` and keeps the real roots, so a quadratic may give two
/// engineering candidates (ambiguous) or none at all.
///
/// # Examples
///
/// ```
/// use accel_units::{PolyUnitConv, UnitConv};
///
/// let uc = PolyUnitConv::new(vec![2.0, 3.0]).unwrap();
/// assert_eq!(uc.eng_to_phys(4.0).unwrap(), 11.0);
/// assert_eq!(uc.phys_to_eng(11.0).unwrap(), 4.0);
/// ```
#[derive(Clone, Debug)]
pub struct PolyUnitConv {
    core: ConversionCore,
    coef: Vec<f64>,
}

impl PolyUnitConv {
    /// Build from coefficients in decreasing powers.
    ///
    /// Leading zeros are dropped. Returns [`UnitsError::InvalidModel`] for
    /// an empty or non-finite coefficient list.
    pub fn new(coef: Vec<f64>) -> Result<Self, UnitsError> {
        if coef.is_empty() {
            return Err(UnitsError::InvalidModel {
                reason: "polynomial needs at least one coefficient".into(),
            });
        }
        if coef.iter().any(|c| !c.is_finite()) {
            return Err(UnitsError::InvalidModel {
                reason: format!("non-finite polynomial coefficient in {coef:?}"),
            });
        }
        let first = coef.iter().position(|&c| c != 0.0).unwrap_or(coef.len() - 1);
        Ok(Self {
            core: ConversionCore::new(),
            coef: coef[first..].to_vec(),
        })
    }

    /// Coefficients in decreasing powers.
    pub fn coefficients(&self) -> &[f64] {
        &self.coef
    }

    /// Degree of the polynomial.
    pub fn degree(&self) -> usize {
        self.coef.len() - 1
    }
}

impl UnitConv for PolyUnitConv {
    fn type_name(&self) -> &'static str {
        "PolyUnitConv"
    }

    fn core(&self) -> &ConversionCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ConversionCore {
        &mut self.core
    }

    fn raw_eng_to_phys(&self, value: f64) -> Candidates {
        smallvec![evaluate(&self.coef, value)]
    }

    fn raw_phys_to_eng(&self, value: f64) -> Candidates {
        let mut shifted = self.coef.clone();
        if let Some(constant) = shifted.last_mut() {
            *constant -= value;
        }
        real_roots(&shifted)
    }
}

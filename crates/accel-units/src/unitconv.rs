//! The [`UnitConv`] trait and the state shared by every conversion model.

use std::fmt;
use std::sync::Arc;

use accel_core::{Candidates, Units, UnitsError};

/// A scalar transform applied around a raw conversion.
///
/// Used to fold external state into a conversion after construction,
/// most commonly dividing or multiplying by the beam rigidity.
pub type Transform = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// The identity transform.
pub fn identity() -> Transform {
    Arc::new(|value| value)
}

/// Metadata, limits, and transforms common to every conversion model.
///
/// Limits are always expressed in engineering units.
#[derive(Clone)]
pub struct ConversionCore {
    /// Optional identifier. Several elements sharing one calibration
    /// table may carry the same name.
    pub name: Option<String>,
    /// Display label for engineering values.
    pub eng_units: String,
    /// Display label for physics values.
    pub phys_units: String,
    lower_limit: Option<f64>,
    upper_limit: Option<f64>,
    post_eng_to_phys: Transform,
    pre_phys_to_eng: Transform,
}

impl ConversionCore {
    /// Unnamed, unlimited, identity-transformed state.
    pub fn new() -> Self {
        Self {
            name: None,
            eng_units: String::new(),
            phys_units: String::new(),
            lower_limit: None,
            upper_limit: None,
            post_eng_to_phys: identity(),
            pre_phys_to_eng: identity(),
        }
    }

    /// Lower engineering limit, if any.
    pub fn lower_limit(&self) -> Option<f64> {
        self.lower_limit
    }

    /// Upper engineering limit, if any.
    pub fn upper_limit(&self) -> Option<f64> {
        self.upper_limit
    }

    /// Set both limits; `None` removes a bound.
    ///
    /// Returns [`UnitsError::InvalidLimits`] if both are present and
    /// `lower >= upper`. The previous limits are kept on error.
    pub fn set_limits(&mut self, lower: Option<f64>, upper: Option<f64>) -> Result<(), UnitsError> {
        if let (Some(lo), Some(hi)) = (lower, upper) {
            if lo >= hi {
                return Err(UnitsError::InvalidLimits {
                    lower: lo,
                    upper: hi,
                });
            }
        }
        self.lower_limit = lower;
        self.upper_limit = upper;
        Ok(())
    }

    pub(crate) fn within_limits(&self, value: f64) -> bool {
        self.lower_limit.is_none_or(|lo| value >= lo) && self.upper_limit.is_none_or(|hi| value <= hi)
    }
}

impl Default for ConversionCore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConversionCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionCore")
            .field("name", &self.name)
            .field("eng_units", &self.eng_units)
            .field("phys_units", &self.phys_units)
            .field("lower_limit", &self.lower_limit)
            .field("upper_limit", &self.upper_limit)
            .finish_non_exhaustive()
    }
}

/// A reversible scalar mapping between engineering and physics units.
///
/// Implementors supply the raw forward and inverse mappings as candidate
/// sets; the provided methods apply limits and transforms and insist on
/// exactly one surviving candidate. Candidate sets exist because physical
/// models (quadratic responses, non-monotone splines) can be genuinely
/// non-invertible at some inputs: an ambiguous or impossible inverse is
/// reported as an error rather than resolved arbitrarily.
///
/// # Object Safety
///
/// This trait is designed for use as `dyn UnitConv`. The builder-style
/// helpers are restricted to `Self: Sized`.
pub trait UnitConv: Send + Sync + 'static {
    /// Short type name used in diagnostics.
    fn type_name(&self) -> &'static str;

    /// Shared metadata, limits, and transforms.
    fn core(&self) -> &ConversionCore;

    /// Mutable access to the shared state, used during lattice build.
    fn core_mut(&mut self) -> &mut ConversionCore;

    /// Every physics value the model maps `value` to, before the post
    /// transform.
    fn raw_eng_to_phys(&self, value: f64) -> Candidates;

    /// Every real engineering value that maps to `value`, after the pre
    /// transform and before limit filtering.
    fn raw_phys_to_eng(&self, value: f64) -> Candidates;

    /// Display identity: the type name, followed by the name if set.
    fn label(&self) -> String {
        match &self.core().name {
            Some(name) => format!("{} {name}", self.type_name()),
            None => self.type_name().to_string(),
        }
    }

    /// Convert an engineering value to physics units.
    ///
    /// The input is checked against the engineering limits first.
    fn eng_to_phys(&self, value: f64) -> Result<f64, UnitsError> {
        let core = self.core();
        if let Some(limit) = core.lower_limit {
            if value < limit {
                return Err(UnitsError::BelowLowerLimit {
                    conv: self.label(),
                    value,
                    limit,
                });
            }
        }
        if let Some(limit) = core.upper_limit {
            if value > limit {
                return Err(UnitsError::AboveUpperLimit {
                    conv: self.label(),
                    value,
                    limit,
                });
            }
        }
        let results: Candidates = self
            .raw_eng_to_phys(value)
            .into_iter()
            .map(|r| (core.post_eng_to_phys)(r))
            .collect();
        match results.as_slice() {
            [single] => Ok(*single),
            [] => Err(UnitsError::NoSolution { conv: self.label() }),
            many => Err(UnitsError::MultipleSolutions {
                conv: self.label(),
                target: Units::Phys,
                candidates: many.to_vec(),
            }),
        }
    }

    /// Convert a physics value to engineering units.
    ///
    /// Inverse candidates outside the engineering limits are discarded.
    fn phys_to_eng(&self, value: f64) -> Result<f64, UnitsError> {
        let core = self.core();
        let adjusted = (core.pre_phys_to_eng)(value);
        let results = self.raw_phys_to_eng(adjusted);
        let valid: Candidates = results
            .iter()
            .copied()
            .filter(|r| core.within_limits(*r))
            .collect();
        match valid.as_slice() {
            [single] => Ok(*single),
            [] => Err(UnitsError::NoSolutionWithinLimits {
                conv: self.label(),
                candidates: results.to_vec(),
                lower: core.lower_limit,
                upper: core.upper_limit,
            }),
            many => Err(UnitsError::MultipleSolutions {
                conv: self.label(),
                target: Units::Eng,
                candidates: many.to_vec(),
            }),
        }
    }

    /// Convert `value` from `origin` units to `target` units.
    ///
    /// A no-op when the two are equal.
    fn convert(&self, value: f64, origin: Units, target: Units) -> Result<f64, UnitsError> {
        match (origin, target) {
            (Units::Eng, Units::Phys) => self.eng_to_phys(value),
            (Units::Phys, Units::Eng) => self.phys_to_eng(value),
            _ => Ok(value),
        }
    }

    /// Set the engineering-unit conversion limits.
    fn set_conversion_limits(
        &mut self,
        lower: Option<f64>,
        upper: Option<f64>,
    ) -> Result<(), UnitsError> {
        self.core_mut().set_limits(lower, upper)
    }

    /// The conversion limits expressed in `units`, as `(lower, upper)`.
    ///
    /// Absent limits stay absent; present limits are converted through
    /// [`eng_to_phys`](Self::eng_to_phys) when physics units are asked for.
    fn get_conversion_limits(
        &self,
        units: Units,
    ) -> Result<(Option<f64>, Option<f64>), UnitsError> {
        let core = self.core();
        let (lower, upper) = (core.lower_limit, core.upper_limit);
        match units {
            Units::Eng => Ok((lower, upper)),
            Units::Phys => Ok((
                lower.map(|v| self.eng_to_phys(v)).transpose()?,
                upper.map(|v| self.eng_to_phys(v)).transpose()?,
            )),
        }
    }

    /// Replace the transform applied after the raw forward mapping.
    fn set_post_eng_to_phys(&mut self, transform: Transform) {
        self.core_mut().post_eng_to_phys = transform;
    }

    /// Replace the transform applied before the raw inverse mapping.
    fn set_pre_phys_to_eng(&mut self, transform: Transform) {
        self.core_mut().pre_phys_to_eng = transform;
    }

    /// Builder: set the name.
    fn named(mut self, name: impl Into<String>) -> Self
    where
        Self: Sized,
    {
        self.core_mut().name = Some(name.into());
        self
    }

    /// Builder: set the engineering and physics unit labels.
    fn with_units(mut self, eng_units: impl Into<String>, phys_units: impl Into<String>) -> Self
    where
        Self: Sized,
    {
        let core = self.core_mut();
        core.eng_units = eng_units.into();
        core.phys_units = phys_units.into();
        self
    }

    /// Builder: set the post eng-to-phys and pre phys-to-eng transforms.
    fn with_transforms(mut self, post_eng_to_phys: Transform, pre_phys_to_eng: Transform) -> Self
    where
        Self: Sized,
    {
        self.set_post_eng_to_phys(post_eng_to_phys);
        self.set_pre_phys_to_eng(pre_phys_to_eng);
        self
    }

    /// Builder: set the conversion limits.
    fn with_limits(mut self, lower: Option<f64>, upper: Option<f64>) -> Result<Self, UnitsError>
    where
        Self: Sized,
    {
        self.set_conversion_limits(lower, upper)?;
        Ok(self)
    }
}

impl fmt::Debug for dyn UnitConv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(self.type_name())
            .field("core", self.core())
            .finish()
    }
}

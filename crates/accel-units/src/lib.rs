//! Engineering/physics unit conversion for accel lattices.
//!
//! This crate defines the [`UnitConv`] trait, the reversible scalar
//! mapping attached to every field, along with concrete conversion models.
//!
//! # Models
//!
//! - [`PolyUnitConv`]: fixed-coefficient polynomial, inverted by real root
//!   finding
//! - [`PchipUnitConv`]: monotone cubic interpolation of calibration knots
//! - [`NullUnitConv`]: identity, still limit-checked
//!
//! Every conversion applies engineering-unit limits and insists on exactly
//! one result; see [`UnitConv::eng_to_phys`] and [`UnitConv::phys_to_eng`].
//! The [`rigidity`] module builds transforms that fold beam energy into
//! magnet conversions.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod null;
pub mod pchip;
pub mod poly;
pub mod rigidity;
pub mod roots;
pub mod unitconv;

#[cfg(test)]
pub(crate) mod compliance;

pub use null::NullUnitConv;
pub use pchip::{Pchip, PchipUnitConv};
pub use poly::PolyUnitConv;
pub use unitconv::{identity, ConversionCore, Transform, UnitConv};

//! Accel: an accelerator lattice model with unit conversion and batched
//! control-system access.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! accel sub-crates. For most users, adding `accel` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use accel::prelude::*;
//!
//! // One quadrupole whose current (A) maps to a gradient by 2I + 3.
//! let mut quad = Element::new("QUAD", 0.3).unwrap().named("q1");
//! quad.add_to_family("QUAD");
//! quad.set_data_source(Box::new(DeviceDataSource::new()), DataSourceKind::Live);
//! quad.add_device(
//!     "b1",
//!     Box::new(SimpleDevice::new(4.0).writable()),
//!     Arc::new(PolyUnitConv::new(vec![2.0, 3.0]).unwrap()),
//! )
//! .unwrap();
//!
//! let mut ring = Lattice::new("ring", Some(1));
//! ring.add_element(quad);
//!
//! let phys = ring
//!     .get_element_values("quad", "b1", Handle::Readback, Some(Units::Phys), None, true)
//!     .unwrap();
//! assert_eq!(phys, vec![Some(11.0)]);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `accel-core` | Units, handles, data-source kinds, errors, the control-system trait |
//! | [`units`] | `accel-units` | Unit conversion models and rigidity transforms |
//! | [`source`] | `accel-source` | Devices, data sources, the data-source manager |
//! | [`lattice`] | `accel-lattice` | Elements, lattices, batched family access |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core identifiers, error types, and the control-system trait
/// (`accel-core`).
pub use accel_core as types;

/// Unit conversion (`accel-units`).
///
/// The [`units::UnitConv`] trait and its models: [`units::PolyUnitConv`],
/// [`units::PchipUnitConv`], and [`units::NullUnitConv`].
pub use accel_units as units;

/// Devices and data sources (`accel-source`).
pub use accel_source as source;

/// Elements and lattices (`accel-lattice`).
///
/// [`lattice::Lattice`] for per-element access, [`lattice::EpicsLattice`]
/// for batched live access.
pub use accel_lattice as lattice;

/// Common imports for typical accel usage.
///
/// ```rust
/// use accel::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use accel_core::{ControlSystem, DataSourceKind, Handle, Units};

    // Errors
    pub use accel_core::{AccessError, ControlSystemError, UnitsError};
    pub use accel_lattice::{ConfigError, LatticeError};

    // Unit conversion
    pub use accel_units::{NullUnitConv, PchipUnitConv, PolyUnitConv, UnitConv};

    // Data sources
    pub use accel_source::{
        DataSource, DataSourceManager, Device, DeviceDataSource, EpicsDevice, SimpleDevice,
    };

    // Lattice
    pub use accel_lattice::{Element, EpicsLattice, FamilyAccess, Lattice, LatticeConfig};
}

//! Elements, lattices, and family-wide access for accel.
//!
//! A [`Lattice`] owns its [`Element`]s in physical order. Each element and
//! the lattice itself route field access through a
//! [`DataSourceManager`](accel_source::DataSourceManager). Family-wide reads
//! and writes go through the [`FamilyAccess`] trait: [`Lattice`] fans out
//! per element, [`EpicsLattice`] collapses live access into one
//! control-system round trip.
//!
//! # Positions
//!
//! Elements carry no back-pointer. `index`, `s` and `cell` take the lattice
//! as an argument and return `None` unless the element is stored in it:
//!
//! ```
//! use accel_lattice::{Element, Lattice};
//!
//! let mut ring = Lattice::new("ring", Some(2));
//! for _ in 0..5 {
//!     ring.add_element(Element::new("DRIFT", 1.0).unwrap());
//! }
//! let fourth = ring.get(3).unwrap();
//! assert_eq!(fourth.index(&ring), Some(4));
//! assert_eq!(fourth.s(&ring), Some(3.0));
//! assert_eq!(fourth.cell(&ring), Some(2));
//! assert_eq!(ring.cell_bounds(), Some(vec![1, 4, 5]));
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod dtype;
pub mod element;
pub mod epics;
pub mod error;
pub mod lattice;

pub use config::{ConfigError, LatticeConfig};
pub use dtype::ElementDtype;
pub use element::Element;
pub use epics::EpicsLattice;
pub use error::LatticeError;
pub use lattice::{FamilyAccess, Lattice};

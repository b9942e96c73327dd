//! Core types and traits for the accel lattice model.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental abstractions used throughout the accel workspace:
//! unit systems, handles, data-source kinds, error types, and the
//! control-system collaborator trait.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod traits;

pub use error::{AccessError, ControlSystemError, UnitsError};
pub use id::{Candidates, DataSourceKind, Handle, LatticeId, Units};
pub use traits::ControlSystem;

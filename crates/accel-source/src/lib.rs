//! Devices, data sources, and data-source routing for accel lattices.
//!
//! A field's value lives in a [`DataSource`]: hardware-backed sources hold
//! one [`Device`] per field, simulation sources compute values. Every
//! element and lattice owns a [`DataSourceManager`] that picks the source,
//! fetches the raw value in the source's native units, and converts it
//! through the field's [`UnitConv`](accel_units::UnitConv).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod data_source;
pub mod device;
pub mod manager;

#[cfg(test)]
pub(crate) mod testing;

pub use data_source::{DataSource, DeviceDataSource};
pub use device::{Device, Enabled, EpicsDevice, PvEnabler, SimpleDevice};
pub use manager::DataSourceManager;

//! Data sources: where a field's raw value comes from.

use std::fmt;

use indexmap::IndexMap;

use accel_core::{AccessError, Handle, Units};

use crate::device::Device;

/// A provider of raw field values in a fixed native unit system.
///
/// Hardware-backed sources hold [`Device`]s and report engineering units.
/// Simulation sources report physics units and usually compute values on
/// demand.
pub trait DataSource: Send + Sync + 'static {
    /// The unit system values are read and written in.
    fn units(&self) -> Units;

    /// Every field this source can resolve, in registration order.
    fn fields(&self) -> Vec<String>;

    /// Read `field` through `handle`. `Ok(None)` is a failed read with
    /// `throw == false`.
    fn get_value(&self, field: &str, handle: Handle, throw: bool)
        -> Result<Option<f64>, AccessError>;

    /// Write `field` in native units.
    fn set_value(&self, field: &str, value: f64, throw: bool) -> Result<(), AccessError>;

    /// Register a device under `field`.
    ///
    /// Sources that do not hold devices return [`AccessError::DataSource`].
    fn add_device(&mut self, field: &str, _device: Box<dyn Device>) -> Result<(), AccessError> {
        Err(AccessError::data_source(format!(
            "cannot add device for field '{field}': data source does not hold devices"
        )))
    }

    /// The device registered under `field`.
    fn device(&self, field: &str) -> Result<&dyn Device, AccessError> {
        Err(AccessError::data_source(format!(
            "cannot get device for field '{field}': data source does not hold devices"
        )))
    }
}

impl fmt::Debug for dyn DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSource")
            .field("units", &self.units())
            .field("fields", &self.fields())
            .finish()
    }
}

/// A data source backed by one device per field.
#[derive(Debug)]
pub struct DeviceDataSource {
    units: Units,
    devices: IndexMap<String, Box<dyn Device>>,
}

impl DeviceDataSource {
    /// An empty source in engineering units.
    pub fn new() -> Self {
        Self {
            units: Units::Eng,
            devices: IndexMap::new(),
        }
    }

    /// Override the native unit system.
    pub fn with_units(mut self, units: Units) -> Self {
        self.units = units;
        self
    }

    /// Number of registered devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Returns `true` if no device is registered.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    fn lookup(&self, field: &str) -> Result<&dyn Device, AccessError> {
        self.devices
            .get(field)
            .map(|dev| dev.as_ref())
            .ok_or_else(|| AccessError::field(format!("no device for field '{field}'")))
    }
}

impl Default for DeviceDataSource {
    fn default() -> Self {
        Self::new()
    }
}

impl DataSource for DeviceDataSource {
    fn units(&self) -> Units {
        self.units
    }

    fn fields(&self) -> Vec<String> {
        self.devices.keys().cloned().collect()
    }

    fn get_value(
        &self,
        field: &str,
        handle: Handle,
        throw: bool,
    ) -> Result<Option<f64>, AccessError> {
        self.lookup(field)?.get_value(handle, throw)
    }

    fn set_value(&self, field: &str, value: f64, throw: bool) -> Result<(), AccessError> {
        self.lookup(field)?.set_value(value, throw)
    }

    fn add_device(&mut self, field: &str, device: Box<dyn Device>) -> Result<(), AccessError> {
        self.devices.insert(field.to_owned(), device);
        Ok(())
    }

    fn device(&self, field: &str) -> Result<&dyn Device, AccessError> {
        self.lookup(field)
    }
}

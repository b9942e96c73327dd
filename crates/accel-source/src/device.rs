//! Devices: the hardware quantities behind an element's fields.
//!
//! A [`Device`] knows how to read and write exactly one quantity. Devices
//! report values in engineering units; conversion happens in the
//! [`DataSourceManager`](crate::DataSourceManager).

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use accel_core::{AccessError, ControlSystem, Handle};

/// One readable (and possibly writable) quantity of an element.
pub trait Device: Send + Sync + 'static {
    /// Display name of the device. May be empty.
    fn name(&self) -> &str;

    /// Whether the device is currently usable.
    fn is_enabled(&self) -> Result<bool, AccessError>;

    /// Read the value behind `handle`.
    ///
    /// `Ok(None)` means the read failed with `throw == false`.
    fn get_value(&self, handle: Handle, throw: bool) -> Result<Option<f64>, AccessError>;

    /// Write a new value. Writes always go to the setpoint.
    fn set_value(&self, value: f64, throw: bool) -> Result<(), AccessError>;

    /// The process-variable name behind `handle`.
    ///
    /// Devices that are not backed by a control system have no PVs and
    /// return [`AccessError::DataSource`].
    fn pv_name(&self, _handle: Handle) -> Result<&str, AccessError> {
        Err(AccessError::data_source(format!(
            "device '{}' is not backed by process variables",
            self.name()
        )))
    }
}

impl fmt::Debug for dyn Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Device({:?})", self.name())
    }
}

/// Compares a PV against a fixed value to decide whether a device is on.
#[derive(Clone)]
pub struct PvEnabler {
    pv: String,
    enabled_value: i64,
    cs: Arc<dyn ControlSystem>,
}

impl PvEnabler {
    /// Enabled whenever the integer part of `pv` equals the integer part of
    /// `enabled_value`.
    pub fn new(pv: impl Into<String>, enabled_value: f64, cs: Arc<dyn ControlSystem>) -> Self {
        Self {
            pv: pv.into(),
            enabled_value: enabled_value.trunc() as i64,
            cs,
        }
    }

    /// The PV that gates the device.
    pub fn pv(&self) -> &str {
        &self.pv
    }

    /// Read the PV (failures propagate) and compare.
    pub fn is_enabled(&self) -> Result<bool, AccessError> {
        let value = self.cs.get_single(&self.pv, true)?;
        Ok(value.is_some_and(|v| v.trunc() as i64 == self.enabled_value))
    }
}

impl fmt::Debug for PvEnabler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PvEnabler")
            .field("pv", &self.pv)
            .field("enabled_value", &self.enabled_value)
            .finish_non_exhaustive()
    }
}

/// How a device decides whether it is enabled.
#[derive(Clone, Debug)]
pub enum Enabled {
    /// A fixed answer.
    Always(bool),
    /// Gated on a PV.
    Pv(PvEnabler),
}

impl Enabled {
    /// Evaluate the enablement rule.
    pub fn is_enabled(&self) -> Result<bool, AccessError> {
        match self {
            Self::Always(on) => Ok(*on),
            Self::Pv(enabler) => enabler.is_enabled(),
        }
    }
}

impl Default for Enabled {
    fn default() -> Self {
        Self::Always(true)
    }
}

/// A device holding a constant value, e.g. a fixed length or a model
/// parameter. Read-only unless built with [`writable`](Self::writable).
#[derive(Debug)]
pub struct SimpleDevice {
    name: String,
    value: Mutex<Option<f64>>,
    enabled: Enabled,
    readonly: bool,
}

impl SimpleDevice {
    /// A read-only device reporting `value` on both handles.
    pub fn new(value: f64) -> Self {
        Self {
            name: String::new(),
            value: Mutex::new(Some(value)),
            enabled: Enabled::default(),
            readonly: true,
        }
    }

    /// Set the display name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Allow [`Device::set_value`].
    pub fn writable(mut self) -> Self {
        self.readonly = false;
        self
    }

    /// Replace the enablement rule.
    pub fn with_enabled(mut self, enabled: Enabled) -> Self {
        self.enabled = enabled;
        self
    }

    /// Whether writes are rejected.
    pub fn is_readonly(&self) -> bool {
        self.readonly
    }
}

impl Device for SimpleDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> Result<bool, AccessError> {
        self.enabled.is_enabled()
    }

    fn get_value(&self, _handle: Handle, _throw: bool) -> Result<Option<f64>, AccessError> {
        Ok(*self.value.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn set_value(&self, value: f64, _throw: bool) -> Result<(), AccessError> {
        if self.readonly {
            return Err(AccessError::data_source(format!(
                "cannot change value of read-only device '{}'",
                self.name
            )));
        }
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = Some(value);
        Ok(())
    }
}

/// A device backed by a readback PV and/or a setpoint PV.
#[derive(Clone)]
pub struct EpicsDevice {
    name: String,
    cs: Arc<dyn ControlSystem>,
    enabled: Enabled,
    rb_pv: Option<String>,
    sp_pv: Option<String>,
}

impl EpicsDevice {
    /// Build a device. At least one of `rb_pv` and `sp_pv` is required.
    pub fn new(
        name: impl Into<String>,
        cs: Arc<dyn ControlSystem>,
        rb_pv: Option<String>,
        sp_pv: Option<String>,
    ) -> Result<Self, AccessError> {
        let name = name.into();
        if rb_pv.is_none() && sp_pv.is_none() {
            return Err(AccessError::data_source(format!(
                "readback or setpoint PV must be given when creating device '{name}'"
            )));
        }
        Ok(Self {
            name,
            cs,
            enabled: Enabled::default(),
            rb_pv,
            sp_pv,
        })
    }

    /// Replace the enablement rule.
    pub fn with_enabled(mut self, enabled: Enabled) -> Self {
        self.enabled = enabled;
        self
    }

    /// The control system this device talks to.
    pub fn control_system(&self) -> &Arc<dyn ControlSystem> {
        &self.cs
    }
}

impl fmt::Debug for EpicsDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EpicsDevice")
            .field("name", &self.name)
            .field("enabled", &self.enabled)
            .field("rb_pv", &self.rb_pv)
            .field("sp_pv", &self.sp_pv)
            .finish_non_exhaustive()
    }
}

impl Device for EpicsDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> Result<bool, AccessError> {
        self.enabled.is_enabled()
    }

    fn get_value(&self, handle: Handle, throw: bool) -> Result<Option<f64>, AccessError> {
        let pv = self.pv_name(handle)?;
        Ok(self.cs.get_single(pv, throw)?)
    }

    fn set_value(&self, value: f64, throw: bool) -> Result<(), AccessError> {
        let pv = self.pv_name(Handle::Setpoint)?;
        if !self.cs.set_single(pv, value, throw)? {
            tracing::warn!(device = %self.name, pv, value, "setpoint write failed");
        }
        Ok(())
    }

    fn pv_name(&self, handle: Handle) -> Result<&str, AccessError> {
        let pv = match handle {
            Handle::Readback => self.rb_pv.as_deref(),
            Handle::Setpoint => self.sp_pv.as_deref(),
        };
        pv.ok_or_else(|| {
            AccessError::handle(format!("device '{}' has no {handle} PV", self.name))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingControlSystem;

    fn device(cs: &Arc<RecordingControlSystem>) -> EpicsDevice {
        EpicsDevice::new(
            "SR01C-DI-EBPM-01:X",
            cs.clone(),
            Some("SR01C-DI-EBPM-01:SA:X".into()),
            Some("SR01C-DI-EBPM-01:SA:X:SP".into()),
        )
        .unwrap()
    }

    #[test]
    fn simple_device_reads_constant() {
        let dev = SimpleDevice::new(1.0);
        assert_eq!(dev.get_value(Handle::Readback, true).unwrap(), Some(1.0));
        assert_eq!(dev.get_value(Handle::Setpoint, true).unwrap(), Some(1.0));
        assert!(dev.is_enabled().unwrap());
        assert!(dev.pv_name(Handle::Readback).unwrap_err().is_data_source());
    }

    #[test]
    fn readonly_simple_device_rejects_writes() {
        let dev = SimpleDevice::new(1.0);
        assert!(dev.set_value(2.0, true).unwrap_err().is_data_source());
        assert_eq!(dev.get_value(Handle::Readback, true).unwrap(), Some(1.0));

        let dev = SimpleDevice::new(1.0).writable();
        dev.set_value(2.0, true).unwrap();
        assert_eq!(dev.get_value(Handle::Readback, true).unwrap(), Some(2.0));
    }

    #[test]
    fn epics_device_needs_a_pv() {
        let cs = Arc::new(RecordingControlSystem::default());
        let err = EpicsDevice::new("d", cs, None, None).unwrap_err();
        assert!(err.is_data_source());
    }

    #[test]
    fn epics_device_reads_and_writes_through_pvs() {
        let cs = Arc::new(RecordingControlSystem::default());
        cs.put("SR01C-DI-EBPM-01:SA:X", 0.25);
        let dev = device(&cs);
        assert_eq!(dev.get_value(Handle::Readback, true).unwrap(), Some(0.25));
        dev.set_value(1.5, true).unwrap();
        assert_eq!(cs.value("SR01C-DI-EBPM-01:SA:X:SP"), Some(1.5));
    }

    #[test]
    fn missing_handle_is_a_handle_error() {
        let cs = Arc::new(RecordingControlSystem::default());
        let dev = EpicsDevice::new("d", cs, Some("rb".into()), None).unwrap();
        assert_eq!(dev.pv_name(Handle::Readback).unwrap(), "rb");
        assert!(dev.pv_name(Handle::Setpoint).unwrap_err().is_handle());
        assert!(dev.set_value(1.0, true).unwrap_err().is_handle());
    }

    #[test]
    fn pv_enabler_truncates() {
        let cs = Arc::new(RecordingControlSystem::default());
        cs.put("enable", 1.7);
        let on = PvEnabler::new("enable", 1.2, cs.clone());
        let off = PvEnabler::new("enable", 0.0, cs.clone());
        assert!(on.is_enabled().unwrap());
        assert!(!off.is_enabled().unwrap());

        let dev = device(&cs).with_enabled(Enabled::Pv(off));
        assert!(!dev.is_enabled().unwrap());
    }

    #[test]
    fn pv_enabler_propagates_read_failure() {
        let cs = Arc::new(RecordingControlSystem::default());
        let enabler = PvEnabler::new("missing", 1.0, cs);
        assert!(enabler.is_enabled().unwrap_err().is_control_system());
    }
}

//! In-crate test doubles.

use std::collections::HashMap;
use std::sync::Mutex;

use indexmap::IndexMap;

use accel_core::{AccessError, ControlSystem, ControlSystemError, Handle, Units};

use crate::data_source::DataSource;

/// In-memory transport. Unknown PVs fail.
#[derive(Default)]
pub(crate) struct RecordingControlSystem {
    pvs: Mutex<HashMap<String, f64>>,
}

impl RecordingControlSystem {
    pub(crate) fn put(&self, pv: &str, value: f64) {
        self.pvs.lock().unwrap().insert(pv.to_owned(), value);
    }

    pub(crate) fn value(&self, pv: &str) -> Option<f64> {
        self.pvs.lock().unwrap().get(pv).copied()
    }

    fn read(&self, pv: &str, throw: bool) -> Result<Option<f64>, ControlSystemError> {
        match self.value(pv) {
            Some(v) => Ok(Some(v)),
            None if throw => Err(ControlSystemError::Connection {
                pv: pv.to_owned(),
                reason: "unknown PV".into(),
            }),
            None => Ok(None),
        }
    }
}

impl ControlSystem for RecordingControlSystem {
    fn get_single(&self, pv: &str, throw: bool) -> Result<Option<f64>, ControlSystemError> {
        self.read(pv, throw)
    }

    fn get_multiple(
        &self,
        pvs: &[String],
        throw: bool,
    ) -> Result<Vec<Option<f64>>, ControlSystemError> {
        pvs.iter().map(|pv| self.read(pv, throw)).collect()
    }

    fn set_single(&self, pv: &str, value: f64, _throw: bool) -> Result<bool, ControlSystemError> {
        self.put(pv, value);
        Ok(true)
    }

    fn set_multiple(
        &self,
        pvs: &[String],
        values: &[f64],
        throw: bool,
    ) -> Result<Vec<bool>, ControlSystemError> {
        pvs.iter()
            .zip(values)
            .map(|(pv, v)| self.set_single(pv, *v, throw))
            .collect()
    }
}

/// Physics-unit source with fixed values.
#[derive(Default)]
pub(crate) struct FixedSimulation {
    values: IndexMap<String, f64>,
}

impl FixedSimulation {
    pub(crate) fn with(mut self, field: &str, value: f64) -> Self {
        self.values.insert(field.to_owned(), value);
        self
    }
}

impl DataSource for FixedSimulation {
    fn units(&self) -> Units {
        Units::Phys
    }

    fn fields(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    fn get_value(
        &self,
        field: &str,
        _handle: Handle,
        _throw: bool,
    ) -> Result<Option<f64>, AccessError> {
        self.values
            .get(field)
            .map(|v| Some(*v))
            .ok_or_else(|| AccessError::field(format!("simulation has no field '{field}'")))
    }

    fn set_value(&self, field: &str, _value: f64, _throw: bool) -> Result<(), AccessError> {
        Err(AccessError::handle(format!(
            "simulated field '{field}' is read-only"
        )))
    }
}

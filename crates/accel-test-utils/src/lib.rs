//! Test utilities and mock types for accel development.
//!
//! Provides an in-memory [`ControlSystem`] that counts round trips, a
//! physics-unit [`DataSource`] standing in for a simulator, and lattice
//! builders in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use indexmap::IndexMap;
use tracing::warn;

use accel_core::{AccessError, ControlSystem, ControlSystemError, Handle, Units};
use accel_source::DataSource;

/// In-memory [`ControlSystem`].
///
/// Reading a PV that was never [`put`](MockControlSystem::put) fails, as
/// does any PV marked with [`fail`](MockControlSystem::fail). Every
/// trait call is counted so tests can assert on the number of round trips.
#[derive(Default)]
pub struct MockControlSystem {
    pvs: Mutex<HashMap<String, f64>>,
    failing: Mutex<HashSet<String>>,
    get_single: AtomicUsize,
    get_multiple: AtomicUsize,
    set_single: AtomicUsize,
    set_multiple: AtomicUsize,
}

impl MockControlSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a PV value.
    pub fn put(&self, pv: &str, value: f64) {
        self.pvs.lock().unwrap().insert(pv.to_owned(), value);
    }

    /// Current PV value, bypassing the call counters.
    pub fn value(&self, pv: &str) -> Option<f64> {
        self.pvs.lock().unwrap().get(pv).copied()
    }

    /// Make every access to `pv` fail.
    pub fn fail(&self, pv: &str) {
        self.failing.lock().unwrap().insert(pv.to_owned());
    }

    pub fn get_single_calls(&self) -> usize {
        self.get_single.load(Ordering::SeqCst)
    }

    pub fn get_multiple_calls(&self) -> usize {
        self.get_multiple.load(Ordering::SeqCst)
    }

    pub fn set_single_calls(&self) -> usize {
        self.set_single.load(Ordering::SeqCst)
    }

    pub fn set_multiple_calls(&self) -> usize {
        self.set_multiple.load(Ordering::SeqCst)
    }

    /// Total round trips of any kind.
    pub fn total_calls(&self) -> usize {
        self.get_single_calls()
            + self.get_multiple_calls()
            + self.set_single_calls()
            + self.set_multiple_calls()
    }

    fn is_failing(&self, pv: &str) -> bool {
        self.failing.lock().unwrap().contains(pv)
    }

    fn failure(pv: &str, reason: &str) -> ControlSystemError {
        ControlSystemError::Connection {
            pv: pv.to_owned(),
            reason: reason.to_owned(),
        }
    }

    fn read(&self, pv: &str, throw: bool) -> Result<Option<f64>, ControlSystemError> {
        let value = if self.is_failing(pv) {
            None
        } else {
            self.value(pv)
        };
        match value {
            Some(v) => Ok(Some(v)),
            None if throw => Err(Self::failure(pv, "read failed")),
            None => {
                warn!(pv, "cannot connect; returning None");
                Ok(None)
            }
        }
    }

    fn write(&self, pv: &str, value: f64, throw: bool) -> Result<bool, ControlSystemError> {
        if self.is_failing(pv) {
            if throw {
                return Err(Self::failure(pv, "write failed"));
            }
            warn!(pv, value, "cannot connect; write skipped");
            return Ok(false);
        }
        self.put(pv, value);
        Ok(true)
    }
}

impl ControlSystem for MockControlSystem {
    fn get_single(&self, pv: &str, throw: bool) -> Result<Option<f64>, ControlSystemError> {
        self.get_single.fetch_add(1, Ordering::SeqCst);
        self.read(pv, throw)
    }

    fn get_multiple(
        &self,
        pvs: &[String],
        throw: bool,
    ) -> Result<Vec<Option<f64>>, ControlSystemError> {
        self.get_multiple.fetch_add(1, Ordering::SeqCst);
        pvs.iter().map(|pv| self.read(pv, throw)).collect()
    }

    fn set_single(&self, pv: &str, value: f64, throw: bool) -> Result<bool, ControlSystemError> {
        self.set_single.fetch_add(1, Ordering::SeqCst);
        self.write(pv, value, throw)
    }

    fn set_multiple(
        &self,
        pvs: &[String],
        values: &[f64],
        throw: bool,
    ) -> Result<Vec<bool>, ControlSystemError> {
        self.set_multiple.fetch_add(1, Ordering::SeqCst);
        if pvs.len() != values.len() {
            return Err(ControlSystemError::LengthMismatch {
                pvs: pvs.len(),
                values: values.len(),
            });
        }
        pvs.iter()
            .zip(values)
            .map(|(pv, v)| self.write(pv, *v, throw))
            .collect()
    }
}

/// A simulator stand-in holding physics-unit values per field.
///
/// Writes store the new value; reads of unknown fields fail with
/// [`AccessError::Field`].
#[derive(Default)]
pub struct MockSimulation {
    values: Mutex<IndexMap<String, f64>>,
}

impl MockSimulation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`put`](Self::put).
    pub fn with(self, field: &str, value: f64) -> Self {
        self.put(field, value);
        self
    }

    pub fn put(&self, field: &str, value: f64) {
        self.values.lock().unwrap().insert(field.to_owned(), value);
    }

    pub fn value(&self, field: &str) -> Option<f64> {
        self.values.lock().unwrap().get(field).copied()
    }
}

impl DataSource for MockSimulation {
    fn units(&self) -> Units {
        Units::Phys
    }

    fn fields(&self) -> Vec<String> {
        self.values.lock().unwrap().keys().cloned().collect()
    }

    fn get_value(
        &self,
        field: &str,
        _handle: Handle,
        _throw: bool,
    ) -> Result<Option<f64>, AccessError> {
        self.value(field)
            .map(Some)
            .ok_or_else(|| AccessError::field(format!("no field '{field}' in simulation")))
    }

    fn set_value(&self, field: &str, value: f64, _throw: bool) -> Result<(), AccessError> {
        let mut values = self.values.lock().unwrap();
        match values.get_mut(field) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(AccessError::field(format!(
                "no field '{field}' in simulation"
            ))),
        }
    }
}

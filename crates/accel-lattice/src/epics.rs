//! Batched live access through a control system.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use tracing::debug;

use accel_core::{AccessError, ControlSystem, DataSourceKind, Handle, Units};

use crate::config::{ConfigError, LatticeConfig};
use crate::error::LatticeError;
use crate::lattice::{check_count, FamilyAccess, Lattice};

/// A lattice whose live family reads and writes go through one
/// control-system call each.
///
/// Derefs to [`Lattice`] for everything else. Non-live access falls back
/// to the per-element path.
pub struct EpicsLattice {
    lattice: Lattice,
    cs: Arc<dyn ControlSystem>,
}

impl EpicsLattice {
    /// An empty batched lattice.
    pub fn new(name: impl Into<String>, cs: Arc<dyn ControlSystem>, symmetry: Option<usize>) -> Self {
        Self {
            lattice: Lattice::new(name, symmetry),
            cs,
        }
    }

    /// An empty batched lattice built from a validated configuration.
    pub fn from_config(
        config: &LatticeConfig,
        cs: Arc<dyn ControlSystem>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            lattice: Lattice::from_config(config)?,
            cs,
        })
    }

    /// Wrap an existing lattice.
    pub fn from_lattice(lattice: Lattice, cs: Arc<dyn ControlSystem>) -> Self {
        Self { lattice, cs }
    }

    /// Unwrap into the plain lattice.
    pub fn into_inner(self) -> Lattice {
        self.lattice
    }

    /// The control system used for batched access.
    pub fn control_system(&self) -> &Arc<dyn ControlSystem> {
        &self.cs
    }

    /// PV behind a lattice-scoped field.
    pub fn pv_name(&self, field: &str, handle: Handle) -> Result<&str, AccessError> {
        self.lattice
            .manager()
            .device(field)
            .and_then(|dev| dev.pv_name(handle))
            .map_err(|e| e.with_owner(&self.lattice))
    }

    /// PVs behind `field` for every element of `family`, in family order.
    pub fn element_pv_names(
        &self,
        family: &str,
        field: &str,
        handle: Handle,
    ) -> Result<Vec<String>, LatticeError> {
        self.lattice
            .get_elements(Some(family), None)?
            .into_iter()
            .map(|elem| -> Result<String, LatticeError> {
                Ok(elem.pv_name(field, handle)?.to_owned())
            })
            .collect()
    }
}

impl FamilyAccess for EpicsLattice {
    fn get_element_values(
        &self,
        family: &str,
        field: &str,
        handle: Handle,
        units: Option<Units>,
        kind: Option<DataSourceKind>,
        throw: bool,
    ) -> Result<Vec<Option<f64>>, LatticeError> {
        let kind = kind.unwrap_or(self.default_data_source());
        let units = units.unwrap_or(self.default_units());
        if kind != DataSourceKind::Live {
            return self.lattice.get_element_values(
                family,
                field,
                handle,
                Some(units),
                Some(kind),
                throw,
            );
        }
        let pvs = self.element_pv_names(family, field, handle)?;
        debug!(lattice = %self.name(), family, field, %handle, %units, channels = pvs.len(), "batched read");
        let values = self
            .cs
            .get_multiple(&pvs, throw)
            .map_err(|e| AccessError::from(e).with_owner(&self.lattice))?;
        match units {
            Units::Eng => Ok(values),
            Units::Phys => {
                self.convert_family_values(family, field, &values, Units::Eng, Units::Phys)
            }
        }
    }

    fn set_element_values(
        &self,
        family: &str,
        field: &str,
        values: &[f64],
        units: Option<Units>,
        kind: Option<DataSourceKind>,
        throw: bool,
    ) -> Result<(), LatticeError> {
        let kind = kind.unwrap_or(self.default_data_source());
        let units = units.unwrap_or(self.default_units());
        if kind != DataSourceKind::Live {
            return self.lattice.set_element_values(
                family,
                field,
                values,
                Some(units),
                Some(kind),
                throw,
            );
        }
        let pvs = self.element_pv_names(family, field, Handle::Setpoint)?;
        check_count(pvs.len(), values.len())?;
        let native: Vec<f64> = match units {
            Units::Eng => values.to_vec(),
            Units::Phys => {
                let phys: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
                self.convert_family_values(family, field, &phys, Units::Phys, Units::Eng)?
                    .into_iter()
                    .flatten()
                    .collect()
            }
        };
        debug!(lattice = %self.name(), family, field, %units, channels = pvs.len(), "batched write");
        self.cs
            .set_multiple(&pvs, &native, throw)
            .map_err(|e| AccessError::from(e).with_owner(&self.lattice))?;
        Ok(())
    }
}

impl Deref for EpicsLattice {
    type Target = Lattice;

    fn deref(&self) -> &Lattice {
        &self.lattice
    }
}

impl DerefMut for EpicsLattice {
    fn deref_mut(&mut self) -> &mut Lattice {
        &mut self.lattice
    }
}

impl fmt::Debug for EpicsLattice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EpicsLattice")
            .field("lattice", &self.lattice)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for EpicsLattice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.lattice, f)
    }
}

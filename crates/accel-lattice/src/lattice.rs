//! The lattice: an ordered ring of elements plus lattice-wide fields.

use std::fmt;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, warn};

use accel_core::{AccessError, DataSourceKind, Handle, LatticeId, Units};
use accel_source::{DataSource, DataSourceManager, Device};
use accel_units::UnitConv;

use crate::config::{ConfigError, LatticeConfig};
use crate::dtype::{coerce, ElementDtype};
use crate::element::Element;
use crate::error::LatticeError;

/// Family-wide reads and writes.
///
/// [`Lattice`] implements this one element at a time;
/// [`EpicsLattice`](crate::EpicsLattice) batches live access into a
/// single control-system round trip. Values are always in family order.
pub trait FamilyAccess {
    /// Read `field` on every element of `family`.
    fn get_element_values(
        &self,
        family: &str,
        field: &str,
        handle: Handle,
        units: Option<Units>,
        kind: Option<DataSourceKind>,
        throw: bool,
    ) -> Result<Vec<Option<f64>>, LatticeError>;

    /// Write one value per element of `family`.
    ///
    /// Fails with [`LatticeError::LengthMismatch`] before any write if
    /// `values` does not match the family size.
    fn set_element_values(
        &self,
        family: &str,
        field: &str,
        values: &[f64],
        units: Option<Units>,
        kind: Option<DataSourceKind>,
        throw: bool,
    ) -> Result<(), LatticeError>;

    /// Like [`get_element_values`](Self::get_element_values), collected
    /// into a fixed-width numeric type.
    fn get_element_values_as<T: ElementDtype>(
        &self,
        family: &str,
        field: &str,
        handle: Handle,
        units: Option<Units>,
        kind: Option<DataSourceKind>,
        throw: bool,
    ) -> Result<Vec<T>, LatticeError>
    where
        Self: Sized,
    {
        let values = self.get_element_values(family, field, handle, units, kind, throw)?;
        coerce(&values)
    }
}

/// An ordered collection of elements.
///
/// Insertion order is physical order. The lattice owns its elements and
/// tags each with its [`LatticeId`], so element positions can be derived
/// without a back-pointer. It also owns a [`DataSourceManager`] for
/// lattice-scoped fields such as beam energy.
#[derive(Debug)]
pub struct Lattice {
    id: LatticeId,
    name: String,
    symmetry: Option<usize>,
    elements: Vec<Element>,
    manager: DataSourceManager,
}

impl Lattice {
    /// An empty lattice. `symmetry` is the number of cells.
    pub fn new(name: impl Into<String>, symmetry: Option<usize>) -> Self {
        Self {
            id: LatticeId::next(),
            name: name.into(),
            symmetry,
            elements: Vec::new(),
            manager: DataSourceManager::new(),
        }
    }

    /// An empty lattice built from a validated configuration.
    pub fn from_config(config: &LatticeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut lattice = Self::new(config.name.clone(), config.symmetry);
        lattice.manager.set_default_units(config.default_units);
        lattice
            .manager
            .set_default_data_source(config.default_data_source);
        Ok(lattice)
    }

    /// Unique identity of this lattice.
    pub fn id(&self) -> LatticeId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of cells, if periodic.
    pub fn symmetry(&self) -> Option<usize> {
        self.symmetry
    }

    /// Append an element and claim it for this lattice.
    pub fn add_element(&mut self, mut element: Element) {
        element.set_lattice(self.id);
        self.elements.push(element);
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if the lattice has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The element at 0-based position `n`.
    pub fn get(&self, n: usize) -> Option<&Element> {
        self.elements.get(n)
    }

    /// Mutable access to the element at 0-based position `n`.
    pub fn get_mut(&mut self, n: usize) -> Option<&mut Element> {
        self.elements.get_mut(n)
    }

    /// All elements in physical order.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Total length in metres.
    pub fn length(&self) -> f64 {
        self.elements.iter().map(Element::length).sum()
    }

    /// Average cell length, if the lattice has a symmetry and non-zero
    /// length.
    pub fn cell_length(&self) -> Option<f64> {
        let symmetry = self.symmetry?;
        let length = self.length();
        if length == 0.0 || symmetry == 0 {
            return None;
        }
        Some(length / symmetry as f64)
    }

    /// 1-based indices at which each cell begins, closed by the element
    /// count.
    ///
    /// Five equal elements with a symmetry of two give `[1, 4, 5]`: the
    /// second cell starts halfway through element 3, so element 4 is the
    /// first that starts in it. A cell in which no element starts is
    /// skipped.
    pub fn cell_bounds(&self) -> Option<Vec<usize>> {
        let symmetry = self.symmetry?;
        if self.elements.is_empty() {
            return None;
        }
        let cells: Vec<Option<usize>> = self.element_cells();
        let mut bounds = vec![1];
        for cell in 2..=symmetry {
            let start = bounds[bounds.len() - 1];
            if let Some(offset) = cells[start..].iter().position(|c| *c == Some(cell)) {
                bounds.push(start + offset + 1);
            }
        }
        bounds.push(self.elements.len());
        Some(bounds)
    }

    /// Cell of every element, in one pass.
    fn element_cells(&self) -> Vec<Option<usize>> {
        let cell_length = self.cell_length();
        let mut s = 0.0;
        self.elements
            .iter()
            .map(|e| {
                let cell = cell_length.map(|cl| (s / cl).floor() as usize + 1);
                s += e.length();
                cell
            })
            .collect()
    }

    /// Elements in `family` (all elements if `None`), optionally restricted
    /// to one cell, in physical order.
    ///
    /// Returns [`LatticeError::NoElements`] if the result would be empty.
    pub fn get_elements(
        &self,
        family: Option<&str>,
        cell: Option<usize>,
    ) -> Result<Vec<&Element>, LatticeError> {
        let cells = match cell {
            Some(_) => self.element_cells(),
            None => Vec::new(),
        };
        let mut selected: Vec<(usize, &Element)> = match family {
            None => {
                if self.elements.is_empty() {
                    return Err(LatticeError::NoElements {
                        reason: format!("no elements in lattice {self}"),
                    });
                }
                self.elements.iter().enumerate().collect()
            }
            Some(family) => {
                let matches: Vec<_> = self
                    .elements
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| e.is_in_family(family))
                    .collect();
                if matches.is_empty() {
                    return Err(LatticeError::NoElements {
                        reason: format!("{self}: no elements in family {family}"),
                    });
                }
                matches
            }
        };
        if let Some(cell) = cell {
            selected.retain(|(i, _)| cells[*i] == Some(cell));
            if selected.is_empty() {
                return Err(LatticeError::NoElements {
                    reason: format!("{self}: no elements in cell {cell}"),
                });
            }
        }
        Ok(selected.into_iter().map(|(_, e)| e).collect())
    }

    /// Every family used by any element.
    pub fn all_families(&self) -> IndexSet<String> {
        self.elements
            .iter()
            .flat_map(|e| e.families().map(str::to_owned))
            .collect()
    }

    /// `s` position of every element in `family`.
    pub fn family_s(&self, family: &str) -> Result<Vec<f64>, LatticeError> {
        let wanted = self.get_elements(Some(family), None)?;
        let mut out = Vec::with_capacity(wanted.len());
        let mut s = 0.0;
        for elem in &self.elements {
            if wanted.iter().any(|w| std::ptr::eq(*w, elem)) {
                out.push(s);
            }
            s += elem.length();
        }
        Ok(out)
    }

    /// Live devices for `field` on the elements of `family`.
    ///
    /// Elements without such a device are skipped with a warning.
    pub fn element_devices(
        &self,
        family: &str,
        field: &str,
    ) -> Result<Vec<&dyn Device>, LatticeError> {
        let mut devices = Vec::new();
        for elem in self.get_elements(Some(family), None)? {
            match elem.device(field) {
                Ok(dev) => devices.push(dev),
                Err(err) if err.is_field() || err.is_data_source() => {
                    warn!(%elem, field, "no device for field on element");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(devices)
    }

    /// Names of the devices returned by
    /// [`element_devices`](Self::element_devices).
    pub fn element_device_names(
        &self,
        family: &str,
        field: &str,
    ) -> Result<Vec<String>, LatticeError> {
        Ok(self
            .element_devices(family, field)?
            .into_iter()
            .map(|dev| dev.name().to_owned())
            .collect())
    }

    /// The lattice's own data-source manager.
    pub fn manager(&self) -> &DataSourceManager {
        &self.manager
    }

    /// Mutable access to the lattice's own data-source manager.
    pub fn manager_mut(&mut self) -> &mut DataSourceManager {
        &mut self.manager
    }

    /// Register (or replace) a lattice-scoped data source.
    pub fn set_data_source(&mut self, data_source: Box<dyn DataSource>, kind: DataSourceKind) {
        self.manager.set_data_source(data_source, kind);
    }

    /// Lattice-scoped fields of every registered data source.
    pub fn fields(&self) -> IndexMap<DataSourceKind, Vec<String>> {
        self.manager.fields()
    }

    /// Add a lattice-scoped live device and its conversion.
    pub fn add_device(
        &mut self,
        field: &str,
        device: Box<dyn Device>,
        uc: Arc<dyn UnitConv>,
    ) -> Result<(), AccessError> {
        let result = self.manager.add_device(field, device, uc);
        result.map_err(|e| e.with_owner(&*self))
    }

    /// The lattice-scoped live device for `field`.
    pub fn device(&self, field: &str) -> Result<&dyn Device, AccessError> {
        self.manager.device(field).map_err(|e| e.with_owner(self))
    }

    /// The conversion for a lattice-scoped field.
    pub fn unitconv(&self, field: &str) -> Result<&Arc<dyn UnitConv>, AccessError> {
        self.manager.unitconv(field).map_err(|e| e.with_owner(self))
    }

    /// Register (or replace) the conversion for a lattice-scoped field.
    pub fn set_unitconv(&mut self, field: &str, uc: Arc<dyn UnitConv>) {
        self.manager.set_unitconv(field, uc);
    }

    /// Read a lattice-scoped field.
    pub fn get_value(
        &self,
        field: &str,
        handle: Handle,
        units: Option<Units>,
        kind: Option<DataSourceKind>,
        throw: bool,
    ) -> Result<Option<f64>, AccessError> {
        self.manager
            .get_value(field, handle, units, kind, throw)
            .map_err(|e| e.with_owner(self))
    }

    /// Write a lattice-scoped field.
    pub fn set_value(
        &self,
        field: &str,
        value: f64,
        units: Option<Units>,
        kind: Option<DataSourceKind>,
        throw: bool,
    ) -> Result<(), AccessError> {
        self.manager
            .set_value(field, value, units, kind, throw)
            .map_err(|e| e.with_owner(self))
    }

    /// Default units of the lattice.
    pub fn default_units(&self) -> Units {
        self.manager.default_units()
    }

    /// Set the default units on the lattice and every element.
    pub fn set_default_units(&mut self, units: Units) {
        debug!(lattice = %self.name, %units, elements = self.elements.len(), "default units");
        self.manager.set_default_units(units);
        for elem in &mut self.elements {
            elem.set_default_units(units);
        }
    }

    /// Default data source of the lattice.
    pub fn default_data_source(&self) -> DataSourceKind {
        self.manager.default_data_source()
    }

    /// Set the default data source on the lattice and every element.
    pub fn set_default_data_source(&mut self, kind: DataSourceKind) {
        debug!(lattice = %self.name, %kind, elements = self.elements.len(), "default data source");
        self.manager.set_default_data_source(kind);
        for elem in &mut self.elements {
            elem.set_default_data_source(kind);
        }
    }

    /// Convert one value per element of `family` using each element's own
    /// conversion for `field`. Missing values pass through.
    pub fn convert_family_values(
        &self,
        family: &str,
        field: &str,
        values: &[Option<f64>],
        origin: Units,
        target: Units,
    ) -> Result<Vec<Option<f64>>, LatticeError> {
        let elements = self.get_elements(Some(family), None)?;
        check_count(elements.len(), values.len())?;
        elements
            .iter()
            .zip(values)
            .map(|(elem, value)| -> Result<Option<f64>, LatticeError> {
                let Some(v) = value else {
                    return Ok(None);
                };
                let converted = elem
                    .unitconv(field)?
                    .convert(*v, origin, target)
                    .map_err(|e| AccessError::from(e).with_owner(elem))?;
                Ok(Some(converted))
            })
            .collect()
    }
}

pub(crate) fn check_count(expected: usize, actual: usize) -> Result<(), LatticeError> {
    if expected != actual {
        return Err(LatticeError::LengthMismatch { expected, actual });
    }
    Ok(())
}

impl FamilyAccess for Lattice {
    fn get_element_values(
        &self,
        family: &str,
        field: &str,
        handle: Handle,
        units: Option<Units>,
        kind: Option<DataSourceKind>,
        throw: bool,
    ) -> Result<Vec<Option<f64>>, LatticeError> {
        self.get_elements(Some(family), None)?
            .into_iter()
            .map(|elem| {
                elem.get_value(field, handle, units, kind, throw)
                    .map_err(LatticeError::from)
            })
            .collect()
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
        let elements = self.get_elements(Some(family), None)?;
        check_count(elements.len(), values.len())?;
        for (elem, value) in elements.into_iter().zip(values) {
            elem.set_value(field, *value, units, kind, throw)?;
        }
        Ok(())
    }
}

impl fmt::Display for Lattice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lattice {}", self.name)
    }
}

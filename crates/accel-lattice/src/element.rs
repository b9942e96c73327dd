//! Lattice elements.

use std::fmt;
use std::ptr;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use accel_core::{AccessError, DataSourceKind, Handle, LatticeId, Units};
use accel_source::{DataSource, DataSourceManager, Device};
use accel_units::UnitConv;

use crate::error::LatticeError;
use crate::lattice::Lattice;

/// One accelerator component: a magnet, a BPM, a drift.
///
/// An element owns a [`DataSourceManager`] for its fields and belongs to
/// any number of families. Its position (`index`, `s`, `cell`) is derived
/// from the lattice it was added to and is recomputed on every query.
/// Errors from field access are annotated with the element's display
/// identity.
#[derive(Debug)]
pub struct Element {
    name: Option<String>,
    element_type: String,
    length: f64,
    families: IndexSet<String>,
    manager: DataSourceManager,
    lattice: Option<LatticeId>,
}

impl Element {
    /// A detached element with no fields or families.
    ///
    /// Returns [`LatticeError::InvalidLength`] for a negative or non-finite
    /// length.
    pub fn new(element_type: impl Into<String>, length: f64) -> Result<Self, LatticeError> {
        if !length.is_finite() || length < 0.0 {
            return Err(LatticeError::InvalidLength { length });
        }
        Ok(Self {
            name: None,
            element_type: element_type.into(),
            length,
            families: IndexSet::new(),
            manager: DataSourceManager::new(),
            lattice: None,
        })
    }

    /// Set the display name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The display name, if any. Names need not be unique.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The element type, e.g. `"QUAD"`.
    pub fn element_type(&self) -> &str {
        &self.element_type
    }

    /// Length in metres.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Families this element belongs to, lower-cased, in the order added.
    pub fn families(&self) -> impl Iterator<Item = &str> {
        self.families.iter().map(String::as_str)
    }

    /// Add the element to a family. Family names are case-insensitive.
    pub fn add_to_family(&mut self, family: &str) {
        self.families.insert(family.to_lowercase());
    }

    /// Whether the element belongs to `family` (case-insensitive).
    pub fn is_in_family(&self, family: &str) -> bool {
        self.families.contains(&family.to_lowercase())
    }

    /// The lattice this element was last added to.
    pub fn lattice_id(&self) -> Option<LatticeId> {
        self.lattice
    }

    pub(crate) fn set_lattice(&mut self, id: LatticeId) {
        self.lattice = Some(id);
    }

    /// 1-based position in `lattice`.
    ///
    /// `None` unless the element is stored in `lattice`. Identity, not
    /// equality, decides the match.
    pub fn index(&self, lattice: &Lattice) -> Option<usize> {
        if self.lattice != Some(lattice.id()) {
            return None;
        }
        lattice
            .elements()
            .iter()
            .position(|e| ptr::eq(e, self))
            .map(|i| i + 1)
    }

    /// Distance from the start of `lattice` to the start of this element.
    pub fn s(&self, lattice: &Lattice) -> Option<f64> {
        let index = self.index(lattice)?;
        Some(
            lattice.elements()[..index - 1]
                .iter()
                .map(Element::length)
                .sum(),
        )
    }

    /// 1-based cell the element starts in.
    ///
    /// `None` if the element is not in `lattice` or the lattice has no
    /// cell length.
    pub fn cell(&self, lattice: &Lattice) -> Option<usize> {
        let cell_length = lattice.cell_length()?;
        let s = self.s(lattice)?;
        Some((s / cell_length).floor() as usize + 1)
    }

    /// The element's data-source manager.
    pub fn manager(&self) -> &DataSourceManager {
        &self.manager
    }

    /// Mutable access to the element's data-source manager.
    pub fn manager_mut(&mut self) -> &mut DataSourceManager {
        &mut self.manager
    }

    /// Register (or replace) the data source for `kind`.
    pub fn set_data_source(&mut self, data_source: Box<dyn DataSource>, kind: DataSourceKind) {
        self.manager.set_data_source(data_source, kind);
    }

    /// Fields of every registered data source.
    pub fn fields(&self) -> IndexMap<DataSourceKind, Vec<String>> {
        self.manager.fields()
    }

    /// Add a live device and its conversion under `field`.
    pub fn add_device(
        &mut self,
        field: &str,
        device: Box<dyn Device>,
        uc: Arc<dyn UnitConv>,
    ) -> Result<(), AccessError> {
        let result = self.manager.add_device(field, device, uc);
        result.map_err(|e| e.with_owner(&*self))
    }

    /// The live device for `field`.
    pub fn device(&self, field: &str) -> Result<&dyn Device, AccessError> {
        self.manager.device(field).map_err(|e| e.with_owner(self))
    }

    /// The process-variable name behind `field`'s live device.
    pub fn pv_name(&self, field: &str, handle: Handle) -> Result<&str, AccessError> {
        self.manager
            .device(field)
            .and_then(|dev| dev.pv_name(handle))
            .map_err(|e| e.with_owner(self))
    }

    /// The conversion registered for `field`.
    pub fn unitconv(&self, field: &str) -> Result<&Arc<dyn UnitConv>, AccessError> {
        self.manager.unitconv(field).map_err(|e| e.with_owner(self))
    }

    /// Register (or replace) the conversion for `field`.
    pub fn set_unitconv(&mut self, field: &str, uc: Arc<dyn UnitConv>) {
        self.manager.set_unitconv(field, uc);
    }

    /// Read `field`. See [`DataSourceManager::get_value`].
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

    /// Write `field`. See [`DataSourceManager::set_value`].
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

    /// Units used when a caller passes `None`.
    pub fn default_units(&self) -> Units {
        self.manager.default_units()
    }

    /// Change the default units.
    pub fn set_default_units(&mut self, units: Units) {
        self.manager.set_default_units(units);
    }

    /// Data source used when a caller passes `None`.
    pub fn default_data_source(&self) -> DataSourceKind {
        self.manager.default_data_source()
    }

    /// Change the default data source.
    pub fn set_default_data_source(&mut self, kind: DataSourceKind) {
        self.manager.set_default_data_source(kind);
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Element ")?;
        if let Some(name) = &self.name {
            write!(f, "'{name}', ")?;
        }
        write!(f, "length {} m, families ", self.length)?;
        for (i, family) in self.families.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{family}")?;
        }
        write!(f, ">")
    }
}

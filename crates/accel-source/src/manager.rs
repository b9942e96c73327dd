//! Per-owner routing of field reads and writes across data sources.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use accel_core::{AccessError, DataSourceKind, Handle, Units};
use accel_units::UnitConv;

use crate::data_source::{DataSource, DeviceDataSource};
use crate::device::Device;

/// Routes field access for one element or lattice.
///
/// Holds one [`DataSource`] per [`DataSourceKind`] and one [`UnitConv`]
/// per field. Reads fetch the raw value from the selected source in its
/// native units and convert to the requested units; writes convert the
/// other way before delegating. `None` for units or source selects the
/// manager's defaults.
pub struct DataSourceManager {
    default_units: Units,
    default_data_source: DataSourceKind,
    data_sources: IndexMap<DataSourceKind, Box<dyn DataSource>>,
    unitconvs: IndexMap<String, Arc<dyn UnitConv>>,
}

impl DataSourceManager {
    /// An empty manager defaulting to engineering units and the live source.
    pub fn new() -> Self {
        Self {
            default_units: Units::Eng,
            default_data_source: DataSourceKind::Live,
            data_sources: IndexMap::new(),
            unitconvs: IndexMap::new(),
        }
    }

    /// A manager with an empty [`DeviceDataSource`] registered as the live
    /// source, ready for [`add_device`](Self::add_device).
    pub fn with_live_devices() -> Self {
        let mut manager = Self::new();
        manager.set_data_source(Box::new(DeviceDataSource::new()), DataSourceKind::Live);
        manager
    }

    /// Units used when a caller passes `None`.
    pub fn default_units(&self) -> Units {
        self.default_units
    }

    /// Change the default units.
    pub fn set_default_units(&mut self, units: Units) {
        self.default_units = units;
    }

    /// Data source used when a caller passes `None`.
    pub fn default_data_source(&self) -> DataSourceKind {
        self.default_data_source
    }

    /// Change the default data source.
    pub fn set_default_data_source(&mut self, kind: DataSourceKind) {
        self.default_data_source = kind;
    }

    /// Register (or replace) the data source for `kind`.
    pub fn set_data_source(&mut self, data_source: Box<dyn DataSource>, kind: DataSourceKind) {
        self.data_sources.insert(kind, data_source);
    }

    /// The data source registered for `kind`.
    pub fn data_source(&self, kind: DataSourceKind) -> Result<&dyn DataSource, AccessError> {
        self.data_sources
            .get(&kind)
            .map(|ds| ds.as_ref())
            .ok_or_else(|| missing_source(kind))
    }

    /// Mutable access to the data source registered for `kind`.
    pub fn data_source_mut(
        &mut self,
        kind: DataSourceKind,
    ) -> Result<&mut dyn DataSource, AccessError> {
        match self.data_sources.get_mut(&kind) {
            Some(ds) => Ok(ds.as_mut()),
            None => Err(missing_source(kind)),
        }
    }

    /// Whether a data source is registered for `kind`.
    pub fn has_data_source(&self, kind: DataSourceKind) -> bool {
        self.data_sources.contains_key(&kind)
    }

    /// The fields of every registered data source.
    pub fn fields(&self) -> IndexMap<DataSourceKind, Vec<String>> {
        self.data_sources
            .iter()
            .map(|(kind, ds)| (*kind, ds.fields()))
            .collect()
    }

    /// Add a device to the live data source and record its conversion.
    pub fn add_device(
        &mut self,
        field: &str,
        device: Box<dyn Device>,
        uc: Arc<dyn UnitConv>,
    ) -> Result<(), AccessError> {
        self.data_source_mut(DataSourceKind::Live)?
            .add_device(field, device)?;
        self.unitconvs.insert(field.to_owned(), uc);
        Ok(())
    }

    /// The live device registered for `field`.
    pub fn device(&self, field: &str) -> Result<&dyn Device, AccessError> {
        self.data_source(DataSourceKind::Live)?.device(field)
    }

    /// The conversion registered for `field`.
    pub fn unitconv(&self, field: &str) -> Result<&Arc<dyn UnitConv>, AccessError> {
        self.unitconvs
            .get(field)
            .ok_or_else(|| AccessError::field(format!("no unit conversion for field '{field}'")))
    }

    /// Register (or replace) the conversion for `field`.
    pub fn set_unitconv(&mut self, field: &str, uc: Arc<dyn UnitConv>) {
        self.unitconvs.insert(field.to_owned(), uc);
    }

    /// Read `field` and convert it into `units`.
    ///
    /// A failed read with `throw == false` yields `Ok(None)` without
    /// conversion.
    pub fn get_value(
        &self,
        field: &str,
        handle: Handle,
        units: Option<Units>,
        kind: Option<DataSourceKind>,
        throw: bool,
    ) -> Result<Option<f64>, AccessError> {
        let units = units.unwrap_or(self.default_units);
        let source = self.data_source(kind.unwrap_or(self.default_data_source))?;
        let raw = source.get_value(field, handle, throw)?;
        let uc = self.unitconv(field)?;
        match raw {
            Some(value) => Ok(Some(uc.convert(value, source.units(), units)?)),
            None => Ok(None),
        }
    }

    /// Convert `value` from `units` into the source's native units and
    /// write it to the setpoint.
    pub fn set_value(
        &self,
        field: &str,
        value: f64,
        units: Option<Units>,
        kind: Option<DataSourceKind>,
        throw: bool,
    ) -> Result<(), AccessError> {
        let units = units.unwrap_or(self.default_units);
        let source = self.data_source(kind.unwrap_or(self.default_data_source))?;
        let native = self.unitconv(field)?.convert(value, units, source.units())?;
        source.set_value(field, native, throw)
    }
}

fn missing_source(kind: DataSourceKind) -> AccessError {
    AccessError::data_source(format!("no {kind} data source registered"))
}

impl Default for DataSourceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DataSourceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSourceManager")
            .field("default_units", &self.default_units)
            .field("default_data_source", &self.default_data_source)
            .field("data_sources", &self.data_sources.keys().collect::<Vec<_>>())
            .field("unitconvs", &self.unitconvs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{EpicsDevice, SimpleDevice};
    use crate::testing::{FixedSimulation, RecordingControlSystem};
    use accel_units::{NullUnitConv, PolyUnitConv};
    use proptest::prelude::*;

    fn poly(coef: Vec<f64>) -> Arc<dyn UnitConv> {
        Arc::new(PolyUnitConv::new(coef).unwrap())
    }

    fn manager_with(field: &str, value: f64, uc: Arc<dyn UnitConv>) -> DataSourceManager {
        let mut m = DataSourceManager::with_live_devices();
        m.add_device(field, Box::new(SimpleDevice::new(value).writable()), uc)
            .unwrap();
        m
    }

    #[test]
    fn defaults_are_eng_and_live() {
        let m = DataSourceManager::new();
        assert_eq!(m.default_units(), Units::Eng);
        assert_eq!(m.default_data_source(), DataSourceKind::Live);
    }

    #[test]
    fn missing_data_source_is_reported() {
        let m = DataSourceManager::new();
        let err = m
            .get_value("x", Handle::Readback, None, None, true)
            .unwrap_err();
        assert!(err.is_data_source());
        assert!(err.to_string().contains("live"));
        assert!(m.data_source(DataSourceKind::Sim).unwrap_err().is_data_source());
    }

    #[test]
    fn add_device_without_live_source_fails() {
        let mut m = DataSourceManager::new();
        let err = m
            .add_device("x", Box::new(SimpleDevice::new(1.0)), poly(vec![1.0, 0.0]))
            .unwrap_err();
        assert!(err.is_data_source());
        assert!(m.unitconv("x").unwrap_err().is_field());
    }

    #[test]
    fn add_device_to_simulation_source_fails() {
        let mut m = DataSourceManager::new();
        m.set_data_source(Box::new(FixedSimulation::default()), DataSourceKind::Live);
        let err = m
            .add_device("x", Box::new(SimpleDevice::new(1.0)), poly(vec![1.0, 0.0]))
            .unwrap_err();
        assert!(err.is_data_source());
    }

    #[test]
    fn unknown_field_is_a_field_error() {
        let m = manager_with("x", 1.0, poly(vec![1.0, 0.0]));
        assert!(m
            .get_value("y", Handle::Readback, None, None, true)
            .unwrap_err()
            .is_field());
        assert!(m.unitconv("y").unwrap_err().is_field());
        assert!(m.device("y").unwrap_err().is_field());
    }

    #[test]
    fn get_value_converts_to_requested_units() {
        let m = manager_with("b1", 4.0, poly(vec![2.0, 3.0]));
        assert_eq!(
            m.get_value("b1", Handle::Readback, None, None, true).unwrap(),
            Some(4.0)
        );
        assert_eq!(
            m.get_value("b1", Handle::Readback, Some(Units::Phys), None, true)
                .unwrap(),
            Some(11.0)
        );
    }

    #[test]
    fn default_units_apply_when_none() {
        let mut m = manager_with("b1", 4.0, poly(vec![2.0, 3.0]));
        m.set_default_units(Units::Phys);
        assert_eq!(
            m.get_value("b1", Handle::Readback, None, None, true).unwrap(),
            Some(11.0)
        );
    }

    #[test]
    fn set_value_converts_to_native_units() {
        let m = manager_with("b1", 0.0, poly(vec![2.0, 3.0]));
        m.set_value("b1", 11.0, Some(Units::Phys), None, true).unwrap();
        assert_eq!(
            m.get_value("b1", Handle::Setpoint, Some(Units::Eng), None, true)
                .unwrap(),
            Some(4.0)
        );
    }

    #[test]
    fn simulation_source_converts_from_physics_units() {
        let mut m = manager_with("b1", 4.0, poly(vec![2.0, 3.0]));
        m.set_data_source(
            Box::new(FixedSimulation::default().with("b1", 11.0)),
            DataSourceKind::Sim,
        );
        let eng = m
            .get_value(
                "b1",
                Handle::Readback,
                Some(Units::Eng),
                Some(DataSourceKind::Sim),
                true,
            )
            .unwrap();
        assert_eq!(eng, Some(4.0));
        let fields = m.fields();
        assert_eq!(fields[&DataSourceKind::Live], vec!["b1".to_string()]);
        assert_eq!(fields[&DataSourceKind::Sim], vec!["b1".to_string()]);
    }

    #[test]
    fn failed_read_passes_through_unconverted() {
        let cs = Arc::new(RecordingControlSystem::default());
        let mut m = DataSourceManager::with_live_devices();
        let dev = EpicsDevice::new("bpm", cs, Some("offline:X".into()), None).unwrap();
        m.add_device("x", Box::new(dev), poly(vec![2.0, 3.0])).unwrap();
        assert_eq!(
            m.get_value("x", Handle::Readback, Some(Units::Phys), None, false)
                .unwrap(),
            None
        );
        assert!(m
            .get_value("x", Handle::Readback, Some(Units::Phys), None, true)
            .unwrap_err()
            .is_control_system());
    }

    #[test]
    fn conversion_failure_is_a_units_error() {
        let uc = Arc::new(NullUnitConv::new().with_limits(Some(0.0), Some(1.0)).unwrap());
        let m = manager_with("x", 5.0, uc);
        let err = m
            .get_value("x", Handle::Readback, Some(Units::Phys), None, true)
            .unwrap_err();
        assert!(err.is_units());
    }

    #[test]
    fn set_unitconv_replaces_conversion() {
        let mut m = manager_with("x", 2.0, poly(vec![1.0, 0.0]));
        m.set_unitconv("x", poly(vec![3.0, 0.0]));
        assert_eq!(
            m.get_value("x", Handle::Readback, Some(Units::Phys), None, true)
                .unwrap(),
            Some(6.0)
        );
    }

    proptest! {
        #[test]
        fn set_then_get_round_trips_through_physics(
            slope in prop_oneof![-10.0f64..-0.1, 0.1f64..10.0],
            offset in -10.0f64..10.0,
            phys in -100.0f64..100.0,
        ) {
            let m = manager_with("x", 0.0, poly(vec![slope, offset]));
            m.set_value("x", phys, Some(Units::Phys), None, true).unwrap();
            let back = m
                .get_value("x", Handle::Setpoint, Some(Units::Phys), None, true)
                .unwrap()
                .unwrap();
            prop_assert!((back - phys).abs() <= 1e-9 * phys.abs().max(1.0));
        }
    }
}

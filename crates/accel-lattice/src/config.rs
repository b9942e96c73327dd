//! Lattice configuration.

use std::error::Error;
use std::fmt;

use accel_core::{DataSourceKind, Units};

/// Errors detected by [`LatticeConfig::validate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The lattice name is empty.
    EmptyName,
    /// The symmetry (cell count) is zero.
    ZeroSymmetry,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "lattice name must not be empty"),
            Self::ZeroSymmetry => write!(f, "symmetry must be at least 1 when given"),
        }
    }
}

impl Error for ConfigError {}

/// Everything needed to create an empty lattice.
///
/// Elements, devices, and conversions are added afterwards by whatever
/// builds the lattice.
#[derive(Clone, Debug, PartialEq)]
pub struct LatticeConfig {
    /// Display name.
    pub name: String,
    /// Number of cells, if the machine is periodic.
    pub symmetry: Option<usize>,
    /// Units used when a caller does not ask for any.
    pub default_units: Units,
    /// Data source used when a caller does not ask for one.
    pub default_data_source: DataSourceKind,
}

impl LatticeConfig {
    /// A configuration with the given name and library defaults.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Check the configuration for structural problems.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.symmetry == Some(0) {
            return Err(ConfigError::ZeroSymmetry);
        }
        Ok(())
    }
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self {
            name: "lattice".into(),
            symmetry: None,
            default_units: Units::Eng,
            default_data_source: DataSourceKind::Live,
        }
    }
}

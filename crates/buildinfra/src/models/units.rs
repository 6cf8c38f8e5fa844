use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::configuration::ConfigKey;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub name: String,
    pub conversion_factor: f64,
}

impl Unit {
    pub fn new<S: Into<String>>(name: S, conversion_factor: f64) -> Self {
        Self {
            name: name.into(),
            conversion_factor,
        }
    }
}

/// Allowed units for every scalar configuration key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitCatalog {
    units: BTreeMap<ConfigKey, Vec<Unit>>,
}

impl UnitCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The units the orchestrator ships with, used when a response carries none.
    pub fn builtin() -> Self {
        let cpu = vec![Unit::new("m", 0.001), Unit::new("Core", 1.0)];
        let memory = vec![
            Unit::new("K", 1e3),
            Unit::new("Ki", 1024.0),
            Unit::new("M", 1e6),
            Unit::new("Mi", 1024.0 * 1024.0),
            Unit::new("G", 1e9),
            Unit::new("Gi", 1024.0 * 1024.0 * 1024.0),
        ];
        let timeout = vec![
            Unit::new("Seconds", 1.0),
            Unit::new("Minutes", 60.0),
            Unit::new("Hours", 3600.0),
        ];

        let mut catalog = Self::new();
        catalog.insert(ConfigKey::CpuRequest, cpu.clone());
        catalog.insert(ConfigKey::CpuLimit, cpu);
        catalog.insert(ConfigKey::MemoryRequest, memory.clone());
        catalog.insert(ConfigKey::MemoryLimit, memory);
        catalog.insert(ConfigKey::Timeout, timeout);
        catalog
    }

    pub fn insert(&mut self, key: ConfigKey, units: Vec<Unit>) {
        self.units.insert(key, units);
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn units_for(&self, key: ConfigKey) -> &[Unit] {
        self.units.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConfigKey, &[Unit])> {
        self.units.iter().map(|(key, units)| (*key, units.as_slice()))
    }

    pub fn find(&self, key: ConfigKey, name: &str) -> Option<&Unit> {
        self.units_for(key).iter().find(|unit| unit.name == name)
    }

    /// Fills keys the catalog does not know about from the builtin catalog.
    pub fn with_builtin_fallback(mut self) -> Self {
        for (key, units) in Self::builtin().units {
            self.units.entry(key).or_insert(units);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_units() {
        let catalog = UnitCatalog::builtin();
        assert_eq!(catalog.find(ConfigKey::CpuLimit, "m").unwrap().conversion_factor, 0.001);
        assert_eq!(
            catalog.find(ConfigKey::MemoryRequest, "Gi").unwrap().conversion_factor,
            1073741824.0
        );
        assert_eq!(catalog.units_for(ConfigKey::Timeout).len(), 3);
        assert!(catalog.units_for(ConfigKey::NodeSelector).is_empty());
        assert!(catalog.find(ConfigKey::CpuLimit, "Gi").is_none());
    }

    #[test]
    fn test_builtin_fallback_keeps_server_units() {
        let mut catalog = UnitCatalog::new();
        catalog.insert(ConfigKey::CpuLimit, vec![Unit::new("Core", 1.0)]);
        let catalog = catalog.with_builtin_fallback();

        assert_eq!(catalog.units_for(ConfigKey::CpuLimit).len(), 1);
        assert_eq!(catalog.units_for(ConfigKey::CpuRequest).len(), 2);
    }
}

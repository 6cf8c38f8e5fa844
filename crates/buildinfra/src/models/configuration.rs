use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use super::rows::{NodeSelectorRow, TolerationRow};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConfigKey {
    CpuRequest,
    CpuLimit,
    MemoryRequest,
    MemoryLimit,
    Timeout,
    NodeSelector,
    #[serde(rename = "tolerance")]
    #[strum(serialize = "tolerance")]
    Toleration,
}

impl ConfigKey {
    /// The other side of a request/limit pair.
    pub fn pair(self) -> Option<ConfigKey> {
        match self {
            ConfigKey::CpuRequest => Some(ConfigKey::CpuLimit),
            ConfigKey::CpuLimit => Some(ConfigKey::CpuRequest),
            ConfigKey::MemoryRequest => Some(ConfigKey::MemoryLimit),
            ConfigKey::MemoryLimit => Some(ConfigKey::MemoryRequest),
            _ => None,
        }
    }

    pub fn is_request(self) -> bool {
        matches!(self, ConfigKey::CpuRequest | ConfigKey::MemoryRequest)
    }

    /// Scalar keys carry a `{value, unit}` pair, the rest carry rows.
    pub fn is_scalar(self) -> bool {
        !matches!(self, ConfigKey::NodeSelector | ConfigKey::Toleration)
    }

    pub fn label(self) -> &'static str {
        match self {
            ConfigKey::CpuRequest => "CPU request",
            ConfigKey::CpuLimit => "CPU limit",
            ConfigKey::MemoryRequest => "Memory request",
            ConfigKey::MemoryLimit => "Memory limit",
            ConfigKey::Timeout => "Build timeout",
            ConfigKey::NodeSelector => "Node selector",
            ConfigKey::Toleration => "Tolerations",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Scalar(String),
    NodeSelectors(Vec<NodeSelectorRow>),
    Tolerations(Vec<TolerationRow>),
}

impl ConfigValue {
    pub fn scalar<S: Into<String>>(value: S) -> Self {
        ConfigValue::Scalar(value.into())
    }

    pub fn as_scalar(&self) -> Option<&str> {
        if let ConfigValue::Scalar(ref value) = self {
            Some(value)
        } else {
            None
        }
    }

    pub fn as_node_selectors(&self) -> Option<&[NodeSelectorRow]> {
        if let ConfigValue::NodeSelectors(ref rows) = self {
            Some(rows)
        } else {
            None
        }
    }

    pub fn as_tolerations(&self) -> Option<&[TolerationRow]> {
        if let ConfigValue::Tolerations(ref rows) = self {
            Some(rows)
        } else {
            None
        }
    }

    /// An empty value of the right shape for `key`.
    pub fn empty_for(key: ConfigKey) -> Self {
        match key {
            ConfigKey::NodeSelector => ConfigValue::NodeSelectors(Vec::new()),
            ConfigKey::Toleration => ConfigValue::Tolerations(Vec::new()),
            _ => ConfigValue::Scalar(String::new()),
        }
    }
}

/// The value a profile falls back to when an entry is not overridden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultConfiguration {
    pub key: ConfigKey,
    pub value: ConfigValue,
    pub unit: Option<String>,
    /// Name of the profile the default comes from.
    pub profile_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationEntry {
    pub id: Option<i64>,
    pub key: ConfigKey,
    pub value: ConfigValue,
    pub unit: Option<String>,
    pub active: bool,
    pub default_value: DefaultConfiguration,
}

impl ConfigurationEntry {
    /// An entry that inherits `default_value`.
    pub fn inherited(default_value: DefaultConfiguration) -> Self {
        Self {
            id: None,
            key: default_value.key,
            value: default_value.value.clone(),
            unit: default_value.unit.clone(),
            active: false,
            default_value,
        }
    }

    /// An entry that overrides its default with the default's own value.
    pub fn overriding_default(default_value: DefaultConfiguration) -> Self {
        Self {
            active: true,
            ..Self::inherited(default_value)
        }
    }

    pub fn reset_to_default(&mut self) {
        self.value = self.default_value.value.clone();
        self.unit = self.default_value.unit.clone();
        self.active = false;
    }

    /// Inactive entries must mirror their default.
    pub fn is_consistent(&self) -> bool {
        self.active
            || (self.value == self.default_value.value && self.unit == self.default_value.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    fn cpu_default() -> DefaultConfiguration {
        DefaultConfiguration {
            key: ConfigKey::CpuLimit,
            value: ConfigValue::scalar("1"),
            unit: Some("Core".to_string()),
            profile_name: "default".to_string(),
        }
    }

    #[test]
    fn test_config_key_wire_names() {
        assert_eq!(ConfigKey::Toleration.to_string(), "tolerance");
        assert_eq!(ConfigKey::from_str("cpu_request").unwrap(), ConfigKey::CpuRequest);
        assert_eq!(
            serde_json::to_string(&ConfigKey::MemoryLimit).unwrap(),
            "\"memory_limit\""
        );
        assert_eq!(ConfigKey::iter().count(), 7);
    }

    #[test]
    fn test_pairs_are_symmetric() {
        for key in ConfigKey::iter() {
            if let Some(other) = key.pair() {
                assert_eq!(other.pair(), Some(key));
                assert_ne!(key.is_request(), other.is_request());
            }
        }
        assert_eq!(ConfigKey::Timeout.pair(), None);
    }

    #[test]
    fn test_reset_to_default() {
        let mut entry = ConfigurationEntry::overriding_default(cpu_default());
        entry.value = ConfigValue::scalar("4");
        entry.unit = Some("m".to_string());
        assert!(entry.is_consistent());

        entry.reset_to_default();
        assert!(!entry.active);
        assert_eq!(entry.value, ConfigValue::scalar("1"));
        assert_eq!(entry.unit.as_deref(), Some("Core"));
        assert!(entry.is_consistent());
    }
}

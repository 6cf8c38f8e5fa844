use serde::Serialize;
use std::collections::BTreeMap;

use super::configuration::ConfigKey;
use super::rows::RowId;

/// Messages for one node selector or toleration row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RowErrors {
    pub key: Vec<String>,
    pub value: Vec<String>,
}

impl RowErrors {
    pub fn is_empty(&self) -> bool {
        self.key.is_empty() && self.value.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlatformErrors {
    pub fields: BTreeMap<ConfigKey, Option<String>>,
    pub node_selector: Option<BTreeMap<RowId, RowErrors>>,
    pub toleration: Option<BTreeMap<RowId, RowErrors>>,
}

impl PlatformErrors {
    pub fn field(&self, key: ConfigKey) -> Option<&str> {
        self.fields.get(&key).and_then(|message| message.as_deref())
    }

    pub fn set_field(&mut self, key: ConfigKey, message: Option<String>) {
        self.fields.insert(key, message);
    }

    pub fn has_errors(&self) -> bool {
        self.fields.values().any(Option::is_some)
            || self.node_selector.is_some()
            || self.toleration.is_some()
    }
}

/// Validation messages parallel to a `ProfileInput`; `None` means valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileErrors {
    pub name: Option<String>,
    pub description: Option<String>,
    pub configurations: BTreeMap<String, PlatformErrors>,
}

impl ProfileErrors {
    pub fn platform(&self, platform: &str) -> Option<&PlatformErrors> {
        self.configurations.get(platform)
    }

    pub fn platform_mut(&mut self, platform: &str) -> &mut PlatformErrors {
        self.configurations.entry(platform.to_string()).or_default()
    }

    pub fn field(&self, platform: &str, key: ConfigKey) -> Option<&str> {
        self.platform(platform).and_then(|errors| errors.field(key))
    }

    pub fn has_errors(&self) -> bool {
        self.name.is_some()
            || self.description.is_some()
            || self.configurations.values().any(PlatformErrors::has_errors)
    }

    /// Every non-null message, prefixed with where it was raised.
    pub fn messages(&self) -> Vec<String> {
        let mut messages = Vec::new();
        if let Some(message) = &self.name {
            messages.push(format!("name: {}", message));
        }
        if let Some(message) = &self.description {
            messages.push(format!("description: {}", message));
        }
        for (platform, errors) in &self.configurations {
            for (key, message) in &errors.fields {
                if let Some(message) = message {
                    messages.push(format!("{}/{}: {}", platform, key, message));
                }
            }
            for (key, rows) in [
                (ConfigKey::NodeSelector, &errors.node_selector),
                (ConfigKey::Toleration, &errors.toleration),
            ] {
                for row in rows.iter().flat_map(|rows| rows.values()) {
                    for message in row.key.iter().chain(row.value.iter()) {
                        messages.push(format!("{}/{}: {}", platform, key, message));
                    }
                }
            }
        }
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_null_entries_are_not_errors() {
        let mut errors = ProfileErrors::default();
        errors
            .platform_mut("default")
            .set_field(ConfigKey::CpuLimit, None);
        assert!(!errors.has_errors());

        errors
            .platform_mut("default")
            .set_field(ConfigKey::CpuLimit, Some("bad".to_string()));
        assert!(errors.has_errors());
        assert_eq!(errors.field("default", ConfigKey::CpuLimit), Some("bad"));
        assert_eq!(errors.messages(), vec!["default/cpu_limit: bad".to_string()]);
    }

    #[test]
    fn test_row_bucket_counts_as_error() {
        let mut errors = ProfileErrors::default();
        let mut rows = BTreeMap::new();
        rows.insert(
            Uuid::new_v4(),
            RowErrors {
                key: vec!["Key is required".to_string()],
                value: Vec::new(),
            },
        );
        errors.platform_mut("linux/arm64").node_selector = Some(rows);
        assert!(errors.has_errors());
        assert_eq!(
            errors.messages(),
            vec!["linux/arm64/node_selector: Key is required".to_string()]
        );
    }
}

use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};
use strum_macros::{Display, EnumString};

use super::configuration::{ConfigKey, ConfigurationEntry};

pub const DEFAULT_PLATFORM: &str = "default";
pub const DEFAULT_PROFILE_NAME: &str = "default";
/// Path segment of the list endpoint, so no profile may use it as a name.
pub const LIST_SEGMENT: &str = "list";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfileType {
    Default,
    #[default]
    Normal,
    Custom,
}

/// Configuration entries of one target platform, keyed by configuration key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlatformConfiguration {
    entries: BTreeMap<ConfigKey, ConfigurationEntry>,
}

impl PlatformConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: ConfigKey) -> Option<&ConfigurationEntry> {
        self.entries.get(&key)
    }

    pub fn get_mut(&mut self, key: ConfigKey) -> Option<&mut ConfigurationEntry> {
        self.entries.get_mut(&key)
    }

    pub fn insert(&mut self, entry: ConfigurationEntry) {
        self.entries.insert(entry.key, entry);
    }

    pub fn iter(&self) -> btree_map::Values<'_, ConfigKey, ConfigurationEntry> {
        self.entries.values()
    }

    pub fn iter_mut(&mut self) -> btree_map::ValuesMut<'_, ConfigKey, ConfigurationEntry> {
        self.entries.values_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<ConfigurationEntry> for PlatformConfiguration {
    fn from_iter<I: IntoIterator<Item = ConfigurationEntry>>(iter: I) -> Self {
        let mut configuration = Self::new();
        for entry in iter {
            configuration.insert(entry);
        }
        configuration
    }
}

/// The editable form of a profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileInput {
    pub id: Option<i64>,
    pub name: String,
    pub description: String,
    pub profile_type: ProfileType,
    pub configurations: BTreeMap<String, PlatformConfiguration>,
}

impl ProfileInput {
    pub fn platform(&self, platform: &str) -> Option<&PlatformConfiguration> {
        self.configurations.get(platform)
    }

    pub fn entry(&self, platform: &str, key: ConfigKey) -> Option<&ConfigurationEntry> {
        self.platform(platform).and_then(|configuration| configuration.get(key))
    }

    pub fn platforms(&self) -> impl Iterator<Item = &str> {
        self.configurations.keys().map(String::as_str)
    }

    pub fn is_default_profile(&self) -> bool {
        self.profile_type == ProfileType::Default
    }
}

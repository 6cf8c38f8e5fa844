//! Wire format of the orchestrator's infra-config API and conversions to and from
//! the editing models.
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::debug;

use crate::errors::{InfraError, InfraResult};
use crate::models::configuration::{ConfigKey, ConfigValue, ConfigurationEntry, DefaultConfiguration};
use crate::models::profile::{
    PlatformConfiguration, ProfileInput, ProfileType, DEFAULT_PLATFORM, DEFAULT_PROFILE_NAME,
};
use crate::models::rows::{NodeSelectorRow, TolerationEffect, TolerationOperator, TolerationRow};
use crate::models::units::{Unit, UnitCatalog};
use crate::reducer::{DefaultConfigurations, ProfileContext};

/// Envelope around every orchestrator response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ApiErrorDetail>,
}

impl<T> ApiResponse<T> {
    pub fn ok(result: T) -> Self {
        Self {
            code: 200,
            status: "OK".to_string(),
            result: Some(result),
            errors: Vec::new(),
        }
    }
}

impl ApiResponse<Value> {
    pub fn error(code: u16, status: &str, user_message: &str) -> Self {
        Self {
            code,
            status: status.to_string(),
            result: None,
            errors: vec![ApiErrorDetail {
                internal_message: None,
                user_message: Some(json!(user_message)),
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_message: Option<String>,
    /// Either a string or an arbitrary JSON object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_message: Option<Value>,
}

impl ApiErrorDetail {
    pub fn message(&self) -> Option<String> {
        match &self.user_message {
            Some(Value::String(message)) => Some(message.clone()),
            Some(Value::Null) | None => self.internal_message.clone(),
            Some(other) => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub key: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSelectorDto {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TolerationDto {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub operator: TolerationOperator,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<TolerationEffect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toleration_seconds: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub profile_type: ProfileType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_count: Option<u32>,
    #[serde(default)]
    pub configurations: BTreeMap<String, Vec<ConfigurationDto>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    #[serde(default)]
    pub default_configurations: BTreeMap<String, Vec<ConfigurationDto>>,
    #[serde(default)]
    pub configuration_units: BTreeMap<String, Vec<Unit>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileDto>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileListResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<ProfileDto>,
    #[serde(default)]
    pub profiles: Vec<ProfileDto>,
    #[serde(default)]
    pub configuration_units: BTreeMap<String, Vec<Unit>>,
}

/// Body of the create and update calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePayload {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub profile_type: ProfileType,
    #[serde(default)]
    pub configurations: BTreeMap<String, Vec<ConfigurationDto>>,
}

fn parse_key(key: &str) -> Option<ConfigKey> {
    let parsed = ConfigKey::from_str(key).ok();
    if parsed.is_none() {
        debug!(key, "skipping unsupported configuration key");
    }
    parsed
}

/// Renders a JSON number the way a user would type it.
fn format_number(number: f64) -> String {
    if number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{}", number as i64)
    } else {
        number.to_string()
    }
}

fn value_from_json(key: ConfigKey, value: &Value) -> InfraResult<ConfigValue> {
    if value.is_null() {
        return Ok(ConfigValue::empty_for(key));
    }
    match key {
        ConfigKey::NodeSelector => {
            let rows: Vec<NodeSelectorDto> = serde_json::from_value(value.clone())?;
            Ok(ConfigValue::NodeSelectors(
                rows.into_iter()
                    .map(|row| NodeSelectorRow::new(row.key, row.value))
                    .collect(),
            ))
        }
        ConfigKey::Toleration => {
            let rows: Vec<TolerationDto> = serde_json::from_value(value.clone())?;
            Ok(ConfigValue::Tolerations(
                rows.into_iter()
                    .map(|row| TolerationRow {
                        key: row.key,
                        operator: row.operator,
                        value: row.value,
                        effect: row.effect,
                        toleration_seconds: row.toleration_seconds.map(|s| s.to_string()),
                        ..TolerationRow::empty()
                    })
                    .collect(),
            ))
        }
        _ => match value {
            Value::Number(number) => Ok(ConfigValue::Scalar(
                number.as_f64().map(format_number).unwrap_or_default(),
            )),
            Value::String(text) => Ok(ConfigValue::Scalar(text.clone())),
            other => Err(InfraError::InvalidInput(format!(
                "unexpected value for {}: {}",
                key, other
            ))),
        },
    }
}

fn value_to_json(key: ConfigKey, value: &ConfigValue) -> InfraResult<Value> {
    match value {
        ConfigValue::Scalar(text) => {
            let number: f64 = text.trim().parse().map_err(|_| {
                InfraError::InvalidInput(format!("{} must be a number, got {:?}", key, text))
            })?;
            if number.fract() == 0.0 && number.abs() < 1e15 {
                Ok(json!(number as i64))
            } else {
                Ok(json!(number))
            }
        }
        ConfigValue::NodeSelectors(rows) => {
            let rows: Vec<NodeSelectorDto> = rows
                .iter()
                .filter(|row| !row.is_empty())
                .map(|row| NodeSelectorDto {
                    key: row.key.clone(),
                    value: row.value.clone(),
                })
                .collect();
            Ok(serde_json::to_value(rows)?)
        }
        ConfigValue::Tolerations(rows) => {
            let rows = rows
                .iter()
                .filter(|row| !row.is_empty())
                .map(|row| {
                    let toleration_seconds = row
                        .toleration_seconds
                        .as_deref()
                        .map(str::trim)
                        .filter(|seconds| !seconds.is_empty())
                        .map(|seconds| {
                            seconds.parse::<u64>().map_err(|_| {
                                InfraError::InvalidInput(format!(
                                    "toleration seconds must be a non-negative integer, got {:?}",
                                    seconds
                                ))
                            })
                        })
                        .transpose()?;
                    Ok(TolerationDto {
                        key: row.key.clone(),
                        operator: row.operator,
                        value: row.value.clone(),
                        effect: row.effect,
                        toleration_seconds,
                    })
                })
                .collect::<InfraResult<Vec<_>>>()?;
            Ok(serde_json::to_value(rows)?)
        }
    }
}

pub fn unit_catalog(units: &BTreeMap<String, Vec<Unit>>) -> UnitCatalog {
    let mut catalog = UnitCatalog::new();
    for (key, units) in units {
        if let Some(key) = parse_key(key) {
            catalog.insert(key, units.clone());
        }
    }
    catalog.with_builtin_fallback()
}

pub fn default_configurations(
    defaults: &BTreeMap<String, Vec<ConfigurationDto>>,
) -> InfraResult<DefaultConfigurations> {
    let mut result = DefaultConfigurations::new();
    for (platform, configurations) in defaults {
        let mut platform_defaults = BTreeMap::new();
        for configuration in configurations {
            let Some(key) = parse_key(&configuration.key) else {
                continue;
            };
            platform_defaults.insert(
                key,
                DefaultConfiguration {
                    key,
                    value: value_from_json(key, &configuration.value)?,
                    unit: configuration.unit.clone(),
                    profile_name: configuration
                        .profile_name
                        .clone()
                        .unwrap_or_else(|| DEFAULT_PROFILE_NAME.to_string()),
                },
            );
        }
        result.insert(platform.clone(), platform_defaults);
    }
    Ok(result)
}

fn platform_from_dtos(
    configurations: &[ConfigurationDto],
    defaults: &BTreeMap<ConfigKey, DefaultConfiguration>,
) -> InfraResult<PlatformConfiguration> {
    let mut overrides = BTreeMap::new();
    for configuration in configurations {
        if let Some(key) = parse_key(&configuration.key) {
            overrides.insert(key, configuration);
        }
    }

    let mut platform = PlatformConfiguration::new();
    for (key, default_value) in defaults {
        let entry = match overrides.get(key) {
            Some(configuration) => {
                let mut entry = ConfigurationEntry {
                    id: configuration.id,
                    key: *key,
                    value: value_from_json(*key, &configuration.value)?,
                    unit: configuration.unit.clone(),
                    active: configuration.active,
                    default_value: default_value.clone(),
                };
                if !entry.active {
                    entry.reset_to_default();
                }
                entry
            }
            None => ConfigurationEntry::inherited(default_value.clone()),
        };
        platform.insert(entry);
    }
    Ok(platform)
}

/// Builds the editable input and the reducer context from a fetched response.
///
/// Without a profile in the response the input is a blank profile inheriting every
/// default of the default platform, which is what the create flow starts from.
pub fn form_from_response(response: &ProfileResponse) -> InfraResult<(ProfileInput, ProfileContext)> {
    let defaults = default_configurations(&response.default_configurations)?;
    let units = unit_catalog(&response.configuration_units);
    let empty = BTreeMap::new();
    let fallback = |platform: &str| {
        defaults
            .get(platform)
            .or_else(|| defaults.get(DEFAULT_PLATFORM))
            .unwrap_or(&empty)
    };

    let (input, saved) = match &response.profile {
        Some(profile) => {
            let mut configurations = BTreeMap::new();
            configurations.insert(
                DEFAULT_PLATFORM.to_string(),
                platform_from_dtos(&[], fallback(DEFAULT_PLATFORM))?,
            );
            for (platform, dtos) in &profile.configurations {
                configurations.insert(platform.clone(), platform_from_dtos(dtos, fallback(platform))?);
            }
            let input = ProfileInput {
                id: profile.id,
                name: profile.name.clone(),
                description: profile.description.clone(),
                profile_type: profile.profile_type,
                configurations,
            };
            let saved = Some(input.clone());
            (input, saved)
        }
        None => {
            let mut configurations = BTreeMap::new();
            configurations.insert(
                DEFAULT_PLATFORM.to_string(),
                platform_from_dtos(&[], fallback(DEFAULT_PLATFORM))?,
            );
            let input = ProfileInput {
                configurations,
                ..ProfileInput::default()
            };
            (input, None)
        }
    };

    Ok((
        input,
        ProfileContext {
            saved,
            defaults,
            units,
        },
    ))
}

impl ProfilePayload {
    /// Serialises only entries that have an id or are active; numeric text becomes
    /// JSON numbers and empty rows are dropped.
    pub fn from_input(input: &ProfileInput) -> InfraResult<Self> {
        let mut configurations = BTreeMap::new();
        for (platform, configuration) in &input.configurations {
            let dtos = configuration
                .iter()
                .filter(|entry| entry.id.is_some() || entry.active)
                .map(|entry| {
                    Ok(ConfigurationDto {
                        id: entry.id,
                        key: entry.key.to_string(),
                        value: value_to_json(entry.key, &entry.value)?,
                        unit: entry.unit.clone(),
                        active: entry.active,
                        profile_name: None,
                    })
                })
                .collect::<InfraResult<Vec<_>>>()?;
            configurations.insert(platform.clone(), dtos);
        }

        Ok(Self {
            name: input.name.clone(),
            description: input.description.clone(),
            profile_type: input.profile_type,
            configurations,
        })
    }
}

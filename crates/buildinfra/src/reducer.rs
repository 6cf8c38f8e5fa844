//! The profile form state machine.
//!
//! `reduce` takes the current form state and one user action and produces the next
//! state. The previous state is never touched, so callers can keep it to discard a
//! rejected edit.
mod platform;
mod rows;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::errors::ProfileActionError;
use crate::models::configuration::{ConfigKey, ConfigValue, ConfigurationEntry, DefaultConfiguration};
use crate::models::form_errors::{PlatformErrors, ProfileErrors};
use crate::models::profile::{PlatformConfiguration, ProfileInput, DEFAULT_PLATFORM};
use crate::models::rows::{RowId, TolerationRow};
use crate::models::units::UnitCatalog;
use crate::validation::{
    validate_description, validate_node_selectors, validate_profile_name, validate_quantity,
    validate_request_limit, validate_timeout, validate_tolerations, ScalarInput,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ProfileAction {
    SetName {
        name: String,
    },
    SetDescription {
        description: String,
    },
    /// Edits a scalar field. `unit: None` keeps the selected unit.
    ChangeValue {
        platform: String,
        key: ConfigKey,
        value: String,
        #[serde(default)]
        unit: Option<String>,
    },
    Activate {
        platform: String,
        key: ConfigKey,
    },
    Deactivate {
        platform: String,
        key: ConfigKey,
    },
    AddTargetPlatform {
        platform: String,
    },
    RemoveTargetPlatform {
        platform: String,
    },
    RenameTargetPlatform {
        from: String,
        to: String,
    },
    AddNodeSelector {
        platform: String,
    },
    EditNodeSelector {
        platform: String,
        id: RowId,
        key: String,
        value: String,
    },
    DeleteNodeSelector {
        platform: String,
        id: RowId,
    },
    AddToleration {
        platform: String,
    },
    EditToleration {
        platform: String,
        row: TolerationRow,
    },
    DeleteToleration {
        platform: String,
        id: RowId,
    },
}

pub type DefaultConfigurations = BTreeMap<String, BTreeMap<ConfigKey, DefaultConfiguration>>;

/// Read-only data from the fetched profile response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileContext {
    /// The profile as last saved, `None` while creating.
    pub saved: Option<ProfileInput>,
    pub defaults: DefaultConfigurations,
    pub units: UnitCatalog,
}

impl ProfileContext {
    /// Defaults for `platform`, falling back to the default platform.
    pub fn fallback_for(&self, platform: &str) -> Option<&BTreeMap<ConfigKey, DefaultConfiguration>> {
        self.defaults
            .get(platform)
            .or_else(|| self.defaults.get(DEFAULT_PLATFORM))
    }

    pub fn saved_entry(&self, platform: &str, key: ConfigKey) -> Option<&ConfigurationEntry> {
        self.saved
            .as_ref()
            .and_then(|saved| saved.entry(platform, key))
    }
}

/// A platform as it was before being renamed to `renamed_to`.
#[derive(Debug, Clone, PartialEq)]
pub struct RenameSnapshot {
    pub renamed_to: String,
    pub configuration: PlatformConfiguration,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileFormState {
    pub input: ProfileInput,
    pub errors: ProfileErrors,
    /// Platform snapshots taken before a rename, keyed by the name they had.
    pub rename_cache: BTreeMap<String, RenameSnapshot>,
}

impl ProfileFormState {
    /// Builds a form for `input` with every field already validated.
    pub fn new(input: ProfileInput, context: &ProfileContext) -> Self {
        let errors = validate_profile(&input, &context.units);
        Self {
            input,
            errors,
            rename_cache: BTreeMap::new(),
        }
    }

    pub fn apply(
        &self,
        context: &ProfileContext,
        action: ProfileAction,
    ) -> Result<Self, ProfileActionError> {
        reduce(self, context, action)
    }
}

pub fn reduce(
    state: &ProfileFormState,
    context: &ProfileContext,
    action: ProfileAction,
) -> Result<ProfileFormState, ProfileActionError> {
    let mut next = state.clone();

    match action {
        ProfileAction::SetName { name } => {
            if next.input.is_default_profile() {
                warn!("ignoring rename of the default profile");
                return Ok(next);
            }
            next.errors.name = validate_profile_name(&name).into_message();
            next.input.name = name;
        }
        ProfileAction::SetDescription { description } => {
            next.errors.description = validate_description(&description).into_message();
            next.input.description = description;
        }
        ProfileAction::ChangeValue {
            platform,
            key,
            value,
            unit,
        } => change_value(&mut next, context, &platform, key, value, unit),
        ProfileAction::Activate { platform, key } => {
            set_active(&mut next, context, &platform, key, true)
        }
        ProfileAction::Deactivate { platform, key } => {
            set_active(&mut next, context, &platform, key, false)
        }
        ProfileAction::AddTargetPlatform { platform } => {
            platform::add_target_platform(&mut next, context, &platform)?
        }
        ProfileAction::RemoveTargetPlatform { platform } => {
            platform::remove_target_platform(&mut next, &platform)?
        }
        ProfileAction::RenameTargetPlatform { from, to } => {
            platform::rename_target_platform(&mut next, context, &from, &to)?
        }
        ProfileAction::AddNodeSelector { platform } => rows::add_node_selector(&mut next, &platform),
        ProfileAction::EditNodeSelector {
            platform,
            id,
            key,
            value,
        } => rows::edit_node_selector(&mut next, &platform, id, key, value),
        ProfileAction::DeleteNodeSelector { platform, id } => {
            rows::delete_node_selector(&mut next, &platform, id)
        }
        ProfileAction::AddToleration { platform } => rows::add_toleration(&mut next, &platform),
        ProfileAction::EditToleration { platform, row } => {
            rows::edit_toleration(&mut next, &platform, row)
        }
        ProfileAction::DeleteToleration { platform, id } => {
            rows::delete_toleration(&mut next, &platform, id)
        }
    }

    Ok(next)
}

fn change_value(
    next: &mut ProfileFormState,
    context: &ProfileContext,
    platform: &str,
    key: ConfigKey,
    value: String,
    unit: Option<String>,
) {
    if !key.is_scalar() {
        warn!(%key, "value edits only apply to scalar fields");
        return;
    }
    let Some(entry) = entry_mut(&mut next.input, platform, key) else {
        return;
    };
    if !entry.active {
        warn!(platform, %key, "ignoring edit of an inherited field");
        return;
    }

    entry.value = ConfigValue::Scalar(value);
    if unit.is_some() {
        entry.unit = unit;
    }
    revalidate_field(next, &context.units, platform, key);
}

fn set_active(
    next: &mut ProfileFormState,
    context: &ProfileContext,
    platform: &str,
    key: ConfigKey,
    active: bool,
) {
    let saved = context
        .saved_entry(platform, key)
        .filter(|saved| saved.active)
        .map(|saved| (saved.value.clone(), saved.unit.clone()));
    let Some(entry) = entry_mut(&mut next.input, platform, key) else {
        return;
    };
    // TODO: surface this to the caller once it is known whether a stale default can occur
    if entry.default_value.key != key {
        warn!(
            platform,
            %key,
            default_key = %entry.default_value.key,
            "stored default does not match field, leaving it unchanged"
        );
        return;
    }

    if active {
        let (value, unit) = saved.unwrap_or_else(|| {
            (
                entry.default_value.value.clone(),
                entry.default_value.unit.clone(),
            )
        });
        entry.value = value;
        entry.unit = unit;
        entry.active = true;
    } else {
        entry.reset_to_default();
    }
    revalidate_field(next, &context.units, platform, key);
}

pub(crate) fn entry_mut<'a>(
    input: &'a mut ProfileInput,
    platform: &str,
    key: ConfigKey,
) -> Option<&'a mut ConfigurationEntry> {
    input
        .configurations
        .get_mut(platform)
        .and_then(|configuration| configuration.get_mut(key))
}

fn scalar_input(entry: &ConfigurationEntry) -> ScalarInput {
    ScalarInput::new(
        entry.value.as_scalar().unwrap_or_default(),
        entry.unit.as_deref(),
    )
}

fn validate_field(
    configuration: &PlatformConfiguration,
    units: &UnitCatalog,
    key: ConfigKey,
    errors: &mut PlatformErrors,
) {
    match key {
        ConfigKey::Timeout => {
            if let Some(entry) = configuration.get(key) {
                let result = validate_timeout(&scalar_input(entry), units.units_for(key));
                errors.set_field(key, result.into_message());
            }
        }
        ConfigKey::NodeSelector => {
            errors.node_selector = configuration
                .get(key)
                .and_then(|entry| entry.value.as_node_selectors())
                .and_then(validate_node_selectors);
        }
        ConfigKey::Toleration => {
            errors.toleration = configuration
                .get(key)
                .and_then(|entry| entry.value.as_tolerations())
                .and_then(validate_tolerations);
        }
        ConfigKey::CpuRequest
        | ConfigKey::CpuLimit
        | ConfigKey::MemoryRequest
        | ConfigKey::MemoryLimit => {
            let (request_key, limit_key) = match key.pair() {
                Some(pair) if key.is_request() => (key, pair),
                Some(pair) => (pair, key),
                None => return,
            };
            let units = units.units_for(key);
            match (configuration.get(request_key), configuration.get(limit_key)) {
                (Some(request), Some(limit)) => {
                    let result =
                        validate_request_limit(&scalar_input(request), &scalar_input(limit), units);
                    errors.set_field(request_key, result.request.into_message());
                    errors.set_field(limit_key, result.limit.into_message());
                }
                (Some(single), None) | (None, Some(single)) => {
                    let result = validate_quantity(&scalar_input(single), units);
                    errors.set_field(single.key, result.into_message());
                }
                (None, None) => {}
            }
        }
    }
}

/// Re-runs the validator owning `key`, updating both sides of a request/limit pair.
pub(crate) fn revalidate_field(
    next: &mut ProfileFormState,
    units: &UnitCatalog,
    platform: &str,
    key: ConfigKey,
) {
    let Some(configuration) = next.input.configurations.get(platform) else {
        return;
    };
    validate_field(configuration, units, key, next.errors.platform_mut(platform));
}

pub(crate) fn validate_platform(
    configuration: &PlatformConfiguration,
    units: &UnitCatalog,
) -> PlatformErrors {
    let mut errors = PlatformErrors::default();
    for entry in configuration.iter() {
        validate_field(configuration, units, entry.key, &mut errors);
    }
    errors
}

/// Validates every field of `input`.
pub fn validate_profile(input: &ProfileInput, units: &UnitCatalog) -> ProfileErrors {
    let mut errors = ProfileErrors::default();
    if !input.is_default_profile() {
        errors.name = validate_profile_name(&input.name).into_message();
    }
    errors.description = validate_description(&input.description).into_message();
    for (platform, configuration) in &input.configurations {
        errors
            .configurations
            .insert(platform.clone(), validate_platform(configuration, units));
    }
    errors
}

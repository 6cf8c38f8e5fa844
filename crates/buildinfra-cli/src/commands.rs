pub mod apply;
pub mod delete;
pub mod edit;
pub mod list;
pub mod show;

use anyhow::{Context, Result};
use buildinfra::editor::ProfileEditor;
use buildinfra::models::configuration::ConfigKey;
use buildinfra::models::rows::{TolerationEffect, TolerationOperator, TolerationRow};
use buildinfra::notify::Notifier;
use buildinfra::reducer::ProfileAction;
use buildinfra::service::client::{ClientConfig, InfraConfigClient};
use buildinfra::service::ProfileService;

pub fn connect(config: ClientConfig) -> Result<InfraConfigClient> {
    let host = config.host.clone();
    InfraConfigClient::new(config).with_context(|| format!("Failed to create client for {}", host))
}

/// Fields of a toleration entered in one go.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
pub struct TolerationFields {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub operator: TolerationOperator,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub effect: Option<TolerationEffect>,
    #[serde(default)]
    pub toleration_seconds: Option<u64>,
}

/// Adds a node selector row and fills it in.
pub fn add_node_selector<S: ProfileService, N: Notifier>(
    editor: &mut ProfileEditor<S, N>,
    platform: &str,
    key: &str,
    value: &str,
) -> bool {
    if !editor.dispatch(ProfileAction::AddNodeSelector {
        platform: platform.to_string(),
    }) {
        return false;
    }
    let Some(id) = editor
        .state()
        .and_then(|state| state.input.entry(platform, ConfigKey::NodeSelector))
        .and_then(|entry| entry.value.as_node_selectors())
        .and_then(|rows| rows.first())
        .map(|row| row.id)
    else {
        return false;
    };
    editor.dispatch(ProfileAction::EditNodeSelector {
        platform: platform.to_string(),
        id,
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Adds a toleration row and fills it in.
pub fn add_toleration<S: ProfileService, N: Notifier>(
    editor: &mut ProfileEditor<S, N>,
    platform: &str,
    fields: TolerationFields,
) -> bool {
    if !editor.dispatch(ProfileAction::AddToleration {
        platform: platform.to_string(),
    }) {
        return false;
    }
    let Some(id) = editor
        .state()
        .and_then(|state| state.input.entry(platform, ConfigKey::Toleration))
        .and_then(|entry| entry.value.as_tolerations())
        .and_then(|rows| rows.first())
        .map(|row| row.id)
    else {
        return false;
    };
    editor.dispatch(ProfileAction::EditToleration {
        platform: platform.to_string(),
        row: TolerationRow {
            id,
            key: fields.key,
            operator: fields.operator,
            value: fields.value,
            effect: fields.effect,
            toleration_seconds: fields.toleration_seconds.map(|s| s.to_string()),
        },
    })
}

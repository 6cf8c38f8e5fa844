use anyhow::{Context, Result};
use buildinfra::editor::{EditorMode, ProfileEditor, SubmitOutcome};
use buildinfra::models::configuration::{ConfigKey, ConfigValue};
use buildinfra::models::profile::{ProfileInput, DEFAULT_PLATFORM};
use buildinfra::models::rows::{RowId, TolerationEffect, TolerationOperator};
use buildinfra::reducer::ProfileAction;
use buildinfra::service::client::{ClientConfig, InfraConfigClient};
use console::style;
use strum::IntoEnumIterator;

use super::{add_node_selector, add_toleration, connect, TolerationFields};
use crate::notifier::TerminalNotifier;
use crate::render::{field_summary, print_errors, toleration_label};

type Editor = ProfileEditor<InfraConfigClient, TerminalNotifier>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum MainChoice {
    Name,
    Description,
    Platform(String),
    AddPlatform,
    Errors,
    Save,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlatformChoice {
    Field(ConfigKey),
    Rename,
    Remove,
    Back,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RowChoice {
    Add,
    /// Row ids as strings so they can be menu values.
    Delete(String),
    UseDefault,
    Back,
}

pub async fn handle_edit(config: ClientConfig, mode: EditorMode) -> Result<()> {
    let title = match &mode {
        EditorMode::Create => " create profile ".to_string(),
        EditorMode::Edit(name) => format!(" edit {} ", name),
    };
    cliclack::intro(style(title).on_cyan().black())?;

    let mut editor = ProfileEditor::new(connect(config)?, TerminalNotifier, mode);
    editor.load().await.context("Failed to load profile")?;

    loop {
        match main_menu(&editor)? {
            MainChoice::Name => {
                let current = current_input(&editor, |input| input.name.clone());
                let name: String = cliclack::input("Profile name")
                    .default_input(&current)
                    .interact()?;
                editor.dispatch(ProfileAction::SetName { name });
            }
            MainChoice::Description => {
                let current = current_input(&editor, |input| input.description.clone());
                let description: String = cliclack::input("Description")
                    .default_input(&current)
                    .required(false)
                    .interact()?;
                editor.dispatch(ProfileAction::SetDescription { description });
            }
            MainChoice::Platform(platform) => platform_menu(&mut editor, &platform)?,
            MainChoice::AddPlatform => {
                let platform: String = cliclack::input("Target platform")
                    .placeholder("linux/arm64")
                    .interact()?;
                editor.dispatch(ProfileAction::AddTargetPlatform { platform });
            }
            MainChoice::Errors => match editor.state() {
                Some(state) if state.errors.has_errors() => print_errors(&state.errors),
                _ => {
                    let _ = cliclack::log::info("No validation errors");
                }
            },
            MainChoice::Save => match editor.submit_and_reload().await {
                SubmitOutcome::Saved { name, .. } => {
                    cliclack::outro(format!("Saved {}", name))?;
                    return Ok(());
                }
                SubmitOutcome::Blocked => {
                    if let Some(state) = editor.state() {
                        print_errors(&state.errors);
                    }
                }
                SubmitOutcome::InFlight | SubmitOutcome::Failed => {}
            },
            MainChoice::Quit => {
                cliclack::outro("No changes saved")?;
                return Ok(());
            }
        }
    }
}

fn current_input<F: Fn(&ProfileInput) -> String>(
    editor: &Editor,
    read: F,
) -> String {
    editor
        .state()
        .map(|state| read(&state.input))
        .unwrap_or_default()
}

fn main_menu(editor: &Editor) -> Result<MainChoice> {
    let Some(state) = editor.state() else {
        return Ok(MainChoice::Quit);
    };
    let input = &state.input;

    let mut select = cliclack::select("What would you like to change?")
        .item(MainChoice::Name, "Name", input.name.clone());
    select = select.item(
        MainChoice::Description,
        "Description",
        input.description.clone(),
    );
    for platform in input.platforms() {
        let hint = if state
            .errors
            .platform(platform)
            .map_or(false, |errors| errors.has_errors())
        {
            "has errors"
        } else {
            ""
        };
        select = select.item(
            MainChoice::Platform(platform.to_string()),
            format!("Platform {}", platform),
            hint,
        );
    }
    let error_hint = if state.errors.has_errors() {
        format!("{} error(s)", state.errors.messages().len())
    } else {
        String::new()
    };
    select = select
        .item(MainChoice::AddPlatform, "Add target platform", "")
        .item(MainChoice::Errors, "Review errors", error_hint)
        .item(MainChoice::Save, "Save", "")
        .item(MainChoice::Quit, "Quit", "");

    Ok(select.interact()?)
}

fn platform_menu(editor: &mut Editor, platform: &str) -> Result<()> {
    loop {
        let Some(configuration) = editor.state().and_then(|state| state.input.platform(platform))
        else {
            return Ok(());
        };

        let mut select = cliclack::select(format!("Platform {}", platform));
        for key in ConfigKey::iter() {
            if let Some(entry) = configuration.get(key) {
                let error = editor
                    .state()
                    .and_then(|state| state.errors.field(platform, key))
                    .unwrap_or_default()
                    .to_string();
                select = select.item(
                    PlatformChoice::Field(key),
                    format!("{}: {}", key.label(), field_summary(entry)),
                    error,
                );
            }
        }
        if platform != DEFAULT_PLATFORM {
            select = select
                .item(PlatformChoice::Rename, "Rename platform", "")
                .item(PlatformChoice::Remove, "Remove platform", "");
        }
        select = select.item(PlatformChoice::Back, "Back", "");

        match select.interact()? {
            PlatformChoice::Field(key) => field_menu(editor, platform, key)?,
            PlatformChoice::Rename => {
                let to: String = cliclack::input("New platform name")
                    .default_input(platform)
                    .interact()?;
                let renamed = editor.dispatch(ProfileAction::RenameTargetPlatform {
                    from: platform.to_string(),
                    to,
                });
                if renamed {
                    return Ok(());
                }
            }
            PlatformChoice::Remove => {
                if cliclack::confirm(format!("Remove {}?", platform)).interact()? {
                    editor.dispatch(ProfileAction::RemoveTargetPlatform {
                        platform: platform.to_string(),
                    });
                    return Ok(());
                }
            }
            PlatformChoice::Back => return Ok(()),
        }
    }
}

/// Makes sure the field overrides its default before editing it.
fn ensure_active(editor: &mut Editor, platform: &str, key: ConfigKey) -> Result<bool> {
    let active = editor
        .state()
        .and_then(|state| state.input.entry(platform, key))
        .map_or(false, |entry| entry.active);
    if active {
        return Ok(true);
    }
    if !cliclack::confirm(format!("{} is inherited. Override it?", key.label())).interact()? {
        return Ok(false);
    }
    Ok(editor.dispatch(ProfileAction::Activate {
        platform: platform.to_string(),
        key,
    }))
}

fn field_menu(editor: &mut Editor, platform: &str, key: ConfigKey) -> Result<()> {
    if !ensure_active(editor, platform, key)? {
        return Ok(());
    }
    match key {
        ConfigKey::NodeSelector | ConfigKey::Toleration => rows_menu(editor, platform, key),
        _ => scalar_menu(editor, platform, key),
    }
}

fn scalar_menu(editor: &mut Editor, platform: &str, key: ConfigKey) -> Result<()> {
    let Some(entry) = editor
        .state()
        .and_then(|state| state.input.entry(platform, key))
        .cloned()
    else {
        return Ok(());
    };

    let use_default = cliclack::select(key.label())
        .item(false, "Change value", field_summary(&entry))
        .item(true, "Use default", "")
        .interact()?;
    if use_default {
        editor.dispatch(ProfileAction::Deactivate {
            platform: platform.to_string(),
            key,
        });
        return Ok(());
    }

    let value: String = cliclack::input(format!("{} value", key.label()))
        .default_input(entry.value.as_scalar().unwrap_or_default())
        .interact()?;

    let units: Vec<String> = editor
        .context()
        .units
        .units_for(key)
        .iter()
        .map(|unit| unit.name.clone())
        .collect();
    let unit = if units.is_empty() {
        None
    } else {
        let mut select = cliclack::select("Unit");
        for unit in &units {
            select = select.item(unit.clone(), unit, "");
        }
        if let Some(current) = entry.unit.clone().filter(|unit| units.contains(unit)) {
            select = select.initial_value(current);
        }
        Some(select.interact()?)
    };

    editor.dispatch(ProfileAction::ChangeValue {
        platform: platform.to_string(),
        key,
        value,
        unit,
    });
    if let Some(error) = editor
        .state()
        .and_then(|state| state.errors.field(platform, key))
    {
        let _ = cliclack::log::warning(error);
    }
    Ok(())
}

fn row_items(editor: &Editor, platform: &str, key: ConfigKey) -> Vec<(String, String)> {
    let Some(entry) = editor.state().and_then(|state| state.input.entry(platform, key)) else {
        return Vec::new();
    };
    match &entry.value {
        ConfigValue::NodeSelectors(rows) => rows
            .iter()
            .map(|row| (row.id.to_string(), format!("{}={}", row.key, row.value)))
            .collect(),
        ConfigValue::Tolerations(rows) => rows
            .iter()
            .map(|row| (row.id.to_string(), toleration_label(row)))
            .collect(),
        ConfigValue::Scalar(_) => Vec::new(),
    }
}

fn rows_menu(editor: &mut Editor, platform: &str, key: ConfigKey) -> Result<()> {
    loop {
        let mut select = cliclack::select(key.label()).item(RowChoice::Add, "Add", "");
        for (id, label) in row_items(editor, platform, key) {
            select = select.item(RowChoice::Delete(id), format!("Delete {}", label), "");
        }
        select = select
            .item(RowChoice::UseDefault, "Use default", "")
            .item(RowChoice::Back, "Back", "");

        match select.interact()? {
            RowChoice::Add if key == ConfigKey::NodeSelector => {
                let label_key: String = cliclack::input("Label key").interact()?;
                let value: String = cliclack::input("Label value").required(false).interact()?;
                add_node_selector(editor, platform, &label_key, &value);
            }
            RowChoice::Add => {
                let fields = prompt_toleration()?;
                add_toleration(editor, platform, fields);
            }
            RowChoice::Delete(id) => {
                let Ok(id) = id.parse::<RowId>() else {
                    continue;
                };
                let action = if key == ConfigKey::NodeSelector {
                    ProfileAction::DeleteNodeSelector {
                        platform: platform.to_string(),
                        id,
                    }
                } else {
                    ProfileAction::DeleteToleration {
                        platform: platform.to_string(),
                        id,
                    }
                };
                editor.dispatch(action);
            }
            RowChoice::UseDefault => {
                editor.dispatch(ProfileAction::Deactivate {
                    platform: platform.to_string(),
                    key,
                });
                return Ok(());
            }
            RowChoice::Back => return Ok(()),
        }

        if let Some(errors) = editor.state().and_then(|state| state.errors.platform(platform)) {
            let rows = if key == ConfigKey::NodeSelector {
                &errors.node_selector
            } else {
                &errors.toleration
            };
            for row in rows.iter().flat_map(|rows| rows.values()) {
                for message in row.key.iter().chain(row.value.iter()) {
                    let _ = cliclack::log::warning(message);
                }
            }
        }
    }
}

fn prompt_toleration() -> Result<TolerationFields> {
    let key: String = cliclack::input("Toleration key").required(false).interact()?;

    let mut operators = cliclack::select("Operator");
    for operator in TolerationOperator::iter() {
        operators = operators.item(operator, operator.to_string(), "");
    }
    let operator = operators.interact()?;

    let value: String = if operator == TolerationOperator::Equal {
        cliclack::input("Value").required(false).interact()?
    } else {
        String::new()
    };

    let mut effects = cliclack::select("Effect").item(None, "Any", "");
    for effect in TolerationEffect::iter() {
        effects = effects.item(Some(effect), effect.to_string(), "");
    }
    let effect = effects.interact()?;

    let toleration_seconds = if effect == Some(TolerationEffect::NoExecute) {
        let seconds: String = cliclack::input("Toleration seconds")
            .required(false)
            .interact()?;
        let seconds = seconds.trim();
        if seconds.is_empty() {
            None
        } else {
            Some(seconds.parse().context("Toleration seconds must be a whole number")?)
        }
    } else {
        None
    };

    Ok(TolerationFields {
        key,
        operator,
        value,
        effect,
        toleration_seconds,
    })
}

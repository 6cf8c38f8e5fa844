use anyhow::{anyhow, bail, Context, Result};
use buildinfra::editor::{EditorMode, ProfileEditor, SubmitOutcome};
use buildinfra::notify::Notifier;
use buildinfra::reducer::ProfileAction;
use buildinfra::service::client::ClientConfig;
use buildinfra::service::ProfileService;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use super::{add_node_selector, add_toleration, connect, TolerationFields};
use crate::notifier::TerminalNotifier;
use crate::render::print_errors;

/// Row edits that need the id of a freshly added row.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RowStep {
    SetNodeSelector {
        platform: String,
        key: String,
        #[serde(default)]
        value: String,
    },
    SetToleration {
        platform: String,
        #[serde(flatten)]
        fields: TolerationFields,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ApplyStep {
    Action(ProfileAction),
    Row(RowStep),
}

pub fn load_steps(path: &Path) -> Result<Vec<ApplyStep>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Applies `steps` in order, stopping at the first rejected one.
pub fn run_steps<S: ProfileService, N: Notifier>(
    editor: &mut ProfileEditor<S, N>,
    steps: Vec<ApplyStep>,
) -> Result<()> {
    for (index, step) in steps.into_iter().enumerate() {
        tracing::debug!(?step, "applying step");
        let accepted = match step {
            ApplyStep::Action(action) => editor.dispatch(action),
            ApplyStep::Row(RowStep::SetNodeSelector {
                platform,
                key,
                value,
            }) => add_node_selector(editor, &platform, &key, &value),
            ApplyStep::Row(RowStep::SetToleration { platform, fields }) => {
                add_toleration(editor, &platform, fields)
            }
        };
        if !accepted {
            bail!("Step {} was rejected", index + 1);
        }
    }
    Ok(())
}

pub async fn apply_to<S: ProfileService, N: Notifier>(
    editor: &mut ProfileEditor<S, N>,
    name: &str,
    steps: Vec<ApplyStep>,
) -> Result<String> {
    editor.load().await.context("Failed to load profile")?;
    if editor.mode() == &EditorMode::Create {
        editor.dispatch(ProfileAction::SetName {
            name: name.to_string(),
        });
    }
    run_steps(editor, steps)?;

    match editor.submit_and_reload().await {
        SubmitOutcome::Saved { name, .. } => Ok(name),
        SubmitOutcome::Blocked => {
            if let Some(state) = editor.state() {
                print_errors(&state.errors);
            }
            Err(anyhow!("Profile has validation errors"))
        }
        SubmitOutcome::InFlight | SubmitOutcome::Failed => Err(anyhow!("Failed to save profile")),
    }
}

pub async fn handle_apply(config: ClientConfig, name: &str, file: &Path, create: bool) -> Result<()> {
    let steps = load_steps(file)?;
    let mode = if create {
        EditorMode::Create
    } else {
        EditorMode::Edit(name.to_string())
    };
    let mut editor = ProfileEditor::new(connect(config)?, TerminalNotifier, mode);

    apply_to(&mut editor, name, steps).await?;
    Ok(())
}

use anyhow::{Context, Result};
use bat::PrettyPrinter;
use buildinfra::models::configuration::{ConfigValue, ConfigurationEntry};
use buildinfra::models::form_errors::ProfileErrors;
use buildinfra::models::profile::ProfileInput;
use buildinfra::models::rows::{TolerationOperator, TolerationRow};
use buildinfra::payload::ProfileListResponse;
use console::style;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Serialize)]
#[serde(untagged)]
enum FieldValue {
    Text(String),
    Rows(Vec<String>),
}

#[derive(Serialize)]
struct FieldView {
    value: FieldValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<String>,
    inherited: bool,
}

#[derive(Serialize)]
struct ProfileView<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(rename = "type")]
    profile_type: String,
    platforms: BTreeMap<&'a str, BTreeMap<String, FieldView>>,
}

pub fn toleration_label(row: &TolerationRow) -> String {
    let mut label = match row.operator {
        TolerationOperator::Exists => format!("{} Exists", row.key),
        TolerationOperator::Equal => format!("{}={}", row.key, row.value),
    };
    if let Some(effect) = row.effect {
        label.push_str(&format!(":{}", effect));
    }
    if let Some(seconds) = row.toleration_seconds.as_deref().filter(|s| !s.is_empty()) {
        label.push_str(&format!(" for {}s", seconds));
    }
    label
}

fn field_value(value: &ConfigValue) -> FieldValue {
    match value {
        ConfigValue::Scalar(text) => FieldValue::Text(text.clone()),
        ConfigValue::NodeSelectors(rows) => FieldValue::Rows(
            rows.iter()
                .map(|row| format!("{}={}", row.key, row.value))
                .collect(),
        ),
        ConfigValue::Tolerations(rows) => {
            FieldValue::Rows(rows.iter().map(toleration_label).collect())
        }
    }
}

/// One line describing a field, used in menus.
pub fn field_summary(entry: &ConfigurationEntry) -> String {
    let value = match &entry.value {
        ConfigValue::Scalar(text) => match &entry.unit {
            Some(unit) => format!("{} {}", text, unit),
            None => text.clone(),
        },
        ConfigValue::NodeSelectors(rows) => format!("{} node selector(s)", rows.len()),
        ConfigValue::Tolerations(rows) => format!("{} toleration(s)", rows.len()),
    };
    if entry.active {
        value
    } else {
        format!("{} (inherited)", value)
    }
}

pub fn profile_yaml(input: &ProfileInput) -> Result<String> {
    let platforms = input
        .configurations
        .iter()
        .map(|(platform, configuration)| {
            let fields = configuration
                .iter()
                .map(|entry| {
                    (
                        entry.key.to_string(),
                        FieldView {
                            value: field_value(&entry.value),
                            unit: entry.unit.clone(),
                            inherited: !entry.active,
                        },
                    )
                })
                .collect();
            (platform.as_str(), fields)
        })
        .collect();

    let view = ProfileView {
        name: &input.name,
        description: Some(input.description.as_str()).filter(|d| !d.is_empty()),
        profile_type: input.profile_type.to_string(),
        platforms,
    };
    serde_yaml::to_string(&view).context("Failed to render profile")
}

pub fn print_yaml(content: &str) -> Result<()> {
    PrettyPrinter::new()
        .input_from_bytes(content.as_bytes())
        .language("yaml")
        .print()
        .context("Failed to print output")?;
    Ok(())
}

pub fn print_profiles(list: &ProfileListResponse) {
    if let Some(default) = &list.default_profile {
        println!(
            "{}  {}",
            style(&default.name).bold(),
            style("(applies to every build without a profile)").dim()
        );
    }
    if list.profiles.is_empty() {
        println!("{}", style("No custom profiles").dim());
        return;
    }
    for profile in &list.profiles {
        let apps = profile.app_count.unwrap_or_default();
        println!(
            "{}  {}  {}",
            style(&profile.name).cyan(),
            style(format!("{} app(s)", apps)).dim(),
            profile.description
        );
    }
}

pub fn print_errors(errors: &ProfileErrors) {
    for message in errors.messages() {
        println!("  {} {}", style("✗").red(), message);
    }
}

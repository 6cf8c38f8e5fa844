use tracing::warn;

use super::{entry_mut, ProfileFormState};
use crate::models::configuration::{ConfigKey, ConfigValue};
use crate::models::rows::{NodeSelectorRow, RowId, TolerationRow};
use crate::validation::{validate_node_selectors, validate_tolerations};

fn node_selectors_mut<'a>(
    next: &'a mut ProfileFormState,
    platform: &str,
) -> Option<&'a mut Vec<NodeSelectorRow>> {
    let entry = entry_mut(&mut next.input, platform, ConfigKey::NodeSelector)?;
    if !entry.active {
        warn!(platform, "ignoring node selector edit of an inherited field");
        return None;
    }
    match entry.value {
        ConfigValue::NodeSelectors(ref mut rows) => Some(rows),
        _ => None,
    }
}

fn tolerations_mut<'a>(
    next: &'a mut ProfileFormState,
    platform: &str,
) -> Option<&'a mut Vec<TolerationRow>> {
    let entry = entry_mut(&mut next.input, platform, ConfigKey::Toleration)?;
    if !entry.active {
        warn!(platform, "ignoring toleration edit of an inherited field");
        return None;
    }
    match entry.value {
        ConfigValue::Tolerations(ref mut rows) => Some(rows),
        _ => None,
    }
}

fn revalidate_node_selectors(next: &mut ProfileFormState, platform: &str) {
    let errors = next
        .input
        .entry(platform, ConfigKey::NodeSelector)
        .and_then(|entry| entry.value.as_node_selectors())
        .and_then(validate_node_selectors);
    next.errors.platform_mut(platform).node_selector = errors;
}

fn revalidate_tolerations(next: &mut ProfileFormState, platform: &str) {
    let errors = next
        .input
        .entry(platform, ConfigKey::Toleration)
        .and_then(|entry| entry.value.as_tolerations())
        .and_then(validate_tolerations);
    next.errors.platform_mut(platform).toleration = errors;
}

pub(super) fn add_node_selector(next: &mut ProfileFormState, platform: &str) {
    if let Some(rows) = node_selectors_mut(next, platform) {
        rows.insert(0, NodeSelectorRow::empty());
        revalidate_node_selectors(next, platform);
    }
}

pub(super) fn edit_node_selector(
    next: &mut ProfileFormState,
    platform: &str,
    id: RowId,
    key: String,
    value: String,
) {
    let Some(row) = node_selectors_mut(next, platform)
        .and_then(|rows| rows.iter_mut().find(|row| row.id == id))
    else {
        return;
    };
    row.key = key;
    row.value = value;
    revalidate_node_selectors(next, platform);
}

pub(super) fn delete_node_selector(next: &mut ProfileFormState, platform: &str, id: RowId) {
    if let Some(rows) = node_selectors_mut(next, platform) {
        rows.retain(|row| row.id != id);
        revalidate_node_selectors(next, platform);
    }
}

pub(super) fn add_toleration(next: &mut ProfileFormState, platform: &str) {
    if let Some(rows) = tolerations_mut(next, platform) {
        rows.insert(0, TolerationRow::empty());
        revalidate_tolerations(next, platform);
    }
}

pub(super) fn edit_toleration(next: &mut ProfileFormState, platform: &str, edited: TolerationRow) {
    let Some(row) = tolerations_mut(next, platform)
        .and_then(|rows| rows.iter_mut().find(|row| row.id == edited.id))
    else {
        return;
    };
    *row = edited;
    revalidate_tolerations(next, platform);
}

pub(super) fn delete_toleration(next: &mut ProfileFormState, platform: &str, id: RowId) {
    if let Some(rows) = tolerations_mut(next, platform) {
        rows.retain(|row| row.id != id);
        revalidate_tolerations(next, platform);
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::{ProfileAction, ProfileContext, ProfileFormState};
    use crate::models::configuration::ConfigKey;
    use crate::models::rows::{TolerationEffect, TolerationOperator};

    fn with_active_rows(context: &ProfileContext) -> ProfileFormState {
        let state = state(context);
        let state = apply(
            &state,
            context,
            ProfileAction::Activate {
                platform: "default".to_string(),
                key: ConfigKey::NodeSelector,
            },
        );
        apply(
            &state,
            context,
            ProfileAction::Activate {
                platform: "default".to_string(),
                key: ConfigKey::Toleration,
            },
        )
    }

    fn node_selectors(state: &ProfileFormState) -> Vec<crate::models::rows::NodeSelectorRow> {
        state
            .input
            .entry("default", ConfigKey::NodeSelector)
            .and_then(|entry| entry.value.as_node_selectors())
            .unwrap()
            .to_vec()
    }

    fn edit(state: &ProfileFormState, context: &ProfileContext, index: usize, key: &str, value: &str) -> ProfileFormState {
        let id = node_selectors(state)[index].id;
        apply(
            state,
            context,
            ProfileAction::EditNodeSelector {
                platform: "default".to_string(),
                id,
                key: key.to_string(),
                value: value.to_string(),
            },
        )
    }

    #[test]
    fn test_add_node_selector_prepends_empty_row() {
        let context = context();
        let state = with_active_rows(&context);
        let add = ProfileAction::AddNodeSelector {
            platform: "default".to_string(),
        };
        let state = apply(&state, &context, add.clone());
        let state = edit(&state, &context, 0, "pool", "ci");
        let state = apply(&state, &context, add);

        let rows = node_selectors(&state);
        assert_eq!(rows.len(), 2);
        assert!(rows[0].is_empty());
        assert_eq!(rows[1].key, "pool");
        assert!(state.errors.platform("default").unwrap().node_selector.is_none());
    }

    #[test]
    fn test_empty_node_selector_row_produces_no_error() {
        let context = context();
        let state = with_active_rows(&context);
        let state = apply(
            &state,
            &context,
            ProfileAction::AddNodeSelector {
                platform: "default".to_string(),
            },
        );
        let state = edit(&state, &context, 0, "-bad-", "");
        assert!(state.errors.has_errors());

        let state = edit(&state, &context, 0, "", "");
        assert!(state.errors.platform("default").unwrap().node_selector.is_none());
        assert!(!state.errors.has_errors());
    }

    #[test]
    fn test_duplicate_keys_clear_after_delete() {
        let context = context();
        let mut state = with_active_rows(&context);
        for _ in 0..2 {
            state = apply(
                &state,
                &context,
                ProfileAction::AddNodeSelector {
                    platform: "default".to_string(),
                },
            );
            state = edit(&state, &context, 0, "pool", "ci");
        }
        let errors = state.errors.platform("default").unwrap().node_selector.clone().unwrap();
        assert_eq!(errors.len(), 2);

        let id = node_selectors(&state)[0].id;
        let state = apply(
            &state,
            &context,
            ProfileAction::DeleteNodeSelector {
                platform: "default".to_string(),
                id,
            },
        );
        assert_eq!(node_selectors(&state).len(), 1);
        assert!(!state.errors.has_errors());
    }

    #[test]
    fn test_inherited_rows_ignore_edits() {
        let context = context();
        let state = state(&context);
        let next = apply(
            &state,
            &context,
            ProfileAction::AddToleration {
                platform: "default".to_string(),
            },
        );
        assert_eq!(next, state);
    }

    #[test]
    fn test_toleration_edit_and_delete() {
        let context = context();
        let state = apply(
            &with_active_rows(&context),
            &context,
            ProfileAction::AddToleration {
                platform: "default".to_string(),
            },
        );
        let mut row = state
            .input
            .entry("default", ConfigKey::Toleration)
            .and_then(|entry| entry.value.as_tolerations())
            .unwrap()[0]
            .clone();

        row.key = "dedicated".to_string();
        row.operator = TolerationOperator::Exists;
        row.value = "ci".to_string();
        let state = apply(
            &state,
            &context,
            ProfileAction::EditToleration {
                platform: "default".to_string(),
                row: row.clone(),
            },
        );
        let errors = state.errors.platform("default").unwrap().toleration.clone().unwrap();
        assert_eq!(errors[&row.id].value.len(), 1);

        row.value.clear();
        row.effect = Some(TolerationEffect::NoExecute);
        row.toleration_seconds = Some("300".to_string());
        let state = apply(
            &state,
            &context,
            ProfileAction::EditToleration {
                platform: "default".to_string(),
                row: row.clone(),
            },
        );
        assert!(!state.errors.has_errors());

        let state = apply(
            &state,
            &context,
            ProfileAction::DeleteToleration {
                platform: "default".to_string(),
                id: row.id,
            },
        );
        assert_eq!(
            state
                .input
                .entry("default", ConfigKey::Toleration)
                .and_then(|entry| entry.value.as_tolerations())
                .map(|rows| rows.len()),
            Some(0)
        );
    }
}

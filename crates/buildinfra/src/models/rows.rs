use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use uuid::Uuid;

/// Identifies a node selector or toleration row while it is being edited.
pub type RowId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeSelectorRow {
    pub id: RowId,
    pub key: String,
    pub value: String,
}

impl NodeSelectorRow {
    pub fn new<K: Into<String>, V: Into<String>>(key: K, value: V) -> Self {
        Self {
            id: Uuid::new_v4(),
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn empty() -> Self {
        Self::new("", "")
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_empty() && self.value.is_empty()
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, EnumString, Display,
)]
pub enum TolerationOperator {
    #[default]
    Equal,
    Exists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, EnumString, Display)]
pub enum TolerationEffect {
    NoSchedule,
    PreferNoSchedule,
    NoExecute,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TolerationRow {
    pub id: RowId,
    pub key: String,
    #[serde(default)]
    pub operator: TolerationOperator,
    #[serde(default)]
    pub value: String,
    /// `None` tolerates every effect.
    #[serde(default)]
    pub effect: Option<TolerationEffect>,
    #[serde(default)]
    pub toleration_seconds: Option<String>,
}

impl TolerationRow {
    pub fn empty() -> Self {
        Self {
            id: Uuid::new_v4(),
            key: String::new(),
            operator: TolerationOperator::Equal,
            value: String::new(),
            effect: None,
            toleration_seconds: None,
        }
    }

    /// A blank row as added by the editor. `Exists` or an effect alone is a
    /// real toleration that matches every taint.
    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
            && self.value.is_empty()
            && self.operator == TolerationOperator::Equal
            && self.effect.is_none()
            && self
                .toleration_seconds
                .as_deref()
                .map_or(true, |seconds| seconds.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rows_get_distinct_ids() {
        let first = NodeSelectorRow::empty();
        let second = NodeSelectorRow::empty();
        assert_ne!(first.id, second.id);
        assert!(first.is_empty());
    }

    #[test]
    fn test_toleration_empty_only_for_blank_rows() {
        let mut row = TolerationRow::empty();
        assert!(row.is_empty());
        row.toleration_seconds = Some("  ".to_string());
        assert!(row.is_empty());

        row.operator = TolerationOperator::Exists;
        assert!(!row.is_empty());

        let mut row = TolerationRow::empty();
        row.effect = Some(TolerationEffect::NoSchedule);
        assert!(!row.is_empty());

        let mut row = TolerationRow::empty();
        row.toleration_seconds = Some("30".to_string());
        assert!(!row.is_empty());
    }
}

//! Node selection rules.
//!
//! A [`NodeSelector`] is a closed set of rule kinds sharing one capability,
//! [`NodeSelector::matches`]. Rules are checked with
//! [`NodeSelector::validate`] before use; a malformed rule is reported, never
//! treated as "matches nothing".

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tsync_id::NodeName;

use crate::model::Node;

/// Maximum length of a label name (the part after an optional prefix).
pub const MAX_LABEL_NAME_LEN: usize = 63;

/// Maximum length of a label value.
pub const MAX_LABEL_VALUE_LEN: usize = 63;

/// Why a selector is malformed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("node name list is empty")]
    EmptyNodeNames,

    #[error("invalid node name '{name}': {message}")]
    InvalidNodeName { name: String, message: String },

    #[error("unsupported selector type")]
    UnsupportedSelector,

    #[error("unsupported operator on label '{key}'")]
    UnsupportedOperator { key: String },

    #[error("anyOf has no rules")]
    EmptyAnyOf,

    #[error("label selector has no requirements")]
    EmptyRequirements,

    #[error("invalid label key '{key}': {message}")]
    InvalidLabelKey { key: String, message: String },

    #[error("invalid value '{value}' for label '{key}': {message}")]
    InvalidLabelValue {
        key: String,
        value: String,
        message: String,
    },

    #[error("operator {operator:?} on label '{key}' requires at least one value")]
    MissingValues { key: String, operator: LabelOperator },

    #[error("operator {operator:?} on label '{key}' takes no values")]
    UnexpectedValues { key: String, operator: LabelOperator },
}

/// Which nodes a declaration applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeSelector {
    /// Every node.
    All,

    /// Nodes whose name is in the list.
    ///
    /// Names are kept as written and checked by [`NodeSelector::validate`].
    NodeNames {
        #[serde(default)]
        names: BTreeSet<String>,
    },

    /// Nodes satisfying every requirement.
    Labels {
        #[serde(default)]
        requirements: Vec<LabelRequirement>,
    },

    /// Nodes matching at least one nested rule.
    AnyOf {
        #[serde(default)]
        rules: Vec<NodeSelector>,
    },

    /// Any `type` this version does not know. Never valid.
    #[serde(other)]
    Unsupported,
}

impl NodeSelector {
    pub fn node_names<I>(names: I) -> Self
    where
        I: IntoIterator<Item = NodeName>,
    {
        Self::NodeNames {
            names: names.into_iter().map(NodeName::into_string).collect(),
        }
    }

    pub fn label_exists(key: impl Into<String>) -> Self {
        Self::Labels {
            requirements: vec![LabelRequirement::exists(key)],
        }
    }

    pub fn label_equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Labels {
            requirements: vec![LabelRequirement::is_in(key, [value.into()])],
        }
    }

    /// Returns true if the rule selects `node`.
    ///
    /// Only meaningful for rules that passed [`NodeSelector::validate`].
    pub fn matches(&self, node: &Node) -> bool {
        match self {
            Self::All => true,
            Self::NodeNames { names } => names.contains(node.name.as_str()),
            Self::Labels { requirements } => {
                requirements.iter().all(|r| r.matches(&node.labels))
            }
            Self::AnyOf { rules } => rules.iter().any(|r| r.matches(node)),
            Self::Unsupported => false,
        }
    }

    /// Checks that the rule is well formed.
    pub fn validate(&self) -> Result<(), SelectorError> {
        match self {
            Self::All => Ok(()),
            Self::NodeNames { names } if names.is_empty() => Err(SelectorError::EmptyNodeNames),
            Self::NodeNames { names } => names.iter().try_for_each(|name| {
                name.parse::<NodeName>()
                    .map(drop)
                    .map_err(|e| SelectorError::InvalidNodeName {
                        name: name.clone(),
                        message: e.to_string(),
                    })
            }),
            Self::Labels { requirements } if requirements.is_empty() => {
                Err(SelectorError::EmptyRequirements)
            }
            Self::Labels { requirements } => {
                requirements.iter().try_for_each(LabelRequirement::validate)
            }
            Self::AnyOf { rules } if rules.is_empty() => Err(SelectorError::EmptyAnyOf),
            Self::AnyOf { rules } => rules.iter().try_for_each(NodeSelector::validate),
            Self::Unsupported => Err(SelectorError::UnsupportedSelector),
        }
    }
}

/// Set-based label operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelOperator {
    In,
    NotIn,
    Exists,
    DoesNotExist,

    /// Any operator this version does not know. Never valid.
    #[serde(other)]
    Unsupported,
}

/// One condition on a node's labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRequirement {
    #[serde(default)]
    pub key: String,
    pub operator: LabelOperator,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub values: BTreeSet<String>,
}

impl LabelRequirement {
    pub fn exists(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            operator: LabelOperator::Exists,
            values: BTreeSet::new(),
        }
    }

    pub fn does_not_exist(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            operator: LabelOperator::DoesNotExist,
            values: BTreeSet::new(),
        }
    }

    pub fn is_in<I>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            key: key.into(),
            operator: LabelOperator::In,
            values: values.into_iter().collect(),
        }
    }

    pub fn not_in<I>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            key: key.into(),
            operator: LabelOperator::NotIn,
            values: values.into_iter().collect(),
        }
    }

    /// `NotIn` also matches nodes that lack the label.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        let value = labels.get(&self.key);
        match self.operator {
            LabelOperator::In => value.is_some_and(|v| self.values.contains(v)),
            LabelOperator::NotIn => value.is_none_or(|v| !self.values.contains(v)),
            LabelOperator::Exists => value.is_some(),
            LabelOperator::DoesNotExist => value.is_none(),
            LabelOperator::Unsupported => false,
        }
    }

    pub fn validate(&self) -> Result<(), SelectorError> {
        validate_label_key(&self.key)?;

        match self.operator {
            LabelOperator::In | LabelOperator::NotIn if self.values.is_empty() => {
                Err(SelectorError::MissingValues {
                    key: self.key.clone(),
                    operator: self.operator,
                })
            }
            LabelOperator::In | LabelOperator::NotIn => self
                .values
                .iter()
                .try_for_each(|v| validate_label_value(&self.key, v)),
            LabelOperator::Exists | LabelOperator::DoesNotExist if !self.values.is_empty() => {
                Err(SelectorError::UnexpectedValues {
                    key: self.key.clone(),
                    operator: self.operator,
                })
            }
            LabelOperator::Exists | LabelOperator::DoesNotExist => Ok(()),
            LabelOperator::Unsupported => Err(SelectorError::UnsupportedOperator {
                key: self.key.clone(),
            }),
        }
    }
}

/// Validates a qualified label key: `[prefix/]name`, where the prefix is a
/// DNS subdomain and the name is at most 63 characters of alphanumerics,
/// `-`, `_` and `.`, starting and ending with an alphanumeric.
pub fn validate_label_key(key: &str) -> Result<(), SelectorError> {
    let invalid = |message: String| SelectorError::InvalidLabelKey {
        key: key.to_string(),
        message,
    };

    let name = match key.split_once('/') {
        Some((prefix, name)) => {
            tsync_id::validate_dns_subdomain("label prefix", prefix)
                .map_err(|e| invalid(e.to_string()))?;
            name
        }
        None => key,
    };

    if name.is_empty() {
        return Err(invalid("name part is empty".to_string()));
    }
    check_label_segment(name, MAX_LABEL_NAME_LEN).map_err(invalid)
}

fn validate_label_value(key: &str, value: &str) -> Result<(), SelectorError> {
    // Empty values are legal label values.
    if value.is_empty() {
        return Ok(());
    }
    check_label_segment(value, MAX_LABEL_VALUE_LEN).map_err(|message| {
        SelectorError::InvalidLabelValue {
            key: key.to_string(),
            value: value.to_string(),
            message,
        }
    })
}

fn check_label_segment(s: &str, max_len: usize) -> Result<(), String> {
    if s.len() > max_len {
        return Err(format!("longer than {max_len} characters"));
    }
    if let Some(c) = s
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(format!("invalid character {c:?}"));
    }
    let alnum = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
    if !alnum(s.chars().next()) || !alnum(s.chars().last()) {
        return Err("must start and end with an alphanumeric character".to_string());
    }
    Ok(())
}

//! The recommendation engine.
//!
//! Given every declaration and one node, compute the ordered list of
//! declarations that apply to that node. The computation is a single
//! filter, sort and slot-resolution pass and has no side effects.
//!
//! Ordering is the total order of [`ProfileDeclaration::order_key`]:
//! explicit priorities ascending (`0` first), unset priorities after them,
//! then profile names. Two declarations with the same name and priority have
//! no defined order and are rejected.

use std::collections::BTreeSet;

use crate::error::ConfigurationError;
use crate::model::{Node, ProfileDeclaration};

/// The declarations applicable to one node, in precedence order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeRecommendation<'a> {
    entries: Vec<&'a ProfileDeclaration>,
}

impl<'a> NodeRecommendation<'a> {
    pub fn entries(&self) -> &[&'a ProfileDeclaration] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a ProfileDeclaration> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Profile names in order, mostly for logs and CLI output.
    pub fn names(&self) -> Vec<&'a str> {
        self.entries.iter().map(|d| d.name.as_str()).collect()
    }
}

/// Compute the recommendation for `node`.
///
/// Declarations sharing a slot are mutually exclusive: only the first one in
/// precedence order survives. Declarations without a slot all apply.
pub fn recommend<'a>(
    declarations: &'a [ProfileDeclaration],
    node: &Node,
) -> Result<NodeRecommendation<'a>, ConfigurationError> {
    let mut matched = Vec::new();
    for declaration in declarations {
        check_selector(declaration)?;
        if declaration.selector.matches(node) {
            matched.push(declaration);
        }
    }

    matched.sort_by(|a, b| a.order_key().cmp(&b.order_key()));

    if let Some(pair) = matched
        .windows(2)
        .find(|pair| pair[0].order_key() == pair[1].order_key())
    {
        return Err(duplicate(pair[0]));
    }

    let mut taken_slots = BTreeSet::new();
    matched.retain(|d| match d.slot.as_deref() {
        Some(slot) => taken_slots.insert(slot),
        None => true,
    });

    Ok(NodeRecommendation { entries: matched })
}

/// Check every declaration before a pass touches any node.
///
/// This catches malformed selectors and duplicate identities even when no
/// current node would match them.
pub fn validate_declarations(declarations: &[ProfileDeclaration]) -> Result<(), ConfigurationError> {
    let mut seen = BTreeSet::new();
    for declaration in declarations {
        check_selector(declaration)?;
        if !seen.insert((&declaration.name, declaration.priority)) {
            return Err(duplicate(declaration));
        }
    }
    Ok(())
}

fn check_selector(declaration: &ProfileDeclaration) -> Result<(), ConfigurationError> {
    declaration
        .selector
        .validate()
        .map_err(|reason| ConfigurationError::InvalidSelector {
            profile: declaration.name.clone(),
            reason,
        })
}

fn duplicate(declaration: &ProfileDeclaration) -> ConfigurationError {
    ConfigurationError::DuplicateDeclaration {
        name: declaration.name.clone(),
        priority: declaration.priority,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::NodeSelector;
    use proptest::prelude::*;
    use serde_json::json;

    fn node(name: &str) -> Node {
        Node::new(name.parse().unwrap())
    }

    fn decl(name: &str, selector: NodeSelector, priority: Option<u32>) -> ProfileDeclaration {
        let mut d = ProfileDeclaration::new(name.parse().unwrap(), selector, json!(name));
        d.priority = priority;
        d
    }

    #[test]
    fn test_no_match_is_empty() {
        let decls = vec![decl(
            "gm",
            NodeSelector::node_names(["n2".parse().unwrap()]),
            Some(0),
        )];
        let rec = recommend(&decls, &node("n1")).unwrap();
        assert!(rec.is_empty());
    }

    #[test]
    fn test_lower_priority_value_first() {
        let decls = vec![
            decl("low", NodeSelector::All, Some(10)),
            decl("high", NodeSelector::All, Some(1)),
            decl("unset", NodeSelector::All, None),
        ];
        let rec = recommend(&decls, &node("n1")).unwrap();
        assert_eq!(rec.names(), vec!["high", "low", "unset"]);
    }

    #[test]
    fn test_equal_priority_orders_by_name() {
        let decls = vec![
            decl("bravo", NodeSelector::All, Some(5)),
            decl("alpha", NodeSelector::All, Some(5)),
        ];
        let rec = recommend(&decls, &node("n1")).unwrap();
        assert_eq!(rec.names(), vec!["alpha", "bravo"]);
    }

    #[test]
    fn test_slot_keeps_only_best_match() {
        let decls = vec![
            decl("fallback", NodeSelector::All, Some(9)).with_slot("ens1f0"),
            decl("tuned", NodeSelector::label_exists("ptp/tuned"), Some(1)).with_slot("ens1f0"),
            decl("phc", NodeSelector::All, Some(5)),
        ];

        let tuned = recommend(&decls, &node("n1").with_label("ptp/tuned", "")).unwrap();
        assert_eq!(tuned.names(), vec!["tuned", "phc"]);

        let plain = recommend(&decls, &node("n2")).unwrap();
        assert_eq!(plain.names(), vec!["phc", "fallback"]);
    }

    #[test]
    fn test_duplicate_identity_is_rejected() {
        let decls = vec![
            decl("default", NodeSelector::All, Some(0)),
            decl("default", NodeSelector::All, Some(0)),
        ];
        let err = recommend(&decls, &node("n1")).unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateDeclaration { priority: Some(0), .. }));
        assert!(validate_declarations(&decls).is_err());
    }

    #[test]
    fn test_same_name_different_priority_is_ordered() {
        let decls = vec![
            decl("default", NodeSelector::All, Some(3)),
            decl("default", NodeSelector::All, Some(0)),
        ];
        assert!(validate_declarations(&decls).is_ok());
        let rec = recommend(&decls, &node("n1")).unwrap();
        let priorities: Vec<_> = rec.iter().map(|d| d.priority).collect();
        assert_eq!(priorities, vec![Some(0), Some(3)]);
    }

    #[test]
    fn test_invalid_selector_aborts_even_without_match() {
        let decls = vec![
            decl("ok", NodeSelector::All, Some(0)),
            decl("broken", NodeSelector::AnyOf { rules: vec![] }, Some(1)),
        ];
        let err = recommend(&decls, &node("n1")).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidSelector { .. }));
        assert!(validate_declarations(&decls).is_err());
    }

    #[test]
    fn test_duplicates_outside_node_are_caught_up_front() {
        let only_n2 = NodeSelector::node_names(["n2".parse().unwrap()]);
        let decls = vec![
            decl("gm", only_n2.clone(), None),
            decl("gm", only_n2, None),
        ];
        assert!(recommend(&decls, &node("n1")).unwrap().is_empty());
        assert!(validate_declarations(&decls).is_err());
    }

    proptest! {
        #[test]
        fn prop_recommendation_ignores_input_order(
            priorities in proptest::collection::vec(proptest::option::of(0u32..4), 1..8),
            seed in any::<u64>(),
        ) {
            let decls: Vec<_> = priorities
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    let d = decl(&format!("p{i}"), NodeSelector::All, *p);
                    if i % 3 == 0 { d.with_slot("shared") } else { d }
                })
                .collect();

            let mut shuffled = decls.clone();
            let len = shuffled.len();
            for i in 0..len {
                let j = (seed as usize).wrapping_add(i * 7) % len;
                shuffled.swap(i, j);
            }

            let n = node("n1");
            let a = recommend(&decls, &n).unwrap();
            let b = recommend(&shuffled, &n).unwrap();
            prop_assert_eq!(a.names(), b.names());
            prop_assert_eq!(a.names(), recommend(&decls, &n).unwrap().names());
        }
    }
}

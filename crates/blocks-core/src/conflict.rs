//! Conflict Detector
//!
//! Finds the properties two block objects both set, per pseudo-element.

use std::collections::{BTreeMap, BTreeSet};

use blocks_syntax::Declaration;

use crate::model::{BlockGraph, StyleId};

/// How two sets of values for one property relate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConflictType {
    NoConflict,
    SameValues,
    Conflict,
}

/// Combine two classifications: `Conflict` wins, `NoConflict` yields
pub fn update_conflict(current: ConflictType, next: ConflictType) -> ConflictType {
    match (current, next) {
        (ConflictType::Conflict, _) | (_, ConflictType::Conflict) => ConflictType::Conflict,
        (ConflictType::NoConflict, other) | (other, ConflictType::NoConflict) => other,
        (ConflictType::SameValues, ConflictType::SameValues) => ConflictType::SameValues,
    }
}

/// Properties set by both objects, keyed by pseudo-element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conflicts {
    by_pseudo: BTreeMap<Option<String>, BTreeSet<String>>,
}

impl Conflicts {
    pub fn is_empty(&self) -> bool {
        self.by_pseudo.values().all(BTreeSet::is_empty)
    }

    /// Conflicting longhands for a pseudo-element (`None` for the element)
    pub fn properties(&self, pseudo: Option<&str>) -> BTreeSet<String> {
        self.by_pseudo
            .get(&pseudo.map(str::to_string))
            .cloned()
            .unwrap_or_default()
    }

    pub fn pseudo_elements(&self) -> impl Iterator<Item = Option<&str>> {
        self.by_pseudo.keys().map(|key| key.as_deref())
    }
}

/// Properties concerned by both `a` and `b`
pub fn detect_conflicts(graph: &BlockGraph, a: StyleId, b: StyleId) -> Conflicts {
    let a_rulesets = &graph.style(a).rulesets;
    let b_rulesets = &graph.style(b).rulesets;
    let mut by_pseudo = BTreeMap::new();
    for pseudo in a_rulesets.pseudo_elements() {
        let b_concerns = b_rulesets.concerns(pseudo);
        if b_concerns.is_empty() {
            continue;
        }
        let shared: BTreeSet<String> = a_rulesets
            .concerns(pseudo)
            .intersection(&b_concerns)
            .cloned()
            .collect();
        if !shared.is_empty() {
            by_pseudo.insert(pseudo.map(str::to_string), shared);
        }
    }
    Conflicts { by_pseudo }
}

/// Compare two value lists for one property, in order and with priority
pub fn compare_values(local: &[Declaration], other: &[Declaration]) -> ConflictType {
    if local.is_empty() || other.is_empty() {
        return ConflictType::NoConflict;
    }
    let same = local.len() == other.len()
        && local.iter().zip(other).all(|(a, b)| {
            a.prop == b.prop && a.value == b.value && a.important == b.important
        });
    if same {
        ConflictType::SameValues
    } else {
        ConflictType::Conflict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Ruleset;
    use blocks_syntax::RuleId;

    #[test]
    fn test_update_conflict_lattice() {
        use ConflictType::*;
        assert_eq!(update_conflict(NoConflict, NoConflict), NoConflict);
        assert_eq!(update_conflict(NoConflict, SameValues), SameValues);
        assert_eq!(update_conflict(SameValues, NoConflict), SameValues);
        assert_eq!(update_conflict(SameValues, SameValues), SameValues);
        assert_eq!(update_conflict(SameValues, Conflict), Conflict);
        assert_eq!(update_conflict(Conflict, NoConflict), Conflict);
    }

    #[test]
    fn test_compare_values() {
        let red = vec![Declaration::new("color", "red")];
        let blue = vec![Declaration::new("color", "blue")];
        assert_eq!(compare_values(&red, &red.clone()), ConflictType::SameValues);
        assert_eq!(compare_values(&red, &blue), ConflictType::Conflict);
        assert_eq!(compare_values(&red, &[]), ConflictType::NoConflict);
        let mut important = red.clone();
        important[0].important = true;
        assert_eq!(compare_values(&red, &important), ConflictType::Conflict);
    }

    #[test]
    fn test_detect_conflicts_shorthand_and_pseudo() {
        let mut graph = BlockGraph::new();
        let a_block = graph.add_block("a", "a");
        let b_block = graph.add_block("b", "b");
        let a = graph.block_mut(a_block).ensure_class("x");
        let b = graph.block_mut(b_block).ensure_class("x");
        let add = |graph: &mut BlockGraph, id: StyleId, pseudo: Option<&str>, prop: &str| {
            let ruleset = Ruleset::new(RuleId(0), None, vec![Declaration::new(prop, "1px")]);
            graph.block_mut(id.block).style_mut(id).unwrap().rulesets.add(pseudo, ruleset);
        };
        add(&mut graph, a, None, "margin");
        add(&mut graph, b, None, "margin-top");
        add(&mut graph, a, Some("before"), "color");
        add(&mut graph, b, None, "color");

        let conflicts = detect_conflicts(&graph, a, b);
        assert_eq!(
            conflicts.properties(None).into_iter().collect::<Vec<_>>(),
            vec!["margin-top".to_string()]
        );
        assert!(conflicts.properties(Some("before")).is_empty());
    }
}

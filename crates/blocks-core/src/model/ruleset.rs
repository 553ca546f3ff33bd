//! Declarations attributed to a block object

use std::collections::{BTreeMap, BTreeSet};

use blocks_syntax::{Declaration, RuleId};

use crate::properties;

/// Declarations one source rule contributes to one object
#[derive(Debug, Clone, PartialEq)]
pub struct Ruleset {
    pub rule: RuleId,
    pub file: Option<String>,
    pub declarations: Vec<Declaration>,
    /// Declared properties plus the longhands of any shorthands
    pub concerns: BTreeSet<String>,
}

impl Ruleset {
    pub fn new(rule: RuleId, file: Option<String>, declarations: Vec<Declaration>) -> Self {
        let concerns = declarations
            .iter()
            .flat_map(|decl| properties::expand(&decl.prop))
            .collect();
        Self { rule, file, declarations, concerns }
    }
}

/// Rulesets of one object, bucketed by pseudo-element (`None` for the
/// element itself)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RulesetContainer {
    buckets: BTreeMap<Option<String>, Vec<Ruleset>>,
}

impl RulesetContainer {
    pub fn add(&mut self, pseudo: Option<&str>, ruleset: Ruleset) {
        self.buckets
            .entry(pseudo.map(str::to_string))
            .or_default()
            .push(ruleset);
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(Vec::is_empty)
    }

    pub fn pseudo_elements(&self) -> impl Iterator<Item = Option<&str>> {
        self.buckets.keys().map(|key| key.as_deref())
    }

    pub fn rulesets(&self, pseudo: Option<&str>) -> &[Ruleset] {
        self.buckets
            .get(&pseudo.map(str::to_string))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every property concerned by the rulesets of a pseudo-element bucket
    pub fn concerns(&self, pseudo: Option<&str>) -> BTreeSet<String> {
        self.rulesets(pseudo)
            .iter()
            .flat_map(|ruleset| ruleset.concerns.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckets_by_pseudo() {
        let mut container = RulesetContainer::default();
        container.add(None, Ruleset::new(RuleId(0), None, vec![Declaration::new("color", "red")]));
        container.add(
            Some("before"),
            Ruleset::new(RuleId(1), None, vec![Declaration::new("content", "''")]),
        );
        assert_eq!(container.pseudo_elements().count(), 2);
        assert!(container.concerns(None).contains("color"));
        assert!(!container.concerns(None).contains("content"));
        assert!(container.concerns(Some("before")).contains("content"));
    }

    #[test]
    fn test_shorthand_concerns() {
        let ruleset = Ruleset::new(RuleId(0), None, vec![Declaration::new("padding", "0")]);
        assert!(ruleset.concerns.contains("padding-top"));
        assert!(ruleset.concerns.contains("padding"));
    }
}

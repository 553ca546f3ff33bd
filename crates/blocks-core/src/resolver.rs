//! Conflict Resolver
//!
//! Two passes over a block's stylesheet. `resolve_inheritance` makes the
//! conflicts between an object and the object it overrides explicit by
//! prepending `resolve-inherited()` declarations. `resolve` expands every
//! `resolve()` and `resolve-inherited()` declaration into rules that pin
//! down which value wins when both objects apply to an element.

use std::collections::{HashMap, HashSet};

use blocks_syntax::{
    AtRule, Declaration, Node, ParsedSelector, Root, Rule, RuleId, SourceLocation, parse_selector_list,
};
use cssparser::{ParseError, Parser, ParserInput, Token};

use crate::algebra::merge_key_selectors;
use crate::conflict::{ConflictType, compare_values, detect_conflicts, update_conflict};
use crate::error::{CssBlocksError, Result};
use crate::model::{BlockGraph, BlockId, BlockPath, StyleId};
use crate::options::Options;
use crate::properties;

/// Parsed selectors per rule. An entry is reused only while the rule's
/// selector text is unchanged.
#[derive(Debug, Default)]
pub struct SelectorCache {
    entries: HashMap<(BlockId, RuleId), (String, Vec<ParsedSelector>)>,
}

impl SelectorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, block: BlockId, rule: &Rule) -> std::result::Result<Vec<ParsedSelector>, blocks_syntax::CssError> {
        if let Some((text, selectors)) = self.entries.get(&(block, rule.id)) {
            if *text == rule.selector {
                return Ok(selectors.clone());
            }
        }
        let selectors = parse_selector_list(&rule.selector)?;
        self.entries
            .insert((block, rule.id), (rule.selector.clone(), selectors.clone()));
        Ok(selectors)
    }

    pub fn invalidate(&mut self, block: BlockId, rule: RuleId) {
        self.entries.remove(&(block, rule));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A `resolve("<ref>")` or `resolve-inherited("<ref>")` value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub inherited: bool,
    pub reference: String,
}

/// Recognize a resolve call. Other values yield `Ok(None)`; a resolve
/// call without a single quoted argument is an error.
pub fn parse_resolve_value(value: &str) -> std::result::Result<Option<Resolution>, String> {
    let mut input = ParserInput::new(value);
    let mut parser = Parser::new(&mut input);
    let inherited = match parser.next() {
        Ok(Token::Function(name)) if name.eq_ignore_ascii_case("resolve") => false,
        Ok(Token::Function(name)) if name.eq_ignore_ascii_case("resolve-inherited") => true,
        _ => return Ok(None),
    };
    let reference: std::result::Result<String, ParseError<'_, ()>> =
        parser.parse_nested_block(|p| Ok(p.expect_string()?.to_string()));
    match reference {
        Ok(reference) if parser.is_exhausted() => Ok(Some(Resolution { inherited, reference })),
        _ => Err(format!("Expected a single quoted block object reference in `{}`", value)),
    }
}

pub(crate) fn is_resolution(decl: &Declaration) -> bool {
    matches!(parse_resolve_value(&decl.value), Ok(Some(_)))
}

/// A rule of another block whose key selector targets the resolved object
struct TargetMatch {
    /// Rewritten to output classes
    selector: ParsedSelector,
    values: Vec<Declaration>,
    /// Empty at-rules enclosing the target rule, outermost first
    conditions: Vec<AtRule>,
}

impl TargetMatch {
    /// Put an emitted rule under the same conditions as the target rule
    fn wrap(&self, rule: Rule) -> Node {
        self.conditions
            .iter()
            .rev()
            .fold(Node::Rule(rule), |node, condition| Node::AtRule(condition.wrapping(vec![node])))
    }
}

pub struct ConflictResolver<'a> {
    graph: &'a BlockGraph,
    options: &'a Options,
    block: BlockId,
    filename: Option<String>,
    cache: &'a mut SelectorCache,
}

impl<'a> ConflictResolver<'a> {
    pub fn new(
        graph: &'a BlockGraph,
        options: &'a Options,
        block: BlockId,
        filename: Option<String>,
        cache: &'a mut SelectorCache,
    ) -> Self {
        Self { graph, options, block, filename, cache }
    }

    fn error_at(&self, message: impl Into<String>, source: SourceLocation) -> CssBlocksError {
        CssBlocksError::syntax_at(message, self.filename.as_deref(), source)
    }

    fn selectors(&mut self, rule: &Rule) -> Result<Vec<ParsedSelector>> {
        self.cache
            .get(self.block, rule)
            .map_err(|err| self.error_at(err.to_string(), rule.source))
    }

    /// Prepend `prop: resolve-inherited("<base>")` for every property a
    /// rule sets that its key object's base also sets
    pub fn resolve_inheritance(&mut self, root: &mut Root) -> Result<()> {
        root.try_walk_rules_mut(|rule| self.inject_inherited(rule))
    }

    fn inject_inherited(&mut self, rule: &mut Rule) -> Result<()> {
        let graph = self.graph;
        let selectors = self.selectors(rule)?;
        let mut handled: HashMap<Option<String>, HashSet<String>> = HashMap::new();
        let mut injected: Vec<Declaration> = Vec::new();
        // Properties the author already resolves are left alone
        let explicit: HashSet<String> = rule
            .decls()
            .filter(|decl| is_resolution(decl))
            .map(|decl| decl.prop.clone())
            .collect();

        for selector in &selectors {
            let key = selector.key();
            let Ok((path, _)) = BlockPath::from_compound(key) else {
                continue;
            };
            if path.block.is_some() {
                continue;
            }
            let Some(style) = graph.block(self.block).find_local(&path) else {
                continue;
            };
            let Some(base) = graph.base_of(style) else {
                continue;
            };

            let pseudo = key.pseudo_element_name();
            let conflicts = detect_conflicts(graph, style, base).properties(pseudo);
            if conflicts.is_empty() {
                continue;
            }
            let reference = format!("{}{}", self.reference_name(base.block), graph.as_source(base));
            let value = format!("resolve-inherited(\"{}\")", reference);
            let done = handled.entry(pseudo.map(str::to_string)).or_default();

            for decl in rule.decls() {
                if is_resolution(decl) || !conflicts.iter().any(|p| properties::overlap(p, &decl.prop)) {
                    continue;
                }
                let already = injected.iter().any(|d| d.prop == decl.prop && d.value == value);
                let resolved = explicit.iter().any(|p| properties::overlap(p, &decl.prop));
                if !resolved && done.insert(decl.prop.clone()) && !already {
                    injected.push(Declaration::new(decl.prop.clone(), value.clone()).at(decl.source));
                }
            }
        }

        if !injected.is_empty() {
            tracing::debug!(
                "Injected {} inherited resolution(s) into `{}`",
                injected.len(),
                rule.selector
            );
        }
        for decl in injected.into_iter().rev() {
            rule.prepend(Node::Decl(decl));
        }
        Ok(())
    }

    /// How the compiled block refers to another block
    fn reference_name(&self, block: BlockId) -> String {
        let own = self.graph.block(self.block);
        own.reference_name_for(block)
            .map(str::to_string)
            .unwrap_or_else(|| self.graph.block(block).name().to_string())
    }

    /// Expand and remove every resolve declaration
    pub fn resolve(&mut self, root: &mut Root) -> Result<()> {
        let mut nodes = std::mem::take(&mut root.nodes);
        let result = self.resolve_container(root, &mut nodes);
        root.nodes = nodes;
        result
    }

    fn resolve_container(&mut self, root: &mut Root, nodes: &mut Vec<Node>) -> Result<()> {
        let mut index = 0;
        while index < nodes.len() {
            let emitted = match &mut nodes[index] {
                Node::Rule(rule) => self.resolve_rule(root, rule)?,
                Node::AtRule(at_rule) if !at_rule.is_keyframes() => {
                    if let Some(children) = &mut at_rule.nodes {
                        self.resolve_container(root, children)?;
                    }
                    Vec::new()
                }
                _ => Vec::new(),
            };
            let count = emitted.len();
            // Each new rule goes directly after the rule that produced it
            for node in emitted {
                nodes.insert(index + 1, node);
            }
            index += 1 + count;
        }
        Ok(())
    }

    fn resolve_rule(&mut self, root: &mut Root, rule: &mut Rule) -> Result<Vec<Node>> {
        let mut resolutions = Vec::new();
        for (index, node) in rule.nodes.iter().enumerate() {
            if let Node::Decl(decl) = node {
                match parse_resolve_value(&decl.value) {
                    Ok(Some(resolution)) => resolutions.push((index, decl.clone(), resolution)),
                    Ok(None) => {}
                    Err(message) => return Err(self.error_at(message, decl.source)),
                }
            }
        }
        if resolutions.is_empty() {
            return Ok(Vec::new());
        }

        let local_selectors = self.selectors(rule)?;
        let mut emitted = Vec::new();
        for (index, decl, resolution) in &resolutions {
            let rules = self.resolve_declaration(root, rule, &local_selectors, *index, decl, resolution)?;
            emitted.extend(rules);
        }
        rule.nodes
            .retain(|node| !matches!(node, Node::Decl(decl) if is_resolution(decl)));
        Ok(emitted)
    }

    fn resolve_declaration(
        &mut self,
        root: &mut Root,
        rule: &Rule,
        local_selectors: &[ParsedSelector],
        index: usize,
        decl: &Declaration,
        resolution: &Resolution,
    ) -> Result<Vec<Node>> {
        let graph = self.graph;
        let prop = decl.prop.as_str();

        let mut before = false;
        let mut after = false;
        let mut local_values = Vec::new();
        for (position, node) in rule.nodes.iter().enumerate() {
            let Node::Decl(other) = node else { continue };
            if other.prop != prop || is_resolution(other) {
                continue;
            }
            if position < index {
                before = true;
            } else {
                after = true;
            }
            local_values.push(other.clone());
        }
        if before && after {
            return Err(self.error_at(
                format!(
                    "Cannot resolve {prop}: resolution must happen either before or after all other values for {prop}."
                ),
                decl.source,
            ));
        }
        if !before && !after {
            return Err(self.error_at(
                format!("Cannot resolve {prop} without a concrete value."),
                decl.source,
            ));
        }
        let is_override = before;

        let path = BlockPath::parse(&resolution.reference).map_err(|message| {
            CssBlocksError::malformed_path(message).at(crate::error::ErrorLocation::new(
                self.filename.as_deref(),
                decl.source,
            ))
        })?;
        let other = graph.lookup_path(self.block, &path).ok_or_else(|| {
            self.error_at(format!("Cannot find `{}`", resolution.reference), decl.source)
        })?;
        if other.block == self.block {
            return Err(self.error_at("Cannot resolve conflicts with your own block.", decl.source));
        }
        if !resolution.inherited && graph.is_ancestor_block(other.block, self.block) {
            return Err(self.error_at(
                "Cannot resolve conflicts with ancestors of your own block.",
                decl.source,
            ));
        }

        let mut found = ConflictType::NoConflict;
        let mut rules = Vec::new();
        let mut current = Some(other);
        while let Some(target) = current {
            let matches = self.query_key_selectors(target, prop)?;
            let mut level = ConflictType::NoConflict;
            for target_match in &matches {
                let mut merged: Vec<String> = Vec::new();
                for local in local_selectors {
                    if local.key().pseudo_element_name() != target_match.selector.key().pseudo_element_name() {
                        continue;
                    }
                    let conflict = compare_values(&local_values, &target_match.values);
                    level = update_conflict(level, conflict);
                    if conflict != ConflictType::Conflict {
                        continue;
                    }
                    let selectors = merge_key_selectors(local, &target_match.selector).map_err(|err| {
                        err.at(crate::error::ErrorLocation::new(self.filename.as_deref(), decl.source))
                    })?;
                    for selector in selectors {
                        let text = selector.to_string();
                        if !merged.contains(&text) {
                            merged.push(text);
                        }
                    }
                }
                if merged.is_empty() {
                    continue;
                }
                let values = if is_override { &target_match.values } else { &local_values };
                let mut new_rule = root.new_rule(merged.join(",\n"), rule.source);
                for value in values {
                    new_rule.append(Node::Decl(value.clone().at(decl.source)));
                }
                rules.push(target_match.wrap(new_rule));
            }
            found = update_conflict(found, level);
            if level == ConflictType::Conflict {
                break;
            }
            current = graph.base_of(target);
        }

        if found == ConflictType::NoConflict && !resolution.inherited {
            return Err(self.error_at(
                format!(
                    "There are no conflicting values for {} found in any selectors targeting {}.",
                    prop, resolution.reference
                ),
                decl.source,
            ));
        }
        tracing::debug!(
            "Resolved {} against {} into {} rule(s)",
            prop,
            resolution.reference,
            rules.len()
        );
        Ok(rules)
    }

    /// Rules of the target's block, at any depth, whose key selector is
    /// exactly the target object, with their values for `prop`
    fn query_key_selectors(&mut self, target: StyleId, prop: &str) -> Result<Vec<TargetMatch>> {
        let graph = self.graph;
        let block = graph.block(target.block);
        let Some(stylesheet) = block.stylesheet() else {
            return Ok(Vec::new());
        };

        let mut matches = Vec::new();
        for (conditions, rule) in stylesheet.rules_with_conditions() {
            let values: Vec<Declaration> = rule
                .decls()
                .filter(|decl| properties::overlap(&decl.prop, prop) && !is_resolution(decl))
                .cloned()
                .collect();
            if values.is_empty() {
                continue;
            }
            let selectors = self.cache.get(target.block, rule).map_err(|err| {
                CssBlocksError::syntax_at(err.to_string(), Some(block.identifier()), rule.source)
            })?;
            for selector in &selectors {
                let Ok((path, _)) = BlockPath::from_compound(selector.key()) else {
                    continue;
                };
                if path.block.is_some() || block.find_local(&path) != Some(target) {
                    continue;
                }
                let rewritten = graph
                    .rewrite_selector(target.block, selector, self.options)
                    .map_err(|message| CssBlocksError::syntax_at(message, Some(block.identifier()), rule.source))?;
                matches.push(TargetMatch {
                    selector: rewritten,
                    values: values.clone(),
                    conditions: conditions
                        .iter()
                        .map(|at_rule| AtRule::new(at_rule.name.clone(), at_rule.params.clone()))
                        .collect(),
                });
            }
        }
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resolve_value() {
        assert_eq!(
            parse_resolve_value("resolve(\"other.foo\")").unwrap(),
            Some(Resolution { inherited: false, reference: "other.foo".into() })
        );
        assert_eq!(
            parse_resolve_value("resolve-inherited('base:scope')").unwrap(),
            Some(Resolution { inherited: true, reference: "base:scope".into() })
        );
        assert_eq!(parse_resolve_value("red").unwrap(), None);
        assert_eq!(parse_resolve_value("rgb(0, 0, 0)").unwrap(), None);
        assert!(parse_resolve_value("resolve(other.foo)").is_err());
        assert!(parse_resolve_value("resolve(\"a\") red").is_err());
    }

    #[test]
    fn test_selector_cache_tracks_text() {
        let mut root = Root::new();
        let mut rule = root.new_rule(".a", SourceLocation::default());
        let mut cache = SelectorCache::new();
        let block = BlockId(0);
        assert_eq!(cache.get(block, &rule).unwrap()[0].to_string(), ".a");
        rule.selector = ".b, .c".into();
        assert_eq!(cache.get(block, &rule).unwrap().len(), 2);
        assert_eq!(cache.len(), 1);
        cache.invalidate(block, rule.id);
        assert!(cache.is_empty());
    }
}

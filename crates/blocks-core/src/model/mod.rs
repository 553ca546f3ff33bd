//! Style Node Model
//!
//! Blocks live in an arena owned by [`BlockGraph`]. Every edge between
//! blocks (references, inheritance, implementations) and between objects
//! (state owners, inherited bases) is stored as an id, so cycles can be
//! detected and the graph walked without shared ownership.

mod block;
mod path;
mod ruleset;
mod style;

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet};

use blocks_syntax::{CompoundSelector, ParsedSelector, SelectorNode};

pub use block::{Block, DEFAULT_EXPORT};
pub use path::{BlockPath, STATE_NAMESPACE, StatePath};
pub use ruleset::{Ruleset, RulesetContainer};
pub use style::{StyleKind, StyleNode};

use crate::options::{Options, OutputMode};

/// Index of a block in its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

/// Address of a block object: owning block plus index within it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StyleId {
    pub block: BlockId,
    pub index: u32,
}

/// Arena of every block loaded in one session
#[derive(Debug, Default)]
pub struct BlockGraph {
    blocks: Vec<Block>,
    by_identifier: HashMap<String, BlockId>,
    /// `resolve_styles` memo, cleared on mutable access
    resolved: RefCell<HashMap<StyleId, Vec<StyleId>>>,
}

impl BlockGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty block for a file identifier
    pub fn add_block(&mut self, identifier: &str, default_name: &str) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(Block::new(id, identifier, default_name));
        self.by_identifier.insert(identifier.to_string(), id);
        self.resolved.get_mut().clear();
        id
    }

    /// Drop the identifier mapping of a block that failed to load
    pub(crate) fn forget(&mut self, identifier: &str) {
        self.by_identifier.remove(identifier);
        self.resolved.get_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0 as usize]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut Block {
        self.resolved.get_mut().clear();
        &mut self.blocks[id.0 as usize]
    }

    pub fn block_by_identifier(&self, identifier: &str) -> Option<BlockId> {
        self.by_identifier.get(identifier).copied()
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    pub fn style(&self, id: StyleId) -> &StyleNode {
        &self.block(id.block).styles()[id.index as usize]
    }

    /// Path of an object relative to its own block
    pub fn path_of(&self, id: StyleId) -> BlockPath {
        let node = self.style(id);
        match &node.kind {
            StyleKind::Root => BlockPath::default(),
            StyleKind::Class => BlockPath { class: Some(node.name.clone()), ..BlockPath::default() },
            StyleKind::State { owner, group, .. } => BlockPath {
                state: Some(StatePath { group: group.clone(), name: node.name.clone() }),
                ..self.path_of(*owner)
            },
        }
    }

    /// Source form: `:scope`, `.foo`, `[state|x]`, `.foo[state|g=v]`
    pub fn as_source(&self, id: StyleId) -> String {
        self.path_of(id).to_string()
    }

    /// Strict ancestors of a block, nearest first
    pub fn base_chain(&self, block: BlockId) -> Vec<BlockId> {
        let mut chain = Vec::new();
        let mut current = self.block(block).base();
        while let Some(base) = current {
            if base == block || chain.contains(&base) {
                break;
            }
            chain.push(base);
            current = self.block(base).base();
        }
        chain
    }

    /// The object this one overrides in the nearest ancestor that has it
    pub fn base_of(&self, id: StyleId) -> Option<StyleId> {
        let path = self.path_of(id);
        self.base_chain(id.block)
            .into_iter()
            .find_map(|base| self.block(base).find_local(&path))
    }

    /// The object plus everything it inherits from, self first
    pub fn resolve_styles(&self, id: StyleId) -> Vec<StyleId> {
        if let Some(cached) = self.resolved.borrow().get(&id) {
            return cached.clone();
        }
        let mut styles = vec![id];
        let mut current = self.base_of(id);
        while let Some(base) = current {
            if styles.contains(&base) {
                break;
            }
            styles.push(base);
            current = self.base_of(base);
        }
        for implied in self.implied_styles(id) {
            if !styles.contains(&implied) {
                styles.push(implied);
            }
        }
        self.resolved.borrow_mut().insert(id, styles.clone());
        styles
    }

    /// Styles composed into an object besides inheritance; none are
    /// declared by the current syntax
    fn implied_styles(&self, _id: StyleId) -> Vec<StyleId> {
        Vec::new()
    }

    /// True when `ancestor` is on `block`'s inheritance chain
    pub fn is_ancestor_block(&self, ancestor: BlockId, block: BlockId) -> bool {
        self.base_chain(block).contains(&ancestor)
    }

    /// True when `ancestor` is an object `style` inherits from
    pub fn is_ancestor(&self, ancestor: StyleId, style: StyleId) -> bool {
        self.resolve_styles(style).iter().skip(1).any(|id| *id == ancestor)
    }

    /// Find a local path in a block or, failing that, its ancestors
    fn find_inherited(&self, block: BlockId, path: &BlockPath) -> Option<StyleId> {
        self.block(block).find_local(path).or_else(|| {
            self.base_chain(block)
                .into_iter()
                .find_map(|base| self.block(base).find_local(path))
        })
    }

    /// Resolve a reference string such as `other.foo[state|size=large]`
    /// from the point of view of `from`
    pub fn lookup(&self, from: BlockId, reference: &str) -> Option<StyleId> {
        let path = BlockPath::parse(reference).ok()?;
        self.lookup_path(from, &path)
    }

    pub fn lookup_path(&self, from: BlockId, path: &BlockPath) -> Option<StyleId> {
        let Some(name) = &path.block else {
            return self.find_inherited(from, path);
        };
        let local = path.local();
        let block = self.block(from);
        if let Some(target) = block.get_reference(name) {
            return self.lookup_path(target, &local);
        }
        if block.name() == name {
            return self.find_inherited(from, &local);
        }
        self.base_chain(from)
            .into_iter()
            .find(|ancestor| self.block(*ancestor).name() == name)
            .and_then(|ancestor| self.find_inherited(ancestor, &local))
    }

    /// Local object of a block by source form, ignoring ancestors
    pub fn find(&self, block: BlockId, source: &str) -> Option<StyleId> {
        let path = BlockPath::parse(source).ok()?;
        if path.block.is_some() {
            return None;
        }
        self.block(block).find_local(&path)
    }

    /// Output class of one object
    pub fn css_class(&self, id: StyleId, options: &Options) -> String {
        match options.output_mode {
            OutputMode::Bem => {
                let node = self.style(id);
                let block_name = self.block(id.block).name();
                match &node.kind {
                    StyleKind::Root => block_name.to_string(),
                    StyleKind::Class => format!("{}__{}", block_name, node.name),
                    StyleKind::State { owner, group, .. } => {
                        let owner_class = self.css_class(*owner, options);
                        match group {
                            Some(group) => format!("{}--{}-{}", owner_class, group, node.name),
                            None => format!("{}--{}", owner_class, node.name),
                        }
                    }
                }
            }
        }
    }

    /// Every class an element using this object must carry
    pub fn css_classes(&self, id: StyleId, options: &Options) -> Vec<String> {
        self.resolve_styles(id)
            .into_iter()
            .map(|style| self.css_class(style, options))
            .collect()
    }

    /// Every block reachable through references, inheritance and
    /// implementations, excluding the block itself
    pub fn transitive_block_dependencies(&self, block: BlockId) -> BTreeSet<BlockId> {
        let mut seen = HashSet::from([block]);
        let mut stack = vec![block];
        let mut out = BTreeSet::new();
        while let Some(current) = stack.pop() {
            let current = self.block(current);
            let edges = current
                .block_references()
                .values()
                .copied()
                .chain(current.base())
                .chain(current.implements().iter().copied());
            for next in edges {
                if seen.insert(next) {
                    out.insert(next);
                    stack.push(next);
                }
            }
        }
        out
    }

    /// Human readable listing of a block's objects and output classes
    pub fn debug(&self, block: BlockId, options: &Options) -> Vec<String> {
        let block_ref = self.block(block);
        let mut lines = vec![format!("Source: {}", block_ref.identifier())];
        let owners = block_ref
            .styles()
            .iter()
            .filter(|node| !node.is_state());
        for owner in owners {
            let indent = if owner.is_root() { "" } else { " " };
            lines.push(format!(
                "{}{} => {}",
                indent,
                self.as_source(owner.id),
                self.css_classes(owner.id, options).join(" ")
            ));
            for state in &owner.states {
                lines.push(format!(
                    "{} {} => {}",
                    indent,
                    self.as_source(*state),
                    self.css_classes(*state, options).join(" ")
                ));
            }
        }
        lines
    }

    /// Rewrite every compound of a block-syntax selector to output classes
    pub fn rewrite_selector(
        &self,
        block: BlockId,
        selector: &ParsedSelector,
        options: &Options,
    ) -> Result<ParsedSelector, String> {
        let mut rewritten = selector.clone();
        for compound in rewritten.compounds_mut() {
            let (path, rest) = BlockPath::from_compound(compound)?;
            let style = self
                .lookup_path(block, &path)
                .ok_or_else(|| format!("Cannot find `{}` in block `{}`", path, self.block(block).name()))?;
            let mut nodes = vec![SelectorNode::Class(self.css_class(style, options))];
            nodes.extend(rest);
            *compound = CompoundSelector::new(nodes);
        }
        Ok(rewritten)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with_inheritance() -> (BlockGraph, BlockId, BlockId) {
        let mut graph = BlockGraph::new();
        let base = graph.add_block("base.css", "base");
        let child = graph.add_block("child.css", "child");
        {
            let block = graph.block_mut(base);
            let foo = block.ensure_class("foo");
            block.ensure_state(foo, None, "active").unwrap();
        }
        {
            let block = graph.block_mut(child);
            block.add_reference("base", base).unwrap();
            block.set_base("base", base);
            block.ensure_class("foo");
            block.ensure_class("bar");
        }
        (graph, base, child)
    }

    #[test]
    fn test_lookup_round_trip() {
        let (graph, _, child) = graph_with_inheritance();
        let block = graph.block(child);
        for node in block.styles() {
            let source = graph.as_source(node.id);
            assert_eq!(graph.lookup(child, &source), Some(node.id), "{source}");
            assert_eq!(graph.find(child, &source), Some(node.id));
        }
    }

    #[test]
    fn test_base_of_and_resolve_styles() {
        let (graph, base, child) = graph_with_inheritance();
        let child_foo = graph.block(child).get_class("foo").unwrap();
        let base_foo = graph.block(base).get_class("foo").unwrap();
        assert_eq!(graph.base_of(child_foo), Some(base_foo));
        assert_eq!(graph.resolve_styles(child_foo), vec![child_foo, base_foo]);
        assert!(graph.is_ancestor(base_foo, child_foo));
        let bar = graph.block(child).get_class("bar").unwrap();
        assert_eq!(graph.resolve_styles(bar), vec![bar]);
    }

    #[test]
    fn test_lookup_inherited_and_referenced() {
        let (graph, base, child) = graph_with_inheritance();
        let active = graph.lookup(base, ".foo[state|active]").unwrap();
        assert_eq!(graph.lookup(child, ".foo[state|active]"), Some(active));
        assert_eq!(graph.lookup(child, "base.foo[state|active]"), Some(active));
        assert_eq!(graph.lookup(child, "child.bar"), graph.block(child).get_class("bar"));
        assert_eq!(graph.lookup(child, "nope.foo"), None);
        assert_eq!(graph.lookup(child, ".missing"), None);
    }

    #[test]
    fn test_ancestry_is_strict() {
        let (graph, base, child) = graph_with_inheritance();
        assert!(graph.is_ancestor_block(base, child));
        assert!(!graph.is_ancestor_block(child, base));
        assert!(!graph.is_ancestor_block(child, child));
    }

    #[test]
    fn test_bem_classes() {
        let (graph, base, child) = graph_with_inheritance();
        let options = Options::default();
        let active = graph.lookup(base, ".foo[state|active]").unwrap();
        assert_eq!(graph.css_class(active, &options), "base__foo--active");
        assert_eq!(graph.css_class(graph.block(child).root(), &options), "child");
        let child_foo = graph.block(child).get_class("foo").unwrap();
        assert_eq!(graph.css_classes(child_foo, &options), vec!["child__foo", "base__foo"]);
    }

    #[test]
    fn test_memo_cleared_on_mutation() {
        let (mut graph, base, child) = graph_with_inheritance();
        let bar = graph.block(child).get_class("bar").unwrap();
        assert_eq!(graph.resolve_styles(bar).len(), 1);
        let base_bar = graph.block_mut(base).ensure_class("bar");
        assert_eq!(graph.resolve_styles(bar), vec![bar, base_bar]);
    }

    #[test]
    fn test_transitive_dependencies_with_cycle() {
        let mut graph = BlockGraph::new();
        let a = graph.add_block("a", "a");
        let b = graph.add_block("b", "b");
        let c = graph.add_block("c", "c");
        graph.block_mut(a).add_reference("b", b).unwrap();
        graph.block_mut(b).add_reference("c", c).unwrap();
        graph.block_mut(c).add_reference("a", a).unwrap();
        let deps: Vec<_> = graph.transitive_block_dependencies(a).into_iter().collect();
        assert_eq!(deps, vec![b, c]);
    }

    #[test]
    fn test_state_class_names() {
        let mut graph = BlockGraph::new();
        let id = graph.add_block("x", "nav");
        let block = graph.block_mut(id);
        let root = block.root();
        let theme = block.ensure_state(root, Some("theme"), "dark").unwrap();
        let options = Options::default();
        assert_eq!(graph.css_class(theme, &options), "nav--theme-dark");
        assert_eq!(graph.as_source(theme), "[state|theme=dark]");
    }
}

//! Block: one stylesheet's object model

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

use blocks_syntax::Root;

use super::path::{BlockPath, StatePath};
use super::style::{StyleKind, StyleNode};
use super::{BlockId, StyleId};
use crate::error::{CssBlocksError, Result};

/// Export name every block has for itself
pub const DEFAULT_EXPORT: &str = "default";

#[derive(Debug)]
pub struct Block {
    id: BlockId,
    identifier: String,
    name: String,
    name_is_set: bool,
    guid: String,
    /// Index 0 is the root
    styles: Vec<StyleNode>,
    classes: HashMap<String, StyleId>,
    block_references: BTreeMap<String, BlockId>,
    block_exports: BTreeMap<String, BlockId>,
    base: Option<BlockId>,
    base_name: Option<String>,
    implements: Vec<BlockId>,
    dependencies: BTreeSet<PathBuf>,
    stylesheet: Option<Root>,
    errors: Vec<CssBlocksError>,
}

impl Block {
    pub(crate) fn new(id: BlockId, identifier: impl Into<String>, default_name: impl Into<String>) -> Self {
        let root = StyleNode::new(StyleId { block: id, index: 0 }, ":scope", StyleKind::Root);
        let mut block_exports = BTreeMap::new();
        block_exports.insert(DEFAULT_EXPORT.to_string(), id);
        Self {
            id,
            identifier: identifier.into(),
            name: default_name.into(),
            name_is_set: false,
            guid: String::new(),
            styles: vec![root],
            classes: HashMap::new(),
            block_references: BTreeMap::new(),
            block_exports,
            base: None,
            base_name: None,
            implements: Vec::new(),
            dependencies: BTreeSet::new(),
            stylesheet: None,
            errors: Vec::new(),
        }
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Override the default name. Allowed once per block.
    pub fn set_name(&mut self, name: impl Into<String>) -> Result<()> {
        if self.name_is_set {
            return Err(CssBlocksError::State {
                message: format!("Cannot set block name more than once (block `{}`)", self.name),
            });
        }
        self.name = name.into();
        self.name_is_set = true;
        Ok(())
    }

    /// Session-unique name chosen by the name registry
    pub(crate) fn assign_registered_name(&mut self, name: String) {
        self.name = name;
    }

    pub fn guid(&self) -> &str {
        &self.guid
    }

    pub(crate) fn set_guid(&mut self, guid: String) {
        self.guid = guid;
    }

    pub fn root(&self) -> StyleId {
        StyleId { block: self.id, index: 0 }
    }

    pub fn style(&self, id: StyleId) -> Option<&StyleNode> {
        if id.block != self.id {
            return None;
        }
        self.styles.get(id.index as usize)
    }

    pub(crate) fn style_mut(&mut self, id: StyleId) -> Option<&mut StyleNode> {
        if id.block != self.id {
            return None;
        }
        self.styles.get_mut(id.index as usize)
    }

    /// All objects in creation order, root first
    pub fn styles(&self) -> &[StyleNode] {
        &self.styles
    }

    fn push_style(&mut self, name: &str, kind: StyleKind) -> StyleId {
        let id = StyleId { block: self.id, index: self.styles.len() as u32 };
        self.styles.push(StyleNode::new(id, name, kind));
        id
    }

    /// Get or create a class
    pub fn ensure_class(&mut self, name: &str) -> StyleId {
        if let Some(id) = self.classes.get(name) {
            return *id;
        }
        let id = self.push_style(name, StyleKind::Class);
        self.classes.insert(name.to_string(), id);
        id
    }

    pub fn get_class(&self, name: &str) -> Option<StyleId> {
        self.classes.get(name).copied()
    }

    /// Get or create a state on a root or class
    pub fn ensure_state(&mut self, owner: StyleId, group: Option<&str>, name: &str) -> Result<StyleId> {
        match self.style(owner).map(|node| node.is_state()) {
            None => {
                return Err(CssBlocksError::State {
                    message: format!("State owner does not belong to block `{}`", self.name),
                });
            }
            Some(true) => {
                return Err(CssBlocksError::State {
                    message: format!("States cannot own states (state `{}`)", name),
                });
            }
            Some(false) => {}
        }
        if let Some(existing) = self.get_state(owner, group, name) {
            return Ok(existing);
        }
        let id = self.push_style(
            name,
            StyleKind::State { owner, group: group.map(str::to_string), global: false },
        );
        if let Some(node) = self.style_mut(owner) {
            node.states.push(id);
        }
        Ok(id)
    }

    pub fn get_state(&self, owner: StyleId, group: Option<&str>, name: &str) -> Option<StyleId> {
        let owner = self.style(owner)?;
        owner.states.iter().copied().find(|id| {
            self.style(*id)
                .is_some_and(|state| state.name == name && state.group() == group)
        })
    }

    /// Find an object of this block (not its ancestors) by path
    pub fn find_local(&self, path: &BlockPath) -> Option<StyleId> {
        let owner = match &path.class {
            Some(class) => self.get_class(class)?,
            None => self.root(),
        };
        match &path.state {
            Some(StatePath { group, name }) => self.get_state(owner, group.as_deref(), name),
            None => Some(owner),
        }
    }

    pub(crate) fn mark_global(&mut self, state: StyleId) -> Result<()> {
        match self.style_mut(state).map(|node| &mut node.kind) {
            Some(StyleKind::State { global, .. }) => {
                *global = true;
                Ok(())
            }
            _ => Err(CssBlocksError::syntax("block-global can only be set on states")),
        }
    }

    pub fn block_references(&self) -> &BTreeMap<String, BlockId> {
        &self.block_references
    }

    pub fn get_reference(&self, name: &str) -> Option<BlockId> {
        self.block_references.get(name).copied()
    }

    /// Local name this block uses for another block, if any
    pub fn reference_name_for(&self, block: BlockId) -> Option<&str> {
        self.block_references
            .iter()
            .find(|(_, id)| **id == block)
            .map(|(name, _)| name.as_str())
    }

    pub fn add_reference(&mut self, name: &str, block: BlockId) -> Result<()> {
        if let Some(existing) = self.block_references.get(name) {
            if *existing != block {
                return Err(CssBlocksError::syntax(format!(
                    "Block reference `{}` is already declared",
                    name
                )));
            }
        }
        self.block_references.insert(name.to_string(), block);
        Ok(())
    }

    pub fn block_exports(&self) -> &BTreeMap<String, BlockId> {
        &self.block_exports
    }

    pub fn get_export(&self, name: &str) -> Option<BlockId> {
        self.block_exports.get(name).copied()
    }

    pub fn add_export(&mut self, name: &str, block: BlockId) -> Result<()> {
        if name == DEFAULT_EXPORT {
            return Err(CssBlocksError::syntax(format!(
                "Cannot override the `{}` export of a block",
                DEFAULT_EXPORT
            )));
        }
        if self.block_exports.contains_key(name) {
            return Err(CssBlocksError::syntax(format!("Cannot export `{}` more than once", name)));
        }
        self.block_exports.insert(name.to_string(), block);
        Ok(())
    }

    pub fn base(&self) -> Option<BlockId> {
        self.base
    }

    pub fn base_name(&self) -> Option<&str> {
        self.base_name.as_deref()
    }

    pub(crate) fn set_base(&mut self, name: &str, base: BlockId) {
        self.base_name = Some(name.to_string());
        self.base = Some(base);
    }

    pub fn implements(&self) -> &[BlockId] {
        &self.implements
    }

    pub(crate) fn add_implements(&mut self, block: BlockId) {
        if !self.implements.contains(&block) {
            self.implements.push(block);
        }
    }

    pub fn dependencies(&self) -> &BTreeSet<PathBuf> {
        &self.dependencies
    }

    pub fn add_dependency(&mut self, path: PathBuf) {
        self.dependencies.insert(path);
    }

    pub fn stylesheet(&self) -> Option<&Root> {
        self.stylesheet.as_ref()
    }

    pub(crate) fn set_stylesheet(&mut self, root: Root) {
        self.stylesheet = Some(root);
    }

    /// Structural errors collected in fault tolerant mode
    pub fn errors(&self) -> &[CssBlocksError] {
        &self.errors
    }

    pub(crate) fn add_error(&mut self, error: CssBlocksError) {
        self.errors.push(error);
    }
}

/// Blocks are the same block when they come from the same identifier
impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
    }
}

impl Eq for Block {}

#[cfg(test)]
mod tests {
    use super::*;

    fn block() -> Block {
        Block::new(BlockId(0), "/tmp/test.block.css", "test")
    }

    #[test]
    fn test_ensure_class_is_idempotent() {
        let mut block = block();
        let a = block.ensure_class("foo");
        let b = block.ensure_class("foo");
        assert_eq!(a, b);
        assert_ne!(a, block.root());
    }

    #[test]
    fn test_ensure_state_is_idempotent() {
        let mut block = block();
        let class = block.ensure_class("foo");
        let a = block.ensure_state(class, Some("size"), "large").unwrap();
        let b = block.ensure_state(class, Some("size"), "large").unwrap();
        let c = block.ensure_state(class, Some("size"), "small").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(block.ensure_state(a, None, "nested").is_err());
    }

    #[test]
    fn test_set_name_once() {
        let mut block = block();
        assert_eq!(block.name(), "test");
        block.set_name("renamed").unwrap();
        assert_eq!(block.name(), "renamed");
        assert!(matches!(block.set_name("again"), Err(CssBlocksError::State { .. })));
    }

    #[test]
    fn test_default_export() {
        let mut block = block();
        assert_eq!(block.get_export(DEFAULT_EXPORT), Some(BlockId(0)));
        assert!(block.add_export(DEFAULT_EXPORT, BlockId(1)).is_err());
        block.add_export("other", BlockId(1)).unwrap();
        assert!(block.add_export("other", BlockId(1)).is_err());
    }

    #[test]
    fn test_find_local() {
        let mut block = block();
        let class = block.ensure_class("foo");
        let state = block.ensure_state(class, None, "active").unwrap();
        assert_eq!(block.find_local(&BlockPath::parse(".foo[state|active]").unwrap()), Some(state));
        assert_eq!(block.find_local(&BlockPath::parse(":scope").unwrap()), Some(block.root()));
        assert_eq!(block.find_local(&BlockPath::parse(".bar").unwrap()), None);
    }

    #[test]
    fn test_equality_by_identifier() {
        let a = Block::new(BlockId(0), "same", "a");
        let b = Block::new(BlockId(1), "same", "b");
        assert_eq!(a, b);
    }
}

//! Style nodes: the block root, classes and states

use super::ruleset::RulesetContainer;
use super::{BlockId, StyleId};

/// What kind of block object a node is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleKind {
    /// `:scope`
    Root,
    /// `.name`
    Class,
    /// `[state|name]` or `[state|group=name]` on a root or class
    State {
        owner: StyleId,
        group: Option<String>,
        /// Usable in selector context by other blocks
        global: bool,
    },
}

/// One addressable style unit of a block
#[derive(Debug, Clone)]
pub struct StyleNode {
    pub id: StyleId,
    /// Class name, state name, or `:scope`
    pub name: String,
    pub kind: StyleKind,
    pub rulesets: RulesetContainer,
    /// States owned by a root or class
    pub states: Vec<StyleId>,
}

impl StyleNode {
    pub(crate) fn new(id: StyleId, name: impl Into<String>, kind: StyleKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            rulesets: RulesetContainer::default(),
            states: Vec::new(),
        }
    }

    pub fn block(&self) -> BlockId {
        self.id.block
    }

    pub fn is_root(&self) -> bool {
        matches!(self.kind, StyleKind::Root)
    }

    pub fn is_state(&self) -> bool {
        matches!(self.kind, StyleKind::State { .. })
    }

    pub fn owner(&self) -> Option<StyleId> {
        match &self.kind {
            StyleKind::State { owner, .. } => Some(*owner),
            _ => None,
        }
    }

    pub fn group(&self) -> Option<&str> {
        match &self.kind {
            StyleKind::State { group, .. } => group.as_deref(),
            _ => None,
        }
    }

    pub fn is_global(&self) -> bool {
        matches!(self.kind, StyleKind::State { global: true, .. })
    }
}

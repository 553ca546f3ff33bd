//! Style mapping: source form of every object to its output classes

use serde::Serialize;

use crate::model::{BlockGraph, BlockId, StyleId, StyleKind};
use crate::options::Options;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingEntry {
    #[serde(skip)]
    pub style: StyleId,
    /// `:scope`, `.foo`, `.foo[state|size=large]`
    pub source: String,
    /// Identifier used as the `:export` key in interoperable CSS
    pub local_name: String,
    pub classes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyleMapping {
    pub block: String,
    pub identifier: String,
    pub entries: Vec<MappingEntry>,
}

impl StyleMapping {
    pub fn for_block(graph: &BlockGraph, block: BlockId, options: &Options) -> Self {
        let block_ref = graph.block(block);
        let entries = block_ref
            .styles()
            .iter()
            .filter(|node| !node.is_state())
            .flat_map(|owner| std::iter::once(owner.id).chain(owner.states.iter().copied()))
            .map(|style| MappingEntry {
                style,
                source: graph.as_source(style),
                local_name: local_name(graph, style),
                classes: graph.css_classes(style, options),
            })
            .collect();
        Self {
            block: block_ref.name().to_string(),
            identifier: block_ref.identifier().to_string(),
            entries,
        }
    }

    pub fn classes_for(&self, source: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|entry| entry.source == source)
            .map(|entry| entry.classes.as_slice())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn local_name(graph: &BlockGraph, style: StyleId) -> String {
    let node = graph.style(style);
    match &node.kind {
        StyleKind::Root => "root".to_string(),
        StyleKind::Class => node.name.clone(),
        StyleKind::State { owner, group, .. } => {
            let owner = local_name(graph, *owner);
            match group {
                Some(group) => format!("{}--{}-{}", owner, group, node.name),
                None => format!("{}--{}", owner, node.name),
            }
        }
    }
}

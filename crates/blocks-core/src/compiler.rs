//! Block Compiler
//!
//! Turns a block's stylesheet into plain CSS in a fixed order of passes:
//! debug statements, removal of block syntax, inherited conflict
//! detection, selector rewriting, explicit resolution and, optionally,
//! the interoperable `:export` rule.

use blocks_syntax::{Comment, Declaration, Node, Root, SourceLocation};

use crate::error::{CssBlocksError, Result};
use crate::mapping::StyleMapping;
use crate::model::{BlockGraph, BlockId};
use crate::options::Options;
use crate::resolver::{ConflictResolver, SelectorCache};

/// At-rules consumed by the block parser
pub const BLOCK_AT_RULES: [&str; 3] = ["block-reference", "export", "block-debug"];

/// Declarations consumed by the block parser
pub const BLOCK_PROPERTIES: [&str; 4] = ["block-name", "extends", "implements", "block-global"];

/// Where `@block-debug` sends its listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugChannel {
    Comment,
    Stderr,
    Stdout,
}

impl DebugChannel {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "comment" => Some(Self::Comment),
            "stderr" => Some(Self::Stderr),
            "stdout" => Some(Self::Stdout),
            _ => None,
        }
    }
}

/// Split `@block-debug` params into the reference and channel
pub fn parse_debug_params(params: &str) -> std::result::Result<(&str, DebugChannel), String> {
    let parts: Vec<&str> = params.split_whitespace().collect();
    match parts.as_slice() {
        [reference, "to", channel] => DebugChannel::parse(channel)
            .map(|channel| (*reference, channel))
            .ok_or_else(|| format!("Invalid @block-debug channel `{}`; expected comment, stderr or stdout", channel)),
        _ => Err(format!(
            "Malformed @block-debug statement `{}`; expected `<block> to <channel>`",
            params
        )),
    }
}

pub struct BlockCompiler<'a> {
    graph: &'a BlockGraph,
    options: &'a Options,
    cache: SelectorCache,
}

impl<'a> BlockCompiler<'a> {
    pub fn new(graph: &'a BlockGraph, options: &'a Options) -> Self {
        Self { graph, options, cache: SelectorCache::new() }
    }

    /// Compile a copy of the stylesheet the block was parsed from
    pub fn compile_block(&mut self, block: BlockId) -> Result<Root> {
        let mut root = self
            .graph
            .block(block)
            .stylesheet()
            .cloned()
            .ok_or_else(|| {
                CssBlocksError::syntax(format!(
                    "Block `{}` has no stylesheet to compile",
                    self.graph.block(block).name()
                ))
            })?;
        self.compile(block, &mut root)?;
        Ok(root)
    }

    /// Compile `root` in place as the stylesheet of `block`
    pub fn compile(&mut self, block: BlockId, root: &mut Root) -> Result<()> {
        let graph = self.graph;
        let options = self.options;
        let filename = root
            .filename
            .clone()
            .or_else(|| Some(graph.block(block).identifier().to_string()));
        tracing::info!("Compiling block `{}`", graph.block(block).name());

        self.process_debug_statements(block, root, filename.as_deref())?;
        strip_block_syntax(&mut root.nodes);

        ConflictResolver::new(graph, options, block, filename.clone(), &mut self.cache)
            .resolve_inheritance(root)?;
        self.rewrite_selectors(block, root, filename.as_deref())?;
        ConflictResolver::new(graph, options, block, filename, &mut self.cache).resolve(root)?;

        if options.interoperable_css {
            inject_exports(graph, block, options, root);
        }
        Ok(())
    }

    fn process_debug_statements(&self, block: BlockId, root: &mut Root, filename: Option<&str>) -> Result<()> {
        let mut index = 0;
        while index < root.nodes.len() {
            let Node::AtRule(at_rule) = &root.nodes[index] else {
                index += 1;
                continue;
            };
            if at_rule.name != "block-debug" {
                index += 1;
                continue;
            }
            let source = at_rule.source;
            let (reference, channel) = parse_debug_params(&at_rule.params)
                .map_err(|message| CssBlocksError::syntax_at(message, filename, source))?;
            let target = if reference == "self" {
                block
            } else {
                self.graph.block(block).get_reference(reference).ok_or_else(|| {
                    CssBlocksError::syntax_at(
                        format!("No block named `{}` is referenced in this block", reference),
                        filename,
                        source,
                    )
                })?
            };
            let lines = self.graph.debug(target, self.options);
            match channel {
                DebugChannel::Comment => {
                    let text = format!("\n{}\n", lines.join("\n"));
                    root.nodes[index] = Node::Comment(Comment { text, source });
                    index += 1;
                }
                DebugChannel::Stderr => {
                    eprintln!("{}", lines.join("\n"));
                    root.nodes.remove(index);
                }
                DebugChannel::Stdout => {
                    println!("{}", lines.join("\n"));
                    root.nodes.remove(index);
                }
            }
        }
        Ok(())
    }

    fn rewrite_selectors(&mut self, block: BlockId, root: &mut Root, filename: Option<&str>) -> Result<()> {
        let graph = self.graph;
        let options = self.options;
        let cache = &mut self.cache;
        root.try_walk_rules_mut(|rule| {
            let selectors = cache
                .get(block, rule)
                .map_err(|err| CssBlocksError::syntax_at(err.to_string(), filename, rule.source))?;
            let rewritten = selectors
                .iter()
                .map(|selector| graph.rewrite_selector(block, selector, options).map(|s| s.to_string()))
                .collect::<std::result::Result<Vec<_>, String>>()
                .map_err(|message| CssBlocksError::syntax_at(message, filename, rule.source))?;
            rule.selector = rewritten.join(",\n");
            cache.invalidate(block, rule.id);
            Ok(())
        })
    }
}

/// Remove block-only at-rules and declarations at any depth. Rules that
/// held nothing else are dropped.
fn strip_block_syntax(nodes: &mut Vec<Node>) {
    nodes.retain_mut(|node| match node {
        Node::AtRule(at_rule) if BLOCK_AT_RULES.contains(&at_rule.name.as_str()) => false,
        Node::AtRule(at_rule) => {
            if let Some(children) = &mut at_rule.nodes {
                strip_block_syntax(children);
            }
            true
        }
        Node::Rule(rule) => {
            let before = rule.nodes.len();
            rule.nodes.retain(|child| {
                !matches!(child, Node::Decl(decl) if BLOCK_PROPERTIES.contains(&decl.prop.as_str()))
            });
            let stripped = rule.nodes.len() != before;
            strip_block_syntax(&mut rule.nodes);
            !(stripped && rule.is_empty())
        }
        _ => true,
    });
}

fn inject_exports(graph: &BlockGraph, block: BlockId, options: &Options, root: &mut Root) {
    let mapping = StyleMapping::for_block(graph, block, options);
    let mut rule = root.new_rule(":export", SourceLocation::default());
    for entry in mapping.entries {
        rule.append(Node::Decl(Declaration::new(entry.local_name, entry.classes.join(" "))));
    }
    root.nodes.push(Node::Rule(rule));
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocks_syntax::parse_stylesheet;

    #[test]
    fn test_parse_debug_params() {
        assert_eq!(parse_debug_params("self to comment").unwrap(), ("self", DebugChannel::Comment));
        assert_eq!(parse_debug_params("other  to stderr").unwrap(), ("other", DebugChannel::Stderr));
        assert!(parse_debug_params("self to file").is_err());
        assert!(parse_debug_params("self comment").is_err());
    }

    #[test]
    fn test_strip_block_syntax() {
        let mut root = parse_stylesheet(
            "@block-reference other from \"other.css\";\n\
             :scope { block-name: nav; }\n\
             .a { extends: other; color: red; }\n\
             .b { }\n\
             @media (min-width: 10px) { [state|x] { block-global: true; } }",
        )
        .unwrap();
        strip_block_syntax(&mut root.nodes);
        let css = root.to_css();
        assert!(!css.contains("block-reference"));
        assert!(!css.contains("block-name"));
        assert!(!css.contains(":scope"));
        assert!(css.contains(".a {\n    color: red;\n}"));
        assert!(css.contains(".b {"));
        assert!(!css.contains("[state|x]"));
    }
}

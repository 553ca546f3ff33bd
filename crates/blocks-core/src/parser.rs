//! Block Parser
//!
//! Populates a [`Block`](crate::model::Block) from its stylesheet:
//! references and exports, the block declarations of the root rule, the
//! objects named by every selector and the rulesets attached to them.

use blocks_syntax::{
    AtRule, Declaration, Node, ParsedSelector, Root, Rule, SelectorNode, SourceLocation, is_identifier,
    parse_selector_list,
};
use cssparser::{ParseError, Parser, ParserInput};

use crate::compiler::{BLOCK_PROPERTIES, parse_debug_params};
use crate::error::{CssBlocksError, ErrorLocation, Result};
use crate::factory::BlockFactory;
use crate::model::{BlockGraph, BlockId, BlockPath, Ruleset, StyleId};
use crate::resolver::is_resolution;

/// Declarations only allowed in the root rule
const ROOT_PROPERTIES: [&str; 3] = ["block-name", "extends", "implements"];

/// Names brought in by `@block-reference` or `@export`
#[derive(Debug, Clone, PartialEq, Eq)]
enum ImportClause {
    /// `name`
    Default(String),
    /// `(name [as alias], ...)`
    Named(Vec<(String, String)>),
}

fn parse_alias<'i, 't>(parser: &mut Parser<'i, 't>) -> std::result::Result<(String, String), ParseError<'i, ()>> {
    let name = parser.expect_ident()?.to_string();
    let alias = if parser.try_parse(|p| p.expect_ident_matching("as")).is_ok() {
        parser.expect_ident()?.to_string()
    } else {
        name.clone()
    };
    Ok((name, alias))
}

/// `<clause> [from "<path>"]`
fn parse_statement(params: &str) -> Option<(ImportClause, Option<String>)> {
    let mut input = ParserInput::new(params);
    let mut parser = Parser::new(&mut input);
    let result: std::result::Result<_, ParseError<'_, ()>> = parser.parse_entirely(|p| {
        let clause = if p.try_parse(|p| p.expect_parenthesis_block()).is_ok() {
            ImportClause::Named(p.parse_nested_block(|p| p.parse_comma_separated(parse_alias))?)
        } else {
            ImportClause::Default(p.expect_ident()?.to_string())
        };
        let from = if p.try_parse(|p| p.expect_ident_matching("from")).is_ok() {
            Some(p.expect_string()?.to_string())
        } else {
            None
        };
        Ok((clause, from))
    });
    result.ok()
}

pub(crate) struct BlockParser<'f> {
    factory: &'f mut BlockFactory,
    block: BlockId,
    identifier: String,
    filename: String,
}

impl<'f> BlockParser<'f> {
    pub fn new(factory: &'f mut BlockFactory, block: BlockId, filename: &str) -> Self {
        let identifier = factory.graph.block(block).identifier().to_string();
        Self { factory, block, identifier, filename: filename.to_string() }
    }

    fn graph(&self) -> &BlockGraph {
        &self.factory.graph
    }

    fn location(&self, source: SourceLocation) -> ErrorLocation {
        ErrorLocation::new(Some(&self.filename), source)
    }

    fn error_at(&self, message: impl Into<String>, source: SourceLocation) -> CssBlocksError {
        CssBlocksError::syntax_at(message, Some(&self.filename), source)
    }

    pub fn parse(mut self, root: &Root) -> Result<()> {
        tracing::debug!("Parsing block {}", self.filename);
        for at_rule in root.nodes.iter().filter_map(Node::as_at_rule) {
            match at_rule.name.as_str() {
                "block-reference" => self.process_reference(at_rule)?,
                "export" => self.process_export(at_rule)?,
                _ => {}
            }
        }
        for at_rule in root.nodes.iter().filter_map(Node::as_at_rule) {
            if at_rule.name == "block-debug" {
                self.validate_debug(at_rule)?;
            }
        }
        let rules = root.rules();
        for rule in &rules {
            self.process_root_declarations(rule)?;
        }
        for rule in &rules {
            self.process_rule(rule)?;
        }
        self.validate_implementations()
    }

    fn process_reference(&mut self, at_rule: &AtRule) -> Result<()> {
        let source = at_rule.source;
        let Some((clause, Some(path))) = parse_statement(&at_rule.params) else {
            return Err(self.error_at(
                format!(
                    "Malformed block reference: `@block-reference {}`; expected `<name> from \"<path>\"`",
                    at_rule.params
                ),
                source,
            ));
        };
        let target = self.load(&path, source)?;
        match clause {
            ImportClause::Default(local) => self.add_reference(&local, target, source),
            ImportClause::Named(names) => {
                for (export, local) in names {
                    let exported = self.graph().block(target).get_export(&export).ok_or_else(|| {
                        self.error_at(
                            format!("Cannot import `{}` from `{}`: the block has no such export", export, path),
                            source,
                        )
                    })?;
                    self.add_reference(&local, exported, source)?;
                }
                Ok(())
            }
        }
    }

    fn load(&mut self, path: &str, source: SourceLocation) -> Result<BlockId> {
        let location = self.location(source);
        self.factory
            .get_block_relative(&self.identifier, path)
            .map_err(|err| err.at(location))
    }

    fn add_reference(&mut self, local: &str, target: BlockId, source: SourceLocation) -> Result<()> {
        let location = self.location(source);
        self.factory
            .graph
            .block_mut(self.block)
            .add_reference(local, target)
            .map_err(|err| err.at(location))
    }

    fn process_export(&mut self, at_rule: &AtRule) -> Result<()> {
        let source = at_rule.source;
        let Some((clause, from)) = parse_statement(&at_rule.params) else {
            return Err(self.error_at(
                format!(
                    "Malformed block export: `@export {}`; expected `<name>` or `(<name> [as <alias>], ...)`",
                    at_rule.params
                ),
                source,
            ));
        };
        let origin = match &from {
            Some(path) => Some(self.load(path, source)?),
            None => None,
        };
        let names = match clause {
            ImportClause::Default(name) => vec![(name.clone(), name)],
            ImportClause::Named(names) => names,
        };

        for (name, alias) in names {
            let exported = match origin {
                Some(origin) => self.graph().block(origin).get_export(&name).ok_or_else(|| {
                    self.error_at(
                        format!(
                            "Cannot export `{}` from `{}`: the block has no such export",
                            name,
                            from.as_deref().unwrap_or_default()
                        ),
                        source,
                    )
                })?,
                None => self.graph().block(self.block).get_reference(&name).ok_or_else(|| {
                    self.error_at(
                        format!("Cannot export `{}`: no block named `{}` is referenced in this block", name, name),
                        source,
                    )
                })?,
            };
            let location = self.location(source);
            self.factory
                .graph
                .block_mut(self.block)
                .add_export(&alias, exported)
                .map_err(|err| err.at(location))?;
        }
        Ok(())
    }

    fn validate_debug(&self, at_rule: &AtRule) -> Result<()> {
        let (reference, _) =
            parse_debug_params(&at_rule.params).map_err(|message| self.error_at(message, at_rule.source))?;
        if reference != "self" && self.graph().block(self.block).get_reference(reference).is_none() {
            return Err(self.error_at(
                format!("No block named `{}` is referenced in this block", reference),
                at_rule.source,
            ));
        }
        Ok(())
    }

    fn parse_selectors(&self, rule: &Rule) -> Result<Vec<ParsedSelector>> {
        parse_selector_list(&rule.selector).map_err(|err| self.error_at(err.to_string(), rule.source))
    }

    fn process_root_declarations(&mut self, rule: &Rule) -> Result<()> {
        let declarations: Vec<&Declaration> = rule
            .decls()
            .filter(|decl| ROOT_PROPERTIES.contains(&decl.prop.as_str()))
            .collect();
        if declarations.is_empty() {
            return Ok(());
        }
        let selectors = self.parse_selectors(rule)?;
        let is_root_rule = selectors.iter().all(|selector| {
            selector.combinator_count() == 0
                && matches!(
                    BlockPath::from_compound(selector.key()),
                    Ok((path, rest)) if path == BlockPath::default() && rest.is_empty()
                )
        });

        for decl in declarations {
            if !is_root_rule {
                return Err(self.error_at(
                    format!("Cannot set {} outside the `:scope` selector", decl.prop),
                    decl.source,
                ));
            }
            let value = decl.value.trim();
            match decl.prop.as_str() {
                "block-name" => self.set_block_name(value, decl.source)?,
                "extends" => self.set_base(value, decl.source)?,
                _ => {
                    for name in value.split(',').map(str::trim) {
                        let target = self.reference(name, decl.source)?;
                        self.factory.graph.block_mut(self.block).add_implements(target);
                    }
                }
            }
        }
        Ok(())
    }

    fn reference(&self, name: &str, source: SourceLocation) -> Result<BlockId> {
        self.graph()
            .block(self.block)
            .get_reference(name)
            .ok_or_else(|| self.error_at(format!("No block named `{}` is referenced in this block", name), source))
    }

    fn set_block_name(&mut self, value: &str, source: SourceLocation) -> Result<()> {
        let name = value.trim_matches(|c| c == '"' || c == '\'');
        if !is_identifier(name) {
            return Err(self.error_at(
                format!("Illegal block name. '{}' is not a legal CSS identifier.", name),
                source,
            ));
        }
        let location = self.location(source);
        self.factory
            .graph
            .block_mut(self.block)
            .set_name(name)
            .map_err(|err| err.at(location))
    }

    fn set_base(&mut self, name: &str, source: SourceLocation) -> Result<()> {
        let base = self.reference(name, source)?;
        let graph = self.graph();
        if graph.block(self.block).base().is_some() {
            return Err(self.error_at("A block can only extend one other block", source));
        }
        if base == self.block || graph.is_ancestor_block(self.block, base) {
            return Err(self.error_at(
                format!("Cannot extend `{}`: the inheritance chain would form a cycle", name),
                source,
            ));
        }
        self.factory.graph.block_mut(self.block).set_base(name, base);
        Ok(())
    }

    fn process_rule(&mut self, rule: &Rule) -> Result<()> {
        let selectors = self.parse_selectors(rule)?;
        let mut keys: Vec<(StyleId, Option<String>)> = Vec::new();

        for selector in &selectors {
            let last = selector.length() - 1;
            for (index, compound) in selector.compounds().enumerate() {
                let is_key = index == last;
                let (path, rest) = BlockPath::from_compound(compound)
                    .map_err(|message| self.error_at(format!("{} (in `{}`)", message, selector), rule.source))?;
                if !is_key && rest.iter().any(SelectorNode::is_pseudo_element) {
                    return Err(self.error_at(
                        format!("Pseudo-elements are only allowed in the key selector: `{}`", selector),
                        rule.source,
                    ));
                }
                if let Some(reference) = &path.block {
                    self.validate_external(&path, reference, is_key, selector, rule.source)?;
                    continue;
                }
                let style = self.ensure_object(&path, rule.source)?;
                if is_key {
                    let key = (style, compound.pseudo_element_name().map(str::to_string));
                    if !keys.contains(&key) {
                        keys.push(key);
                    }
                }
            }
        }

        let declarations: Vec<Declaration> = rule
            .decls()
            .filter(|decl| !BLOCK_PROPERTIES.contains(&decl.prop.as_str()) && !is_resolution(decl))
            .cloned()
            .collect();
        if !declarations.is_empty() {
            let block = self.factory.graph.block_mut(self.block);
            for (style, pseudo) in &keys {
                let ruleset = Ruleset::new(rule.id, Some(self.filename.clone()), declarations.clone());
                if let Some(node) = block.style_mut(*style) {
                    node.rulesets.add(pseudo.as_deref(), ruleset);
                }
            }
        }

        for decl in rule.decls().filter(|decl| decl.prop == "block-global") {
            match decl.value.trim() {
                "true" => {
                    for (style, _) in &keys {
                        let location = self.location(decl.source);
                        self.factory
                            .graph
                            .block_mut(self.block)
                            .mark_global(*style)
                            .map_err(|err| err.at(location))?;
                    }
                }
                "false" => {}
                other => {
                    return Err(self.error_at(
                        format!("Invalid block-global value `{}`; expected true or false", other),
                        decl.source,
                    ));
                }
            }
        }
        Ok(())
    }

    /// Objects of other blocks may only appear in selector context, and
    /// only through their global states
    fn validate_external(
        &self,
        path: &BlockPath,
        reference: &str,
        is_key: bool,
        selector: &ParsedSelector,
        source: SourceLocation,
    ) -> Result<()> {
        if is_key {
            return Err(self.error_at(
                format!("Cannot style objects of other blocks: `{}`", selector),
                source,
            ));
        }
        self.reference(reference, source)?;
        if path.state.is_none() {
            return Err(self.error_at(
                format!(
                    "Block `{}` may only be used in a selector through one of its global states: `{}`",
                    reference, selector
                ),
                source,
            ));
        }
        let graph = self.graph();
        let style = graph
            .lookup_path(self.block, path)
            .ok_or_else(|| self.error_at(format!("Cannot find `{}`", path), source))?;
        if !graph.style(style).is_global() {
            return Err(self.error_at(
                format!("`{}` is not global and cannot be used in selectors of other blocks", path),
                source,
            ));
        }
        Ok(())
    }

    fn ensure_object(&mut self, path: &BlockPath, source: SourceLocation) -> Result<StyleId> {
        let location = self.location(source);
        let block = self.factory.graph.block_mut(self.block);
        let owner = match &path.class {
            Some(class) => block.ensure_class(class),
            None => block.root(),
        };
        match &path.state {
            Some(state) => block
                .ensure_state(owner, state.group.as_deref(), &state.name)
                .map_err(|err| err.at(location)),
            None => Ok(owner),
        }
    }

    fn validate_implementations(&mut self) -> Result<()> {
        let graph = self.graph();
        let block = graph.block(self.block);
        let mut missing = Vec::new();
        for implemented in block.implements() {
            let interface = graph.block(*implemented);
            let absent: Vec<String> = interface
                .styles()
                .iter()
                .filter(|node| graph.lookup_path(self.block, &graph.path_of(node.id)).is_none())
                .map(|node| graph.as_source(node.id))
                .collect();
            if !absent.is_empty() {
                missing.push(format!("{} from {}", absent.join(", "), interface.name()));
            }
        }
        if missing.is_empty() {
            return Ok(());
        }

        let err = CssBlocksError::implementation(format!(
            "Missing implementations for: {}",
            missing.join("; ")
        ))
        .at(ErrorLocation::new(Some(&self.filename), SourceLocation::new(1, 1)));
        if !self.factory.options.fault_tolerant {
            return Err(err);
        }
        tracing::warn!("{}", err);
        self.factory.graph.block_mut(self.block).add_error(err);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_statement() {
        assert_eq!(
            parse_statement("nav from \"./nav.css\""),
            Some((ImportClause::Default("nav".into()), Some("./nav.css".into())))
        );
        assert_eq!(
            parse_statement("(a, b as c) from 'x.css'"),
            Some((
                ImportClause::Named(vec![("a".into(), "a".into()), ("b".into(), "c".into())]),
                Some("x.css".into())
            ))
        );
        assert_eq!(parse_statement("nav"), Some((ImportClause::Default("nav".into()), None)));
        assert_eq!(parse_statement("nav from"), None);
        assert_eq!(parse_statement("\"x.css\""), None);
        assert_eq!(parse_statement("(a as) from \"x.css\""), None);
    }
}

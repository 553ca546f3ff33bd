//! Block object paths
//!
//! A path names one block object: an optional block reference, then the
//! root (`:scope`) or a class, then an optional state. The same shape is
//! read from selector compounds and from lookup strings such as
//! `other.foo[state|size=large]`.

use std::fmt;

use blocks_syntax::{AttributeOperator, CompoundSelector, SelectorNode, parse_selector};

/// Namespace used by state attribute selectors
pub const STATE_NAMESPACE: &str = "state";

/// `[state|name]` or `[state|group=name]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatePath {
    pub group: Option<String>,
    pub name: String,
}

impl fmt::Display for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.group {
            Some(group) => write!(f, "[{}|{}={}]", STATE_NAMESPACE, group, self.name),
            None => write!(f, "[{}|{}]", STATE_NAMESPACE, self.name),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BlockPath {
    /// Block reference name (a tag selector in selector syntax)
    pub block: Option<String>,
    /// Class name, `None` for the block root
    pub class: Option<String>,
    pub state: Option<StatePath>,
}

impl BlockPath {
    /// Parse a lookup reference
    pub fn parse(reference: &str) -> Result<Self, String> {
        let selector = parse_selector(reference).map_err(|err| err.message().to_string())?;
        if selector.combinator_count() > 0 {
            return Err(format!("`{}` must name a single block object", reference));
        }
        let (path, rest) = Self::from_compound(selector.key())?;
        if let Some(extra) = rest.first() {
            return Err(format!("Unexpected `{}` in `{}`", extra, reference));
        }
        Ok(path)
    }

    /// Split a compound into the block object it names and the remaining
    /// pseudo-classes and pseudo-elements
    pub fn from_compound(compound: &CompoundSelector) -> Result<(Self, Vec<SelectorNode>), String> {
        let mut path = BlockPath::default();
        let mut scope = false;
        let mut rest = Vec::new();

        for (index, node) in compound.nodes.iter().enumerate() {
            match node {
                SelectorNode::Tag(name) => {
                    if index != 0 || path.block.is_some() {
                        return Err(format!("Unexpected block reference `{}`", name));
                    }
                    path.block = Some(name.clone());
                }
                SelectorNode::PseudoClass { name, argument: None } if name == "scope" => {
                    scope = true;
                }
                SelectorNode::Class(name) if name == "root" => {
                    scope = true;
                }
                SelectorNode::Class(name) => {
                    if let Some(existing) = &path.class {
                        return Err(format!(
                            "Distinct classes cannot be selected on the same element: .{}.{}",
                            existing, name
                        ));
                    }
                    path.class = Some(name.clone());
                }
                SelectorNode::Attribute(attribute)
                    if attribute.namespace.as_deref() == Some(STATE_NAMESPACE) =>
                {
                    if path.state.is_some() {
                        return Err(format!("Only one state may be selected per element: {}", compound));
                    }
                    path.state = Some(match (&attribute.operator, &attribute.value) {
                        (None, None) => StatePath { group: None, name: attribute.name.clone() },
                        (Some(AttributeOperator::Equals), Some(value)) => StatePath {
                            group: Some(attribute.name.clone()),
                            name: value.clone(),
                        },
                        _ => {
                            return Err(format!(
                                "State selectors only support the `=` operator: {}",
                                attribute
                            ));
                        }
                    });
                }
                SelectorNode::Attribute(attribute) => {
                    return Err(format!("Cannot select attributes other than states: {}", attribute));
                }
                SelectorNode::Id(name) => {
                    return Err(format!("Cannot select elements by id: #{}", name));
                }
                SelectorNode::Universal => {
                    return Err("Cannot use the universal selector in a block".to_string());
                }
                SelectorNode::PseudoClass { .. } | SelectorNode::PseudoElement { .. } => {
                    rest.push(node.clone());
                }
            }
        }

        if scope && path.class.is_some() {
            return Err(format!("Cannot combine the block root with a class: {}", compound));
        }
        if !scope && path.class.is_none() && path.state.is_none() && path.block.is_none() {
            return Err(format!("`{}` does not select a block object", compound));
        }
        Ok((path, rest))
    }

    /// Path relative to the referenced block
    pub fn local(&self) -> Self {
        Self { block: None, ..self.clone() }
    }
}

impl fmt::Display for BlockPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(block) = &self.block {
            f.write_str(block)?;
        }
        match &self.class {
            Some(class) => write!(f, ".{}", class)?,
            None if self.block.is_none() && self.state.is_none() => f.write_str(":scope")?,
            None => {}
        }
        if let Some(state) = &self.state {
            state.fmt(f)?;
        }
        Ok(())
    }
}

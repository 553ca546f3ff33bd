//! Stylesheet printer

use std::fmt::{self, Display, Formatter};

use crate::ast::{AtRule, Declaration, Node, Root, Rule};

const INDENT: &str = "    ";

impl Root {
    /// Serialize the tree back to CSS text
    pub fn to_css(&self) -> String {
        self.to_string()
    }
}

impl Display for Root {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (index, node) in self.nodes.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write_node(f, node, 0)?;
        }
        Ok(())
    }
}

impl Display for Rule {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_rule(f, self, 0)
    }
}

impl Display for AtRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_at_rule(f, self, 0)
    }
}

impl Display for Declaration {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.prop, self.full_value())
    }
}

fn write_node(f: &mut Formatter<'_>, node: &Node, depth: usize) -> fmt::Result {
    match node {
        Node::Rule(rule) => write_rule(f, rule, depth),
        Node::AtRule(at_rule) => write_at_rule(f, at_rule, depth),
        Node::Decl(decl) => writeln!(f, "{}{};", INDENT.repeat(depth), decl),
        Node::Comment(comment) => writeln!(f, "{}/*{}*/", INDENT.repeat(depth), comment.text),
    }
}

fn write_rule(f: &mut Formatter<'_>, rule: &Rule, depth: usize) -> fmt::Result {
    let indent = INDENT.repeat(depth);
    writeln!(f, "{}{} {{", indent, rule.selector)?;
    for child in &rule.nodes {
        write_node(f, child, depth + 1)?;
    }
    writeln!(f, "{}}}", indent)
}

fn write_at_rule(f: &mut Formatter<'_>, at_rule: &AtRule, depth: usize) -> fmt::Result {
    let indent = INDENT.repeat(depth);
    write!(f, "{}@{}", indent, at_rule.name)?;
    if !at_rule.params.is_empty() {
        write!(f, " {}", at_rule.params)?;
    }
    match &at_rule.nodes {
        None => writeln!(f, ";"),
        Some(children) => {
            writeln!(f, " {{")?;
            for child in children {
                write_node(f, child, depth + 1)?;
            }
            writeln!(f, "{}}}", indent)
        }
    }
}

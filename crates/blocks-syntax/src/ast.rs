//! Stylesheet syntax tree
//!
//! Rules, at-rules, declarations and comments in source order. Every rule
//! carries a [`RuleId`] that stays stable while the tree is rewritten, so
//! callers can key caches on it.

/// Position of a node in its source file (1-based line and column)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Stable identity of a rule within one [`Root`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub u32);

/// Parsed stylesheet
#[derive(Debug, Clone, Default)]
pub struct Root {
    pub nodes: Vec<Node>,
    pub filename: Option<String>,
    pub(crate) next_rule_id: u32,
}

/// Any node that can appear in a stylesheet or block body
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Rule(Rule),
    AtRule(AtRule),
    Decl(Declaration),
    Comment(Comment),
}

/// Qualified rule (`selector { ... }`)
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub id: RuleId,
    pub selector: String,
    pub nodes: Vec<Node>,
    pub source: SourceLocation,
}

/// At-rule, with or without a block (`@media ... { }`, `@import ...;`)
#[derive(Debug, Clone, PartialEq)]
pub struct AtRule {
    pub name: String,
    pub params: String,
    pub nodes: Option<Vec<Node>>,
    pub source: SourceLocation,
}

/// Declaration (`prop: value`)
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub prop: String,
    pub value: String,
    pub important: bool,
    pub source: SourceLocation,
}

/// Comment, stored without its delimiters
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub text: String,
    pub source: SourceLocation,
}

impl Root {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filename(filename: impl Into<String>) -> Self {
        Self { filename: Some(filename.into()), ..Self::default() }
    }

    /// Create a detached rule with a fresh id from this tree
    pub fn new_rule(&mut self, selector: impl Into<String>, source: SourceLocation) -> Rule {
        let id = RuleId(self.next_rule_id);
        self.next_rule_id += 1;
        Rule { id, selector: selector.into(), nodes: Vec::new(), source }
    }

    /// Number of top-level nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Visit every style rule, descending into conditional at-rules.
    /// Keyframe selectors are not style rules and are skipped.
    pub fn walk_rules<F: FnMut(&Rule)>(&self, mut f: F) {
        walk_rules_in(&self.nodes, &mut f);
    }

    /// Mutable counterpart of [`Root::walk_rules`] that stops at the first error
    pub fn try_walk_rules_mut<E, F>(&mut self, mut f: F) -> Result<(), E>
    where
        F: FnMut(&mut Rule) -> Result<(), E>,
    {
        try_walk_rules_in(&mut self.nodes, &mut f)
    }

    /// Visit every at-rule at any depth
    pub fn walk_at_rules<F: FnMut(&AtRule)>(&self, mut f: F) {
        walk_at_rules_in(&self.nodes, &mut f);
    }

    /// All rules in document order
    pub fn rules(&self) -> Vec<&Rule> {
        let mut rules = Vec::new();
        collect_rules(&self.nodes, &mut rules);
        rules
    }

    /// All rules in document order, each with the at-rules enclosing it,
    /// outermost first
    pub fn rules_with_conditions(&self) -> Vec<(Vec<&AtRule>, &Rule)> {
        let mut rules = Vec::new();
        collect_conditional_rules(&self.nodes, &mut Vec::new(), &mut rules);
        rules
    }
}

fn walk_rules_in<F: FnMut(&Rule)>(nodes: &[Node], f: &mut F) {
    for node in nodes {
        match node {
            Node::Rule(rule) => {
                f(rule);
                walk_rules_in(&rule.nodes, f);
            }
            Node::AtRule(at_rule) if !at_rule.is_keyframes() => {
                if let Some(children) = &at_rule.nodes {
                    walk_rules_in(children, f);
                }
            }
            _ => {}
        }
    }
}

fn try_walk_rules_in<E, F>(nodes: &mut [Node], f: &mut F) -> Result<(), E>
where
    F: FnMut(&mut Rule) -> Result<(), E>,
{
    for node in nodes {
        match node {
            Node::Rule(rule) => {
                f(rule)?;
                try_walk_rules_in(&mut rule.nodes, f)?;
            }
            Node::AtRule(at_rule) if !at_rule.is_keyframes() => {
                if let Some(children) = &mut at_rule.nodes {
                    try_walk_rules_in(children, f)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn walk_at_rules_in<F: FnMut(&AtRule)>(nodes: &[Node], f: &mut F) {
    for node in nodes {
        match node {
            Node::Rule(rule) => walk_at_rules_in(&rule.nodes, f),
            Node::AtRule(at_rule) => {
                f(at_rule);
                if let Some(children) = &at_rule.nodes {
                    walk_at_rules_in(children, f);
                }
            }
            _ => {}
        }
    }
}

fn collect_rules<'a>(nodes: &'a [Node], out: &mut Vec<&'a Rule>) {
    for node in nodes {
        match node {
            Node::Rule(rule) => {
                out.push(rule);
                collect_rules(&rule.nodes, out);
            }
            Node::AtRule(at_rule) if !at_rule.is_keyframes() => {
                if let Some(children) = &at_rule.nodes {
                    collect_rules(children, out);
                }
            }
            _ => {}
        }
    }
}

fn collect_conditional_rules<'a>(
    nodes: &'a [Node],
    conditions: &mut Vec<&'a AtRule>,
    out: &mut Vec<(Vec<&'a AtRule>, &'a Rule)>,
) {
    for node in nodes {
        match node {
            Node::Rule(rule) => {
                out.push((conditions.clone(), rule));
                collect_conditional_rules(&rule.nodes, conditions, out);
            }
            Node::AtRule(at_rule) if !at_rule.is_keyframes() => {
                if let Some(children) = &at_rule.nodes {
                    conditions.push(at_rule);
                    collect_conditional_rules(children, conditions, out);
                    conditions.pop();
                }
            }
            _ => {}
        }
    }
}

impl Node {
    pub fn as_rule(&self) -> Option<&Rule> {
        match self {
            Node::Rule(rule) => Some(rule),
            _ => None,
        }
    }

    pub fn as_decl(&self) -> Option<&Declaration> {
        match self {
            Node::Decl(decl) => Some(decl),
            _ => None,
        }
    }

    pub fn as_at_rule(&self) -> Option<&AtRule> {
        match self {
            Node::AtRule(at_rule) => Some(at_rule),
            _ => None,
        }
    }

    pub fn source(&self) -> SourceLocation {
        match self {
            Node::Rule(rule) => rule.source,
            Node::AtRule(at_rule) => at_rule.source,
            Node::Decl(decl) => decl.source,
            Node::Comment(comment) => comment.source,
        }
    }
}

impl Rule {
    /// Declarations directly inside this rule
    pub fn decls(&self) -> impl Iterator<Item = &Declaration> {
        self.nodes.iter().filter_map(Node::as_decl)
    }

    pub fn decls_mut(&mut self) -> impl Iterator<Item = &mut Declaration> {
        self.nodes.iter_mut().filter_map(|node| match node {
            Node::Decl(decl) => Some(decl),
            _ => None,
        })
    }

    pub fn append(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub fn prepend(&mut self, node: Node) {
        self.nodes.insert(0, node);
    }

    /// True when the rule holds no declarations or nested nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.iter().all(|node| matches!(node, Node::Comment(_)))
    }
}

impl AtRule {
    pub fn new(name: impl Into<String>, params: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: params.into(),
            nodes: None,
            source: SourceLocation::default(),
        }
    }

    /// Same name and prelude around new contents
    pub fn wrapping(&self, nodes: Vec<Node>) -> Self {
        Self {
            name: self.name.clone(),
            params: self.params.clone(),
            nodes: Some(nodes),
            source: self.source,
        }
    }

    /// `@keyframes` and vendor-prefixed variants
    pub fn is_keyframes(&self) -> bool {
        self.name.to_ascii_lowercase().ends_with("keyframes")
    }
}

impl Declaration {
    pub fn new(prop: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            prop: prop.into(),
            value: value.into(),
            important: false,
            source: SourceLocation::default(),
        }
    }

    pub fn at(mut self, source: SourceLocation) -> Self {
        self.source = source;
        self
    }

    /// Value as written, including `!important`
    pub fn full_value(&self) -> String {
        if self.important {
            format!("{} !important", self.value)
        } else {
            self.value.clone()
        }
    }
}

impl Comment {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), source: SourceLocation::default() }
    }
}

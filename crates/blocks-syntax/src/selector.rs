//! Selector model
//!
//! A complex selector is a chain of compound selectors joined by
//! combinators. The final compound is the key selector: the element the
//! rule actually styles.

use std::fmt::{self, Display, Formatter, Write};

use cssparser::{Parser, ParserInput, Token, serialize_identifier, serialize_string};

use crate::parser::{ParseResult, describe_error};
use crate::CssError;

/// Combinator between two compound selectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    /// `a b`
    Descendant,
    /// `a > b`
    Child,
    /// `a + b`
    AdjacentSibling,
    /// `a ~ b`
    GeneralSibling,
}

impl Combinator {
    pub fn as_str(self) -> &'static str {
        match self {
            Combinator::Descendant => " ",
            Combinator::Child => ">",
            Combinator::AdjacentSibling => "+",
            Combinator::GeneralSibling => "~",
        }
    }

    /// Matches exactly one step along its axis (`>` and `+`)
    pub fn is_contiguous(self) -> bool {
        matches!(self, Combinator::Child | Combinator::AdjacentSibling)
    }

    pub fn is_sibling(self) -> bool {
        matches!(self, Combinator::AdjacentSibling | Combinator::GeneralSibling)
    }

    pub fn is_hierarchical(self) -> bool {
        matches!(self, Combinator::Descendant | Combinator::Child)
    }
}

impl Display for Combinator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Combinator::Descendant => f.write_str(" "),
            other => write!(f, " {} ", other.as_str()),
        }
    }
}

/// Attribute matching operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeOperator {
    Equals,
    Includes,
    DashMatch,
    Prefix,
    Suffix,
    Substring,
}

impl AttributeOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            AttributeOperator::Equals => "=",
            AttributeOperator::Includes => "~=",
            AttributeOperator::DashMatch => "|=",
            AttributeOperator::Prefix => "^=",
            AttributeOperator::Suffix => "$=",
            AttributeOperator::Substring => "*=",
        }
    }
}

/// `[ns|name op value i]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeSelector {
    pub namespace: Option<String>,
    pub name: String,
    pub operator: Option<AttributeOperator>,
    pub value: Option<String>,
    pub case_insensitive: bool,
}

impl AttributeSelector {
    /// Attribute in the given namespace with an optional `=` value
    pub fn namespaced(namespace: &str, name: &str, value: Option<&str>) -> Self {
        Self {
            namespace: Some(namespace.to_string()),
            name: name.to_string(),
            operator: value.map(|_| AttributeOperator::Equals),
            value: value.map(str::to_string),
            case_insensitive: false,
        }
    }
}

impl Display for AttributeSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_char('[')?;
        if let Some(namespace) = &self.namespace {
            write!(f, "{}|", namespace)?;
        }
        f.write_str(&self.name)?;
        if let (Some(operator), Some(value)) = (self.operator, &self.value) {
            f.write_str(operator.as_str())?;
            if is_identifier(value) {
                f.write_str(value)?;
            } else {
                serialize_string(value, f)?;
            }
            if self.case_insensitive {
                f.write_str(" i")?;
            }
        }
        f.write_char(']')
    }
}

/// One simple selector inside a compound
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SelectorNode {
    Tag(String),
    Universal,
    Class(String),
    Id(String),
    Attribute(AttributeSelector),
    PseudoClass { name: String, argument: Option<String> },
    PseudoElement { name: String, argument: Option<String> },
}

impl SelectorNode {
    pub fn class(name: impl Into<String>) -> Self {
        SelectorNode::Class(name.into())
    }

    pub fn pseudo_class(name: impl Into<String>) -> Self {
        SelectorNode::PseudoClass { name: name.into(), argument: None }
    }

    pub fn pseudo_element(name: impl Into<String>) -> Self {
        SelectorNode::PseudoElement { name: name.into(), argument: None }
    }

    pub fn is_pseudo_element(&self) -> bool {
        matches!(self, SelectorNode::PseudoElement { .. })
    }
}

impl Display for SelectorNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SelectorNode::Tag(name) => f.write_str(name),
            SelectorNode::Universal => f.write_char('*'),
            SelectorNode::Class(name) => {
                f.write_char('.')?;
                serialize_identifier(name, f)
            }
            SelectorNode::Id(name) => {
                f.write_char('#')?;
                serialize_identifier(name, f)
            }
            SelectorNode::Attribute(attribute) => attribute.fmt(f),
            SelectorNode::PseudoClass { name, argument } => {
                write!(f, ":{}", name)?;
                match argument {
                    Some(argument) => write!(f, "({})", argument),
                    None => Ok(()),
                }
            }
            SelectorNode::PseudoElement { name, argument } => {
                write!(f, "::{}", name)?;
                match argument {
                    Some(argument) => write!(f, "({})", argument),
                    None => Ok(()),
                }
            }
        }
    }
}

/// Sequence of simple selectors with no combinator between them
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CompoundSelector {
    pub nodes: Vec<SelectorNode>,
}

impl CompoundSelector {
    pub fn new(nodes: Vec<SelectorNode>) -> Self {
        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn push(&mut self, node: SelectorNode) {
        self.nodes.push(node);
    }

    pub fn pseudo_element(&self) -> Option<&SelectorNode> {
        self.nodes.iter().find(|node| node.is_pseudo_element())
    }

    /// Name of the pseudo-element, if the compound targets one
    pub fn pseudo_element_name(&self) -> Option<&str> {
        self.nodes.iter().find_map(|node| match node {
            SelectorNode::PseudoElement { name, .. } => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().filter_map(|node| match node {
            SelectorNode::Class(name) => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn attributes(&self) -> impl Iterator<Item = &AttributeSelector> {
        self.nodes.iter().filter_map(|node| match node {
            SelectorNode::Attribute(attribute) => Some(attribute),
            _ => None,
        })
    }

    pub fn has_pseudo_class(&self, name: &str) -> bool {
        self.nodes.iter().any(|node| {
            matches!(node, SelectorNode::PseudoClass { name: n, .. } if n == name)
        })
    }
}

impl Display for CompoundSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            node.fmt(f)?;
        }
        Ok(())
    }
}

/// Complex selector: context compounds with their trailing combinators,
/// followed by the key compound
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParsedSelector {
    pub context: Vec<(CompoundSelector, Combinator)>,
    pub key: CompoundSelector,
}

impl ParsedSelector {
    pub fn new(key: CompoundSelector) -> Self {
        Self { context: Vec::new(), key }
    }

    pub fn key(&self) -> &CompoundSelector {
        &self.key
    }

    pub fn key_mut(&mut self) -> &mut CompoundSelector {
        &mut self.key
    }

    pub fn context(&self) -> &[(CompoundSelector, Combinator)] {
        &self.context
    }

    /// Number of compound selectors
    pub fn length(&self) -> usize {
        self.context.len() + 1
    }

    pub fn combinator_count(&self) -> usize {
        self.context.len()
    }

    /// Every compound in document order, key last
    pub fn compounds(&self) -> impl Iterator<Item = &CompoundSelector> {
        self.context.iter().map(|(compound, _)| compound).chain(std::iter::once(&self.key))
    }

    pub fn compounds_mut(&mut self) -> impl Iterator<Item = &mut CompoundSelector> {
        self.context
            .iter_mut()
            .map(|(compound, _)| compound)
            .chain(std::iter::once(&mut self.key))
    }

    /// `self <combinator> compound`
    pub fn appended(&self, combinator: Combinator, compound: CompoundSelector) -> Self {
        let mut context = self.context.clone();
        context.push((self.key.clone(), combinator));
        Self { context, key: compound }
    }

    /// `self <combinator> other`
    pub fn concat(&self, combinator: Combinator, other: &ParsedSelector) -> Self {
        let mut context = self.context.clone();
        context.push((self.key.clone(), combinator));
        context.extend(other.context.iter().cloned());
        Self { context, key: other.key.clone() }
    }

    /// Separate the key compound and its combinator from the rest
    pub fn split(&self) -> (Option<ParsedSelector>, Option<Combinator>, CompoundSelector) {
        match self.context.split_last() {
            None => (None, None, self.key.clone()),
            Some(((last, combinator), rest)) => {
                let context = ParsedSelector { context: rest.to_vec(), key: last.clone() };
                (Some(context), Some(*combinator), self.key.clone())
            }
        }
    }
}

impl Display for ParsedSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (compound, combinator) in &self.context {
            write!(f, "{}{}", compound, combinator)?;
        }
        self.key.fmt(f)
    }
}

/// Check that `text` is exactly one CSS identifier
pub fn is_identifier(text: &str) -> bool {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    let single_ident = matches!(
        parser.next_including_whitespace_and_comments(),
        Ok(Token::Ident(name)) if &**name == text
    );
    single_ident && parser.is_exhausted()
}

/// Parse a comma separated selector list
pub fn parse_selector_list(text: &str) -> Result<Vec<ParsedSelector>, CssError> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    parser
        .parse_entirely(|p| p.parse_comma_separated(parse_complex_selector))
        .map_err(|error| CssError::InvalidSelector {
            selector: text.to_string(),
            column: error.location.column,
            message: describe_error(&error),
        })
}

/// Parse exactly one complex selector
pub fn parse_selector(text: &str) -> Result<ParsedSelector, CssError> {
    let mut selectors = parse_selector_list(text)?;
    if selectors.len() != 1 {
        return Err(CssError::InvalidSelector {
            selector: text.to_string(),
            column: 1,
            message: format!("Expected a single selector, found {}", selectors.len()),
        });
    }
    Ok(selectors.remove(0))
}

fn parse_complex_selector<'i, 't>(parser: &mut Parser<'i, 't>) -> ParseResult<'i, ParsedSelector> {
    let mut context = Vec::new();
    let mut compound = CompoundSelector::default();
    let mut after_whitespace = false;

    loop {
        let location = parser.current_source_location();
        let token = match parser.next_including_whitespace() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        let combinator = match token {
            Token::WhiteSpace(_) => {
                after_whitespace = !compound.is_empty();
                continue;
            }
            Token::Delim('>') => Some(Combinator::Child),
            Token::Delim('+') => Some(Combinator::AdjacentSibling),
            Token::Delim('~') => Some(Combinator::GeneralSibling),
            _ => None,
        };

        if let Some(combinator) = combinator {
            if compound.is_empty() {
                return Err(location.new_custom_error(format!(
                    "Unexpected combinator `{}`",
                    combinator.as_str()
                )));
            }
            context.push((std::mem::take(&mut compound), combinator));
            after_whitespace = false;
            continue;
        }

        if after_whitespace {
            context.push((std::mem::take(&mut compound), Combinator::Descendant));
            after_whitespace = false;
        }
        let node = parse_simple_selector(parser, token, location)?;
        if compound.pseudo_element().is_some() && !node.is_pseudo_element() {
            return Err(location.new_custom_error(format!(
                "`{}` cannot follow a pseudo-element",
                node
            )));
        }
        compound.push(node);
    }

    if compound.is_empty() {
        return Err(parser.new_custom_error("Expected a selector".to_string()));
    }
    Ok(ParsedSelector { context, key: compound })
}

fn parse_simple_selector<'i, 't>(
    parser: &mut Parser<'i, 't>,
    token: Token<'i>,
    location: cssparser::SourceLocation,
) -> ParseResult<'i, SelectorNode> {
    match token {
        Token::Ident(name) => Ok(SelectorNode::Tag(name.to_string())),
        Token::Delim('*') => Ok(SelectorNode::Universal),
        Token::IDHash(name) => Ok(SelectorNode::Id(name.to_string())),
        Token::Delim('.') => Ok(SelectorNode::Class(next_ident(parser)?)),
        Token::SquareBracketBlock => {
            let attribute = parser.parse_nested_block(parse_attribute)?;
            Ok(SelectorNode::Attribute(attribute))
        }
        Token::Colon => {
            let location = parser.current_source_location();
            match parser.next_including_whitespace()?.clone() {
                Token::Colon => {
                    let (name, argument) = parse_pseudo(parser)?;
                    Ok(SelectorNode::PseudoElement { name, argument })
                }
                Token::Ident(name) if is_legacy_pseudo_element(&name) => {
                    Ok(SelectorNode::PseudoElement { name: name.to_ascii_lowercase(), argument: None })
                }
                Token::Ident(name) => {
                    Ok(SelectorNode::PseudoClass { name: name.to_ascii_lowercase(), argument: None })
                }
                Token::Function(name) => {
                    let argument = parse_argument(parser)?;
                    Ok(SelectorNode::PseudoClass {
                        name: name.to_ascii_lowercase(),
                        argument: Some(argument),
                    })
                }
                other => Err(location.new_unexpected_token_error(other)),
            }
        }
        other => Err(location.new_unexpected_token_error(other)),
    }
}

fn parse_pseudo<'i, 't>(parser: &mut Parser<'i, 't>) -> ParseResult<'i, (String, Option<String>)> {
    let location = parser.current_source_location();
    match parser.next_including_whitespace()?.clone() {
        Token::Ident(name) => Ok((name.to_ascii_lowercase(), None)),
        Token::Function(name) => {
            let argument = parse_argument(parser)?;
            Ok((name.to_ascii_lowercase(), Some(argument)))
        }
        other => Err(location.new_unexpected_token_error(other)),
    }
}

fn is_legacy_pseudo_element(name: &str) -> bool {
    ["before", "after", "first-line", "first-letter"]
        .iter()
        .any(|legacy| name.eq_ignore_ascii_case(legacy))
}

fn parse_argument<'i, 't>(parser: &mut Parser<'i, 't>) -> ParseResult<'i, String> {
    parser.parse_nested_block(|p| {
        let start = p.position();
        while p.next_including_whitespace_and_comments().is_ok() {}
        Ok::<_, cssparser::ParseError<'i, String>>(p.slice_from(start).trim().to_string())
    })
}

fn next_ident<'i, 't>(parser: &mut Parser<'i, 't>) -> ParseResult<'i, String> {
    let location = parser.current_source_location();
    match parser.next_including_whitespace()?.clone() {
        Token::Ident(name) => Ok(name.to_string()),
        other => Err(location.new_unexpected_token_error(other)),
    }
}

fn parse_attribute<'i, 't>(parser: &mut Parser<'i, 't>) -> ParseResult<'i, AttributeSelector> {
    let location = parser.current_source_location();
    let (namespace, name) = match parser.next()?.clone() {
        Token::Ident(first) => {
            let state = parser.state();
            if matches!(parser.next_including_whitespace(), Ok(&Token::Delim('|'))) {
                (Some(first.to_string()), next_ident(parser)?)
            } else {
                parser.reset(&state);
                (None, first.to_string())
            }
        }
        Token::Delim('*') => {
            parser.expect_delim('|')?;
            (Some("*".to_string()), next_ident(parser)?)
        }
        Token::Delim('|') => (Some(String::new()), next_ident(parser)?),
        other => return Err(location.new_unexpected_token_error(other)),
    };

    let location = parser.current_source_location();
    let operator = match parser.next() {
        Err(_) => {
            return Ok(AttributeSelector {
                namespace,
                name,
                operator: None,
                value: None,
                case_insensitive: false,
            });
        }
        Ok(token) => match token.clone() {
            Token::Delim('=') => AttributeOperator::Equals,
            Token::IncludeMatch => AttributeOperator::Includes,
            Token::DashMatch => AttributeOperator::DashMatch,
            Token::PrefixMatch => AttributeOperator::Prefix,
            Token::SuffixMatch => AttributeOperator::Suffix,
            Token::SubstringMatch => AttributeOperator::Substring,
            other => return Err(location.new_unexpected_token_error(other)),
        },
    };

    let location = parser.current_source_location();
    let value = match parser.next()?.clone() {
        Token::Ident(value) | Token::QuotedString(value) => value.to_string(),
        other => return Err(location.new_unexpected_token_error(other)),
    };

    let case_insensitive = parser
        .try_parse(|p| p.expect_ident_matching("i"))
        .is_ok();
    if !case_insensitive {
        let _ = parser.try_parse(|p| p.expect_ident_matching("s"));
    }

    Ok(AttributeSelector {
        namespace,
        name,
        operator: Some(operator),
        value: Some(value),
        case_insensitive,
    })
}

//! Stylesheet parser built on the `cssparser` tokenizer
//!
//! Only the structure of the stylesheet is parsed. Selectors, at-rule
//! preludes and declaration values are kept as source text.

use cssparser::{BasicParseErrorKind, ParseError, ParseErrorKind, Parser, ParserInput, ToCss, Token};

use crate::ast::{AtRule, Comment, Declaration, Node, Root, Rule, RuleId, SourceLocation};
use crate::CssError;

pub(crate) type ParseResult<'i, T> = Result<T, ParseError<'i, String>>;

/// CSS Parser
#[derive(Debug, Default, Clone)]
pub struct CssParser {
    filename: Option<String>,
}

impl CssParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filename(filename: impl Into<String>) -> Self {
        Self { filename: Some(filename.into()) }
    }

    /// Parse a CSS stylesheet
    pub fn parse(&self, css: &str) -> Result<Root, CssError> {
        let mut input = ParserInput::new(css);
        let mut parser = Parser::new(&mut input);
        let mut next_id = 0u32;

        let nodes = parse_block_contents(&mut parser, &mut next_id, true).map_err(|error| {
            CssError::ParseError {
                line: error.location.line + 1,
                column: error.location.column,
                message: describe_error(&error),
            }
        })?;

        tracing::debug!(
            "Parsed {} top-level nodes from {}",
            nodes.len(),
            self.filename.as_deref().unwrap_or("<inline>")
        );

        Ok(Root { nodes, filename: self.filename.clone(), next_rule_id: next_id })
    }
}

pub(crate) fn describe_error(error: &ParseError<'_, String>) -> String {
    match &error.kind {
        ParseErrorKind::Custom(message) => message.clone(),
        ParseErrorKind::Basic(BasicParseErrorKind::UnexpectedToken(token)) => {
            format!("Unexpected token `{}`", token.to_css_string())
        }
        ParseErrorKind::Basic(BasicParseErrorKind::EndOfInput) => "Unexpected end of input".to_string(),
        ParseErrorKind::Basic(other) => format!("{:?}", other),
    }
}

fn location_of(parser: &Parser<'_, '_>) -> SourceLocation {
    let location = parser.current_source_location();
    SourceLocation::new(location.line + 1, location.column)
}

fn parse_block_contents<'i, 't>(
    parser: &mut Parser<'i, 't>,
    next_id: &mut u32,
    top_level: bool,
) -> ParseResult<'i, Vec<Node>> {
    let mut nodes = Vec::new();
    loop {
        let state = parser.state();
        let source = location_of(parser);
        let token = match parser.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        match token {
            Token::WhiteSpace(_) | Token::Semicolon => {}
            Token::Comment(text) => {
                nodes.push(Node::Comment(Comment { text: text.to_string(), source }));
            }
            Token::AtKeyword(name) => {
                let at_rule = parse_at_rule(parser, name.to_string(), source, next_id)?;
                nodes.push(Node::AtRule(at_rule));
            }
            _ => {
                parser.reset(&state);
                if top_level || starts_nested_rule(parser) {
                    nodes.push(Node::Rule(parse_rule(parser, source, next_id)?));
                } else {
                    nodes.push(Node::Decl(parse_declaration(parser, source)?));
                }
            }
        }
    }
    Ok(nodes)
}

/// Look ahead for a `{` before the next `;`
fn starts_nested_rule(parser: &mut Parser<'_, '_>) -> bool {
    let state = parser.state();
    let mut is_rule = false;
    while let Ok(token) = parser.next() {
        match token {
            Token::Semicolon => break,
            Token::CurlyBracketBlock => {
                is_rule = true;
                break;
            }
            _ => {}
        }
    }
    parser.reset(&state);
    is_rule
}

/// What the scan loops care about in the next token
enum Step {
    Semicolon,
    CurlyBlock,
    /// `(`, `[` or a function: its contents have to be consumed
    Nested,
    Other,
}

impl Step {
    fn of(token: &Token<'_>) -> Self {
        match token {
            Token::Semicolon => Step::Semicolon,
            Token::CurlyBracketBlock => Step::CurlyBlock,
            Token::Function(_) | Token::ParenthesisBlock | Token::SquareBracketBlock => Step::Nested,
            _ => Step::Other,
        }
    }
}

/// Consume the block opened by the last token so positions land past it
fn skip_nested_block<'i, 't>(parser: &mut Parser<'i, 't>) -> ParseResult<'i, ()> {
    parser.parse_nested_block(|p| {
        while p.next_including_whitespace_and_comments().is_ok() {}
        Ok::<_, ParseError<'i, String>>(())
    })
}

fn parse_rule<'i, 't>(
    parser: &mut Parser<'i, 't>,
    source: SourceLocation,
    next_id: &mut u32,
) -> ParseResult<'i, Rule> {
    let start = parser.position();
    loop {
        let before = parser.position();
        match parser.next().map(Step::of) {
            Ok(Step::CurlyBlock) => {
                let selector = parser.slice(start..before).trim().to_string();
                if selector.is_empty() {
                    return Err(parser.new_custom_error("Rule without a selector".to_string()));
                }
                let nodes = parser.parse_nested_block(|p| parse_block_contents(p, next_id, false))?;
                let id = RuleId(*next_id);
                *next_id += 1;
                return Ok(Rule { id, selector, nodes, source });
            }
            Ok(Step::Nested) => skip_nested_block(parser)?,
            Ok(_) => {}
            Err(_) => {
                let selector = parser.slice_from(start).trim().to_string();
                return Err(parser.new_custom_error(format!("Unclosed rule `{}`", selector)));
            }
        }
    }
}

fn parse_at_rule<'i, 't>(
    parser: &mut Parser<'i, 't>,
    name: String,
    source: SourceLocation,
    next_id: &mut u32,
) -> ParseResult<'i, AtRule> {
    let start = parser.position();
    loop {
        let before = parser.position();
        let has_block = match parser.next().map(Step::of) {
            Ok(Step::Semicolon) => false,
            Ok(Step::CurlyBlock) => true,
            Ok(Step::Nested) => {
                skip_nested_block(parser)?;
                continue;
            }
            Ok(Step::Other) => continue,
            // Final statement of a block without a semicolon
            Err(_) => {
                let params = parser.slice_from(start).trim().to_string();
                return Ok(AtRule { name, params, nodes: None, source });
            }
        };
        let params = parser.slice(start..before).trim().to_string();
        let nodes = if has_block {
            Some(parser.parse_nested_block(|p| parse_block_contents(p, next_id, false))?)
        } else {
            None
        };
        return Ok(AtRule { name, params, nodes, source });
    }
}

fn parse_declaration<'i, 't>(
    parser: &mut Parser<'i, 't>,
    source: SourceLocation,
) -> ParseResult<'i, Declaration> {
    let prop = parser.expect_ident()?.to_string();
    parser.expect_colon()?;

    let start = parser.position();
    let end = loop {
        let before = parser.position();
        match parser.next_including_whitespace_and_comments().map(Step::of) {
            Ok(Step::Nested) => skip_nested_block(parser)?,
            Ok(Step::Semicolon) | Err(_) => break before,
            Ok(_) => {}
        }
    };

    let (value, important) = split_important(parser.slice(start..end).trim());
    Ok(Declaration { prop, value: value.to_string(), important, source })
}

fn split_important(raw: &str) -> (&str, bool) {
    if let Some(index) = raw.rfind('!') {
        if raw[index + 1..].trim().eq_ignore_ascii_case("important") {
            return (raw[..index].trim_end(), true);
        }
    }
    (raw, false)
}

//! css-blocks Syntax
//!
//! A small PostCSS-like syntax tree for stylesheets plus the selector model
//! the block compiler rewrites. Tokenization is delegated to `cssparser`;
//! this crate only understands rule, at-rule and declaration structure.

mod ast;
mod parser;
mod stringify;
pub mod selector;

pub use ast::{AtRule, Comment, Declaration, Node, Root, Rule, RuleId, SourceLocation};
pub use parser::CssParser;
pub use selector::{
    AttributeOperator, AttributeSelector, Combinator, CompoundSelector, ParsedSelector,
    SelectorNode, is_identifier, parse_selector, parse_selector_list,
};

/// Parse a stylesheet without a filename
pub fn parse_stylesheet(css: &str) -> Result<Root, CssError> {
    CssParser::new().parse(css)
}

/// CSS parsing error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CssError {
    #[error("Parse error at line {line}, column {column}: {message}")]
    ParseError { line: u32, column: u32, message: String },

    #[error("Invalid selector `{selector}` at column {column}: {message}")]
    InvalidSelector { selector: String, column: u32, message: String },
}

impl CssError {
    /// Human readable message without the position prefix
    pub fn message(&self) -> &str {
        match self {
            CssError::ParseError { message, .. } | CssError::InvalidSelector { message, .. } => {
                message
            }
        }
    }
}

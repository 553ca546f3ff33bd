//! Error types

use std::fmt;

use blocks_syntax::{CssError, SourceLocation};

/// Where an error happened
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorLocation {
    pub filename: Option<String>,
    pub line: u32,
    pub column: u32,
}

impl ErrorLocation {
    pub fn new(filename: Option<&str>, source: SourceLocation) -> Self {
        Self {
            filename: filename.map(str::to_string),
            line: source.line,
            column: source.column,
        }
    }
}

impl fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.filename.as_deref().unwrap_or("<unknown>"),
            self.line,
            self.column
        )
    }
}

fn located(location: &Option<ErrorLocation>) -> String {
    match location {
        Some(location) => format!(" ({})", location),
        None => String::new(),
    }
}

/// Errors raised while loading or compiling blocks
#[derive(Debug, thiserror::Error)]
pub enum CssBlocksError {
    #[error("[css-blocks] InvalidBlockSyntax: {message}{}", located(.location))]
    Syntax { message: String, location: Option<ErrorLocation> },

    #[error("[css-blocks] MalformedBlockPath: {message}{}", located(.location))]
    MalformedPath { message: String, location: Option<ErrorLocation> },

    #[error("[css-blocks] ImplementationError: {message}{}", located(.location))]
    Implementation { message: String, location: Option<ErrorLocation> },

    #[error("[css-blocks] DuplicateBlockName: {message}")]
    DuplicateName { message: String },

    #[error("[css-blocks] DuplicateGuid: {message}")]
    DuplicateGuid { message: String },

    #[error("[css-blocks] StateError: {message}")]
    State { message: String },

    #[error("[css-blocks] ImportError: {message}{}", located(.location))]
    Import { message: String, location: Option<ErrorLocation> },

    #[error("[css-blocks] IoError: {0}")]
    Io(#[from] std::io::Error),
}

impl CssBlocksError {
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::Syntax { message: message.into(), location: None }
    }

    pub fn malformed_path(message: impl Into<String>) -> Self {
        Self::MalformedPath { message: message.into(), location: None }
    }

    pub fn implementation(message: impl Into<String>) -> Self {
        Self::Implementation { message: message.into(), location: None }
    }

    pub fn import(message: impl Into<String>) -> Self {
        Self::Import { message: message.into(), location: None }
    }

    /// Syntax error pointing at a node of a file
    pub fn syntax_at(message: impl Into<String>, filename: Option<&str>, source: SourceLocation) -> Self {
        Self::syntax(message).at(ErrorLocation::new(filename, source))
    }

    /// Attach a location, keeping an existing one
    pub fn at(mut self, new_location: ErrorLocation) -> Self {
        match &mut self {
            Self::Syntax { location, .. }
            | Self::MalformedPath { location, .. }
            | Self::Implementation { location, .. }
            | Self::Import { location, .. } => {
                if location.is_none() {
                    *location = Some(new_location);
                }
            }
            _ => {}
        }
        self
    }

    pub fn location(&self) -> Option<&ErrorLocation> {
        match self {
            Self::Syntax { location, .. }
            | Self::MalformedPath { location, .. }
            | Self::Implementation { location, .. }
            | Self::Import { location, .. } => location.as_ref(),
            _ => None,
        }
    }

    /// Message without kind prefix or location
    pub fn message(&self) -> String {
        match self {
            Self::Syntax { message, .. }
            | Self::MalformedPath { message, .. }
            | Self::Implementation { message, .. }
            | Self::DuplicateName { message }
            | Self::DuplicateGuid { message }
            | Self::State { message }
            | Self::Import { message, .. } => message.clone(),
            Self::Io(err) => err.to_string(),
        }
    }

    /// Convert a stylesheet parse error, located in `filename`
    pub fn from_css_error(error: CssError, filename: Option<&str>) -> Self {
        match error {
            CssError::ParseError { line, column, message } => {
                Self::syntax(message).at(ErrorLocation::new(filename, SourceLocation::new(line, column)))
            }
            CssError::InvalidSelector { selector, column, message } => {
                Self::syntax(format!("Invalid selector `{}`: {}", selector, message))
                    .at(ErrorLocation::new(filename, SourceLocation::new(1, column)))
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, CssBlocksError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_location() {
        let err = CssBlocksError::syntax_at("Bad thing", Some("a.css"), SourceLocation::new(3, 7));
        assert_eq!(err.to_string(), "[css-blocks] InvalidBlockSyntax: Bad thing (a.css:3:7)");
    }

    #[test]
    fn test_display_without_location() {
        let err = CssBlocksError::State { message: "nope".into() };
        assert_eq!(err.to_string(), "[css-blocks] StateError: nope");
    }

    #[test]
    fn test_at_keeps_first_location() {
        let err = CssBlocksError::syntax("x")
            .at(ErrorLocation::new(Some("a.css"), SourceLocation::new(1, 1)))
            .at(ErrorLocation::new(Some("b.css"), SourceLocation::new(2, 2)));
        assert_eq!(err.location().unwrap().filename.as_deref(), Some("a.css"));
    }
}

//! Compiler configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Output class naming scheme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// `block`, `block__class`, `block__class--state`
    #[default]
    Bem,
}

/// Options shared by the factory and the compiler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Options {
    pub output_mode: OutputMode,
    /// Append a `:export` rule mapping local names to output classes
    #[serde(rename = "interoperableCSS")]
    pub interoperable_css: bool,
    /// Base directory for resolving top-level block paths
    pub root_dir: PathBuf,
    /// Suffix colliding block names with `-2`, `-3`, ... instead of failing
    pub rename_duplicate_blocks: bool,
    /// Collect structural errors on blocks instead of failing the load
    pub fault_tolerant: bool,
    /// Minify serialized output
    pub minify: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            output_mode: OutputMode::Bem,
            interoperable_css: false,
            root_dir: PathBuf::from("."),
            rename_duplicate_blocks: true,
            fault_tolerant: false,
            minify: false,
        }
    }
}

impl Options {
    /// Load options from a JSON document; missing keys keep their defaults
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

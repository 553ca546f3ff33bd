//! css-blocks Core
//!
//! Block model, conflict detection and resolution, and the compiler that
//! turns block stylesheets into plain, globally unique CSS.

mod algebra;
mod compiler;
mod conflict;
mod error;
mod factory;
mod importer;
mod mapping;
mod options;
mod output;
mod parser;
mod registry;
mod resolver;
pub mod model;
pub mod properties;

pub use algebra::{merge_key_selectors, merge_nodes, split_selector};
pub use compiler::{BLOCK_AT_RULES, BLOCK_PROPERTIES, BlockCompiler, DebugChannel};
pub use conflict::{ConflictType, Conflicts, compare_values, detect_conflicts, update_conflict};
pub use error::{CssBlocksError, ErrorLocation, Result};
pub use factory::BlockFactory;
pub use importer::{
    FilesystemImporter, ImportedFile, Importer, MemoryImporter, Preprocessor, ProcessedFile, Syntax,
    default_block_name,
};
pub use mapping::{MappingEntry, StyleMapping};
pub use model::{Block, BlockGraph, BlockId, BlockPath, StyleId, StyleKind, StyleNode};
pub use options::{Options, OutputMode};
pub use output::{minify, to_css};
pub use registry::NameRegistry;
pub use resolver::{ConflictResolver, Resolution, SelectorCache, parse_resolve_value};

/// Load a block through `factory` and print its compiled CSS
pub fn compile_file(factory: &mut BlockFactory, path: &str) -> Result<String> {
    let block = factory.get_block(path)?;
    let root = factory.compile(block)?;
    to_css(&root, factory.options())
}

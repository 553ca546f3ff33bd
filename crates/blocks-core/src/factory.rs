//! Block factory
//!
//! Owns the block graph of one compile session. Every file is imported,
//! preprocessed and parsed at most once; references are loaded depth
//! first while the loading stack guards against cycles.

use std::collections::HashMap;

use blocks_syntax::{CssParser, Root, is_identifier};

use crate::compiler::BlockCompiler;
use crate::error::{CssBlocksError, Result};
use crate::importer::{FilesystemImporter, ImportedFile, Importer, Preprocessor, ProcessedFile, Syntax};
use crate::mapping::StyleMapping;
use crate::model::{BlockGraph, BlockId};
use crate::options::Options;
use crate::parser::BlockParser;
use crate::registry::NameRegistry;

pub struct BlockFactory {
    pub(crate) options: Options,
    pub(crate) graph: BlockGraph,
    importer: Box<dyn Importer>,
    preprocessors: HashMap<Syntax, Box<dyn Preprocessor>>,
    registry: NameRegistry,
    /// Identifiers currently being loaded, outermost first
    loading: Vec<String>,
}

impl BlockFactory {
    /// Factory reading blocks from disk
    pub fn new(options: Options) -> Self {
        Self::with_importer(options, FilesystemImporter::new())
    }

    pub fn with_importer(options: Options, importer: impl Importer + 'static) -> Self {
        let registry = NameRegistry::new(options.rename_duplicate_blocks);
        Self {
            options,
            graph: BlockGraph::new(),
            importer: Box::new(importer),
            preprocessors: HashMap::new(),
            registry,
            loading: Vec::new(),
        }
    }

    /// Register the preprocessor for a source syntax, replacing any previous one
    pub fn add_preprocessor(&mut self, syntax: Syntax, preprocessor: impl Preprocessor + 'static) -> &mut Self {
        self.preprocessors.insert(syntax, Box::new(preprocessor));
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn graph(&self) -> &BlockGraph {
        &self.graph
    }

    /// Load a block by path relative to `Options::root_dir`
    pub fn get_block(&mut self, path: &str) -> Result<BlockId> {
        let identifier = self.importer.identifier(None, path, &self.options)?;
        self.load(&identifier)
    }

    /// Load a block by path relative to the block `from`
    pub fn get_block_relative(&mut self, from: &str, path: &str) -> Result<BlockId> {
        let identifier = self.importer.identifier(Some(from), path, &self.options)?;
        self.load(&identifier)
    }

    /// Compile a loaded block to a fresh syntax tree
    pub fn compile(&self, block: BlockId) -> Result<Root> {
        BlockCompiler::new(&self.graph, &self.options).compile_block(block)
    }

    pub fn mapping(&self, block: BlockId) -> StyleMapping {
        StyleMapping::for_block(&self.graph, block, &self.options)
    }

    pub fn debug_identifier(&self, identifier: &str) -> String {
        self.importer.debug_identifier(identifier)
    }

    fn load(&mut self, identifier: &str) -> Result<BlockId> {
        if let Some(position) = self.loading.iter().position(|loading| loading == identifier) {
            let chain: Vec<String> = self.loading[position..]
                .iter()
                .chain(std::iter::once(&identifier.to_string()))
                .map(|id| self.importer.debug_identifier(id))
                .collect();
            return Err(CssBlocksError::import(format!(
                "Cyclic block dependency: {}",
                chain.join(" -> ")
            )));
        }
        if let Some(id) = self.graph.block_by_identifier(identifier) {
            return Ok(id);
        }

        self.loading.push(identifier.to_string());
        let result = self.load_uncached(identifier);
        self.loading.pop();
        if let Err(err) = &result {
            tracing::debug!("Failed to load {}: {}", identifier, err);
            self.graph.forget(identifier);
        }
        result
    }

    fn load_uncached(&mut self, identifier: &str) -> Result<BlockId> {
        let debug_identifier = self.importer.debug_identifier(identifier);
        let file = self.importer.import(identifier, &self.options)?;
        let processed = self.preprocess(&file, &debug_identifier)?;
        let root = CssParser::with_filename(debug_identifier.clone())
            .parse(&processed.content)
            .map_err(|err| CssBlocksError::from_css_error(err, Some(&debug_identifier)))?;

        let id = self.graph.add_block(identifier, &file.default_name);
        let source_path = self.importer.filesystem_path(identifier);
        for dependency in source_path.into_iter().chain(processed.dependencies) {
            self.graph.block_mut(id).add_dependency(dependency);
        }
        BlockParser::new(self, id, &debug_identifier).parse(&root)?;

        let name = self.graph.block(id).name().to_string();
        if !is_identifier(&name) {
            return Err(CssBlocksError::syntax(format!(
                "Illegal block name. '{}' is not a legal CSS identifier.",
                name
            )));
        }
        let unique = self.registry.unique_block_name(&name, identifier)?;
        if unique != name {
            tracing::warn!("Block name `{}` is taken; {} is renamed to `{}`", name, debug_identifier, unique);
            self.graph.block_mut(id).assign_registered_name(unique);
        }

        let (guid, collision) = self.registry.register_guid(identifier);
        let block = self.graph.block_mut(id);
        block.set_guid(guid);
        if let Some(err) = collision {
            if !self.options.fault_tolerant {
                return Err(err);
            }
            tracing::warn!("{}", err);
            block.add_error(err);
        }
        block.set_stylesheet(root);

        tracing::debug!("Loaded block `{}` from {}", block.name(), debug_identifier);
        Ok(id)
    }

    fn preprocess(&self, file: &ImportedFile, debug_identifier: &str) -> Result<ProcessedFile> {
        match self.preprocessors.get(&file.syntax) {
            Some(preprocessor) => preprocessor.process(file, &self.options),
            None if file.syntax == Syntax::Css => Ok(ProcessedFile {
                content: file.contents.clone(),
                dependencies: Vec::new(),
            }),
            None => Err(CssBlocksError::import(format!(
                "No preprocessor provided for {} files: {}",
                file.syntax, debug_identifier
            ))),
        }
    }
}

//! Importers and preprocessors
//!
//! An [`Importer`] maps the paths written in `@block-reference` and
//! `@export` statements to stable identifiers and loads their contents.
//! Non-CSS sources go through a [`Preprocessor`] registered for their
//! [`Syntax`] before the block parser sees them.

use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::error::{CssBlocksError, Result};
use crate::options::Options;

/// Source language of an imported file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Syntax {
    Css,
    Scss,
    Sass,
    Less,
    Stylus,
    Other(String),
}

impl Syntax {
    /// Guess from a file extension
    pub fn from_path(path: &str) -> Self {
        let extension = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match extension.as_str() {
            "css" => Syntax::Css,
            "scss" => Syntax::Scss,
            "sass" => Syntax::Sass,
            "less" => Syntax::Less,
            "styl" | "stylus" => Syntax::Stylus,
            other => Syntax::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Syntax::Css => f.write_str("css"),
            Syntax::Scss => f.write_str("scss"),
            Syntax::Sass => f.write_str("sass"),
            Syntax::Less => f.write_str("less"),
            Syntax::Stylus => f.write_str("stylus"),
            Syntax::Other(name) => f.write_str(name),
        }
    }
}

/// Raw contents of an imported file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedFile {
    pub identifier: String,
    pub default_name: String,
    pub syntax: Syntax,
    pub contents: String,
}

/// Source of block files.
///
/// Identifiers must be stable: the factory loads every identifier at most
/// once per session.
pub trait Importer {
    /// Identifier of `path` as referenced from the block `from`, or from
    /// the root directory when `from` is `None`
    fn identifier(&self, from: Option<&str>, path: &str, options: &Options) -> Result<String>;

    fn import(&self, identifier: &str, options: &Options) -> Result<ImportedFile>;

    /// Block name used when the block does not set `block-name`
    fn default_name(&self, identifier: &str) -> String {
        default_block_name(identifier)
    }

    /// Location on disk, when there is one
    fn filesystem_path(&self, _identifier: &str) -> Option<PathBuf> {
        None
    }

    /// Short form for messages
    fn debug_identifier(&self, identifier: &str) -> String {
        identifier.to_string()
    }
}

/// File name up to its first dot: `nav.block.css` becomes `nav`
pub fn default_block_name(identifier: &str) -> String {
    let file_name = identifier.rsplit(['/', '\\']).next().unwrap_or(identifier);
    file_name.split('.').next().unwrap_or(file_name).to_string()
}

/// Resolve `.` and `..` components without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

fn relative_to(from: Option<&str>, path: &str, root: &Path) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        return normalize(path);
    }
    let base = match from {
        Some(from) => Path::new(from).parent().map(Path::to_path_buf).unwrap_or_default(),
        None => root.to_path_buf(),
    };
    normalize(&base.join(path))
}

/// Loads blocks from disk. Relative paths resolve against the importing
/// block, top-level paths against `Options::root_dir`.
#[derive(Debug, Clone, Default)]
pub struct FilesystemImporter;

impl FilesystemImporter {
    pub fn new() -> Self {
        Self
    }
}

impl Importer for FilesystemImporter {
    fn identifier(&self, from: Option<&str>, path: &str, options: &Options) -> Result<String> {
        let resolved = relative_to(from, path, &options.root_dir);
        resolved
            .to_str()
            .map(str::to_string)
            .ok_or_else(|| CssBlocksError::import(format!("Path is not valid UTF-8: {}", resolved.display())))
    }

    fn import(&self, identifier: &str, _options: &Options) -> Result<ImportedFile> {
        let contents = std::fs::read_to_string(identifier).map_err(|err| {
            CssBlocksError::import(format!("Cannot read block file `{}`: {}", identifier, err))
        })?;
        tracing::debug!("Read {} bytes from {}", contents.len(), identifier);
        Ok(ImportedFile {
            identifier: identifier.to_string(),
            default_name: self.default_name(identifier),
            syntax: Syntax::from_path(identifier),
            contents,
        })
    }

    fn filesystem_path(&self, identifier: &str) -> Option<PathBuf> {
        Some(PathBuf::from(identifier))
    }

    fn debug_identifier(&self, identifier: &str) -> String {
        std::env::current_dir()
            .ok()
            .and_then(|cwd| Path::new(identifier).strip_prefix(cwd).ok().map(Path::to_path_buf))
            .map(|relative| relative.display().to_string())
            .unwrap_or_else(|| identifier.to_string())
    }
}

/// Serves blocks from an in-memory map of paths to contents
#[derive(Debug, Clone, Default)]
pub struct MemoryImporter {
    files: HashMap<String, (Syntax, String)>,
}

impl MemoryImporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file; its syntax is taken from the extension
    pub fn add(&mut self, path: &str, contents: impl Into<String>) -> &mut Self {
        self.add_with_syntax(path, Syntax::from_path(path), contents)
    }

    pub fn add_with_syntax(&mut self, path: &str, syntax: Syntax, contents: impl Into<String>) -> &mut Self {
        let key = normalize(Path::new(path)).to_string_lossy().into_owned();
        self.files.insert(key, (syntax, contents.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Importer for MemoryImporter {
    fn identifier(&self, from: Option<&str>, path: &str, _options: &Options) -> Result<String> {
        Ok(relative_to(from, path, Path::new("")).to_string_lossy().into_owned())
    }

    fn import(&self, identifier: &str, _options: &Options) -> Result<ImportedFile> {
        let (syntax, contents) = self
            .files
            .get(identifier)
            .ok_or_else(|| CssBlocksError::import(format!("No such block file: {}", identifier)))?;
        Ok(ImportedFile {
            identifier: identifier.to_string(),
            default_name: self.default_name(identifier),
            syntax: syntax.clone(),
            contents: contents.clone(),
        })
    }
}

/// Output of a preprocessor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedFile {
    pub content: String,
    /// Extra files the output depends on (partials, mixins)
    pub dependencies: Vec<PathBuf>,
}

/// Converts a non-CSS source into CSS
pub trait Preprocessor {
    fn process(&self, file: &ImportedFile, options: &Options) -> Result<ProcessedFile>;
}

impl<F> Preprocessor for F
where
    F: Fn(&ImportedFile, &Options) -> Result<ProcessedFile>,
{
    fn process(&self, file: &ImportedFile, options: &Options) -> Result<ProcessedFile> {
        self(file, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_block_name() {
        assert_eq!(default_block_name("/a/b/nav.block.css"), "nav");
        assert_eq!(default_block_name("button.css"), "button");
        assert_eq!(default_block_name("plain"), "plain");
    }

    #[test]
    fn test_syntax_from_path() {
        assert_eq!(Syntax::from_path("a.block.css"), Syntax::Css);
        assert_eq!(Syntax::from_path("a.SCSS"), Syntax::Scss);
        assert_eq!(Syntax::from_path("a.styl"), Syntax::Stylus);
        assert_eq!(Syntax::from_path("a.txt"), Syntax::Other("txt".into()));
    }

    #[test]
    fn test_memory_identifiers_are_relative() {
        let importer = MemoryImporter::new();
        let options = Options::default();
        assert_eq!(importer.identifier(None, "blocks/nav.css", &options).unwrap(), "blocks/nav.css");
        assert_eq!(
            importer.identifier(Some("blocks/nav.css"), "../shared/./base.css", &options).unwrap(),
            "shared/base.css"
        );
    }

    #[test]
    fn test_memory_import() {
        let mut importer = MemoryImporter::new();
        importer.add("./a.css", ".x { color: red; }");
        let file = importer.import("a.css", &Options::default()).unwrap();
        assert_eq!(file.default_name, "a");
        assert_eq!(file.syntax, Syntax::Css);
        assert!(importer.import("b.css", &Options::default()).is_err());
    }

    #[test]
    fn test_filesystem_import() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("card.block.css"), ":scope { color: red; }").unwrap();
        let options = Options { root_dir: dir.path().to_path_buf(), ..Options::default() };
        let importer = FilesystemImporter::new();
        let identifier = importer.identifier(None, "card.block.css", &options).unwrap();
        let file = importer.import(&identifier, &options).unwrap();
        assert_eq!(file.default_name, "card");
        assert!(file.contents.contains("color: red"));
        assert_eq!(importer.filesystem_path(&identifier), Some(dir.path().join("card.block.css")));
    }

    #[test]
    fn test_closure_preprocessor() {
        let substitute = |file: &ImportedFile, _: &Options| -> Result<ProcessedFile> {
            Ok(ProcessedFile { content: file.contents.replace("$red", "red"), dependencies: Vec::new() })
        };
        let file = ImportedFile {
            identifier: "a.scss".into(),
            default_name: "a".into(),
            syntax: Syntax::Scss,
            contents: ".x { color: $red; }".into(),
        };
        let out = substitute.process(&file, &Options::default()).unwrap();
        assert_eq!(out.content, ".x { color: red; }");
    }
}

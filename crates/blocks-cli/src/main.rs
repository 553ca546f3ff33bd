//! css-blocks command line compiler

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use blocks_core::{BlockFactory, Options, default_block_name, to_css};

#[derive(Parser)]
#[command(name = "css-blocks", version, about = "Compile css-blocks stylesheets to plain CSS")]
struct Cli {
    /// Block files to compile, relative to the root directory
    #[arg(required = true)]
    files: Vec<String>,

    /// JSON options file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write `<block>.css` files here instead of printing to stdout
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Base directory for block paths
    #[arg(long)]
    root_dir: Option<PathBuf>,

    /// Append `:export` rules for interoperable CSS
    #[arg(long)]
    interop: bool,

    /// Minify the output
    #[arg(long)]
    minify: bool,

    /// Report structural errors as warnings
    #[arg(long)]
    fault_tolerant: bool,

    /// Fail on block name collisions instead of renaming
    #[arg(long)]
    no_rename: bool,

    /// Also emit each block's class mapping as JSON
    #[arg(long)]
    mapping: bool,
}

impl Cli {
    fn options(&self) -> Result<Options> {
        let mut options = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                Options::from_json(&text).with_context(|| format!("Invalid config {}", path.display()))?
            }
            None => Options::default(),
        };
        if let Some(root_dir) = &self.root_dir {
            options.root_dir = root_dir.clone();
        }
        options.interoperable_css |= self.interop;
        options.minify |= self.minify;
        options.fault_tolerant |= self.fault_tolerant;
        if self.no_rename {
            options.rename_duplicate_blocks = false;
        }
        Ok(options)
    }
}

/// `nav.block.css` compiles to `nav.css`
fn output_path(out_dir: &Path, file: &str, extension: &str) -> PathBuf {
    out_dir.join(format!("{}.{}", default_block_name(file), extension))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options = cli.options()?;
    tracing::debug!("Options: {:?}", options);
    let mut factory = BlockFactory::new(options);

    if let Some(out_dir) = &cli.out_dir {
        std::fs::create_dir_all(out_dir)
            .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    }

    for file in &cli.files {
        let block = factory.get_block(file)?;
        for error in factory.graph().block(block).errors() {
            tracing::warn!("{}", error);
        }
        let root = factory.compile(block)?;
        let css = to_css(&root, factory.options())?;
        let mapping = if cli.mapping { Some(factory.mapping(block).to_json()?) } else { None };

        match &cli.out_dir {
            Some(out_dir) => {
                let path = output_path(out_dir, file, "css");
                std::fs::write(&path, css).with_context(|| format!("Failed to write {}", path.display()))?;
                tracing::info!("Wrote {}", path.display());
                if let Some(mapping) = mapping {
                    let path = output_path(out_dir, file, "json");
                    std::fs::write(&path, mapping)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                }
            }
            None => {
                print!("{}", css);
                if let Some(mapping) = mapping {
                    println!("{}", mapping);
                }
            }
        }
    }
    Ok(())
}

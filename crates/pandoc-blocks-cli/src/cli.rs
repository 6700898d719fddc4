//! Command-line interface definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "pandoc-blocks")]
#[command(version)]
#[command(about = "Block-based Markdown editing backed by Pandoc", long_about = None)]
pub struct Cli {
    /// Pandoc executable (overrides the config file)
    #[arg(long, global = true, value_name = "PATH")]
    pub pandoc: Option<PathBuf>,

    /// Converter timeout in seconds (overrides the config file)
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the blocks a Markdown file parses into
    Blocks {
        file: PathBuf,

        /// Dump the whole document as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse a file and write it back out from its blocks
    Roundtrip {
        file: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render every block to a standalone HTML preview page
    Preview {
        file: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show which pandoc will be used and its version
    Check,

    /// Edit a file block by block in the terminal
    Edit {
        /// File to open (defaults to `default_file` from the config)
        file: Option<PathBuf>,
    },
}

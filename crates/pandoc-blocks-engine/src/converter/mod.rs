//! # Converter Service
//!
//! The document core's only external dependency: a stateless
//! Markdown ⇄ AST ⇄ HTML transformation engine. [`PandocConverter`] drives the
//! `pandoc` executable; tests substitute scripted doubles.
//!
//! Every operation returns `Result<_, ConversionError>` and callers decide how
//! to degrade. Nothing in this module panics on converter misbehaviour.

pub mod pandoc;

use std::path::PathBuf;
use std::time::Duration;

use crate::ast::{AstDocument, AstFragment};

pub use pandoc::{PandocConverter, PandocOptions};

/// Failure of the conversion engine
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("{program} not found. Please ensure Pandoc is installed and on your PATH")]
    ToolNotFound { program: PathBuf },
    #[error("failed to run converter: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("{program} timed out after {after:?}")]
    Timeout { program: PathBuf, after: Duration },
    #[error("converter exited with {status}: {message}")]
    Failed { status: String, message: String },
    #[error("converter produced unusable output: {0}")]
    InvalidOutput(String),
    #[error("converter unavailable: {0}")]
    Unavailable(String),
}

/// Markdown ⇄ AST ⇄ HTML conversion contract
pub trait Converter {
    /// Parse a Markdown document into Pandoc's AST
    fn markdown_to_ast(&self, markdown: &str) -> Result<AstDocument, ConversionError>;

    /// Render an AST document or bare block list back to Markdown
    fn ast_to_markdown(&self, ast: &AstFragment) -> Result<String, ConversionError>;

    /// Render a Markdown snippet as an HTML fragment, for live preview
    fn markdown_to_html(&self, markdown: &str) -> Result<String, ConversionError>;
}

impl<C: Converter + ?Sized> Converter for &C {
    fn markdown_to_ast(&self, markdown: &str) -> Result<AstDocument, ConversionError> {
        (**self).markdown_to_ast(markdown)
    }

    fn ast_to_markdown(&self, ast: &AstFragment) -> Result<String, ConversionError> {
        (**self).ast_to_markdown(ast)
    }

    fn markdown_to_html(&self, markdown: &str) -> Result<String, ConversionError> {
        (**self).markdown_to_html(markdown)
    }
}

impl<C: Converter + ?Sized> Converter for Box<C> {
    fn markdown_to_ast(&self, markdown: &str) -> Result<AstDocument, ConversionError> {
        (**self).markdown_to_ast(markdown)
    }

    fn ast_to_markdown(&self, ast: &AstFragment) -> Result<String, ConversionError> {
        (**self).ast_to_markdown(ast)
    }

    fn markdown_to_html(&self, markdown: &str) -> Result<String, ConversionError> {
        (**self).markdown_to_html(markdown)
    }
}

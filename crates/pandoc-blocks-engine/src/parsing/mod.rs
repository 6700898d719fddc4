//! # Document Parsing
//!
//! Markdown → [`Document`] via the converter's AST.
//!
//! One `markdown_to_ast` call covers the whole document; each top-level node
//! is then classified by [`classify_node`] and its inner content rendered back
//! to Markdown with one `ast_to_markdown` call. Node order is preserved and
//! nothing is dropped or merged.
//!
//! ## Classification
//!
//! | AST node | Block kind  | id source            | content                          |
//! |----------|-------------|----------------------|----------------------------------|
//! | Header   | `heading`   | header attr id       | inlines as `Plain`, right-trimmed|
//! | Div      | `semantic`  | div attr id          | child blocks, untrimmed          |
//! | other    | `paragraph` | node attr id, if any | the node itself, trimmed         |
//!
//! Empty ids are replaced with fresh UUIDs.
//!
//! ## Failure handling
//!
//! [`parse`] never fails: if any converter call fails the whole document
//! degrades to one paragraph block holding the original Markdown verbatim,
//! and the error is handed back in [`ParseOutcome::error`]. [`try_parse`] is
//! the strict variant without the fallback.

use std::collections::HashSet;
use std::time::Instant;

use crate::ast::{AstBlock, AstDocument, AstFragment};
use crate::converter::{ConversionError, Converter};
use crate::editing::Document;
use crate::models::{Attributes, Block, BlockId, BlockKind};

/// Caller passed input that is not usable as Markdown text
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("input is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

/// Result of a parse that always yields a usable document
#[derive(Debug)]
pub struct ParseOutcome {
    pub document: Document,
    /// Set when the converter failed and the document is the verbatim fallback
    pub error: Option<ConversionError>,
}

impl ParseOutcome {
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// Parse Markdown into blocks, degrading to one verbatim block on failure
pub fn parse<C: Converter + ?Sized>(markdown: &str, converter: &C) -> ParseOutcome {
    match try_parse(markdown, converter) {
        Ok(document) => ParseOutcome {
            document,
            error: None,
        },
        Err(error) => {
            log::warn!("Failed to parse Markdown AST, keeping the document as one block: {error}");
            ParseOutcome {
                document: Document::from_blocks(vec![Block::paragraph(markdown)]),
                error: Some(error),
            }
        }
    }
}

/// [`parse`] without the failure report
pub fn parse_document<C: Converter + ?Sized>(markdown: &str, converter: &C) -> Document {
    parse(markdown, converter).document
}

/// [`parse`] for possibly-absent input; `None` behaves like `""`
pub fn parse_optional<C: Converter + ?Sized>(
    markdown: Option<&str>,
    converter: &C,
) -> ParseOutcome {
    parse(markdown.unwrap_or_default(), converter)
}

/// [`parse`] for raw file bytes, rejecting anything that is not UTF-8
pub fn parse_bytes<C: Converter + ?Sized>(
    bytes: &[u8],
    converter: &C,
) -> Result<ParseOutcome, ValidationError> {
    let markdown = std::str::from_utf8(bytes)?;
    Ok(parse(markdown, converter))
}

/// Parse Markdown into blocks, surfacing converter failures
pub fn try_parse<C: Converter + ?Sized>(
    markdown: &str,
    converter: &C,
) -> Result<Document, ConversionError> {
    if markdown.is_empty() {
        return Ok(Document::new());
    }

    let started = Instant::now();
    let AstDocument {
        api_version,
        blocks: nodes,
        ..
    } = converter.markdown_to_ast(markdown)?;
    let node_count = nodes.len();

    let mut blocks = nodes
        .into_iter()
        .map(|node| classify_node(node, &api_version, converter))
        .collect::<Result<Vec<_>, _>>()?;
    ensure_unique_ids(&mut blocks);

    log::debug!(
        "parsed {node_count} top-level nodes from {} bytes in {:?}",
        markdown.len(),
        started.elapsed()
    );
    Ok(Document::from_blocks(blocks))
}

/// Convert one top-level AST node into a block
///
/// `api_version` is the version reported by the converter for the source
/// document; content fragments are wrapped with it so the converter accepts
/// them.
pub fn classify_node<C: Converter + ?Sized>(
    node: AstBlock,
    api_version: &[u32],
    converter: &C,
) -> Result<Block, ConversionError> {
    let render = |blocks: Vec<AstBlock>| {
        let fragment = AstFragment::Document(AstDocument::wrap(api_version.to_vec(), blocks));
        converter.ast_to_markdown(&fragment)
    };

    match node {
        AstBlock::Header {
            level,
            attr,
            inlines,
        } => {
            let id = BlockId::from_source(&attr.id);
            let content = render(vec![AstBlock::plain(inlines)])?;
            let attributes = Attributes {
                id: None,
                classes: attr.classes,
                keyvals: attr.keyvals,
            };
            Ok(Block::heading(id, level, content.trim_end(), attributes))
        }
        AstBlock::Div { attr, blocks } => {
            let id = BlockId::from_source(&attr.id);
            // The body keeps its line structure for the `:::` fences
            let content = render(blocks)?;
            let attributes = Attributes {
                id: None,
                classes: attr.classes,
                keyvals: attr.keyvals,
            };
            Ok(Block::semantic(id, content, attributes))
        }
        other => {
            let id = other
                .attr_id()
                .map(BlockId::from)
                .unwrap_or_else(BlockId::generate);
            let content = render(vec![other])?;
            Ok(Block::paragraph_with_id(id, trim_block_text(&content)))
        }
    }
}

/// Trim surrounding blank space without touching the first line's indent
///
/// Indented code blocks depend on their leading spaces, so only whole blank
/// leading lines are removed.
fn trim_block_text(text: &str) -> String {
    let start = text
        .split_inclusive('\n')
        .take_while(|line| line.trim().is_empty())
        .map(str::len)
        .sum::<usize>();
    text[start..].trim_end().to_string()
}

/// Re-mint ids that repeat an earlier block's id
///
/// Explicit ids written twice in the source would otherwise break the
/// one-block-per-id invariant.
fn ensure_unique_ids(blocks: &mut [Block]) {
    let mut seen = HashSet::new();
    for block in blocks.iter_mut() {
        if seen.contains(&block.id) {
            let fresh = BlockId::generate();
            log::debug!("duplicate block id {} replaced with {fresh}", block.id);
            block.id = fresh;
            if block.kind == BlockKind::Semantic {
                block.attributes.id = Some(block.id.as_str().to_string());
            }
        }
        seen.insert(block.id.clone());
    }
}

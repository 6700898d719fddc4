use std::path::{Path, PathBuf};

use crate::converter::{ConversionError, Converter};
use crate::editing::{Document, reconstruct};
use crate::io::{self, IoError};
use crate::models::BlockId;
use crate::parsing;
use crate::preview::{Preview, PreviewCache};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Io(#[from] IoError),
    #[error("No file path set; use save_as")]
    NoPath,
}

/// State behind one editor surface
///
/// Owns its document outright; two sessions never share blocks. The
/// converter lives inside the preview cache and is borrowed for parsing.
#[derive(Debug)]
pub struct EditorSession<C> {
    document: Document,
    path: Option<PathBuf>,
    dirty: bool,
    previews: PreviewCache<C>,
}

impl<C: Converter> EditorSession<C> {
    pub fn new(converter: C) -> Self {
        Self {
            document: Document::new(),
            path: None,
            dirty: false,
            previews: PreviewCache::new(converter),
        }
    }

    pub fn converter(&self) -> &C {
        self.previews.converter()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Target a file for the next `save` without reading it
    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = Some(path.into());
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Load a file, replacing the current document wholesale
    ///
    /// Returns the converter error when the file had to be kept as one
    /// verbatim block.
    pub fn open(&mut self, path: impl Into<PathBuf>) -> Result<Option<ConversionError>, SessionError> {
        let path = path.into();
        let markdown = io::read_markdown(&path)?;
        let outcome = parsing::parse(&markdown, self.previews.converter());
        log::info!(
            "Opened {} ({} blocks)",
            path.display(),
            outcome.document.len()
        );

        self.document = outcome.document;
        self.path = Some(path);
        self.dirty = false;
        Ok(outcome.error)
    }

    /// Replace the document from a string; detaches from any file
    pub fn load_str(&mut self, markdown: &str) -> Option<ConversionError> {
        let outcome = parsing::parse(markdown, self.previews.converter());
        self.document = outcome.document;
        self.path = None;
        self.dirty = false;
        outcome.error
    }

    pub fn set_block_content(&mut self, id: &BlockId, content: impl Into<String>) -> bool {
        let changed = self.document.set_block_content(id, content);
        self.dirty |= changed;
        changed
    }

    pub fn append_block(&mut self) -> BlockId {
        self.dirty = true;
        self.document.append_block().id.clone()
    }

    pub fn append_semantic(&mut self, environment: &str, title: Option<&str>) -> BlockId {
        self.dirty = true;
        self.document.append_semantic(environment, title).id.clone()
    }

    /// The document reassembled as Markdown
    pub fn markdown(&self) -> String {
        reconstruct(&self.document)
    }

    pub fn save(&mut self) -> Result<&Path, SessionError> {
        let path = self.path.as_deref().ok_or(SessionError::NoPath)?;
        io::write_markdown(path, &reconstruct(&self.document))?;
        self.dirty = false;
        Ok(path)
    }

    pub fn save_as(&mut self, path: impl Into<PathBuf>) -> Result<&Path, SessionError> {
        self.path = Some(path.into());
        self.save()
    }

    pub fn preview(&mut self, id: &BlockId) -> Option<Preview> {
        let block = self.document.get(id)?;
        Some(self.previews.render(block))
    }

    pub fn previews(&mut self) -> Vec<(BlockId, Preview)> {
        self.previews.render_document(&self.document)
    }

    pub fn preview_cache(&mut self) -> &mut PreviewCache<C> {
        &mut self.previews
    }
}

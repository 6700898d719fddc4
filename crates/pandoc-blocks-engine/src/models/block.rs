use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Attributes;

/// Stable identifier for one editor block
///
/// Sourced from the document's own `#id` attribute when present, otherwise a
/// freshly minted UUID. Never derived from block content.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    /// Mint a new random identifier (UUID v4)
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Use the given identifier, or mint a new one when it is empty
    pub fn from_source(id: &str) -> Self {
        if id.is_empty() {
            Self::generate()
        } else {
            Self(id.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for BlockId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for BlockId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The kind of an editor block
///
/// Anything that is neither a header nor a fenced div (lists, code blocks,
/// quotes, tables, rules, raw blocks) lands in the `Paragraph` bucket.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Heading,
    Semantic,
    #[default]
    Paragraph,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Heading => "heading",
            BlockKind::Semantic => "semantic",
            BlockKind::Paragraph => "paragraph",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One independently editable unit of a document
///
/// `content` holds the block's *inner* Markdown: heading text without the `#`
/// markers or attribute suffix, a div's body without the `:::` fences, or a
/// paragraph-bucket node's own Markdown rendering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    pub content: String,
    #[serde(default)]
    pub attributes: Attributes,
    /// Heading depth (1-6), 0 for non-headings
    #[serde(default)]
    pub level: u8,
}

impl Block {
    /// A paragraph block with a fresh identifier
    pub fn paragraph(content: impl Into<String>) -> Self {
        Self::paragraph_with_id(BlockId::generate(), content)
    }

    pub fn paragraph_with_id(id: BlockId, content: impl Into<String>) -> Self {
        Self {
            id,
            kind: BlockKind::Paragraph,
            content: content.into(),
            attributes: Attributes::default(),
            level: 0,
        }
    }

    /// An empty paragraph block, as produced by "add block"
    pub fn empty() -> Self {
        Self::paragraph(String::new())
    }

    /// A heading block; any id carried in `attributes` is dropped since the
    /// identifier lives in `id`
    pub fn heading(
        id: BlockId,
        level: u8,
        content: impl Into<String>,
        mut attributes: Attributes,
    ) -> Self {
        attributes.id = None;
        Self {
            id,
            kind: BlockKind::Heading,
            content: content.into(),
            attributes,
            level,
        }
    }

    /// A semantic (fenced div) block; `attributes.id` is mirrored from `id`
    pub fn semantic(id: BlockId, content: impl Into<String>, mut attributes: Attributes) -> Self {
        attributes.id = Some(id.as_str().to_string());
        Self {
            id,
            kind: BlockKind::Semantic,
            content: content.into(),
            attributes,
            level: 0,
        }
    }

    pub fn is_heading(&self) -> bool {
        self.kind == BlockKind::Heading
    }

    /// First line of the content, for list displays
    pub fn summary(&self) -> &str {
        self.content.lines().next().unwrap_or("")
    }
}

use serde::{Deserialize, Serialize};

use crate::models::{Attributes, Block, BlockId};

/// Environment classes offered when inserting a semantic block
pub const ENVIRONMENTS: [&str; 4] = ["theorem", "lemma", "definition", "proof"];

/// An ordered, never-empty sequence of editor blocks
///
/// Order is the document's reading order and is preserved through parse,
/// edit and reconstruct. Every constructor guarantees at least one block: an
/// empty input becomes a single empty paragraph.
///
/// Blocks are mutated in place by id; a `Document` is never re-parsed
/// piecemeal. Opening a file replaces the whole value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Block>", into = "Vec<Block>")]
pub struct Document {
    blocks: Vec<Block>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// A document holding one empty paragraph
    pub fn new() -> Self {
        Self {
            blocks: vec![Block::empty()],
        }
    }

    /// Wrap a block list, substituting one empty paragraph for an empty list
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        if blocks.is_empty() {
            Self::new()
        } else {
            Self { blocks }
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| &b.id == id)
    }

    pub fn position(&self, id: &BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| &b.id == id)
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.position(id).is_some()
    }

    /// Replace the content of the block with the given id
    ///
    /// No other field changes. An unknown id is a no-op; returns whether a
    /// block was updated.
    pub fn set_block_content(&mut self, id: &BlockId, content: impl Into<String>) -> bool {
        match self.blocks.iter_mut().find(|b| &b.id == id) {
            Some(block) => {
                block.content = content.into();
                true
            }
            None => {
                log::debug!("set_block_content: no block with id {id}");
                false
            }
        }
    }

    /// Append an empty paragraph with a fresh, unused id
    pub fn append_block(&mut self) -> &Block {
        let mut block = Block::empty();
        block.id = self.fresh_id();
        self.push(block)
    }

    /// Append an empty fenced div of the given environment class
    ///
    /// A non-blank `title` is stored as the `title` keyval. The block gets a
    /// fresh id like [`Document::append_block`].
    pub fn append_semantic(&mut self, environment: &str, title: Option<&str>) -> &Block {
        let mut attributes = Attributes {
            id: None,
            classes: vec![environment.to_string()],
            keyvals: Vec::new(),
        };
        if let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) {
            attributes.set_keyval("title", title);
        }
        let id = self.fresh_id();
        self.push(Block::semantic(id, "", attributes))
    }

    fn fresh_id(&self) -> BlockId {
        let mut id = BlockId::generate();
        while self.contains(&id) {
            id = BlockId::generate();
        }
        id
    }

    fn push(&mut self, block: Block) -> &Block {
        self.blocks.push(block);
        &self.blocks[self.blocks.len() - 1]
    }
}

impl From<Vec<Block>> for Document {
    fn from(blocks: Vec<Block>) -> Self {
        Self::from_blocks(blocks)
    }
}

impl From<Document> for Vec<Block> {
    fn from(doc: Document) -> Self {
        doc.blocks
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::reconstruct;
    use crate::models::BlockKind;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::collections::HashSet;

    fn sample() -> Document {
        Document::from_blocks(vec![
            Block::heading("intro".into(), 1, "Intro", Attributes::default()),
            Block::paragraph_with_id("p1".into(), "Some text."),
        ])
    }

    // ============ Construction ============

    #[test]
    fn test_new_document_has_one_empty_paragraph() {
        let doc = Document::new();
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.blocks()[0].kind, BlockKind::Paragraph);
        assert_eq!(doc.blocks()[0].content, "");
        assert!(!doc.is_empty());
    }

    #[test]
    fn test_from_empty_blocks_is_never_empty() {
        let doc = Document::from_blocks(Vec::new());
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.blocks()[0].content, "");
    }

    #[test]
    fn test_deserialize_empty_list_is_never_empty() {
        let doc: Document = serde_json::from_str("[]").unwrap();
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn test_json_roundtrip() {
        let doc = sample();
        let json = serde_json::to_string(&doc).unwrap();
        let back: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
    }

    // ============ set_block_content ============

    #[test]
    fn test_set_block_content_updates_only_content() {
        let mut doc = sample();
        let before = doc.blocks()[0].clone();

        assert!(doc.set_block_content(&"intro".into(), "Introduction"));

        let after = &doc.blocks()[0];
        assert_eq!(after.content, "Introduction");
        assert_eq!(after.id, before.id);
        assert_eq!(after.kind, before.kind);
        assert_eq!(after.level, before.level);
        assert_eq!(after.attributes, before.attributes);
        assert_eq!(doc.blocks()[1].content, "Some text.");
    }

    #[test]
    fn test_set_block_content_unknown_id_is_noop() {
        let mut doc = sample();
        let before = doc.clone();

        assert!(!doc.set_block_content(&"missing".into(), "ignored"));
        assert_eq!(doc, before);
    }

    // ============ append_block ============

    #[test]
    fn test_append_block_adds_empty_paragraph_at_end() {
        let mut doc = sample();
        let appended = doc.append_block().clone();

        assert_eq!(doc.len(), 3);
        assert_eq!(doc.blocks()[2], appended);
        assert_eq!(appended.kind, BlockKind::Paragraph);
        assert_eq!(appended.content, "");
        assert_eq!(appended.level, 0);
        assert!(appended.attributes.is_empty());
    }

    #[test]
    fn test_append_block_ids_are_distinct() {
        let mut doc = sample();
        for _ in 0..50 {
            doc.append_block();
        }
        let ids: HashSet<&BlockId> = doc.iter().map(|b| &b.id).collect();
        assert_eq!(ids.len(), doc.len());
    }

    // ============ append_semantic ============

    #[test]
    fn test_append_semantic_with_title() {
        let mut doc = sample();
        let appended = doc.append_semantic("theorem", Some("Main Result")).clone();

        assert_eq!(doc.len(), 3);
        assert_eq!(appended.kind, BlockKind::Semantic);
        assert_eq!(appended.content, "");
        assert_eq!(appended.level, 0);
        assert_eq!(appended.attributes.classes, vec!["theorem"]);
        assert_eq!(appended.attributes.keyval("title"), Some("Main Result"));
        assert_eq!(appended.attributes.id.as_deref(), Some(appended.id.as_str()));
        let expected = format!(r#"::: {{#{} .theorem title="Main Result"}}"#, appended.id);
        assert!(reconstruct(&doc).ends_with(&format!("Some text.\n\n{expected}\n\n:::")));
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    #[case(Some("   "))]
    fn test_append_semantic_without_title(#[case] title: Option<&str>) {
        let mut doc = sample();
        let appended = doc.append_semantic("proof", title).clone();

        assert!(appended.attributes.keyvals.is_empty());
        assert!(reconstruct(&doc).ends_with(&format!("::: {{#{} .proof}}\n\n:::", appended.id)));
    }

    #[test]
    fn test_append_semantic_ids_are_distinct() {
        let mut doc = sample();
        for environment in ENVIRONMENTS.iter().cycle().take(40) {
            doc.append_semantic(environment, None);
            doc.append_block();
        }
        let ids: HashSet<&BlockId> = doc.iter().map(|b| &b.id).collect();
        assert_eq!(ids.len(), doc.len());
        assert_eq!(doc.len(), 82);
    }

    #[test]
    fn test_lookup_by_id() {
        let doc = sample();
        assert_eq!(doc.position(&"p1".into()), Some(1));
        assert_eq!(doc.get(&"intro".into()).map(|b| b.level), Some(1));
        assert!(!doc.contains(&"nope".into()));
    }
}

/*!
 * # Editing Core Module
 *
 * The bidirectional document/block model.
 *
 * ## Architecture Overview
 *
 * ### 1. Explicit Document Ownership
 * - A [`Document`] is an ordered, never-empty `Vec<Block>`
 * - The editor surface owns one instance per open file and is its sole writer
 * - There is no ambient/global editor state; every operation takes the
 *   document by reference
 *
 * ### 2. Structural Round Trip
 * - **Parse** (`crate::parsing`): Markdown → Pandoc AST → blocks, one converter
 *   call for the document plus one per block for content extraction
 * - **Reconstruct** ([`reconstruct()`]): blocks → Markdown, purely in Rust,
 *   re-emitting `{#id .class key="value"}` suffixes and `:::` fences
 * - Fidelity is structural (ids, kinds, levels, attributes, content), not
 *   byte-for-byte
 *
 * ### 3. In-place Block Mutation
 * - [`Document::set_block_content`] edits one block's content by id
 * - [`Document::append_block`] adds an empty paragraph with a fresh id
 * - [`Document::append_semantic`] adds an empty `:::` environment (theorem,
 *   lemma, ...) with an optional title
 * - Blocks are never re-parsed individually
 *
 * ## Usage Pattern
 *
 * ```rust,ignore
 * use pandoc_blocks_engine::{PandocConverter, parsing, editing::reconstruct};
 *
 * let converter = PandocConverter::default();
 * let mut doc = parsing::parse_document("# Hello {#hello}\n\nWorld", &converter);
 *
 * let id = doc.blocks()[1].id.clone();
 * doc.set_block_content(&id, "Everyone");
 *
 * assert_eq!(reconstruct(&doc), "# Hello {#hello}\n\nEveryone");
 * ```
 */

pub mod document;
pub mod reconstruct;

pub use document::{Document, ENVIRONMENTS};
pub use reconstruct::{attribute_suffix, emit_block, reconstruct};

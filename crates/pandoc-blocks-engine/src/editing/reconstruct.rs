use crate::editing::Document;
use crate::models::{Block, BlockKind};

/// Separator placed between every pair of adjacent blocks
pub const BLOCK_SEPARATOR: &str = "\n\n";

/// Reassemble a document into a single Markdown string
///
/// Pure: no converter calls and no failure mode. Heading and div marker
/// syntax is re-synthesized from stored attributes; paragraph-bucket blocks
/// are emitted verbatim.
pub fn reconstruct(document: &Document) -> String {
    document
        .iter()
        .map(emit_block)
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}

/// Markdown for a single block
pub fn emit_block(block: &Block) -> String {
    match block.kind {
        BlockKind::Heading => emit_heading(block),
        BlockKind::Semantic => emit_semantic(block),
        BlockKind::Paragraph => block.content.clone(),
    }
}

fn emit_heading(block: &Block) -> String {
    let level = usize::from(block.level.clamp(1, 6));
    // The block id is authoritative; an `id` keyval would emit it twice
    let keyvals: Vec<(String, String)> = block
        .attributes
        .keyvals
        .iter()
        .filter(|(key, _)| key != "id")
        .cloned()
        .collect();
    let suffix = attribute_suffix(
        Some(block.id.as_str()),
        &block.attributes.classes,
        &keyvals,
    );
    format!("{} {}{}", "#".repeat(level), heading_text(&block.content), suffix)
}

/// ATX headings end at the first newline, so content lines are folded into one
fn heading_text(content: &str) -> String {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn emit_semantic(block: &Block) -> String {
    let attributes = &block.attributes;
    let id = attributes
        .id
        .as_deref()
        .filter(|id| !id.is_empty())
        .unwrap_or(block.id.as_str());
    let suffix = attribute_suffix(Some(id), &attributes.classes, &attributes.keyvals);

    let content = &block.content;
    let body = if content.is_empty() {
        "\n".to_string()
    } else if content.ends_with('\n') {
        content.clone()
    } else {
        format!("{content}\n")
    };

    format!(":::{suffix}\n{body}:::")
}

/// Build the ` {#id .class key="value"}` suffix shared by headings and divs
///
/// Returns an empty string when there is nothing to emit. Tokens are the id
/// first, then classes in order, then keyvals in insertion order. Empty ids
/// and class names are skipped.
pub fn attribute_suffix(
    id: Option<&str>,
    classes: &[String],
    keyvals: &[(String, String)],
) -> String {
    let mut tokens = Vec::with_capacity(1 + classes.len() + keyvals.len());

    if let Some(id) = id.filter(|id| !id.is_empty()) {
        tokens.push(format!("#{id}"));
    }
    tokens.extend(
        classes
            .iter()
            .filter(|class| !class.is_empty())
            .map(|class| format!(".{class}")),
    );
    tokens.extend(
        keyvals
            .iter()
            .filter(|(key, _)| !key.is_empty())
            .map(|(key, value)| format!("{key}=\"{}\"", escape_value(value))),
    );

    if tokens.is_empty() {
        String::new()
    } else {
        format!(" {{{}}}", tokens.join(" "))
    }
}

fn escape_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

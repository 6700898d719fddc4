//! Tests against a real `pandoc` binary; each returns early when none is installed.

use pandoc_blocks_engine::{
    BlockKind, Converter, PandocConverter, PandocOptions, PreviewCache, parse, parse_document,
    reconstruct, render_page,
};
use pretty_assertions::assert_eq;

fn pandoc() -> Option<PandocConverter> {
    match PandocConverter::locate(PandocOptions::default()) {
        Ok(converter) => Some(converter),
        Err(e) => {
            eprintln!("skipping: {e}");
            None
        }
    }
}

#[test]
fn test_heading_attribute_fidelity() {
    let Some(pandoc) = pandoc() else { return };

    let doc = parse_document("# Title {#custom-id key=\"v\"}", &pandoc);

    assert_eq!(doc.len(), 1);
    let block = &doc.blocks()[0];
    assert_eq!(block.kind, BlockKind::Heading);
    assert_eq!(block.level, 1);
    assert_eq!(block.id.as_str(), "custom-id");
    assert_eq!(block.content, "Title");
    assert_eq!(block.attributes.keyval("key"), Some("v"));
    assert_eq!(block.attributes.keyval("id"), None);
}

#[test]
fn test_semantic_div_fidelity() {
    let Some(pandoc) = pandoc() else { return };

    let doc = parse_document(":::{#box .theorem}\nBody text.\n:::", &pandoc);

    assert_eq!(doc.len(), 1);
    let block = &doc.blocks()[0];
    assert_eq!(block.kind, BlockKind::Semantic);
    assert_eq!(block.id.as_str(), "box");
    assert!(block.attributes.classes.contains(&"theorem".to_string()));
    assert!(block.content.contains("Body text."));
}

#[test]
fn test_structural_round_trip() {
    let Some(pandoc) = pandoc() else { return };
    let markdown = "# Intro {#intro .unnumbered}\n\n\
                    Some *emphasis* and math $x^2$.\n\n\
                    ::: {#note .warning title=\"Careful\"}\n\
                    Inside the note.\n\
                    :::\n\n\
                    ## Second {#second}\n\n\
                    - one\n- two";

    let first = parse(markdown, &pandoc);
    assert!(!first.is_degraded());
    let second = parse_document(&reconstruct(&first.document), &pandoc);

    assert_eq!(second.len(), first.document.len());
    for (a, b) in first.document.iter().zip(second.iter()) {
        assert_eq!(b.kind, a.kind);
        assert_eq!(b.level, a.level);
        assert_eq!(b.content, a.content);
        assert_eq!(b.attributes, a.attributes);
        if a.kind != BlockKind::Paragraph {
            assert_eq!(b.id, a.id);
        }
    }
}

#[test]
fn test_auto_identifiers_become_block_ids() {
    let Some(pandoc) = pandoc() else { return };

    let doc = parse_document("# Hello World", &pandoc);

    assert_eq!(doc.blocks()[0].id.as_str(), "hello-world");
}

#[test]
fn test_preview_renders_html() {
    let Some(pandoc) = pandoc() else { return };

    let html = pandoc.markdown_to_html("**bold**").unwrap();
    assert!(html.contains("<strong>bold</strong>"));

    let doc = parse_document("# A {#a}\n\nText", &pandoc);
    let mut cache = PreviewCache::new(&pandoc);
    let page = render_page(&doc, &mut cache);
    assert!(page.contains(r#"id="preview-block-a""#));
}

#[test]
fn test_long_heading_survives_round_trip() {
    let Some(pandoc) = pandoc() else { return };
    let title = "A fairly long section heading that goes well past seventy-two columns of text";

    let first = parse_document(&format!("## {title} {{#long}}\n\nBody."), &pandoc);
    assert_eq!(first.blocks()[0].content, title);
    let second = parse_document(&reconstruct(&first), &pandoc);

    let kinds: Vec<_> = second.iter().map(|b| b.kind).collect();
    assert_eq!(kinds, vec![BlockKind::Heading, BlockKind::Paragraph]);
    assert_eq!(second.blocks()[0].id.as_str(), "long");
    assert_eq!(second.blocks()[0].content, title);
}

#[test]
fn test_div_body_keeps_nested_attributes() {
    let Some(pandoc) = pandoc() else { return };
    let markdown = "::: {#box .theorem}\n\
                    ## Nested {#inner}\n\n\
                    ```rust\n\
                    fn main() {}\n\
                    ```\n\
                    :::";

    let doc = parse_document(markdown, &pandoc);

    let body = &doc.blocks()[0].content;
    assert!(body.contains("{#inner}"), "nested heading id lost: {body}");
    assert!(body.contains("rust"), "code language lost: {body}");
    assert!(body.contains("fn main() {}"));
}

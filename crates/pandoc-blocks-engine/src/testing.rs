//! Scripted converter doubles
//!
//! [`FakeConverter`] understands just enough Markdown to exercise the block
//! parser without a `pandoc` install: ATX headings with `{...}` attributes,
//! `:::` fenced divs (nested), backtick code fences and plain paragraphs.
//! Inline markup is not interpreted; a paragraph is one `Str` node.
//!
//! [`FailingConverter`] fails every call.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Value, json};

use crate::ast::{AstBlock, AstDocument, AstFragment, Attr, DEFAULT_API_VERSION};
use crate::converter::{ConversionError, Converter};

/// In-process stand-in for `pandoc`
#[derive(Debug, Default)]
pub struct FakeConverter {
    fail_ast_to_markdown: bool,
    fail_html_marker: Option<String>,
    ast_calls: AtomicUsize,
    markdown_calls: AtomicUsize,
    html_calls: AtomicUsize,
}

impl FakeConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every AST→Markdown call fail
    pub fn fail_ast_to_markdown(mut self) -> Self {
        self.fail_ast_to_markdown = true;
        self
    }

    /// Make HTML rendering fail for any snippet containing `marker`
    pub fn fail_html_containing(mut self, marker: impl Into<String>) -> Self {
        self.fail_html_marker = Some(marker.into());
        self
    }

    pub fn ast_calls(&self) -> usize {
        self.ast_calls.load(Ordering::SeqCst)
    }

    pub fn markdown_calls(&self) -> usize {
        self.markdown_calls.load(Ordering::SeqCst)
    }

    pub fn html_calls(&self) -> usize {
        self.html_calls.load(Ordering::SeqCst)
    }
}

impl Converter for FakeConverter {
    fn markdown_to_ast(&self, markdown: &str) -> Result<AstDocument, ConversionError> {
        self.ast_calls.fetch_add(1, Ordering::SeqCst);
        let lines: Vec<&str> = markdown.lines().collect();
        Ok(AstDocument::wrap(
            DEFAULT_API_VERSION.to_vec(),
            parse_lines(&lines),
        ))
    }

    fn ast_to_markdown(&self, ast: &AstFragment) -> Result<String, ConversionError> {
        self.markdown_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_ast_to_markdown {
            return Err(ConversionError::Unavailable(
                "scripted ast_to_markdown failure".to_string(),
            ));
        }
        render_blocks(ast.blocks())
    }

    fn markdown_to_html(&self, markdown: &str) -> Result<String, ConversionError> {
        self.html_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(marker) = &self.fail_html_marker
            && markdown.contains(marker.as_str())
        {
            return Err(ConversionError::Failed {
                status: "exit status: 64".to_string(),
                message: format!("cannot render {marker}"),
            });
        }
        Ok(format!("<p>{}</p>", html_escape::encode_text(markdown)))
    }
}

/// Converter whose every call fails
#[derive(Debug, Default)]
pub struct FailingConverter {
    calls: AtomicUsize,
}

impl FailingConverter {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> Result<T, ConversionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ConversionError::Unavailable("converter is offline".to_string()))
    }
}

impl Converter for FailingConverter {
    fn markdown_to_ast(&self, _markdown: &str) -> Result<AstDocument, ConversionError> {
        self.fail()
    }

    fn ast_to_markdown(&self, _ast: &AstFragment) -> Result<String, ConversionError> {
        self.fail()
    }

    fn markdown_to_html(&self, _markdown: &str) -> Result<String, ConversionError> {
        self.fail()
    }
}

// ============ Markdown → AST ============

fn parse_lines(lines: &[&str]) -> Vec<AstBlock> {
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        if line.trim().is_empty() {
            i += 1;
        } else if let Some(header) = parse_heading(line) {
            blocks.push(header);
            i += 1;
        } else if let Some(attr) = div_opener(line) {
            let (body, next) = collect_div(lines, i + 1);
            blocks.push(AstBlock::Div {
                attr,
                blocks: parse_lines(body),
            });
            i = next;
        } else if let Some(info) = line.trim_start().strip_prefix("```") {
            let start = i + 1;
            let mut end = start;
            while end < lines.len() && !lines[end].trim_start().starts_with("```") {
                end += 1;
            }
            let code = lines[start..end].join("\n");
            blocks.push(AstBlock::Other(json!({
                "t": "CodeBlock",
                "c": [Value::from(parse_attr(info.trim())), code]
            })));
            i = end + 1;
        } else {
            let start = i;
            while i < lines.len() && !lines[i].trim().is_empty() {
                i += 1;
            }
            let text = lines[start..i].join("\n");
            blocks.push(AstBlock::Other(json!({
                "t": "Para",
                "c": [{"t": "Str", "c": text}]
            })));
        }
    }

    blocks
}

fn parse_heading(line: &str) -> Option<AstBlock> {
    let level = line.chars().take_while(|&c| c == '#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    let rest = line[level..].strip_prefix(' ')?;

    let (text, attr) = match rest.rfind(" {") {
        Some(at) if rest.ends_with('}') => (&rest[..at], parse_attr(&rest[at + 1..])),
        _ => (rest, Attr::default()),
    };

    Some(AstBlock::Header {
        level: level as u8,
        attr,
        inlines: vec![json!({"t": "Str", "c": text.trim()})],
    })
}

fn is_fence_close(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 3 && trimmed.chars().all(|c| c == ':')
}

fn div_opener(line: &str) -> Option<Attr> {
    let trimmed = line.trim();
    let rest = trimmed.strip_prefix(":::")?.trim_start_matches(':').trim();
    (!rest.is_empty()).then(|| parse_attr(rest))
}

/// Lines up to the matching close fence, and the index after it
fn collect_div<'a>(lines: &'a [&'a str], start: usize) -> (&'a [&'a str], usize) {
    let mut depth = 1;
    let mut i = start;
    while i < lines.len() {
        if div_opener(lines[i]).is_some() {
            depth += 1;
        } else if is_fence_close(lines[i]) {
            depth -= 1;
            if depth == 0 {
                return (&lines[start..i], i + 1);
            }
        }
        i += 1;
    }
    (&lines[start..], lines.len())
}

/// `{#id .class key="value"}` or a bare class word
fn parse_attr(spec: &str) -> Attr {
    let mut attr = Attr::default();
    let Some(inner) = spec.strip_prefix('{').and_then(|s| s.strip_suffix('}')) else {
        if !spec.is_empty() {
            attr.classes.push(spec.to_string());
        }
        return attr;
    };

    for token in attr_tokens(inner) {
        if let Some(id) = token.strip_prefix('#') {
            attr.id = id.to_string();
        } else if let Some(class) = token.strip_prefix('.') {
            attr.classes.push(class.to_string());
        } else if let Some((key, value)) = token.split_once('=') {
            attr.keyvals.push((key.to_string(), value.to_string()));
        }
    }
    attr
}

/// Whitespace-separated tokens; quoted runs keep their spaces and lose the
/// quotes, with `\"` and `\\` unescaped
fn attr_tokens(inner: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' if quoted => current.extend(chars.next()),
            '"' => quoted = !quoted,
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

// ============ AST → Markdown ============

fn render_blocks(blocks: &[AstBlock]) -> Result<String, ConversionError> {
    let rendered = blocks
        .iter()
        .map(render_block)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rendered.join("\n\n"))
}

fn render_block(block: &AstBlock) -> Result<String, ConversionError> {
    match block {
        AstBlock::Header {
            level,
            attr,
            inlines,
        } => Ok(format!(
            "{} {}{}",
            "#".repeat(usize::from(*level)),
            render_inlines(inlines),
            render_attr(attr)
        )),
        AstBlock::Div { attr, blocks } => Ok(format!(
            ":::{}\n{}\n:::",
            render_attr(attr),
            render_blocks(blocks)?
        )),
        AstBlock::Other(value) => {
            let payload = value.get("c");
            match block.type_name() {
                "Para" | "Plain" => {
                    let inlines = payload
                        .and_then(Value::as_array)
                        .cloned()
                        .unwrap_or_default();
                    Ok(render_inlines(&inlines))
                }
                "CodeBlock" => {
                    let attr: Attr = payload
                        .and_then(|c| c.get(0))
                        .cloned()
                        .and_then(|a| serde_json::from_value(a).ok())
                        .unwrap_or_default();
                    let code = payload
                        .and_then(|c| c.get(1))
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    let info = if attr.id.is_empty() && attr.keyvals.is_empty() {
                        attr.classes.join(" ")
                    } else {
                        render_attr(&attr).trim_start().to_string()
                    };
                    Ok(format!("```{info}\n{code}\n```"))
                }
                other => Err(ConversionError::InvalidOutput(format!(
                    "fake converter cannot render {other}"
                ))),
            }
        }
    }
}

fn render_inlines(inlines: &[Value]) -> String {
    inlines
        .iter()
        .map(|inline| match inline.get("t").and_then(Value::as_str) {
            Some("Str") => inline
                .get("c")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            Some("Space") => " ".to_string(),
            Some("SoftBreak") => "\n".to_string(),
            _ => String::new(),
        })
        .collect()
}

fn render_attr(attr: &Attr) -> String {
    let mut tokens = Vec::new();
    if !attr.id.is_empty() {
        tokens.push(format!("#{}", attr.id));
    }
    tokens.extend(attr.classes.iter().map(|c| format!(".{c}")));
    tokens.extend(attr.keyvals.iter().map(|(k, v)| format!("{k}=\"{v}\"")));
    if tokens.is_empty() {
        String::new()
    } else {
        format!(" {{{}}}", tokens.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fake_parses_nested_divs() {
        let doc = FakeConverter::new()
            .markdown_to_ast("::: outer\nbefore\n\n::: {#inner}\ndeep\n:::\n\nafter\n:::")
            .unwrap();

        assert_eq!(doc.blocks.len(), 1);
        let AstBlock::Div { attr, blocks } = &doc.blocks[0] else {
            panic!("expected div");
        };
        assert_eq!(attr.classes, vec!["outer"]);
        let types: Vec<&str> = blocks.iter().map(AstBlock::type_name).collect();
        assert_eq!(types, vec!["Para", "Div", "Para"]);
    }

    #[test]
    fn test_fake_keeps_spaces_in_quoted_values() {
        let attr = parse_attr(r#"{#main .theorem title="Main Result" note="say \"hi\""}"#);

        assert_eq!(attr.id, "main");
        assert_eq!(attr.classes, vec!["theorem"]);
        assert_eq!(
            attr.keyvals,
            vec![
                ("title".to_string(), "Main Result".to_string()),
                ("note".to_string(), r#"say "hi""#.to_string()),
            ]
        );
    }

    #[test]
    fn test_fake_counts_calls() {
        let fake = FakeConverter::new();
        fake.markdown_to_ast("x").unwrap();
        fake.markdown_to_html("x").unwrap();
        fake.markdown_to_html("y").unwrap();

        assert_eq!(fake.ast_calls(), 1);
        assert_eq!(fake.markdown_calls(), 0);
        assert_eq!(fake.html_calls(), 2);
    }

    #[test]
    fn test_fake_html_escapes_and_fails_on_marker() {
        let fake = FakeConverter::new().fail_html_containing("BOOM");
        assert_eq!(fake.markdown_to_html("a < b").unwrap(), "<p>a &lt; b</p>");
        assert!(fake.markdown_to_html("x BOOM y").is_err());
    }

    #[test]
    fn test_failing_converter_fails_everything() {
        let failing = FailingConverter::default();
        assert!(failing.markdown_to_ast("x").is_err());
        assert!(failing.markdown_to_html("x").is_err());
        assert!(failing
            .ast_to_markdown(&AstFragment::Blocks(Vec::new()))
            .is_err());
        assert_eq!(failing.calls(), 3);
    }
}

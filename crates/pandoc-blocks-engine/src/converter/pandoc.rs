use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::OnceLock;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use regex::Regex;
use serde_json::Value;

use crate::ast::{AstDocument, AstFragment};
use crate::converter::{ConversionError, Converter};

/// Reader used for whole-document parsing
pub const MARKDOWN_READER: &str = "markdown+pipe_tables+strikeout+auto_identifiers+smart+tex_math_dollars+raw_tex+citations+fenced_divs+bracketed_spans+definition_lists";

/// Writer used when rendering AST fragments back to editable Markdown
pub const MARKDOWN_WRITER: &str = "markdown_strict+pipe_tables+strikeout+auto_identifiers+smart+tex_math_dollars+raw_tex-citations+fenced_divs+bracketed_spans+definition_lists+header_attributes+fenced_code_blocks+fenced_code_attributes+backtick_code_blocks";

/// Extra reader extension enabled for previews so `\(...\)` math renders
const PREVIEW_EXTENSIONS: &str = "+tex_math_single_backslash";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How to invoke pandoc
#[derive(Clone, Debug, PartialEq)]
pub struct PandocOptions {
    pub program: PathBuf,
    pub timeout: Duration,
    pub reader: String,
    pub writer: String,
    pub mathjax: bool,
    pub highlight_style: Option<String>,
}

impl Default for PandocOptions {
    fn default() -> Self {
        Self {
            program: PathBuf::from("pandoc"),
            timeout: DEFAULT_TIMEOUT,
            reader: MARKDOWN_READER.to_string(),
            writer: MARKDOWN_WRITER.to_string(),
            mathjax: true,
            highlight_style: Some("pygments".to_string()),
        }
    }
}

impl PandocOptions {
    fn ast_args(&self) -> Vec<String> {
        vec![
            "-f".into(),
            self.reader.clone(),
            "-t".into(),
            "json".into(),
            "--preserve-tabs".into(),
        ]
    }

    fn markdown_args(&self) -> Vec<String> {
        vec![
            "-f".into(),
            "json".into(),
            "-t".into(),
            self.writer.clone(),
            "--preserve-tabs".into(),
            // Wrapped heading text would spill onto a second line
            "--wrap=none".into(),
        ]
    }

    fn html_args(&self) -> Vec<String> {
        let mut args = vec![
            "-f".into(),
            format!("{}{PREVIEW_EXTENSIONS}", self.reader),
            "-t".into(),
            "html".into(),
        ];
        if self.mathjax {
            args.push("--mathjax".into());
        }
        if let Some(style) = &self.highlight_style {
            args.push("--highlight-style".into());
            args.push(style.clone());
        }
        args
    }
}

/// Converter backed by the `pandoc` executable
///
/// Each call is one blocking subprocess invocation bounded by
/// [`PandocOptions::timeout`]. A timed-out child is killed and reported as
/// [`ConversionError::Timeout`].
#[derive(Clone, Debug, Default)]
pub struct PandocConverter {
    options: PandocOptions,
}

impl PandocConverter {
    pub fn new(options: PandocOptions) -> Self {
        Self { options }
    }

    /// Resolve the program through `PATH` up front
    pub fn locate(mut options: PandocOptions) -> Result<Self, ConversionError> {
        let resolved =
            which::which(&options.program).map_err(|_| ConversionError::ToolNotFound {
                program: options.program.clone(),
            })?;
        options.program = resolved;
        Ok(Self { options })
    }

    pub fn options(&self) -> &PandocOptions {
        &self.options
    }

    /// Version reported by `pandoc --version`, e.g. `3.1.3`
    pub fn version(&self) -> Result<String, ConversionError> {
        let output = self.run(&["--version".to_string()], "")?;
        parse_version(&output).ok_or_else(|| {
            ConversionError::InvalidOutput(format!(
                "unrecognised version banner: {}",
                output.lines().next().unwrap_or_default()
            ))
        })
    }

    fn run(&self, args: &[String], input: &str) -> Result<String, ConversionError> {
        let program = &self.options.program;
        let started = Instant::now();

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ConversionError::ToolNotFound {
                    program: program.clone(),
                },
                _ => ConversionError::Spawn(e),
            })?;

        // Pipes are drained on their own threads so a large document cannot
        // deadlock against a full stdout buffer.
        let writer = child.stdin.take().map(|mut stdin| {
            let input = input.to_string();
            thread::spawn(move || stdin.write_all(input.as_bytes()))
        });
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = self.wait_with_timeout(&mut child, started)?;

        // A child that exits without reading stdin breaks the pipe; its exit
        // status is the meaningful signal.
        if let Some(writer) = writer {
            let _ = writer.join();
        }
        let stdout = collect(stdout)?;
        let stderr = collect(stderr)?;

        log::debug!(
            "pandoc {} finished in {:?} ({})",
            args.join(" "),
            started.elapsed(),
            status
        );

        if !status.success() {
            return Err(ConversionError::Failed {
                status: status.to_string(),
                message: error_message(&String::from_utf8_lossy(&stderr)),
            });
        }

        String::from_utf8(stdout)
            .map_err(|e| ConversionError::InvalidOutput(format!("output is not UTF-8: {e}")))
    }

    fn wait_with_timeout(
        &self,
        child: &mut Child,
        started: Instant,
    ) -> Result<ExitStatus, ConversionError> {
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if started.elapsed() >= self.options.timeout {
                let _ = child.kill();
                let _ = child.wait();
                log::warn!(
                    "{} killed after exceeding {:?}",
                    self.options.program.display(),
                    self.options.timeout
                );
                return Err(ConversionError::Timeout {
                    program: self.options.program.clone(),
                    after: self.options.timeout,
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Converter for PandocConverter {
    fn markdown_to_ast(&self, markdown: &str) -> Result<AstDocument, ConversionError> {
        let json = self.run(&self.options.ast_args(), markdown)?;
        serde_json::from_str(&json).map_err(|e| {
            let preview: String = json.chars().take(500).collect();
            ConversionError::InvalidOutput(format!(
                "failed to decode AST JSON ({e}); output began: {preview}"
            ))
        })
    }

    fn ast_to_markdown(&self, ast: &AstFragment) -> Result<String, ConversionError> {
        let input = match ast {
            AstFragment::Document(doc) => serde_json::to_string(doc),
            AstFragment::Blocks(_) => serde_json::to_string(&ast.clone().into_document()),
        }
        .map_err(|e| ConversionError::InvalidOutput(format!("failed to encode AST: {e}")))?;

        let markdown = self.run(&self.options.markdown_args(), &input)?;
        Ok(markdown.trim_end_matches(['\n', '\r']).to_string())
    }

    fn markdown_to_html(&self, markdown: &str) -> Result<String, ConversionError> {
        self.run(&self.options.html_args(), markdown)
    }
}

type Drain = JoinHandle<std::io::Result<Vec<u8>>>;

fn drain<R: Read + Send + 'static>(mut pipe: R) -> Drain {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn collect(handle: Option<Drain>) -> Result<Vec<u8>, ConversionError> {
    match handle {
        Some(handle) => handle
            .join()
            .map_err(|_| ConversionError::Spawn(std::io::Error::other("pipe reader panicked")))?
            .map_err(ConversionError::Spawn),
        None => Ok(Vec::new()),
    }
}

/// Extract the most useful message from pandoc's stderr
///
/// Pandoc sometimes reports internal errors as a JSON array of
/// `{"tag": "PandocError", "message": ...}` objects.
fn error_message(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.starts_with('[')
        && trimmed.ends_with(']')
        && let Ok(Value::Array(items)) = serde_json::from_str::<Value>(trimmed)
        && let Some(first) = items.first()
        && first.get("tag").and_then(Value::as_str) == Some("PandocError")
    {
        let message = first
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or(trimmed);
        return format!("Pandoc internal error: {message}");
    }
    trimmed.to_string()
}

fn parse_version(banner: &str) -> Option<String> {
    static VERSION_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = VERSION_REGEX.get_or_init(|| {
        Regex::new(r"(?m)^pandoc(?:\.exe)?\s+(\d+(?:\.\d+)*)").expect("Invalid version regex")
    });
    regex
        .captures(banner)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstBlock;
    use rstest::rstest;

    fn pandoc() -> Option<PandocConverter> {
        PandocConverter::locate(PandocOptions::default()).ok()
    }

    #[rstest]
    #[case("pandoc 3.1.3\nFeatures: +server +lua\n", Some("3.1.3"))]
    #[case("pandoc.exe 2.19.2\n", Some("2.19.2"))]
    #[case("pandoc 3\n", Some("3"))]
    #[case("something else entirely", None)]
    fn test_parse_version(#[case] banner: &str, #[case] expected: Option<&str>) {
        assert_eq!(parse_version(banner).as_deref(), expected);
    }

    #[test]
    fn test_error_message_prefers_pandoc_json_error() {
        let stderr = r#"[{"tag":"PandocError","message":"unexpected end of input"}]"#;
        assert_eq!(
            error_message(stderr),
            "Pandoc internal error: unexpected end of input"
        );
    }

    #[test]
    fn test_error_message_plain_stderr_is_trimmed() {
        assert_eq!(error_message("  Unknown input format foo\n"), "Unknown input format foo");
    }

    #[test]
    fn test_error_message_other_json_passes_through() {
        assert_eq!(error_message(r#"[{"tag":"Other"}]"#), r#"[{"tag":"Other"}]"#);
    }

    #[test]
    fn test_html_args_follow_options() {
        let options = PandocOptions {
            mathjax: false,
            highlight_style: None,
            ..PandocOptions::default()
        };
        let args = options.html_args();
        assert!(args[1].ends_with("+tex_math_single_backslash"));
        assert!(!args.contains(&"--mathjax".to_string()));
        assert!(!args.contains(&"--highlight-style".to_string()));

        let args = PandocOptions::default().html_args();
        assert!(args.contains(&"--mathjax".to_string()));
        assert!(args.ends_with(&["--highlight-style".to_string(), "pygments".to_string()]));
    }

    #[test]
    fn test_markdown_args_disable_wrapping() {
        let args = PandocOptions::default().markdown_args();
        assert_eq!(args[3], MARKDOWN_WRITER);
        assert!(args.contains(&"--wrap=none".to_string()));
    }

    #[rstest]
    #[case("+header_attributes")]
    #[case("+fenced_code_blocks")]
    #[case("+fenced_code_attributes")]
    #[case("+backtick_code_blocks")]
    fn test_writer_keeps_attribute_syntax(#[case] extension: &str) {
        assert!(MARKDOWN_WRITER.contains(extension));
    }

    #[test]
    fn test_missing_program_is_tool_not_found() {
        let converter = PandocConverter::new(PandocOptions {
            program: PathBuf::from("definitely-not-a-real-pandoc-binary"),
            ..PandocOptions::default()
        });

        let err = converter.markdown_to_html("text").unwrap_err();
        assert!(matches!(err, ConversionError::ToolNotFound { .. }));
    }

    #[test]
    fn test_locate_missing_program_fails() {
        let result = PandocConverter::locate(PandocOptions {
            program: PathBuf::from("definitely-not-a-real-pandoc-binary"),
            ..PandocOptions::default()
        });
        assert!(matches!(result, Err(ConversionError::ToolNotFound { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_slow_program_times_out() {
        // `sleep` ignores stdin and outlives the deadline
        let converter = PandocConverter::new(PandocOptions {
            program: PathBuf::from("sleep"),
            timeout: Duration::from_millis(100),
            ..PandocOptions::default()
        });

        let started = Instant::now();
        let err = converter.run(&["5".to_string()], "").unwrap_err();

        assert!(matches!(err, ConversionError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_is_failed() {
        let converter = PandocConverter::new(PandocOptions {
            program: PathBuf::from("false"),
            ..PandocOptions::default()
        });

        let err = converter.run(&[], "").unwrap_err();
        assert!(matches!(err, ConversionError::Failed { .. }));
    }

    // ============ Tests against a real pandoc (skipped when absent) ============

    #[test]
    fn test_pandoc_parses_header_and_div() {
        let Some(pandoc) = pandoc() else {
            return;
        };

        let doc = pandoc
            .markdown_to_ast("# Title {#custom-id}\n\n::: {#box .theorem}\nBody text.\n:::\n")
            .unwrap();

        assert_eq!(doc.blocks.len(), 2);
        assert!(matches!(&doc.blocks[0], AstBlock::Header { level: 1, attr, .. } if attr.id == "custom-id"));
        assert!(matches!(&doc.blocks[1], AstBlock::Div { attr, .. } if attr.classes == vec!["theorem"]));
    }

    #[test]
    fn test_pandoc_renders_wrapped_fragment() {
        let Some(pandoc) = pandoc() else {
            return;
        };

        let doc = pandoc.markdown_to_ast("Some *emphasis*.").unwrap();
        let fragment = AstFragment::Document(AstDocument::wrap(doc.api_version, doc.blocks));
        let markdown = pandoc.ast_to_markdown(&fragment).unwrap();

        assert_eq!(markdown, "Some *emphasis*.");
    }

    #[test]
    fn test_pandoc_keeps_long_heading_on_one_line() {
        let Some(pandoc) = pandoc() else {
            return;
        };
        let title = "A fairly long section heading that goes well past seventy-two columns of text";

        let doc = pandoc.markdown_to_ast(&format!("# {title}")).unwrap();
        let AstBlock::Header { inlines, .. } = &doc.blocks[0] else {
            panic!("expected a header, got {:?}", doc.blocks[0]);
        };
        let fragment = AstFragment::Document(AstDocument::wrap(
            doc.api_version.clone(),
            vec![AstBlock::plain(inlines.clone())],
        ));
        let markdown = pandoc.ast_to_markdown(&fragment).unwrap();

        assert_eq!(markdown, title);
    }

    #[test]
    fn test_pandoc_version() {
        let Some(pandoc) = pandoc() else {
            return;
        };
        let version = pandoc.version().unwrap();
        assert!(version.chars().next().is_some_and(|c| c.is_ascii_digit()));
    }
}

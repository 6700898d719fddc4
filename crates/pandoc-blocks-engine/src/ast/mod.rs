//! # Pandoc JSON AST
//!
//! Typed view over the subset of Pandoc's JSON AST the document parser
//! inspects. Only `Header` and `Div` are decoded into structured variants;
//! every other block node is carried through as raw JSON so it can be handed
//! back to the converter untouched.
//!
//! Wire shapes (Pandoc API 1.23):
//!
//! - document: `{"pandoc-api-version": [1,23,1], "meta": {}, "blocks": [...]}`
//! - attr: `[id, [classes...], [[key, value]...]]`
//! - Header: `{"t": "Header", "c": [level, attr, [inlines...]]}`
//! - Div: `{"t": "Div", "c": [attr, [blocks...]]}`

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// API version used when wrapping a bare block list into a document
pub const DEFAULT_API_VERSION: [u32; 3] = [1, 23, 1];

#[derive(Debug, thiserror::Error)]
pub enum AstError {
    #[error("AST node has no \"t\" tag")]
    MissingTag,
    #[error("malformed {node} payload: {source}")]
    MalformedPayload {
        node: &'static str,
        source: serde_json::Error,
    },
}

/// Pandoc attribute triple: identifier, classes, key-value pairs
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AttrRepr", into = "AttrRepr")]
pub struct Attr {
    pub id: String,
    pub classes: Vec<String>,
    pub keyvals: Vec<(String, String)>,
}

type AttrRepr = (String, Vec<String>, Vec<(String, String)>);

impl From<AttrRepr> for Attr {
    fn from((id, classes, keyvals): AttrRepr) -> Self {
        Self {
            id,
            classes,
            keyvals,
        }
    }
}

impl From<Attr> for AttrRepr {
    fn from(attr: Attr) -> Self {
        (attr.id, attr.classes, attr.keyvals)
    }
}

/// A top-level (or div-nested) block node
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum AstBlock {
    Header {
        level: u8,
        attr: Attr,
        inlines: Vec<Value>,
    },
    Div {
        attr: Attr,
        blocks: Vec<AstBlock>,
    },
    /// Any other node type, kept verbatim
    Other(Value),
}

impl AstBlock {
    /// `Plain` wrapper around inline content, used to render heading text
    pub fn plain(inlines: Vec<Value>) -> Self {
        AstBlock::Other(json!({ "t": "Plain", "c": inlines }))
    }

    /// The node's `t` tag
    pub fn type_name(&self) -> &str {
        match self {
            AstBlock::Header { .. } => "Header",
            AstBlock::Div { .. } => "Div",
            AstBlock::Other(value) => value.get("t").and_then(Value::as_str).unwrap_or("Unknown"),
        }
    }

    /// Identifier from the node's own attributes, if it carries any
    ///
    /// Header and Div always carry an Attr; of the opaque node types,
    /// CodeBlock, Table and Figure keep theirs in the first payload slot.
    pub fn attr_id(&self) -> Option<&str> {
        let id = match self {
            AstBlock::Header { attr, .. } | AstBlock::Div { attr, .. } => attr.id.as_str(),
            AstBlock::Other(value) => match self.type_name() {
                "CodeBlock" | "Table" | "Figure" => value
                    .get("c")
                    .and_then(|c| c.get(0))
                    .and_then(|attr| attr.get(0))
                    .and_then(Value::as_str)?,
                _ => return None,
            },
        };
        (!id.is_empty()).then_some(id)
    }
}

impl TryFrom<Value> for AstBlock {
    type Error = AstError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let tag = value
            .get("t")
            .and_then(Value::as_str)
            .ok_or(AstError::MissingTag)?;

        match tag {
            "Header" => {
                let payload = value.get("c").cloned().unwrap_or(Value::Null);
                let (level, attr, inlines): (u8, Attr, Vec<Value>) =
                    serde_json::from_value(payload).map_err(|source| {
                        AstError::MalformedPayload {
                            node: "Header",
                            source,
                        }
                    })?;
                Ok(AstBlock::Header {
                    level,
                    attr,
                    inlines,
                })
            }
            "Div" => {
                let payload = value.get("c").cloned().unwrap_or(Value::Null);
                let (attr, blocks): (Attr, Vec<AstBlock>) = serde_json::from_value(payload)
                    .map_err(|source| AstError::MalformedPayload {
                        node: "Div",
                        source,
                    })?;
                Ok(AstBlock::Div { attr, blocks })
            }
            _ => Ok(AstBlock::Other(value)),
        }
    }
}

impl From<Attr> for Value {
    fn from(attr: Attr) -> Self {
        json!([attr.id, attr.classes, attr.keyvals])
    }
}

impl From<AstBlock> for Value {
    fn from(block: AstBlock) -> Self {
        match block {
            AstBlock::Header {
                level,
                attr,
                inlines,
            } => json!({ "t": "Header", "c": [level, Value::from(attr), inlines] }),
            AstBlock::Div { attr, blocks } => {
                let blocks: Vec<Value> = blocks.into_iter().map(Value::from).collect();
                json!({ "t": "Div", "c": [Value::from(attr), blocks] })
            }
            AstBlock::Other(value) => value,
        }
    }
}

/// A complete Pandoc document
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AstDocument {
    #[serde(rename = "pandoc-api-version")]
    pub api_version: Vec<u32>,
    #[serde(default = "empty_meta")]
    pub meta: Value,
    pub blocks: Vec<AstBlock>,
}

fn empty_meta() -> Value {
    Value::Object(Default::default())
}

impl AstDocument {
    /// Minimal valid document around a block list
    pub fn wrap(api_version: Vec<u32>, blocks: Vec<AstBlock>) -> Self {
        Self {
            api_version,
            meta: empty_meta(),
            blocks,
        }
    }
}

/// Input to AST→Markdown conversion
///
/// `Blocks` is a bare block list, wrapped into a minimal document with
/// [`DEFAULT_API_VERSION`] before conversion.
#[derive(Clone, Debug, PartialEq)]
pub enum AstFragment {
    Document(AstDocument),
    Blocks(Vec<AstBlock>),
}

impl AstFragment {
    pub fn is_full_document(&self) -> bool {
        matches!(self, AstFragment::Document(_))
    }

    pub fn blocks(&self) -> &[AstBlock] {
        match self {
            AstFragment::Document(doc) => &doc.blocks,
            AstFragment::Blocks(blocks) => blocks,
        }
    }

    pub fn into_document(self) -> AstDocument {
        match self {
            AstFragment::Document(doc) => doc,
            AstFragment::Blocks(blocks) => AstDocument::wrap(DEFAULT_API_VERSION.to_vec(), blocks),
        }
    }
}

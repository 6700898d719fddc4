pub mod ast;
pub mod converter;
pub mod editing;
pub mod io;
pub mod models;
pub mod parsing;
pub mod preview;
pub mod session;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use ast::{AstBlock, AstDocument, AstFragment, Attr};
pub use converter::{ConversionError, Converter, PandocConverter, PandocOptions};
pub use editing::{Document, ENVIRONMENTS, reconstruct};
pub use io::*;
pub use models::{Attributes, Block, BlockId, BlockKind};
pub use parsing::{ParseOutcome, ValidationError, parse, parse_document, try_parse};
pub use preview::{Preview, PreviewCache, render_page};
pub use session::{EditorSession, SessionError};

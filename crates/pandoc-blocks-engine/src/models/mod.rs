pub mod attributes;
pub mod block;

pub use attributes::Attributes;
pub use block::{Block, BlockId, BlockKind};

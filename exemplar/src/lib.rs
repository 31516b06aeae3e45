pub mod block;
pub mod parser;

use std::path::PathBuf;

use crate::block::Block;

/// A parsed markdown chapter ("atom") and its extracted code listings.
#[derive(Debug, Clone)]
pub struct Atom {
    /// Source file path, used for report ordering and display.
    pub path: PathBuf,
    /// Extracted fenced listings, in document order.
    pub blocks: Vec<Block>,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
}

pub mod error;
mod listing;
mod structural;

pub use error::ParseError;

use std::path::PathBuf;

use crate::Atom;

/// Parser entry point.
pub struct Parser {
    source: String,
    file_id: usize,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser { source, file_id }
    }

    /// Extract every fenced listing from the source markdown.
    ///
    /// Structural errors (an unterminated fence, for example) are returned
    /// alongside the atom rather than aborting it: listings that parsed
    /// cleanly are still verified, and the errors are recorded against the
    /// atom in the final report.
    pub fn parse(&self, path: PathBuf) -> (Atom, Vec<ParseError>) {
        let (blocks, errors) = structural::extract_blocks(&self.source, self.file_id);
        (
            Atom {
                path,
                blocks,
                source_id: self.file_id,
            },
            errors,
        )
    }
}

use std::ops::Range;

/// How a declared expected-output trailer is compared against actual output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// `/* Output: ... */`: byte-exact comparison (modulo trailing newline).
    Exact,
    /// `/* Sample output: ... */`: documented as non-deterministic
    /// (object addresses, random seeds); checked for shape only.
    Sample,
}

/// The expected-output trailer declared at the end of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedOutput {
    /// Declared output text, interior whitespace preserved exactly.
    pub text: String,
    pub mode: OutputMode,
}

/// One fenced code listing extracted from an atom.
/// Blocks are immutable once parsed.
#[derive(Debug, Clone)]
pub struct Block {
    /// File path from the leading label comment (e.g. `// Summary/Foo.kt`),
    /// if the listing declares one.
    pub label: Option<String>,
    /// Declared `package` name, if any. Listings sharing a package within one
    /// atom are staged and run together, in declaration order.
    pub package: Option<String>,
    /// Language from the fence info string (e.g. "kotlin"), if present.
    pub language: Option<String>,
    /// The full listing source text as it appears between the fences.
    pub code: String,
    /// Declared expected output, if any.
    pub expected: Option<ExpectedOutput>,
    /// False when the listing contains no runnable line (blank or comments
    /// only). Such listings are illustrative and are never executed.
    pub runnable: bool,
    /// Position within the atom, 0-based document order.
    pub index: usize,
    /// Byte span in source for error reporting.
    pub span: Range<usize>,
}

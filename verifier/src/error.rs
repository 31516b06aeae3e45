use std::fmt;

/// Unrecoverable environment failure. Per-listing failures (compile errors,
/// crashes, timeouts, mismatches) are data in the report; this is reserved
/// for conditions under which no listing could possibly be verified.
#[derive(Debug)]
pub enum EnvError {
    /// The external toolchain binary cannot be invoked at all.
    ToolchainMissing { command: String, detail: String },
    /// The workspace filesystem is unusable (temp dir creation, staging).
    Io(String),
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvError::ToolchainMissing { command, detail } => {
                write!(f, "toolchain '{}' cannot be invoked: {}", command, detail)
            }
            EnvError::Io(msg) => write!(f, "workspace I/O error: {}", msg),
        }
    }
}

impl std::error::Error for EnvError {}

impl From<std::io::Error> for EnvError {
    fn from(e: std::io::Error) -> Self {
        EnvError::Io(e.to_string())
    }
}

pub mod compare;
pub mod error;
pub mod report;
pub mod runner;
pub mod schedule;
pub mod toolchain;
pub mod workspace;

pub use compare::Verdict;
pub use error::EnvError;
pub use report::{AtomReport, BlockOutcome, BlockStatus, Report};
pub use runner::{ErrorKind, ExecutionResult};
pub use schedule::{CancelToken, CorpusEntry, RunOptions, run_corpus};
pub use toolchain::Toolchain;

use std::path::PathBuf;

use serde::Serialize;

use crate::compare::Verdict;
use crate::runner::ExecutionResult;

/// What happened to one listing over the course of a run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BlockStatus {
    /// Never executed: illustrative listing, or cancelled before its turn.
    Skipped { reason: String },
    Verified {
        result: ExecutionResult,
        verdict: Verdict,
    },
}

/// Outcome for one listing as carried in the final report.
#[derive(Debug, Clone, Serialize)]
pub struct BlockOutcome {
    pub index: usize,
    pub label: Option<String>,
    #[serde(flatten)]
    pub status: BlockStatus,
}

/// Per-atom slice of the report.
#[derive(Debug, Clone, Serialize)]
pub struct AtomReport {
    pub path: PathBuf,
    pub structural_errors: Vec<String>,
    pub blocks: Vec<BlockOutcome>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Totals {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub structural_errors: usize,
}

/// The final, deterministically ordered report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub atoms: Vec<AtomReport>,
    pub totals: Totals,
}

impl Report {
    /// Assemble the final report: atoms sorted by path, listings by index,
    /// so the output is identical regardless of execution order.
    pub fn assemble(mut atoms: Vec<AtomReport>) -> Report {
        atoms.sort_by(|a, b| a.path.cmp(&b.path));
        for atom in &mut atoms {
            atom.blocks.sort_by_key(|b| b.index);
        }

        let mut totals = Totals::default();
        for atom in &atoms {
            totals.structural_errors += atom.structural_errors.len();
            for block in &atom.blocks {
                match &block.status {
                    BlockStatus::Skipped { .. } => totals.skipped += 1,
                    BlockStatus::Verified { verdict, .. } => {
                        if verdict.is_pass() {
                            totals.passed += 1;
                        } else {
                            totals.failed += 1;
                        }
                    }
                }
            }
        }

        Report { atoms, totals }
    }

    pub fn all_passed(&self) -> bool {
        self.totals.failed == 0 && self.totals.structural_errors == 0
    }

    /// Process exit code: 0 all-pass, 1 any listing failure, 2 structural
    /// errors present (structural problems take precedence).
    pub fn exit_code(&self) -> i32 {
        if self.totals.structural_errors > 0 {
            2
        } else if self.totals.failed > 0 {
            1
        } else {
            0
        }
    }
}

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use exemplar::Atom;
use exemplar::block::Block;

use crate::compare;
use crate::error::EnvError;
use crate::report::{AtomReport, BlockOutcome, BlockStatus, Report};
use crate::runner;
use crate::toolchain::Toolchain;

/// Options governing a verification run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Worker threads; 0 means one per available CPU core.
    pub workers: usize,
    /// Wall-clock limit per listing execution.
    pub timeout: Duration,
    /// Cancel the run after the first failing unit.
    pub fail_fast: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            workers: 0,
            timeout: Duration::from_secs(30),
            fail_fast: false,
        }
    }
}

/// Cancellation shared by the scheduler, its workers, and the caller.
/// Cancelling kills in-flight child processes and skips pending units;
/// verdicts completed before the cancel are kept in the partial report.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A parsed atom paired with the structural errors found while extracting it.
#[derive(Debug)]
pub struct CorpusEntry {
    pub atom: Atom,
    pub structural_errors: Vec<String>,
}

impl CorpusEntry {
    pub fn clean(atom: Atom) -> Self {
        CorpusEntry {
            atom,
            structural_errors: Vec::new(),
        }
    }
}

/// One schedulable unit: listings within a single atom that share a
/// workspace and run sequentially.
struct Unit {
    entry_idx: usize,
    block_indices: Vec<usize>,
}

/// Group an atom's runnable listings into units. Listings sharing a declared
/// package form one unit in declaration order; every other runnable listing
/// is a singleton. Unit order follows each unit's first listing.
pub fn plan_units(atom: &Atom) -> Vec<Vec<usize>> {
    let mut units: Vec<Vec<usize>> = Vec::new();
    let mut packages: Vec<(String, usize)> = Vec::new();

    for block in &atom.blocks {
        if !block.runnable {
            continue;
        }
        match &block.package {
            Some(pkg) => {
                if let Some((_, unit_idx)) = packages.iter().find(|(p, _)| p == pkg) {
                    units[*unit_idx].push(block.index);
                } else {
                    packages.push((pkg.clone(), units.len()));
                    units.push(vec![block.index]);
                }
            }
            None => units.push(vec![block.index]),
        }
    }

    units
}

struct UnitOutcome {
    entry_idx: usize,
    results: Vec<(usize, BlockStatus)>,
    fatal: Option<EnvError>,
}

/// Verify a whole corpus: probe the toolchain, fan units out across a
/// bounded worker pool, and assemble the deterministic report.
///
/// Units are independent; the report ordering is fixed post-hoc, so the
/// result is identical no matter how the pool interleaves them.
pub fn run_corpus(
    entries: &[CorpusEntry],
    toolchain: &Toolchain,
    options: &RunOptions,
    cancel: &CancelToken,
) -> Result<Report, EnvError> {
    toolchain.probe()?;

    let workers = if options.workers == 0 {
        thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    } else {
        options.workers
    };

    let mut units: Vec<Unit> = Vec::new();
    for (entry_idx, entry) in entries.iter().enumerate() {
        for block_indices in plan_units(&entry.atom) {
            units.push(Unit {
                entry_idx,
                block_indices,
            });
        }
    }

    // Skeleton report: every listing starts out skipped; the collector
    // fills in verified outcomes as units complete.
    let mut atoms: Vec<AtomReport> = entries
        .iter()
        .map(|entry| AtomReport {
            path: entry.atom.path.clone(),
            structural_errors: entry.structural_errors.clone(),
            blocks: entry
                .atom
                .blocks
                .iter()
                .map(|b| BlockOutcome {
                    index: b.index,
                    label: b.label.clone(),
                    status: BlockStatus::Skipped {
                        reason: if b.runnable {
                            "cancelled".to_string()
                        } else {
                            "not runnable".to_string()
                        },
                    },
                })
                .collect(),
        })
        .collect();

    let next = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel::<UnitOutcome>();
    let mut fatal: Option<EnvError> = None;

    thread::scope(|scope| {
        let units = &units;
        let next = &next;
        for _ in 0..workers {
            let tx = tx.clone();
            scope.spawn(move || {
                loop {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let i = next.fetch_add(1, Ordering::SeqCst);
                    if i >= units.len() {
                        break;
                    }
                    let unit = &units[i];
                    let atom = &entries[unit.entry_idx].atom;
                    let blocks: Vec<&Block> = unit
                        .block_indices
                        .iter()
                        .map(|&bi| &atom.blocks[bi])
                        .collect();

                    let outcome = match runner::run_unit(&blocks, toolchain, options.timeout, cancel)
                    {
                        Ok(results) => UnitOutcome {
                            entry_idx: unit.entry_idx,
                            results: results
                                .into_iter()
                                .map(|(idx, result)| {
                                    let verdict = compare::judge(
                                        atom.blocks[idx].expected.as_ref(),
                                        &result,
                                    );
                                    (idx, BlockStatus::Verified { result, verdict })
                                })
                                .collect(),
                            fatal: None,
                        },
                        Err(e) => UnitOutcome {
                            entry_idx: unit.entry_idx,
                            results: Vec::new(),
                            fatal: Some(EnvError::Io(e.to_string())),
                        },
                    };

                    if tx.send(outcome).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        for outcome in rx {
            if let Some(e) = outcome.fatal {
                fatal.get_or_insert(e);
                cancel.cancel();
                continue;
            }
            let any_failed = outcome.results.iter().any(|(_, status)| {
                matches!(status, BlockStatus::Verified { verdict, .. } if !verdict.is_pass())
            });
            for (idx, status) in outcome.results {
                atoms[outcome.entry_idx].blocks[idx].status = status;
            }
            if any_failed && options.fail_fast {
                cancel.cancel();
            }
        }
    });

    if let Some(e) = fatal {
        return Err(e);
    }
    Ok(Report::assemble(atoms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn block(index: usize, package: Option<&str>, runnable: bool) -> Block {
        Block {
            label: None,
            package: package.map(String::from),
            language: None,
            code: String::new(),
            expected: None,
            runnable,
            index,
            span: 0..0,
        }
    }

    fn atom(blocks: Vec<Block>) -> Atom {
        Atom {
            path: PathBuf::from("a.md"),
            blocks,
            source_id: 0,
        }
    }

    #[test]
    fn package_mates_share_a_unit_in_declaration_order() {
        let atom = atom(vec![
            block(0, Some("shapes"), true),
            block(1, None, true),
            block(2, Some("shapes"), true),
            block(3, Some("other"), true),
        ]);
        let units = plan_units(&atom);
        assert_eq!(units, vec![vec![0, 2], vec![1], vec![3]]);
    }

    #[test]
    fn non_runnable_listings_are_not_scheduled() {
        let atom = atom(vec![
            block(0, None, false),
            block(1, None, true),
            block(2, Some("p"), false),
        ]);
        let units = plan_units(&atom);
        assert_eq!(units, vec![vec![1]]);
    }

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }
}

use serde::Serialize;

use exemplar::block::{ExpectedOutput, OutputMode};

use crate::runner::ExecutionResult;

/// Why a listing failed, mirroring the report's failure taxonomy. A runtime
/// crash without a declared expectation is a `Runtime` failure, never a
/// `Mismatch`, since there was no expectation to violate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    Compile,
    Runtime,
    Timeout,
    Mismatch,
}

/// Pass/fail judgement for one listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail { class: FailureClass, reason: String },
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    fn fail(class: FailureClass, reason: impl Into<String>) -> Verdict {
        Verdict::Fail {
            class,
            reason: reason.into(),
        }
    }
}

/// Judge a listing's execution result against its declared expectation.
///
/// Exact mode compares stdout byte-for-byte, ignoring only a trailing
/// newline. Sample mode checks shape only: the listing must not crash and
/// must print something, since the documented output is non-deterministic.
/// A listing without an expectation is checked for clean execution alone.
pub fn judge(expected: Option<&ExpectedOutput>, result: &ExecutionResult) -> Verdict {
    match result {
        ExecutionResult::CompileFailure { diagnostics } => Verdict::fail(
            FailureClass::Compile,
            format!("compile failure:\n{}", indent(diagnostics)),
        ),
        ExecutionResult::Timeout { limit_ms } => Verdict::fail(
            FailureClass::Timeout,
            format!("timed out after {} ms", limit_ms),
        ),
        ExecutionResult::RuntimeFailure { kind, .. } => Verdict::fail(
            FailureClass::Runtime,
            format!("runtime failure: {}: {}", kind.kind, kind.message),
        ),
        ExecutionResult::Success { stdout, .. } => match expected {
            None => Verdict::Pass,
            Some(exp) => match exp.mode {
                OutputMode::Sample => {
                    if stdout.trim().is_empty() {
                        Verdict::fail(
                            FailureClass::Mismatch,
                            "sample output declared, but the listing printed nothing",
                        )
                    } else {
                        Verdict::Pass
                    }
                }
                OutputMode::Exact => {
                    let actual = stdout.strip_suffix('\n').unwrap_or(stdout);
                    let wanted = exp.text.strip_suffix('\n').unwrap_or(&exp.text);
                    if actual == wanted {
                        Verdict::Pass
                    } else {
                        Verdict::fail(
                            FailureClass::Mismatch,
                            format!("output mismatch:\n{}", diff_lines(wanted, actual)),
                        )
                    }
                }
            },
        },
    }
}

/// Line-level diff for human triage: `-` lines were declared but not
/// printed, `+` lines were printed but not declared.
pub fn diff_lines(expected: &str, actual: &str) -> String {
    let e: Vec<&str> = expected.lines().collect();
    let a: Vec<&str> = actual.lines().collect();

    // Longest-common-subsequence table; declared outputs are a few lines, so
    // the quadratic table is nothing.
    let mut lcs = vec![vec![0usize; a.len() + 1]; e.len() + 1];
    for i in (0..e.len()).rev() {
        for j in (0..a.len()).rev() {
            lcs[i][j] = if e[i] == a[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut out = String::new();
    let (mut i, mut j) = (0, 0);
    while i < e.len() && j < a.len() {
        if e[i] == a[j] {
            out.push_str(&format!("  {}\n", e[i]));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            out.push_str(&format!("- {}\n", e[i]));
            i += 1;
        } else {
            out.push_str(&format!("+ {}\n", a[j]));
            j += 1;
        }
    }
    for line in &e[i..] {
        out.push_str(&format!("- {}\n", line));
    }
    for line in &a[j..] {
        out.push_str(&format!("+ {}\n", line));
    }
    out
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|l| format!("  {}", l))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ErrorKind;

    fn success(stdout: &str) -> ExecutionResult {
        ExecutionResult::Success {
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    fn exact(text: &str) -> ExpectedOutput {
        ExpectedOutput {
            text: text.to_string(),
            mode: OutputMode::Exact,
        }
    }

    fn sample(text: &str) -> ExpectedOutput {
        ExpectedOutput {
            text: text.to_string(),
            mode: OutputMode::Sample,
        }
    }

    #[test]
    fn exact_match_passes() {
        assert!(judge(Some(&exact("abc")), &success("abc\n")).is_pass());
    }

    #[test]
    fn exact_match_is_whitespace_sensitive() {
        let verdict = judge(Some(&exact("a b")), &success("a  b\n"));
        match verdict {
            Verdict::Fail { class, reason } => {
                assert_eq!(class, FailureClass::Mismatch);
                assert!(reason.contains("- a b"));
                assert!(reason.contains("+ a  b"));
            }
            Verdict::Pass => panic!("expected mismatch"),
        }
    }

    #[test]
    fn mismatch_carries_line_diff() {
        let verdict = judge(Some(&exact("one\ntwo\nthree")), &success("one\n2\nthree\n"));
        let Verdict::Fail { reason, .. } = verdict else {
            panic!("expected mismatch");
        };
        assert!(reason.contains("  one"));
        assert!(reason.contains("- two"));
        assert!(reason.contains("+ 2"));
        assert!(reason.contains("  three"));
    }

    #[test]
    fn sample_output_passes_on_any_nonempty_output() {
        assert!(judge(Some(&sample("Foo@1a2b3c")), &success("Foo@deadbeef\n")).is_pass());
    }

    #[test]
    fn sample_output_fails_on_silence() {
        let verdict = judge(Some(&sample("Foo@1a2b3c")), &success(""));
        assert!(matches!(
            verdict,
            Verdict::Fail {
                class: FailureClass::Mismatch,
                ..
            }
        ));
    }

    #[test]
    fn crash_without_expectation_is_a_runtime_failure_not_a_mismatch() {
        let result = ExecutionResult::RuntimeFailure {
            kind: ErrorKind {
                kind: "IllegalStateException".to_string(),
                message: "boom".to_string(),
            },
            stdout: String::new(),
        };
        let verdict = judge(None, &result);
        assert!(matches!(
            verdict,
            Verdict::Fail {
                class: FailureClass::Runtime,
                ..
            }
        ));
    }

    #[test]
    fn success_without_expectation_passes() {
        assert!(judge(None, &success("anything\n")).is_pass());
    }

    #[test]
    fn timeout_is_classified_as_timeout() {
        let verdict = judge(Some(&exact("x")), &ExecutionResult::Timeout { limit_ms: 500 });
        assert!(matches!(
            verdict,
            Verdict::Fail {
                class: FailureClass::Timeout,
                ..
            }
        ));
    }
}

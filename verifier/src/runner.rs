use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;

use exemplar::block::Block;

use crate::schedule::CancelToken;
use crate::toolchain::Toolchain;
use crate::workspace::Workspace;

/// Tagged error variant recognized from a failed run. Compared structurally
/// (kind + message), never through any language's exception class hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorKind {
    pub kind: String,
    pub message: String,
}

/// Outcome of executing one listing.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExecutionResult {
    Success { stdout: String, stderr: String },
    CompileFailure { diagnostics: String },
    RuntimeFailure { kind: ErrorKind, stdout: String },
    Timeout { limit_ms: u64 },
}

/// Execute one unit: stage every listing into a fresh workspace, run the
/// optional compile step over all of them, then run each listing in
/// declaration order. Returns `(block index, result)` pairs; listings whose
/// execution was cancelled mid-run produce no pair and stay skipped in the
/// report.
///
/// The workspace is dropped (deleted) before this returns.
pub fn run_unit(
    blocks: &[&Block],
    toolchain: &Toolchain,
    timeout: Duration,
    cancel: &CancelToken,
) -> io::Result<Vec<(usize, ExecutionResult)>> {
    let ws = Workspace::create()?;
    let mut staged: Vec<PathBuf> = Vec::with_capacity(blocks.len());
    for block in blocks {
        staged.push(ws.stage(block, &toolchain.extension)?);
    }

    if let Some(compile) = &toolchain.compile {
        let argv = Toolchain::expand(compile, None, &staged, ws.path());
        match run_command(&argv, ws.path(), timeout, cancel)? {
            CommandOutcome::Cancelled => return Ok(Vec::new()),
            CommandOutcome::TimedOut => {
                let limit_ms = timeout.as_millis() as u64;
                return Ok(blocks
                    .iter()
                    .map(|b| (b.index, ExecutionResult::Timeout { limit_ms }))
                    .collect());
            }
            CommandOutcome::Completed(captured) if !captured.status.success() => {
                // One compilation unit: a compile error fails every listing.
                let diagnostics = if captured.stderr.trim().is_empty() {
                    captured.stdout
                } else {
                    captured.stderr
                };
                return Ok(blocks
                    .iter()
                    .map(|b| {
                        (
                            b.index,
                            ExecutionResult::CompileFailure {
                                diagnostics: diagnostics.clone(),
                            },
                        )
                    })
                    .collect());
            }
            CommandOutcome::Completed(_) => {}
        }
    }

    let mut results = Vec::with_capacity(blocks.len());
    for (block, file) in blocks.iter().zip(&staged) {
        let argv = Toolchain::expand(&toolchain.run, Some(file), &staged, ws.path());
        let result = match run_command(&argv, ws.path(), timeout, cancel)? {
            CommandOutcome::Cancelled => break,
            CommandOutcome::TimedOut => ExecutionResult::Timeout {
                limit_ms: timeout.as_millis() as u64,
            },
            CommandOutcome::Completed(captured) => classify(captured),
        };
        results.push((block.index, result));
    }
    Ok(results)
}

struct Captured {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

enum CommandOutcome {
    Completed(Captured),
    TimedOut,
    Cancelled,
}

/// Spawn a command with a wall-clock limit. Output pipes are drained on
/// helper threads so a chatty child cannot deadlock on a full pipe while we
/// poll for exit. On timeout or cancellation the child is killed and reaped.
fn run_command(
    argv: &[String],
    cwd: &Path,
    timeout: Duration,
    cancel: &CancelToken,
) -> io::Result<CommandOutcome> {
    let Some((bin, args)) = argv.split_first() else {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty command"));
    };

    let mut child = Command::new(bin)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout_reader = spawn_reader(child.stdout.take());
    let stderr_reader = spawn_reader(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break Some(status);
        }
        if cancel.is_cancelled() {
            let _ = child.kill();
            let _ = child.wait();
            let _ = stdout_reader.join();
            let _ = stderr_reader.join();
            return Ok(CommandOutcome::Cancelled);
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            break None;
        }
        thread::sleep(Duration::from_millis(10));
    };

    let stdout = stdout_reader.join().unwrap_or_default();
    let stderr = stderr_reader.join().unwrap_or_default();

    match status {
        Some(status) => Ok(CommandOutcome::Completed(Captured {
            status,
            stdout,
            stderr,
        })),
        None => Ok(CommandOutcome::TimedOut),
    }
}

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut bytes = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut bytes);
        }
        String::from_utf8_lossy(&bytes).into_owned()
    })
}

fn classify(captured: Captured) -> ExecutionResult {
    if captured.status.success() {
        return ExecutionResult::Success {
            stdout: captured.stdout,
            stderr: captured.stderr,
        };
    }
    if looks_like_compile_diagnostics(&captured.stderr) {
        return ExecutionResult::CompileFailure {
            diagnostics: captured.stderr,
        };
    }
    ExecutionResult::RuntimeFailure {
        kind: recognize_error(&captured.stderr),
        stdout: captured.stdout,
    }
}

/// Run-only toolchains surface compiler diagnostics on the run step's
/// stderr. Only the located `<file>:<line>:<col>: error:` shape counts; a
/// crash whose message merely contains "error:" stays a runtime failure.
fn looks_like_compile_diagnostics(stderr: &str) -> bool {
    stderr.lines().any(is_compiler_diagnostic_line)
}

fn is_compiler_diagnostic_line(line: &str) -> bool {
    let Some(pos) = line.find(": error:") else {
        return false;
    };
    let mut location = line[..pos].rsplitn(3, ':');
    let col = location.next();
    let row = location.next();
    let file = location.next();
    match (file, row, col) {
        (Some(file), Some(row), Some(col)) => {
            !file.trim().is_empty() && is_number(row) && is_number(col)
        }
        _ => false,
    }
}

fn is_number(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

/// Recognize an error kind from a crashed run's stderr. Understands the
/// JVM-style `Exception in thread "main" Kind: message` header and a bare
/// `Kind: message` first line; anything else is reported as kind `Error`.
pub fn recognize_error(stderr: &str) -> ErrorKind {
    for line in stderr.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let rest = match line.strip_prefix("Exception in thread") {
            Some(tail) => strip_thread_name(tail),
            None => line,
        };

        if let Some((kind, message)) = rest.split_once(':') {
            let kind = kind.trim();
            if !kind.is_empty() && !kind.contains(char::is_whitespace) {
                return ErrorKind {
                    kind: kind.to_string(),
                    message: message.trim().to_string(),
                };
            }
        }
        return ErrorKind {
            kind: "Error".to_string(),
            message: rest.to_string(),
        };
    }
    ErrorKind {
        kind: "Error".to_string(),
        message: "process exited with a non-zero status".to_string(),
    }
}

/// Skip the quoted thread name in `in thread "main" Kind: message`.
fn strip_thread_name(tail: &str) -> &str {
    let Some(open) = tail.find('"') else {
        return tail.trim();
    };
    match tail[open + 1..].find('"') {
        Some(close) => tail[open + 1 + close + 1..].trim(),
        None => tail.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_jvm_exception_header() {
        let kind = recognize_error(
            "Exception in thread \"main\" java.lang.NullPointerException: oops\n\tat Foo.main",
        );
        assert_eq!(
            kind,
            ErrorKind {
                kind: "java.lang.NullPointerException".to_string(),
                message: "oops".to_string(),
            }
        );
    }

    #[test]
    fn recognizes_bare_kind_message() {
        let kind = recognize_error("IllegalStateException: state is bad\n");
        assert_eq!(kind.kind, "IllegalStateException");
        assert_eq!(kind.message, "state is bad");
    }

    #[test]
    fn unrecognized_stderr_becomes_generic_error() {
        let kind = recognize_error("something went sideways\n");
        assert_eq!(kind.kind, "Error");
        assert_eq!(kind.message, "something went sideways");
    }

    #[test]
    fn empty_stderr_becomes_generic_error() {
        let kind = recognize_error("");
        assert_eq!(kind.kind, "Error");
    }

    #[test]
    fn compile_diagnostics_are_detected() {
        assert!(looks_like_compile_diagnostics(
            "Hello.kt:3:7: error: unresolved reference: prinln"
        ));
        assert!(!looks_like_compile_diagnostics(
            "Exception in thread \"main\" java.lang.ArithmeticException: / by zero"
        ));
    }

    #[test]
    fn crash_messages_mentioning_error_are_not_compile_diagnostics() {
        assert!(!looks_like_compile_diagnostics(
            "Exception in thread \"main\" java.io.IOException: read error: connection reset"
        ));
        assert!(!looks_like_compile_diagnostics(
            "Caused by: java.lang.RuntimeException: error: bad state"
        ));
        // An unlocated compiler message errs toward runtime failure.
        assert!(!looks_like_compile_diagnostics("error: source file not found"));
    }
}

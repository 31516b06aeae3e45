use verifier::report::{BlockStatus, Report};
use verifier::Verdict;

fn pass_label(no_color: bool) -> &'static str {
    if no_color { "PASS" } else { "\x1b[32mPASS\x1b[0m" }
}

fn fail_label(no_color: bool) -> &'static str {
    if no_color { "FAIL" } else { "\x1b[31mFAIL\x1b[0m" }
}

fn skip_label(no_color: bool) -> &'static str {
    if no_color { "SKIP" } else { "\x1b[90mSKIP\x1b[0m" }
}

fn bold(s: &str, no_color: bool) -> String {
    if no_color {
        s.to_string()
    } else {
        format!("\x1b[1m{}\x1b[0m", s)
    }
}

fn listing_name(label: Option<&str>, index: usize) -> String {
    match label {
        Some(label) => label.to_string(),
        None => format!("listing {}", index + 1),
    }
}

/// Print the human-readable summary: per-atom listing lines, failure
/// details, and the one-line result.
pub fn print_summary(report: &Report, no_color: bool) {
    let mut failures: Vec<(String, String, &str)> = Vec::new();

    for atom in &report.atoms {
        println!();
        println!("{}", bold(&atom.path.display().to_string(), no_color));

        for error in &atom.structural_errors {
            println!("  {}  structural error: {}", fail_label(no_color), error);
        }

        for block in &atom.blocks {
            let name = listing_name(block.label.as_deref(), block.index);
            match &block.status {
                BlockStatus::Skipped { reason } => {
                    println!("  {}  {} ({})", skip_label(no_color), name, reason);
                }
                BlockStatus::Verified {
                    verdict: Verdict::Pass,
                    ..
                } => {
                    println!("  {}  {}", pass_label(no_color), name);
                }
                BlockStatus::Verified {
                    verdict: Verdict::Fail { reason, .. },
                    ..
                } => {
                    println!("  {}  {}", fail_label(no_color), name);
                    failures.push((atom.path.display().to_string(), name, reason.as_str()));
                }
            }
        }
    }

    if !failures.is_empty() {
        println!();
        println!("failures:");
        for (path, name, reason) in &failures {
            println!();
            println!("  --- {} :: {} ---", path, name);
            for line in reason.lines() {
                println!("  {}", line);
            }
        }
    }

    println!();
    let totals = &report.totals;
    if report.all_passed() {
        let ok = if no_color { "ok" } else { "\x1b[32mok\x1b[0m" };
        println!(
            "verification result: {}. {} passed, {} failed, {} skipped",
            ok, totals.passed, totals.failed, totals.skipped
        );
    } else {
        let failed = if no_color {
            "FAILED"
        } else {
            "\x1b[31mFAILED\x1b[0m"
        };
        if totals.structural_errors > 0 {
            println!(
                "verification result: {}. {} passed, {} failed, {} skipped, {} structural error(s)",
                failed, totals.passed, totals.failed, totals.skipped, totals.structural_errors
            );
        } else {
            println!(
                "verification result: {}. {} passed, {} failed, {} skipped",
                failed, totals.passed, totals.failed, totals.skipped
            );
        }
    }
}

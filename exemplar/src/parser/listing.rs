//! Parse the interior of one fenced listing: the leading file-label comment,
//! the declared package, the expected-output trailer, and whether anything in
//! it is actually runnable.

use crate::block::{ExpectedOutput, OutputMode};

/// Facts gathered from a listing's source text.
pub struct ListingFacts {
    pub label: Option<String>,
    pub package: Option<String>,
    pub expected: Option<ExpectedOutput>,
    pub runnable: bool,
}

/// Analyze a listing's source text.
pub fn parse_listing(code: &str) -> ListingFacts {
    let lines: Vec<&str> = code.lines().collect();

    let trailer = find_output_trailer(&lines);
    let body = match &trailer {
        Some(t) => &lines[..t.start_line],
        None => &lines[..],
    };

    ListingFacts {
        label: parse_label(body),
        package: parse_package(body),
        expected: trailer.map(|t| t.expected),
        runnable: has_runnable_code(body),
    }
}

struct Trailer {
    /// Line index where the `/* Output:` marker sits.
    start_line: usize,
    expected: ExpectedOutput,
}

/// Find the trailing `/* Output: ... */` or `/* Sample output: ... */` comment.
/// The marker and the closing `*/` must each sit on their own line, and only
/// blank lines may follow the close. Interior lines are kept verbatim so the
/// later comparison can be byte-exact.
fn find_output_trailer(lines: &[&str]) -> Option<Trailer> {
    let mut marker = None;
    for (i, line) in lines.iter().enumerate() {
        let mode = match line.trim() {
            "/* Output:" => OutputMode::Exact,
            "/* Sample output:" => OutputMode::Sample,
            _ => continue,
        };
        marker = Some((i, mode));
    }
    let (start_line, mode) = marker?;

    let close = lines[start_line + 1..]
        .iter()
        .position(|l| l.trim() == "*/")
        .map(|off| start_line + 1 + off)?;

    if lines[close + 1..].iter().any(|l| !l.trim().is_empty()) {
        return None;
    }

    Some(Trailer {
        start_line,
        expected: ExpectedOutput {
            text: lines[start_line + 1..close].join("\n"),
            mode,
        },
    })
}

/// The first non-blank line, when it is a `//` comment naming a file path,
/// is the listing's label.
fn parse_label(lines: &[&str]) -> Option<String> {
    let first = lines.iter().find(|l| !l.trim().is_empty())?;
    let rest = first.trim().strip_prefix("//")?.trim();
    if looks_like_path(rest) {
        Some(rest.to_string())
    } else {
        None
    }
}

fn looks_like_path(text: &str) -> bool {
    !text.is_empty()
        && !text.contains(char::is_whitespace)
        && text.contains('.')
        && text.chars().any(|c| c.is_alphanumeric())
}

/// Find the first `package` declaration, if any.
fn parse_package(lines: &[&str]) -> Option<String> {
    for line in lines {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("package ") {
            let name = rest.trim().trim_end_matches(';').trim();
            if !name.is_empty() {
                return Some(name.to_string());
            }
        }
    }
    None
}

/// A listing is runnable when any line carries code outside comments.
/// Fully commented-out listings (the book's intentional failing examples)
/// must never be executed.
fn has_runnable_code(lines: &[&str]) -> bool {
    let mut depth = 0usize;
    for line in lines {
        let bytes = line.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if depth > 0 {
                if bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/') {
                    depth -= 1;
                    i += 2;
                } else {
                    i += 1;
                }
                continue;
            }
            match bytes[i] {
                b'/' if bytes.get(i + 1) == Some(&b'/') => break,
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    depth += 1;
                    i += 2;
                }
                c if c.is_ascii_whitespace() => i += 1,
                _ => return true,
            }
        }
    }
    false
}

use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser as CmarkParser, Tag, TagEnd};

use crate::block::Block;
use crate::parser::error::ParseError;
use crate::parser::listing;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Extract every fenced code region from markdown source, in document order.
///
/// Structural errors do not abort extraction: listings that parsed cleanly
/// are returned alongside the errors, so every fenced region is accounted
/// for either as a `Block` or as a `ParseError`.
pub fn extract_blocks(source: &str, file_id: usize) -> (Vec<Block>, Vec<ParseError>) {
    let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES;
    let parser = CmarkParser::new_ext(source, options);
    let events: Vec<(Event<'_>, Range<usize>)> = parser.into_offset_iter().collect();

    let mut blocks: Vec<Block> = Vec::new();
    let mut errors: Vec<ParseError> = Vec::new();
    let mut i = 0;

    while i < events.len() {
        let (ref ev, ref range) = events[i];
        match ev {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(lang))) => {
                let language = {
                    let l = lang.to_string();
                    if l.is_empty() { None } else { Some(l) }
                };
                i += 1;
                let code =
                    collect_text_until(&events, &mut i, |e| matches!(e, TagEnd::CodeBlock));

                // The Start event's range covers the whole fenced region, so
                // the raw source tells us whether the fence was ever closed.
                let region = &source[range.clone()];
                if !fence_terminated(region) {
                    errors.push(ParseError::unterminated_fence(range.clone(), file_id));
                    continue;
                }

                let facts = listing::parse_listing(&code);
                blocks.push(Block {
                    label: facts.label,
                    package: facts.package,
                    language,
                    code,
                    expected: facts.expected,
                    runnable: facts.runnable,
                    index: blocks.len(),
                    span: range.clone(),
                });
            }
            _ => {
                i += 1;
            }
        }
    }

    (blocks, errors)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Collect all text content until a matching End tag.
fn collect_text_until(
    events: &[(Event<'_>, Range<usize>)],
    i: &mut usize,
    is_end: impl Fn(&TagEnd) -> bool,
) -> String {
    let mut text = String::new();
    while *i < events.len() {
        let (ref ev, _) = events[*i];
        match ev {
            Event::End(tag_end) if is_end(tag_end) => {
                *i += 1;
                break;
            }
            Event::Text(s) => {
                text.push_str(s);
                *i += 1;
            }
            _ => {
                *i += 1;
            }
        }
    }
    text
}

/// Whether a fenced region's raw source ends with a closing fence at least as
/// long as the opening one. An unterminated fence swallows everything to the
/// end of the file, which pulldown-cmark accepts silently.
fn fence_terminated(region: &str) -> bool {
    let mut lines = region.lines();
    let Some(open) = lines.next() else {
        return false;
    };
    let open = open.trim_start();
    let marker = match open.chars().next() {
        Some(c @ ('`' | '~')) => c,
        // Not a fence we can reason about; trust the markdown parser.
        _ => return true,
    };
    let open_len = open.chars().take_while(|&ch| ch == marker).count();

    let Some(close) = lines.last() else {
        return false;
    };
    let close = close.trim();
    !close.is_empty()
        && close.chars().all(|ch| ch == marker)
        && close.chars().count() >= open_len
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::OutputMode;

    const CHAPTER: &str = "\
# Hello World

Prose introducing the example.

```kotlin
// HelloWorld/Hello.kt

fun main() {
  println(\"abc\")
}
/* Output:
abc
*/
```

More prose.

```kotlin
// HelloWorld/Fails.kt
// val x: Int = \"oops\"
```

```
plain fence, no language
```
";

    #[test]
    fn extracts_blocks_in_document_order() {
        let (blocks, errors) = extract_blocks(CHAPTER, 0);
        assert!(errors.is_empty());
        assert_eq!(blocks.len(), 3);

        assert_eq!(blocks[0].label.as_deref(), Some("HelloWorld/Hello.kt"));
        assert_eq!(blocks[0].language.as_deref(), Some("kotlin"));
        assert!(blocks[0].runnable);
        let expected = blocks[0].expected.as_ref().expect("trailer");
        assert_eq!(expected.mode, OutputMode::Exact);
        assert_eq!(expected.text, "abc");

        assert_eq!(blocks[1].label.as_deref(), Some("HelloWorld/Fails.kt"));
        assert!(!blocks[1].runnable);

        assert_eq!(blocks[2].language, None);
        assert_eq!(blocks[2].index, 2);
    }

    #[test]
    fn unterminated_fence_is_a_structural_error() {
        let source = "# Broken\n\n```kotlin\nfun main() {\n  println(\"abc\")\n";
        let (blocks, errors) = extract_blocks(source, 7);
        assert!(blocks.is_empty());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].file_id, 7);
        assert!(errors[0].message.contains("unterminated"));
    }

    #[test]
    fn every_fence_is_accounted_for() {
        // Two clean fences followed by one that never closes: the clean ones
        // still come back as blocks, the broken one as an error.
        let source = "\
```kotlin
val a = 1
```

```kotlin
val b = 2
```

```kotlin
val c = 3
";
        let (blocks, errors) = extract_blocks(source, 0);
        assert_eq!(blocks.len() + errors.len(), 3);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn indented_code_is_not_a_listing() {
        let source = "para\n\n    indented code\n\npara\n";
        let (blocks, errors) = extract_blocks(source, 0);
        assert!(blocks.is_empty());
        assert!(errors.is_empty());
    }

    #[test]
    fn tilde_fences_are_recognized() {
        let source = "~~~kotlin\nval x = 1\n~~~\n";
        let (blocks, errors) = extract_blocks(source, 0);
        assert!(errors.is_empty());
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].language.as_deref(), Some("kotlin"));
    }
}

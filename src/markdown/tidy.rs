//! Post-pass normalizer for transduced Markdown.
//!
//! A line-level cleanup over the transducer's raw output. The pass is
//! fence-aware: content between matching code-fence markers is passed
//! through byte-for-byte, where "matching" means the closing fence carries
//! the identical leading prefix (spaces plus blockquote markers) as the
//! opening one. A fence nested at a different blockquote depth therefore
//! cannot falsely close the outer one.

use memchr::memchr;

/// Normalize transduced Markdown.
///
/// Outside fences: whitespace-only lines become empty, and 1–3 leading
/// spaces are stripped (4+ space indentation is left alone). Inside fences
/// lines are untouched. Runs of 7+ newlines collapse to 6, the whole result
/// is trimmed, and exactly two trailing newlines are appended.
///
/// Normalizing already-normalized text is a no-op.
pub fn tidy(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len() + 2);
    let mut in_fence = false;
    let mut fence_prefix_open = String::new();

    for line in markdown.split('\n') {
        if let Some(prefix) = fence_prefix(line) {
            if !in_fence {
                in_fence = true;
                fence_prefix_open = prefix.to_string();
            } else if prefix == fence_prefix_open {
                in_fence = false;
                fence_prefix_open.clear();
            }
            out.push_str(line);
            out.push('\n');
            continue;
        }

        if in_fence {
            // fenced content keeps its indentation and tabs
            out.push_str(line);
            out.push('\n');
        } else if line.trim().is_empty() {
            out.push('\n');
        } else {
            let leading = line.len() - line.trim_start_matches(' ').len();
            if (1..=3).contains(&leading) {
                out.push_str(&line[leading..]);
            } else {
                out.push_str(line);
            }
            out.push('\n');
        }
    }

    let collapsed = collapse_newline_runs(&out);
    let mut result = collapsed.trim().to_string();
    result.push_str("\n\n");
    result
}

/// If the line opens or closes a fence, return its prefix: optional leading
/// spaces, then zero or more `>`-plus-whitespace quote markers, immediately
/// followed by three backticks.
fn fence_prefix(line: &str) -> Option<&str> {
    let bytes = line.as_bytes();
    let mut i = 0;

    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    while i + 1 < bytes.len() && bytes[i] == b'>' && bytes[i + 1].is_ascii_whitespace() {
        i += 2;
    }

    if bytes[i..].starts_with(b"```") {
        Some(&line[..i])
    } else {
        None
    }
}

/// Collapse every run of 7 or more consecutive newlines down to exactly 6.
fn collapse_newline_runs(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;

    while i < bytes.len() {
        match memchr(b'\n', &bytes[i..]) {
            Some(offset) => {
                let start = i + offset;
                out.push_str(&s[i..start]);
                let mut end = start;
                while end < bytes.len() && bytes[end] == b'\n' {
                    end += 1;
                }
                let run = (end - start).min(6);
                for _ in 0..run {
                    out.push('\n');
                }
                i = end;
            }
            None => {
                out.push_str(&s[i..]);
                break;
            }
        }
    }
    out
}

//! Pure text transformation utilities for Markdown emission.

/// Escape special Markdown characters in text.
///
/// Every occurrence of `` \ ` * _ { } [ ] ( ) # + ! | `` gets a single
/// backslash prefix. The substitutions are independent per character, so a
/// single left-to-right pass is exact: a literal backslash is escaped at the
/// point it is seen and never re-escaped.
///
/// # Examples
///
/// ```
/// use txtz::markdown::escape_markdown;
///
/// assert_eq!(escape_markdown("*bold*"), "\\*bold\\*");
/// assert_eq!(escape_markdown("a | b"), "a \\| b");
/// ```
pub fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 8);
    for c in text.chars() {
        match c {
            '\\' | '`' | '*' | '_' | '{' | '}' | '[' | ']' | '(' | ')' | '#' | '+' | '!'
            | '|' => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
    }
    result
}

/// Collapse newline sequences to single spaces, then collapse runs of two or
/// more spaces to one.
///
/// Used for flowing text: inside paragraphs a line break in the source
/// markup is a soft break, not content.
pub fn collapse_newlines(text: &str) -> String {
    let mut flat = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                flat.push(' ');
            }
            '\n' => flat.push(' '),
            _ => flat.push(c),
        }
    }

    let mut out = String::with_capacity(flat.len());
    let mut prev_space = false;
    for c in flat.chars() {
        if c == ' ' {
            if !prev_space {
                out.push(c);
            }
            prev_space = true;
        } else {
            prev_space = false;
            out.push(c);
        }
    }
    out
}

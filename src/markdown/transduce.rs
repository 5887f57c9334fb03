//! Tree-to-Markdown transduction.
//!
//! A single depth-first pass over the markup tree: pre-order "enter" and
//! post-order "leave" actions dispatched on the tag name, with all mutable
//! state held in one [`Transducer`] value created per chapter. Elements
//! without an action are structurally transparent — their children are still
//! visited.
//!
//! Writes go through one sink method implementing the redirection rule:
//! while a table is open, text lands in the open cell buffer (or is dropped
//! between cells); otherwise it lands in the main output. Preformatted text
//! is the exception — it accumulates verbatim in the pre buffer and is
//! emitted as a single fenced block when the `pre` element closes, even when
//! that block sits inside a table cell.

use crate::xhtml::{Element, Node};

use super::escape::{collapse_newlines, escape_markdown};
use super::paths::{format_link_target, image_target, is_absolute_url};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Ordered,
    Unordered,
}

#[derive(Debug, Default)]
struct PreState {
    buf: String,
    language: Option<String>,
}

#[derive(Debug, Default)]
struct TableState {
    rows: Vec<Vec<String>>,
    current_row: Option<Vec<String>>,
    current_cell: Option<String>,
    in_head: bool,
    header_rows: usize,
}

/// Streaming XHTML-tree-to-Markdown transducer.
///
/// One value per conversion call; no state survives [`Transducer::convert`].
#[derive(Debug, Default)]
pub struct Transducer {
    out: String,
    blockquote_depth: usize,
    list_stack: Vec<ListKind>,
    in_code: bool,
    pre: Option<PreState>,
    table: Option<TableState>,
}

/// Convert a parsed body element to raw (un-tidied) Markdown.
pub fn transduce(root: &Element) -> String {
    Transducer::new().convert(root)
}

impl Transducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk the tree and return the accumulated Markdown.
    ///
    /// Never fails: unknown tags pass through, missing attributes read as
    /// empty, and stack underflows are clamped.
    pub fn convert(mut self, root: &Element) -> String {
        self.walk_element(root);
        self.out
    }

    fn walk_element(&mut self, el: &Element) {
        self.enter(el);
        for child in &el.children {
            match child {
                Node::Element(c) => self.walk_element(c),
                Node::Text(t) => self.text(t),
            }
        }
        self.leave(el);
    }

    /// The active-sink rule: cell buffer when a table and a cell are open,
    /// dropped when a table is open without a cell, main output otherwise.
    fn write(&mut self, s: &str) {
        if let Some(table) = &mut self.table {
            if let Some(cell) = &mut table.current_cell {
                cell.push_str(s);
            }
        } else {
            self.out.push_str(s);
        }
    }

    fn quote_prefix(&self) -> String {
        "> ".repeat(self.blockquote_depth)
    }

    fn enter(&mut self, el: &Element) {
        match el.name.as_str() {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = el.name[1..].parse::<usize>().unwrap_or(1);
                let mut s = String::from("\n");
                s.push_str(&self.quote_prefix());
                s.push_str(&"#".repeat(level));
                s.push(' ');
                self.write(&s);
            }

            "p" | "div" => {
                // inside a table, paragraph breaks would corrupt the row layout
                if self.table.is_none() {
                    let mut s = String::from("\n");
                    s.push_str(&self.quote_prefix());
                    self.write(&s);
                }
            }

            "br" => {
                if let Some(pre) = &mut self.pre {
                    pre.buf.push('\n');
                } else {
                    self.write("  \n");
                }
            }

            "blockquote" => {
                self.blockquote_depth += 1;
                let prefix = self.quote_prefix();
                self.write(&prefix);
            }

            "em" | "i" => self.write("*"),
            "strong" | "b" => self.write("**"),

            "code" => {
                if let Some(pre) = &mut self.pre {
                    // token-highlighted pre markup uses an empty
                    // <code class="w"/> as an explicit line break
                    if el.children.is_empty() && el.has_class("w") {
                        pre.buf.push('\n');
                    }
                } else if !self.in_code {
                    self.write("`");
                    self.in_code = true;
                }
            }

            "pre" => {
                if self.pre.is_none() {
                    let language = el
                        .attr("data-code-language")
                        .map(str::trim)
                        .filter(|lang| !lang.is_empty())
                        .map(String::from);
                    self.pre = Some(PreState {
                        buf: String::new(),
                        language,
                    });
                }
            }

            "hr" => self.write("\n* * *"),

            "a" => {
                if is_absolute_url(el.attr("href").unwrap_or("")) {
                    self.write("[");
                }
            }

            "img" => {
                let alt = el.attr("alt").unwrap_or("");
                let alt = if alt.trim().is_empty() {
                    "image".to_string()
                } else {
                    collapse_newlines(alt)
                };
                let src = el.attr("src").unwrap_or("");
                let s = format!("![{}]({})", alt, image_target(src));
                self.write(&s);
            }

            "ul" => self.list_stack.push(ListKind::Unordered),
            "ol" => self.list_stack.push(ListKind::Ordered),

            "li" => {
                let indent = self.list_stack.len().saturating_sub(1);
                let mut s = String::from("\n");
                s.push_str(&"\t".repeat(indent));
                s.push_str(&self.quote_prefix());
                s.push_str(match self.list_stack.last() {
                    Some(ListKind::Ordered) => "1. ",
                    _ => "+ ",
                });
                self.write(&s);
            }

            "table" => {
                // separator from preceding text; table layout is rendered
                // only once the whole table closes
                self.out.push('\n');
                self.table = Some(TableState::default());
            }

            "thead" => {
                if let Some(table) = &mut self.table {
                    table.in_head = true;
                }
            }
            "tbody" => {
                if let Some(table) = &mut self.table {
                    table.in_head = false;
                }
            }

            "tr" => {
                if let Some(table) = &mut self.table {
                    table.current_row = Some(Vec::new());
                }
            }

            "th" | "td" => {
                if let Some(table) = &mut self.table {
                    table.current_cell = Some(String::new());
                }
            }

            _ => {}
        }
    }

    fn leave(&mut self, el: &Element) {
        match el.name.as_str() {
            "em" | "i" => self.write("*"),
            "strong" | "b" => self.write("**"),

            "code" => {
                if self.in_code && self.pre.is_none() {
                    self.write("`");
                    self.in_code = false;
                }
            }

            "pre" => {
                if self.pre.is_some() {
                    self.flush_pre();
                }
            }

            "a" => {
                let href = el.attr("href").unwrap_or("");
                if is_absolute_url(href) {
                    let target = format_link_target(href, el.attr("title"));
                    self.write(&format!("]({})", target));
                }
            }

            "blockquote" => {
                self.blockquote_depth = self.blockquote_depth.saturating_sub(1);
            }

            "ul" | "ol" => {
                self.list_stack.pop();
                self.write("\n");
            }

            "p" | "div" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                if self.table.is_none() {
                    self.write("\n");
                }
            }

            "th" | "td" => {
                if let Some(table) = &mut self.table
                    && let Some(cell) = table.current_cell.take()
                    && let Some(row) = &mut table.current_row
                {
                    row.push(cell.trim().to_string());
                }
            }

            "tr" => {
                if let Some(table) = &mut self.table
                    && let Some(row) = table.current_row.take()
                {
                    table.rows.push(row);
                    if table.in_head {
                        table.header_rows += 1;
                    }
                }
            }

            "thead" => {
                if let Some(table) = &mut self.table {
                    table.in_head = false;
                }
            }

            "table" => {
                if let Some(table) = self.table.take() {
                    self.render_table(table.rows, table.header_rows);
                    self.out.push('\n');
                }
            }

            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if let Some(pre) = &mut self.pre {
            // verbatim capture; the pre buffer is the only consumer
            pre.buf.push_str(text);
            return;
        }

        if text.trim().is_empty() {
            return;
        }

        let collapsed = collapse_newlines(text);
        if self.in_code {
            self.write(&collapsed);
        } else {
            let escaped = escape_markdown(&collapsed);
            self.write(&escaped);
        }
    }

    /// Emit the pre buffer as one fenced code block at the current
    /// blockquote depth, then clear pre state.
    fn flush_pre(&mut self) {
        let Some(pre) = self.pre.take() else { return };

        let raw = pre.buf.replace("\r\n", "\n").replace('\r', "\n");
        let prefix = self.quote_prefix();
        let lang = pre.language.as_deref().unwrap_or("");

        let mut block = String::with_capacity(raw.len() + 32);
        block.push('\n');
        block.push_str(&prefix);
        block.push_str("```");
        block.push_str(lang);
        block.push('\n');

        for line in raw.split('\n') {
            if line.trim().is_empty() {
                continue;
            }
            block.push_str(&prefix);
            block.push_str(line);
            block.push('\n');
        }

        block.push_str(&prefix);
        block.push_str("```");
        block.push('\n');

        self.write(&block);
    }

    /// Render the buffered table rows. The first row that survives trimming
    /// is the header; ragged body rows render with their own column count.
    fn render_table(&mut self, rows: Vec<Vec<String>>, _header_rows: usize) {
        let clean: Vec<Vec<String>> = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| cell.trim().to_string())
                    .collect::<Vec<_>>()
            })
            .filter(|row| row.iter().any(|cell| !cell.is_empty()))
            .collect();

        if clean.is_empty() {
            return;
        }

        let prefix = self.quote_prefix();
        let header = &clean[0];

        self.out.push_str(&prefix);
        self.out.push_str("| ");
        self.out.push_str(&header.join(" | "));
        self.out.push_str(" |\n");

        self.out.push_str(&prefix);
        self.out.push_str("| ");
        self.out.push_str(&vec!["---"; header.len()].join(" | "));
        self.out.push_str(" |\n");

        for row in &clean[1..] {
            self.out.push_str(&prefix);
            self.out.push_str("| ");
            self.out.push_str(&row.join(" | "));
            self.out.push_str(" |\n");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xhtml::parse_document;
    use proptest::prelude::*;

    fn convert(xhtml: &str) -> String {
        let body = parse_document(xhtml).expect("parse failed");
        transduce(&body)
    }

    #[test]
    fn test_heading_levels() {
        assert_eq!(convert("<body><h1>Title</h1></body>"), "\n# Title\n");
        assert_eq!(convert("<body><h3>Sub</h3></body>"), "\n### Sub\n");
    }

    #[test]
    fn test_paragraph_and_emphasis() {
        assert_eq!(
            convert("<body><p>one <em>two</em> and <strong>three</strong></p></body>"),
            "\none *two* and **three**\n"
        );
    }

    #[test]
    fn test_whitespace_only_text_between_inlines_is_skipped() {
        assert_eq!(
            convert("<body><p><em>a</em> <em>b</em></p></body>"),
            "\n*a**b*\n"
        );
    }

    #[test]
    fn test_inline_code_not_escaped() {
        assert_eq!(
            convert("<body><p>run <code>a*b</code></p></body>"),
            "\nrun `a*b`\n"
        );
    }

    #[test]
    fn test_text_is_escaped_outside_code() {
        assert_eq!(convert("<body><p>a*b</p></body>"), "\na\\*b\n");
    }

    #[test]
    fn test_br_soft_break() {
        assert_eq!(convert("<body><p>a<br/>b</p></body>"), "\na  \nb\n");
    }

    #[test]
    fn test_hr() {
        assert_eq!(convert("<body><hr/></body>"), "\n* * *");
    }

    #[test]
    fn test_blockquote_prefixes() {
        assert_eq!(
            convert("<body><blockquote><p>quoted</p></blockquote></body>"),
            "> \n> quoted\n"
        );
    }

    #[test]
    fn test_nested_blockquote_heading() {
        let got = convert(
            "<body><blockquote><blockquote><h2>deep</h2></blockquote></blockquote></body>",
        );
        assert!(got.contains("> > ## deep"));
    }

    #[test]
    fn test_absolute_link() {
        assert_eq!(
            convert(r#"<body><p><a href="https://example.com" title="Ex">text</a></p></body>"#),
            "\n[text](https://example.com \"Ex\")\n"
        );
    }

    #[test]
    fn test_relative_link_renders_text_only() {
        assert_eq!(
            convert(r#"<body><p><a href="ch2.xhtml">text</a></p></body>"#),
            "\ntext\n"
        );
    }

    #[test]
    fn test_image_rewrite() {
        assert_eq!(
            convert(r#"<body><p><img src="chapter1/pic.PNG" alt="A cat"/></p></body>"#),
            "\n![A cat](images/pic.PNG)\n"
        );
    }

    #[test]
    fn test_image_blank_alt_falls_back() {
        assert_eq!(
            convert(r#"<body><p><img src="x.gif" alt=""/></p></body>"#),
            "\n![image](images/x.gif)\n"
        );
    }

    #[test]
    fn test_unordered_list() {
        assert_eq!(
            convert("<body><ul><li>a</li><li>b</li></ul></body>"),
            "\n+ a\n+ b\n"
        );
    }

    #[test]
    fn test_ordered_list_uses_markdown_renumbering() {
        assert_eq!(
            convert("<body><ol><li>a</li><li>b</li></ol></body>"),
            "\n1. a\n1. b\n"
        );
    }

    #[test]
    fn test_nested_list_indentation() {
        assert_eq!(
            convert("<body><ul><li>a<ul><li>b</li></ul></li></ul></body>"),
            "\n+ a\n\t+ b\n\n"
        );
    }

    #[test]
    fn test_list_inside_blockquote() {
        assert_eq!(
            convert("<body><blockquote><ul><li>a</li></ul></blockquote></body>"),
            "> \n> + a\n"
        );
    }

    #[test]
    fn test_table_rendering() {
        let got = convert(
            "<body><table><thead><tr><th>A</th><th>B</th></tr></thead>\
             <tbody><tr><td>1</td><td>2</td></tr><tr><td>3</td><td>4</td></tr></tbody>\
             </table></body>",
        );
        assert_eq!(got, "\n| A | B |\n| --- | --- |\n| 1 | 2 |\n| 3 | 4 |\n\n");
    }

    #[test]
    fn test_table_without_thead_uses_first_row_as_header() {
        let got = convert(
            "<body><table><tr><td>A</td></tr><tr><td>1</td></tr></table></body>",
        );
        assert_eq!(got, "\n| A |\n| --- |\n| 1 |\n\n");
    }

    #[test]
    fn test_empty_table_emits_nothing() {
        let got = convert("<body><table><tr><td>  </td></tr></table></body>");
        assert_eq!(got, "\n\n");
    }

    #[test]
    fn test_ragged_rows_render_verbatim() {
        let got = convert(
            "<body><table><tr><td>A</td><td>B</td></tr><tr><td>only</td></tr></table></body>",
        );
        assert_eq!(got, "\n| A | B |\n| --- | --- |\n| only |\n\n");
    }

    #[test]
    fn test_paragraphs_inside_cells_do_not_break_rows() {
        let got = convert(
            "<body><table><tr><td><p>x</p><p>y</p></td><td>z</td></tr>\
             <tr><td>1</td><td>2</td></tr></table></body>",
        );
        assert_eq!(got, "\n| xy | z |\n| --- | --- |\n| 1 | 2 |\n\n");
    }

    #[test]
    fn test_text_between_cells_is_dropped() {
        let got = convert("<body><table>stray<tr>more<td>A</td></tr><tr><td>1</td></tr></table></body>");
        assert_eq!(got, "\n| A |\n| --- |\n| 1 |\n\n");
    }

    #[test]
    fn test_pre_verbatim_and_blank_lines_dropped() {
        let got = convert("<body><pre>line1\n  line2\n\nline3</pre></body>");
        assert_eq!(got, "\n```\nline1\n  line2\nline3\n```\n");
    }

    #[test]
    fn test_pre_language_attribute() {
        let got = convert(r#"<body><pre data-code-language="rust">let x = 1;</pre></body>"#);
        assert_eq!(got, "\n```rust\nlet x = 1;\n```\n");
    }

    #[test]
    fn test_pre_inside_blockquote_prefixes_fence() {
        let got = convert("<body><blockquote><pre>code</pre></blockquote></body>");
        assert_eq!(got, "> \n> ```\n> code\n> ```\n");
    }

    #[test]
    fn test_pre_text_not_escaped_and_not_duplicated() {
        let got = convert("<body><pre>a*b</pre></body>");
        assert_eq!(got, "\n```\na*b\n```\n");
    }

    #[test]
    fn test_code_whitespace_marker_inside_pre() {
        let got = convert(
            r#"<body><pre><code>fn main()</code><code class="w"/><code>done</code></pre></body>"#,
        );
        assert_eq!(got, "\n```\nfn main()\ndone\n```\n");
    }

    #[test]
    fn test_br_inside_pre() {
        let got = convert("<body><pre>a<br/>b</pre></body>");
        assert_eq!(got, "\n```\na\nb\n```\n");
    }

    #[test]
    fn test_pre_inside_table_cell() {
        let got = convert(
            "<body><table><tr><td><pre>x</pre></td></tr><tr><td>1</td></tr></table></body>",
        );
        assert_eq!(got, "\n| ```\nx\n``` |\n| --- |\n| 1 |\n\n");
    }

    #[test]
    fn test_unknown_tags_pass_through() {
        assert_eq!(
            convert("<body><section><p><span>text</span></p></section></body>"),
            "\ntext\n"
        );
    }

    #[test]
    fn test_whitespace_only_text_skipped() {
        assert_eq!(convert("<body>   \n\t  </body>"), "");
    }

    proptest! {
        // Any mix of blockquote enters/leaves keeps the rendered prefix
        // depth non-negative and never panics.
        #[test]
        fn prop_blockquote_depth_never_negative(events in proptest::collection::vec(proptest::bool::ANY, 0..32)) {
            let mut t = Transducer::new();
            let bq = Element::new("blockquote");
            let mut expected = 0usize;
            for enter in events {
                if enter {
                    t.enter(&bq);
                    expected += 1;
                } else {
                    t.leave(&bq);
                    expected = expected.saturating_sub(1);
                }
                prop_assert_eq!(t.blockquote_depth, expected);
            }
        }
    }
}

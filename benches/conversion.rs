//! Benchmarks for the XHTML-to-Markdown conversion pipeline.
//!
//! Run with: cargo bench

use criterion::{Criterion, criterion_group, criterion_main};

use txtz::markdown::{convert_xhtml, tidy, transduce};
use txtz::xhtml::parse_document;

/// A chapter exercising every construct the transducer handles.
fn sample_chapter() -> String {
    let mut body = String::from("<html><body>");
    for section in 0..20 {
        body.push_str(&format!("<h2>Section {section}</h2>"));
        body.push_str(
            "<p>Some flowing prose with <em>emphasis</em>, <strong>bold</strong>, \
             <code>inline_code()</code>, and an absolute \
             <a href=\"https://example.com\" title=\"Ex\">link</a>.</p>",
        );
        body.push_str("<blockquote><p>A quoted remark with a list:</p><ul><li>one</li><li>two<ul><li>deep</li></ul></li></ul></blockquote>");
        body.push_str(
            "<pre data-code-language=\"rust\">fn demo() {\n    let x = 1;\n    x\n}</pre>",
        );
        body.push_str(
            "<table><thead><tr><th>A</th><th>B</th></tr></thead>\
             <tbody><tr><td>1</td><td>2</td></tr><tr><td>3</td><td>4</td></tr></tbody></table>",
        );
        body.push_str("<p><img src=\"media/fig.png\" alt=\"figure\"/></p>");
    }
    body.push_str("</body></html>");
    body
}

fn bench_parse_document(c: &mut Criterion) {
    let chapter = sample_chapter();
    c.bench_function("parse_document", |b| {
        b.iter(|| parse_document(&chapter).unwrap());
    });
}

fn bench_transduce(c: &mut Criterion) {
    let chapter = sample_chapter();
    let body = parse_document(&chapter).unwrap();
    c.bench_function("transduce", |b| {
        b.iter(|| transduce(&body));
    });
}

fn bench_tidy(c: &mut Criterion) {
    let chapter = sample_chapter();
    let raw = transduce(&parse_document(&chapter).unwrap());
    c.bench_function("tidy", |b| {
        b.iter(|| tidy(&raw));
    });
}

fn bench_convert_xhtml(c: &mut Criterion) {
    let chapter = sample_chapter();
    c.bench_function("convert_xhtml", |b| {
        b.iter(|| convert_xhtml(&chapter).unwrap());
    });
}

criterion_group!(
    benches,
    bench_parse_document,
    bench_transduce,
    bench_tidy,
    bench_convert_xhtml
);
criterion_main!(benches);

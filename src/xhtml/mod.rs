//! Markup tree for chapter content.
//!
//! Chapters arrive as XHTML text; the Markdown transducer consumes a parsed
//! tree of [`Node`]s. Tag and attribute names are matched by their
//! namespace-local part and lowercased, so dispatch downstream is
//! case-insensitive. The parser is deliberately forgiving: EPUB content is
//! declared well-formed by the container, so mismatched end tags are
//! tolerated rather than rejected.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::Result;

/// A node in the markup tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    /// Contiguous character data, entity references already resolved.
    Text(String),
}

/// An element: lowercase tag name, ordered attributes, ordered children.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Look up an attribute value by (lowercase) name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// True if the `class` attribute contains the given token.
    pub fn has_class(&self, token: &str) -> bool {
        self.attr("class")
            .map(|classes| classes.split_ascii_whitespace().any(|c| c == token))
            .unwrap_or(false)
    }
}

/// Parse an XHTML document and return its `<body>` element.
///
/// When the input has no `body` element (a bare fragment), the whole parsed
/// content is returned under a synthetic root so fragments convert too.
pub fn parse_document(xhtml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xhtml);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut stack: Vec<Element> = vec![Element::new("#document")];

    loop {
        match reader.read_event()? {
            Event::Start(e) => stack.push(element_from(&e)),
            Event::Empty(e) => {
                let el = element_from(&e);
                append_node(&mut stack, Node::Element(el));
            }
            Event::End(_) => {
                // The synthetic root never pops; stray end tags are dropped.
                if stack.len() > 1 {
                    let el = stack.pop().expect("stack underflow");
                    append_node(&mut stack, Node::Element(el));
                }
            }
            Event::Text(e) => {
                append_text(&mut stack, &String::from_utf8_lossy(e.as_ref()));
            }
            Event::CData(e) => {
                append_text(&mut stack, &String::from_utf8_lossy(e.as_ref()));
            }
            Event::GeneralRef(e) => {
                if let Some(resolved) = resolve_entity(&String::from_utf8_lossy(e.as_ref())) {
                    append_text(&mut stack, &resolved);
                }
            }
            Event::Eof => break,
            // Decl, DocType, PI, Comment carry no content
            _ => {}
        }
    }

    // Close any elements left open at EOF.
    while stack.len() > 1 {
        let el = stack.pop().expect("stack underflow");
        append_node(&mut stack, Node::Element(el));
    }
    let root = stack.pop().expect("missing document root");

    Ok(match extract_body(root) {
        Ok(body) => body,
        Err(root) => root,
    })
}

fn element_from(e: &BytesStart) -> Element {
    let name = e.name();
    let name = String::from_utf8_lossy(local_name(name.as_ref())).to_ascii_lowercase();

    let mut attrs = Vec::new();
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(local_name(attr.key.as_ref())).to_ascii_lowercase();
        let raw = String::from_utf8_lossy(&attr.value).into_owned();
        attrs.push((key, unescape_entities(&raw)));
    }

    Element {
        name,
        attrs,
        children: Vec::new(),
    }
}

fn append_node(stack: &mut [Element], node: Node) {
    stack
        .last_mut()
        .expect("empty element stack")
        .children
        .push(node);
}

/// Append character data, coalescing with a trailing text node so each text
/// node holds the whole contiguous run.
fn append_text(stack: &mut [Element], text: &str) {
    let parent = stack.last_mut().expect("empty element stack");
    if let Some(Node::Text(existing)) = parent.children.last_mut() {
        existing.push_str(text);
    } else {
        parent.children.push(Node::Text(text.to_string()));
    }
}

/// Find and detach the first `body` element in the tree, or give the tree
/// back unchanged.
fn extract_body(el: Element) -> std::result::Result<Element, Element> {
    if el.name == "body" {
        return Ok(el);
    }

    let Element {
        name,
        attrs,
        children,
    } = el;
    let mut remaining = Vec::with_capacity(children.len());
    let mut found = None;

    for child in children {
        match child {
            Node::Element(c) if found.is_none() => match extract_body(c) {
                Ok(body) => found = Some(body),
                Err(c) => remaining.push(Node::Element(c)),
            },
            other => remaining.push(other),
        }
    }

    match found {
        Some(body) => Ok(body),
        None => Err(Element {
            name,
            attrs,
            children: remaining,
        }),
    }
}

/// Extract local name from a potentially namespaced XML name
fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

/// Resolve a general entity reference (the name between `&` and `;`).
fn resolve_entity(name: &str) -> Option<String> {
    let resolved = match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{a0}",
        _ => {
            // Numeric character reference: &#8212; or &#x2014;
            let code = name.strip_prefix('#')?;
            let value = if let Some(hex) = code.strip_prefix('x').or_else(|| code.strip_prefix('X'))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                code.parse::<u32>().ok()?
            };
            return char::from_u32(value).map(String::from);
        }
    };
    Some(resolved.to_string())
}

/// Resolve `&name;` and `&#n;` references inside attribute text; unknown
/// references are left literal.
fn unescape_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp + 1..];
        match tail.find(';') {
            Some(semi) if semi <= 10 => {
                if let Some(resolved) = resolve_entity(&tail[..semi]) {
                    out.push_str(&resolved);
                } else {
                    out.push('&');
                    out.push_str(&tail[..=semi]);
                }
                rest = &tail[semi + 1..];
            }
            _ => {
                out.push('&');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_of(xhtml: &str) -> Element {
        parse_document(xhtml).expect("parse failed")
    }

    #[test]
    fn test_parse_simple_body() {
        let body = body_of("<html><head><title>t</title></head><body><p>Hi</p></body></html>");
        assert_eq!(body.name, "body");
        assert_eq!(body.children.len(), 1);
        match &body.children[0] {
            Node::Element(p) => {
                assert_eq!(p.name, "p");
                assert_eq!(p.children, vec![Node::Text("Hi".to_string())]);
            }
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn test_fragment_without_body() {
        let root = body_of("<p>one</p><p>two</p>");
        assert_eq!(root.children.len(), 2);
    }

    #[test]
    fn test_tag_names_lowercased() {
        let body = body_of("<BODY><P CLASS='x'>t</P></BODY>");
        assert_eq!(body.name, "body");
        match &body.children[0] {
            Node::Element(p) => {
                assert_eq!(p.name, "p");
                assert_eq!(p.attr("class"), Some("x"));
            }
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn test_entities_resolved_in_text() {
        let body = body_of("<body><p>a &amp; b &#8212; c</p></body>");
        match &body.children[0] {
            Node::Element(p) => {
                assert_eq!(p.children, vec![Node::Text("a & b \u{2014} c".to_string())]);
            }
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn test_entities_resolved_in_attributes() {
        let body = body_of(r#"<body><a href="x?a=1&amp;b=2">l</a></body>"#);
        match &body.children[0] {
            Node::Element(a) => assert_eq!(a.attr("href"), Some("x?a=1&b=2")),
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_element() {
        let body = body_of(r#"<body><img src="pic.png" alt=""/></body>"#);
        match &body.children[0] {
            Node::Element(img) => {
                assert_eq!(img.name, "img");
                assert_eq!(img.attr("src"), Some("pic.png"));
                assert_eq!(img.attr("alt"), Some(""));
                assert!(img.children.is_empty());
            }
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn test_has_class() {
        let body = body_of(r#"<body><code class="w highlight"/></body>"#);
        match &body.children[0] {
            Node::Element(code) => {
                assert!(code.has_class("w"));
                assert!(code.has_class("highlight"));
                assert!(!code.has_class("high"));
            }
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn test_unclosed_elements_tolerated() {
        // EOF with <div> still open: content is kept, not dropped
        let root = body_of("<div><p>text");
        assert_eq!(root.children.len(), 1);
    }

    #[test]
    fn test_namespaced_names() {
        let body = body_of(r#"<html:body xmlns:html="x"><html:p>t</html:p></html:body>"#);
        assert_eq!(body.name, "body");
    }
}

//! Text decoding and line-ending helpers.

use std::borrow::Cow;

/// Decode bytes to a string, handling the encodings found in real ebooks.
///
/// 1. Tries UTF-8 first (BOM handled by encoding_rs)
/// 2. If malformed, tries the hint encoding (from `<?xml encoding="..."?>`)
/// 3. Falls back to Windows-1252 (common in old ebooks)
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);
    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, malformed) = encoding.decode(bytes);
        if !malformed {
            return result;
        }
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Extract the declared encoding from an XML declaration, if any.
///
/// Scans only the document prolog (`<?xml version="1.0" encoding="..."?>`);
/// the label is returned as-is for `encoding_rs` to interpret.
pub fn sniff_xml_encoding(bytes: &[u8]) -> Option<String> {
    // The declaration, when present, sits in the first few bytes.
    let head = &bytes[..bytes.len().min(256)];
    let head = String::from_utf8_lossy(head);
    let decl_start = head.find("<?xml")?;
    let decl_end = head[decl_start..].find("?>")? + decl_start;
    let decl = &head[decl_start..decl_end];

    let attr_pos = decl.find("encoding")?;
    let rest = &decl[attr_pos + "encoding".len()..];
    let eq = rest.find('=')?;
    let rest = rest[eq + 1..].trim_start();
    let quote = rest.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let rest = &rest[1..];
    let end = rest.find(quote)?;
    let label = rest[..end].trim();
    if label.is_empty() {
        None
    } else {
        Some(label.to_string())
    }
}

/// Normalize all line endings to LF, then convert to the given separator.
///
/// The conversion pipeline works in `\n` internally; callers that persist
/// text for platform consumption can convert at the edge.
pub fn normalize_newlines(s: &str, separator: &str) -> String {
    let unified = s.replace("\r\n", "\n").replace('\r', "\n");
    if separator == "\n" {
        unified
    } else {
        unified.replace('\n', separator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8() {
        assert_eq!(decode_text("caffè".as_bytes(), None), "caffè");
    }

    #[test]
    fn test_decode_with_hint() {
        // "è" in windows-1252 is 0xE8, invalid as a lone UTF-8 byte
        let bytes = b"caff\xe8";
        assert_eq!(decode_text(bytes, Some("windows-1252")), "caffè");
        assert_eq!(decode_text(bytes, Some("iso-8859-1")), "caffè");
    }

    #[test]
    fn test_decode_fallback_without_hint() {
        let bytes = b"caff\xe8";
        assert_eq!(decode_text(bytes, None), "caffè");
    }

    #[test]
    fn test_sniff_encoding() {
        let xml = br#"<?xml version="1.0" encoding="windows-1252"?><html/>"#;
        assert_eq!(sniff_xml_encoding(xml), Some("windows-1252".to_string()));

        let xml = b"<?xml version='1.0' encoding='UTF-8'?><html/>";
        assert_eq!(sniff_xml_encoding(xml), Some("UTF-8".to_string()));

        assert_eq!(sniff_xml_encoding(b"<html/>"), None);
        assert_eq!(sniff_xml_encoding(b"<?xml version=\"1.0\"?><html/>"), None);
    }

    #[test]
    fn test_normalize_newlines() {
        assert_eq!(normalize_newlines("a\r\nb\rc\nd", "\n"), "a\nb\nc\nd");
        assert_eq!(normalize_newlines("a\nb", "\r\n"), "a\r\nb");
    }
}

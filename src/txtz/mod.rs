//! TXTZ packaging: the converted document plus extracted images in a
//! deterministic zip archive.
//!
//! A TXTZ holds `index.txt` (the concatenated chapter Markdown) next to an
//! `images/` folder. Entries are written in sorted relative-path order with
//! a fixed timestamp, so identical input books produce byte-identical
//! archives.

mod unpack;

pub use unpack::unpack_txtz;

use std::collections::HashSet;
use std::io::{Seek, Write};
use std::path::Path;

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::book::Book;
use crate::error::Result;
use crate::markdown::{IMAGES_FOLDER, basename, convert_xhtml};
use crate::util::{decode_text, sniff_xml_encoding};

/// Name of the document file inside the archive.
pub const INDEX_NAME: &str = "index.txt";

/// Separator appended after each non-empty chapter's Markdown.
pub const CHAPTER_BREAK: &str = "\n---\n";

/// Convert every spine chapter to Markdown, in reading order, joined with
/// [`CHAPTER_BREAK`]. Chapters that convert to nothing are skipped.
pub fn book_to_markdown(book: &Book) -> Result<String> {
    let mut out = String::with_capacity(64 * 1024);

    for item in &book.spine {
        let Some(resource) = book.get_resource(&item.href) else {
            continue;
        };
        let hint = sniff_xml_encoding(&resource.data);
        let xhtml = decode_text(&resource.data, hint.as_deref());
        let markdown = convert_xhtml(&xhtml)?;

        if !markdown.trim().is_empty() {
            out.push_str(&markdown);
            out.push_str(CHAPTER_BREAK);
        }
    }

    Ok(out)
}

/// Write a [`Book`] as a TXTZ archive on disk.
///
/// # Example
///
/// ```no_run
/// use txtz::{read_epub, write_txtz};
///
/// let book = read_epub("input.epub")?;
/// write_txtz(&book, "output.txtz")?;
/// # Ok::<(), txtz::Error>(())
/// ```
pub fn write_txtz<P: AsRef<Path>>(book: &Book, path: P) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_txtz_to_writer(book, file)
}

/// Write a [`Book`] as a TXTZ archive to any [`Write`] + [`Seek`]
/// destination.
pub fn write_txtz_to_writer<W: Write + Seek>(book: &Book, writer: W) -> Result<()> {
    let text = book_to_markdown(book)?;

    // Assemble entries first so the archive is written in sorted order.
    let mut entries: Vec<(String, &[u8])> = Vec::new();
    let mut used = HashSet::new();

    for (href, resource) in book.images() {
        let name = ensure_unique_name(make_safe_file_name(basename(href)), &mut used);
        entries.push((
            format!("{}/{}", IMAGES_FOLDER, name),
            resource.data.as_slice(),
        ));
    }
    entries.push((INDEX_NAME.to_string(), text.as_bytes()));
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut zip = ZipWriter::new(writer);
    // fixed timestamp keeps output byte-reproducible
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    for (name, data) in entries {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(data)?;
    }
    zip.finish()?;

    Ok(())
}

/// Replace path separators and other risky punctuation in names taken from
/// container hrefs. An empty result falls back to `image`.
fn make_safe_file_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '|' | '?' | '*' | '<' | '>' | '"' => '_',
            other => other,
        })
        .collect();

    if sanitized.is_empty() {
        "image".to_string()
    } else {
        sanitized
    }
}

/// Claim `base_name` in `used`, appending `-2`, `-3`, … before the
/// extension until the name is free.
fn ensure_unique_name(base_name: String, used: &mut HashSet<String>) -> String {
    if used.insert(base_name.clone()) {
        return base_name;
    }

    let (stem, ext) = match base_name.rfind('.') {
        Some(dot) if dot > 0 => (&base_name[..dot], &base_name[dot..]),
        _ => (base_name.as_str(), ""),
    };

    let mut i = 2;
    loop {
        let candidate = format!("{stem}-{i}{ext}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        i += 1;
    }
}

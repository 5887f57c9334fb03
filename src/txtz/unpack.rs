//! TXTZ extraction into a Markdown folder layout.
//!
//! The inverse of packaging, aimed at note vaults: the archive is extracted
//! next to nothing else, `index.txt` becomes `<name>.md`, the images folder
//! is renamed to `<name>/`, and image references inside the document are
//! rewritten to match.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use super::INDEX_NAME;
use crate::error::{Error, Result};
use crate::markdown::IMAGES_FOLDER;

/// Extract a TXTZ archive into `dest_dir` and return the path of the
/// produced Markdown file.
///
/// Every entry must resolve inside `dest_dir`; an entry that escapes
/// (absolute path or `..` traversal) aborts with [`Error::Security`] before
/// anything is written for it.
pub fn unpack_txtz<P: AsRef<Path>, Q: AsRef<Path>>(txtz_path: P, dest_dir: Q) -> Result<PathBuf> {
    let txtz_path = txtz_path.as_ref();
    let dest_dir = dest_dir.as_ref();
    fs::create_dir_all(dest_dir)?;

    let file = fs::File::open(txtz_path)?;
    let mut archive = ZipArchive::new(file)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(Error::Security(format!(
                "zip entry escapes destination directory: {}",
                entry.name()
            )));
        };
        let out_path = dest_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
        } else {
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut data = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut data)?;
            fs::write(&out_path, data)?;
        }
    }

    // container metadata has no place in a notes folder
    let opf = dest_dir.join("metadata.opf");
    if opf.is_file() {
        fs::remove_file(opf)?;
    }

    let stem = txtz_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("book");
    let sanitized = sanitize_folder_name(stem);

    let index = dest_dir.join(INDEX_NAME);
    let markdown_path = dest_dir.join(format!("{sanitized}.md"));

    if index.is_file() {
        fs::rename(&index, &markdown_path)?;

        let images = dest_dir.join(IMAGES_FOLDER);
        if images.is_dir() {
            fs::rename(images, dest_dir.join(&sanitized))?;
        }

        let text = fs::read_to_string(&markdown_path)?;
        fs::write(&markdown_path, rewrite_image_refs(&text, &sanitized))?;
    }

    Ok(markdown_path)
}

/// Lowercase, non-alphanumeric runs collapsed to single underscores.
fn sanitize_folder_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_underscore = false;
    for c in name.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() {
            out.push(c);
            prev_underscore = false;
        } else if !prev_underscore {
            out.push('_');
            prev_underscore = true;
        }
    }
    let out = out.trim_matches('_').to_string();
    if out.is_empty() { "book".to_string() } else { out }
}

/// Rewrite `](images/<target>)` references to the renamed folder,
/// unescaping `\(`/`\)` inside the rewritten targets.
fn rewrite_image_refs(text: &str, folder: &str) -> String {
    const NEEDLE: &str = "](images/";

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find(NEEDLE) {
        let target_start = pos + NEEDLE.len();
        match scan_target(&rest[target_start..]) {
            Some(close) => {
                out.push_str(&rest[..pos]);
                out.push_str("](");
                out.push_str(folder);
                out.push('/');
                let target = &rest[target_start..target_start + close];
                out.push_str(&target.replace("\\(", "(").replace("\\)", ")"));
                out.push(')');
                rest = &rest[target_start + close + 1..];
            }
            None => {
                out.push_str(&rest[..target_start]);
                rest = &rest[target_start..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Length of a reference target: up to the first unescaped `)`, never
/// crossing whitespace.
fn scan_target(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b')' => return Some(i),
            b'\\' if i + 1 < bytes.len() => i += 2,
            c if c.is_ascii_whitespace() => return None,
            _ => i += 1,
        }
    }
    None
}

//! Image and link target resolution.
//!
//! Pure and stateless: image sources are rewritten into the fixed archive
//! images folder by basename; link targets pass through verbatim. No
//! normalization of `..` or percent-escapes is performed — anomalies in the
//! source attribute flow through uncorrected.

use super::escape::collapse_newlines;

/// Folder inside the archive that holds extracted images.
pub const IMAGES_FOLDER: &str = "images";

/// The substring after the final `/`, or the whole string if none.
pub fn basename(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[i + 1..],
        None => path,
    }
}

/// Markdown target for an image `src` attribute: fixed folder + basename.
pub fn image_target(src: &str) -> String {
    format!("{}/{}", IMAGES_FOLDER, basename(src))
}

/// Absolute-URL heuristic used to decide whether an anchor becomes a link.
pub fn is_absolute_url(href: &str) -> bool {
    href.contains("://")
}

/// Target portion of a Markdown link: the href verbatim, plus an optional
/// quoted title with internal newlines collapsed.
pub fn format_link_target(href: &str, title: Option<&str>) -> String {
    match title {
        Some(title) => format!("{} \"{}\"", href, collapse_newlines(title)),
        None => href.to_string(),
    }
}

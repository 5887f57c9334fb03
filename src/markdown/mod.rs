//! XHTML chapter content → Markdown text.
//!
//! The conversion core runs in two passes:
//!
//! - [`transduce`]: single depth-first walk over the parsed markup tree,
//!   emitting raw Markdown while tracking list nesting, blockquote depth,
//!   table-cell buffering, and code/pre-formatted mode
//! - [`tidy`]: line-level normalization of the raw output — leading-space
//!   stripping and blank-line collapsing that is fence-aware, so fenced code
//!   (including fences nested under blockquote markers) survives untouched
//!
//! [`escape_markdown`] and the path helpers ([`image_target`],
//! [`is_absolute_url`]) are the pure string pieces both passes share.
//! [`convert_xhtml`] runs the whole pipeline for one chapter.

mod escape;
mod paths;
mod tidy;
mod transduce;

pub use escape::{collapse_newlines, escape_markdown};
pub use paths::{IMAGES_FOLDER, basename, format_link_target, image_target, is_absolute_url};
pub use tidy::tidy;
pub use transduce::{Transducer, transduce};

use crate::error::Result;
use crate::xhtml::parse_document;

/// Convert one chapter's XHTML markup to normalized Markdown.
///
/// Output is never empty in the error-free case — an empty body still tidies
/// to a blank document terminated by two newlines.
pub fn convert_xhtml(xhtml: &str) -> Result<String> {
    let body = parse_document(xhtml)?;
    Ok(tidy(&transduce(&body)))
}

//! # txtz
//!
//! A library for converting EPUB ebooks to Markdown and packaging the
//! result as TXTZ archives.
//!
//! ## Features
//!
//! - Read EPUB 2/3 containers (metadata, spine, resources)
//! - Convert XHTML chapters to Markdown: headings, emphasis, lists,
//!   blockquotes, fenced code blocks, tables, links, images
//! - Fence-aware tidy pass that never corrupts code blocks
//! - Deterministic TXTZ output (`index.txt` + `images/`): identical input
//!   produces byte-identical archives
//! - Unpack TXTZ archives into Markdown note folders
//!
//! ## Quick Start
//!
//! ```no_run
//! use txtz::{read_epub, write_txtz, unpack_txtz};
//!
//! // Convert EPUB to TXTZ
//! let book = read_epub("input.epub").unwrap();
//! write_txtz(&book, "output.txtz").unwrap();
//!
//! // Unpack a TXTZ into a notes folder
//! unpack_txtz("output.txtz", "notes/").unwrap();
//! ```
//!
//! ## Converting Markup Directly
//!
//! The conversion core works on plain strings and carries no I/O:
//!
//! ```
//! use txtz::markdown::convert_xhtml;
//!
//! let md = convert_xhtml("<body><h1>Title</h1><p>Some <em>text</em>.</p></body>").unwrap();
//! assert_eq!(md, "# Title\n\nSome *text*.\n\n");
//! ```

pub mod book;
pub mod epub;
pub mod error;
pub mod markdown;
pub mod txtz;
pub mod util;
pub mod xhtml;

pub use book::{Book, Metadata, Resource, SpineItem};
pub use epub::{read_epub, read_epub_from_reader};
pub use error::{Error, Result};
pub use markdown::convert_xhtml;
pub use txtz::{book_to_markdown, unpack_txtz, write_txtz, write_txtz_to_writer};

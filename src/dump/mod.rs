//! XML-style dumps of the object graph, plus embedded-file extraction.
//!
//! The output format mirrors the document structure one to one: every
//! object variant gets its own element, dictionaries keep their key order,
//! and non-ASCII bytes are escaped as decimal character references so the
//! result is printable regardless of what the document contains.
//!
//! # Example
//!
//! ```no_run
//! use pdfdump::{dump, Document, DumpOptions, StreamMode};
//!
//! let doc = Document::open("report.pdf")?;
//!
//! // Default view: the trailer of every revision
//! let trailers = dump(&doc, &DumpOptions::new())?;
//!
//! // Every object, with stream payloads decoded and escaped
//! let all = dump(
//!     &doc,
//!     &DumpOptions::new().with_dump_all(true).with_mode(StreamMode::Text),
//! )?;
//! # Ok::<(), pdfdump::Error>(())
//! ```

mod embedded;
mod objects;
mod xml;

pub use embedded::extract_embedded_files;
pub use objects::{dump_all, dump_trailers};
pub use xml::{escape, render, StreamMode};

use crate::document::Document;
use crate::error::Result;

/// Selects which parts of a document [`dump`] emits.
///
/// With no selectors set, `dump` falls back to the trailer chain.
#[derive(Debug, Clone, Default)]
pub struct DumpOptions {
    /// Explicit object ids to render, in order, duplicates allowed
    pub object_ids: Vec<u32>,

    /// Zero-based page indices whose attributes or contents to render
    pub pages: Vec<usize>,

    /// How stream payloads are shown (None = attributes only)
    pub mode: Option<StreamMode>,

    /// Dump every object of every revision
    pub dump_all: bool,
}

impl DumpOptions {
    /// Create options with nothing selected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select explicit object ids.
    pub fn with_object_ids(mut self, ids: impl Into<Vec<u32>>) -> Self {
        self.object_ids = ids.into();
        self
    }

    /// Select pages by zero-based index.
    pub fn with_pages(mut self, pages: impl Into<Vec<usize>>) -> Self {
        self.pages = pages.into();
        self
    }

    /// Set the stream payload mode.
    pub fn with_mode(mut self, mode: StreamMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Enable the whole-document dump.
    pub fn with_dump_all(mut self, all: bool) -> Self {
        self.dump_all = all;
        self
    }
}

/// Runs the selected dumps against `doc` and returns their concatenation.
///
/// Sections always come in the same order: explicit ids, then pages, then
/// the whole-document dump. When nothing is selected the trailers are
/// dumped instead. A final newline is appended except in raw and binary
/// modes, whose output must stay byte-exact.
pub fn dump(doc: &Document, options: &DumpOptions) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut selected = false;
    if !options.object_ids.is_empty() {
        objects::dump_ids(&mut out, doc, &options.object_ids, options.mode)?;
        selected = true;
    }
    if !options.pages.is_empty() {
        objects::dump_pages(&mut out, doc, &options.pages, options.mode)?;
        selected = true;
    }
    if options.dump_all {
        out.extend_from_slice(&dump_all(doc, options.mode)?);
        selected = true;
    }
    if !selected {
        out.extend_from_slice(&dump_trailers(doc)?);
    }
    if !matches!(options.mode, Some(StreamMode::Raw) | Some(StreamMode::Binary)) {
        out.push(b'\n');
    }
    Ok(out)
}

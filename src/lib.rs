//! # pdfdump
//!
//! PDF internal structure dumping for debugging and forensics.
//!
//! This library parses the cross reference tables, object graph, and
//! streams of a PDF file and renders them as a pseudo-XML text dump, the
//! way `dumppdf` style tools do. It also extracts embedded file
//! attachments. It never rasterizes anything: the point is to see what a
//! document is made of, not what it looks like.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdfdump::{dump, dump_file, Document, DumpOptions, StreamMode};
//!
//! // Trailer chain only (the default view)
//! let out = dump_file("document.pdf", &DumpOptions::new())?;
//! std::io::Write::write_all(&mut std::io::stdout(), &out)?;
//!
//! // Every object of every revision, stream payloads decoded
//! let doc = Document::open("document.pdf")?;
//! let out = dump(
//!     &doc,
//!     &DumpOptions::new().with_dump_all(true).with_mode(StreamMode::Text),
//! )?;
//!
//! // Pull out file attachments
//! let written = pdfdump::extract_embedded("document.pdf", "attachments")?;
//! println!("extracted {} files", written.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Encrypted documents
//!
//! Documents protected by the standard RC4 security handler are decrypted
//! transparently. Pass the password through [`LoadOptions`]:
//!
//! ```no_run
//! use pdfdump::{Document, LoadOptions};
//!
//! let options = LoadOptions::new().with_password("hunter2");
//! let doc = Document::open_with("secret.pdf", &options)?;
//! # Ok::<(), pdfdump::Error>(())
//! ```

pub mod document;
pub mod dump;
pub mod error;
pub mod object;
pub mod xref;

mod crypt;
mod filters;
mod lexer;
mod parser;

// Re-exports
pub use document::{Document, LoadOptions, Page};
pub use dump::{dump, dump_all, dump_trailers, extract_embedded_files, DumpOptions, StreamMode};
pub use error::{Error, Result};
pub use object::{Dict, Object, Stream};
pub use xref::RevisionTable;

use std::path::{Path, PathBuf};

/// Open a document and dump it with the given options.
///
/// # Example
///
/// ```no_run
/// use pdfdump::{dump_file, DumpOptions};
///
/// let out = dump_file("document.pdf", &DumpOptions::new().with_dump_all(true))?;
/// # Ok::<(), pdfdump::Error>(())
/// ```
pub fn dump_file(path: impl AsRef<Path>, options: &DumpOptions) -> Result<Vec<u8>> {
    let doc = Document::open(path)?;
    dump(&doc, options)
}

/// Open a document and extract its embedded files into `target_dir`.
///
/// Returns the paths written. The directory must already exist.
///
/// # Example
///
/// ```no_run
/// use pdfdump::extract_embedded;
///
/// for path in extract_embedded("document.pdf", "attachments")? {
///     println!("{}", path.display());
/// }
/// # Ok::<(), pdfdump::Error>(())
/// ```
pub fn extract_embedded(
    path: impl AsRef<Path>,
    target_dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>> {
    let doc = Document::open(path)?;
    extract_embedded_files(&doc, target_dir.as_ref())
}

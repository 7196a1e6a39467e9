//! Error types for the pdfdump library.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pdfdump operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading, dumping or extracting from a PDF.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file does not start with a PDF header.
    #[error("Not a PDF document (missing %PDF- header)")]
    InvalidHeader,

    /// Malformed PDF syntax.
    #[error("Syntax error: {0}")]
    Syntax(String),

    /// An object id is not declared by any revision table.
    #[error("Object {0} not found")]
    ObjectNotFound(u32),

    /// An operation required a specific object type and got another.
    #[error("Expected {expected}, found {found}")]
    UnexpectedValue {
        expected: &'static str,
        found: &'static str,
    },

    /// A stream declares a filter this library does not decode.
    #[error("Unsupported stream filter: {0}")]
    UnsupportedFilter(String),

    /// A stream payload could not be decoded.
    #[error("Stream decoding failed: {0}")]
    Filter(String),

    /// The document uses an encryption scheme this library does not handle.
    #[error("Unsupported encryption: {0}")]
    UnsupportedEncryption(String),

    /// A Filespec object is missing pieces or points at the wrong thing.
    #[error("Invalid embedded file: {0}")]
    InvalidEmbeddedFile(String),

    /// Extraction refused to overwrite an existing file.
    #[error("File already exists: {}", .0.display())]
    FileExists(PathBuf),
}

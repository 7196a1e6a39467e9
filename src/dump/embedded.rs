//! Extraction of embedded file attachments onto the local filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use crate::document::Document;
use crate::error::{Error, Result};
use crate::object::{decode_text_string, Dict, Object};

/// Scans every revision for Filespec dictionaries and writes each embedded
/// payload into `target_dir`, returning the paths written.
///
/// Ids are not deduplicated across revisions, so a Filespec carried through
/// an incremental update is seen again and trips the existing-file check.
/// The first failure of any kind stops the run; files written before it
/// stay on disk.
pub fn extract_embedded_files(doc: &Document, target_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for table in doc.revisions() {
        for &id in table.object_ids() {
            let obj = doc.resolve(id)?;
            let dict = match &obj {
                Object::Dict(dict) => dict,
                _ => continue,
            };
            let type_name = dict.get(b"Type").and_then(Object::as_name);
            if !matches!(type_name, Some(b"Filespec")) {
                continue;
            }
            written.push(extract_one(doc, dict, target_dir)?);
        }
    }
    Ok(written)
}

fn extract_one(doc: &Document, spec: &Dict, target_dir: &Path) -> Result<PathBuf> {
    let filename = spec_filename(doc, spec)?;
    let stream = embedded_stream(doc, spec)?;
    let path = target_dir.join(&filename);
    if path.exists() {
        return Err(Error::FileExists(path));
    }
    fs::write(&path, stream.decoded_payload()?)?;
    Ok(path)
}

/// Picks the attachment's file name: the Unicode `UF` entry when it is
/// present and non-empty, the legacy `F` entry otherwise. Only the base
/// name is kept, so a name carrying directory components cannot escape
/// the target directory.
fn spec_filename(doc: &Document, spec: &Dict) -> Result<String> {
    let mut raw: Option<Vec<u8>> = None;
    for key in [b"UF".as_slice(), b"F".as_slice()] {
        if let Some(value) = spec.get(key) {
            let value = doc.resolve_value(value)?;
            if let Object::String(s) = &value {
                if !s.is_empty() {
                    raw = Some(s.clone());
                    break;
                }
            }
        }
    }
    let raw = raw.ok_or_else(|| {
        Error::InvalidEmbeddedFile("Filespec has no usable UF or F file name".into())
    })?;
    let decoded = decode_text_string(&raw);
    let base = decoded
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .to_string();
    if base.is_empty() {
        return Err(Error::InvalidEmbeddedFile(format!(
            "file name {:?} has no base name",
            decoded
        )));
    }
    Ok(base)
}

/// Follows EF -> F to the attachment stream and validates its type.
fn embedded_stream(doc: &Document, spec: &Dict) -> Result<crate::object::Stream> {
    let ef = match spec.get(b"EF") {
        Some(value) => doc.resolve_value(value)?,
        None => return Err(Error::InvalidEmbeddedFile("Filespec has no EF entry".into())),
    };
    let ef = match &ef {
        Object::Dict(dict) => dict,
        other => {
            return Err(Error::InvalidEmbeddedFile(format!(
                "EF entry is {}, not a dictionary",
                other.type_name()
            )))
        }
    };
    let file_id = match ef.get(b"F") {
        Some(Object::Reference(id)) => *id,
        Some(other) => {
            return Err(Error::InvalidEmbeddedFile(format!(
                "EF/F is {}, not a reference",
                other.type_name()
            )))
        }
        None => return Err(Error::InvalidEmbeddedFile("EF dictionary has no F entry".into())),
    };
    match doc.resolve(file_id)? {
        Object::Stream(stream) => {
            let type_name = stream.dict.get(b"Type").and_then(Object::as_name);
            if !matches!(type_name, Some(b"EmbeddedFile")) {
                return Err(Error::InvalidEmbeddedFile(format!(
                    "object {} is not an EmbeddedFile stream",
                    file_id
                )));
            }
            Ok(stream)
        }
        other => Err(Error::InvalidEmbeddedFile(format!(
            "object {} is {}, not a stream",
            file_id,
            other.type_name()
        ))),
    }
}

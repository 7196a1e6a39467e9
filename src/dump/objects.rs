//! Whole-document views: every declared object, and the trailer chain.

use std::collections::HashSet;

use crate::document::Document;
use crate::dump::xml::{render_dict, render_object, StreamMode};
use crate::error::{Error, Result};
use crate::object::Object;

/// Dumps every object declared by any revision, inside a `<pdf>` element,
/// followed by the trailers.
///
/// Tables are visited newest first, so an id redeclared by an update is
/// emitted once, from the newest revision that declares it. Ids whose
/// declarations are all broken are skipped; decode failures propagate.
pub fn dump_all(doc: &Document, mode: Option<StreamMode>) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut emitted: HashSet<u32> = HashSet::new();
    out.extend_from_slice(b"<pdf>");
    for table in doc.revisions() {
        for &id in table.object_ids() {
            if !emitted.insert(id) {
                continue;
            }
            let obj = match doc.resolve(id) {
                Ok(obj) => obj,
                Err(Error::ObjectNotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            if obj.is_null() {
                continue;
            }
            out.extend_from_slice(format!("<object id=\"{}\">\n", id).as_bytes());
            render_object(&mut out, &obj, mode)?;
            out.extend_from_slice(b"\n</object>\n\n");
        }
    }
    dump_trailers_into(&mut out, doc)?;
    out.extend_from_slice(b"</pdf>");
    Ok(out)
}

/// Dumps the trailer dictionary of every revision, newest first. No
/// deduplication happens here: the trailer chain is the point.
pub fn dump_trailers(doc: &Document) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    dump_trailers_into(&mut out, doc)?;
    Ok(out)
}

fn dump_trailers_into(out: &mut Vec<u8>, doc: &Document) -> Result<()> {
    for table in doc.revisions() {
        out.extend_from_slice(b"<trailer>\n");
        render_dict(out, table.trailer(), None)?;
        out.extend_from_slice(b"\n</trailer>\n\n");
    }
    Ok(())
}

/// Resolves and renders explicitly chosen ids, in caller order, with no
/// wrapper element. Unknown ids are an error here, unlike [`dump_all`].
pub(crate) fn dump_ids(
    out: &mut Vec<u8>,
    doc: &Document,
    ids: &[u32],
    mode: Option<StreamMode>,
) -> Result<()> {
    for &id in ids {
        let obj = doc.resolve(id)?;
        render_object(out, &obj, mode)?;
    }
    Ok(())
}

/// Renders the selected pages: their attribute dictionaries by default, or
/// their content streams when a payload mode is chosen.
pub(crate) fn dump_pages(
    out: &mut Vec<u8>,
    doc: &Document,
    pages: &[usize],
    mode: Option<StreamMode>,
) -> Result<()> {
    for (index, page) in doc.pages()?.iter().enumerate() {
        if !pages.contains(&index) {
            continue;
        }
        match mode {
            Some(mode) => {
                for &content_id in &page.content_refs {
                    let obj = doc.resolve(content_id)?;
                    if !matches!(obj, Object::Stream(_)) {
                        return Err(Error::UnexpectedValue {
                            expected: "content stream",
                            found: obj.type_name(),
                        });
                    }
                    render_object(out, &obj, Some(mode))?;
                }
            }
            None => render_dict(out, &page.attrs, None)?,
        }
    }
    Ok(())
}

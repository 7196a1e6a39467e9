//! Document loading and object resolution.
//!
//! [`Document`] keeps the whole file in memory plus one [`RevisionTable`]
//! per revision, newest first. Objects are parsed lazily on [`Document::resolve`]
//! and never cached, except for object stream contents, which are expanded
//! once per container.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::crypt::StandardDecrypter;
use crate::error::{Error, Result};
use crate::lexer::{is_whitespace, Token};
use crate::object::{Dict, Object};
use crate::parser::Parser;
use crate::xref::{ObjectLocation, RevisionTable};

/// Options for opening a document.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    password: String,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// User password for encrypted documents. Defaults to empty, which is
    /// what most encrypted files in the wild expect.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }
}

/// One page of the document.
#[derive(Debug, Clone)]
pub struct Page {
    /// Id of the page object.
    pub object_id: u32,
    /// Page attributes, with Resources, MediaBox, CropBox and Rotate
    /// inherited down the page tree.
    pub attrs: Dict,
    /// Ids of the page's content streams, in order.
    pub content_refs: Vec<u32>,
}

/// Attributes a page inherits from its ancestors in the page tree.
const INHERITABLE_ATTRS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// A loaded PDF document.
#[derive(Debug)]
pub struct Document {
    data: Vec<u8>,
    version: String,
    revisions: Vec<RevisionTable>,
    decrypter: Option<StandardDecrypter>,
    objstm_cache: RefCell<HashMap<u32, Vec<(u32, Object)>>>,
    resolving: RefCell<HashSet<u32>>,
    expanding: RefCell<HashSet<u32>>,
}

impl Document {
    /// Opens a PDF file with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, &LoadOptions::default())
    }

    /// Opens a PDF file.
    pub fn open_with(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Self> {
        let data = fs::read(path)?;
        Self::from_bytes(data, options)
    }

    /// Loads a document from bytes already in memory.
    pub fn from_bytes(data: Vec<u8>, options: &LoadOptions) -> Result<Self> {
        let version = parse_header(&data)?;
        let start = find_startxref(&data)?;
        let mut doc = Self {
            data,
            version,
            revisions: Vec::new(),
            decrypter: None,
            objstm_cache: RefCell::new(HashMap::new()),
            resolving: RefCell::new(HashSet::new()),
            expanding: RefCell::new(HashSet::new()),
        };
        let mut seen = HashSet::new();
        doc.read_revisions(start, &mut seen)?;
        if doc.revisions.is_empty() {
            return Err(Error::Syntax("no cross reference table".into()));
        }
        doc.init_decrypter(options)?;
        Ok(doc)
    }

    /// Version string from the `%PDF-` header, such as `1.7`.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Revision tables, newest first.
    pub fn revisions(&self) -> &[RevisionTable] {
        &self.revisions
    }

    pub fn is_encrypted(&self) -> bool {
        self.decrypter.is_some()
    }

    /// Follows a revision's `Prev` chain, appending tables newest first.
    /// Offsets already visited are skipped, so looped chains terminate.
    fn read_revisions(&mut self, pos: usize, seen: &mut HashSet<usize>) -> Result<()> {
        if !seen.insert(pos) {
            return Ok(());
        }
        if pos >= self.data.len() {
            return Err(Error::Syntax(format!("xref offset {} out of range", pos)));
        }
        let mut parser = Parser::at(&self.data, pos);
        let table = if parser.next_is_keyword(b"xref")? {
            RevisionTable::load_classic(&mut parser)?
        } else {
            let (_, _, obj) = parser.parse_indirect(None, None)?;
            match obj {
                Object::Stream(stream) => RevisionTable::from_xref_stream(&stream)?,
                other => {
                    return Err(Error::UnexpectedValue {
                        expected: "cross reference stream",
                        found: other.type_name(),
                    })
                }
            }
        };
        let bridge = trailer_offset(table.trailer(), b"XRefStm")?;
        let prev = trailer_offset(table.trailer(), b"Prev")?;
        self.revisions.push(table);
        // hybrid files put a cross reference stream between this table and
        // its predecessor
        if let Some(p) = bridge {
            self.read_revisions(p, seen)?;
        }
        if let Some(p) = prev {
            self.read_revisions(p, seen)?;
        }
        Ok(())
    }

    fn init_decrypter(&mut self, options: &LoadOptions) -> Result<()> {
        let mut doc_id: Option<Vec<u8>> = None;
        let mut encrypt: Option<Object> = None;
        for table in &self.revisions {
            let trailer = table.trailer();
            if doc_id.is_none() {
                if let Some(Object::Array(ids)) = trailer.get(b"ID") {
                    doc_id = ids.first().and_then(Object::as_string).map(|s| s.to_vec());
                }
            }
            if encrypt.is_none() {
                encrypt = trailer.get(b"Encrypt").cloned();
            }
            if doc_id.is_some() && encrypt.is_some() {
                break;
            }
        }
        let Some(encrypt) = encrypt else {
            return Ok(());
        };
        let encrypt = self.resolve_value(&encrypt)?;
        let Some(dict) = encrypt.as_dict() else {
            return Err(Error::UnexpectedValue {
                expected: "Encrypt dictionary",
                found: encrypt.type_name(),
            });
        };
        let id = doc_id.unwrap_or_default();
        self.decrypter = Some(StandardDecrypter::new(dict, &id, &options.password)?);
        Ok(())
    }

    /// Resolves an indirect object id through the revision chain, newest
    /// first. Tables that do not declare the id, or whose declaration turns
    /// out to be broken, fall through to older revisions; decode and I/O
    /// failures propagate.
    pub fn resolve(&self, id: u32) -> Result<Object> {
        for table in &self.revisions {
            let Some(location) = table.location(id) else {
                continue;
            };
            match self.load_at(id, location) {
                Ok(obj) => return Ok(obj),
                Err(Error::Syntax(_)) | Err(Error::ObjectNotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(Error::ObjectNotFound(id))
    }

    /// Follows one level of indirection: a reference resolves, anything
    /// else passes through unchanged.
    pub fn resolve_value(&self, obj: &Object) -> Result<Object> {
        match obj {
            Object::Reference(id) => self.resolve(*id),
            other => Ok(other.clone()),
        }
    }

    fn load_at(&self, id: u32, location: ObjectLocation) -> Result<Object> {
        match location {
            ObjectLocation::Offset { pos, .. } => self.load_offset(id, pos),
            ObjectLocation::InObjectStream { container, index } => {
                self.load_from_object_stream(id, container, index)
            }
        }
    }

    fn load_offset(&self, id: u32, pos: usize) -> Result<Object> {
        if pos >= self.data.len() {
            return Err(Error::Syntax(format!("object offset {} out of range", pos)));
        }
        if !self.resolving.borrow_mut().insert(id) {
            return Err(Error::Syntax(format!(
                "circular reference through object {}",
                id
            )));
        }
        let parsed = Parser::at(&self.data, pos).parse_indirect(Some(id), Some(self));
        self.resolving.borrow_mut().remove(&id);
        let (_, gen, mut obj) = parsed?;
        if let Some(decrypter) = &self.decrypter {
            decrypter.decrypt_object(id, gen, &mut obj);
        }
        Ok(obj)
    }

    fn load_from_object_stream(&self, id: u32, container: u32, index: usize) -> Result<Object> {
        if let Some(objects) = self.objstm_cache.borrow().get(&container) {
            return pick_from_stream(objects, id, index);
        }
        if !self.expanding.borrow_mut().insert(container) {
            return Err(Error::Syntax(format!(
                "circular reference through object stream {}",
                container
            )));
        }
        let parsed = self.parse_object_stream(container);
        self.expanding.borrow_mut().remove(&container);
        let objects = parsed?;
        let result = pick_from_stream(&objects, id, index);
        self.objstm_cache.borrow_mut().insert(container, objects);
        result
    }

    /// Expands an object stream: `N` pairs of `id offset` in the header
    /// region, then one object per pair. Contents are never encrypted on
    /// their own, the container payload already was.
    fn parse_object_stream(&self, container: u32) -> Result<Vec<(u32, Object)>> {
        let container_obj = self.resolve(container)?;
        let Object::Stream(stream) = container_obj else {
            return Err(Error::UnexpectedValue {
                expected: "object stream",
                found: container_obj.type_name(),
            });
        };
        let n = stream
            .dict
            .get(b"N")
            .and_then(Object::as_i64)
            .ok_or_else(|| Error::Syntax("object stream has no N".into()))?;
        let first = stream
            .dict
            .get(b"First")
            .and_then(Object::as_i64)
            .and_then(|v| usize::try_from(v).ok())
            .ok_or_else(|| Error::Syntax("object stream has no usable First".into()))?;
        let data = stream.decoded_payload()?;
        let mut header = Parser::new(&data);
        let mut slots = Vec::new();
        for _ in 0..n {
            let id = match header.next()? {
                Some(Token::Integer(v)) if v >= 0 && v <= u32::MAX as i64 => v as u32,
                _ => return Err(Error::Syntax("invalid object stream header".into())),
            };
            let offset = match header.next()? {
                Some(Token::Integer(v)) if v >= 0 => v as usize,
                _ => return Err(Error::Syntax("invalid object stream header".into())),
            };
            slots.push((id, offset));
        }
        let mut objects = Vec::with_capacity(slots.len());
        for (id, offset) in slots {
            let obj = crate::parser::parse_object_at(&data, first + offset)?;
            objects.push((id, obj));
        }
        Ok(objects)
    }

    /// The document catalog, from the newest trailer that names a `/Root`.
    pub fn catalog(&self) -> Result<Dict> {
        for table in &self.revisions {
            if let Some(root) = table.trailer().get(b"Root") {
                let resolved = self.resolve_value(root)?;
                return match resolved {
                    Object::Dict(dict) => Ok(dict),
                    other => Err(Error::UnexpectedValue {
                        expected: "catalog dictionary",
                        found: other.type_name(),
                    }),
                };
            }
        }
        Err(Error::Syntax("no /Root entry in any trailer".into()))
    }

    /// Walks the page tree in document order.
    pub fn pages(&self) -> Result<Vec<Page>> {
        let catalog = self.catalog()?;
        let pages_ref = catalog
            .get(b"Pages")
            .ok_or_else(|| Error::Syntax("catalog has no /Pages".into()))?;
        let root_id = pages_ref.as_reference();
        let root = self.resolve_value(pages_ref)?;
        let Object::Dict(root_dict) = root else {
            return Err(Error::UnexpectedValue {
                expected: "page tree node",
                found: root.type_name(),
            });
        };
        let mut pages = Vec::new();
        let mut visited = HashSet::new();
        if let Some(id) = root_id {
            visited.insert(id);
        }
        self.walk_page_tree(root_id, &root_dict, &catalog, &mut visited, &mut pages)?;
        Ok(pages)
    }

    fn walk_page_tree(
        &self,
        node_id: Option<u32>,
        node: &Dict,
        parent: &Dict,
        visited: &mut HashSet<u32>,
        pages: &mut Vec<Page>,
    ) -> Result<()> {
        // fold inheritable attributes in, the node's own entries win
        let mut attrs = node.clone();
        for key in INHERITABLE_ATTRS {
            if !attrs.contains_key(key) {
                if let Some(value) = parent.get(key) {
                    attrs.insert(key, value.clone());
                }
            }
        }
        let type_name = node.get(b"Type").and_then(Object::as_name);
        if matches!(type_name, Some(b"Pages")) && node.contains_key(b"Kids") {
            let kids = match node.get(b"Kids") {
                Some(value) => self.resolve_value(value)?,
                None => return Ok(()),
            };
            let Some(items) = kids.as_array() else {
                return Ok(());
            };
            for kid in items {
                // kids are references in any well-formed tree
                let Some(kid_id) = kid.as_reference() else {
                    continue;
                };
                if !visited.insert(kid_id) {
                    continue;
                }
                if let Object::Dict(kid_dict) = self.resolve(kid_id)? {
                    self.walk_page_tree(Some(kid_id), &kid_dict, &attrs, visited, pages)?;
                }
            }
        } else if matches!(type_name, Some(b"Page")) {
            let Some(object_id) = node_id else {
                return Ok(());
            };
            let content_refs = self.content_refs(&attrs)?;
            pages.push(Page {
                object_id,
                attrs,
                content_refs,
            });
        }
        Ok(())
    }

    /// `/Contents` is one reference, a reference to an array, or an array
    /// of references.
    fn content_refs(&self, attrs: &Dict) -> Result<Vec<u32>> {
        let Some(contents) = attrs.get(b"Contents") else {
            return Ok(Vec::new());
        };
        match contents {
            Object::Reference(id) => match self.resolve(*id)? {
                Object::Array(items) => Ok(items.iter().filter_map(Object::as_reference).collect()),
                _ => Ok(vec![*id]),
            },
            Object::Array(items) => Ok(items.iter().filter_map(Object::as_reference).collect()),
            _ => Ok(Vec::new()),
        }
    }
}

fn pick_from_stream(objects: &[(u32, Object)], id: u32, index: usize) -> Result<Object> {
    match objects.get(index) {
        Some((stored, obj)) if *stored == id => Ok(obj.clone()),
        Some((stored, _)) => Err(Error::Syntax(format!(
            "object stream entry {} holds object {}, not {}",
            index, stored, id
        ))),
        None => Err(Error::Syntax(format!(
            "object stream index {} out of range",
            index
        ))),
    }
}

fn parse_header(data: &[u8]) -> Result<String> {
    if !data.starts_with(b"%PDF-") {
        return Err(Error::InvalidHeader);
    }
    let rest = &data[5..];
    let end = rest
        .iter()
        .position(|&b| is_whitespace(b))
        .unwrap_or(rest.len());
    Ok(String::from_utf8_lossy(&rest[..end]).into_owned())
}

/// Reads an optional offset-valued trailer entry such as `Prev`.
fn trailer_offset(trailer: &Dict, key: &[u8]) -> Result<Option<usize>> {
    match trailer.get(key) {
        None => Ok(None),
        Some(value) => {
            let n = value.as_i64().ok_or_else(|| {
                Error::Syntax(format!("invalid {} entry", String::from_utf8_lossy(key)))
            })?;
            usize::try_from(n)
                .map(Some)
                .map_err(|_| Error::Syntax("negative xref offset".into()))
        }
    }
}

/// Finds the last `startxref` keyword and reads the offset after it.
fn find_startxref(data: &[u8]) -> Result<usize> {
    let pos = memchr::memmem::rfind(data, b"startxref")
        .ok_or_else(|| Error::Syntax("startxref not found".into()))?;
    let mut parser = Parser::at(data, pos + b"startxref".len());
    match parser.next()? {
        Some(Token::Integer(n)) if n >= 0 => Ok(n as usize),
        _ => Err(Error::Syntax("invalid startxref offset".into())),
    }
}

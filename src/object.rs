//! The PDF object model.
//!
//! Everything a PDF file can store is one of the [`Object`] variants. Keys,
//! names and strings are kept as raw bytes because PDF puts no encoding
//! guarantee on them; [`decode_text_string`] is available for the places the
//! format does define one (UTF-16BE with BOM, else roughly Latin-1).

use crate::error::Result;

/// A parsed PDF object.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// The `null` object.
    Null,
    /// An integer number.
    Integer(i64),
    /// A real number.
    Real(f64),
    /// A string, kept as uninterpreted bytes.
    String(Vec<u8>),
    /// A name such as `/Type`, with `#xx` escapes already decoded.
    Name(Vec<u8>),
    /// A bare keyword token such as `true` or `false`.
    Keyword(Vec<u8>),
    /// An array of objects.
    Array(Vec<Object>),
    /// A dictionary.
    Dict(Dict),
    /// A stream: attribute dictionary plus payload.
    Stream(Stream),
    /// An unresolved reference to an indirect object.
    Reference(u32),
}

impl Object {
    /// Builds a name object from a string, for tests and dictionary lookups.
    pub fn name(name: impl Into<Vec<u8>>) -> Self {
        Object::Name(name.into())
    }

    /// Builds a string object.
    pub fn string(data: impl Into<Vec<u8>>) -> Self {
        Object::String(data.into())
    }

    /// Builds a keyword object.
    pub fn keyword(word: impl Into<Vec<u8>>) -> Self {
        Object::Keyword(word.into())
    }

    /// Short human-readable name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "null",
            Object::Integer(_) => "integer",
            Object::Real(_) => "real",
            Object::String(_) => "string",
            Object::Name(_) => "name",
            Object::Keyword(_) => "keyword",
            Object::Array(_) => "array",
            Object::Dict(_) => "dictionary",
            Object::Stream(_) => "stream",
            Object::Reference(_) => "reference",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Object::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            Object::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&[u8]> {
        match self {
            Object::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Object]> {
        match self {
            Object::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Object::Dict(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&Stream> {
        match self {
            Object::Stream(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<u32> {
        match self {
            Object::Reference(id) => Some(*id),
            _ => None,
        }
    }
}

/// A PDF dictionary.
///
/// Entries keep the order they were written in, so dumps reproduce the
/// document's own layout instead of a hash order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dict {
    entries: Vec<(Vec<u8>, Object)>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry, replacing the value in place if the key is present.
    pub fn insert(&mut self, key: impl Into<Vec<u8>>, value: Object) {
        let key = key.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn get(&self, key: &[u8]) -> Option<&Object> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_slice() == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Returns the value of the first key in `keys` that is present.
    pub fn get_any(&self, keys: &[&[u8]]) -> Option<&Object> {
        keys.iter().find_map(|key| self.get(key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &Object)> {
        self.entries.iter().map(|(k, v)| (k.as_slice(), v))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&[u8], &mut Object)> {
        self.entries.iter_mut().map(|(k, v)| (k.as_slice(), v))
    }
}

/// A PDF stream: attribute dictionary plus the payload bytes.
///
/// `raw` holds the bytes exactly as stored in the file. For encrypted
/// documents the deciphered payload is kept separately so that raw dumps
/// still reproduce the file bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    /// Stream attribute dictionary.
    pub dict: Dict,
    raw: Vec<u8>,
    pub(crate) decrypted: Option<Vec<u8>>,
}

impl Stream {
    pub fn new(dict: Dict, raw: Vec<u8>) -> Self {
        Self {
            dict,
            raw,
            decrypted: None,
        }
    }

    /// The payload exactly as stored in the file, before any decoding.
    pub fn raw_payload(&self) -> &[u8] {
        &self.raw
    }

    /// The payload after decryption and all declared filters.
    pub fn decoded_payload(&self) -> Result<Vec<u8>> {
        crate::filters::decode_stream(self)
    }

    /// The payload after decryption but before filters.
    pub(crate) fn plain_payload(&self) -> &[u8] {
        self.decrypted.as_deref().unwrap_or(&self.raw)
    }
}

/// Decodes a PDF text string: UTF-16BE when the BOM is present, otherwise
/// UTF-8 if the bytes happen to be valid, else a Latin-1 style byte map.
pub fn decode_text_string(data: &[u8]) -> String {
    if data.len() >= 2 && data[0] == 0xfe && data[1] == 0xff {
        let units: Vec<u16> = data[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(data) {
        Ok(s) => s.to_string(),
        Err(_) => data.iter().map(|&b| b as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dict_preserves_insertion_order() {
        let mut dict = Dict::new();
        dict.insert("Zebra", Object::Integer(1));
        dict.insert("Alpha", Object::Integer(2));
        dict.insert("Mid", Object::Integer(3));

        let keys: Vec<&[u8]> = dict.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![b"Zebra" as &[u8], b"Alpha", b"Mid"]);
    }

    #[test]
    fn test_dict_insert_replaces_in_place() {
        let mut dict = Dict::new();
        dict.insert("A", Object::Integer(1));
        dict.insert("B", Object::Integer(2));
        dict.insert("A", Object::Integer(9));

        assert_eq!(dict.len(), 2);
        assert_eq!(dict.get(b"A"), Some(&Object::Integer(9)));
        let keys: Vec<&[u8]> = dict.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![b"A" as &[u8], b"B"]);
    }

    #[test]
    fn test_dict_get_any_order() {
        let mut dict = Dict::new();
        dict.insert("Filter", Object::name("FlateDecode"));
        dict.insert("F", Object::string("external.dat"));

        let found = dict.get_any(&[b"Filter", b"F"]);
        assert_eq!(found, Some(&Object::name("FlateDecode")));
    }

    #[test]
    fn test_object_accessors() {
        assert_eq!(Object::Integer(7).as_i64(), Some(7));
        assert_eq!(Object::Real(7.0).as_i64(), None);
        assert_eq!(Object::Reference(3).as_reference(), Some(3));
        assert_eq!(Object::name("Page").as_name(), Some(b"Page" as &[u8]));
        assert!(Object::Null.is_null());
    }

    #[test]
    fn test_decode_text_string_utf16() {
        let data = [0xfe, 0xff, 0x00, 0x41, 0x00, 0x42];
        assert_eq!(decode_text_string(&data), "AB");
    }

    #[test]
    fn test_decode_text_string_plain() {
        assert_eq!(decode_text_string(b"report.pdf"), "report.pdf");
    }

    #[test]
    fn test_decode_text_string_latin1_fallback() {
        let data = [b'n', 0xe9, b'e'];
        assert_eq!(decode_text_string(&data), "n\u{e9}e");
    }
}

//! Revision tables: the classic `xref` section and the PDF 1.5 cross
//! reference stream. Each revision of an incrementally updated file gets one
//! [`RevisionTable`] holding its object declarations and trailer.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::lexer::Token;
use crate::object::{Dict, Object, Stream};
use crate::parser::Parser;

/// Where a revision table says an object lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ObjectLocation {
    /// At a byte offset in the file, as `N G obj`.
    Offset { pos: usize, gen: u16 },
    /// Inside an object stream, at the given position index.
    InObjectStream { container: u32, index: usize },
}

/// One revision's object declarations plus its trailer dictionary.
#[derive(Debug, Clone)]
pub struct RevisionTable {
    order: Vec<u32>,
    locations: HashMap<u32, ObjectLocation>,
    trailer: Dict,
}

impl RevisionTable {
    fn empty() -> Self {
        Self {
            order: Vec::new(),
            locations: HashMap::new(),
            trailer: Dict::new(),
        }
    }

    /// Ids of the in-use objects this revision declares, in declaration
    /// order. Free entries are not listed.
    pub fn object_ids(&self) -> &[u32] {
        &self.order
    }

    /// The trailer dictionary of this revision. For a cross reference
    /// stream this is the stream's own attribute dictionary.
    pub fn trailer(&self) -> &Dict {
        &self.trailer
    }

    pub(crate) fn location(&self, id: u32) -> Option<ObjectLocation> {
        self.locations.get(&id).copied()
    }

    /// A repeated id within one table keeps its first position in the order
    /// but takes the later location.
    fn insert(&mut self, id: u32, location: ObjectLocation) {
        if self.locations.insert(id, location).is_none() {
            self.order.push(id);
        }
    }

    /// Loads a classic table. The parser must be positioned right after the
    /// `xref` keyword.
    pub(crate) fn load_classic(parser: &mut Parser) -> Result<Self> {
        let mut table = Self::empty();
        loop {
            match parser.next()? {
                Some(Token::Keyword(k)) if k == b"trailer" => break,
                Some(Token::Integer(start)) if start >= 0 => {
                    let count = match parser.next()? {
                        Some(Token::Integer(n)) if n >= 0 => n as u64,
                        _ => return Err(Error::Syntax("invalid xref subsection header".into())),
                    };
                    for i in 0..count {
                        table.load_classic_entry(parser, start as u64 + i)?;
                    }
                }
                _ => return Err(Error::Syntax("invalid xref table".into())),
            }
        }
        match parser.parse_object()? {
            Object::Dict(dict) => table.trailer = dict,
            other => {
                return Err(Error::UnexpectedValue {
                    expected: "trailer dictionary",
                    found: other.type_name(),
                })
            }
        }
        Ok(table)
    }

    fn load_classic_entry(&mut self, parser: &mut Parser, id: u64) -> Result<()> {
        let offset = match parser.next()? {
            Some(Token::Integer(n)) if n >= 0 => n as usize,
            _ => return Err(Error::Syntax("invalid xref entry offset".into())),
        };
        let gen = match parser.next()? {
            Some(Token::Integer(n)) if (0..=65535).contains(&n) => n as u16,
            _ => return Err(Error::Syntax("invalid xref entry generation".into())),
        };
        let in_use = match parser.next()? {
            Some(Token::Keyword(k)) if k == b"n" => true,
            Some(Token::Keyword(k)) if k == b"f" => false,
            _ => return Err(Error::Syntax("invalid xref entry type".into())),
        };
        if in_use {
            let id =
                u32::try_from(id).map_err(|_| Error::Syntax("object id out of range".into()))?;
            self.insert(id, ObjectLocation::Offset { pos: offset, gen });
        }
        Ok(())
    }

    /// Loads a cross reference stream.
    pub(crate) fn from_xref_stream(stream: &Stream) -> Result<Self> {
        if !matches!(
            stream.dict.get(b"Type").and_then(Object::as_name),
            Some(b"XRef")
        ) {
            return Err(Error::Syntax("cross reference stream has wrong Type".into()));
        }
        let size = stream
            .dict
            .get(b"Size")
            .and_then(Object::as_i64)
            .ok_or_else(|| Error::Syntax("cross reference stream has no Size".into()))?;
        let w = stream
            .dict
            .get(b"W")
            .and_then(Object::as_array)
            .ok_or_else(|| Error::Syntax("cross reference stream has no W array".into()))?;
        if w.len() != 3 {
            return Err(Error::Syntax("W array must have three fields".into()));
        }
        let mut widths = [0usize; 3];
        for (slot, item) in widths.iter_mut().zip(w) {
            *slot = item
                .as_i64()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| Error::Syntax("invalid W field width".into()))?;
        }
        let entry_len: usize = widths.iter().sum();
        if entry_len == 0 {
            return Err(Error::Syntax("W array declares empty entries".into()));
        }

        let mut runs = Vec::new();
        match stream.dict.get(b"Index") {
            None => runs.push((0, size)),
            Some(Object::Array(items)) => {
                if items.len() % 2 != 0 {
                    return Err(Error::Syntax("Index array must hold pairs".into()));
                }
                for pair in items.chunks_exact(2) {
                    let start = pair[0]
                        .as_i64()
                        .ok_or_else(|| Error::Syntax("invalid Index start".into()))?;
                    let count = pair[1]
                        .as_i64()
                        .ok_or_else(|| Error::Syntax("invalid Index count".into()))?;
                    runs.push((start, count));
                }
            }
            Some(other) => {
                return Err(Error::UnexpectedValue {
                    expected: "array",
                    found: other.type_name(),
                })
            }
        }

        let data = stream.decoded_payload()?;
        let mut table = Self::empty();
        table.trailer = stream.dict.clone();
        let mut cursor = 0usize;
        for (start, count) in runs {
            for i in 0..count {
                if cursor + entry_len > data.len() {
                    return Err(Error::Syntax("cross reference stream data too short".into()));
                }
                let entry = &data[cursor..cursor + entry_len];
                cursor += entry_len;
                let id = u32::try_from(start + i)
                    .map_err(|_| Error::Syntax("object id out of range".into()))?;
                table.load_stream_entry(id, entry, &widths)?;
            }
        }
        Ok(table)
    }

    fn load_stream_entry(&mut self, id: u32, entry: &[u8], widths: &[usize; 3]) -> Result<()> {
        let f0 = read_field(&entry[..widths[0]]);
        let f1 = read_field(&entry[widths[0]..widths[0] + widths[1]]);
        let f2 = read_field(&entry[widths[0] + widths[1]..]);
        // a zero-width first field means every entry is in use
        let entry_type = if widths[0] == 0 { 1 } else { f0 };
        match entry_type {
            1 => {
                let pos = usize::try_from(f1)
                    .map_err(|_| Error::Syntax("object offset out of range".into()))?;
                let gen = u16::try_from(f2)
                    .map_err(|_| Error::Syntax("generation out of range".into()))?;
                self.insert(id, ObjectLocation::Offset { pos, gen });
            }
            2 => {
                let container = u32::try_from(f1)
                    .map_err(|_| Error::Syntax("container id out of range".into()))?;
                let index = usize::try_from(f2)
                    .map_err(|_| Error::Syntax("stream index out of range".into()))?;
                self.insert(id, ObjectLocation::InObjectStream { container, index });
            }
            // type 0 is a free entry; anything else is ignored
            _ => {}
        }
        Ok(())
    }
}

fn read_field(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classic(body: &[u8]) -> RevisionTable {
        let mut parser = Parser::new(body);
        RevisionTable::load_classic(&mut parser).unwrap()
    }

    #[test]
    fn test_classic_table() {
        let table = classic(
            b"0 3\n\
              0000000000 65535 f \n\
              0000000015 00000 n \n\
              0000000090 00000 n \n\
              trailer\n<< /Size 3 /Root 1 0 R >>\n",
        );
        assert_eq!(table.object_ids(), &[1, 2]);
        assert_eq!(
            table.location(1),
            Some(ObjectLocation::Offset { pos: 15, gen: 0 })
        );
        assert_eq!(table.location(0), None);
        assert_eq!(table.trailer().get(b"Size"), Some(&Object::Integer(3)));
    }

    #[test]
    fn test_classic_multiple_subsections() {
        let table = classic(
            b"3 1\n\
              0000000100 00000 n \n\
              10 2\n\
              0000000200 00000 n \n\
              0000000300 00001 n \n\
              trailer << /Size 12 >>",
        );
        assert_eq!(table.object_ids(), &[3, 10, 11]);
        assert_eq!(
            table.location(11),
            Some(ObjectLocation::Offset { pos: 300, gen: 1 })
        );
    }

    #[test]
    fn test_classic_rejects_garbage() {
        let mut parser = Parser::new(b"0 1\nnot an entry\ntrailer << >>");
        assert!(RevisionTable::load_classic(&mut parser).is_err());
    }

    #[test]
    fn test_classic_missing_trailer_dict() {
        let mut parser = Parser::new(b"0 1\n0000000000 65535 f \ntrailer [1 2]");
        let err = RevisionTable::load_classic(&mut parser).unwrap_err();
        assert!(matches!(err, Error::UnexpectedValue { .. }));
    }

    fn xref_stream(dict_extra: Vec<(&str, Object)>, entries: &[u8]) -> Stream {
        let mut dict = Dict::new();
        dict.insert("Type", Object::name("XRef"));
        for (key, value) in dict_extra {
            dict.insert(key, value);
        }
        Stream::new(dict, entries.to_vec())
    }

    #[test]
    fn test_xref_stream_entries() {
        // W [1 2 1]: type byte, two offset bytes, one gen/index byte
        let entries = [
            0u8, 0, 0, 255, // free
            1, 0, 15, 0, // offset 15
            2, 0, 4, 2, // in object stream 4, index 2
        ];
        let stream = xref_stream(
            vec![
                ("Size", Object::Integer(3)),
                (
                    "W",
                    Object::Array(vec![
                        Object::Integer(1),
                        Object::Integer(2),
                        Object::Integer(1),
                    ]),
                ),
            ],
            &entries,
        );
        let table = RevisionTable::from_xref_stream(&stream).unwrap();
        assert_eq!(table.object_ids(), &[1, 2]);
        assert_eq!(
            table.location(1),
            Some(ObjectLocation::Offset { pos: 15, gen: 0 })
        );
        assert_eq!(
            table.location(2),
            Some(ObjectLocation::InObjectStream {
                container: 4,
                index: 2
            })
        );
        // the trailer is the stream's own dictionary
        assert_eq!(table.trailer().get(b"Size"), Some(&Object::Integer(3)));
    }

    #[test]
    fn test_xref_stream_index_runs() {
        let entries = [
            1u8, 0, 10, 0, // id 5
            1, 0, 20, 0, // id 9
            1, 0, 30, 0, // id 10
        ];
        let stream = xref_stream(
            vec![
                ("Size", Object::Integer(11)),
                (
                    "W",
                    Object::Array(vec![
                        Object::Integer(1),
                        Object::Integer(2),
                        Object::Integer(1),
                    ]),
                ),
                (
                    "Index",
                    Object::Array(vec![
                        Object::Integer(5),
                        Object::Integer(1),
                        Object::Integer(9),
                        Object::Integer(2),
                    ]),
                ),
            ],
            &entries,
        );
        let table = RevisionTable::from_xref_stream(&stream).unwrap();
        assert_eq!(table.object_ids(), &[5, 9, 10]);
    }

    #[test]
    fn test_xref_stream_zero_width_type_defaults_to_in_use() {
        let entries = [0u8, 42, 0];
        let stream = xref_stream(
            vec![
                ("Size", Object::Integer(1)),
                (
                    "W",
                    Object::Array(vec![
                        Object::Integer(0),
                        Object::Integer(2),
                        Object::Integer(1),
                    ]),
                ),
            ],
            &entries,
        );
        let table = RevisionTable::from_xref_stream(&stream).unwrap();
        assert_eq!(
            table.location(0),
            Some(ObjectLocation::Offset { pos: 42, gen: 0 })
        );
    }

    #[test]
    fn test_xref_stream_short_data() {
        let stream = xref_stream(
            vec![
                ("Size", Object::Integer(2)),
                (
                    "W",
                    Object::Array(vec![
                        Object::Integer(1),
                        Object::Integer(2),
                        Object::Integer(1),
                    ]),
                ),
            ],
            &[1, 0, 10, 0],
        );
        assert!(RevisionTable::from_xref_stream(&stream).is_err());
    }

    #[test]
    fn test_xref_stream_wrong_type() {
        let mut dict = Dict::new();
        dict.insert("Type", Object::name("ObjStm"));
        let stream = Stream::new(dict, Vec::new());
        assert!(RevisionTable::from_xref_stream(&stream).is_err());
    }
}

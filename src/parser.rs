//! Token stream to object tree parsing.
//!
//! A [`Parser`] turns the lexer's tokens into [`Object`] values. It folds the
//! three-token `N G R` pattern into a reference and handles the payload read
//! for `stream` objects, including `/Length` entries that are themselves
//! indirect references.

use std::collections::VecDeque;

use crate::document::Document;
use crate::error::{Error, Result};
use crate::lexer::{Lexer, Token};
use crate::object::{Dict, Object, Stream};

pub(crate) struct Parser<'a> {
    data: &'a [u8],
    lexer: Lexer<'a>,
    peeked: VecDeque<Token>,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            lexer: Lexer::new(data),
            peeked: VecDeque::new(),
        }
    }

    pub(crate) fn at(data: &'a [u8], pos: usize) -> Self {
        Self {
            data,
            lexer: Lexer::at(data, pos),
            peeked: VecDeque::new(),
        }
    }

    pub(crate) fn next(&mut self) -> Result<Option<Token>> {
        if let Some(token) = self.peeked.pop_front() {
            return Ok(Some(token));
        }
        self.lexer.next_token()
    }

    fn fill_peek(&mut self, depth: usize) -> Result<()> {
        while self.peeked.len() < depth {
            match self.lexer.next_token()? {
                Some(token) => self.peeked.push_back(token),
                None => break,
            }
        }
        Ok(())
    }

    /// True if the next tokens are `<gen> R`, completing a reference.
    fn peek_is_reference(&mut self) -> Result<bool> {
        self.fill_peek(2)?;
        Ok(matches!(
            (self.peeked.front(), self.peeked.get(1)),
            (Some(Token::Integer(_)), Some(Token::Keyword(k))) if k.as_slice() == b"R"
        ))
    }

    /// Consumes the next token if it is the given keyword.
    pub(crate) fn next_is_keyword(&mut self, word: &[u8]) -> Result<bool> {
        self.fill_peek(1)?;
        let matched = matches!(self.peeked.front(), Some(Token::Keyword(k)) if k.as_slice() == word);
        if matched {
            self.peeked.pop_front();
        }
        Ok(matched)
    }

    /// Parses one object. Fails on end of input.
    pub(crate) fn parse_object(&mut self) -> Result<Object> {
        let Some(token) = self.next()? else {
            return Err(Error::Syntax("unexpected end of data".into()));
        };
        self.object_from(token)
    }

    fn object_from(&mut self, token: Token) -> Result<Object> {
        let obj = match token {
            Token::Integer(n) => {
                if n >= 0 && n <= u32::MAX as i64 && self.peek_is_reference()? {
                    self.peeked.pop_front();
                    self.peeked.pop_front();
                    Object::Reference(n as u32)
                } else {
                    Object::Integer(n)
                }
            }
            Token::Real(x) => Object::Real(x),
            Token::String(s) => Object::String(s),
            Token::Name(n) => Object::Name(n),
            Token::Keyword(k) => match k.as_slice() {
                b"null" => Object::Null,
                _ => Object::Keyword(k),
            },
            Token::ArrayOpen => self.parse_array_body()?,
            Token::DictOpen => self.parse_dict_body()?,
            Token::ArrayClose => return Err(Error::Syntax("unexpected ']'".into())),
            Token::DictClose => return Err(Error::Syntax("unexpected '>>'".into())),
        };
        Ok(obj)
    }

    fn parse_array_body(&mut self) -> Result<Object> {
        let mut items = Vec::new();
        loop {
            let Some(token) = self.next()? else {
                return Err(Error::Syntax("unterminated array".into()));
            };
            if token == Token::ArrayClose {
                break;
            }
            items.push(self.object_from(token)?);
        }
        Ok(Object::Array(items))
    }

    fn parse_dict_body(&mut self) -> Result<Object> {
        let mut dict = Dict::new();
        loop {
            let Some(token) = self.next()? else {
                return Err(Error::Syntax("unterminated dictionary".into()));
            };
            let key = match token {
                Token::DictClose => break,
                Token::Name(n) => n,
                _ => return Err(Error::Syntax("dictionary key must be a name".into())),
            };
            let value = self.parse_object()?;
            // an entry whose value is null reads the same as an absent key
            if !value.is_null() {
                dict.insert(key, value);
            }
        }
        Ok(Object::Dict(dict))
    }

    /// Parses an `N G obj ... endobj` wrapper and the object inside it.
    ///
    /// `expected` cross-checks the id against the revision table entry that
    /// pointed here. `doc` is needed to resolve an indirect `/Length`; xref
    /// streams are loaded before any table exists, so they pass `None` and
    /// require a direct length. A trailing `endobj` is customary but some
    /// writers drop it, so it is not required.
    pub(crate) fn parse_indirect(
        &mut self,
        expected: Option<u32>,
        doc: Option<&Document>,
    ) -> Result<(u32, u16, Object)> {
        let id = match self.next()? {
            Some(Token::Integer(n)) if n >= 0 && n <= u32::MAX as i64 => n as u32,
            _ => return Err(Error::Syntax("expected object id".into())),
        };
        if let Some(expected) = expected {
            if id != expected {
                return Err(Error::Syntax(format!(
                    "object id mismatch: expected {}, found {}",
                    expected, id
                )));
            }
        }
        let gen = match self.next()? {
            Some(Token::Integer(n)) if (0..=65535).contains(&n) => n as u16,
            _ => return Err(Error::Syntax("expected generation number".into())),
        };
        if !self.next_is_keyword(b"obj")? {
            return Err(Error::Syntax("expected 'obj' keyword".into()));
        }
        let value = self.parse_object()?;
        let object = match value {
            Object::Dict(dict) if self.next_is_keyword(b"stream")? => {
                Object::Stream(self.read_stream_payload(dict, doc)?)
            }
            other => other,
        };
        Ok((id, gen, object))
    }

    fn read_stream_payload(&mut self, dict: Dict, doc: Option<&Document>) -> Result<Stream> {
        debug_assert!(self.peeked.is_empty());
        // EOL after the 'stream' keyword: CRLF, LF or a bare CR
        let mut pos = self.lexer.pos();
        match self.data.get(pos) {
            Some(b'\r') => {
                pos += 1;
                if self.data.get(pos) == Some(&b'\n') {
                    pos += 1;
                }
            }
            Some(b'\n') => pos += 1,
            _ => {}
        }
        let length = self.stream_length(&dict, doc)?;
        let end = pos + length;
        if end > self.data.len() {
            return Err(Error::Syntax("stream payload extends past end of data".into()));
        }
        let raw = self.data[pos..end].to_vec();
        self.lexer.seek(end);
        if !self.next_is_keyword(b"endstream")? {
            return Err(Error::Syntax("missing 'endstream' keyword".into()));
        }
        Ok(Stream::new(dict, raw))
    }

    fn stream_length(&self, dict: &Dict, doc: Option<&Document>) -> Result<usize> {
        let n = match dict.get(b"Length") {
            Some(Object::Reference(id)) => {
                let Some(doc) = doc else {
                    return Err(Error::Syntax("stream Length must be direct here".into()));
                };
                let resolved = doc.resolve(*id)?;
                resolved.as_i64().ok_or(Error::UnexpectedValue {
                    expected: "integer",
                    found: resolved.type_name(),
                })?
            }
            Some(other) => other.as_i64().ok_or(Error::UnexpectedValue {
                expected: "integer",
                found: other.type_name(),
            })?,
            None => return Err(Error::Syntax("stream has no Length entry".into())),
        };
        usize::try_from(n).map_err(|_| Error::Syntax("negative stream length".into()))
    }
}

/// Parses a single object at a byte offset, for callers that do not need a
/// full document.
pub(crate) fn parse_object_at(data: &[u8], pos: usize) -> Result<Object> {
    Parser::at(data, pos).parse_object()
}

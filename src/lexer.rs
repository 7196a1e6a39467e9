//! Byte-level tokenizer for PDF syntax.

use crate::error::{Error, Result};

/// One lexical token.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Integer(i64),
    Real(f64),
    String(Vec<u8>),
    Name(Vec<u8>),
    Keyword(Vec<u8>),
    ArrayOpen,
    ArrayClose,
    DictOpen,
    DictClose,
}

/// PDF whitespace: NUL, tab, LF, FF, CR, space.
pub(crate) fn is_whitespace(b: u8) -> bool {
    matches!(b, 0x00 | 0x09 | 0x0a | 0x0c | 0x0d | 0x20)
}

/// PDF delimiters. Everything that is neither whitespace nor a delimiter
/// is a regular character and may appear in names and keywords.
pub(crate) fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

/// Tokenizer over a byte slice. Seekable, because xref offsets and stream
/// payloads force random access.
pub(crate) struct Lexer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
    }

    fn syntax(&self, message: &str) -> Error {
        Error::Syntax(format!("{} at offset {}", message, self.pos))
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.peek().is_some_and(is_whitespace) {
                self.pos += 1;
            }
            if self.peek() == Some(b'%') {
                match memchr::memchr2(b'\r', b'\n', &self.data[self.pos..]) {
                    Some(i) => self.pos += i,
                    None => self.pos = self.data.len(),
                }
            } else {
                return;
            }
        }
    }

    /// Returns the next token, or `None` at end of input.
    pub(crate) fn next_token(&mut self) -> Result<Option<Token>> {
        self.skip_whitespace_and_comments();
        let Some(b) = self.peek() else {
            return Ok(None);
        };
        let token = match b {
            b'(' => {
                self.pos += 1;
                self.lex_literal_string()?
            }
            b'<' => {
                if self.data.get(self.pos + 1) == Some(&b'<') {
                    self.pos += 2;
                    Token::DictOpen
                } else {
                    self.pos += 1;
                    self.lex_hex_string()?
                }
            }
            b'>' => {
                if self.data.get(self.pos + 1) == Some(&b'>') {
                    self.pos += 2;
                    Token::DictClose
                } else {
                    return Err(self.syntax("unexpected '>'"));
                }
            }
            b'[' => {
                self.pos += 1;
                Token::ArrayOpen
            }
            b']' => {
                self.pos += 1;
                Token::ArrayClose
            }
            b'{' => {
                self.pos += 1;
                Token::Keyword(b"{".to_vec())
            }
            b'}' => {
                self.pos += 1;
                Token::Keyword(b"}".to_vec())
            }
            b'/' => {
                self.pos += 1;
                self.lex_name()
            }
            b')' => return Err(self.syntax("unexpected ')'")),
            b'0'..=b'9' | b'+' | b'-' | b'.' => self.lex_number(),
            _ => self.lex_keyword(),
        };
        Ok(Some(token))
    }

    /// Numbers are a run of sign, digit and dot characters. Runs that fit
    /// neither integer nor real syntax come back as keywords, matching how
    /// lenient readers treat stray tokens.
    fn lex_number(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| matches!(b, b'0'..=b'9' | b'+' | b'-' | b'.'))
        {
            self.pos += 1;
        }
        let text = &self.data[start..self.pos];
        if let Ok(s) = std::str::from_utf8(text) {
            if let Ok(n) = s.parse::<i64>() {
                return Token::Integer(n);
            }
            if let Ok(x) = s.parse::<f64>() {
                return Token::Real(x);
            }
        }
        Token::Keyword(text.to_vec())
    }

    fn lex_literal_string(&mut self) -> Result<Token> {
        let mut out = Vec::new();
        let mut depth = 1usize;
        loop {
            let Some(b) = self.peek() else {
                return Err(self.syntax("unterminated string"));
            };
            self.pos += 1;
            match b {
                b'(' => {
                    depth += 1;
                    out.push(b);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    out.push(b);
                }
                b'\\' => self.lex_string_escape(&mut out)?,
                // an unescaped end-of-line reads as a single LF
                b'\r' => {
                    if self.peek() == Some(b'\n') {
                        self.pos += 1;
                    }
                    out.push(b'\n');
                }
                _ => out.push(b),
            }
        }
        Ok(Token::String(out))
    }

    fn lex_string_escape(&mut self, out: &mut Vec<u8>) -> Result<()> {
        let Some(e) = self.peek() else {
            return Err(self.syntax("unterminated string escape"));
        };
        self.pos += 1;
        match e {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'0'..=b'7' => {
                let mut value = (e - b'0') as u32;
                for _ in 0..2 {
                    match self.peek() {
                        Some(d @ b'0'..=b'7') => {
                            value = value * 8 + (d - b'0') as u32;
                            self.pos += 1;
                        }
                        _ => break,
                    }
                }
                out.push((value & 0xff) as u8);
            }
            // backslash-EOL is a line continuation and produces nothing
            b'\r' => {
                if self.peek() == Some(b'\n') {
                    self.pos += 1;
                }
            }
            b'\n' => {}
            other => out.push(other),
        }
        Ok(())
    }

    fn lex_hex_string(&mut self) -> Result<Token> {
        let mut digits = Vec::new();
        loop {
            let Some(b) = self.peek() else {
                return Err(self.syntax("unterminated hex string"));
            };
            self.pos += 1;
            if b == b'>' {
                break;
            }
            if b.is_ascii_hexdigit() {
                digits.push(b);
            }
        }
        if digits.len() % 2 == 1 {
            digits.push(b'0');
        }
        let out = digits
            .chunks_exact(2)
            .map(|pair| hex_value(pair[0]) * 16 + hex_value(pair[1]))
            .collect();
        Ok(Token::String(out))
    }

    fn lex_name(&mut self) -> Token {
        let mut out = Vec::new();
        while let Some(b) = self.peek() {
            if !is_regular(b) {
                break;
            }
            self.pos += 1;
            if b == b'#' {
                let digits = (
                    self.data.get(self.pos).copied(),
                    self.data.get(self.pos + 1).copied(),
                );
                if let (Some(hi), Some(lo)) = digits {
                    if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() {
                        out.push(hex_value(hi) * 16 + hex_value(lo));
                        self.pos += 2;
                        continue;
                    }
                }
            }
            out.push(b);
        }
        Token::Name(out)
    }

    fn lex_keyword(&mut self) -> Token {
        let start = self.pos;
        while self.peek().is_some_and(is_regular) {
            self.pos += 1;
        }
        Token::Keyword(self.data[start..self.pos].to_vec())
    }
}

pub(crate) fn hex_value(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        _ => b - b'A' + 10,
    }
}

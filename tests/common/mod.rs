//! Shared helpers for building synthetic PDF files in memory.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use md5::{Digest, Md5};

/// Assembles well-formed single or multi revision PDF files with classic
/// cross reference tables, tracking object offsets as it goes.
pub struct PdfBuilder {
    buf: Vec<u8>,
    pending: BTreeMap<u32, usize>,
    max_id: u32,
    prev_xref: Option<usize>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self {
            buf: b"%PDF-1.4\n".to_vec(),
            pending: BTreeMap::new(),
            max_id: 0,
            prev_xref: None,
        }
    }

    /// Append an indirect object with the given body text.
    pub fn object(&mut self, id: u32, body: &str) -> &mut Self {
        self.pending.insert(id, self.buf.len());
        self.max_id = self.max_id.max(id);
        self.buf
            .extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", id, body).as_bytes());
        self
    }

    /// Append a stream object; /Length is filled in from the payload.
    pub fn stream_object(&mut self, id: u32, entries: &str, payload: &[u8]) -> &mut Self {
        self.pending.insert(id, self.buf.len());
        self.max_id = self.max_id.max(id);
        let sep = if entries.is_empty() { "" } else { " " };
        self.buf.extend_from_slice(
            format!(
                "{} 0 obj\n<< {}{}/Length {} >>\nstream\n",
                id,
                entries,
                sep,
                payload.len()
            )
            .as_bytes(),
        );
        self.buf.extend_from_slice(payload);
        self.buf.extend_from_slice(b"\nendstream\nendobj\n");
        self
    }

    /// Close the current revision: cross reference table, trailer,
    /// startxref, end-of-file marker. Objects added afterwards go into
    /// the next revision, whose trailer gets a Prev entry automatically.
    pub fn end_revision(&mut self, trailer_extra: &str) -> &mut Self {
        let xref_pos = self.buf.len();
        self.buf.extend_from_slice(b"xref\n0 1\n0000000000 65535 f \n");
        let ids: Vec<u32> = self.pending.keys().copied().collect();
        let mut i = 0;
        while i < ids.len() {
            let mut j = i;
            while j + 1 < ids.len() && ids[j + 1] == ids[j] + 1 {
                j += 1;
            }
            self.buf
                .extend_from_slice(format!("{} {}\n", ids[i], j - i + 1).as_bytes());
            for &id in &ids[i..=j] {
                self.buf
                    .extend_from_slice(format!("{:010} 00000 n \n", self.pending[&id]).as_bytes());
            }
            i = j + 1;
        }
        let mut trailer = format!("trailer\n<< /Size {}", self.max_id + 1);
        if !trailer_extra.is_empty() {
            trailer.push(' ');
            trailer.push_str(trailer_extra);
        }
        if let Some(prev) = self.prev_xref {
            trailer.push_str(&format!(" /Prev {}", prev));
        }
        trailer.push_str(" >>\n");
        self.buf.extend_from_slice(trailer.as_bytes());
        self.buf
            .extend_from_slice(format!("startxref\n{}\n%%EOF\n", xref_pos).as_bytes());
        self.prev_xref = Some(xref_pos);
        self.pending.clear();
        self
    }

    pub fn build(&self) -> Vec<u8> {
        self.buf.clone()
    }
}

/// Zlib-compress data the way FlateDecode expects it.
pub fn flate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// The fixed 32-byte pad of the standard security handler.
pub const PASSWORD_PAD: [u8; 32] = [
    0x28, 0xbf, 0x4e, 0x5e, 0x4e, 0x75, 0x8a, 0x41, 0x64, 0x00, 0x4e, 0x56, 0xff, 0xfa, 0x01, 0x08,
    0x2e, 0x2e, 0x00, 0xb6, 0xd0, 0x68, 0x3e, 0x80, 0x2f, 0x0c, 0xa9, 0xfe, 0x64, 0x53, 0x69, 0x7a,
];

/// Plain RC4, for building encrypted fixtures.
pub fn rc4(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut state: [u8; 256] = [0; 256];
    for (i, slot) in state.iter_mut().enumerate() {
        *slot = i as u8;
    }
    let mut j: u8 = 0;
    for i in 0..256 {
        j = j
            .wrapping_add(state[i])
            .wrapping_add(key[i % key.len()]);
        state.swap(i, j as usize);
    }
    let mut out = Vec::with_capacity(data.len());
    let (mut i, mut j) = (0u8, 0u8);
    for &byte in data {
        i = i.wrapping_add(1);
        j = j.wrapping_add(state[i as usize]);
        state.swap(i as usize, j as usize);
        let k = state[(state[i as usize].wrapping_add(state[j as usize])) as usize];
        out.push(byte ^ k);
    }
    out
}

/// Derives the revision 2 file key for an empty user password.
pub fn r2_file_key(o: &[u8], p: i32, doc_id: &[u8]) -> Vec<u8> {
    let mut md5 = Md5::new();
    md5.update(PASSWORD_PAD);
    md5.update(o);
    md5.update(p.to_le_bytes());
    md5.update(doc_id);
    md5.finalize()[..5].to_vec()
}

/// Derives the per-object RC4 key from a file key.
pub fn object_key(file_key: &[u8], id: u32, gen: u16) -> Vec<u8> {
    let mut md5 = Md5::new();
    md5.update(file_key);
    md5.update(&id.to_le_bytes()[..3]);
    md5.update(gen.to_le_bytes());
    let digest = md5.finalize();
    let n = (file_key.len() + 5).min(16);
    digest[..n].to_vec()
}

/// Uppercase hex, for embedding bytes as a PDF hex string.
pub fn hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02X}", b)).collect()
}

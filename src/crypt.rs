//! Standard security handler decryption: RC4 with MD5 key derivation,
//! revisions 2 and 3. Newer schemes (AES, crypt filters) are reported as
//! unsupported rather than guessed at.

use md5::{Digest, Md5};

use crate::error::{Error, Result};
use crate::object::{Dict, Object};

/// The 32-byte password padding string from the PDF reference.
const PASSWORD_PAD: [u8; 32] = [
    0x28, 0xbf, 0x4e, 0x5e, 0x4e, 0x75, 0x8a, 0x41, 0x64, 0x00, 0x4e, 0x56, 0xff, 0xfa, 0x01,
    0x08, 0x2e, 0x2e, 0x00, 0xb6, 0xd0, 0x68, 0x3e, 0x80, 0x2f, 0x0c, 0xa9, 0xfe, 0x64, 0x53,
    0x69, 0x7a,
];

/// Plain RC4. Encryption and decryption are the same operation.
pub(crate) fn rc4(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut s = [0u8; 256];
    for (i, slot) in s.iter_mut().enumerate() {
        *slot = i as u8;
    }
    let mut j = 0u8;
    for i in 0..256 {
        j = j.wrapping_add(s[i]).wrapping_add(key[i % key.len()]);
        s.swap(i, j as usize);
    }
    let mut out = Vec::with_capacity(data.len());
    let (mut i, mut j) = (0u8, 0u8);
    for &b in data {
        i = i.wrapping_add(1);
        j = j.wrapping_add(s[i as usize]);
        s.swap(i as usize, j as usize);
        let k = s[(s[i as usize] as usize + s[j as usize] as usize) % 256];
        out.push(b ^ k);
    }
    out
}

/// Holds the file key derived from the Encrypt dictionary and user password.
#[derive(Debug)]
pub(crate) struct StandardDecrypter {
    key: Vec<u8>,
}

impl StandardDecrypter {
    pub(crate) fn new(encrypt: &Dict, doc_id: &[u8], password: &str) -> Result<Self> {
        match encrypt.get(b"Filter").and_then(Object::as_name) {
            Some(b"Standard") => {}
            Some(other) => {
                return Err(Error::UnsupportedEncryption(format!(
                    "security handler {}",
                    String::from_utf8_lossy(other)
                )))
            }
            None => {
                return Err(Error::UnsupportedEncryption(
                    "Encrypt dictionary has no Filter".into(),
                ))
            }
        }
        let v = encrypt.get(b"V").and_then(Object::as_i64).unwrap_or(0);
        if v != 1 && v != 2 {
            return Err(Error::UnsupportedEncryption(format!("algorithm V={}", v)));
        }
        let r = encrypt
            .get(b"R")
            .and_then(Object::as_i64)
            .ok_or_else(|| Error::UnsupportedEncryption("missing R entry".into()))?;
        if r != 2 && r != 3 {
            return Err(Error::UnsupportedEncryption(format!("revision R={}", r)));
        }
        let o = encrypt
            .get(b"O")
            .and_then(Object::as_string)
            .ok_or_else(|| Error::UnsupportedEncryption("missing O entry".into()))?;
        let p = encrypt
            .get(b"P")
            .and_then(Object::as_i64)
            .ok_or_else(|| Error::UnsupportedEncryption("missing P entry".into()))?;
        let length_bits = encrypt.get(b"Length").and_then(Object::as_i64).unwrap_or(40);
        let key_len = if r == 2 { 5 } else { (length_bits / 8) as usize };
        if !(5..=16).contains(&key_len) {
            return Err(Error::UnsupportedEncryption(format!(
                "key length {} bits",
                length_bits
            )));
        }

        // Algorithm 2: pad the password, hash it with O, P and the file id
        let mut padded = password.as_bytes().to_vec();
        padded.truncate(32);
        padded.extend_from_slice(&PASSWORD_PAD[..32 - padded.len()]);
        let mut hasher = Md5::new();
        hasher.update(&padded);
        hasher.update(o);
        hasher.update((p as i32).to_le_bytes());
        hasher.update(doc_id);
        let mut digest = hasher.finalize();
        if r == 3 {
            for _ in 0..50 {
                digest = Md5::digest(&digest[..key_len]);
            }
        }
        Ok(Self {
            key: digest[..key_len].to_vec(),
        })
    }

    /// Deciphers one string or payload with the per-object key.
    pub(crate) fn decrypt(&self, id: u32, gen: u16, data: &[u8]) -> Vec<u8> {
        let mut hasher = Md5::new();
        hasher.update(&self.key);
        hasher.update(&id.to_le_bytes()[..3]);
        hasher.update(gen.to_le_bytes());
        let digest = hasher.finalize();
        let n = (self.key.len() + 5).min(16);
        rc4(&digest[..n], data)
    }

    /// Walks an object, deciphering strings and stream payloads in place.
    pub(crate) fn decrypt_object(&self, id: u32, gen: u16, obj: &mut Object) {
        match obj {
            Object::String(s) => *s = self.decrypt(id, gen, s),
            Object::Array(items) => {
                for item in items {
                    self.decrypt_object(id, gen, item);
                }
            }
            Object::Dict(dict) => {
                for (_, value) in dict.iter_mut() {
                    self.decrypt_object(id, gen, value);
                }
            }
            Object::Stream(stream) => {
                // xref streams are written outside the encryption layer
                let type_name = stream.dict.get(b"Type").and_then(Object::as_name);
                if matches!(type_name, Some(b"XRef")) {
                    return;
                }
                for (_, value) in stream.dict.iter_mut() {
                    self.decrypt_object(id, gen, value);
                }
                let plain = self.decrypt(id, gen, stream.raw_payload());
                stream.decrypted = Some(plain);
            }
            _ => {}
        }
    }
}

//! Stream filter decoding: Flate, LZW, ASCIIHex, ASCII85 and RunLength,
//! plus the PNG predictors used by FlateDecode and LZWDecode. Image codecs
//! (DCT, JPX, CCITT, JBIG2) pass through undecoded so their compressed form
//! can still be dumped.

use std::io::Read;

use crate::error::{Error, Result};
use crate::lexer::{hex_value, is_whitespace};
use crate::object::{Dict, Object, Stream};

/// Runs the stream's declared filter chain over its payload.
pub(crate) fn decode_stream(stream: &Stream) -> Result<Vec<u8>> {
    let filters = filter_names(&stream.dict)?;
    let params = filter_params(&stream.dict, filters.len());
    let mut data = stream.plain_payload().to_vec();
    for (name, parm) in filters.iter().zip(params.iter()) {
        data = match name.as_slice() {
            b"FlateDecode" | b"Fl" => apply_predictor(flate_decode(&data)?, parm)?,
            b"LZWDecode" | b"LZW" => apply_predictor(lzw_decode(&data)?, parm)?,
            b"ASCIIHexDecode" | b"AHx" => ascii_hex_decode(&data)?,
            b"ASCII85Decode" | b"A85" => ascii85_decode(&data)?,
            b"RunLengthDecode" | b"RL" => run_length_decode(&data)?,
            // image codecs stay in their compressed form
            b"DCTDecode" | b"DCT" | b"JPXDecode" | b"CCITTFaxDecode" | b"CCF"
            | b"JBIG2Decode" => data,
            other => {
                return Err(Error::UnsupportedFilter(
                    String::from_utf8_lossy(other).into_owned(),
                ))
            }
        };
    }
    Ok(data)
}

fn filter_names(dict: &Dict) -> Result<Vec<Vec<u8>>> {
    match dict.get_any(&[b"Filter", b"F"]) {
        None => Ok(Vec::new()),
        Some(Object::Name(n)) => Ok(vec![n.clone()]),
        Some(Object::Array(items)) => items
            .iter()
            .map(|item| match item {
                Object::Name(n) => Ok(n.clone()),
                other => Err(Error::UnexpectedValue {
                    expected: "filter name",
                    found: other.type_name(),
                }),
            })
            .collect(),
        Some(other) => Err(Error::UnexpectedValue {
            expected: "filter name or array",
            found: other.type_name(),
        }),
    }
}

/// Decode parameters aligned to the filter list, padded with empty dicts.
fn filter_params(dict: &Dict, count: usize) -> Vec<Dict> {
    let mut params: Vec<Dict> = match dict.get_any(&[b"DecodeParms", b"DP", b"Parms"]) {
        Some(Object::Dict(d)) => vec![d.clone()],
        Some(Object::Array(items)) => items
            .iter()
            .map(|item| item.as_dict().cloned().unwrap_or_default())
            .collect(),
        _ => Vec::new(),
    };
    params.resize(count, Dict::new());
    params
}

fn flate_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    flate2::read::ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| Error::Filter(format!("zlib: {}", e)))?;
    Ok(out)
}

fn apply_predictor(data: Vec<u8>, parm: &Dict) -> Result<Vec<u8>> {
    let predictor = parm.get(b"Predictor").and_then(Object::as_i64).unwrap_or(1);
    match predictor {
        1 => Ok(data),
        10..=15 => {
            let colors = parm.get(b"Colors").and_then(Object::as_i64).unwrap_or(1);
            let bits = parm
                .get(b"BitsPerComponent")
                .and_then(Object::as_i64)
                .unwrap_or(8);
            let columns = parm.get(b"Columns").and_then(Object::as_i64).unwrap_or(1);
            png_predictor(&data, colors, bits, columns)
        }
        2 => Err(Error::UnsupportedFilter("TIFF predictor".into())),
        other => Err(Error::Filter(format!("unknown predictor {}", other))),
    }
}

fn png_predictor(data: &[u8], colors: i64, bits: i64, columns: i64) -> Result<Vec<u8>> {
    if bits != 8 {
        return Err(Error::UnsupportedFilter(format!(
            "PNG predictor with {} bits per component",
            bits
        )));
    }
    if colors < 1 || columns < 1 {
        return Err(Error::Filter("invalid predictor parameters".into()));
    }
    let bpp = colors as usize;
    let row_len = bpp * columns as usize;
    if data.len() % (row_len + 1) != 0 {
        return Err(Error::Filter("truncated predictor row".into()));
    }
    let mut out = Vec::with_capacity(data.len());
    let mut prev = vec![0u8; row_len];
    for chunk in data.chunks_exact(row_len + 1) {
        let filter = chunk[0];
        let row = &chunk[1..];
        let mut decoded = vec![0u8; row_len];
        match filter {
            0 => decoded.copy_from_slice(row),
            1 => {
                for i in 0..row_len {
                    let left = if i >= bpp { decoded[i - bpp] } else { 0 };
                    decoded[i] = row[i].wrapping_add(left);
                }
            }
            2 => {
                for i in 0..row_len {
                    decoded[i] = row[i].wrapping_add(prev[i]);
                }
            }
            3 => {
                for i in 0..row_len {
                    let left = if i >= bpp { decoded[i - bpp] as u16 } else { 0 };
                    let avg = ((left + prev[i] as u16) / 2) as u8;
                    decoded[i] = row[i].wrapping_add(avg);
                }
            }
            4 => {
                for i in 0..row_len {
                    let left = if i >= bpp { decoded[i - bpp] } else { 0 };
                    let up_left = if i >= bpp { prev[i - bpp] } else { 0 };
                    decoded[i] = row[i].wrapping_add(paeth(left, prev[i], up_left));
                }
            }
            other => {
                return Err(Error::Filter(format!("unknown PNG filter type {}", other)));
            }
        }
        out.extend_from_slice(&decoded);
        prev = decoded;
    }
    Ok(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

fn read_bits(data: &[u8], bitpos: usize, width: usize) -> usize {
    let mut value = 0usize;
    for i in 0..width {
        let bit = bitpos + i;
        let byte = data[bit / 8];
        let shift = 7 - (bit % 8);
        value = (value << 1) | ((byte >> shift) & 1) as usize;
    }
    value
}

/// PDF flavor LZW: MSB-first codes starting at 9 bits, growing one bit
/// early, clear code 256, end code 257.
fn lzw_decode(data: &[u8]) -> Result<Vec<u8>> {
    const CLEAR: usize = 256;
    const EOD: usize = 257;
    fn base_table() -> Vec<Vec<u8>> {
        let mut table: Vec<Vec<u8>> = (0..=255u8).map(|b| vec![b]).collect();
        table.push(Vec::new());
        table.push(Vec::new());
        table
    }
    let mut table = base_table();
    let mut width = 9usize;
    let mut prev: Option<usize> = None;
    let mut out = Vec::new();
    let mut bitpos = 0usize;
    while bitpos + width <= data.len() * 8 {
        let code = read_bits(data, bitpos, width);
        bitpos += width;
        match code {
            CLEAR => {
                table = base_table();
                width = 9;
                prev = None;
            }
            EOD => break,
            _ => {
                let entry = match prev {
                    None => {
                        if code >= table.len() {
                            return Err(Error::Filter("invalid LZW code".into()));
                        }
                        table[code].clone()
                    }
                    Some(p) => {
                        let entry = if code < table.len() {
                            table[code].clone()
                        } else if code == table.len() {
                            // the KwKwK case: previous entry plus its own first byte
                            let mut e = table[p].clone();
                            e.push(table[p][0]);
                            e
                        } else {
                            return Err(Error::Filter("invalid LZW code".into()));
                        };
                        let mut grown = table[p].clone();
                        grown.push(entry[0]);
                        table.push(grown);
                        entry
                    }
                };
                out.extend_from_slice(&entry);
                prev = Some(code);
                if table.len() >= (1 << width) - 1 && width < 12 {
                    width += 1;
                }
            }
        }
    }
    Ok(out)
}

fn ascii_hex_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut digits = Vec::new();
    for &b in data {
        if b == b'>' {
            break;
        }
        if b.is_ascii_hexdigit() {
            digits.push(b);
        } else if !is_whitespace(b) {
            return Err(Error::Filter(format!("invalid ASCIIHex byte 0x{:02x}", b)));
        }
    }
    if digits.len() % 2 == 1 {
        digits.push(b'0');
    }
    Ok(digits
        .chunks_exact(2)
        .map(|pair| hex_value(pair[0]) * 16 + hex_value(pair[1]))
        .collect())
}

fn ascii85_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut group = [0u8; 5];
    let mut n = 0usize;
    let mut i = if data.starts_with(b"<~") { 2 } else { 0 };
    while i < data.len() {
        let b = data[i];
        i += 1;
        match b {
            b'~' => break,
            b'z' if n == 0 => out.extend_from_slice(&[0, 0, 0, 0]),
            b'!'..=b'u' => {
                group[n] = b - b'!';
                n += 1;
                if n == 5 {
                    out.extend_from_slice(&decode_85_group(&group)?);
                    n = 0;
                }
            }
            _ if is_whitespace(b) => {}
            _ => return Err(Error::Filter(format!("invalid ASCII85 byte 0x{:02x}", b))),
        }
    }
    match n {
        0 => {}
        1 => return Err(Error::Filter("truncated ASCII85 group".into())),
        _ => {
            for slot in group.iter_mut().skip(n) {
                *slot = 84;
            }
            let bytes = decode_85_group(&group)?;
            out.extend_from_slice(&bytes[..n - 1]);
        }
    }
    Ok(out)
}

fn decode_85_group(group: &[u8; 5]) -> Result<[u8; 4]> {
    let mut value = 0u64;
    for &d in group {
        value = value * 85 + d as u64;
    }
    if value > u32::MAX as u64 {
        return Err(Error::Filter("ASCII85 group out of range".into()));
    }
    Ok((value as u32).to_be_bytes())
}

fn run_length_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut i = 0usize;
    while i < data.len() {
        let length = data[i];
        i += 1;
        match length {
            128 => break,
            0..=127 => {
                let count = length as usize + 1;
                if i + count > data.len() {
                    return Err(Error::Filter("truncated RunLength data".into()));
                }
                out.extend_from_slice(&data[i..i + count]);
                i += count;
            }
            _ => {
                let Some(&b) = data.get(i) else {
                    return Err(Error::Filter("truncated RunLength data".into()));
                };
                out.extend(std::iter::repeat(b).take(257 - length as usize));
                i += 1;
            }
        }
    }
    Ok(out)
}

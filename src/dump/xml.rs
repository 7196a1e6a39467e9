//! XML-style rendering of PDF objects.
//!
//! The output is markup shaped, not schema-valid XML: names and keywords
//! are written verbatim, everything else byte-escapes through [`escape`].

use crate::error::Result;
use crate::object::{Dict, Object, Stream};

/// How stream payloads are rendered in dumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    /// Props plus the decoded payload, escaped, in a data element.
    Text,
    /// The stored payload verbatim, with no markup at all.
    Raw,
    /// The decoded payload verbatim, with no markup at all.
    Binary,
}

fn needs_escape(b: u8) -> bool {
    b <= 0x1f || b >= 0x7f || matches!(b, b'&' | b'<' | b'>' | b'(' | b')' | b'"' | b'\'' | b'\\')
}

/// Escapes arbitrary bytes for embedding in dump markup. Markup characters,
/// quotes, parentheses, backslash and every byte outside printable ASCII
/// become decimal character references.
pub fn escape(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    escape_into(&mut out, data);
    out
}

fn escape_into(out: &mut Vec<u8>, data: &[u8]) {
    for &b in data {
        if needs_escape(b) {
            out.extend_from_slice(format!("&#{};", b).as_bytes());
        } else {
            out.push(b);
        }
    }
}

/// Renders one object to bytes.
pub fn render(obj: &Object, mode: Option<StreamMode>) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    render_object(&mut out, obj, mode)?;
    Ok(out)
}

pub(crate) fn render_object(
    out: &mut Vec<u8>,
    obj: &Object,
    mode: Option<StreamMode>,
) -> Result<()> {
    match obj {
        Object::Null => out.extend_from_slice(b"<null />"),
        Object::Integer(n) => {
            out.extend_from_slice(format!("<number>{}</number>", n).as_bytes());
        }
        Object::Real(x) => {
            let mut buf = ryu::Buffer::new();
            out.extend_from_slice(format!("<number>{}</number>", buf.format(*x)).as_bytes());
        }
        Object::String(s) => {
            out.extend_from_slice(format!("<string size=\"{}\">", s.len()).as_bytes());
            escape_into(out, s);
            out.extend_from_slice(b"</string>");
        }
        Object::Name(n) => {
            out.extend_from_slice(b"<literal>");
            out.extend_from_slice(n);
            out.extend_from_slice(b"</literal>");
        }
        Object::Keyword(k) => {
            out.extend_from_slice(b"<keyword>");
            out.extend_from_slice(k);
            out.extend_from_slice(b"</keyword>");
        }
        Object::Array(items) => {
            out.extend_from_slice(format!("<list size=\"{}\">\n", items.len()).as_bytes());
            for item in items {
                render_object(out, item, mode)?;
                out.push(b'\n');
            }
            out.extend_from_slice(b"</list>");
        }
        Object::Dict(dict) => render_dict(out, dict, mode)?,
        Object::Stream(stream) => render_stream(out, stream, mode)?,
        Object::Reference(id) => {
            out.extend_from_slice(format!("<ref id=\"{}\" />", id).as_bytes());
        }
    }
    Ok(())
}

pub(crate) fn render_dict(out: &mut Vec<u8>, dict: &Dict, mode: Option<StreamMode>) -> Result<()> {
    out.extend_from_slice(format!("<dict size=\"{}\">\n", dict.len()).as_bytes());
    for (key, value) in dict.iter() {
        out.extend_from_slice(b"<key>");
        escape_into(out, key);
        out.extend_from_slice(b"</key>\n<value>");
        render_object(out, value, mode)?;
        out.extend_from_slice(b"</value>\n");
    }
    out.extend_from_slice(b"</dict>");
    Ok(())
}

fn render_stream(out: &mut Vec<u8>, stream: &Stream, mode: Option<StreamMode>) -> Result<()> {
    match mode {
        Some(StreamMode::Raw) => out.extend_from_slice(stream.raw_payload()),
        Some(StreamMode::Binary) => out.extend_from_slice(&stream.decoded_payload()?),
        Some(StreamMode::Text) | None => {
            out.extend_from_slice(b"<stream>\n<props>\n");
            render_dict(out, &stream.dict, mode)?;
            out.extend_from_slice(b"\n</props>\n");
            if mode == Some(StreamMode::Text) {
                let data = stream.decoded_payload()?;
                out.extend_from_slice(format!("<data size=\"{}\">", data.len()).as_bytes());
                escape_into(out, &data);
                out.extend_from_slice(b"</data>\n");
            }
            out.extend_from_slice(b"</stream>");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(obj: &Object) -> String {
        String::from_utf8(render(obj, None).unwrap()).unwrap()
    }

    #[test]
    fn test_escape_rules() {
        assert_eq!(escape(b"plain text."), b"plain text.");
        assert_eq!(escape(b"a&b"), b"a&#38;b");
        assert_eq!(escape(b"<tag>"), b"&#60;tag&#62;");
        assert_eq!(escape(b"(q\"w'e)\\"), b"&#40;q&#34;w&#39;e&#41;&#92;");
        assert_eq!(escape(&[0x00, 0x1f, 0x7f, 0xff]), b"&#0;&#31;&#127;&#255;");
        // 0x20 and 0x7e sit just inside the untouched range
        assert_eq!(escape(&[0x20, 0x7e]), b" ~");
    }

    #[test]
    fn test_render_scalars() {
        assert_eq!(rendered(&Object::Null), "<null />");
        assert_eq!(rendered(&Object::Integer(-7)), "<number>-7</number>");
        assert_eq!(rendered(&Object::Real(1.0)), "<number>1.0</number>");
        assert_eq!(rendered(&Object::Real(0.5)), "<number>0.5</number>");
        assert_eq!(rendered(&Object::Reference(3)), "<ref id=\"3\" />");
        assert_eq!(rendered(&Object::keyword("true")), "<keyword>true</keyword>");
    }

    #[test]
    fn test_render_string_counts_bytes_before_escaping() {
        assert_eq!(
            rendered(&Object::string("a(b")),
            "<string size=\"3\">a&#40;b</string>"
        );
    }

    #[test]
    fn test_names_and_keywords_stay_verbatim() {
        assert_eq!(rendered(&Object::name("F&o")), "<literal>F&o</literal>");
        assert_eq!(rendered(&Object::keyword("a<b")), "<keyword>a<b</keyword>");
    }

    #[test]
    fn test_render_list_layout() {
        let obj = Object::Array(vec![Object::Integer(1), Object::Null]);
        assert_eq!(
            rendered(&obj),
            "<list size=\"2\">\n<number>1</number>\n<null />\n</list>"
        );
    }

    #[test]
    fn test_render_empty_list() {
        assert_eq!(rendered(&Object::Array(vec![])), "<list size=\"0\">\n</list>");
    }

    #[test]
    fn test_render_dict_layout_and_order() {
        let mut dict = Dict::new();
        dict.insert("Zz", Object::Integer(1));
        dict.insert("Aa", Object::Integer(2));
        assert_eq!(
            rendered(&Object::Dict(dict)),
            "<dict size=\"2\">\n\
             <key>Zz</key>\n<value><number>1</number></value>\n\
             <key>Aa</key>\n<value><number>2</number></value>\n\
             </dict>"
        );
    }

    #[test]
    fn test_render_dict_with_empty_list_value() {
        let mut dict = Dict::new();
        dict.insert("A", Object::Integer(1));
        dict.insert("B", Object::Array(vec![]));
        assert_eq!(
            rendered(&Object::Dict(dict)),
            "<dict size=\"2\">\n\
             <key>A</key>\n<value><number>1</number></value>\n\
             <key>B</key>\n<value><list size=\"0\">\n</list></value>\n\
             </dict>"
        );
    }

    #[test]
    fn test_render_dict_escapes_keys() {
        let mut dict = Dict::new();
        dict.insert("A&B", Object::Integer(1));
        let text = rendered(&Object::Dict(dict));
        assert!(text.contains("<key>A&#38;B</key>"));
    }

    #[test]
    fn test_render_stream_default_has_no_data() {
        let mut dict = Dict::new();
        dict.insert("Length", Object::Integer(2));
        let stream = Object::Stream(Stream::new(dict, b"ab".to_vec()));
        assert_eq!(
            rendered(&stream),
            "<stream>\n<props>\n\
             <dict size=\"1\">\n<key>Length</key>\n<value><number>2</number></value>\n</dict>\n\
             </props>\n</stream>"
        );
    }

    #[test]
    fn test_render_stream_text_mode() {
        let stream = Object::Stream(Stream::new(Dict::new(), b"a(b".to_vec()));
        let out = render(&stream, Some(StreamMode::Text)).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "<stream>\n<props>\n<dict size=\"0\">\n</dict>\n</props>\n\
             <data size=\"3\">a&#40;b</data>\n</stream>"
        );
    }

    #[test]
    fn test_render_stream_raw_and_binary_bare() {
        let stream = Object::Stream(Stream::new(Dict::new(), vec![0x01, 0xff, b'<']));
        assert_eq!(
            render(&stream, Some(StreamMode::Raw)).unwrap(),
            vec![0x01, 0xff, b'<']
        );
        assert_eq!(
            render(&stream, Some(StreamMode::Binary)).unwrap(),
            vec![0x01, 0xff, b'<']
        );
    }
}

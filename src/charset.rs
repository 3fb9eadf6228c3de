//! Byte Stream Decoding
//!
//! Rules and stylesheets arrive as bytes. The character encoding comes from
//! the byte order mark, then from the XML declaration, then defaults to
//! UTF-8 (XML 1.0 Appendix F).

use encoding_rs::{Encoding, REPLACEMENT, UTF_16BE, UTF_16LE, UTF_8};

use crate::document::ParseError;

/// Longest prefix searched for the XML declaration.
const DECL_SCAN_LIMIT: usize = 1024;

pub fn decode_xml(bytes: &[u8]) -> Result<String, ParseError> {
    let (encoding, body) = detect(bytes)?;
    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .map(|text| text.into_owned())
        .ok_or_else(|| ParseError::unlocated(format!("input is not valid {}", encoding.name())))
}

fn detect(bytes: &[u8]) -> Result<(&'static Encoding, &[u8]), ParseError> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return Ok((encoding, &bytes[bom_len..]));
    }
    // "<?" in UTF-16 without a BOM
    if bytes.starts_with(&[0x3C, 0x00, 0x3F, 0x00]) {
        return Ok((UTF_16LE, bytes));
    }
    if bytes.starts_with(&[0x00, 0x3C, 0x00, 0x3F]) {
        return Ok((UTF_16BE, bytes));
    }

    let label = match declared_encoding(bytes) {
        Some(label) => label,
        None => return Ok((UTF_8, bytes)),
    };
    match Encoding::for_label(label.as_bytes()) {
        Some(encoding) if encoding == UTF_16LE || encoding == UTF_16BE => Err(ParseError::unlocated(
            format!("encoding {} declared but the input is not UTF-16", label),
        )),
        Some(encoding) if encoding != REPLACEMENT => Ok((encoding, bytes)),
        _ => Err(ParseError::unlocated(format!("unsupported encoding {}", label))),
    }
}

/// The `encoding` pseudo-attribute of a leading XML declaration, if any.
fn declared_encoding(bytes: &[u8]) -> Option<String> {
    if !bytes.starts_with(b"<?xml") {
        return None;
    }
    let head = &bytes[..bytes.len().min(DECL_SCAN_LIMIT)];
    let end = head.windows(2).position(|w| w == b"?>")?;
    // the declaration itself is ASCII in every ASCII-compatible encoding
    let decl = String::from_utf8_lossy(&head[5..end]);

    let rest = &decl[decl.find("encoding")? + "encoding".len()..];
    let rest = rest.trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &rest[1..];
    value.find(quote).map(|close| value[..close].to_string())
}

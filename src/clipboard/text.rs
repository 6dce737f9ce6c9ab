//! Text codec between the toolkit's wide characters and selection bytes.
//!
//! The toolkit hands text around as UTF-32 code units (`wchar_t` on
//! Linux). Selections carry bytes: UTF-8 for everything we own, and
//! either UTF-8 or ISO Latin-1 for what other clients send us.

use super::ClipboardError;

/// Byte encodings a conversion reply can arrive in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Latin1,
}

/// Encode wide characters as UTF-8.
///
/// Fails on the first unit that is not a Unicode scalar value
/// (a surrogate or anything above U+10FFFF).
pub fn encode_wide(text: &[u32]) -> Result<Vec<u8>, ClipboardError> {
    let mut out = String::with_capacity(text.len());
    for (position, &unit) in text.iter().enumerate() {
        let c = char::from_u32(unit).ok_or(ClipboardError::Encoding { position, unit })?;
        out.push(c);
    }
    Ok(out.into_bytes())
}

/// Widen a string into the toolkit's code units.
pub fn to_wide(text: &str) -> Vec<u32> {
    text.chars().map(u32::from).collect()
}

/// Decode selection bytes. Invalid UTF-8 sequences become U+FFFD and a
/// trailing NUL terminator, which some owners include, is dropped.
pub fn decode(bytes: &[u8], encoding: Encoding) -> String {
    let bytes = match bytes.split_last() {
        Some((0, rest)) => rest,
        _ => bytes,
    };
    match encoding {
        Encoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        Encoding::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

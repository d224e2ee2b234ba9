//! Text decoding for repository files.
//!
//! Legacy Java trees often carry Windows-1252 or Latin-1 sources. Files are
//! decoded through a fixed chain (UTF-8 with BOM, UTF-8, Windows-1252 with
//! Latin-1 for the five bytes Windows-1252 leaves undefined) and edited files
//! are written back in the encoding they were read in.

use thiserror::Error;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Windows-1252 code points for bytes 0x80..=0x9F. `None` marks the bytes the
/// code page leaves undefined; those decode as the Latin-1 control character.
const CP1252_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'),
    None,
    Some('\u{201A}'),
    Some('\u{0192}'),
    Some('\u{201E}'),
    Some('\u{2026}'),
    Some('\u{2020}'),
    Some('\u{2021}'),
    Some('\u{02C6}'),
    Some('\u{2030}'),
    Some('\u{0160}'),
    Some('\u{2039}'),
    Some('\u{0152}'),
    None,
    Some('\u{017D}'),
    None,
    None,
    Some('\u{2018}'),
    Some('\u{2019}'),
    Some('\u{201C}'),
    Some('\u{201D}'),
    Some('\u{2022}'),
    Some('\u{2013}'),
    Some('\u{2014}'),
    Some('\u{02DC}'),
    Some('\u{2122}'),
    Some('\u{0161}'),
    Some('\u{203A}'),
    Some('\u{0153}'),
    None,
    Some('\u{017E}'),
    Some('\u{0178}'),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    /// UTF-8 preceded by a byte-order mark, which is kept on write.
    Utf8Bom,
    Windows1252,
}

impl TextEncoding {
    pub fn as_str(self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Utf8Bom => "utf-8-sig",
            TextEncoding::Windows1252 => "windows-1252",
        }
    }

    /// Bytes of `text` in this encoding.
    pub fn encode(self, text: &str) -> Result<Vec<u8>, EncodeError> {
        match self {
            TextEncoding::Utf8 => Ok(text.as_bytes().to_vec()),
            TextEncoding::Utf8Bom => {
                let mut out = UTF8_BOM.to_vec();
                out.extend_from_slice(text.as_bytes());
                Ok(out)
            }
            TextEncoding::Windows1252 => text
                .chars()
                .map(|c| cp1252_byte(c).ok_or(EncodeError { ch: c, encoding: self }))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{ch}` cannot be written as {}", .encoding.as_str())]
pub struct EncodeError {
    pub ch: char,
    pub encoding: TextEncoding,
}

/// File content after decoding, with the encoding it was read in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding: TextEncoding,
}

impl DecodedText {
    pub fn utf8(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            encoding: TextEncoding::Utf8,
        }
    }
}

/// Decode `bytes` through the fallback chain. Content with NUL bytes is
/// treated as binary and yields `None`.
pub fn decode(bytes: &[u8]) -> Option<DecodedText> {
    if bytes.contains(&0) {
        return None;
    }
    if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
        if let Ok(text) = std::str::from_utf8(rest) {
            return Some(DecodedText {
                text: text.to_string(),
                encoding: TextEncoding::Utf8Bom,
            });
        }
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Some(DecodedText::utf8(text));
    }
    Some(DecodedText {
        text: bytes.iter().map(|&b| cp1252_char(b)).collect(),
        encoding: TextEncoding::Windows1252,
    })
}

fn cp1252_char(b: u8) -> char {
    match b {
        0x80..=0x9F => CP1252_HIGH[usize::from(b - 0x80)].unwrap_or(char::from(b)),
        _ => char::from(b),
    }
}

fn cp1252_byte(c: char) -> Option<u8> {
    let code = u32::from(c);
    if code < 0x80 || (0xA0..=0xFF).contains(&code) {
        return u8::try_from(code).ok();
    }
    if let Some(i) = CP1252_HIGH.iter().position(|m| *m == Some(c)) {
        return u8::try_from(0x80 + i).ok();
    }
    // Undefined positions round-trip through their Latin-1 control character.
    u8::try_from(code)
        .ok()
        .filter(|b| (0x80..=0x9F).contains(b) && CP1252_HIGH[usize::from(b - 0x80)].is_none())
}

use encoding_rs::{DecoderResult, Encoding, SHIFT_JIS, UTF_8};
use std::fmt;
use thiserror::Error;

/// Text encodings tried, in order, when decoding an incoming object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextEncoding {
    Utf8,
    /// JIS X 0208 Shift_JIS without vendor extensions.
    ShiftJis,
    /// Windows-31J: Shift_JIS plus the NEC and IBM extension rows.
    Cp932,
}

impl TextEncoding {
    pub const FALLBACK_ORDER: [TextEncoding; 3] =
        [TextEncoding::Utf8, TextEncoding::ShiftJis, TextEncoding::Cp932];

    pub fn as_str(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf8",
            TextEncoding::ShiftJis => "sjis",
            TextEncoding::Cp932 => "cp932",
        }
    }

    fn decode(self, bytes: &[u8]) -> Result<String, String> {
        match self {
            TextEncoding::Utf8 => {
                let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
                decode_strict(UTF_8, body)
            }
            TextEncoding::ShiftJis => {
                if let Some((pos, lead)) = find_vendor_lead_byte(bytes) {
                    return Err(format!(
                        "can't decode byte 0x{:02x} in position {}: vendor extension",
                        lead, pos
                    ));
                }
                decode_strict(SHIFT_JIS, bytes)
            }
            // encoding_rs implements the WHATWG Shift_JIS decoder, which is Windows-31J
            TextEncoding::Cp932 => decode_strict(SHIFT_JIS, bytes),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("'{encoding}' codec {reason}")]
pub struct DecodeError {
    /// The last encoding tried.
    pub encoding: TextEncoding,
    pub reason: String,
}

/// Decoded text plus the bookkeeping of which encodings were tried.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub text: String,
    pub encoding: TextEncoding,
    pub attempts: Vec<TextEncoding>,
}

/// Decode `bytes` with the first encoding in [`TextEncoding::FALLBACK_ORDER`]
/// that accepts it. Decodability is the only check.
pub fn decode_with_fallback(bytes: &[u8]) -> Result<Decoded, DecodeError> {
    let mut attempts = Vec::with_capacity(TextEncoding::FALLBACK_ORDER.len());
    let mut last_err = None;

    for encoding in TextEncoding::FALLBACK_ORDER {
        attempts.push(encoding);
        match encoding.decode(bytes) {
            Ok(text) => {
                return Ok(Decoded {
                    text,
                    encoding,
                    attempts,
                })
            }
            Err(reason) => last_err = Some(DecodeError { encoding, reason }),
        }
    }

    Err(last_err.unwrap_or(DecodeError {
        encoding: TextEncoding::Cp932,
        reason: "no encoding attempted".to_string(),
    }))
}

fn decode_strict(encoding: &'static Encoding, bytes: &[u8]) -> Result<String, String> {
    let mut decoder = encoding.new_decoder_without_bom_handling();
    let capacity = decoder
        .max_utf8_buffer_length_without_replacement(bytes.len())
        .ok_or_else(|| "input too large".to_string())?;
    let mut out = String::with_capacity(capacity);

    let (result, read) = decoder.decode_to_string_without_replacement(bytes, &mut out, true);
    match result {
        DecoderResult::InputEmpty => Ok(out),
        DecoderResult::Malformed(bad, extra) => {
            let pos = read.saturating_sub(bad as usize + extra as usize);
            Err(format!(
                "can't decode byte 0x{:02x} in position {}: invalid sequence",
                bytes.get(pos).copied().unwrap_or_default(),
                pos
            ))
        }
        DecoderResult::OutputFull => Err("output buffer exhausted".to_string()),
    }
}

/// Bytes Windows-31J assigns but plain Shift_JIS leaves undefined: the
/// single byte 0x80, NEC row 13 (0x87), NEC-selected IBM rows (0xED, 0xEE),
/// user-defined area (0xF0..=0xF9) and IBM rows (0xFA..=0xFC).
fn is_vendor_lead(b: u8) -> bool {
    matches!(b, 0x80 | 0x87 | 0xED | 0xEE | 0xF0..=0xFC)
}

fn find_vendor_lead_byte(bytes: &[u8]) -> Option<(usize, u8)> {
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match b {
            0x80..=0x9F | 0xE0..=0xFC => {
                if is_vendor_lead(b) {
                    return Some((i, b));
                }
                i += 2;
            }
            _ => i += 1,
        }
    }
    None
}

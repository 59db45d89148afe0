use thiserror::Error;

use crate::cursor::{BinaryCursor, CursorError};

/// Marks the end of one encoded string.
pub const STRING_TERMINATOR: u8 = 0xFF;

/// Escape byte introducing a back-reference unit. The byte that follows is
/// packed `aaoooooo`: the top two bits select a repeat count (`aa * 2 + 4`)
/// and the low six bits a negative offset from the current end of the
/// expanded output.
pub const BACKREF_ESCAPE: u8 = 0xF9;

#[derive(Debug, Error)]
pub enum TextError {
    #[error("string starting at offset {start} has no terminator")]
    Unterminated { start: usize },
    #[error("back-reference at offset {at} reaches before the start of the string")]
    BackReference { at: usize },
    #[error("charset has no byte for {glyph:?}")]
    Unencodable { glyph: char },
    #[error(transparent)]
    Cursor(#[from] CursorError),
}

/// Single-byte glyph table for the game's custom 8-bit charset. Injected
/// into the decoder so per-version tables can be swapped without touching
/// the codec.
#[derive(Debug, Clone)]
pub struct Charset {
    glyphs: Vec<Option<String>>,
}

impl Charset {
    /// The table shipped with the international PC release: a shifted ASCII
    /// ramp, a block of accented glyphs, and a handful of in-band control
    /// markers. Bytes the release never assigns stay unmapped so that gaps
    /// surface as explicit markers after conversion.
    pub fn international() -> Self {
        let mut glyphs: Vec<Option<String>> = vec![None; 256];
        for byte in 0x00u8..=0x5E {
            glyphs[byte as usize] = Some(((byte + 0x20) as char).to_string());
        }
        let accented: &[(u8, &str)] = &[
            (0x60, "Ä"),
            (0x61, "Á"),
            (0x62, "Ç"),
            (0x63, "É"),
            (0x64, "Ñ"),
            (0x65, "Ö"),
            (0x66, "Ü"),
            (0x67, "á"),
            (0x68, "à"),
            (0x69, "â"),
            (0x6A, "ä"),
            (0x6B, "ç"),
            (0x6C, "é"),
            (0x6D, "è"),
            (0x6E, "ê"),
            (0x6F, "ë"),
            (0x70, "í"),
            (0x71, "ì"),
            (0x72, "î"),
            (0x73, "ï"),
            (0x74, "ñ"),
            (0x75, "ó"),
            (0x76, "ò"),
            (0x77, "ô"),
            (0x78, "ö"),
            (0x79, "ú"),
            (0x7A, "ù"),
            (0x7B, "û"),
            (0x7C, "ü"),
        ];
        for (byte, glyph) in accented {
            glyphs[*byte as usize] = Some((*glyph).to_string());
        }
        let controls: &[(u8, &str)] = &[
            (0xE7, "\n"),
            (0xE8, "{New}"),
            (0xEA, "{Party1}"),
            (0xEB, "{Party2}"),
            (0xEC, "{Party3}"),
            (0xF6, "{Circle}"),
            (0xF7, "{Triangle}"),
            (0xF8, "{Square}"),
        ];
        for (byte, marker) in controls {
            glyphs[*byte as usize] = Some((*marker).to_string());
        }
        Charset { glyphs }
    }

    pub fn glyph(&self, byte: u8) -> Option<&str> {
        self.glyphs[byte as usize].as_deref()
    }

    /// Reverse lookup used by the re-encoder. Only single-character glyphs
    /// participate; markers are decode-only.
    pub fn byte_for(&self, glyph: char) -> Option<u8> {
        let needle = glyph.to_string();
        self.glyphs
            .iter()
            .position(|entry| entry.as_deref() == Some(needle.as_str()))
            .map(|index| index as u8)
    }
}

/// One string pulled out of a section, with the bookkeeping callers need
/// to advance past it and to report unmapped bytes.
#[derive(Debug, Clone)]
pub struct DecodedString {
    pub text: String,
    /// Bytes consumed from the input, terminator included.
    pub consumed: usize,
    /// Bytes that had no glyph table entry, in order of appearance.
    pub unknown: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct Expanded {
    pub bytes: Vec<u8>,
    pub consumed: usize,
}

/// Resolve back-references and strip the terminator, yielding the raw glyph
/// byte sequence for one string. The back-reference source is always earlier
/// output of the same string, copied byte by byte so overlapping runs repeat
/// their own expansion.
pub fn expand(data: &[u8], start: usize) -> Result<Expanded, TextError> {
    let mut out = Vec::new();
    let mut pos = start;
    loop {
        let byte = match data.get(pos) {
            Some(b) => *b,
            None => return Err(TextError::Unterminated { start }),
        };
        match byte {
            STRING_TERMINATOR => {
                return Ok(Expanded {
                    bytes: out,
                    consumed: pos + 1 - start,
                });
            }
            BACKREF_ESCAPE => {
                let packed = *data
                    .get(pos + 1)
                    .ok_or(TextError::Unterminated { start })?;
                let count = (packed >> 6) as usize * 2 + 4;
                let offset = (packed & 0x3F) as usize;
                if offset + 1 > out.len() {
                    return Err(TextError::BackReference { at: pos });
                }
                let src = out.len() - 1 - offset;
                for index in 0..count {
                    let glyph = out[src + index];
                    out.push(glyph);
                }
                pos += 2;
            }
            _ => {
                out.push(byte);
                pos += 1;
            }
        }
    }
}

/// Decode one string through the glyph table. Unmapped bytes become an
/// explicit `{U+XX}` marker in the output rather than disappearing, so
/// charset gaps are visible after conversion.
pub fn decode_string(
    charset: &Charset,
    data: &[u8],
    start: usize,
) -> Result<DecodedString, TextError> {
    let expanded = expand(data, start)?;
    let mut text = String::with_capacity(expanded.bytes.len());
    let mut unknown = Vec::new();
    for byte in &expanded.bytes {
        match charset.glyph(*byte) {
            Some(glyph) => text.push_str(glyph),
            None => {
                text.push_str(&format!("{{U+{byte:02X}}}"));
                unknown.push(*byte);
            }
        }
    }
    Ok(DecodedString {
        text,
        consumed: expanded.consumed,
        unknown,
    })
}

/// Read the u16 little-endian offset table that fronts a text section.
pub fn read_offset_table(data: &[u8], count: usize) -> Result<Vec<u16>, TextError> {
    let mut cursor = BinaryCursor::new(data);
    let mut offsets = Vec::with_capacity(count);
    for _ in 0..count {
        offsets.push(cursor.read_u16_le()?);
    }
    Ok(offsets)
}

/// Decode entry `index` of a section whose offset table holds `count`
/// entries.
pub fn decode_entry(
    charset: &Charset,
    section: &[u8],
    count: usize,
    index: usize,
) -> Result<DecodedString, TextError> {
    let offsets = read_offset_table(section, count)?;
    let start = offsets[index] as usize;
    decode_string(charset, section, start)
}

/// The declarative output format delimits strings with double quotes, so
/// decoded quotes become apostrophes before embedding.
pub fn sanitize_quotes(text: &str) -> String {
    text.replace('"', "'")
}

/// Greedy re-compressor over raw glyph bytes. Finds the longest expressible
/// back-reference (counts 10, 8, 6, 4 within the 63-byte window) at each
/// position, falls back to a literal, and appends the terminator.
pub fn compress(raw: &[u8]) -> Vec<u8> {
    debug_assert!(raw
        .iter()
        .all(|b| *b != BACKREF_ESCAPE && *b != STRING_TERMINATOR));
    let mut out = Vec::with_capacity(raw.len() + 1);
    let mut pos = 0;
    while pos < raw.len() {
        let mut unit: Option<(usize, u8)> = None;
        'counts: for count in [10usize, 8, 6, 4] {
            if pos + count > raw.len() {
                continue;
            }
            for offset in 0..64usize.min(pos) {
                let src = pos - 1 - offset;
                if (0..count).all(|k| raw[pos + k] == raw[src + k]) {
                    unit = Some((count, offset as u8));
                    break 'counts;
                }
            }
        }
        match unit {
            Some((count, offset)) => {
                let packed = (((count - 4) / 2) as u8) << 6 | offset;
                out.push(BACKREF_ESCAPE);
                out.push(packed);
                pos += count;
            }
            None => {
                out.push(raw[pos]);
                pos += 1;
            }
        }
    }
    out.push(STRING_TERMINATOR);
    out
}

/// Encode plain text back to charset bytes. Decode-only markers are not
/// representable; this exists for fixtures and round-trip checks.
pub fn encode_string(charset: &Charset, text: &str) -> Result<Vec<u8>, TextError> {
    text.chars()
        .map(|glyph| {
            charset
                .byte_for(glyph)
                .ok_or(TextError::Unencodable { glyph })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes_for(text: &str) -> Vec<u8> {
        encode_string(&Charset::international(), text).unwrap()
    }

    #[test]
    fn decodes_entry_through_offset_table() {
        // Offset table [0x10, 0x1A]; record 0 holds "AB" then a terminator.
        let mut section = vec![0u8; 0x20];
        section[0] = 0x10;
        section[2] = 0x1A;
        section[0x10] = 0x21; // 'A'
        section[0x11] = 0x22; // 'B'
        section[0x12] = STRING_TERMINATOR;
        section[0x1A] = STRING_TERMINATOR;

        let charset = Charset::international();
        let decoded = decode_entry(&charset, &section, 2, 0).unwrap();
        assert_eq!(decoded.text, "AB");
        assert_eq!(decoded.consumed, 3);
        assert!(decoded.unknown.is_empty());

        let empty = decode_entry(&charset, &section, 2, 1).unwrap();
        assert_eq!(empty.text, "");
    }

    #[test]
    fn back_reference_copies_earlier_output() {
        // "ABCD" then a unit with count 4, offset 3: source is output
        // position 0, so the expansion doubles the run.
        let mut data = bytes_for("ABCD");
        data.push(BACKREF_ESCAPE);
        data.push(0x03); // aa=0 -> count 4, offset 3
        data.push(STRING_TERMINATOR);

        let decoded = decode_string(&Charset::international(), &data, 0).unwrap();
        assert_eq!(decoded.text, "ABCDABCD");
        assert_eq!(decoded.consumed, data.len());
    }

    #[test]
    fn overlapping_back_reference_repeats_its_own_expansion() {
        // "AB" then count 4 at offset 1: the copy re-reads bytes it just
        // produced, sliding-window style.
        let mut data = bytes_for("AB");
        data.push(BACKREF_ESCAPE);
        data.push(0x01);
        data.push(STRING_TERMINATOR);

        let decoded = decode_string(&Charset::international(), &data, 0).unwrap();
        assert_eq!(decoded.text, "ABABAB");
    }

    #[test]
    fn back_reference_before_start_is_an_error() {
        let data = [BACKREF_ESCAPE, 0x00, STRING_TERMINATOR];
        let err = decode_string(&Charset::international(), &data, 0).unwrap_err();
        assert!(matches!(err, TextError::BackReference { at: 0 }));
    }

    #[test]
    fn missing_terminator_is_an_error() {
        let data = bytes_for("AB");
        let err = decode_string(&Charset::international(), &data, 0).unwrap_err();
        assert!(matches!(err, TextError::Unterminated { start: 0 }));
    }

    #[test]
    fn unmapped_bytes_become_markers() {
        let data = [0x21, 0xD4, STRING_TERMINATOR];
        let decoded = decode_string(&Charset::international(), &data, 0).unwrap();
        assert_eq!(decoded.text, "A{U+D4}");
        assert_eq!(decoded.unknown, vec![0xD4]);
    }

    #[test]
    fn compression_round_trips() {
        let raw = bytes_for("Potion restores HP. Potion restores HP. Potion");
        let packed = compress(&raw);
        assert!(
            packed.contains(&BACKREF_ESCAPE),
            "repetitive input should compress"
        );
        assert!(packed.len() < raw.len() + 1);
        let expanded = expand(&packed, 0).unwrap();
        assert_eq!(expanded.bytes, raw);
        assert_eq!(expanded.consumed, packed.len());
    }

    #[test]
    fn incompressible_input_round_trips_as_literals() {
        let raw = bytes_for("XyZ");
        let packed = compress(&raw);
        assert_eq!(packed.len(), raw.len() + 1);
        assert_eq!(expand(&packed, 0).unwrap().bytes, raw);
    }

    #[test]
    fn quotes_are_sanitized_for_markup() {
        assert_eq!(sanitize_quotes(r#"a "quoted" word"#), "a 'quoted' word");
    }
}

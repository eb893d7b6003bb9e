use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE, WINDOWS_1251, WINDOWS_1252};

// @module: Byte encoding detection for subtitle files

/// Guess the encoding of a byte sample.
///
/// Order: byte-order mark, UTF-16 without BOM (NUL density), UTF-8 validity
/// (a sample cut mid-character still counts), then a single-byte code page.
pub fn sniff_encoding(bytes: &[u8]) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return encoding;
    }

    if let Some(encoding) = sniff_utf16(bytes) {
        return encoding;
    }

    if is_utf8(bytes) {
        return UTF_8;
    }

    sniff_single_byte(bytes)
}

/// Decode a byte sample with the sniffed encoding, replacing invalid sequences
pub fn decode(bytes: &[u8]) -> (String, &'static Encoding) {
    let encoding = sniff_encoding(bytes);
    let (text, actual, _had_errors) = encoding.decode(bytes);
    (text.into_owned(), actual)
}

fn is_utf8(bytes: &[u8]) -> bool {
    match std::str::from_utf8(bytes) {
        Ok(_) => true,
        // Incomplete trailing sequence: the sample was truncated mid-character
        Err(e) => e.error_len().is_none() && bytes.len() - e.valid_up_to() < 4,
    }
}

fn sniff_utf16(bytes: &[u8]) -> Option<&'static Encoding> {
    if bytes.len() < 4 {
        return None;
    }

    let pairs = bytes.len() / 2;
    let even_nuls = bytes.iter().step_by(2).filter(|b| **b == 0).count();
    let odd_nuls = bytes.iter().skip(1).step_by(2).filter(|b| **b == 0).count();

    // ASCII-heavy UTF-16 text has a NUL in every other byte
    if odd_nuls * 10 >= pairs * 4 && even_nuls * 10 < pairs {
        Some(UTF_16LE)
    } else if even_nuls * 10 >= pairs * 4 && odd_nuls * 10 < pairs {
        Some(UTF_16BE)
    } else {
        None
    }
}

fn sniff_single_byte(bytes: &[u8]) -> &'static Encoding {
    let ascii_letters = bytes.iter().filter(|b| b.is_ascii_alphabetic()).count();
    let high = bytes.iter().filter(|b| **b >= 0xC0).count();

    // Cyrillic text in windows-1251 is made almost entirely of 0xC0..=0xFF
    if high > ascii_letters {
        WINDOWS_1251
    } else {
        WINDOWS_1252
    }
}

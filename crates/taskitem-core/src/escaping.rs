//! Build-engine escaping of metadata values
//!
//! Characters with meaning to the engine's expression syntax are written as
//! `%XX` (two hex digits). Unescaping is lenient: a `%` not followed by two hex
//! digits is kept literally.

use std::borrow::Cow;

const SPECIAL_CHARACTERS: [char; 9] = ['%', '*', '?', '@', '$', '(', ')', ';', '\''];

/// Escape every engine-special character in `value`.
pub fn escape(value: &str) -> Cow<'_, str> {
    if !value.contains(SPECIAL_CHARACTERS) {
        return Cow::Borrowed(value);
    }

    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        if SPECIAL_CHARACTERS.contains(&c) {
            escaped.push_str(&format!("%{:02x}", u32::from(c)));
        } else {
            escaped.push(c);
        }
    }
    Cow::Owned(escaped)
}

/// Decode `%XX` sequences in `value`.
pub fn unescape(value: &str) -> Cow<'_, str> {
    if !value.contains('%') {
        return Cow::Borrowed(value);
    }

    let bytes = value.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                decoded.push(hi * 16 + lo);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }

    // Decoded bytes can form invalid UTF-8 (e.g. "%ff"); keep the input then.
    String::from_utf8(decoded).map_or(Cow::Borrowed(value), Cow::Owned)
}

const fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_values_borrow() {
        assert!(matches!(escape("plain.txt"), Cow::Borrowed(_)));
        assert!(matches!(unescape("plain.txt"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_escape_special_characters() {
        assert_eq!(escape("a;b"), "a%3bb");
        assert_eq!(escape("$(Prop)"), "%24%28Prop%29");
        assert_eq!(escape("100%"), "100%25");
        assert_eq!(escape("it's"), "it%27s");
        assert_eq!(escape("*.cs?@"), "%2a.cs%3f%40");
    }

    #[test]
    fn test_unescape_decodes_any_hex_pair() {
        assert_eq!(unescape("a%3bb"), "a;b");
        assert_eq!(unescape("%24%28Prop%29"), "$(Prop)");
        assert_eq!(unescape("%41%42"), "AB");
    }

    #[test]
    fn test_unescape_keeps_malformed_sequences() {
        assert_eq!(unescape("100%"), "100%");
        assert_eq!(unescape("%zz"), "%zz");
        assert_eq!(unescape("%4"), "%4");
    }

    #[test]
    fn test_escape_then_unescape_restores_input() {
        for input in ["", "a;b;c", "%%", "$(x)@(y)", "ünïcode;"] {
            assert_eq!(unescape(&escape(input)), input);
        }
    }
}

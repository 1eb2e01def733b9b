//! Text sanitizers for content entering the pipeline from UTF-16 sources.
//!
//! A Rust `str` can never hold an unpaired surrogate, so these only run at
//! the boundaries where foreign text arrives: WTF-8 bytes off the wire and
//! raw JSON history with `\uXXXX` escapes. Each unpaired surrogate becomes
//! U+FFFD; valid pairs survive.

use std::borrow::Cow;

const REPLACEMENT_ESCAPE: &str = "\\uFFFD";

/// Decode WTF-8 bytes, replacing each encoded surrogate with one U+FFFD.
///
/// Other invalid sequences are replaced the way `String::from_utf8_lossy`
/// does it.
#[must_use]
pub fn sanitize_wtf8(bytes: &[u8]) -> Cow<'_, str> {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(bytes.len());
    let mut rest = bytes;
    loop {
        match std::str::from_utf8(rest) {
            Ok(s) => {
                out.push_str(s);
                break;
            }
            Err(e) => {
                let valid = e.valid_up_to();
                out.push_str(std::str::from_utf8(&rest[..valid]).unwrap_or_default());
                let tail = &rest[valid..];
                let skip = match e.error_len() {
                    Some(_) if is_encoded_surrogate(tail) => 3,
                    Some(n) => n,
                    None => tail.len(),
                };
                out.push(char::REPLACEMENT_CHARACTER);
                rest = &tail[skip..];
            }
        }
    }
    Cow::Owned(out)
}

fn is_encoded_surrogate(bytes: &[u8]) -> bool {
    matches!(bytes, [0xED, 0xA0..=0xBF, 0x80..=0xBF, ..])
}

/// Replace unpaired `\uD800`..`\uDFFF` escapes in raw JSON with `\uFFFD`.
///
/// `serde_json` rejects lone surrogate escapes outright, so persisted
/// histories written by UTF-16 runtimes go through this before parsing.
#[must_use]
pub fn sanitize_json_surrogate_escapes(json: &str) -> Cow<'_, str> {
    if !json.contains("\\u") {
        return Cow::Borrowed(json);
    }

    let bytes = json.as_bytes();
    let mut out: Option<String> = None;
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'\\' {
            i += 1;
            continue;
        }
        if bytes.get(i + 1) != Some(&b'u') {
            // `\\`, `\"` and friends
            i += 2;
            continue;
        }
        let Some(unit) = hex_unit(bytes, i + 2) else {
            i += 2;
            continue;
        };

        let lone = match unit {
            0xD800..=0xDBFF => {
                let paired = bytes.get(i + 6) == Some(&b'\\')
                    && bytes.get(i + 7) == Some(&b'u')
                    && matches!(hex_unit(bytes, i + 8), Some(0xDC00..=0xDFFF));
                if paired {
                    i += 12;
                    continue;
                }
                true
            }
            0xDC00..=0xDFFF => true,
            _ => false,
        };

        if lone {
            let buf = out.get_or_insert_with(|| String::with_capacity(json.len()));
            buf.push_str(&json[copied..i]);
            buf.push_str(REPLACEMENT_ESCAPE);
            copied = i + 6;
        }
        i += 6;
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&json[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(json),
    }
}

fn hex_unit(bytes: &[u8], start: usize) -> Option<u32> {
    let digits = bytes.get(start..start + 4)?;
    digits
        .iter()
        .try_fold(0u32, |acc, &b| Some(acc * 16 + char::from(b).to_digit(16)?))
}

/// Truncate `s` to at most `max_bytes`, backing off to a char boundary.
#[must_use]
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── WTF-8 ──

    #[test]
    fn wtf8_valid_utf8_is_borrowed() {
        assert!(matches!(sanitize_wtf8("héllo".as_bytes()), Cow::Borrowed("héllo")));
    }

    #[test]
    fn wtf8_encoded_surrogate_is_one_replacement() {
        // U+D83D encoded generalized-UTF-8 style
        let bytes = [b'a', 0xED, 0xA0, 0xBD, b'b'];
        assert_eq!(sanitize_wtf8(&bytes), "a\u{FFFD}b");
    }

    #[test]
    fn wtf8_truncated_sequence() {
        let bytes = [b'a', 0xE2, 0x82];
        assert_eq!(sanitize_wtf8(&bytes), "a\u{FFFD}");
    }

    // ── JSON escapes ──

    #[test]
    fn json_lone_high_replaced() {
        let raw = r#"{"t":"a\ud83db"}"#;
        assert_eq!(sanitize_json_surrogate_escapes(raw), r#"{"t":"a\uFFFDb"}"#);
    }

    #[test]
    fn json_lone_low_replaced() {
        let raw = r#""\uDE00""#;
        assert_eq!(sanitize_json_surrogate_escapes(raw), r#""\uFFFD""#);
    }

    #[test]
    fn json_pair_kept() {
        let raw = r#""\ud83d\ude00""#;
        assert!(matches!(sanitize_json_surrogate_escapes(raw), Cow::Borrowed(_)));
        let parsed: String = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed, "😀");
    }

    #[test]
    fn json_escaped_backslash_not_an_escape() {
        let raw = r#""\\ud83d""#;
        assert!(matches!(sanitize_json_surrogate_escapes(raw), Cow::Borrowed(_)));
    }

    #[test]
    fn json_high_followed_by_non_low() {
        let raw = r#""\ud83dA""#;
        let fixed = sanitize_json_surrogate_escapes(raw);
        assert_eq!(fixed, r#""\uFFFDA""#);
        let parsed: String = serde_json::from_str(&fixed).unwrap();
        assert_eq!(parsed, "\u{FFFD}A");
    }

    // ── truncate ──

    #[test]
    fn truncate_respects_char_boundary() {
        assert_eq!(truncate_str("héllo", 2), "h");
        assert_eq!(truncate_str("abc", 10), "abc");
        assert_eq!(truncate_str("abc", 2), "ab");
    }
}

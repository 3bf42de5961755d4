use memchr::memchr;

const NAMED: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{00A0}'),
];

/// Longest entity body looked at after `&` (`#x10FFFF` plus margin).
const MAX_ENTITY_LEN: usize = 10;

/// Decode the named entities in `NAMED` and semicolon-terminated numeric
/// references. Anything else, including references to invalid scalar values,
/// is left as written.
pub(crate) fn decode_entities(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut copy_start = 0;
    let mut i = 0;
    while let Some(rel) = memchr(b'&', &bytes[i..]) {
        let amp = i + rel;
        out.push_str(&s[copy_start..amp]);
        match decode_one(&s[amp + 1..]) {
            Some((ch, consumed)) => {
                out.push(ch);
                i = amp + 1 + consumed;
            }
            None => {
                out.push('&');
                i = amp + 1;
            }
        }
        copy_start = i;
    }
    out.push_str(&s[copy_start..]);
    out
}

/// Decode the reference at the start of `rest` (just after `&`), returning the
/// character and the number of bytes consumed including the `;`.
fn decode_one(rest: &str) -> Option<(char, usize)> {
    let window = &rest.as_bytes()[..rest.len().min(MAX_ENTITY_LEN)];
    let end = memchr(b';', window)?;
    let body = &rest[..end];
    let ch = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)?
    } else if let Some(dec) = body.strip_prefix('#') {
        if dec.is_empty() || !dec.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        dec.parse::<u32>().ok().and_then(char::from_u32)?
    } else {
        NAMED
            .iter()
            .find(|(name, _)| *name == body)
            .map(|(_, ch)| *ch)?
    };
    Some((ch, end + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_named_and_numeric_references() {
        assert_eq!(decode_entities("a &amp; b"), "a & b");
        assert_eq!(decode_entities("&lt;tag&gt;"), "<tag>");
        assert_eq!(decode_entities("&#65;&#x42;&#X43;"), "ABC");
        assert_eq!(decode_entities("x&nbsp;y"), "x\u{00A0}y");
    }

    #[test]
    fn malformed_references_stay_literal() {
        assert_eq!(decode_entities("fish & chips"), "fish & chips");
        assert_eq!(decode_entities("&amp"), "&amp");
        assert_eq!(decode_entities("&unknown;"), "&unknown;");
        assert_eq!(decode_entities("&#xD800;"), "&#xD800;");
        assert_eq!(decode_entities("&#+1;"), "&#+1;");
    }

    #[test]
    fn preserves_utf8_around_references() {
        assert_eq!(decode_entities("café &amp; thé"), "café & thé");
    }
}

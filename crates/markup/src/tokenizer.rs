//! Small markup tokenizer feeding the tree builder.
//!
//! Names use the ASCII class `[A-Za-z0-9:_-]` and keep their case; the builder
//! normalises them. Doctypes are dropped. `script` and `style` bodies are raw
//! text up to their close tag. This is not an HTML5 tokenizer: there is no
//! parse-error recovery beyond skipping stray bytes.

use crate::entities::decode_entities;
use memchr::memchr;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    StartTag {
        name: String,
        attributes: Vec<(String, Option<String>)>,
        self_closing: bool,
    },
    EndTag(String),
    Text(String),
    Comment(String),
}

const COMMENT_START: &str = "<!--";
const COMMENT_END: &str = "-->";

fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'-' || c == b'_' || c == b':'
}

pub fn is_void_element(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn is_rawtext_element(name: &str) -> bool {
    name.eq_ignore_ascii_case("script") || name.eq_ignore_ascii_case("style")
}

/// Start of `</name` followed by optional whitespace and `>`, and the index
/// just past that `>`.
fn find_close_tag(input: &str, name: &str) -> Option<(usize, usize)> {
    let bytes = input.as_bytes();
    let mut i = 0;
    while let Some(rel) = memchr(b'<', &bytes[i..]) {
        let at = i + rel;
        let name_start = at + 2;
        let name_end = name_start + name.len();
        if bytes.get(at + 1) == Some(&b'/')
            && bytes
                .get(name_start..name_end)
                .is_some_and(|candidate| candidate.eq_ignore_ascii_case(name.as_bytes()))
        {
            let mut k = name_end;
            while k < bytes.len() && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if bytes.get(k) == Some(&b'>') {
                return Some((at, k + 1));
            }
        }
        i = at + 1;
    }
    None
}

pub fn tokenize(input: &str) -> Vec<Token> {
    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut out = Vec::new();
    let mut i = 0;

    while i < len {
        if bytes[i] != b'<' {
            let end = memchr(b'<', &bytes[i..]).map_or(len, |rel| i + rel);
            let text = decode_entities(&input[i..end]);
            if !text.is_empty() {
                out.push(Token::Text(text));
            }
            i = end;
            continue;
        }

        let rest = &input[i..];
        if rest.starts_with(COMMENT_START) {
            let body = &rest[COMMENT_START.len()..];
            match body.find(COMMENT_END) {
                Some(end) => {
                    out.push(Token::Comment(body[..end].to_string()));
                    i += COMMENT_START.len() + end + COMMENT_END.len();
                    continue;
                }
                None => {
                    out.push(Token::Comment(body.to_string()));
                    break;
                }
            }
        }
        if bytes.get(i + 1) == Some(&b'!') || bytes.get(i + 1) == Some(&b'?') {
            // Doctype or processing instruction.
            i = memchr(b'>', &bytes[i..]).map_or(len, |rel| i + rel + 1);
            continue;
        }

        if bytes.get(i + 1) == Some(&b'/') {
            let start = i + 2;
            let mut j = start;
            while j < len && is_name_char(bytes[j]) {
                j += 1;
            }
            let name = &input[start..j];
            i = memchr(b'>', &bytes[j..]).map_or(len, |rel| j + rel + 1);
            if !name.is_empty() {
                out.push(Token::EndTag(name.to_string()));
            }
            continue;
        }

        let start = i + 1;
        let mut k = start;
        while k < len && is_name_char(bytes[k]) {
            k += 1;
        }
        if k == start {
            // A lone `<` is text.
            out.push(Token::Text("<".to_string()));
            i += 1;
            continue;
        }
        let name = input[start..k].to_string();
        let (attributes, mut self_closing, next) = read_attributes(input, k);
        if is_void_element(&name) {
            self_closing = true;
        }
        i = next;

        let rawtext = !self_closing && is_rawtext_element(&name);
        out.push(Token::StartTag {
            name: name.clone(),
            attributes,
            self_closing,
        });
        if rawtext {
            match find_close_tag(&input[i..], &name) {
                Some((body_end, close_end)) => {
                    if body_end > 0 {
                        out.push(Token::Text(input[i..i + body_end].to_string()));
                    }
                    out.push(Token::EndTag(name));
                    i += close_end;
                }
                None => {
                    if i < len {
                        out.push(Token::Text(input[i..].to_string()));
                    }
                    out.push(Token::EndTag(name));
                    break;
                }
            }
        }
    }
    out
}

/// Read attributes from `k` up to and including the closing `>`.
fn read_attributes(input: &str, mut k: usize) -> (Vec<(String, Option<String>)>, bool, usize) {
    let bytes = input.as_bytes();
    let len = bytes.len();
    let mut attributes = Vec::new();
    let skip_whitespace = |k: &mut usize| {
        while *k < len && bytes[*k].is_ascii_whitespace() {
            *k += 1;
        }
    };

    loop {
        skip_whitespace(&mut k);
        if k >= len {
            return (attributes, false, len);
        }
        match bytes[k] {
            b'>' => return (attributes, false, k + 1),
            b'/' if bytes.get(k + 1) == Some(&b'>') => return (attributes, true, k + 2),
            b'/' => {
                k += 1;
                continue;
            }
            _ => {}
        }
        let name_start = k;
        while k < len && is_name_char(bytes[k]) {
            k += 1;
        }
        if name_start == k {
            k += 1;
            continue;
        }
        let name = input[name_start..k].to_string();

        skip_whitespace(&mut k);
        if bytes.get(k) != Some(&b'=') {
            attributes.push((name, None));
            continue;
        }
        k += 1;
        skip_whitespace(&mut k);
        let value = match bytes.get(k) {
            Some(&quote) if quote == b'"' || quote == b'\'' => {
                let value_start = k + 1;
                let value_end = memchr(quote, &bytes[value_start..]).map_or(len, |rel| value_start + rel);
                k = (value_end + 1).min(len);
                decode_entities(&input[value_start..value_end])
            }
            _ => {
                let value_start = k;
                while k < len && !bytes[k].is_ascii_whitespace() && bytes[k] != b'>' {
                    if bytes[k] == b'/' && bytes.get(k + 1) == Some(&b'>') {
                        break;
                    }
                    k += 1;
                }
                decode_entities(&input[value_start..k])
            }
        };
        attributes.push((name, Some(value)));
    }
}

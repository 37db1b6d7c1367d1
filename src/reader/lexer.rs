//! Byte-level scanning helpers shared by the Turtle/N-Triples grammar in
//! [`super::Reader`]: trivia skipping, escape decoding, and caret tracking.
//!
//! Grounded on `oxttl::toolkit::lexer::Lexer`'s position bookkeeping (line
//! starts tracked by buffer offset, column counted in `char`s), simplified to a
//! single owned `Vec<u8>` buffer since this crate re-parses a pending top-level
//! production from its start on a resumable break rather than keeping an
//! incremental per-byte lexer state machine.

use crate::caret::Caret;
use std::rc::Rc;

/// A scanning outcome: `Incomplete` means the buffer ran out before the token
/// could be recognized (the caller should fetch more bytes and retry from
/// scratch); `Invalid` is a genuine lexical error.
pub(super) enum LexError {
    Incomplete,
    Invalid(String),
}

pub(super) type LexResult<T> = std::result::Result<T, LexError>;

/// A cursor into the reader's buffer, advanced as bytes are consumed.
#[derive(Debug, Clone, Copy)]
pub(super) struct Position {
    pub line: u64,
    pub column: u64,
}

impl Position {
    pub fn start() -> Self {
        Self { line: 1, column: 0 }
    }

    pub fn caret(&self, document: &Rc<str>) -> Caret {
        Caret::new(document.clone(), self.line, self.column)
    }

    /// The position reached after consuming `text` starting from here.
    #[must_use]
    pub fn advanced_by(&self, text: &[u8]) -> Self {
        let mut pos = *self;
        for &b in text {
            if b == b'\n' {
                pos.line += 1;
                pos.column = 0;
            } else if !is_utf8_continuation(b) {
                pos.column += 1;
            }
        }
        pos
    }
}

fn is_utf8_continuation(byte: u8) -> bool {
    byte & 0b1100_0000 == 0b1000_0000
}

/// Skips ASCII whitespace and, when `allow_comments`, `#`-to-end-of-line
/// comments. Never blocks: it advances as far as the available buffer allows
/// and leaves ambiguity about unterminated trailing comments to the caller
/// (who will see `pos == buf.len()` and ask for more data).
pub(super) fn skip_trivia(buf: &[u8], mut pos: usize, allow_comments: bool) -> usize {
    loop {
        while matches!(buf.get(pos), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            pos += 1;
        }
        if allow_comments && buf.get(pos) == Some(&b'#') {
            match memchr::memchr(b'\n', &buf[pos..]) {
                Some(rel) => pos += rel + 1,
                None => pos = buf.len(),
            }
            continue;
        }
        break;
    }
    pos
}

/// True if `b` can start a bare (non-escaped) name token. This crate accepts
/// the common ASCII subset of PN_CHARS_BASE plus any non-ASCII byte, rather
/// than the full Unicode PN_CHARS productions.
pub(super) fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

pub(super) fn is_name_char(b: u8) -> bool {
    is_name_start(b) || b.is_ascii_digit() || b == b'-' || b == b'.'
}

/// Decodes a Turtle/N-Triples single-quoted string body starting at `start`
/// (which must point at the opening quote), resolving
/// `\t \n \r \b \f \" \' \\ \uXXXX \UXXXXXXXX`.
///
/// Returns `(consumed_including_quotes, decoded_value)`.
pub(super) fn read_quoted(buf: &[u8], start: usize, quote: u8) -> LexResult<(usize, String)> {
    let mut i = start + 1;
    let mut out = String::new();
    loop {
        match buf.get(i) {
            None => return Err(LexError::Incomplete),
            Some(&b) if b == quote => {
                i += 1;
                break;
            }
            Some(b'\\') => {
                let (consumed, decoded) = read_escape(buf, i)?;
                out.push(decoded);
                i += consumed;
            }
            Some(&b) if b == b'\n' || b == b'\r' => {
                return Err(LexError::Invalid("unescaped newline in string literal".to_owned()))
            }
            Some(_) => {
                let rest = std::str::from_utf8(&buf[i..]).map_err(|e| {
                    if e.valid_up_to() == 0 {
                        LexError::Incomplete
                    } else {
                        LexError::Invalid(format!("invalid UTF-8 in string literal: {e}"))
                    }
                })?;
                let Some(ch) = rest.chars().next() else {
                    return Err(LexError::Incomplete);
                };
                out.push(ch);
                i += ch.len_utf8();
            }
        }
    }
    Ok((i - start, out))
}

pub(super) fn read_escape(buf: &[u8], backslash_pos: usize) -> LexResult<(usize, char)> {
    match buf.get(backslash_pos + 1) {
        Some(b't') => Ok((2, '\t')),
        Some(b'n') => Ok((2, '\n')),
        Some(b'r') => Ok((2, '\r')),
        Some(b'b') => Ok((2, '\u{8}')),
        Some(b'f') => Ok((2, '\u{c}')),
        Some(b'"') => Ok((2, '"')),
        Some(b'\'') => Ok((2, '\'')),
        Some(b'\\') => Ok((2, '\\')),
        Some(b'u') => read_unicode_escape(buf, backslash_pos + 2, 4).map(|(n, c)| (2 + n, c)),
        Some(b'U') => read_unicode_escape(buf, backslash_pos + 2, 8).map(|(n, c)| (2 + n, c)),
        Some(_) => Err(LexError::Invalid("unknown escape sequence".to_owned())),
        None => Err(LexError::Incomplete),
    }
}

fn read_unicode_escape(buf: &[u8], start: usize, digits: usize) -> LexResult<(usize, char)> {
    let slice = buf.get(start..start + digits).ok_or(LexError::Incomplete)?;
    let text = std::str::from_utf8(slice)
        .map_err(|_| LexError::Invalid("invalid unicode escape".to_owned()))?;
    let code = u32::from_str_radix(text, 16)
        .map_err(|_| LexError::Invalid("invalid unicode escape".to_owned()))?;
    let ch = char::from_u32(code)
        .ok_or_else(|| LexError::Invalid(format!("invalid code point \\u{code:x}")))?;
    Ok((digits, ch))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_trivia_passes_whitespace_and_comments() {
        assert_eq!(skip_trivia(b"   # hi\nfoo", 0, true), 8);
        assert_eq!(skip_trivia(b"foo", 0, true), 0);
    }

    #[test]
    fn read_quoted_decodes_escapes() {
        let (consumed, value) = match read_quoted(b"\"a\\tb\"rest", 0, b'"') {
            Ok(v) => v,
            Err(_) => panic!("expected success"),
        };
        assert_eq!(value, "a\tb");
        assert_eq!(consumed, 6);
    }

    #[test]
    fn read_quoted_rejects_unescaped_newline() {
        assert!(matches!(
            read_quoted(b"\"a\nb\"", 0, b'"'),
            Err(LexError::Invalid(_))
        ));
    }

    #[test]
    fn read_quoted_reports_incomplete_at_buffer_end() {
        assert!(matches!(read_quoted(b"\"abc", 0, b'"'), Err(LexError::Incomplete)));
    }
}

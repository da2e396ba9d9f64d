use std::borrow::Cow;

use crate::buf::Input;
use crate::format::{is_unquoted_continuation, is_unquoted_start, marker};
use crate::varint::{read_varint, read_zigzag};
use crate::{DecodeError, DecodeResult};

/// Lexical token. Text and binary tokens share one grammar.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token<'a> {
    BeginMap,
    EndMap,
    BeginList,
    EndList,
    BeginAttributes,
    EndAttributes,
    KeyValueSeparator,
    ItemSeparator,
    String(Cow<'a, [u8]>),
    Int64(i64),
    Uint64(u64),
    Double(f64),
    Bool(bool),
    Entity,
    EndOfStream,
}

impl Token<'_> {
    pub(crate) fn describe(&self) -> &'static str {
        match self {
            Token::BeginMap => "'{'",
            Token::EndMap => "'}'",
            Token::BeginList => "'['",
            Token::EndList => "']'",
            Token::BeginAttributes => "'<'",
            Token::EndAttributes => "'>'",
            Token::KeyValueSeparator => "'='",
            Token::ItemSeparator => "';'",
            Token::String(_) => "string",
            Token::Int64(_) => "int64",
            Token::Uint64(_) => "uint64",
            Token::Double(_) => "double",
            Token::Bool(_) => "boolean",
            Token::Entity => "entity",
            Token::EndOfStream => "end of stream",
        }
    }
}

#[derive(Clone)]
pub(crate) struct Lexer<'a> {
    input: Input<'a>,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(input: Input<'a>) -> Self {
        Lexer { input }
    }

    pub(crate) fn input(&self) -> &Input<'a> {
        &self.input
    }

    pub(crate) fn position(&self) -> usize {
        self.input.position()
    }

    /// Skips whitespace and returns the offset the next token starts at.
    pub(crate) fn token_start(&mut self) -> usize {
        self.input.skip_whitespace();
        self.input.position()
    }

    pub(crate) fn next_token(&mut self) -> DecodeResult<Token<'a>> {
        let start = self.token_start();
        let Some(b) = self.input.peek() else {
            return Ok(Token::EndOfStream);
        };

        let simple = match b {
            marker::BEGIN_MAP => Some(Token::BeginMap),
            marker::END_MAP => Some(Token::EndMap),
            marker::BEGIN_LIST => Some(Token::BeginList),
            marker::END_LIST => Some(Token::EndList),
            marker::BEGIN_ATTRIBUTES => Some(Token::BeginAttributes),
            marker::END_ATTRIBUTES => Some(Token::EndAttributes),
            marker::KEY_VALUE_SEPARATOR => Some(Token::KeyValueSeparator),
            marker::ITEM_SEPARATOR => Some(Token::ItemSeparator),
            marker::ENTITY => Some(Token::Entity),
            marker::FALSE => Some(Token::Bool(false)),
            marker::TRUE => Some(Token::Bool(true)),
            _ => None,
        };
        if let Some(token) = simple {
            self.input.advance(1);
            return Ok(token);
        }

        match b {
            marker::STRING => {
                self.input.advance(1);
                let length = read_zigzag(&mut self.input)?;
                let length = usize::try_from(length).map_err(|_| {
                    DecodeError::malformed(format!("negative string length {length}")).at(start)
                })?;
                Ok(Token::String(Cow::Borrowed(self.input.read(length)?)))
            }
            marker::INT64 => {
                self.input.advance(1);
                Ok(Token::Int64(read_zigzag(&mut self.input)?))
            }
            marker::UINT64 => {
                self.input.advance(1);
                Ok(Token::Uint64(read_varint(&mut self.input)?))
            }
            marker::DOUBLE => {
                self.input.advance(1);
                let raw: [u8; 8] = self
                    .input
                    .read(8)?
                    .try_into()
                    .map_err(|_| self.input.eof())?;
                Ok(Token::Double(f64::from_le_bytes(raw)))
            }
            b'"' => self.quoted_string(start),
            b'%' => self.percent_literal(start),
            b'-' | b'+' | b'0'..=b'9' => self.number(start),
            b if is_unquoted_start(b) => {
                let s = self.input.take_while(is_unquoted_continuation);
                Ok(Token::String(Cow::Borrowed(s)))
            }
            b => Err(DecodeError::malformed(format!("unexpected byte {b:#04x}")).at(start)),
        }
    }

    fn quoted_string(&mut self, start: usize) -> DecodeResult<Token<'a>> {
        self.input.advance(1);
        let plain = self.input.take_while(|b| b != b'"' && b != b'\\');
        match self.input.read_byte() {
            Ok(b'"') => return Ok(Token::String(Cow::Borrowed(plain))),
            Ok(_) => {}
            Err(_) => {
                return Err(DecodeError::malformed("unterminated string").at(start));
            }
        }

        // Escapes present; fall back to an owned buffer.
        let mut out = plain.to_vec();
        let mut escaped = true;
        loop {
            if escaped {
                self.unescape(&mut out, start)?;
                escaped = false;
                continue;
            }
            match self.input.read_byte() {
                Ok(b'"') => return Ok(Token::String(Cow::Owned(out))),
                Ok(b'\\') => escaped = true,
                Ok(b) => out.push(b),
                Err(_) => {
                    return Err(DecodeError::malformed("unterminated string").at(start));
                }
            }
        }
    }

    fn unescape(&mut self, out: &mut Vec<u8>, start: usize) -> DecodeResult<()> {
        let b = self
            .input
            .read_byte()
            .map_err(|_| DecodeError::malformed("unterminated string").at(start))?;
        match b {
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b't' => out.push(b'\t'),
            b'n' => out.push(b'\n'),
            b'v' => out.push(0x0b),
            b'f' => out.push(0x0c),
            b'r' => out.push(b'\r'),
            b'x' => {
                let digits = self.input.read(2)?;
                let value = std::str::from_utf8(digits)
                    .ok()
                    .and_then(|s| u8::from_str_radix(s, 16).ok())
                    .ok_or_else(|| {
                        DecodeError::malformed("invalid hex escape").at(self.input.position())
                    })?;
                out.push(value);
            }
            b'0'..=b'7' => {
                let mut value = u32::from(b - b'0');
                for _ in 0..2 {
                    match self.input.peek() {
                        Some(d @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(d - b'0');
                            self.input.advance(1);
                        }
                        _ => break,
                    }
                }
                let value = u8::try_from(value).map_err(|_| {
                    DecodeError::malformed("octal escape out of range").at(self.input.position())
                })?;
                out.push(value);
            }
            other => out.push(other),
        }
        Ok(())
    }

    fn percent_literal(&mut self, start: usize) -> DecodeResult<Token<'a>> {
        self.input.advance(1);
        let word = self.input.take_while(|b| b.is_ascii_alphabetic() || b == b'+' || b == b'-');
        match word {
            b"true" => Ok(Token::Bool(true)),
            b"false" => Ok(Token::Bool(false)),
            b"nan" => Ok(Token::Double(f64::NAN)),
            b"inf" | b"+inf" => Ok(Token::Double(f64::INFINITY)),
            b"-inf" => Ok(Token::Double(f64::NEG_INFINITY)),
            _ => Err(DecodeError::malformed(format!(
                "bad literal %{}",
                String::from_utf8_lossy(word)
            ))
            .at(start)),
        }
    }

    fn number(&mut self, start: usize) -> DecodeResult<Token<'a>> {
        let text = self
            .input
            .take_while(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'));
        let unsigned = self.input.peek() == Some(b'u');
        if unsigned {
            self.input.advance(1);
        }
        // Only ASCII bytes were taken above.
        let text = std::str::from_utf8(text).unwrap_or_default();
        let bad = || DecodeError::malformed(format!("bad numeric literal {text:?}")).at(start);

        if unsigned {
            text.parse::<u64>().map(Token::Uint64).map_err(|_| bad())
        } else if text.contains(['.', 'e', 'E']) {
            text.parse::<f64>().map(Token::Double).map_err(|_| bad())
        } else {
            text.parse::<i64>().map(Token::Int64).map_err(|_| bad())
        }
    }
}

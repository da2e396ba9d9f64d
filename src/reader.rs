use std::borrow::Cow;
use std::sync::Arc;

use crate::buf::Input;
use crate::lexer::{Lexer, Token};
use crate::{DecodeError, DecodeErrorKind, DecodeResult, StreamKind, TypeRegistry};

/// Default cap on open maps, lists and attribute blocks.
pub const DEFAULT_DEPTH_LIMIT: usize = 256;

/// Kind of a literal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralType {
    /// The null/absent marker, `#` in text.
    Entity,
    Bool,
    Int64,
    Uint64,
    Double,
    /// Byte string. Not required to be UTF-8.
    String,
}

impl LiteralType {
    pub fn name(self) -> &'static str {
        match self {
            LiteralType::Entity => "entity",
            LiteralType::Bool => "boolean",
            LiteralType::Int64 => "int64",
            LiteralType::Uint64 => "uint64",
            LiteralType::Double => "double",
            LiteralType::String => "string",
        }
    }
}

/// Structural or literal event produced by a [`Reader`].
///
/// Map and attribute keys are reported as `Literal(LiteralType::String)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    BeginMap,
    EndMap,
    BeginList,
    EndList,
    BeginAttributes,
    EndAttributes,
    Literal(LiteralType),
}

impl Event {
    pub fn describe(self) -> &'static str {
        match self {
            Event::BeginMap => "begin of map",
            Event::EndMap => "end of map",
            Event::BeginList => "begin of list",
            Event::EndList => "end of list",
            Event::BeginAttributes => "begin of attributes",
            Event::EndAttributes => "end of attributes",
            Event::Literal(t) => t.name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Literal<'a> {
    Entity,
    Bool(bool),
    Int64(i64),
    Uint64(u64),
    Double(f64),
    String(Cow<'a, [u8]>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Node,
    List,
    Map,
    Attributes,
    ListFragment,
    MapFragment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// Right after the opening token.
    Start,
    /// After an item separator.
    Separated,
    /// A key has been read; its value comes next.
    Key,
    /// After a complete item, before `;` or the closing token.
    Item,
    /// The top-level stream is complete.
    Done,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    scope: Scope,
    slot: Slot,
}

impl Frame {
    fn top(kind: StreamKind) -> Self {
        let scope = match kind {
            StreamKind::Node => Scope::Node,
            StreamKind::ListFragment => Scope::ListFragment,
            StreamKind::MapFragment => Scope::MapFragment,
        };
        Frame {
            scope,
            slot: Slot::Start,
        }
    }
}

/// Pull-based cursor over an encoded stream.
///
/// The reader validates the grammar as it goes and keeps the current literal
/// available through the accessor methods until the next event is read.
/// Text and binary encodings may be freely mixed in the input.
#[derive(Clone)]
pub struct Reader<'a> {
    lexer: Lexer<'a>,
    stack: Vec<Frame>,
    literal: Literal<'a>,
    event_start: usize,
    attributes_done: bool,
    pending: Option<(Event, usize)>,
    peeked: Option<(Event, usize)>,
    registry: Arc<TypeRegistry>,
    depth_limit: usize,
}

impl<'a> Reader<'a> {
    /// Creates a reader over a single-value stream.
    pub fn new(data: &'a [u8]) -> Self {
        Self::from_input(Input::new(data))
    }

    /// Creates a reader whose string literals can be handed out as
    /// zero-copy slices of `data`.
    pub fn from_bytes(data: &'a bytes::Bytes) -> Self {
        Self::from_input(Input::from_bytes(data))
    }

    fn from_input(input: Input<'a>) -> Self {
        Reader {
            lexer: Lexer::new(input),
            stack: vec![Frame::top(StreamKind::Node)],
            literal: Literal::Entity,
            event_start: 0,
            attributes_done: false,
            pending: None,
            peeked: None,
            registry: TypeRegistry::global(),
            depth_limit: DEFAULT_DEPTH_LIMIT,
        }
    }

    /// Sets the shape of the top-level stream. Must be called before reading.
    pub fn with_kind(mut self, kind: StreamKind) -> Self {
        self.stack = vec![Frame::top(kind)];
        self
    }

    /// Uses `registry` instead of the process-wide one for aggregate lookups.
    pub fn with_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Caps how many maps, lists and attribute blocks may be open at once.
    ///
    /// Decoding recurses once per nesting level, so raising the limit far
    /// above [`DEFAULT_DEPTH_LIMIT`] needs a correspondingly larger stack.
    pub fn with_depth_limit(mut self, limit: usize) -> Self {
        self.depth_limit = limit;
        self
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Offset of the first byte of the most recent event.
    pub fn position(&self) -> usize {
        self.event_start
    }

    /// Returns the next event.
    ///
    /// With `peek` set, the event is retained so that a following [`undo`]
    /// pushes it back.
    ///
    /// [`undo`]: Reader::undo
    pub fn next(&mut self, peek: bool) -> DecodeResult<Event> {
        let event = self
            .advance()?
            .ok_or_else(|| self.lexer.input().eof())?;
        if peek {
            self.peeked = Some((event, self.event_start));
        }
        Ok(event)
    }

    /// Pushes back the event returned by the last `next(true)`.
    ///
    /// # Panics
    ///
    /// Panics if the last call was not `next(true)`, including a second
    /// `undo` in a row.
    pub fn undo(&mut self) {
        let Some(retained) = self.peeked.take() else {
            panic!("Reader::undo called without a retained event");
        };
        self.pending = Some(retained);
        self.event_start = retained.1;
    }

    /// Reads the next key of a map or attribute block.
    ///
    /// Returns `false` after consuming the closing token. The key itself is
    /// available through [`bytes`](Reader::bytes) and [`str`](Reader::str).
    pub fn next_key(&mut self) -> DecodeResult<bool> {
        if self.pending.is_none() {
            let frame = self.top()?;
            let in_map = matches!(
                frame.scope,
                Scope::Map | Scope::Attributes | Scope::MapFragment
            );
            if !in_map || frame.slot == Slot::Key {
                return Err(DecodeError::malformed("next_key called outside of key position")
                    .at(self.lexer.position()));
            }
        }
        match self.advance()? {
            None | Some(Event::EndMap | Event::EndAttributes) => Ok(false),
            Some(Event::Literal(LiteralType::String)) => Ok(true),
            Some(other) => Err(self.unexpected("map key", other)),
        }
    }

    /// Checks for another list item, consuming the closing token if there
    /// is none.
    pub fn next_list_item(&mut self) -> DecodeResult<bool> {
        if self.pending.is_none() {
            let frame = self.top()?;
            if !matches!(frame.scope, Scope::List | Scope::ListFragment) {
                return Err(DecodeError::malformed("next_list_item called outside of a list")
                    .at(self.lexer.position()));
            }
        }
        match self.advance()? {
            None | Some(Event::EndList) => Ok(false),
            Some(event) => {
                self.pending = Some((event, self.event_start));
                Ok(true)
            }
        }
    }

    /// Skips one whole value, attributes included, and returns its raw
    /// encoded bytes.
    pub fn next_raw_value(&mut self) -> DecodeResult<&'a [u8]> {
        let event = self.next(false)?;
        let start = self.event_start;
        self.skip_rest(event)?;
        if event == Event::BeginAttributes {
            let value = self.next(false)?;
            self.skip_rest(value)?;
        }
        let end = self.lexer.position();
        Ok(self.lexer.input().slice(start, end))
    }

    /// Returns the first event of the next value, skipping its attributes.
    pub fn next_value(&mut self) -> DecodeResult<Event> {
        let event = self.next(false)?;
        if event != Event::BeginAttributes {
            return Ok(event);
        }
        while self.next_key()? {
            self.next_raw_value()?;
        }
        self.next(false)
    }

    /// Whether the next value is an entity once its attribute block, if any,
    /// is skipped. The reader itself does not move.
    pub(crate) fn entity_ahead(&self) -> DecodeResult<bool> {
        let mut ahead = self.clone();
        Ok(ahead.next_value()? == Event::Literal(LiteralType::Entity))
    }

    /// Verifies that the stream is complete and nothing but whitespace
    /// follows it.
    pub fn finish(&mut self) -> DecodeResult<()> {
        let frame = self.top()?;
        if self.stack.len() != 1 || self.pending.is_some() || self.attributes_done {
            return Err(DecodeError::malformed("stream ends in the middle of a value")
                .at(self.lexer.position()));
        }
        match frame.scope {
            Scope::Node => {
                if frame.slot != Slot::Done {
                    return Err(self.lexer.input().eof());
                }
                let pos = self.lexer.token_start();
                let remaining = self.lexer.input().remaining();
                if remaining > 0 {
                    return Err(DecodeError::new(DecodeErrorKind::ExtraData {
                        bytes_remaining: remaining,
                    })
                    .at(pos));
                }
                Ok(())
            }
            _ => match self.read_event()? {
                None => Ok(()),
                Some(_) => Err(DecodeError::malformed("unread items remain in fragment")
                    .at(self.event_start)),
            },
        }
    }

    /// Builds a type mismatch error for `event` at the current position.
    pub fn unexpected(&self, expected: &'static str, event: Event) -> DecodeError {
        DecodeError::mismatch(expected, event.describe()).at(self.event_start)
    }

    pub fn literal_type(&self) -> LiteralType {
        match self.literal {
            Literal::Entity => LiteralType::Entity,
            Literal::Bool(_) => LiteralType::Bool,
            Literal::Int64(_) => LiteralType::Int64,
            Literal::Uint64(_) => LiteralType::Uint64,
            Literal::Double(_) => LiteralType::Double,
            Literal::String(_) => LiteralType::String,
        }
    }

    fn literal_mismatch(&self, expected: &'static str) -> DecodeError {
        DecodeError::mismatch(expected, self.literal_type().name()).at(self.event_start)
    }

    /// Current string literal or key.
    pub fn bytes(&self) -> DecodeResult<&[u8]> {
        match &self.literal {
            Literal::String(s) => Ok(s),
            _ => Err(self.literal_mismatch("string")),
        }
    }

    /// Current string literal, borrowed from the input when no unescaping
    /// was needed.
    pub fn bytes_cow(&self) -> DecodeResult<Cow<'a, [u8]>> {
        match &self.literal {
            Literal::String(s) => Ok(s.clone()),
            _ => Err(self.literal_mismatch("string")),
        }
    }

    /// Current string literal as [`bytes::Bytes`], zero-copy when the reader
    /// was built with [`Reader::from_bytes`].
    pub fn to_bytes(&self) -> DecodeResult<bytes::Bytes> {
        Ok(self.lexer.input().to_bytes(self.bytes()?))
    }

    pub fn str(&self) -> DecodeResult<&str> {
        std::str::from_utf8(self.bytes()?)
            .map_err(|_| DecodeError::new(DecodeErrorKind::InvalidUtf8).at(self.event_start))
    }

    pub fn boolean(&self) -> DecodeResult<bool> {
        match self.literal {
            Literal::Bool(b) => Ok(b),
            _ => Err(self.literal_mismatch("boolean")),
        }
    }

    /// Current numeric literal as a double. Integer literals are converted.
    pub fn double(&self) -> DecodeResult<f64> {
        match self.literal {
            Literal::Double(d) => Ok(d),
            Literal::Int64(i) => Ok(i as f64),
            Literal::Uint64(u) => Ok(u as f64),
            _ => Err(self.literal_mismatch("double")),
        }
    }

    pub fn int64(&self) -> DecodeResult<i64> {
        self.int(64)
    }

    pub fn uint64(&self) -> DecodeResult<u64> {
        self.uint(64)
    }

    fn integer_value(&self, expected: &'static str) -> DecodeResult<i128> {
        match self.literal {
            Literal::Int64(i) => Ok(i128::from(i)),
            Literal::Uint64(u) => Ok(i128::from(u)),
            _ => Err(self.literal_mismatch(expected)),
        }
    }

    /// Current integer literal, checked to fit a signed integer of `bits`
    /// bits (at most 64).
    pub fn int(&self, bits: u32) -> DecodeResult<i64> {
        let value = self.integer_value("int64")?;
        let bits = bits.clamp(1, 64);
        let max = (1i128 << (bits - 1)) - 1;
        let min = -(1i128 << (bits - 1));
        if value < min || value > max {
            return Err(self.overflow(value, bits, true));
        }
        Ok(value as i64)
    }

    /// Current integer literal, checked to fit an unsigned integer of `bits`
    /// bits (at most 64).
    pub fn uint(&self, bits: u32) -> DecodeResult<u64> {
        let value = self.integer_value("uint64")?;
        let bits = bits.clamp(1, 64);
        let max = (1i128 << bits) - 1;
        if value < 0 || value > max {
            return Err(self.overflow(value, bits, false));
        }
        Ok(value as u64)
    }

    fn overflow(&self, value: i128, bits: u32, signed: bool) -> DecodeError {
        DecodeError::new(DecodeErrorKind::IntegerOverflow {
            value,
            bits,
            signed,
        })
        .at(self.event_start)
    }

    fn top(&self) -> DecodeResult<Frame> {
        self.stack
            .last()
            .copied()
            .ok_or_else(|| DecodeError::malformed("reader has no open scope"))
    }

    fn set_slot(&mut self, slot: Slot) {
        if let Some(frame) = self.stack.last_mut() {
            frame.slot = slot;
        }
    }

    fn advance(&mut self) -> DecodeResult<Option<Event>> {
        self.peeked = None;
        if let Some((event, start)) = self.pending.take() {
            self.event_start = start;
            return Ok(Some(event));
        }
        self.read_event()
    }

    fn skip_rest(&mut self, event: Event) -> DecodeResult<()> {
        let mut depth = match event {
            Event::BeginMap | Event::BeginList | Event::BeginAttributes => 1usize,
            Event::Literal(_) => 0,
            _ => return Err(self.unexpected("value", event)),
        };
        while depth > 0 {
            match self.next(false)? {
                Event::BeginMap | Event::BeginList | Event::BeginAttributes => depth += 1,
                Event::EndMap | Event::EndList | Event::EndAttributes => depth -= 1,
                Event::Literal(_) => {}
            }
        }
        Ok(())
    }

    fn read_event(&mut self) -> DecodeResult<Option<Event>> {
        loop {
            let start = self.lexer.token_start();
            let token = self.lexer.next_token()?;
            self.event_start = start;
            let frame = self.top()?;

            if frame.slot == Slot::Done {
                return match token {
                    Token::EndOfStream => Ok(None),
                    t => Err(self.malformed_token(&t, "end of stream")),
                };
            }

            match frame.scope {
                Scope::Node => return self.begin_value(token).map(Some),
                Scope::List | Scope::ListFragment => {
                    let end = if frame.scope == Scope::List {
                        Token::EndList
                    } else {
                        Token::EndOfStream
                    };
                    if frame.slot == Slot::Item {
                        if token == Token::ItemSeparator {
                            self.set_slot(Slot::Separated);
                            continue;
                        }
                        if token == end {
                            return Ok(self.close(frame.scope));
                        }
                        return Err(self.malformed_token(&token, "';' or end of list"));
                    }
                    if token == end && !self.attributes_done {
                        return Ok(self.close(frame.scope));
                    }
                    return self.begin_value(token).map(Some);
                }
                Scope::Map | Scope::Attributes | Scope::MapFragment => {
                    let end = match frame.scope {
                        Scope::Map => Token::EndMap,
                        Scope::Attributes => Token::EndAttributes,
                        _ => Token::EndOfStream,
                    };
                    match frame.slot {
                        Slot::Key => return self.begin_value(token).map(Some),
                        Slot::Item => {
                            if token == Token::ItemSeparator {
                                self.set_slot(Slot::Separated);
                                continue;
                            }
                            if token == end {
                                return Ok(self.close(frame.scope));
                            }
                            return Err(self.malformed_token(&token, "';' or end of map"));
                        }
                        _ => {
                            if token == end {
                                return Ok(self.close(frame.scope));
                            }
                            let Token::String(key) = token else {
                                return Err(self.malformed_token(&token, "map key"));
                            };
                            let separator = self.lexer.next_token()?;
                            if separator != Token::KeyValueSeparator {
                                return Err(self.malformed_token(&separator, "'='"));
                            }
                            self.literal = Literal::String(key);
                            self.set_slot(Slot::Key);
                            return Ok(Some(Event::Literal(LiteralType::String)));
                        }
                    }
                }
            }
        }
    }

    fn begin_value(&mut self, token: Token<'a>) -> DecodeResult<Event> {
        let after_attributes = std::mem::take(&mut self.attributes_done);
        let literal = match token {
            Token::BeginAttributes => {
                if after_attributes {
                    return Err(self.malformed_token(&token, "value after attributes"));
                }
                self.open(Scope::Attributes)?;
                return Ok(Event::BeginAttributes);
            }
            Token::BeginMap => {
                self.open(Scope::Map)?;
                return Ok(Event::BeginMap);
            }
            Token::BeginList => {
                self.open(Scope::List)?;
                return Ok(Event::BeginList);
            }
            Token::String(s) => Literal::String(s),
            Token::Int64(i) => Literal::Int64(i),
            Token::Uint64(u) => Literal::Uint64(u),
            Token::Double(d) => Literal::Double(d),
            Token::Bool(b) => Literal::Bool(b),
            Token::Entity => Literal::Entity,
            other => return Err(self.malformed_token(&other, "value")),
        };
        self.literal = literal;
        self.complete_value();
        Ok(Event::Literal(self.literal_type()))
    }

    fn open(&mut self, scope: Scope) -> DecodeResult<()> {
        if self.stack.len() > self.depth_limit {
            return Err(DecodeError::malformed(format!(
                "nesting depth exceeds {}",
                self.depth_limit
            ))
            .at(self.event_start));
        }
        self.stack.push(Frame {
            scope,
            slot: Slot::Start,
        });
        Ok(())
    }

    fn close(&mut self, scope: Scope) -> Option<Event> {
        match scope {
            Scope::List => {
                self.stack.pop();
                self.complete_value();
                Some(Event::EndList)
            }
            Scope::Map => {
                self.stack.pop();
                self.complete_value();
                Some(Event::EndMap)
            }
            Scope::Attributes => {
                self.stack.pop();
                self.attributes_done = true;
                Some(Event::EndAttributes)
            }
            Scope::Node | Scope::ListFragment | Scope::MapFragment => {
                self.set_slot(Slot::Done);
                None
            }
        }
    }

    /// Marks the value in the enclosing scope as complete.
    fn complete_value(&mut self) {
        if let Some(frame) = self.stack.last_mut() {
            frame.slot = match frame.scope {
                Scope::Node => Slot::Done,
                _ => Slot::Item,
            };
        }
    }

    fn malformed_token(&self, token: &Token<'_>, expected: &str) -> DecodeError {
        DecodeError::malformed(format!(
            "unexpected {}, expected {expected}",
            token.describe()
        ))
        .at(self.event_start)
    }
}

#[cfg(test)]
mod tests {
    use super::{Event, LiteralType, Reader};
    use crate::{DecodeErrorKind, StreamKind};

    fn events(data: &[u8]) -> Vec<Event> {
        let mut reader = Reader::new(data);
        let mut result = Vec::new();
        let mut depth = 0;
        loop {
            let event = reader.next(false).unwrap();
            result.push(event);
            match event {
                Event::BeginMap | Event::BeginList | Event::BeginAttributes => depth += 1,
                Event::EndMap | Event::EndList | Event::EndAttributes => depth -= 1,
                Event::Literal(_) => {}
            }
            if depth == 0 && !matches!(event, Event::EndAttributes) {
                break;
            }
        }
        reader.finish().unwrap();
        result
    }

    #[test]
    fn test_event_sequence() {
        use Event::*;
        use LiteralType::*;

        assert_eq!(
            events(b"<id=1>{a=b;c=[1;2u;%true;#]}"),
            vec![
                BeginAttributes,
                Literal(String),
                Literal(Int64),
                EndAttributes,
                BeginMap,
                Literal(String),
                Literal(String),
                Literal(String),
                BeginList,
                Literal(Int64),
                Literal(Uint64),
                Literal(Bool),
                Literal(Entity),
                EndList,
                EndMap,
            ]
        );
    }

    fn drain(reader: &mut Reader<'_>) -> crate::DecodeResult<()> {
        loop {
            reader.next(false)?;
        }
    }

    #[test]
    fn test_malformed_nesting() {
        for data in [
            &b"{a=1]"[..],
            b"[1;2",
            b"{a 1}",
            b"{a=}",
            b"[1 2]",
            b"<a=1><b=2>3",
            b"<a=1>",
            b"[<a=1>]",
        ] {
            let mut reader = Reader::new(data);
            let err = drain(&mut reader).unwrap_err();
            assert!(
                matches!(err.kind(), DecodeErrorKind::MalformedStream(_)),
                "{data:?}: {err}"
            );
        }
    }

    #[test]
    fn test_peek_and_undo() {
        let mut reader = Reader::new(b"[1;2]");
        assert_eq!(reader.next(false).unwrap(), Event::BeginList);
        assert_eq!(reader.next(true).unwrap(), Event::Literal(LiteralType::Int64));
        reader.undo();
        assert_eq!(reader.next(false).unwrap(), Event::Literal(LiteralType::Int64));
        assert_eq!(reader.int64().unwrap(), 1);
    }

    #[test]
    #[should_panic(expected = "without a retained event")]
    fn test_double_undo_panics() {
        let mut reader = Reader::new(b"[1;2]");
        reader.next(true).unwrap();
        reader.undo();
        reader.undo();
    }

    #[test]
    #[should_panic(expected = "without a retained event")]
    fn test_undo_without_peek_panics() {
        let mut reader = Reader::new(b"1");
        reader.next(false).unwrap();
        reader.undo();
    }

    #[test]
    fn test_next_key_and_items() {
        let mut reader = Reader::new(b"{a=[1;2;];b=x;}");
        assert_eq!(reader.next(false).unwrap(), Event::BeginMap);
        assert!(reader.next_key().unwrap());
        assert_eq!(reader.str().unwrap(), "a");
        assert_eq!(reader.next(false).unwrap(), Event::BeginList);
        let mut items = Vec::new();
        while reader.next_list_item().unwrap() {
            reader.next(false).unwrap();
            items.push(reader.int64().unwrap());
        }
        assert_eq!(items, vec![1, 2]);
        assert!(reader.next_key().unwrap());
        assert_eq!(reader.str().unwrap(), "b");
        reader.next(false).unwrap();
        assert_eq!(reader.str().unwrap(), "x");
        assert!(!reader.next_key().unwrap());
        reader.finish().unwrap();
    }

    #[test]
    fn test_next_raw_value() {
        let mut reader = Reader::new(b"{skip= <x=1> [ {y=2}; 3 ] ; keep=5}");
        reader.next(false).unwrap();
        assert!(reader.next_key().unwrap());
        assert_eq!(reader.next_raw_value().unwrap(), b"<x=1> [ {y=2}; 3 ]");
        assert!(reader.next_key().unwrap());
        assert_eq!(reader.str().unwrap(), "keep");
        assert_eq!(reader.next_raw_value().unwrap(), b"5");
        assert!(!reader.next_key().unwrap());
        reader.finish().unwrap();
    }

    #[test]
    fn test_integer_widths() {
        let mut reader = Reader::new(b"300");
        reader.next(false).unwrap();
        assert_eq!(reader.uint(16).unwrap(), 300);
        let err = reader.uint(8).unwrap_err();
        assert_eq!(
            err.kind(),
            &DecodeErrorKind::IntegerOverflow {
                value: 300,
                bits: 8,
                signed: false
            }
        );

        let mut reader = Reader::new(b"-129");
        reader.next(false).unwrap();
        assert!(reader.int(8).is_err());
        assert_eq!(reader.int(16).unwrap(), -129);
        assert!(reader.uint(64).is_err());

        let mut reader = Reader::new(b"18446744073709551615u");
        reader.next(false).unwrap();
        assert_eq!(reader.uint64().unwrap(), u64::MAX);
        assert!(reader.int64().is_err());
    }

    fn nested_lists(depth: usize) -> Vec<u8> {
        let mut data = vec![b'['; depth];
        data.push(b'1');
        data.extend(std::iter::repeat_n(b']', depth));
        data
    }

    #[test]
    fn test_depth_limit() {
        let data = nested_lists(3);
        let mut reader = Reader::new(&data).with_depth_limit(3);
        reader.next_raw_value().unwrap();
        reader.finish().unwrap();

        let data = nested_lists(4);
        let mut reader = Reader::new(&data).with_depth_limit(3);
        let err = reader.next_raw_value().unwrap_err();
        assert!(matches!(err.kind(), DecodeErrorKind::MalformedStream(_)), "{err}");
        assert_eq!(err.offset(), Some(3));

        let mut reader = Reader::new(b"<a=<b=[1]>2>3").with_depth_limit(2);
        assert!(reader.next_raw_value().is_err());
    }

    #[test]
    fn test_trailing_data() {
        let mut reader = Reader::new(b"1 2");
        reader.next(false).unwrap();
        let err = reader.finish().unwrap_err();
        assert_eq!(
            err.kind(),
            &DecodeErrorKind::ExtraData { bytes_remaining: 1 }
        );
    }

    #[test]
    fn test_list_fragment() {
        let mut reader = Reader::new(b"1;2;\n3").with_kind(StreamKind::ListFragment);
        let mut items = Vec::new();
        while reader.next_list_item().unwrap() {
            reader.next(false).unwrap();
            items.push(reader.int64().unwrap());
        }
        assert_eq!(items, vec![1, 2, 3]);
        reader.finish().unwrap();
    }

    #[test]
    fn test_map_fragment() {
        let mut reader = Reader::new(b"a=1;b=2;").with_kind(StreamKind::MapFragment);
        let mut keys = Vec::new();
        while reader.next_key().unwrap() {
            keys.push(reader.str().unwrap().to_owned());
            reader.next_raw_value().unwrap();
        }
        assert_eq!(keys, vec!["a", "b"]);
        reader.finish().unwrap();
    }

    #[test]
    fn test_zero_copy_strings() {
        let data = bytes::Bytes::from_static(b"[abc;\"d\\ne\"]");
        let mut reader = Reader::from_bytes(&data);
        reader.next(false).unwrap();
        reader.next(false).unwrap();
        let b = reader.to_bytes().unwrap();
        assert_eq!(&b[..], b"abc");
        assert_eq!(b.as_ptr(), data[1..].as_ptr());
        reader.next(false).unwrap();
        assert_eq!(reader.bytes().unwrap(), b"d\ne");
    }
}

use std::io::{self, Write as _};
use std::sync::Arc;

use crate::format::{is_unquoted_string, marker, write_quoted};
use crate::varint::{write_varint, write_zigzag};
use crate::{Encode, EncodeError, EncodeErrorKind, EncodeResult, Format, StreamKind, TypeRegistry};

const FLUSH_THRESHOLD: usize = 64 * 1024;
const INDENT: &[u8] = b"    ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Node,
    List,
    Map,
    Attributes,
    ListFragment,
    MapFragment,
}

impl Scope {
    fn is_nested(self) -> bool {
        matches!(self, Scope::List | Scope::Map | Scope::Attributes)
    }

    fn is_map_like(self) -> bool {
        matches!(self, Scope::Map | Scope::Attributes | Scope::MapFragment)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Start,
    Key,
    Item,
    Done,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    scope: Scope,
    slot: Slot,
}

fn invalid(message: &'static str) -> EncodeError {
    EncodeError::new(EncodeErrorKind::InvalidState(message))
}

/// Event-level emitter for any [`Format`].
///
/// Calls are validated against the document grammar as they are made. Output
/// accumulates in an internal buffer and is handed to the sink, if there is
/// one, on [`finish`](Writer::finish) or once enough top-level fragment items
/// have piled up.
pub struct Writer<'w> {
    format: Format,
    buf: Vec<u8>,
    sink: Option<Box<dyn io::Write + 'w>>,
    stack: Vec<Frame>,
    after_attributes: bool,
    finished: bool,
    registry: Arc<TypeRegistry>,
}

impl Writer<'static> {
    /// Creates a writer that only accumulates output; retrieve it with
    /// [`into_bytes`](Writer::into_bytes).
    pub fn new(format: Format) -> Self {
        Writer::build(format, None)
    }
}

impl<'w> Writer<'w> {
    /// Creates a writer that delivers its output to `sink`.
    pub fn with_sink(sink: impl io::Write + 'w, format: Format) -> Self {
        Writer::build(format, Some(Box::new(sink)))
    }

    fn build(format: Format, sink: Option<Box<dyn io::Write + 'w>>) -> Self {
        Writer {
            format,
            buf: Vec::new(),
            sink,
            stack: vec![Frame {
                scope: Scope::Node,
                slot: Slot::Start,
            }],
            after_attributes: false,
            finished: false,
            registry: TypeRegistry::global(),
        }
    }

    /// Sets the shape of the top-level stream. Must be called before writing.
    pub fn with_kind(mut self, kind: StreamKind) -> Self {
        let scope = match kind {
            StreamKind::Node => Scope::Node,
            StreamKind::ListFragment => Scope::ListFragment,
            StreamKind::MapFragment => Scope::MapFragment,
        };
        self.stack = vec![Frame {
            scope,
            slot: Slot::Start,
        }];
        self
    }

    pub fn with_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn begin_map(&mut self) -> EncodeResult<()> {
        self.begin_value()?;
        self.buf.push(marker::BEGIN_MAP);
        self.stack.push(Frame {
            scope: Scope::Map,
            slot: Slot::Start,
        });
        Ok(())
    }

    pub fn end_map(&mut self) -> EncodeResult<()> {
        self.close(Scope::Map, marker::END_MAP)?;
        self.end_value()
    }

    pub fn begin_list(&mut self) -> EncodeResult<()> {
        self.begin_value()?;
        self.buf.push(marker::BEGIN_LIST);
        self.stack.push(Frame {
            scope: Scope::List,
            slot: Slot::Start,
        });
        Ok(())
    }

    pub fn end_list(&mut self) -> EncodeResult<()> {
        self.close(Scope::List, marker::END_LIST)?;
        self.end_value()
    }

    /// Opens the attribute block of the next value.
    pub fn begin_attributes(&mut self) -> EncodeResult<()> {
        if self.after_attributes {
            return Err(invalid("a value may carry only one attribute block"));
        }
        self.begin_value()?;
        self.buf.push(marker::BEGIN_ATTRIBUTES);
        self.stack.push(Frame {
            scope: Scope::Attributes,
            slot: Slot::Start,
        });
        Ok(())
    }

    pub fn end_attributes(&mut self) -> EncodeResult<()> {
        self.close(Scope::Attributes, marker::END_ATTRIBUTES)?;
        self.after_attributes = true;
        Ok(())
    }

    /// Writes a key inside a map or attribute block.
    pub fn map_key(&mut self, key: impl AsRef<[u8]>) -> EncodeResult<()> {
        self.check_open()?;
        let frame = self.top()?;
        if !frame.scope.is_map_like() || !matches!(frame.slot, Slot::Start | Slot::Item) {
            return Err(invalid("map key outside of key position"));
        }
        if self.format == Format::Pretty && frame.scope.is_nested() {
            self.newline_indent(self.depth());
        }
        self.write_string(key.as_ref());
        match self.format {
            Format::Pretty => self.buf.extend_from_slice(b" = "),
            _ => self.buf.push(marker::KEY_VALUE_SEPARATOR),
        }
        self.set_slot(Slot::Key);
        Ok(())
    }

    pub fn entity(&mut self) -> EncodeResult<()> {
        self.begin_value()?;
        self.buf.push(marker::ENTITY);
        self.end_value()
    }

    pub fn boolean(&mut self, value: bool) -> EncodeResult<()> {
        self.begin_value()?;
        match (self.format, value) {
            (Format::Binary, false) => self.buf.push(marker::FALSE),
            (Format::Binary, true) => self.buf.push(marker::TRUE),
            (_, false) => self.buf.extend_from_slice(b"%false"),
            (_, true) => self.buf.extend_from_slice(b"%true"),
        }
        self.end_value()
    }

    pub fn int64(&mut self, value: i64) -> EncodeResult<()> {
        self.begin_value()?;
        match self.format {
            Format::Binary => {
                self.buf.push(marker::INT64);
                write_zigzag(&mut self.buf, value);
            }
            _ => write!(self.buf, "{value}")?,
        }
        self.end_value()
    }

    pub fn uint64(&mut self, value: u64) -> EncodeResult<()> {
        self.begin_value()?;
        match self.format {
            Format::Binary => {
                self.buf.push(marker::UINT64);
                write_varint(&mut self.buf, value);
            }
            _ => write!(self.buf, "{value}u")?,
        }
        self.end_value()
    }

    pub fn double(&mut self, value: f64) -> EncodeResult<()> {
        self.begin_value()?;
        match self.format {
            Format::Binary => {
                self.buf.push(marker::DOUBLE);
                self.buf.extend_from_slice(&value.to_le_bytes());
            }
            _ if value.is_nan() => self.buf.extend_from_slice(b"%nan"),
            _ if value == f64::INFINITY => self.buf.extend_from_slice(b"%inf"),
            _ if value == f64::NEG_INFINITY => self.buf.extend_from_slice(b"%-inf"),
            // Debug formatting always keeps a '.' or an exponent.
            _ => write!(self.buf, "{value:?}")?,
        }
        self.end_value()
    }

    pub fn string(&mut self, value: impl AsRef<[u8]>) -> EncodeResult<()> {
        self.begin_value()?;
        self.write_string(value.as_ref());
        self.end_value()
    }

    /// Writes `value` through its [`Encode`] impl.
    pub fn any<T: Encode + ?Sized>(&mut self, value: &T) -> EncodeResult<()> {
        value.encode(self)
    }

    /// Replays one pre-encoded value, in any encoding, in this writer's
    /// format.
    pub fn raw_value(&mut self, data: &[u8]) -> EncodeResult<()> {
        let bad = |err: crate::DecodeError| {
            EncodeError::new(EncodeErrorKind::InvalidRawValue(err.to_string()))
        };
        let mut check = crate::Reader::new(data);
        check.next_raw_value().map_err(bad)?;
        check.finish().map_err(bad)?;

        let mut reader = crate::Reader::new(data);
        match crate::engine::copy_value(&mut reader, self) {
            Ok(()) => Ok(()),
            Err(crate::Error::Encode(err)) => Err(err),
            Err(crate::Error::Decode(err)) => Err(bad(err)),
        }
    }

    /// Verifies the document is complete and delivers buffered output to
    /// the sink.
    pub fn finish(&mut self) -> EncodeResult<()> {
        self.check_open()?;
        let frame = self.top()?;
        if self.stack.len() != 1 || self.after_attributes {
            return Err(invalid("unclosed container at finish"));
        }
        match (frame.scope, frame.slot) {
            (Scope::Node, Slot::Done) => {}
            (Scope::Node, _) => return Err(invalid("no value written")),
            (_, Slot::Key) => return Err(invalid("map key without value")),
            _ => {}
        }
        self.flush()?;
        self.finished = true;
        Ok(())
    }

    /// Returns the buffered output. Output already delivered to a sink is
    /// not included.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn flush(&mut self) -> EncodeResult<()> {
        if let Some(sink) = self.sink.as_mut() {
            sink.write_all(&self.buf)?;
            sink.flush()?;
            self.buf.clear();
        }
        Ok(())
    }

    fn check_open(&self) -> EncodeResult<()> {
        if self.finished {
            return Err(EncodeError::new(EncodeErrorKind::Finished));
        }
        Ok(())
    }

    fn top(&self) -> EncodeResult<Frame> {
        self.stack
            .last()
            .copied()
            .ok_or_else(|| invalid("writer has no open scope"))
    }

    fn set_slot(&mut self, slot: Slot) {
        if let Some(frame) = self.stack.last_mut() {
            frame.slot = slot;
        }
    }

    fn depth(&self) -> usize {
        self.stack.iter().filter(|f| f.scope.is_nested()).count()
    }

    fn newline_indent(&mut self, depth: usize) {
        self.buf.push(b'\n');
        for _ in 0..depth {
            self.buf.extend_from_slice(INDENT);
        }
    }

    fn begin_value(&mut self) -> EncodeResult<()> {
        self.check_open()?;
        let frame = self.top()?;
        let allowed = match frame.scope {
            Scope::Node => frame.slot == Slot::Start,
            Scope::List | Scope::ListFragment => frame.slot != Slot::Done,
            Scope::Map | Scope::Attributes | Scope::MapFragment => frame.slot == Slot::Key,
        };
        if !allowed {
            return Err(invalid("value is not expected here"));
        }
        if std::mem::take(&mut self.after_attributes) {
            return Ok(());
        }
        if self.format == Format::Pretty && frame.scope == Scope::List {
            self.newline_indent(self.depth());
        }
        Ok(())
    }

    fn end_value(&mut self) -> EncodeResult<()> {
        let binary = self.format == Format::Binary;
        let Some(frame) = self.stack.last_mut() else {
            return Err(invalid("writer has no open scope"));
        };
        match frame.scope {
            Scope::Node => frame.slot = Slot::Done,
            Scope::ListFragment | Scope::MapFragment => {
                frame.slot = Slot::Item;
                self.buf.push(marker::ITEM_SEPARATOR);
                if !binary {
                    self.buf.push(b'\n');
                }
                if self.buf.len() >= FLUSH_THRESHOLD {
                    self.flush()?;
                }
            }
            Scope::List | Scope::Map | Scope::Attributes => {
                frame.slot = Slot::Item;
                self.buf.push(marker::ITEM_SEPARATOR);
            }
        }
        Ok(())
    }

    fn close(&mut self, scope: Scope, token: u8) -> EncodeResult<()> {
        self.check_open()?;
        let frame = self.top()?;
        if frame.scope != scope {
            return Err(invalid("mismatched end of container"));
        }
        if frame.slot == Slot::Key {
            return Err(invalid("map key without value"));
        }
        if self.after_attributes {
            return Err(invalid("attributes without value"));
        }
        let depth = self.depth();
        self.stack.pop();
        if self.format == Format::Pretty && frame.slot == Slot::Item {
            self.newline_indent(depth - 1);
        }
        self.buf.push(token);
        Ok(())
    }

    fn write_string(&mut self, s: &[u8]) {
        match self.format {
            Format::Binary => {
                self.buf.push(marker::STRING);
                write_zigzag(&mut self.buf, s.len() as i64);
                self.buf.extend_from_slice(s);
            }
            _ if is_unquoted_string(s) => self.buf.extend_from_slice(s),
            _ => write_quoted(&mut self.buf, s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Writer;
    use crate::{EncodeErrorKind, Format, StreamKind};

    fn sample(format: Format) -> Vec<u8> {
        let mut w = Writer::new(format);
        w.begin_map().unwrap();
        w.map_key("a").unwrap();
        w.string("b").unwrap();
        w.map_key("c").unwrap();
        w.begin_list().unwrap();
        for i in 1..=3 {
            w.int64(i).unwrap();
        }
        w.end_list().unwrap();
        w.end_map().unwrap();
        w.finish().unwrap();
        w.into_bytes()
    }

    #[test]
    fn test_text_layout() {
        assert_eq!(sample(Format::Text), b"{a=b;c=[1;2;3;];}");
    }

    #[test]
    fn test_pretty_layout() {
        let expected = "{\n    a = b;\n    c = [\n        1;\n        2;\n        3;\n    ];\n}";
        assert_eq!(String::from_utf8(sample(Format::Pretty)).unwrap(), expected);
    }

    #[test]
    fn test_binary_layout() {
        assert_eq!(
            sample(Format::Binary),
            b"{\x01\x02a=\x01\x02b;\x01\x02c=[\x02\x02;\x02\x04;\x02\x06;];}"
        );
    }

    #[test]
    fn test_literals_text() {
        let mut w = Writer::new(Format::Text);
        w.begin_list().unwrap();
        w.uint64(7).unwrap();
        w.double(1.0).unwrap();
        w.double(1e300).unwrap();
        w.double(f64::NAN).unwrap();
        w.double(f64::NEG_INFINITY).unwrap();
        w.boolean(true).unwrap();
        w.entity().unwrap();
        w.string("needs quoting").unwrap();
        w.string("").unwrap();
        w.end_list().unwrap();
        w.finish().unwrap();
        assert_eq!(
            String::from_utf8(w.into_bytes()).unwrap(),
            "[7u;1.0;1e300;%nan;%-inf;%true;#;\"needs quoting\";\"\";]"
        );
    }

    #[test]
    fn test_attributes() {
        let mut w = Writer::new(Format::Text);
        w.begin_attributes().unwrap();
        w.map_key("id").unwrap();
        w.int64(1).unwrap();
        w.end_attributes().unwrap();
        assert_eq!(
            w.begin_attributes().unwrap_err().kind(),
            &EncodeErrorKind::InvalidState("a value may carry only one attribute block")
        );
        w.string("x").unwrap();
        w.finish().unwrap();
        assert_eq!(w.into_bytes(), b"<id=1;>x");
    }

    #[test]
    fn test_invalid_sequences() {
        let mut w = Writer::new(Format::Text);
        w.begin_map().unwrap();
        assert!(w.int64(1).is_err());
        assert!(w.end_list().is_err());
        w.map_key("k").unwrap();
        assert!(w.end_map().is_err());
        assert!(w.finish().is_err());

        let mut w = Writer::new(Format::Text);
        assert!(w.map_key("k").is_err());
        w.int64(1).unwrap();
        assert!(w.int64(2).is_err());
    }

    #[test]
    fn test_finished_writer() {
        let mut w = Writer::new(Format::Text);
        w.entity().unwrap();
        w.finish().unwrap();
        assert_eq!(w.finish().unwrap_err().kind(), &EncodeErrorKind::Finished);
        assert_eq!(w.entity().unwrap_err().kind(), &EncodeErrorKind::Finished);
    }

    #[test]
    fn test_fragments() {
        let mut w = Writer::new(Format::Text).with_kind(StreamKind::ListFragment);
        w.int64(1).unwrap();
        w.string("x").unwrap();
        w.finish().unwrap();
        assert_eq!(w.into_bytes(), b"1;\nx;\n");

        let mut w = Writer::new(Format::Text).with_kind(StreamKind::MapFragment);
        w.map_key("a").unwrap();
        w.int64(1).unwrap();
        w.finish().unwrap();
        assert_eq!(w.into_bytes(), b"a=1;\n");
    }

    #[test]
    fn test_sink_receives_output() {
        let mut out = Vec::new();
        {
            let mut w = Writer::with_sink(&mut out, Format::Text);
            w.begin_list().unwrap();
            w.end_list().unwrap();
            w.finish().unwrap();
        }
        assert_eq!(out, b"[]");
    }

    #[test]
    fn test_sink_failure_is_io() {
        struct Broken;
        impl std::io::Write for Broken {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("disk on fire"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut w = Writer::with_sink(Broken, Format::Text);
        w.int64(1).unwrap();
        assert!(matches!(
            w.finish().unwrap_err().kind(),
            EncodeErrorKind::Io { .. }
        ));
    }

    #[test]
    fn test_raw_value_transcodes() {
        let mut w = Writer::new(Format::Text);
        w.begin_list().unwrap();
        w.raw_value(b"\x01\x04ab").unwrap();
        w.raw_value(b" <x=1> {k = %true} ").unwrap();
        assert!(matches!(
            w.raw_value(b"{k=").unwrap_err().kind(),
            EncodeErrorKind::InvalidRawValue(_)
        ));
        w.end_list().unwrap();
        w.finish().unwrap();
        assert_eq!(w.into_bytes(), b"[ab;<x=1;>{k=%true;};]");
    }
}

use std::collections::BTreeMap;

use crate::{
    Decode, DecodeResult, Encode, EncodeResult, Event, LiteralType, Reader, Writer,
};

/// A schemaless document node.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Entity,
    Bool(bool),
    Int64(i64),
    Uint64(u64),
    Double(f64),
    String(Vec<u8>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// A value carrying an attribute block.
    Attributed {
        attributes: BTreeMap<String, Value>,
        value: Box<Value>,
    },
}

impl Value {
    /// The value with any attributes stripped.
    pub fn inner(&self) -> &Value {
        match self {
            Value::Attributed { value, .. } => value.inner(),
            other => other,
        }
    }

    pub fn attributes(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Attributed { attributes, .. } => Some(attributes),
            _ => None,
        }
    }

    /// Looks up `key` when this is a map.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self.inner() {
            Value::Map(map) => map.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.inner() {
            Value::String(s) => std::str::from_utf8(s).ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self.inner() {
            Value::Int64(i) => Some(i),
            Value::Uint64(u) => i64::try_from(u).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self.inner() {
            Value::Double(d) => Some(d),
            Value::Int64(i) => Some(i as f64),
            Value::Uint64(u) => Some(u as f64),
            _ => None,
        }
    }

    pub fn is_entity(&self) -> bool {
        matches!(self.inner(), Value::Entity)
    }

    fn read(r: &mut Reader<'_>) -> DecodeResult<Value> {
        let value = match r.next(false)? {
            Event::BeginAttributes => {
                let attributes = Self::read_entries(r)?;
                let value = Box::new(Self::read(r)?);
                Value::Attributed { attributes, value }
            }
            Event::BeginMap => Value::Map(Self::read_entries(r)?),
            Event::BeginList => {
                let mut items = Vec::new();
                while r.next_list_item()? {
                    items.push(Self::read(r)?);
                }
                Value::List(items)
            }
            Event::Literal(LiteralType::Entity) => Value::Entity,
            Event::Literal(LiteralType::Bool) => Value::Bool(r.boolean()?),
            Event::Literal(LiteralType::Int64) => Value::Int64(r.int64()?),
            Event::Literal(LiteralType::Uint64) => Value::Uint64(r.uint64()?),
            Event::Literal(LiteralType::Double) => Value::Double(r.double()?),
            Event::Literal(LiteralType::String) => Value::String(r.bytes()?.to_vec()),
            other => return Err(r.unexpected("value", other)),
        };
        Ok(value)
    }

    fn read_entries(r: &mut Reader<'_>) -> DecodeResult<BTreeMap<String, Value>> {
        let mut entries = BTreeMap::new();
        while r.next_key()? {
            let key = r.str()?.to_owned();
            entries.insert(key, Self::read(r)?);
        }
        Ok(entries)
    }
}

fn write_entries(entries: &BTreeMap<String, Value>, w: &mut Writer<'_>) -> EncodeResult<()> {
    for (key, value) in entries {
        w.map_key(key)?;
        value.encode(w)?;
    }
    Ok(())
}

impl Encode for Value {
    fn encode(&self, w: &mut Writer<'_>) -> EncodeResult<()> {
        match self {
            Value::Entity => w.entity(),
            Value::Bool(b) => w.boolean(*b),
            Value::Int64(i) => w.int64(*i),
            Value::Uint64(u) => w.uint64(*u),
            Value::Double(d) => w.double(*d),
            Value::String(s) => w.string(s),
            Value::List(items) => {
                w.begin_list()?;
                for item in items {
                    item.encode(w)?;
                }
                w.end_list()
            }
            Value::Map(entries) => {
                w.begin_map()?;
                write_entries(entries, w)?;
                w.end_map()
            }
            Value::Attributed { attributes, value } => {
                w.begin_attributes()?;
                write_entries(attributes, w)?;
                w.end_attributes()?;
                value.encode(w)
            }
        }
    }

    fn is_empty_value(&self) -> bool {
        matches!(self, Value::Entity)
    }
}

impl Decode for Value {
    fn decode(&mut self, r: &mut Reader<'_>) -> DecodeResult<()> {
        *self = Value::read(r)?;
        Ok(())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int64(i)
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Value::Uint64(u)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into_bytes())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::Value;
    use crate::{DEFAULT_DEPTH_LIMIT, DecodeErrorKind, marshal, unmarshal};

    #[test]
    fn test_schemaless_document() {
        let mut doc = Value::default();
        unmarshal(b"<type=table>{path=\"//home\";rows=[1;2u;%nan];ok=%true}", &mut doc).unwrap();
        assert_eq!(
            doc.attributes().and_then(|a| a.get("type")),
            Some(&Value::from("table"))
        );
        assert_eq!(doc.get("path").and_then(Value::as_str), Some("//home"));
        assert_eq!(doc.get("ok"), Some(&Value::Bool(true)));
        match doc.get("rows") {
            Some(Value::List(rows)) => {
                assert_eq!(rows[0], Value::Int64(1));
                assert_eq!(rows[1], Value::Uint64(2));
                assert!(rows[2].as_f64().is_some_and(f64::is_nan));
            }
            other => panic!("unexpected rows: {other:?}"),
        }
    }

    #[test]
    fn test_encode_sorted_keys() {
        let doc = Value::Map(BTreeMap::from([
            ("b".to_owned(), Value::from(vec![1i64, 2])),
            ("a".to_owned(), Value::Entity),
        ]));
        assert_eq!(marshal(&doc).unwrap(), b"{a=#;b=[1;2;];}");
    }

    fn nested_lists(depth: usize) -> Vec<u8> {
        let mut data = vec![b'['; depth];
        data.extend(std::iter::repeat_n(b']', depth));
        data
    }

    #[test]
    fn test_nesting_at_depth_limit() {
        let mut doc = Value::default();
        unmarshal(&nested_lists(DEFAULT_DEPTH_LIMIT), &mut doc).unwrap();

        let mut depth = 0;
        let mut node = &doc;
        while let Value::List(items) = node {
            depth += 1;
            match items.first() {
                Some(inner) => node = inner,
                None => break,
            }
        }
        assert_eq!(depth, DEFAULT_DEPTH_LIMIT);
    }

    #[test]
    fn test_nesting_past_depth_limit() {
        for depth in [DEFAULT_DEPTH_LIMIT + 1, 100_000] {
            let mut doc = Value::default();
            let err = unmarshal(&nested_lists(depth), &mut doc).unwrap_err();
            assert!(matches!(err.kind(), DecodeErrorKind::MalformedStream(_)), "{err}");
            assert_eq!(err.offset(), Some(DEFAULT_DEPTH_LIMIT));
        }
    }

    #[test]
    fn test_non_utf8_key_rejected() {
        let mut doc = Value::default();
        let err = unmarshal(b"{\"\\xff\"=1}", &mut doc).unwrap_err();
        assert_eq!(err.kind(), &DecodeErrorKind::InvalidUtf8);
    }
}

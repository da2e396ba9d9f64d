use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

use crate::{
    Decode, DecodeError, DecodeErrorKind, DecodeResult, Encode, EncodeError, EncodeErrorKind,
    EncodeResult, Event, LiteralType, MapKey, Reader, Writer,
};

/// Reads the head of a scalar value, skipping attributes.
///
/// Returns `None` for an entity, which leaves scalar destinations untouched.
fn scalar(r: &mut Reader<'_>, expected: &'static str) -> DecodeResult<Option<LiteralType>> {
    match r.next_value()? {
        Event::Literal(LiteralType::Entity) => Ok(None),
        Event::Literal(literal) => Ok(Some(literal)),
        other => Err(r.unexpected(expected, other)),
    }
}

fn integer_key<T: std::str::FromStr>(key: &[u8]) -> DecodeResult<T> {
    std::str::from_utf8(key)
        .ok()
        .and_then(|k| k.parse().ok())
        .ok_or_else(|| DecodeError::mismatch("integer key", "string"))
}

macro_rules! impl_signed {
    ($($ty:ty),*) => {$(
        impl Encode for $ty {
            fn encode(&self, w: &mut Writer<'_>) -> EncodeResult<()> {
                let value = i64::try_from(*self).map_err(|_| {
                    EncodeError::new(EncodeErrorKind::IntegerOverflow { value: *self as i128 })
                })?;
                w.int64(value)
            }

            fn is_empty_value(&self) -> bool {
                *self == 0
            }
        }

        impl Decode for $ty {
            fn decode(&mut self, r: &mut Reader<'_>) -> DecodeResult<()> {
                if scalar(r, "integer")?.is_some() {
                    // Range checked by the reader.
                    *self = r.int(<$ty>::BITS.min(64))? as $ty;
                }
                Ok(())
            }
        }

        impl MapKey for $ty {
            fn to_key(&self) -> EncodeResult<Cow<'_, [u8]>> {
                Ok(Cow::Owned(self.to_string().into_bytes()))
            }

            fn from_key(key: &[u8]) -> DecodeResult<Self> {
                integer_key(key)
            }
        }
    )*};
}

macro_rules! impl_unsigned {
    ($($ty:ty),*) => {$(
        impl Encode for $ty {
            fn encode(&self, w: &mut Writer<'_>) -> EncodeResult<()> {
                let value = u64::try_from(*self).map_err(|_| {
                    EncodeError::new(EncodeErrorKind::IntegerOverflow {
                        value: i128::try_from(*self).unwrap_or(i128::MAX),
                    })
                })?;
                w.uint64(value)
            }

            fn is_empty_value(&self) -> bool {
                *self == 0
            }
        }

        impl Decode for $ty {
            fn decode(&mut self, r: &mut Reader<'_>) -> DecodeResult<()> {
                if scalar(r, "integer")?.is_some() {
                    // Range checked by the reader.
                    *self = r.uint(<$ty>::BITS.min(64))? as $ty;
                }
                Ok(())
            }
        }

        impl MapKey for $ty {
            fn to_key(&self) -> EncodeResult<Cow<'_, [u8]>> {
                Ok(Cow::Owned(self.to_string().into_bytes()))
            }

            fn from_key(key: &[u8]) -> DecodeResult<Self> {
                integer_key(key)
            }
        }
    )*};
}

impl_signed!(i8, i16, i32, i64, i128, isize);
impl_unsigned!(u8, u16, u32, u64, u128, usize);

impl Encode for f64 {
    fn encode(&self, w: &mut Writer<'_>) -> EncodeResult<()> {
        w.double(*self)
    }

    fn is_empty_value(&self) -> bool {
        *self == 0.0
    }
}

impl Decode for f64 {
    fn decode(&mut self, r: &mut Reader<'_>) -> DecodeResult<()> {
        if scalar(r, "double")?.is_some() {
            *self = r.double()?;
        }
        Ok(())
    }
}

impl Encode for f32 {
    fn encode(&self, w: &mut Writer<'_>) -> EncodeResult<()> {
        w.double(f64::from(*self))
    }

    fn is_empty_value(&self) -> bool {
        *self == 0.0
    }
}

impl Decode for f32 {
    fn decode(&mut self, r: &mut Reader<'_>) -> DecodeResult<()> {
        if scalar(r, "double")?.is_some() {
            *self = r.double()? as f32;
        }
        Ok(())
    }
}

impl Encode for bool {
    fn encode(&self, w: &mut Writer<'_>) -> EncodeResult<()> {
        w.boolean(*self)
    }

    fn is_empty_value(&self) -> bool {
        !*self
    }
}

impl Decode for bool {
    fn decode(&mut self, r: &mut Reader<'_>) -> DecodeResult<()> {
        if scalar(r, "boolean")?.is_some() {
            *self = r.boolean()?;
        }
        Ok(())
    }
}

impl Encode for str {
    fn encode(&self, w: &mut Writer<'_>) -> EncodeResult<()> {
        w.string(self)
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl Encode for String {
    fn encode(&self, w: &mut Writer<'_>) -> EncodeResult<()> {
        w.string(self)
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl Decode for String {
    fn decode(&mut self, r: &mut Reader<'_>) -> DecodeResult<()> {
        if scalar(r, "string")?.is_some() {
            let s = r.str()?;
            self.clear();
            self.push_str(s);
        }
        Ok(())
    }
}

impl MapKey for String {
    fn to_key(&self) -> EncodeResult<Cow<'_, [u8]>> {
        Ok(Cow::Borrowed(self.as_bytes()))
    }

    fn from_key(key: &[u8]) -> DecodeResult<Self> {
        String::from_utf8(key.to_vec()).map_err(|_| DecodeError::new(DecodeErrorKind::InvalidUtf8))
    }
}

impl Decode for Box<str> {
    fn decode(&mut self, r: &mut Reader<'_>) -> DecodeResult<()> {
        if scalar(r, "string")?.is_some() {
            *self = Box::from(r.str()?);
        }
        Ok(())
    }
}

impl Encode for Arc<str> {
    fn encode(&self, w: &mut Writer<'_>) -> EncodeResult<()> {
        w.string(&**self)
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl Decode for Arc<str> {
    fn decode(&mut self, r: &mut Reader<'_>) -> DecodeResult<()> {
        if scalar(r, "string")?.is_some() {
            *self = Arc::from(r.str()?);
        }
        Ok(())
    }
}

impl MapKey for Arc<str> {
    fn to_key(&self) -> EncodeResult<Cow<'_, [u8]>> {
        Ok(Cow::Borrowed(self.as_bytes()))
    }

    fn from_key(key: &[u8]) -> DecodeResult<Self> {
        std::str::from_utf8(key)
            .map(Arc::from)
            .map_err(|_| DecodeError::new(DecodeErrorKind::InvalidUtf8))
    }
}

/// Byte strings, not required to be UTF-8.
impl Encode for bytes::Bytes {
    fn encode(&self, w: &mut Writer<'_>) -> EncodeResult<()> {
        w.string(self)
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl Decode for bytes::Bytes {
    fn decode(&mut self, r: &mut Reader<'_>) -> DecodeResult<()> {
        if scalar(r, "string")?.is_some() {
            *self = r.to_bytes()?;
        }
        Ok(())
    }
}

impl MapKey for bytes::Bytes {
    fn to_key(&self) -> EncodeResult<Cow<'_, [u8]>> {
        Ok(Cow::Borrowed(self))
    }

    fn from_key(key: &[u8]) -> DecodeResult<Self> {
        Ok(bytes::Bytes::copy_from_slice(key))
    }
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self, w: &mut Writer<'_>) -> EncodeResult<()> {
        (**self).encode(w)
    }

    fn is_empty_value(&self) -> bool {
        (**self).is_empty_value()
    }
}

impl<T: Encode + ?Sized> Encode for Box<T> {
    fn encode(&self, w: &mut Writer<'_>) -> EncodeResult<()> {
        (**self).encode(w)
    }

    fn is_empty_value(&self) -> bool {
        (**self).is_empty_value()
    }
}

impl<T: Decode + ?Sized> Decode for Box<T> {
    fn decode(&mut self, r: &mut Reader<'_>) -> DecodeResult<()> {
        (**self).decode(r)
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode(&self, w: &mut Writer<'_>) -> EncodeResult<()> {
        match self {
            Some(value) => value.encode(w),
            None => w.entity(),
        }
    }

    fn is_empty_value(&self) -> bool {
        self.is_none()
    }
}

impl<T: Decode + Default> Decode for Option<T> {
    fn decode(&mut self, r: &mut Reader<'_>) -> DecodeResult<()> {
        match r.next(true)? {
            Event::Literal(LiteralType::Entity) => {
                *self = None;
                return Ok(());
            }
            Event::BeginAttributes => {
                r.undo();
                // An attributed entity is still absent.
                if r.entity_ahead()? {
                    r.next_value()?;
                    *self = None;
                    return Ok(());
                }
            }
            _ => r.undo(),
        }
        let mut value = T::default();
        value.decode(r)?;
        *self = Some(value);
        Ok(())
    }
}

fn encode_seq<'a, T: Encode + 'a>(
    items: impl IntoIterator<Item = &'a T>,
    w: &mut Writer<'_>,
) -> EncodeResult<()> {
    w.begin_list()?;
    for item in items {
        item.encode(w)?;
    }
    w.end_list()
}

/// Decodes list items into fresh values handed to `push`.
///
/// Returns `false` for an entity, leaving the destination to decide what an
/// absent list means.
fn decode_seq<T: Decode + Default>(
    r: &mut Reader<'_>,
    mut push: impl FnMut(T),
) -> DecodeResult<bool> {
    match r.next_value()? {
        Event::Literal(LiteralType::Entity) => Ok(false),
        Event::BeginList => {
            while r.next_list_item()? {
                let mut item = T::default();
                item.decode(r)?;
                push(item);
            }
            Ok(true)
        }
        other => Err(r.unexpected("list", other)),
    }
}

impl<T: Encode> Encode for [T] {
    fn encode(&self, w: &mut Writer<'_>) -> EncodeResult<()> {
        encode_seq(self, w)
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, w: &mut Writer<'_>) -> EncodeResult<()> {
        encode_seq(self, w)
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Decode + Default> Decode for Vec<T> {
    fn decode(&mut self, r: &mut Reader<'_>) -> DecodeResult<()> {
        self.clear();
        decode_seq(r, |item| self.push(item))?;
        Ok(())
    }
}

impl<T: Encode, const N: usize> Encode for [T; N] {
    fn encode(&self, w: &mut Writer<'_>) -> EncodeResult<()> {
        encode_seq(self, w)
    }

    fn is_empty_value(&self) -> bool {
        N == 0
    }
}

impl<T: Decode + Default, const N: usize> Decode for [T; N] {
    fn decode(&mut self, r: &mut Reader<'_>) -> DecodeResult<()> {
        match r.next_value()? {
            Event::Literal(LiteralType::Entity) => Ok(()),
            Event::BeginList => {
                let mut filled = 0;
                while r.next_list_item()? {
                    match self.get_mut(filled) {
                        Some(slot) => {
                            let mut item = T::default();
                            item.decode(r)?;
                            *slot = item;
                            filled += 1;
                        }
                        None => {
                            r.next_raw_value()?;
                        }
                    }
                }
                for slot in &mut self[filled..] {
                    *slot = T::default();
                }
                Ok(())
            }
            other => Err(r.unexpected("list", other)),
        }
    }
}

fn encode_map<'a, K: MapKey + 'a, V: Encode + 'a>(
    entries: impl IntoIterator<Item = (&'a K, &'a V)>,
    w: &mut Writer<'_>,
) -> EncodeResult<()> {
    w.begin_map()?;
    for (key, value) in entries {
        w.map_key(key.to_key()?)?;
        value.encode(w)?;
    }
    w.end_map()
}

/// Decodes map entries into fresh values handed to `insert`. Later
/// duplicates overwrite earlier ones in the destination.
fn decode_map<K: MapKey, V: Decode + Default>(
    r: &mut Reader<'_>,
    mut insert: impl FnMut(K, V),
) -> DecodeResult<bool> {
    match r.next_value()? {
        Event::Literal(LiteralType::Entity) => Ok(false),
        Event::BeginMap => {
            while r.next_key()? {
                let key = K::from_key(r.bytes()?).map_err(|e| e.at(r.position()))?;
                let mut value = V::default();
                value.decode(r)?;
                insert(key, value);
            }
            Ok(true)
        }
        other => Err(r.unexpected("map", other)),
    }
}

impl<K: MapKey, V: Encode, S> Encode for HashMap<K, V, S> {
    fn encode(&self, w: &mut Writer<'_>) -> EncodeResult<()> {
        encode_map(self, w)
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V, S> Decode for HashMap<K, V, S>
where
    K: MapKey + Eq + Hash,
    V: Decode + Default,
    S: BuildHasher + Default,
{
    fn decode(&mut self, r: &mut Reader<'_>) -> DecodeResult<()> {
        let mut map = HashMap::default();
        decode_map(r, |k, v| {
            map.insert(k, v);
        })?;
        *self = map;
        Ok(())
    }
}

impl<K: MapKey, V: Encode> Encode for BTreeMap<K, V> {
    fn encode(&self, w: &mut Writer<'_>) -> EncodeResult<()> {
        encode_map(self, w)
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<K: MapKey + Ord, V: Decode + Default> Decode for BTreeMap<K, V> {
    fn decode(&mut self, r: &mut Reader<'_>) -> DecodeResult<()> {
        let mut map = BTreeMap::new();
        decode_map(r, |k, v| {
            map.insert(k, v);
        })?;
        *self = map;
        Ok(())
    }
}

/// Timestamps as RFC 3339 strings with microsecond precision.
#[cfg(feature = "chrono")]
impl Encode for chrono::DateTime<chrono::Utc> {
    fn encode(&self, w: &mut Writer<'_>) -> EncodeResult<()> {
        w.string(self.to_rfc3339_opts(chrono::SecondsFormat::Micros, true))
    }
}

#[cfg(feature = "chrono")]
impl Decode for chrono::DateTime<chrono::Utc> {
    fn decode(&mut self, r: &mut Reader<'_>) -> DecodeResult<()> {
        if scalar(r, "timestamp")?.is_some() {
            let parsed = chrono::DateTime::parse_from_rfc3339(r.str()?)
                .map_err(|e| DecodeError::custom(format!("invalid timestamp: {e}")))?;
            *self = parsed.with_timezone(&chrono::Utc);
        }
        Ok(())
    }
}

#[cfg(feature = "smallvec")]
impl<A: smallvec::Array> Encode for smallvec::SmallVec<A>
where
    A::Item: Encode,
{
    fn encode(&self, w: &mut Writer<'_>) -> EncodeResult<()> {
        encode_seq(self.iter(), w)
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

#[cfg(feature = "smallvec")]
impl<A: smallvec::Array> Decode for smallvec::SmallVec<A>
where
    A::Item: Decode + Default,
{
    fn decode(&mut self, r: &mut Reader<'_>) -> DecodeResult<()> {
        self.clear();
        decode_seq(r, |item| self.push(item))?;
        Ok(())
    }
}

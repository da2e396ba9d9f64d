use std::borrow::Cow;

use crate::{DecodeResult, EncodeResult, Reader, Writer};

/// Types that can write themselves as one YSON value.
pub trait Encode {
    /// Writes exactly one value, optionally preceded by an attribute block.
    fn encode(&self, w: &mut Writer<'_>) -> EncodeResult<()>;

    /// Whether the value counts as empty for `omitempty` fields.
    fn is_empty_value(&self) -> bool {
        false
    }
}

/// Types that can be decoded from one YSON value.
///
/// Decoding happens in place: an entity literal leaves scalars untouched and
/// resets optional and container destinations, and aggregates only assign
/// the fields present in the input.
pub trait Decode {
    fn decode(&mut self, r: &mut Reader<'_>) -> DecodeResult<()>;
}

/// Types usable as keys of encoded maps.
pub trait MapKey: Sized {
    fn to_key(&self) -> EncodeResult<Cow<'_, [u8]>>;
    fn from_key(key: &[u8]) -> DecodeResult<Self>;
}

/// Compile-time description of one declared field of an [`Aggregate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
    /// Field identifier as declared.
    pub ident: &'static str,
    /// Raw tag, e.g. `"name,attr,omitempty"`.
    pub tag: Option<&'static str>,
    /// Fields of the embedded aggregate, for `#[yson(embed)]` fields.
    pub embedded: Option<&'static [FieldInfo]>,
}

/// A struct whose fields are mapped to map keys or attributes.
///
/// Normally implemented with `#[derive(Yson)]`. Fields are addressed by path:
/// declaration indices through embedded members.
pub trait Aggregate: 'static {
    const NAME: &'static str;
    const FIELDS: &'static [FieldInfo];

    fn decode_field(&mut self, path: &[usize], r: &mut Reader<'_>) -> DecodeResult<()>;
    fn encode_field(&self, path: &[usize], w: &mut Writer<'_>) -> EncodeResult<()>;

    /// `None` when the field is behind an absent embedded member.
    fn field_is_empty(&self, path: &[usize]) -> Option<bool>;
}

/// Access to an embedded aggregate through the field that holds it.
pub trait Embed {
    type Target: Aggregate;

    fn embedded(&self) -> Option<&Self::Target>;

    /// Returns the embedded aggregate, allocating it first if absent.
    fn embedded_mut(&mut self) -> &mut Self::Target;
}

impl<T: Aggregate> Embed for Box<T> {
    type Target = T;

    fn embedded(&self) -> Option<&T> {
        Some(self)
    }

    fn embedded_mut(&mut self) -> &mut T {
        self
    }
}

impl<T: Aggregate + Default> Embed for Option<Box<T>> {
    type Target = T;

    fn embedded(&self) -> Option<&T> {
        self.as_deref()
    }

    fn embedded_mut(&mut self) -> &mut T {
        self.get_or_insert_with(Box::default)
    }
}

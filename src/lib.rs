//! YSON is a self-describing structured data format with a human-readable
//! text encoding and a compact binary encoding sharing one data model.
//!
//! Values are maps, lists and literals (strings, signed and unsigned
//! integers, doubles, booleans and the entity `#`), and any value may carry
//! an attribute block. This crate provides a streaming [`Reader`] and
//! [`Writer`] over that model, and a derive-driven mapping between encoded
//! values and Rust types.
//!
//! # Examples
//!
//! ```
//! use yson::{Yson, marshal, unmarshal};
//!
//! #[derive(Yson, Default, Debug, PartialEq)]
//! struct Table {
//!     #[yson("id,attr")]
//!     id: u64,
//!     #[yson("path")]
//!     path: String,
//!     #[yson("rows,omitempty")]
//!     rows: Vec<i32>,
//! }
//!
//! let table = Table { id: 7, path: "home".into(), rows: vec![] };
//! let encoded = marshal(&table).unwrap();
//! assert_eq!(encoded, b"<id=7u;>{path=home;}");
//!
//! let mut decoded = Table::default();
//! unmarshal(&encoded, &mut decoded).unwrap();
//! assert_eq!(decoded, table);
//! ```

mod buf;
mod descriptor;
mod engine;
mod error;
mod format;
mod lexer;
mod raw;
mod reader;
mod registry;
mod tag;
mod traits;
mod types;
mod value;
mod varint;
mod writer;

use std::io;

pub use crate::descriptor::{FieldMetadata, TypeDescriptor};
pub use crate::engine::copy_value;
pub use crate::error::{
    DecodeError, DecodeErrorKind, DecodeResult, EncodeError, EncodeErrorKind, EncodeResult, Error,
    ErrorContext,
};
pub use crate::format::{Format, StreamKind};
pub use crate::raw::RawValue;
pub use crate::reader::{DEFAULT_DEPTH_LIMIT, Event, LiteralType, Reader};
pub use crate::registry::{TypeRegistry, descriptor_of};
pub use crate::tag::FieldTag;
pub use crate::traits::{Aggregate, Decode, Embed, Encode, FieldInfo, MapKey};
pub use crate::value::Value;
pub use crate::writer::Writer;

#[doc(hidden)]
pub use crate::engine::{decode_aggregate, encode_aggregate};

/// Derives [`Aggregate`], [`Encode`] and [`Decode`] for structs, and string
/// based [`Encode`]/[`Decode`]/[`MapKey`] for unit-only enums.
///
/// # Example
///
/// ```
/// use yson::Yson;
///
/// #[derive(Yson, Default)]
/// struct Meta {
///     #[yson("owner")]
///     owner: String,
/// }
///
/// #[derive(Yson, Default)]
/// struct Node {
///     #[yson(embed)]
///     meta: Meta,
///     #[yson("size,omitempty")]
///     size: u64,
///     #[yson("-")]
///     cached: bool,
/// }
/// ```
pub use yson_derive::Yson;

/// Encodes `value` as compact text.
pub fn marshal<T: Encode + ?Sized>(value: &T) -> EncodeResult<Vec<u8>> {
    marshal_format(value, Format::Text)
}

/// Encodes `value` in the given format.
pub fn marshal_format<T: Encode + ?Sized>(value: &T, format: Format) -> EncodeResult<Vec<u8>> {
    let mut w = Writer::new(format);
    w.any(value)?;
    w.finish()?;
    Ok(w.into_bytes())
}

/// Encodes `value` in the given format into `sink`.
pub fn marshal_to_writer<T: Encode + ?Sized, W: io::Write>(
    value: &T,
    sink: W,
    format: Format,
) -> EncodeResult<()> {
    let mut w = Writer::with_sink(sink, format);
    w.any(value)?;
    w.finish()
}

/// Decodes a single-value stream into `value`.
///
/// Trailing data after the value is an error.
pub fn unmarshal<T: Decode + ?Sized>(data: &[u8], value: &mut T) -> DecodeResult<()> {
    let mut r = Reader::new(data);
    value.decode(&mut r)?;
    r.finish()
}

/// Like [`unmarshal`], but string destinations of type [`bytes::Bytes`]
/// share memory with `data`.
pub fn unmarshal_bytes<T: Decode + ?Sized>(data: &bytes::Bytes, value: &mut T) -> DecodeResult<()> {
    let mut r = Reader::from_bytes(data);
    value.decode(&mut r)?;
    r.finish()
}

/// Decodes every item of a list fragment, `item;item;...`.
pub fn unmarshal_list_fragment<T: Decode + Default>(data: &[u8]) -> DecodeResult<Vec<T>> {
    let mut r = Reader::new(data).with_kind(StreamKind::ListFragment);
    let mut items = Vec::new();
    while r.next_list_item()? {
        let mut item = T::default();
        item.decode(&mut r)?;
        items.push(item);
    }
    r.finish()?;
    Ok(items)
}

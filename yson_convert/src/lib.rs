//! yson_convert re-encodes yson streams between the text, binary and pretty
//! formats without building a document tree.
//!
//! This crate is primarily used as a binary (`ysonconv`) for inspecting
//! binary yson data or compacting hand-written text.

use std::io;

use yson::{Error, Format, Reader, StreamKind, Writer, copy_value};

/// Re-encodes `input` into `sink`, returning the number of top-level items
/// written (1 for a single node).
pub fn convert_to(
    input: &[u8],
    kind: StreamKind,
    format: Format,
    sink: impl io::Write,
) -> Result<usize, Error> {
    let mut r = Reader::new(input).with_kind(kind);
    let mut w = Writer::with_sink(sink, format).with_kind(kind);

    let mut items = 0;
    match kind {
        StreamKind::Node => {
            copy_value(&mut r, &mut w)?;
            items = 1;
        }
        StreamKind::ListFragment => {
            while r.next_list_item()? {
                copy_value(&mut r, &mut w)?;
                items += 1;
            }
        }
        StreamKind::MapFragment => {
            while r.next_key()? {
                w.map_key(r.bytes()?)?;
                copy_value(&mut r, &mut w)?;
                items += 1;
            }
        }
    }
    r.finish()?;
    w.finish()?;

    tracing::debug!(?kind, ?format, items, bytes_in = input.len(), "converted stream");
    Ok(items)
}

/// Re-encodes `input` and returns the output.
pub fn convert(input: &[u8], kind: StreamKind, format: Format) -> Result<Vec<u8>, Error> {
    let mut output = Vec::new();
    convert_to(input, kind, format, &mut output)?;
    Ok(output)
}

/// Checks that `input` is a well-formed stream of the given kind and
/// returns its number of top-level items.
pub fn validate(input: &[u8], kind: StreamKind) -> Result<usize, yson::DecodeError> {
    let mut r = Reader::new(input).with_kind(kind);
    let mut items = 0;
    match kind {
        StreamKind::Node => {
            r.next_raw_value()?;
            items = 1;
        }
        StreamKind::ListFragment => {
            while r.next_list_item()? {
                r.next_raw_value()?;
                items += 1;
            }
        }
        StreamKind::MapFragment => {
            while r.next_key()? {
                r.next_raw_value()?;
                items += 1;
            }
        }
    }
    r.finish()?;
    Ok(items)
}

/// Parses a stream kind name as accepted on the command line.
pub fn parse_kind(name: &str) -> Option<StreamKind> {
    match name {
        "node" => Some(StreamKind::Node),
        "list" | "list_fragment" => Some(StreamKind::ListFragment),
        "map" | "map_fragment" => Some(StreamKind::MapFragment),
        _ => None,
    }
}

/// Parses a format name as accepted on the command line.
pub fn parse_format(name: &str) -> Option<Format> {
    match name {
        "text" => Some(Format::Text),
        "binary" => Some(Format::Binary),
        "pretty" => Some(Format::Pretty),
        _ => None,
    }
}

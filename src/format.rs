/// Physical encoding produced by a [`Writer`](crate::Writer).
///
/// Readers accept every format without being told which one to expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    /// Compact human-readable text: `{a=b;c=[1;2;3;];}`.
    #[default]
    Text,
    /// Type-tagged binary literals with the same structural tokens.
    Binary,
    /// Indented human-readable text.
    Pretty,
}

/// Shape of a top-level stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StreamKind {
    /// Exactly one value.
    #[default]
    Node,
    /// `item;item;...` up to the end of input.
    ListFragment,
    /// `key=value;key=value;...` up to the end of input.
    MapFragment,
}

pub(crate) mod marker {
    pub const STRING: u8 = 0x01;
    pub const INT64: u8 = 0x02;
    pub const DOUBLE: u8 = 0x03;
    pub const FALSE: u8 = 0x04;
    pub const TRUE: u8 = 0x05;
    pub const UINT64: u8 = 0x06;

    pub const BEGIN_LIST: u8 = b'[';
    pub const END_LIST: u8 = b']';
    pub const BEGIN_MAP: u8 = b'{';
    pub const END_MAP: u8 = b'}';
    pub const BEGIN_ATTRIBUTES: u8 = b'<';
    pub const END_ATTRIBUTES: u8 = b'>';
    pub const KEY_VALUE_SEPARATOR: u8 = b'=';
    pub const ITEM_SEPARATOR: u8 = b';';
    pub const ENTITY: u8 = b'#';
}

pub(crate) fn is_unquoted_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

pub(crate) fn is_unquoted_continuation(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'%' | b'.')
}

/// Whether `s` can be written in text form without quotes.
pub(crate) fn is_unquoted_string(s: &[u8]) -> bool {
    match s.split_first() {
        Some((first, rest)) => {
            is_unquoted_start(*first) && rest.iter().all(|b| is_unquoted_continuation(*b))
        }
        None => false,
    }
}

/// Appends `s` to `output` as a quoted, escaped text string.
pub(crate) fn write_quoted(output: &mut Vec<u8>, s: &[u8]) {
    const HEX: &[u8; 16] = b"0123456789abcdef";

    output.push(b'"');
    for &b in s {
        match b {
            b'"' => output.extend_from_slice(b"\\\""),
            b'\\' => output.extend_from_slice(b"\\\\"),
            b'\n' => output.extend_from_slice(b"\\n"),
            b'\r' => output.extend_from_slice(b"\\r"),
            b'\t' => output.extend_from_slice(b"\\t"),
            0x20..=0x7e => output.push(b),
            _ => output.extend_from_slice(&[
                b'\\',
                b'x',
                HEX[(b >> 4) as usize],
                HEX[(b & 0x0f) as usize],
            ]),
        }
    }
    output.push(b'"');
}

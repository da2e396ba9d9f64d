use std::fmt;

use thiserror::Error;

/// Specific kinds of errors that can occur when decoding YSON data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// Structural violation of the grammar. Aborts the whole document.
    #[error("malformed stream: {0}")]
    MalformedStream(String),

    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("integer {value} does not fit into {}", int_type_name(.signed, .bits))]
    IntegerOverflow { value: i128, bits: u32, signed: bool },

    #[error("invalid UTF-8 in string")]
    InvalidUtf8,

    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    #[error("unknown variant: {0:?}")]
    UnknownVariant(String),

    /// Error reported by a type's own decode hook.
    #[error("{0}")]
    CustomHook(String),

    #[error("extra data after parsing: {bytes_remaining} bytes remaining")]
    ExtraData { bytes_remaining: usize },
}

fn int_type_name(signed: &bool, bits: &u32) -> String {
    format!("{}{bits}", if *signed { "i" } else { "u" })
}

/// Where inside the document a decode error happened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    type_name: Option<&'static str>,
    field: Option<String>,
    offset: Option<usize>,
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.type_name, &self.field) {
            (Some(type_name), Some(field)) => write!(f, " in {type_name}.{field}")?,
            (Some(type_name), None) => write!(f, " in {type_name}")?,
            (None, Some(field)) => write!(f, " in field {field}")?,
            (None, None) => {}
        }
        if let Some(offset) = self.offset {
            write!(f, " at offset {offset}")?;
        }
        Ok(())
    }
}

/// Error type returned when decoding YSON data fails.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("decode error{context}: {kind}")]
pub struct DecodeError {
    kind: DecodeErrorKind,
    context: ErrorContext,
}

impl DecodeError {
    /// Creates a new DecodeError with the given kind.
    pub fn new(kind: DecodeErrorKind) -> Self {
        Self {
            kind,
            context: ErrorContext::default(),
        }
    }

    /// Shorthand for errors produced by hand-written decode hooks.
    pub fn custom(message: impl fmt::Display) -> Self {
        Self::new(DecodeErrorKind::CustomHook(message.to_string()))
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::new(DecodeErrorKind::MalformedStream(message.into()))
    }

    pub(crate) fn mismatch(expected: &'static str, actual: &'static str) -> Self {
        Self::new(DecodeErrorKind::TypeMismatch { expected, actual })
    }

    /// Returns the specific kind of decode error that occurred.
    pub fn kind(&self) -> &DecodeErrorKind {
        &self.kind
    }

    /// Name of the aggregate type being decoded, if known.
    pub fn type_name(&self) -> Option<&'static str> {
        self.context.type_name
    }

    /// Wire name of the field being decoded, if known.
    pub fn field(&self) -> Option<&str> {
        self.context.field.as_deref()
    }

    /// Byte offset in the input where the error was detected, if known.
    pub fn offset(&self) -> Option<usize> {
        self.context.offset
    }

    /// Annotates the error with the aggregate field it happened in.
    ///
    /// The innermost annotation wins: an error that already names a field is
    /// returned unchanged.
    pub fn in_field(mut self, type_name: &'static str, field: &str) -> Self {
        if self.context.field.is_none() {
            self.context.type_name = Some(type_name);
            self.context.field = Some(field.to_owned());
        }
        self
    }

    pub(crate) fn at(mut self, offset: usize) -> Self {
        if self.context.offset.is_none() {
            self.context.offset = Some(offset);
        }
        self
    }
}

/// Result type for decoding operations.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Specific kinds of errors that can occur when encoding YSON data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeErrorKind {
    /// Writer calls do not form a well-formed document.
    #[error("invalid writer state: {0}")]
    InvalidState(&'static str),

    #[error("writer is already finished")]
    Finished,

    #[error("integer {value} does not fit into a 64-bit literal")]
    IntegerOverflow { value: i128 },

    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// Error reported by a type's own encode hook.
    #[error("{0}")]
    CustomHook(String),

    #[error("invalid raw value: {0}")]
    InvalidRawValue(String),

    #[error("I/O error: {message}")]
    Io {
        kind: std::io::ErrorKind,
        message: String,
    },
}

/// Error type returned when encoding to YSON fails.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("encode error: {kind}")]
pub struct EncodeError {
    kind: EncodeErrorKind,
}

impl EncodeError {
    /// Creates a new EncodeError with the given kind.
    pub fn new(kind: EncodeErrorKind) -> Self {
        Self { kind }
    }

    /// Shorthand for errors produced by hand-written encode hooks.
    pub fn custom(message: impl fmt::Display) -> Self {
        Self::new(EncodeErrorKind::CustomHook(message.to_string()))
    }

    /// Returns the specific kind of encode error that occurred.
    pub fn kind(&self) -> &EncodeErrorKind {
        &self.kind
    }
}

impl From<std::io::Error> for EncodeError {
    fn from(err: std::io::Error) -> Self {
        Self::new(EncodeErrorKind::Io {
            kind: err.kind(),
            message: err.to_string(),
        })
    }
}

/// Result type for encoding operations.
pub type EncodeResult<T> = Result<T, EncodeError>;

/// Either side of a transcoding operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

#[cfg(test)]
mod tests {
    use super::{DecodeError, DecodeErrorKind};

    #[test]
    fn test_display_with_context() {
        let err = DecodeError::new(DecodeErrorKind::IntegerOverflow {
            value: 300,
            bits: 8,
            signed: false,
        })
        .at(12)
        .in_field("Config", "retries");
        assert_eq!(
            err.to_string(),
            "decode error in Config.retries at offset 12: integer 300 does not fit into u8"
        );
    }

    #[test]
    fn test_innermost_field_wins() {
        let err = DecodeError::mismatch("string", "int64")
            .in_field("Inner", "name")
            .in_field("Outer", "inner");
        assert_eq!(err.type_name(), Some("Inner"));
        assert_eq!(err.field(), Some("name"));
    }
}

use crate::{Decode, DecodeResult, Encode, EncodeResult, Reader, Writer};

/// The encoded bytes of one value, captured without interpretation.
///
/// Decoding records the value exactly as it appeared in the input, including
/// its attributes and encoding. Encoding replays it in the writer's format.
/// An empty `RawValue` encodes as an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RawValue(Vec<u8>);

impl RawValue {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        RawValue(data.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl Encode for RawValue {
    fn encode(&self, w: &mut Writer<'_>) -> EncodeResult<()> {
        if self.0.is_empty() {
            return w.entity();
        }
        w.raw_value(&self.0)
    }

    fn is_empty_value(&self) -> bool {
        self.0.is_empty()
    }
}

impl Decode for RawValue {
    fn decode(&mut self, r: &mut Reader<'_>) -> DecodeResult<()> {
        self.0 = r.next_raw_value()?.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::RawValue;
    use crate::{EncodeErrorKind, Format, marshal, marshal_format, unmarshal};

    #[test]
    fn test_capture_and_replay() {
        let mut fields: BTreeMap<String, RawValue> = BTreeMap::new();
        unmarshal(b"{a = <x=1> [ 1 ; 2 ]; b=\"s\"}", &mut fields).unwrap();
        assert_eq!(fields["a"].as_bytes(), b"<x=1> [ 1 ; 2 ]");
        assert_eq!(fields["b"].as_bytes(), b"\"s\"");

        assert_eq!(marshal(&fields).unwrap(), b"{a=<x=1;>[1;2;];b=s;}");
        let binary = marshal_format(&fields["b"], Format::Binary).unwrap();
        assert_eq!(binary, b"\x01\x02s");
    }

    #[test]
    fn test_invalid_raw() {
        let err = marshal(&RawValue::new("{unclosed")).unwrap_err();
        assert!(matches!(err.kind(), EncodeErrorKind::InvalidRawValue(_)));
        assert_eq!(marshal(&RawValue::default()).unwrap(), b"#");
    }
}

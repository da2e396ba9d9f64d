use crate::{DecodeError, DecodeResult};

/// Cursor over the encoded input.
///
/// When the input came from a [`bytes::Bytes`], slices handed out by the
/// cursor can be turned back into `Bytes` without copying.
#[derive(Clone)]
pub(crate) struct Input<'a> {
    origin: Option<&'a bytes::Bytes>,
    data: &'a [u8],
    pos: usize,
}

impl<'a> Input<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Input {
            origin: None,
            data,
            pos: 0,
        }
    }

    pub(crate) fn from_bytes(b: &'a bytes::Bytes) -> Self {
        Input {
            origin: Some(b),
            data: b,
            pos: 0,
        }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub(crate) fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    pub(crate) fn advance(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.data.len());
    }

    pub(crate) fn read_byte(&mut self) -> DecodeResult<u8> {
        let b = self.peek().ok_or_else(|| self.eof())?;
        self.pos += 1;
        Ok(b)
    }

    pub(crate) fn read(&mut self, amt: usize) -> DecodeResult<&'a [u8]> {
        if amt > self.remaining() {
            return Err(DecodeError::malformed(format!(
                "need {amt} bytes, have {}",
                self.remaining()
            ))
            .at(self.pos));
        }
        let result = &self.data[self.pos..self.pos + amt];
        self.pos += amt;
        Ok(result)
    }

    /// Consumes bytes while `pred` holds and returns them.
    pub(crate) fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a [u8] {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if !pred(b) {
                break;
            }
            self.pos += 1;
        }
        &self.data[start..self.pos]
    }

    pub(crate) fn skip_whitespace(&mut self) {
        self.take_while(|b| b.is_ascii_whitespace() || b == 0x0b);
    }

    pub(crate) fn slice(&self, start: usize, end: usize) -> &'a [u8] {
        &self.data[start..end]
    }

    /// Returns `slice` as a zero-copy `Bytes` when possible.
    ///
    /// `slice` must point into this input for the zero-copy path to apply;
    /// anything else is copied.
    pub(crate) fn to_bytes(&self, slice: &[u8]) -> bytes::Bytes {
        let range = self.data.as_ptr_range();
        let inside = range.start <= slice.as_ptr() && slice.as_ptr_range().end <= range.end;
        match self.origin {
            Some(b) if inside => b.slice_ref(slice),
            _ => bytes::Bytes::copy_from_slice(slice),
        }
    }

    pub(crate) fn eof(&self) -> DecodeError {
        DecodeError::malformed("unexpected end of stream").at(self.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::Input;

    #[test]
    fn test_read_past_end() {
        let mut input = Input::new(b"abc");
        assert_eq!(input.read(2).unwrap(), b"ab");
        assert!(input.read(2).is_err());
        assert_eq!(input.read_byte().unwrap(), b'c');
        assert!(input.read_byte().is_err());
    }

    #[test]
    fn test_zero_copy_bytes() {
        let data = bytes::Bytes::from_static(b"hello world");
        let mut input = Input::from_bytes(&data);
        let word = input.read(5).unwrap();
        let b = input.to_bytes(word);
        assert_eq!(&b[..], b"hello");
        assert_eq!(b.as_ptr(), data.as_ptr());
    }
}

use crate::buf::Input;
use crate::{DecodeError, DecodeResult};

const MAX_VARINT_BYTES: usize = 10;

pub(crate) fn write_varint(buffer: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buffer.push((value as u8) | 0x80);
        value >>= 7;
    }
    buffer.push(value as u8);
}

pub(crate) fn write_zigzag(buffer: &mut Vec<u8>, value: i64) {
    write_varint(buffer, ((value << 1) ^ (value >> 63)) as u64);
}

pub(crate) fn read_varint(data: &mut Input) -> DecodeResult<u64> {
    let start = data.position();
    let mut result = 0u64;
    for i in 0..MAX_VARINT_BYTES {
        let byte = data.read_byte()?;
        let shift = 7 * i as u32;
        if i == MAX_VARINT_BYTES - 1 && byte > 0x01 {
            break;
        }
        result |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
    }
    Err(DecodeError::malformed("malformed varint").at(start))
}

pub(crate) fn read_zigzag(data: &mut Input) -> DecodeResult<i64> {
    let raw = read_varint(data)?;
    Ok((raw >> 1) as i64 ^ -((raw & 1) as i64))
}

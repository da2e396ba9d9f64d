use crate::descriptor::FieldMetadata;
use crate::{Aggregate, DecodeResult, EncodeResult, Error, Event, LiteralType, Reader, Writer};

/// Writes `value` as `<attributes>{body}`, or as its whole-value field.
#[doc(hidden)]
pub fn encode_aggregate<T: Aggregate>(value: &T, w: &mut Writer<'_>) -> EncodeResult<()> {
    let descriptor = w.registry().descriptor::<T>();
    let included = |f: &FieldMetadata| match value.field_is_empty(&f.path) {
        None => false,
        Some(empty) => !(f.omit_empty && empty),
    };

    let mut attributes = descriptor
        .attribute_fields()
        .iter()
        .filter(|f| included(*f))
        .peekable();
    if attributes.peek().is_some() {
        w.begin_attributes()?;
        for field in attributes {
            w.map_key(&field.wire_name)?;
            value.encode_field(&field.path, w)?;
        }
        w.end_attributes()?;
    }

    if let Some(field) = descriptor.whole_value_field() {
        return match value.field_is_empty(&field.path) {
            Some(_) => value.encode_field(&field.path, w),
            None => w.entity(),
        };
    }

    w.begin_map()?;
    for field in descriptor.body_fields().iter().filter(|f| included(*f)) {
        w.map_key(&field.wire_name)?;
        value.encode_field(&field.path, w)?;
    }
    w.end_map()
}

/// Assigns the fields of `value` present in the next encoded value.
///
/// Unknown keys are skipped. An entity literal leaves `value` untouched.
#[doc(hidden)]
pub fn decode_aggregate<T: Aggregate>(value: &mut T, r: &mut Reader<'_>) -> DecodeResult<()> {
    let descriptor = r.registry().descriptor::<T>();

    let mut event = r.next(true)?;
    if event == Event::BeginAttributes {
        while r.next_key()? {
            let key = r.bytes_cow()?;
            let field = std::str::from_utf8(&key)
                .ok()
                .and_then(|k| descriptor.attribute(k));
            match field {
                Some(field) => decode_field(value, field, r)?,
                None => skip_unknown::<T>(&key, r)?,
            }
        }
        event = r.next(true)?;
    }

    if let Some(field) = descriptor.whole_value_field() {
        r.undo();
        return decode_field(value, field, r);
    }

    match event {
        Event::Literal(LiteralType::Entity) => Ok(()),
        Event::BeginMap => {
            while r.next_key()? {
                let key = r.bytes_cow()?;
                let field = std::str::from_utf8(&key)
                    .ok()
                    .and_then(|k| descriptor.body(k));
                match field {
                    Some(field) => decode_field(value, field, r)?,
                    None => skip_unknown::<T>(&key, r)?,
                }
            }
            Ok(())
        }
        other => Err(r.unexpected("map", other)),
    }
}

fn decode_field<T: Aggregate>(
    value: &mut T,
    field: &FieldMetadata,
    r: &mut Reader<'_>,
) -> DecodeResult<()> {
    value
        .decode_field(&field.path, r)
        .map_err(|e| e.in_field(T::NAME, &field.wire_name))
}

fn skip_unknown<T: Aggregate>(key: &[u8], r: &mut Reader<'_>) -> DecodeResult<()> {
    tracing::trace!(
        type_name = T::NAME,
        key = %String::from_utf8_lossy(key),
        "skipping unknown field"
    );
    r.next_raw_value()?;
    Ok(())
}

/// Copies the next value from `r` to `w`, attributes included.
pub fn copy_value(r: &mut Reader<'_>, w: &mut Writer<'_>) -> Result<(), Error> {
    match r.next(false)? {
        Event::BeginAttributes => {
            w.begin_attributes()?;
            copy_entries(r, w)?;
            w.end_attributes()?;
            copy_value(r, w)
        }
        Event::BeginMap => {
            w.begin_map()?;
            copy_entries(r, w)?;
            w.end_map()?;
            Ok(())
        }
        Event::BeginList => {
            w.begin_list()?;
            while r.next_list_item()? {
                copy_value(r, w)?;
            }
            w.end_list()?;
            Ok(())
        }
        Event::Literal(literal) => {
            match literal {
                LiteralType::Entity => w.entity()?,
                LiteralType::Bool => w.boolean(r.boolean()?)?,
                LiteralType::Int64 => w.int64(r.int64()?)?,
                LiteralType::Uint64 => w.uint64(r.uint64()?)?,
                LiteralType::Double => w.double(r.double()?)?,
                LiteralType::String => w.string(r.bytes()?)?,
            }
            Ok(())
        }
        other => Err(r.unexpected("value", other).into()),
    }
}

/// Copies `key=value` entries up to and including the closing token of the
/// current map, attribute block or map fragment.
pub(crate) fn copy_entries(r: &mut Reader<'_>, w: &mut Writer<'_>) -> Result<(), Error> {
    while r.next_key()? {
        w.map_key(r.bytes()?)?;
        copy_value(r, w)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::copy_value;
    use crate::{Format, Reader, Writer};

    fn transcode(data: &[u8], format: Format) -> Vec<u8> {
        let mut r = Reader::new(data);
        let mut w = Writer::new(format);
        copy_value(&mut r, &mut w).unwrap();
        r.finish().unwrap();
        w.finish().unwrap();
        w.into_bytes()
    }

    #[test]
    fn test_text_binary_text() {
        let text = b"<x=%true;>{a=\"hello world\";b=[1;-2;3u;2.5;#;];c=%-inf;}";
        let binary = transcode(text, Format::Binary);
        assert_ne!(&binary[..], &text[..]);
        assert_eq!(transcode(&binary, Format::Text), text);
    }

    #[test]
    fn test_normalizes_whitespace() {
        assert_eq!(
            transcode(b" { a = 1 ; b = [ x ; y ] } ", Format::Text),
            b"{a=1;b=[x;y;];}"
        );
    }
}

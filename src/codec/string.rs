// Sat Jan 17 2026 - Alex

//! String slots: `i32 length` then `u32 data`.
//!
//! A non-negative length counts Latin-1 bytes. A negative length counts UTF-16LE code units, with
//! the data aligned to 2. Narrow storage is tried first and abandoned on the first code point
//! above 255.

use crate::buffer::{BufferView, ViewWriter};
use crate::codec::CodecError;
use crate::layout::{align_to, POINTER_WIDTH};

pub fn read_string(view: &BufferView, offset: usize) -> Result<String, CodecError> {
    let length = view.int32(offset)?;
    let data = view.uint32(offset + POINTER_WIDTH)? as usize;
    if length == 0 {
        return Ok(String::new());
    }
    if length > 0 {
        let bytes = view.slice(data, length as usize)?;
        return Ok(bytes.iter().map(|&b| b as char).collect());
    }

    let units = length.unsigned_abs() as usize;
    let span = units.checked_mul(2).ok_or(CodecError::MalformedLength {
        offset,
        detail: "string length",
    })?;
    let raw = view.slice(data, span)?;
    let wide = raw.chunks_exact(2).map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
    char::decode_utf16(wide)
        .collect::<Result<String, _>>()
        .map_err(|_| CodecError::InvalidUtf16 { offset: data })
}

/// Writes the header at `offset` and the characters at the heap cursor. Returns the new cursor.
pub fn write_string(value: &str, target: &mut ViewWriter, offset: usize, heap: usize) -> Result<usize, CodecError> {
    if value.is_empty() {
        target.set_int32(offset, 0)?;
        target.set_uint32(offset + POINTER_WIDTH, 0)?;
        return Ok(heap);
    }

    let narrow: Option<Vec<u8>> = value.chars().map(|c| u8::try_from(u32::from(c)).ok()).collect();
    let (length, data, end) = match narrow {
        Some(bytes) => {
            target.put_bytes(heap, &bytes)?;
            (bytes.len() as i64, heap, heap + bytes.len())
        }
        None => {
            let data = align_to(heap, 2);
            let mut cursor = data;
            for unit in value.encode_utf16() {
                target.set_uint16(cursor, unit)?;
                cursor += 2;
            }
            (-(((cursor - data) / 2) as i64), data, cursor)
        }
    };

    let length = i32::try_from(length).map_err(|_| CodecError::ValueOutOfRange {
        kind: "string length",
        value: length.to_string(),
    })?;
    target.set_int32(offset, length)?;
    target.set_uint32(offset + POINTER_WIDTH, data as u32)?;
    Ok(end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(text: &str, heap: usize) -> (BufferView, usize) {
        let mut target = ViewWriter::new();
        let end = write_string(text, &mut target, 0, heap).unwrap();
        (target.freeze(end), end)
    }

    #[test]
    fn test_narrow_string() {
        let (view, end) = round_trip("hello", 8);
        assert_eq!(view.int32(0).unwrap(), 5);
        assert_eq!(view.uint32(4).unwrap(), 8);
        assert_eq!(end, 13);
        assert_eq!(read_string(&view, 0).unwrap(), "hello");
    }

    #[test]
    fn test_latin1_stays_narrow() {
        let (view, _) = round_trip("café", 8);
        assert_eq!(view.int32(0).unwrap(), 4);
        assert_eq!(read_string(&view, 0).unwrap(), "café");
    }

    #[test]
    fn test_wide_string() {
        let (view, end) = round_trip("a\u{263A}b", 9);
        assert_eq!(view.int32(0).unwrap(), -3);
        assert_eq!(view.uint32(4).unwrap(), 10);
        assert_eq!(end, 16);
        assert_eq!(read_string(&view, 0).unwrap(), "a\u{263A}b");
    }

    #[test]
    fn test_surrogate_pairs() {
        let (view, _) = round_trip("x\u{1F600}", 8);
        assert_eq!(view.int32(0).unwrap(), -3);
        assert_eq!(read_string(&view, 0).unwrap(), "x\u{1F600}");
    }

    #[test]
    fn test_empty_string() {
        let (view, end) = round_trip("", 8);
        assert_eq!(end, 8);
        assert_eq!(view.int32(0).unwrap(), 0);
        assert_eq!(view.uint32(4).unwrap(), 0);
        assert_eq!(read_string(&view, 0).unwrap(), "");
    }

    #[test]
    fn test_truncated_data_fails() {
        let mut target = ViewWriter::new();
        target.set_int32(0, 40).unwrap();
        target.set_uint32(4, 8).unwrap();
        let view = target.freeze(12);
        assert!(matches!(read_string(&view, 0), Err(CodecError::Buffer(_))));
    }
}

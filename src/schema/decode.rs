use bytes::{
    Buf,
    Bytes,
};
use tracing::instrument;

use crate::{
    encoding::ByteOrder,
    errs::{
        CodecError,
        CodecError::{
            SizeMismatch,
            UnsupportedWidth,
        },
    },
    schema::types::{
        CType,
        TypeGraph,
    },
};

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    UInt(u64),
    Int(i64),
    /// NUL-terminated character data.
    Str(String),
    /// Raw byte arrays keep their bytes instead of becoming a list.
    Bytes(Bytes),
    List(Vec<Value>),
    /// Struct fields in declaration order.
    Struct(Vec<(String, Value)>),
}

impl Value {
    /// Look up a field of a struct value by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            | Value::Struct(fields) => fields
                .iter()
                .find(|(field, _)| field == name)
                .map(|(_, value)| value),
            | _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            | Value::UInt(v) => Some(*v),
            | _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            | Value::Str(v) => Some(v),
            | _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            | Value::Bytes(v) => Some(v),
            | _ => None,
        }
    }
}

/// Decode `src` against `ty`. The buffer must be exactly the packed size
/// of the type; there is no other validation, every byte pattern of the
/// right length decodes.
#[instrument(level = "trace", skip(graph, src))]
pub fn decode_value(
    graph: &TypeGraph,
    ty: &CType,
    src: Bytes,
    order: ByteOrder,
) -> Result<Value, CodecError> {
    let expected = graph.size_of(ty)?;
    if src.len() != expected {
        return Err(SizeMismatch {
            expected,
            actual: src.len(),
        });
    }

    decode_slice(graph, ty, &src, order)
}

/// Decode a field out of `src`, which is already sliced to the field's
/// exact packed size.
fn decode_slice(
    graph: &TypeGraph,
    ty: &CType,
    src: &[u8],
    order: ByteOrder,
) -> Result<Value, CodecError> {
    match ty {
        | CType::Int { width, signed } => decode_int(src, *width, *signed, order),
        | CType::Char { width } => decode_str(src, *width, order),
        | CType::Struct(name) => decode_struct(graph, name, src, order),
        | CType::Array { elem, len } => decode_array(graph, elem, *len, src, order),
    }
}

fn decode_int(src: &[u8], width: usize, signed: bool, order: ByteOrder) -> Result<Value, CodecError> {
    let mut src = src;
    if signed {
        let v = match (width, order) {
            | (1, _) => src.get_i8() as i64,
            | (2, ByteOrder::Little) => src.get_i16_le() as i64,
            | (2, ByteOrder::Big) => src.get_i16() as i64,
            | (4, ByteOrder::Little) => src.get_i32_le() as i64,
            | (4, ByteOrder::Big) => src.get_i32() as i64,
            | (8, ByteOrder::Little) => src.get_i64_le(),
            | (8, ByteOrder::Big) => src.get_i64(),
            | _ => return Err(UnsupportedWidth(width)),
        };
        return Ok(Value::Int(v));
    }

    let v = match (width, order) {
        | (1, _) => src.get_u8() as u64,
        | (2, ByteOrder::Little) => src.get_u16_le() as u64,
        | (2, ByteOrder::Big) => src.get_u16() as u64,
        | (4, ByteOrder::Little) => src.get_u32_le() as u64,
        | (4, ByteOrder::Big) => src.get_u32() as u64,
        | (8, ByteOrder::Little) => src.get_u64_le(),
        | (8, ByteOrder::Big) => src.get_u64(),
        | _ => return Err(UnsupportedWidth(width)),
    };

    Ok(Value::UInt(v))
}

/// Character data decodes up to the first NUL unit: utf-8 for 1-byte
/// units, utf-16 in the caller's byte order for 2-byte units.
fn decode_str(src: &[u8], width: usize, order: ByteOrder) -> Result<Value, CodecError> {
    match width {
        | 1 => {
            let end = src.iter().position(|&b| b == 0).unwrap_or(src.len());
            Ok(Value::Str(String::from_utf8_lossy(&src[..end]).into_owned()))
        },
        | 2 => {
            let mut units = Vec::with_capacity(src.len() / 2);
            for pair in src.chunks_exact(2) {
                let unit = match order {
                    | ByteOrder::Little => u16::from_le_bytes([pair[0], pair[1]]),
                    | ByteOrder::Big => u16::from_be_bytes([pair[0], pair[1]]),
                };
                if unit == 0 {
                    break;
                }
                units.push(unit);
            }

            Ok(Value::Str(String::from_utf16_lossy(&units)))
        },
        | _ => Err(UnsupportedWidth(width)),
    }
}

fn decode_array(
    graph: &TypeGraph,
    elem: &CType,
    len: usize,
    src: &[u8],
    order: ByteOrder,
) -> Result<Value, CodecError> {
    // byte arrays stay bytes, char arrays are strings
    if matches!(elem, CType::Int {
        width: 1,
        signed: false,
    }) {
        return Ok(Value::Bytes(Bytes::copy_from_slice(src)));
    }
    if let CType::Char { width } = elem {
        return decode_str(src, *width, order);
    }

    let elem_size = graph.size_of(elem)?;
    let mut items = Vec::with_capacity(len);
    for i in 0..len {
        let slice = &src[i * elem_size..(i + 1) * elem_size];
        items.push(decode_slice(graph, elem, slice, order)?);
    }

    Ok(Value::List(items))
}

fn decode_struct(
    graph: &TypeGraph,
    name: &str,
    src: &[u8],
    order: ByteOrder,
) -> Result<Value, CodecError> {
    let def = graph.struct_def(name)?;
    let mut fields = Vec::with_capacity(def.fields().len());
    let mut offset = 0;
    for field in def.fields() {
        let size = graph.size_of(field.ty())?;
        let value = decode_slice(graph, field.ty(), &src[offset..offset + size], order)?;
        offset += size;
        fields.push((field.name().clone(), value));
    }

    Ok(Value::Struct(fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parser::parse_header;

    #[test]
    fn test_int_widths_and_signs() {
        let graph = TypeGraph::default();

        let ty = CType::Int {
            width: 2,
            signed: false,
        };
        let src = Bytes::from_static(&[0x34, 0x12]);
        assert_eq!(
            decode_value(&graph, &ty, src.clone(), ByteOrder::Little).unwrap(),
            Value::UInt(0x1234)
        );
        assert_eq!(
            decode_value(&graph, &ty, src, ByteOrder::Big).unwrap(),
            Value::UInt(0x3412)
        );

        let ty = CType::Int {
            width: 4,
            signed: true,
        };
        let src = Bytes::from_static(&[0xff, 0xff, 0xff, 0xff]);
        assert_eq!(
            decode_value(&graph, &ty, src, ByteOrder::Little).unwrap(),
            Value::Int(-1)
        );
    }

    #[test]
    fn test_unsupported_width_is_an_error() {
        let graph = TypeGraph::default();
        let ty = CType::Int {
            width: 3,
            signed: false,
        };
        assert!(matches!(
            decode_value(&graph, &ty, Bytes::from_static(&[0, 0, 0]), ByteOrder::Little),
            Err(UnsupportedWidth(3))
        ));
    }

    #[test]
    fn test_size_mismatch_is_strict_both_ways() {
        let graph = TypeGraph::default();
        let ty = CType::Int {
            width: 4,
            signed: false,
        };

        for len in [0usize, 3, 5] {
            assert!(matches!(
                decode_value(&graph, &ty, Bytes::from(vec![0u8; len]), ByteOrder::Little),
                Err(SizeMismatch {
                    expected: 4,
                    actual,
                }) if actual == len
            ));
        }
    }

    #[test]
    fn test_byte_array_stays_bytes() {
        let graph = parse_header("struct blob_t { uint8_t data[4]; };").unwrap();
        let decoded = decode_value(
            &graph,
            &CType::Struct("blob_t".to_string()),
            Bytes::from_static(&[9, 8, 7, 6]),
            ByteOrder::Little,
        )
        .unwrap();

        assert_eq!(
            decoded.field("data").and_then(Value::as_bytes).unwrap().as_ref(),
            &[9, 8, 7, 6]
        );
    }

    #[test]
    fn test_char_array_stops_at_nul() {
        let graph = parse_header("struct tag_t { char8_t name[8]; };").unwrap();
        let decoded = decode_value(
            &graph,
            &CType::Struct("tag_t".to_string()),
            Bytes::from_static(b"abc\0zzzz"),
            ByteOrder::Little,
        )
        .unwrap();

        assert_eq!(decoded.field("name").and_then(Value::as_str), Some("abc"));
    }

    #[test]
    fn test_wide_char_array_respects_order() {
        let graph = parse_header("struct wide_t { char16_t name[4]; };").unwrap();
        let ty = CType::Struct("wide_t".to_string());

        let le = Bytes::from_static(&[0x68, 0x00, 0x69, 0x00, 0x00, 0x00, 0x00, 0x00]);
        let decoded = decode_value(&graph, &ty, le, ByteOrder::Little).unwrap();
        assert_eq!(decoded.field("name").and_then(Value::as_str), Some("hi"));

        let be = Bytes::from_static(&[0x00, 0x68, 0x00, 0x69, 0x00, 0x00, 0x00, 0x00]);
        let decoded = decode_value(&graph, &ty, be, ByteOrder::Big).unwrap();
        assert_eq!(decoded.field("name").and_then(Value::as_str), Some("hi"));
    }

    #[test]
    fn test_struct_array_decodes_elementwise() {
        let graph = parse_header(
            "struct pair_t { uint16_t lo; uint16_t hi; };\n\
             struct frame_t { struct pair_t pairs[2]; };",
        )
        .unwrap();

        let src = Bytes::from_static(&[1, 0, 2, 0, 3, 0, 4, 0]);
        let decoded = decode_value(
            &graph,
            &CType::Struct("frame_t".to_string()),
            src,
            ByteOrder::Little,
        )
        .unwrap();

        let Some(Value::List(pairs)) = decoded.field("pairs") else {
            panic!("expected a list of pairs");
        };
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1].field("lo").and_then(Value::as_u64), Some(3));
        assert_eq!(pairs[1].field("hi").and_then(Value::as_u64), Some(4));
    }

    #[test]
    fn test_struct_fields_keep_declaration_order() {
        let graph = parse_header("struct seq_t { uint8_t b; uint8_t a; uint8_t c; };").unwrap();
        let decoded = decode_value(
            &graph,
            &CType::Struct("seq_t".to_string()),
            Bytes::from_static(&[1, 2, 3]),
            ByteOrder::Little,
        )
        .unwrap();

        let Value::Struct(fields) = decoded else {
            panic!("expected a struct value");
        };
        let names: Vec<&str> = fields.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, ["b", "a", "c"]);
    }
}

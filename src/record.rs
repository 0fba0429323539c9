use bytes::{
    Buf,
    BufMut,
    Bytes,
    BytesMut,
};
use tracing::instrument;

use crate::{
    encoding::BinaryMarshaller,
    errs::{
        CodecError,
        CodecError::SizeMismatch,
    },
};

/// Side length of the byte matrix, and length of the flat byte array.
pub const GRID_DIM: usize = 5;

/// Packed size of an [`InnerRecord`]: the leading u16 plus the matrix.
pub const INNER_RECORD_SIZE: usize = size_of::<u16>() + GRID_DIM * GRID_DIM;

/// Packed size of a [`Record`]. Fields are laid out in declaration order
/// with no padding between them.
pub const RECORD_SIZE: usize = size_of::<u8>()
    + size_of::<u16>()
    + size_of::<u32>()
    + size_of::<u64>()
    + GRID_DIM
    + INNER_RECORD_SIZE;

/// The nested tail of a [`Record`]: a u16 followed by a 5x5 byte matrix
/// stored row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InnerRecord {
    pub field5: u16,
    pub mat: [[u8; GRID_DIM]; GRID_DIM],
}

impl InnerRecord {
    pub fn new(field5: u16, mat: [[u8; GRID_DIM]; GRID_DIM]) -> Self {
        InnerRecord { field5, mat }
    }

    /// Encode into the packed 27-byte form. All multi-byte integers are
    /// little endian.
    #[instrument(level = "trace")]
    #[inline]
    pub fn encode(self) -> Bytes {
        let mut buf = BytesMut::with_capacity(INNER_RECORD_SIZE);
        self.encode_into(&mut buf);
        buf.freeze()
    }

    pub(crate) fn encode_into(self, buf: &mut BytesMut) {
        buf.put_u16_le(self.field5);
        for row in &self.mat {
            buf.put_slice(row);
        }
    }

    /// Decode from the packed 27-byte form. Any 27-byte pattern is a valid
    /// record; every other length is a [`SizeMismatch`].
    #[instrument(level = "trace")]
    #[inline]
    pub fn decode(src: Bytes) -> Result<Self, CodecError> {
        if src.len() != INNER_RECORD_SIZE {
            return Err(SizeMismatch {
                expected: INNER_RECORD_SIZE,
                actual: src.len(),
            });
        }

        let mut src = src;
        Ok(Self::decode_fields(&mut src))
    }

    pub(crate) fn decode_fields(src: &mut Bytes) -> Self {
        let field5 = src.get_u16_le();
        let mut mat = [[0u8; GRID_DIM]; GRID_DIM];
        for row in mat.iter_mut() {
            src.copy_to_slice(row);
        }

        InnerRecord { field5, mat }
    }
}

impl BinaryMarshaller for InnerRecord {
    fn encode(self) -> Bytes {
        InnerRecord::encode(self)
    }

    fn decode(src: Bytes) -> Result<Self, CodecError> {
        InnerRecord::decode(src)
    }

    fn encoded_size(&self) -> usize {
        INNER_RECORD_SIZE
    }
}

/// A fixed-layout record. The packed form is 47 bytes: each field starts
/// immediately after the previous one ends, in declaration order.
///
/// Values are plain data constructed by the caller; the codec keeps no
/// state between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Record {
    pub field1: u8,
    pub field2: u16,
    pub field3: u32,
    pub field4: u64,
    pub arr: [u8; GRID_DIM],
    pub field6: InnerRecord,
}

impl Record {
    /// Encode into the packed 47-byte form. Deterministic and infallible:
    /// a well-typed record always has exactly one wire image.
    #[instrument(level = "trace")]
    #[inline]
    pub fn encode(self) -> Bytes {
        let mut buf = BytesMut::with_capacity(RECORD_SIZE);
        buf.put_u8(self.field1);
        buf.put_u16_le(self.field2);
        buf.put_u32_le(self.field3);
        buf.put_u64_le(self.field4);
        buf.put_slice(&self.arr);
        self.field6.encode_into(&mut buf);

        buf.freeze()
    }

    /// Decode from the packed 47-byte form. Every 47-byte pattern maps to a
    /// valid record, so length is the only thing that can be wrong.
    #[instrument(level = "trace")]
    #[inline]
    pub fn decode(src: Bytes) -> Result<Self, CodecError> {
        if src.len() != RECORD_SIZE {
            return Err(SizeMismatch {
                expected: RECORD_SIZE,
                actual: src.len(),
            });
        }

        let mut src = src;
        let field1 = src.get_u8();
        let field2 = src.get_u16_le();
        let field3 = src.get_u32_le();
        let field4 = src.get_u64_le();

        let mut arr = [0u8; GRID_DIM];
        src.copy_to_slice(&mut arr);

        let field6 = InnerRecord::decode_fields(&mut src);

        Ok(Record {
            field1,
            field2,
            field3,
            field4,
            arr,
            field6,
        })
    }
}

impl BinaryMarshaller for Record {
    fn encode(self) -> Bytes {
        Record::encode(self)
    }

    fn decode(src: Bytes) -> Result<Self, CodecError> {
        Record::decode(src)
    }

    fn encoded_size(&self) -> usize {
        RECORD_SIZE
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use proptest::{
        collection::vec,
        prelude::any,
        prop_assert_eq,
        proptest,
    };

    use super::*;

    fn sample() -> Record {
        Record {
            field1: 1,
            field2: 2,
            field3: 3,
            field4: 4,
            arr: [0; GRID_DIM],
            field6: InnerRecord::new(5, [[0; GRID_DIM]; GRID_DIM]),
        }
    }

    #[test]
    fn test_packed_sizes() {
        assert_eq!(INNER_RECORD_SIZE, 27);
        assert_eq!(RECORD_SIZE, 47);
        assert_eq!(sample().encode().len(), RECORD_SIZE);
        assert_eq!(sample().field6.encode().len(), INNER_RECORD_SIZE);
    }

    #[test]
    fn test_known_wire_image() {
        let encoded = sample().encode();

        let mut expected = vec![
            0x01, // field1
            0x02, 0x00, // field2
            0x03, 0x00, 0x00, 0x00, // field3
            0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // field4
            0x00, 0x00, 0x00, 0x00, 0x00, // arr
            0x05, 0x00, // field6.field5
        ];
        expected.extend_from_slice(&[0u8; GRID_DIM * GRID_DIM]); // field6.mat

        assert_eq!(encoded.as_ref(), expected.as_slice());
    }

    #[test]
    fn test_matrix_is_row_major() {
        let mut record = sample();
        record.field6.mat[0][1] = 0xaa;
        record.field6.mat[1][0] = 0xbb;

        let encoded = record.encode();
        // the matrix starts at offset 22, rows are laid out back to back
        assert_eq!(encoded[22 + 1], 0xaa);
        assert_eq!(encoded[22 + GRID_DIM], 0xbb);
    }

    #[test]
    fn test_decode_rejects_wrong_lengths() {
        for len in [0, RECORD_SIZE - 1, RECORD_SIZE + 1] {
            let res = Record::decode(Bytes::from(vec![0u8; len]));
            assert!(matches!(
                res,
                Err(SizeMismatch {
                    expected: RECORD_SIZE,
                    actual,
                }) if actual == len
            ));
        }
    }

    #[test]
    fn test_inner_decode_rejects_wrong_lengths() {
        for len in [0, INNER_RECORD_SIZE - 1, INNER_RECORD_SIZE + 1] {
            let res = InnerRecord::decode(Bytes::from(vec![0u8; len]));
            assert!(matches!(
                res,
                Err(SizeMismatch {
                    expected: INNER_RECORD_SIZE,
                    actual,
                }) if actual == len
            ));
        }
    }

    #[test]
    fn test_marshaller_round_trip() {
        let record = sample();
        let encoded = BinaryMarshaller::encode(record);
        assert_eq!(encoded.len(), record.encoded_size());

        let decoded = <Record as BinaryMarshaller>::decode(encoded).unwrap();
        assert_eq!(decoded, record);
    }

    proptest! {
        #[test]
        fn test_any_record_round_trips(
            field1 in any::<u8>(),
            field2 in any::<u16>(),
            field3 in any::<u32>(),
            field4 in any::<u64>(),
            arr in any::<[u8; GRID_DIM]>(),
            field5 in any::<u16>(),
            mat in any::<[[u8; GRID_DIM]; GRID_DIM]>(),
        ) {
            let record = Record {
                field1,
                field2,
                field3,
                field4,
                arr,
                field6: InnerRecord::new(field5, mat),
            };

            let encoded = record.encode();
            prop_assert_eq!(encoded.len(), RECORD_SIZE);

            let decoded = Record::decode(encoded).unwrap();
            prop_assert_eq!(decoded, record);
        }

        #[test]
        fn test_any_buffer_round_trips(raw in vec(any::<u8>(), RECORD_SIZE)) {
            let decoded = Record::decode(Bytes::from(raw.clone())).unwrap();
            let reencoded = decoded.encode();
            prop_assert_eq!(reencoded.as_ref(), raw.as_slice());
        }
    }
}

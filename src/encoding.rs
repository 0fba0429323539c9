use bytes::Bytes;

use crate::errs::CodecError;

/// A shared trait for encoding and decoding fixed-layout records in and out
/// of their packed byte form.
pub trait BinaryMarshaller {
    /// Encode the record into its packed byte form.
    fn encode(self) -> Bytes;
    /// Decode a packed byte buffer into the target type. The buffer must be
    /// exactly the encoded size of the type.
    fn decode(src: Bytes) -> Result<Self, CodecError>
    where
        Self: Sized;
    /// The size of the encoded record in bytes.
    fn encoded_size(&self) -> usize;
}

/// Byte order for multi-byte integers in a raw buffer.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    #[default]
    Little = 1,
    Big    = 2,
}

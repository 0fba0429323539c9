/// The shared encode/decode seam and byte-order vocabulary.
pub mod encoding;

/// Error types for the codec and the schema layer.
pub mod errs;

/// The fixed-layout record types and their packed little-endian codec.
pub mod record;

/// Packed C-struct schemas: header parsing, sizing, graph-driven decoding,
/// and Rust type generation.
pub mod schema;

pub use encoding::{
    BinaryMarshaller,
    ByteOrder,
};
pub use record::{
    InnerRecord,
    Record,
    INNER_RECORD_SIZE,
    RECORD_SIZE,
};

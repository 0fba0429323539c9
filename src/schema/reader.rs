use std::io::Read;

use bytes::Bytes;

use crate::{
    encoding::ByteOrder,
    errs::CodecError,
    schema::{
        decode::{
            decode_value,
            Value,
        },
        types::{
            CType,
            TypeGraph,
        },
    },
};

/// Decodes packed structs by name, from in-memory buffers or straight off
/// any [`Read`] source.
pub struct StructReader<'g> {
    graph: &'g TypeGraph,
    order: ByteOrder,
    last: Option<Bytes>,
}

impl<'g> StructReader<'g> {
    pub fn new(graph: &'g TypeGraph) -> Self {
        Self::with_order(graph, ByteOrder::default())
    }

    pub fn with_order(graph: &'g TypeGraph, order: ByteOrder) -> Self {
        StructReader {
            graph,
            order,
            last: None,
        }
    }

    /// Packed size of the named struct.
    pub fn size(&self, name: &str) -> Result<usize, CodecError> {
        self.graph.struct_size(name)
    }

    /// Decode one struct out of `src`, which must be exactly
    /// [`size`](Self::size) bytes.
    pub fn decode(&self, name: &str, src: Bytes) -> Result<Value, CodecError> {
        decode_value(
            self.graph,
            &CType::Struct(name.to_string()),
            src,
            self.order,
        )
    }

    /// Read exactly one packed struct from `reader` and decode it.
    pub fn read<R: Read>(&mut self, name: &str, reader: &mut R) -> Result<Value, CodecError> {
        let size = self.size(name)?;
        let mut buf = vec![0u8; size];
        match reader.read_exact(&mut buf) {
            | Ok(_) => {},
            | Err(e) => return Err(CodecError::IoError(e)),
        }

        let raw = Bytes::from(buf);
        self.last = Some(raw.clone());
        self.decode(name, raw)
    }

    /// Raw bytes pulled by the most recent [`read`](Self::read).
    pub fn last_buffer(&self) -> Option<&Bytes> {
        self.last.as_ref()
    }
}

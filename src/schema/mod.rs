// Copyright (c) Packrec Contributors
// SPDX-License-Identifier: GPL-3.0-only WITH Classpath-exception-2.0

//! Packed C-struct schema support: parse a header into a [`TypeGraph`],
//! compute packed sizes from it, decode raw buffers against it, and
//! generate Rust types for it.
//!
//! The graph is data, not state: parsing and decoding are pure transforms
//! and a graph can be shared freely between threads.

pub mod codegen;
pub mod decode;
pub mod parser;
pub mod reader;
pub mod types;


pub use codegen::generate_types;
pub use decode::{
    decode_value,
    Value,
};
pub use parser::{
    parse_header,
    parse_header_file,
};
pub use reader::StructReader;
pub use types::{
    CType,
    Field,
    StructDef,
    TypeGraph,
};

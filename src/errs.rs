// Copyright (c) Packrec Contributors
// SPDX-License-Identifier: GPL-3.0-only WITH Classpath-exception-2.0

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("os i/o error")]
    IoError(io::Error),
    #[error("buffer is {actual} bytes, layout needs exactly {expected}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("unknown struct {0:?}")]
    UnknownStruct(String),
    #[error("no codec for a {0}-byte wide scalar")]
    UnsupportedWidth(usize),
}

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("os i/o error")]
    IoError(io::Error),
    #[error("unknown type {0:?}")]
    UnknownType(String),
    #[error("unknown struct {0:?}")]
    UnknownStruct(String),
    #[error("redefinition of struct {0:?}")]
    StructRedefinition(String),
}

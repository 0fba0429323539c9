// Copyright (c) Packrec Contributors
// SPDX-License-Identifier: GPL-3.0-only WITH Classpath-exception-2.0

use getset::Getters;

use crate::errs::CodecError;

/// A single type in a packed layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CType {
    /// Fixed-width integer, `width` bytes.
    Int { width: usize, signed: bool },
    /// Fixed-width character unit, `width` bytes (1 for utf-8, 2 for
    /// utf-16).
    Char { width: usize },
    /// Reference to a named struct definition.
    Struct(String),
    /// Fixed-length array.
    Array { elem: Box<CType>, len: usize },
}

/// A named field (or global declaration) and its type.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct Field {
    name: String,
    ty: CType,
}

impl Field {
    pub(crate) fn new(name: String, ty: CType) -> Self {
        Field { name, ty }
    }
}

/// A struct definition: its fields in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct StructDef {
    name: String,
    fields: Vec<Field>,
}

impl StructDef {
    pub(crate) fn new(name: String, fields: Vec<Field>) -> Self {
        StructDef { name, fields }
    }
}

/// Everything a packed header declares: struct definitions (innermost
/// first, in the order their bodies close in the source) and top-level
/// variable declarations.
#[derive(Debug, Clone, Default, Getters)]
#[getset(get = "pub")]
pub struct TypeGraph {
    structs: Vec<StructDef>,
    globals: Vec<Field>,
}

impl TypeGraph {
    pub(crate) fn new(structs: Vec<StructDef>, globals: Vec<Field>) -> Self {
        TypeGraph { structs, globals }
    }

    /// Look up a struct definition by name.
    pub fn struct_def(&self, name: &str) -> Result<&StructDef, CodecError> {
        self.structs
            .iter()
            .find(|def| def.name == name)
            .ok_or_else(|| CodecError::UnknownStruct(name.to_string()))
    }

    /// Packed size of a named struct in bytes.
    pub fn struct_size(&self, name: &str) -> Result<usize, CodecError> {
        let def = self.struct_def(name)?;
        let mut acc = 0;
        for field in &def.fields {
            acc += self.size_of(&field.ty)?;
        }

        Ok(acc)
    }

    /// Packed size of `ty` in bytes. Fields are laid out in declaration
    /// order with no alignment gaps, so a struct is exactly the sum of its
    /// field sizes.
    pub fn size_of(&self, ty: &CType) -> Result<usize, CodecError> {
        match ty {
            | CType::Int { width, .. } => Ok(*width),
            | CType::Char { width } => Ok(*width),
            | CType::Struct(name) => self.struct_size(name),
            | CType::Array { elem, len } => Ok(self.size_of(elem)? * len),
        }
    }
}

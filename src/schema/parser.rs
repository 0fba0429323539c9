// Copyright (c) Packrec Contributors
// SPDX-License-Identifier: GPL-3.0-only WITH Classpath-exception-2.0

use std::{
    collections::HashMap,
    fs,
    path::Path,
};

use tracing::{
    debug,
    instrument,
};

use crate::{
    errs::SchemaError,
    schema::types::{
        CType,
        Field,
        StructDef,
        TypeGraph,
    },
};

/// Parse a packed C header into a [`TypeGraph`].
///
/// The subset understood here is what packed record headers are made of:
/// `#define` constants, `typedef` aliases, (nested) `struct` definitions,
/// `uintN_t`/`intN_t`/`charN_t` fields, fixed-length arrays, and top-level
/// variable declarations. Other preprocessor directives are skipped.
#[instrument(skip(src))]
pub fn parse_header(src: &str) -> Result<TypeGraph, SchemaError> {
    Parser::default().parse(src)
}

/// Read a header from disk and parse it with [`parse_header`].
pub fn parse_header_file<P: AsRef<Path>>(path: P) -> Result<TypeGraph, SchemaError> {
    let src = match fs::read_to_string(path) {
        | Ok(src) => src,
        | Err(e) => return Err(SchemaError::IoError(e)),
    };

    parse_header(&src)
}

#[derive(Default)]
struct Parser {
    /// `#define` substitutions, in the order they appear.
    defines: Vec<(String, String)>,
    /// `typedef` aliases, alias -> underlying spelling.
    typedefs: HashMap<String, String>,
    /// Struct bodies keyed by name, innermost first.
    struct_bodies: Vec<(String, String)>,
}

impl Parser {
    fn parse(mut self, src: &str) -> Result<TypeGraph, SchemaError> {
        let src = self.preprocess(src);
        let src = self.reduce_structs(&src)?;
        let globals = self.parse_statements(&src)?;

        let bodies = self.struct_bodies.clone();
        let mut structs = Vec::with_capacity(bodies.len());
        for (name, body) in &bodies {
            let fields = self.parse_statements(body)?;
            structs.push(StructDef::new(name.clone(), fields));
        }

        Ok(TypeGraph::new(structs, globals))
    }

    /// Strip comments, consume directives, and apply `#define`
    /// substitutions. Substitution runs twice so a define referencing
    /// another define resolves.
    fn preprocess(&mut self, data: &str) -> String {
        let mut lines = Vec::new();
        for line in data.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                self.directive(line);
                continue;
            }

            let line = strip_comments(line);
            let line = line.trim();
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }

        lines
            .iter()
            .map(|line| self.apply_defines(line))
            .map(|line| self.apply_defines(&line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn directive(&mut self, line: &str) {
        if let Some(rest) = line.strip_prefix("#define ") {
            let rest = strip_comments(rest);
            let rest = rest.trim();
            match rest.split_once(char::is_whitespace) {
                | Some((key, val)) => {
                    self.defines.push((key.to_string(), val.trim().to_string()));
                },
                | None => debug!(directive = line, "skipping valueless define"),
            }
            return;
        }

        // includes would pull in headers we cannot see
        debug!(directive = line, "skipping preprocessor directive");
    }

    fn apply_defines(&self, line: &str) -> String {
        let mut line = line.to_string();
        for (key, val) in &self.defines {
            line = line.replace(key.as_str(), val.as_str());
        }

        line
    }

    /// Remove every `struct name { ... }` body from `data`, innermost
    /// first, registering each body by name. What remains of the
    /// definition is the plain `struct name` type spelling.
    fn reduce_structs(&mut self, data: &str) -> Result<String, SchemaError> {
        let Some((start, name, brace)) = find_struct_open(data) else {
            return Ok(data.to_string());
        };

        let body_start = brace + 1;
        let body_end = find_closing_brace(data, body_start);
        let body = self.reduce_structs(&data[body_start..body_end])?;

        if self.struct_bodies.iter().any(|(n, _)| n == &name) {
            return Err(SchemaError::StructRedefinition(name));
        }
        self.struct_bodies.push((name.clone(), body));

        let rest = match data.get(body_end + 1..) {
            | Some(rest) if !rest.is_empty() => self.reduce_structs(rest)?,
            | _ => String::new(),
        };

        Ok(format!("{}struct {}{}", &data[..start], name, rest))
    }

    /// Split on `;` and parse each statement as a typedef or a field
    /// declaration.
    fn parse_statements(&mut self, data: &str) -> Result<Vec<Field>, SchemaError> {
        let mut fields = Vec::new();
        for stmt in data.split(';') {
            let stmt = stmt.trim();
            if stmt.is_empty() || self.parse_typedef(stmt) {
                continue;
            }
            if let Some(field) = self.parse_field(stmt)? {
                fields.push(field);
            }
        }

        Ok(fields)
    }

    fn parse_typedef(&mut self, stmt: &str) -> bool {
        let stmt = fold_struct_keyword(stmt);
        let Some(rest) = stmt.strip_prefix("typedef ") else {
            return false;
        };

        let mut tokens = rest.split_whitespace();
        let (Some(val), Some(key)) = (tokens.next(), tokens.next()) else {
            return false;
        };
        self.typedefs.insert(key.to_string(), val.to_string());

        true
    }

    /// Parse `TYPE name` or `TYPE name[N]...`. A statement without both a
    /// type and a name (the bare `struct name` left behind by
    /// [`reduce_structs`](Self::reduce_structs)) declares nothing.
    fn parse_field(&self, stmt: &str) -> Result<Option<Field>, SchemaError> {
        let stmt = fold_struct_keyword(stmt);
        let Some((ftype, name)) = stmt.rsplit_once(char::is_whitespace) else {
            return Ok(None);
        };

        let ftype = ftype.trim();
        if ftype.is_empty() {
            return Ok(None);
        }

        let mut name = name.to_string();
        let ty = self.parse_type(&mut name, ftype)?;

        Ok(Some(Field::new(name, ty)))
    }

    fn parse_type(&self, name: &mut String, ftype: &str) -> Result<CType, SchemaError> {
        let mut ftype = ftype.to_string();
        // one alias may point at another alias, so resolve twice
        for _ in 0..2 {
            if let Some(resolved) = self.typedefs.get(&ftype) {
                ftype = resolved.clone();
            }
        }

        // array dimensions live on the declarator; collect them off the
        // name, rightmost (innermost) first
        let mut dims = Vec::new();
        while name.ends_with(']') {
            let Some(open) = name.rfind('[') else { break };
            let Ok(len) = name[open + 1..name.len() - 1].parse::<usize>() else {
                break;
            };
            dims.push(len);
            name.truncate(open);
        }

        let mut ty = self.parse_scalar(&ftype)?;
        for len in dims {
            ty = CType::Array {
                elem: Box::new(ty),
                len,
            };
        }

        Ok(ty)
    }

    fn parse_scalar(&self, ftype: &str) -> Result<CType, SchemaError> {
        if let Some(name) = ftype.strip_prefix("struct$") {
            if self.struct_bodies.iter().all(|(n, _)| n != name) {
                return Err(SchemaError::UnknownStruct(name.to_string()));
            }
            return Ok(CType::Struct(name.to_string()));
        }

        if let Some(ty) = parse_int_type(ftype) {
            return Ok(ty);
        }
        if let Some(ty) = parse_char_type(ftype) {
            return Ok(ty);
        }

        Err(SchemaError::UnknownType(ftype.to_string()))
    }
}

/// `uintN_t` / `intN_t` with N a whole number of bytes.
fn parse_int_type(ftype: &str) -> Option<CType> {
    let (signed, rest) = match ftype.strip_prefix("uint") {
        | Some(rest) => (false, rest),
        | None => (true, ftype.strip_prefix("int")?),
    };

    let bits: usize = rest.strip_suffix("_t")?.parse().ok()?;
    if bits == 0 || bits % 8 != 0 {
        return None;
    }

    Some(CType::Int {
        width: bits / 8,
        signed,
    })
}

/// `charN_t` with N a whole number of bytes.
fn parse_char_type(ftype: &str) -> Option<CType> {
    let bits: usize = ftype.strip_prefix("char")?.strip_suffix("_t")?.parse().ok()?;
    if bits == 0 || bits % 8 != 0 {
        return None;
    }

    Some(CType::Char { width: bits / 8 })
}

/// Collapse the two-token `struct name` spelling into one `struct$name`
/// token so field statements stay a simple `TYPE name` pair.
fn fold_struct_keyword(stmt: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut tokens = stmt.split_whitespace();
    while let Some(token) = tokens.next() {
        if token == "struct" {
            match tokens.next() {
                | Some(name) => out.push(format!("struct${name}")),
                | None => out.push(token.to_string()),
            }
        } else {
            out.push(token.to_string());
        }
    }

    out.join(" ")
}

/// Drop `//` tails and single-line `/* */` spans.
fn strip_comments(line: &str) -> String {
    let line = match line.find("//") {
        | Some(idx) => &line[..idx],
        | None => line,
    };

    let mut out = line.to_string();
    while let Some(start) = out.find("/*") {
        match out[start + 2..].find("*/") {
            | Some(end) => out.replace_range(start..start + end + 4, ""),
            | None => {
                out.truncate(start);
                break;
            },
        }
    }

    out
}

fn is_ident_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Find the next `struct NAME {`, returning the keyword offset, the name,
/// and the offset of the opening brace.
fn find_struct_open(data: &str) -> Option<(usize, String, usize)> {
    let bytes = data.as_bytes();
    let mut search = 0;
    while let Some(rel) = data[search..].find("struct") {
        let start = search + rel;
        search = start + 6;

        // token boundary on both sides of the keyword
        if start > 0 && is_ident_byte(bytes[start - 1]) {
            continue;
        }
        let mut cur = start + 6;
        if cur >= bytes.len() || !bytes[cur].is_ascii_whitespace() {
            continue;
        }
        while cur < bytes.len() && bytes[cur].is_ascii_whitespace() {
            cur += 1;
        }

        let name_start = cur;
        while cur < bytes.len() && is_ident_byte(bytes[cur]) {
            cur += 1;
        }
        if cur == name_start {
            continue;
        }
        let name = data[name_start..cur].to_string();

        let mut brace = cur;
        while brace < bytes.len() && bytes[brace].is_ascii_whitespace() {
            brace += 1;
        }
        if brace < bytes.len() && bytes[brace] == b'{' {
            return Some((start, name, brace));
        }
    }

    None
}

/// Offset of the brace closing the body that starts at `start`, or the end
/// of `data` if the body never closes.
fn find_closing_brace(data: &str, start: usize) -> usize {
    let bytes = data.as_bytes();
    let mut depth = 0u32;
    for (i, byte) in bytes.iter().enumerate().skip(start) {
        match byte {
            | b'{' => depth += 1,
            | b'}' => {
                if depth == 0 {
                    return i;
                }
                depth -= 1;
            },
            | _ => {},
        }
    }

    bytes.len()
}

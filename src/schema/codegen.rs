use std::fmt::Write;

use crate::schema::types::{
    CType,
    TypeGraph,
};

/// Emit Rust type definitions for every struct in the graph, in the
/// graph's definition order. Char arrays come out as `String` to match
/// what [`decode`](crate::schema::decode) produces for them.
pub fn generate_types(graph: &TypeGraph) -> String {
    let mut out = String::new();
    for def in graph.structs() {
        let _ = writeln!(out, "#[derive(Debug, Clone, PartialEq)]");
        let _ = writeln!(out, "pub struct {} {{", def.name());
        for field in def.fields() {
            let _ = writeln!(out, "    pub {}: {},", field.name(), rust_type(field.ty()));
        }
        let _ = writeln!(out, "}}\n");
    }

    out
}

fn rust_type(ty: &CType) -> String {
    match ty {
        | CType::Int { width, signed } => {
            format!("{}{}", if *signed { "i" } else { "u" }, width * 8)
        },
        | CType::Char { .. } => "String".to_string(),
        | CType::Struct(name) => name.clone(),
        | CType::Array { elem, len } => {
            if matches!(elem.as_ref(), CType::Char { .. }) {
                "String".to_string()
            } else {
                format!("[{}; {}]", rust_type(elem), len)
            }
        },
    }
}

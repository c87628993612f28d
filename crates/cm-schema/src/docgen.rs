//! Documentation generation from schema introspection.
//!
//! Renders a schema's fields, in declaration order, as a reST-style
//! "Configuration options:" section. Each field becomes a `:param:` entry
//! carrying its type tag (when the field kind has one) and its doc text.

use crate::schema::Schema;

const FIELD_INDENT: &str = "    ";

/// Render documentation for a schema, prefixed by a free-form summary.
pub fn generate_doc(schema: &Schema, summary: &str) -> String {
    let mut doc: Vec<String> = summary.lines().map(str::to_string).collect();
    if doc.last().is_some_and(|line| !line.trim().is_empty()) {
        doc.push(String::new());
    }
    doc.push("Configuration options:".to_string());
    for field in schema.fields() {
        doc.push(String::new());
        doc.push(param_header(field.kind().tag(), field.name()));
        doc.push(String::new());
        for line in field.doc().lines() {
            doc.push(format!("{FIELD_INDENT}{line}"));
        }
    }
    doc.join("\n")
}

fn param_header(tag: Option<&str>, name: &str) -> String {
    match tag {
        Some(tag) => format!(":param {tag} {name}:"),
        None => format!(":param {name}:"),
    }
}

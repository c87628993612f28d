//! Fallback rules deriving a field's value from other fields.
//!
//! A fallback references other fields by name, resolved lazily against the
//! schema, so a chain can be declared before the referenced field exists.
//! Two variants are provided: a pass-through of exactly one other field's
//! cleaned value, and a format-string combining several fields' cleaned
//! values through a template with named placeholders.

use cm_common::{ConfigData, ConfigError, Result};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::field::{Field, FieldValue, ResolveGuard};
use crate::schema::Schema;

/// A rule for synthesizing a field's value from other fields.
#[derive(Debug, Clone)]
pub struct Fallback {
    kind: FallbackKind,
}

#[derive(Debug, Clone)]
enum FallbackKind {
    Single(String),
    Format {
        template: String,
        required: Vec<String>,
        optional: Vec<String>,
    },
}

impl Fallback {
    /// Pass-through of one other field's cleaned value.
    pub fn single(field_name: impl Into<String>) -> Self {
        Fallback {
            kind: FallbackKind::Single(field_name.into()),
        }
    }

    /// Pass-through built from a dynamic name list; anything but exactly one
    /// name is a construction error.
    pub fn pass_through<I, S>(field_names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = field_names.into_iter().map(Into::into).collect();
        if names.len() != 1 {
            return Err(ConfigError::new(format!(
                "Pass-through fallback expects exactly one field name, got {}",
                names.len()
            )));
        }
        Ok(Fallback {
            kind: FallbackKind::Single(names.remove(0)),
        })
    }

    /// Format-string fallback. The template uses named placeholders matching
    /// field names (`{name}` or `{name:spec}`); `{{` and `}}` escape literal
    /// braces. Required fields govern presence; optional fields are
    /// substituted from their own defaults when absent.
    pub fn format<I, J, S, T>(template: impl Into<String>, required: I, optional: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Fallback {
            kind: FallbackKind::Format {
                template: template.into(),
                required: required.into_iter().map(Into::into).collect(),
                optional: optional.into_iter().map(Into::into).collect(),
            },
        }
    }

    /// Every field name this fallback references (required then optional).
    pub fn referenced_fields(&self) -> impl Iterator<Item = &str> {
        let (required, optional): (&[String], &[String]) = match &self.kind {
            FallbackKind::Single(name) => (std::slice::from_ref(name), &[]),
            FallbackKind::Format {
                required, optional, ..
            } => (required, optional),
        };
        required.iter().chain(optional.iter()).map(String::as_str)
    }

    fn required_fields(&self) -> &[String] {
        match &self.kind {
            FallbackKind::Single(name) => std::slice::from_ref(name),
            FallbackKind::Format { required, .. } => required,
        }
    }

    /// Whether a value can be synthesized: every required field must itself
    /// be present, through its own fallback chain if needed. A name missing
    /// from the schema is an immediate error, never a silent miss.
    pub(crate) fn present_in(
        &self,
        schema: &Schema,
        data: &dyn ConfigData,
        guard: &mut ResolveGuard,
    ) -> Result<bool> {
        for name in self.required_fields() {
            let field = resolve(schema, name)?;
            if !field.present_in(schema, data, true, guard)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Synthesize the value. Callers check `present_in` first.
    pub(crate) fn build_value_in(
        &self,
        schema: &Schema,
        data: &dyn ConfigData,
        guard: &mut ResolveGuard,
    ) -> Result<Value> {
        match &self.kind {
            FallbackKind::Single(name) => {
                let field = resolve(schema, name)?;
                let value = field.get_value_in(schema, data, guard)?;
                Ok(value.map(FieldValue::into_value).unwrap_or(Value::Null))
            }
            FallbackKind::Format {
                template,
                required,
                optional,
            } => {
                let mut values = HashMap::new();
                for name in required.iter().chain(optional.iter()) {
                    let field = resolve(schema, name)?;
                    match field.get_value_in(schema, data, guard)? {
                        Some(value) => {
                            values.insert(name.clone(), value);
                        }
                        None => {
                            return Err(ConfigError::field(
                                name,
                                "has no value available for format substitution.",
                            ));
                        }
                    }
                }
                tracing::trace!(template = %template, "building format fallback value");
                render_template(template, &values).map(Value::String)
            }
        }
    }
}

fn resolve<'a>(schema: &'a Schema, name: &str) -> Result<&'a Field> {
    schema
        .field(name)
        .ok_or_else(|| ConfigError::undefined_fallback(name))
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)(?::([^{}]*))?\}")
            .expect("placeholder pattern is valid")
    })
}

/// Substitute named placeholders into the template.
fn render_template(template: &str, values: &HashMap<String, FieldValue>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in placeholder_re().captures_iter(template) {
        let Some(matched) = caps.get(0) else { continue };
        out.push_str(&template[last..matched.start()]);
        last = matched.end();
        match matched.as_str() {
            "{{" => out.push('{'),
            "}}" => out.push('}'),
            _ => {
                let name = caps.get(1).map(|g| g.as_str()).unwrap_or_default();
                let spec = caps.get(2).map(|g| g.as_str()).unwrap_or_default();
                let value = values.get(name).ok_or_else(|| {
                    ConfigError::new(format!(
                        "Format fallback placeholder '{name}' does not name a declared field"
                    ))
                })?;
                out.push_str(&apply_directive(name, value, spec)?);
            }
        }
    }
    out.push_str(&template[last..]);
    Ok(out)
}

/// Apply a per-placeholder format directive. Supported: plain display,
/// integer width with optional zero-padding (`5d`, `02d`), and fixed float
/// precision (`.2f`).
fn apply_directive(name: &str, value: &FieldValue, spec: &str) -> Result<String> {
    if spec.is_empty() {
        return Ok(display_value(value));
    }
    if let Some(body) = spec.strip_suffix('d') {
        if body.chars().all(|c| c.is_ascii_digit()) {
            let zero_pad = body.starts_with('0');
            let width: usize = if body.is_empty() {
                0
            } else {
                body.parse()
                    .map_err(|_| bad_directive(spec))?
            };
            let n = value
                .as_int()
                .ok_or_else(|| ConfigError::field(name, "could not be formatted as an integer."))?;
            return Ok(if zero_pad {
                format!("{n:0width$}")
            } else {
                format!("{n:width$}")
            });
        }
    }
    if let Some(digits) = spec.strip_prefix('.').and_then(|s| s.strip_suffix('f')) {
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            let precision: usize = digits.parse().map_err(|_| bad_directive(spec))?;
            let f = value
                .as_float()
                .ok_or_else(|| ConfigError::field(name, "could not be formatted as a float."))?;
            return Ok(format!("{f:.precision$}"));
        }
    }
    Err(bad_directive(spec))
}

fn bad_directive(spec: &str) -> ConfigError {
    ConfigError::new(format!(
        "Unsupported format directive '{spec}' in fallback template"
    ))
}

fn display_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Text(s) => s.clone(),
        FieldValue::Int(n) => n.to_string(),
        FieldValue::Float(f) => f.to_string(),
        FieldValue::Bool(b) => b.to_string(),
        FieldValue::List(items) => Value::Array(items.clone()).to_string(),
        FieldValue::Dict(map) => Value::Object(map.clone()).to_string(),
        FieldValue::Url(url) => url.as_str().to_string(),
        FieldValue::Regex(re) => re.as_str().to_string(),
        FieldValue::Raw(Value::String(s)) => s.clone(),
        FieldValue::Raw(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(entries: Vec<(&str, FieldValue)>) -> HashMap<String, FieldValue> {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    #[test]
    fn test_pass_through_requires_exactly_one_name() {
        assert!(Fallback::pass_through(Vec::<String>::new()).is_err());
        assert!(Fallback::pass_through(vec!["a", "b"]).is_err());
        assert!(Fallback::pass_through(vec!["a"]).is_ok());
    }

    #[test]
    fn test_referenced_fields_order() {
        let fallback = Fallback::format("{a}{b}{c}", vec!["a", "b"], vec!["c"]);
        let names: Vec<&str> = fallback.referenced_fields().collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_render_plain_placeholders() {
        let vals = values(vec![
            ("host", FieldValue::Text("db".into())),
            ("port", FieldValue::Int(5432)),
        ]);
        let out = render_template("{host}:{port}", &vals).unwrap();
        assert_eq!(out, "db:5432");
    }

    #[test]
    fn test_render_zero_padded_int() {
        let vals = values(vec![("n", FieldValue::Int(3))]);
        assert_eq!(render_template("{n:02d}", &vals).unwrap(), "03");
        assert_eq!(render_template("{n:5d}", &vals).unwrap(), "    3");
        assert_eq!(render_template("{n:d}", &vals).unwrap(), "3");
    }

    #[test]
    fn test_render_float_precision() {
        let vals = values(vec![("ratio", FieldValue::Float(0.125))]);
        assert_eq!(render_template("{ratio:.2f}", &vals).unwrap(), "0.13");
    }

    #[test]
    fn test_render_escaped_braces() {
        let vals = values(vec![("x", FieldValue::Int(1))]);
        assert_eq!(render_template("{{{x}}}", &vals).unwrap(), "{1}");
    }

    #[test]
    fn test_render_unknown_placeholder_errors() {
        let vals = values(vec![]);
        let err = render_template("{missing}", &vals).unwrap_err();
        assert!(err.to_string().contains("'missing'"));
    }

    #[test]
    fn test_unsupported_directive_errors() {
        let vals = values(vec![("n", FieldValue::Int(3))]);
        let err = render_template("{n:>8}", &vals).unwrap_err();
        assert!(err.to_string().contains("Unsupported format directive"));
    }

    #[test]
    fn test_directive_type_mismatch_is_field_scoped() {
        let vals = values(vec![("name", FieldValue::Text("abc".into()))]);
        let err = render_template("{name:02d}", &vals).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Field 'name' could not be formatted as an integer."
        );
    }
}

//! Typed field specifications and value resolution.
//!
//! A [`Field`] describes one named configuration value: its type, its
//! documentation, whether it is required, its default, and an ordered list of
//! [`Fallback`] rules to try when the value is absent from the raw data.
//! Fields are built unbound and receive their name when a schema is
//! assembled; resolution is a pure function of (schema, raw data), re-run on
//! every read with no caching.

use cm_common::{ConfigData, ConfigError, Result};
use regex::Regex;
use serde_json::{Map, Number, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use url::Url;

use crate::fallback::Fallback;
use crate::schema::Schema;

/// Process-wide counter giving every field a stable construction order.
/// Declaration order across schema composition (including overrides) is
/// derived from it.
static CREATION_ORDER: AtomicU64 = AtomicU64::new(0);

/// The type of a field, selecting its clean/conversion behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// No conversion; the raw value passes through unchanged.
    Any,
    /// A string value.
    Text,
    /// An integer, converted via its textual form so floats fail instead of
    /// silently truncating.
    Int,
    /// A float, from a number or a numeric string.
    Float,
    /// A boolean; textual "false"/"0"/"" (trimmed, case-insensitive) are
    /// false, other text is true, non-text uses truthiness.
    Bool,
    /// A list, deep-copied on every read.
    List,
    /// A mapping, deep-copied on every read.
    Dict,
    /// A URL string, parsed into a structured representation.
    Url,
    /// A string compiled into a regex pattern.
    Regex,
}

impl FieldKind {
    /// The type tag used in generated documentation, or `None` for untyped
    /// fields.
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            FieldKind::Any => None,
            FieldKind::Text => Some("str"),
            FieldKind::Int => Some("int"),
            FieldKind::Float => Some("float"),
            FieldKind::Bool => Some("bool"),
            FieldKind::List => Some("list"),
            FieldKind::Dict => Some("dict"),
            FieldKind::Url => Some("URL"),
            FieldKind::Regex => Some("regex"),
        }
    }

    /// Clean a raw value into its typed form, or raise a field-scoped error.
    pub fn clean(&self, name: &str, value: &Value) -> Result<FieldValue> {
        match self {
            FieldKind::Any => Ok(FieldValue::Raw(value.clone())),
            FieldKind::Text => match value {
                Value::String(s) => Ok(FieldValue::Text(s.clone())),
                _ => Err(ConfigError::field(name, "is not a string.")),
            },
            FieldKind::Int => clean_int(name, value),
            FieldKind::Float => clean_float(name, value),
            FieldKind::Bool => Ok(FieldValue::Bool(truthy(value))),
            FieldKind::List => match value {
                Value::Array(items) => Ok(FieldValue::List(items.clone())),
                _ => Err(ConfigError::field(name, "is not a list.")),
            },
            FieldKind::Dict => match value {
                Value::Object(map) => Ok(FieldValue::Dict(map.clone())),
                _ => Err(ConfigError::field(name, "is not a dict.")),
            },
            FieldKind::Url => match value {
                Value::String(s) => Url::parse(s)
                    .map(FieldValue::Url)
                    .map_err(|_| ConfigError::field(name, "could not be parsed as a URL.")),
                _ => Err(ConfigError::field(name, "is not a URL string.")),
            },
            FieldKind::Regex => match value {
                Value::String(s) => Regex::new(s)
                    .map(FieldValue::Regex)
                    .map_err(|_| ConfigError::field(name, "could not be compiled as a regex.")),
                _ => Err(ConfigError::field(name, "is not a string.")),
            },
        }
    }
}

/// Int conversion goes through the value's string form so a float input
/// fails instead of truncating.
fn clean_int(name: &str, value: &Value) -> Result<FieldValue> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return Err(ConfigError::field(name, "could not be converted to int.")),
    };
    text.parse::<i64>()
        .map(FieldValue::Int)
        .map_err(|_| ConfigError::field(name, "could not be converted to int."))
}

fn clean_float(name: &str, value: &Value) -> Result<FieldValue> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .map(FieldValue::Float)
            .ok_or_else(|| ConfigError::field(name, "could not be converted to float.")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(FieldValue::Float)
            .map_err(|_| ConfigError::field(name, "could not be converted to float.")),
        _ => Err(ConfigError::field(name, "could not be converted to float.")),
    }
}

/// JSON truthiness: null, zero, empty string/array/object are false.
/// Textual values follow the explicit "false"/"0"/"" rule.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !matches!(s.trim().to_lowercase().as_str(), "false" | "0" | ""),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// The cleaned, typed result of reading a field.
#[derive(Debug, Clone)]
pub enum FieldValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<Value>),
    Dict(Map<String, Value>),
    Url(Url),
    Regex(Regex),
    /// Untyped pass-through from a [`FieldKind::Any`] field.
    Raw(Value),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Float access; integer values widen.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            FieldValue::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Map<String, Value>> {
        match self {
            FieldValue::Dict(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_url(&self) -> Option<&Url> {
        match self {
            FieldValue::Url(url) => Some(url),
            _ => None,
        }
    }

    pub fn as_regex(&self) -> Option<&Regex> {
        match self {
            FieldValue::Regex(re) => Some(re),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> Option<&Value> {
        match self {
            FieldValue::Raw(value) => Some(value),
            _ => None,
        }
    }

    /// Convert back to a raw JSON value. Used when a fallback feeds one
    /// field's cleaned value into another field's clean step. Structured
    /// values (URL, regex) render as their string form; a non-finite float
    /// becomes null.
    pub fn into_value(self) -> Value {
        match self {
            FieldValue::Text(s) => Value::String(s),
            FieldValue::Int(n) => Value::Number(n.into()),
            FieldValue::Float(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
            FieldValue::Bool(b) => Value::Bool(b),
            FieldValue::List(items) => Value::Array(items),
            FieldValue::Dict(map) => Value::Object(map),
            FieldValue::Url(url) => Value::String(url.into()),
            FieldValue::Regex(re) => Value::String(re.as_str().to_string()),
            FieldValue::Raw(value) => value,
        }
    }
}

/// Tracks the fields currently being resolved so cyclic fallback graphs
/// terminate: a field already on the stack answers presence with its direct
/// key only.
#[derive(Debug, Default)]
pub(crate) struct ResolveGuard {
    stack: Vec<String>,
}

impl ResolveGuard {
    /// Push a field onto the resolution stack. Returns `false` if the field
    /// is already being resolved (a cycle).
    fn enter(&mut self, name: &str) -> bool {
        if self.stack.iter().any(|n| n == name) {
            return false;
        }
        self.stack.push(name.to_string());
        true
    }

    fn exit(&mut self, name: &str) {
        if let Some(pos) = self.stack.iter().rposition(|n| n == name) {
            self.stack.remove(pos);
        }
    }
}

/// Specification of one named configuration value.
///
/// Built unbound via the typed constructors ([`Field::text`], [`Field::int`],
/// ...) and chained options, then bound to a name when the owning schema is
/// assembled. A bound field is immutable and shared by every configuration
/// instance of its schema.
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    doc: String,
    kind: FieldKind,
    required: bool,
    default: Option<Value>,
    is_static: bool,
    fallbacks: Vec<Fallback>,
    order: u64,
}

impl Field {
    /// Create a field of the given kind. The doc string appears in generated
    /// documentation.
    pub fn new(kind: FieldKind, doc: impl Into<String>) -> Self {
        Field {
            name: String::new(),
            doc: doc.into(),
            kind,
            required: false,
            default: None,
            is_static: false,
            fallbacks: Vec::new(),
            order: CREATION_ORDER.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// An untyped field whose raw value passes through unchanged.
    pub fn any(doc: impl Into<String>) -> Self {
        Field::new(FieldKind::Any, doc)
    }

    pub fn text(doc: impl Into<String>) -> Self {
        Field::new(FieldKind::Text, doc)
    }

    pub fn int(doc: impl Into<String>) -> Self {
        Field::new(FieldKind::Int, doc)
    }

    pub fn float(doc: impl Into<String>) -> Self {
        Field::new(FieldKind::Float, doc)
    }

    pub fn boolean(doc: impl Into<String>) -> Self {
        Field::new(FieldKind::Bool, doc)
    }

    pub fn list(doc: impl Into<String>) -> Self {
        Field::new(FieldKind::List, doc)
    }

    pub fn dict(doc: impl Into<String>) -> Self {
        Field::new(FieldKind::Dict, doc)
    }

    pub fn url(doc: impl Into<String>) -> Self {
        Field::new(FieldKind::Url, doc)
    }

    pub fn regex(doc: impl Into<String>) -> Self {
        Field::new(FieldKind::Regex, doc)
    }

    /// Mark the field as required: validation fails if no value is present
    /// directly or through a fallback.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the default used when no value is present. Unused for required
    /// fields.
    pub fn default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Mark the field as static, making it readable on static configuration
    /// instances.
    pub fn static_field(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Append a fallback to try, in order, when no direct value is present.
    pub fn fallback(mut self, fallback: Fallback) -> Self {
        self.fallbacks.push(fallback);
        self
    }

    /// The name bound at schema assembly; empty until then.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc(&self) -> &str {
        &self.doc
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn fallbacks(&self) -> &[Fallback] {
        &self.fallbacks
    }

    /// The process-wide construction-order counter, governing declaration
    /// order in assembled schemas.
    pub fn order(&self) -> u64 {
        self.order
    }

    pub(crate) fn bind(mut self, name: String) -> Self {
        self.name = name;
        self
    }

    /// A field-scoped error: "Field '<name>' <problem>".
    pub(crate) fn error(&self, problem: &str) -> ConfigError {
        ConfigError::field(&self.name, problem)
    }

    /// Whether a value for this field is present: directly in the data, or
    /// (when `check_fallbacks`) through any fallback whose own dependencies
    /// are reachable. Fallback presence ignores the `required` flag and asks
    /// only whether a value is reachable.
    pub(crate) fn present_in(
        &self,
        schema: &Schema,
        data: &dyn ConfigData,
        check_fallbacks: bool,
        guard: &mut ResolveGuard,
    ) -> Result<bool> {
        if data.present(&self.name) {
            return Ok(true);
        }
        if !check_fallbacks || !guard.enter(&self.name) {
            return Ok(false);
        }
        let mut found = Ok(false);
        for fallback in &self.fallbacks {
            match fallback.present_in(schema, data, guard) {
                Ok(false) => continue,
                result => {
                    found = result;
                    break;
                }
            }
        }
        guard.exit(&self.name);
        found
    }

    /// Locate the raw value: the direct value if the key is present (a null
    /// value maps to the default), else the first present fallback's built
    /// value, else the default.
    pub(crate) fn find_value_in(
        &self,
        schema: &Schema,
        data: &dyn ConfigData,
        guard: &mut ResolveGuard,
    ) -> Result<Option<Value>> {
        if data.present(&self.name) {
            let direct = data.get(&self.name).filter(|v| !v.is_null());
            return Ok(direct.or_else(|| self.default.clone()));
        }
        if !guard.enter(&self.name) {
            return Ok(self.default.clone());
        }
        let mut found = Ok(self.default.clone());
        for fallback in &self.fallbacks {
            match fallback.present_in(schema, data, guard) {
                Ok(true) => {
                    found = fallback.build_value_in(schema, data, guard).map(Some);
                    break;
                }
                Ok(false) => continue,
                Err(err) => {
                    found = Err(err);
                    break;
                }
            }
        }
        guard.exit(&self.name);
        found
    }

    /// Locate and clean the value. An absent or null value passes through as
    /// `None` without cleaning.
    pub(crate) fn get_value_in(
        &self,
        schema: &Schema,
        data: &dyn ConfigData,
        guard: &mut ResolveGuard,
    ) -> Result<Option<FieldValue>> {
        match self.find_value_in(schema, data, guard)? {
            None => Ok(None),
            Some(Value::Null) => Ok(None),
            Some(value) => self.kind.clean(&self.name, &value).map(Some),
        }
    }

    /// Check required-presence, then force a full resolution so conversion
    /// errors surface eagerly even on optional fields.
    pub(crate) fn validate_in(&self, schema: &Schema, data: &dyn ConfigData) -> Result<()> {
        let mut guard = ResolveGuard::default();
        if self.required && !self.present_in(schema, data, true, &mut guard)? {
            return Err(ConfigError::missing_required(&self.name));
        }
        let mut guard = ResolveGuard::default();
        self.get_value_in(schema, data, &mut guard)?;
        Ok(())
    }
}

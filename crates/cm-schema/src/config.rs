//! Configuration instances: eager validation, per-read resolution.
//!
//! A [`Config`] binds a frozen [`Schema`] to a raw data provider.
//! Construction validates every applicable field (and then the schema's
//! cross-field hook) — on any failure no instance is produced. After
//! construction every read re-resolves against the raw data; nothing is
//! cached, and no setter API exists.

use cm_common::{ConfigData, ConfigError, Result};
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use url::Url;

use crate::field::{Field, FieldKind, FieldValue, ResolveGuard};
use crate::schema::Schema;

/// A validated configuration instance.
pub struct Config {
    schema: Arc<Schema>,
    data: Box<dyn ConfigData + Send + Sync>,
    is_static: bool,
}

impl Config {
    /// Construct and eagerly validate a configuration over the given raw
    /// data. Any field or cross-field failure aborts construction.
    pub fn new(
        schema: Arc<Schema>,
        data: impl ConfigData + Send + Sync + 'static,
    ) -> Result<Self> {
        Self::build(schema, Box::new(data), false)
    }

    /// Construct a static configuration: only static fields are validated,
    /// and only static fields may be read.
    pub fn new_static(
        schema: Arc<Schema>,
        data: impl ConfigData + Send + Sync + 'static,
    ) -> Result<Self> {
        Self::build(schema, Box::new(data), true)
    }

    fn build(
        schema: Arc<Schema>,
        data: Box<dyn ConfigData + Send + Sync>,
        is_static: bool,
    ) -> Result<Self> {
        let config = Config {
            schema,
            data,
            is_static,
        };
        tracing::debug!(
            fields = config.schema.len(),
            static_instance = is_static,
            "validating configuration"
        );
        for field in config.schema.fields() {
            if config.is_static && !field.is_static() {
                // Non-static fields are not validated on static instances.
                continue;
            }
            field.validate_in(&config.schema, config.data.as_ref())?;
        }
        if let Some(hook) = config.schema.post_validate_hook() {
            hook(&config)?;
        }
        Ok(config)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Whether a value for the named field is present, directly or through a
    /// fallback.
    pub fn present(&self, name: &str) -> Result<bool> {
        let field = self.lookup(name)?;
        let mut guard = ResolveGuard::default();
        field.present_in(&self.schema, self.data.as_ref(), true, &mut guard)
    }

    /// Resolve and clean the named field's value. Absent optional fields
    /// yield `Ok(None)`. Reading a non-static field on a static instance is
    /// an error.
    pub fn get(&self, name: &str) -> Result<Option<FieldValue>> {
        let field = self.lookup(name)?;
        if self.is_static && !field.is_static() {
            return Err(field.error("is not marked as static."));
        }
        let mut guard = ResolveGuard::default();
        field.get_value_in(&self.schema, self.data.as_ref(), &mut guard)
    }

    pub fn text(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .kind_checked(name, FieldKind::Text)?
            .and_then(|value| match value {
                FieldValue::Text(s) => Some(s),
                _ => None,
            }))
    }

    pub fn int(&self, name: &str) -> Result<Option<i64>> {
        Ok(self
            .kind_checked(name, FieldKind::Int)?
            .and_then(|value| value.as_int()))
    }

    pub fn float(&self, name: &str) -> Result<Option<f64>> {
        Ok(self
            .kind_checked(name, FieldKind::Float)?
            .and_then(|value| value.as_float()))
    }

    pub fn boolean(&self, name: &str) -> Result<Option<bool>> {
        Ok(self
            .kind_checked(name, FieldKind::Bool)?
            .and_then(|value| value.as_bool()))
    }

    pub fn list(&self, name: &str) -> Result<Option<Vec<Value>>> {
        Ok(self
            .kind_checked(name, FieldKind::List)?
            .and_then(|value| match value {
                FieldValue::List(items) => Some(items),
                _ => None,
            }))
    }

    pub fn dict(&self, name: &str) -> Result<Option<Map<String, Value>>> {
        Ok(self
            .kind_checked(name, FieldKind::Dict)?
            .and_then(|value| match value {
                FieldValue::Dict(map) => Some(map),
                _ => None,
            }))
    }

    pub fn url(&self, name: &str) -> Result<Option<Url>> {
        Ok(self
            .kind_checked(name, FieldKind::Url)?
            .and_then(|value| match value {
                FieldValue::Url(url) => Some(url),
                _ => None,
            }))
    }

    pub fn regex(&self, name: &str) -> Result<Option<Regex>> {
        Ok(self
            .kind_checked(name, FieldKind::Regex)?
            .and_then(|value| match value {
                FieldValue::Regex(re) => Some(re),
                _ => None,
            }))
    }

    fn lookup(&self, name: &str) -> Result<&Field> {
        self.schema
            .field(name)
            .ok_or_else(|| ConfigError::new(format!("Unknown config field: '{name}'")))
    }

    fn kind_checked(&self, name: &str, expected: FieldKind) -> Result<Option<FieldValue>> {
        let field = self.lookup(name)?;
        if field.kind() != expected {
            let tag = expected.tag().unwrap_or("untyped");
            return Err(field.error(&format!("is not declared as a {tag} field.")));
        }
        self.get(name)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("schema", &self.schema)
            .field("is_static", &self.is_static)
            .finish_non_exhaustive()
    }
}

//! Schema assembly and introspection.
//!
//! A [`Schema`] is the frozen, ordered collection of field specifications for
//! one configuration shape. It is built once through [`SchemaBuilder`]:
//! compose fields (optionally extending a base schema, where same-name
//! definitions override), bind each field to its name, order the survivors by
//! their construction counter, and verify every fallback reference before
//! freezing.

use cm_common::{ConfigError, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::Config;
use crate::field::Field;

/// Cross-field validation hook, run after every field passes individually.
pub type PostValidateHook = Arc<dyn Fn(&Config) -> Result<()> + Send + Sync>;

/// The frozen field table for one configuration shape.
pub struct Schema {
    fields: Vec<Field>,
    index: HashMap<String, usize>,
    post_validate: Option<PostValidateHook>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder {
            fields: Vec::new(),
            post_validate: None,
        }
    }

    /// Look up a field by its bound name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.index.get(name).map(|&pos| &self.fields[pos])
    }

    /// All fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(Field::name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn post_validate_hook(&self) -> Option<&PostValidateHook> {
        self.post_validate.as_ref()
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("fields", &self.field_names().collect::<Vec<_>>())
            .field("post_validate", &self.post_validate.is_some())
            .finish()
    }
}

/// Builder assembling a [`Schema`] from field specifications.
pub struct SchemaBuilder {
    fields: Vec<Field>,
    post_validate: Option<PostValidateHook>,
}

impl SchemaBuilder {
    /// Inherit every field (and the cross-field hook, unless replaced) from a
    /// base schema. Fields added afterwards under the same name override the
    /// inherited ones.
    pub fn extend(mut self, base: &Schema) -> Self {
        self.fields.extend(base.fields.iter().cloned());
        if self.post_validate.is_none() {
            self.post_validate = base.post_validate.clone();
        }
        self
    }

    /// Add a field under the given name. The name binds here; a later field
    /// with the same name replaces an earlier one.
    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.push(field.bind(name.into()));
        self
    }

    /// Install the cross-field validation hook, run after all per-field
    /// validation during configuration construction.
    pub fn post_validate<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Config) -> Result<()> + Send + Sync + 'static,
    {
        self.post_validate = Some(Arc::new(hook));
        self
    }

    /// Freeze the schema: dedupe by name (later definitions win), order by
    /// construction counter, and verify that every fallback references a
    /// defined field.
    pub fn build(self) -> Result<Schema> {
        let mut by_name: HashMap<String, Field> = HashMap::new();
        for field in self.fields {
            by_name.insert(field.name().to_string(), field);
        }

        let mut fields: Vec<Field> = by_name.into_values().collect();
        fields.sort_by_key(Field::order);

        let index: HashMap<String, usize> = fields
            .iter()
            .enumerate()
            .map(|(pos, field)| (field.name().to_string(), pos))
            .collect();

        for field in &fields {
            for fallback in field.fallbacks() {
                for referenced in fallback.referenced_fields() {
                    if !index.contains_key(referenced) {
                        return Err(ConfigError::undefined_fallback(referenced));
                    }
                }
            }
        }

        tracing::debug!(fields = fields.len(), "schema assembled");
        Ok(Schema {
            fields,
            index,
            post_validate: self.post_validate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::Fallback;

    #[test]
    fn test_declaration_order_follows_construction() {
        let schema = Schema::builder()
            .field("first", Field::text("first"))
            .field("second", Field::int("second"))
            .field("third", Field::boolean("third"))
            .build()
            .unwrap();
        let names: Vec<&str> = schema.field_names().collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_extend_overrides_by_name() {
        let base = Schema::builder()
            .field("host", Field::text("base host"))
            .field("port", Field::int("base port"))
            .build()
            .unwrap();

        let derived = Schema::builder()
            .extend(&base)
            .field("port", Field::int("derived port").required())
            .field("user", Field::text("derived user"))
            .build()
            .unwrap();

        assert_eq!(derived.len(), 3);
        let port = derived.field("port").unwrap();
        assert!(port.is_required());
        assert_eq!(port.doc(), "derived port");
        // The override was constructed later, so it sorts after the
        // inherited base field.
        let names: Vec<&str> = derived.field_names().collect();
        assert_eq!(names, vec!["host", "port", "user"]);
    }

    #[test]
    fn test_build_rejects_undefined_fallback_reference() {
        let err = Schema::builder()
            .field(
                "newfield",
                Field::text("new").fallback(Fallback::single("missing")),
            )
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), "Undefined fallback field: 'missing'");
    }

    #[test]
    fn test_field_lookup() {
        let schema = Schema::builder()
            .field("workers", Field::int("worker count"))
            .build()
            .unwrap();
        assert!(schema.field("workers").is_some());
        assert!(schema.field("threads").is_none());
        assert_eq!(schema.field("workers").unwrap().name(), "workers");
    }
}

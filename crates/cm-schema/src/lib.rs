//! Declarative configuration schemas with typed fields and fallbacks.
//!
//! This crate provides:
//! - Typed field specifications with documentation, defaults, and required-ness
//! - Fallback rules deriving a field's value from other fields
//! - Explicit schema composition with stable declaration order
//! - Eagerly-validated configuration instances over raw mapping data
//! - Documentation generation from schema introspection
//!
//! The library performs no I/O: callers hand it already-parsed mapping data
//! (anything implementing [`ConfigData`], e.g. a `serde_json` object) and read
//! back typed values.
//!
//! ```
//! use cm_schema::{Config, Fallback, Field, Schema};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let schema = Arc::new(
//!     Schema::builder()
//!         .field("oldfield", Field::text("Deprecated spelling."))
//!         .field(
//!             "newfield",
//!             Field::text("Preferred spelling.")
//!                 .required()
//!                 .fallback(Fallback::single("oldfield")),
//!         )
//!         .build()
//!         .unwrap(),
//! );
//!
//! let config = Config::new(schema, json!({"oldfield": "foo"})).unwrap();
//! assert_eq!(config.text("newfield").unwrap().as_deref(), Some("foo"));
//! ```

pub mod config;
pub mod docgen;
pub mod fallback;
pub mod field;
pub mod schema;

pub use cm_common::{ConfigData, ConfigError, Result};
pub use config::Config;
pub use fallback::Fallback;
pub use field::{Field, FieldKind, FieldValue};
pub use schema::{Schema, SchemaBuilder};

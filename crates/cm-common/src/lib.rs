//! Confmodel shared foundations.
//!
//! This crate provides the types shared across confmodel crates:
//! - The single configuration error kind and its `Result` alias
//! - The `ConfigData` capability for raw, already-parsed config sources

pub mod data;
pub mod error;

pub use data::ConfigData;
pub use error::{ConfigError, Result};

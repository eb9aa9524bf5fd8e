//! # Castwright Shared Library
//!
//! Schema catalog for the Castwright content pipeline: entity types, their
//! create/update shapes with field validation, and the PostgreSQL data
//! access used by every Castwright service.
//!
//! ## Module Organization
//!
//! - `models`: Entities and their CRUD operations
//! - `validation`: Field rules and JSON body decoding
//! - `field_map`: Typed key/value bags stored as JSONB
//! - `error`: The `SchemaError` type
//! - `db`: Connection pool and migrations

pub mod db;
pub mod error;
pub mod field_map;
pub mod models;
pub mod validation;

/// Current version of the Castwright shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}

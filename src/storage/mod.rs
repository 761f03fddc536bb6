//! Storage Layer - SQLite-backed persistence
//!
//! One table, one row per cached node:
//! - Attributes(id, parent, name, type, value, context), unique on (parent, name)

pub mod schema;
pub mod attr_db;

pub use attr_db::{AttrDb, CacheStats};

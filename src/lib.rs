//! # treecache - Persistent memoization for attribute trees
//!
//! A tree-walking evaluator uses this crate to avoid recomputing a subtree once
//! its value is known. Nodes are stored in SQLite, keyed by `(parent id, name)`,
//! in one file per input fingerprint.
//!
//! treecache provides:
//! - A tagged value model for cached nodes and its row encoding
//! - `AttrDb`, the row store that degrades to "no caching" on any storage fault
//! - `Cache`, one session over one fingerprint's file
//! - `Cursor`, a lazily-populated handle to one node of the cached tree

pub mod value;
pub mod context;
pub mod symbol;
pub mod fingerprint;
pub mod config;
pub mod storage;
pub mod cache;
pub mod cursor;
pub mod ui;

// Re-exports for convenient access
pub use value::{AttrId, AttrKey, AttrType, AttrValue, RawValue, StringContext};
pub use context::{ContextCodec, EscapedContextCodec};
pub use symbol::{Symbol, SymbolTable};
pub use fingerprint::Fingerprint;
pub use config::CacheConfig;
pub use storage::{AttrDb, CacheStats};
pub use cache::Cache;
pub use cursor::Cursor;

/// Result type alias for treecache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for treecache operations
///
/// Storage faults during a session never show up here: `AttrDb` absorbs them
/// and disables itself. What remains is either an explicit open failure or a
/// row the current schema cannot interpret.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected type {0} in evaluation cache")]
    UnexpectedAttrType(i64),

    #[error("Corrupt {ty} value in evaluation cache: {value:?}")]
    CorruptValue { ty: AttrType, value: Option<String> },

    #[error("Invalid string context: {0}")]
    InvalidContext(String),

    #[error("Invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    #[error("Cannot change cached {from} attribute '{name}' to {to}")]
    IllegalTransition {
        name: String,
        from: AttrType,
        to: AttrType,
    },
}

//! Symbol table - interned attribute names
//!
//! Attribute names are interned once per session and handled as `Symbol`s:
//! small copyable ids that compare in constant time. The cache stores the
//! name text on disk and turns it back into a `Symbol` on the way out.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// An interned attribute name.
///
/// Only meaningful together with the `SymbolTable` that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    /// Position of this symbol in its table
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Default)]
struct Interner {
    names: Vec<Arc<str>>,
    index: HashMap<Arc<str>, Symbol>,
}

/// Thread-safe interning table, stable for the lifetime of the table.
#[derive(Debug, Default)]
pub struct SymbolTable {
    inner: RwLock<Interner>,
}

impl SymbolTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `name`, returning the existing symbol if it was seen before
    pub fn create(&self, name: &str) -> Symbol {
        if let Some(symbol) = self.lookup(name) {
            return symbol;
        }

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        // Another writer may have interned it between the two locks
        if let Some(symbol) = inner.index.get(name) {
            return *symbol;
        }
        let symbol = Symbol(inner.names.len() as u32);
        let name: Arc<str> = Arc::from(name);
        inner.names.push(name.clone());
        inner.index.insert(name, symbol);
        symbol
    }

    /// Find the symbol for `name` without interning it
    pub fn lookup(&self, name: &str) -> Option<Symbol> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.index.get(name).copied()
    }

    /// Name behind a symbol; `None` if it came from another table
    pub fn resolve(&self, symbol: Symbol) -> Option<Arc<str>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.names.get(symbol.0 as usize).cloned()
    }

    /// Intern every segment of a dot-separated attribute path.
    ///
    /// An empty path yields no segments.
    pub fn create_path(&self, path: &str) -> Vec<Symbol> {
        if path.is_empty() {
            return Vec::new();
        }
        path.split('.').map(|segment| self.create(segment)).collect()
    }

    /// Number of interned names
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//! Cache sessions
//!
//! A `Cache` wraps the store of one fingerprint for the duration of one
//! evaluation session, and hands out the root `Cursor`. A cache without a
//! store is valid: it caches nothing and every lookup misses.

use std::path::Path;
use std::sync::Arc;

use crate::config::{self, CacheConfig};
use crate::cursor::Cursor;
use crate::fingerprint::Fingerprint;
use crate::storage::{AttrDb, CacheStats};
use crate::symbol::{Symbol, SymbolTable};
use crate::value::{AttrId, AttrKey, AttrValue};
use crate::Result;

pub struct Cache {
    db: Option<AttrDb>,
    symbols: Arc<SymbolTable>,
    /// Label of the root node; the empty name, never a real attribute
    root_symbol: Symbol,
}

impl Cache {
    /// Open the cache for `fingerprint`, falling back to a no-op cache.
    ///
    /// No fingerprint, a disabled config, or a file that cannot be opened all
    /// yield a cache that stores nothing.
    pub fn new(config: &CacheConfig, fingerprint: Option<&Fingerprint>, symbols: Arc<SymbolTable>) -> Arc<Self> {
        let db = match fingerprint {
            Some(fingerprint) if config.enabled => match open_db(config, fingerprint, symbols.clone()) {
                Ok(db) => Some(db),
                Err(e) => {
                    tracing::warn!(fingerprint = %fingerprint, error = %e, "evaluation cache unavailable");
                    None
                }
            },
            _ => None,
        };
        Arc::new(Self::build(db, symbols))
    }

    /// Open the cache for `fingerprint`, failing if the file cannot be opened
    pub fn try_new(config: &CacheConfig, fingerprint: &Fingerprint, symbols: Arc<SymbolTable>) -> Result<Arc<Self>> {
        let db = open_db(config, fingerprint, symbols.clone())?;
        Ok(Arc::new(Self::build(Some(db), symbols)))
    }

    /// Cache over an in-memory database (for testing)
    pub fn in_memory(symbols: Arc<SymbolTable>) -> Result<Arc<Self>> {
        let db = AttrDb::open_in_memory(symbols.clone())?;
        Ok(Arc::new(Self::build(Some(db), symbols)))
    }

    /// Cache over an already opened store, using the store's symbol table
    pub fn from_db(db: AttrDb) -> Arc<Self> {
        let symbols = db.symbols().clone();
        Arc::new(Self::build(Some(db), symbols))
    }

    /// Cache that stores nothing
    pub fn disabled(symbols: Arc<SymbolTable>) -> Arc<Self> {
        Arc::new(Self::build(None, symbols))
    }

    fn build(db: Option<AttrDb>, symbols: Arc<SymbolTable>) -> Self {
        let root_symbol = symbols.create("");
        Self {
            db,
            symbols,
            root_symbol,
        }
    }

    /// Cursor on the root node, creating the root's row on first visit
    pub fn get_root(self: &Arc<Self>) -> Cursor {
        Cursor::insert(self.clone(), None, self.root_symbol, AttrValue::Attrs)
    }

    /// Cursor on the root node if its row is stored; never writes
    pub fn find_root(self: &Arc<Self>) -> Result<Option<Cursor>> {
        let Some(db) = &self.db else {
            return Ok(None);
        };
        let found = db.get_value(AttrKey::new(AttrId::NONE, self.root_symbol))?;
        Ok(found.map(|(id, value)| Cursor::existing(self.clone(), None, self.root_symbol, id, value)))
    }

    /// Flush everything written so far and keep the session going
    pub fn commit(&self) {
        if let Some(db) = &self.db {
            db.commit();
        }
    }

    /// Whether writes still reach storage
    pub fn is_enabled(&self) -> bool {
        self.db.as_ref().is_some_and(|db| !db.is_disabled())
    }

    pub fn symbols(&self) -> &Arc<SymbolTable> {
        &self.symbols
    }

    pub fn root_symbol(&self) -> Symbol {
        self.root_symbol
    }

    /// File backing this cache, if any
    pub fn path(&self) -> Option<&Path> {
        self.db.as_ref().and_then(AttrDb::path)
    }

    pub fn stats(&self) -> CacheStats {
        self.db.as_ref().map(AttrDb::stats).unwrap_or_default()
    }

    pub(crate) fn db(&self) -> Option<&AttrDb> {
        self.db.as_ref()
    }
}

fn open_db(config: &CacheConfig, fingerprint: &Fingerprint, symbols: Arc<SymbolTable>) -> Result<AttrDb> {
    let dir = config.resolved_cache_dir();
    config::ensure_cache_dir(&dir)?;
    AttrDb::open(&config::cache_file_path(&dir, fingerprint), symbols)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols() -> Arc<SymbolTable> {
        Arc::new(SymbolTable::new())
    }

    #[test]
    fn test_root_is_an_attrs_node() {
        let cache = Cache::in_memory(symbols()).unwrap();
        let root = cache.get_root();

        assert_eq!(root.cached_value(), &AttrValue::Attrs);
        assert!(!root.id().is_none());
        assert_eq!(root.parent_id(), None);
        assert_eq!(root.key().parent, AttrId::NONE);
        assert_eq!(root.label(), cache.root_symbol());
    }

    #[test]
    fn test_root_is_created_once() {
        let cache = Cache::in_memory(symbols()).unwrap();
        let first = cache.get_root();
        let second = cache.get_root();
        assert_eq!(first.id(), second.id());
        assert_eq!(cache.stats().total(), 1);
    }

    #[test]
    fn test_find_root_does_not_create_it() {
        let cache = Cache::in_memory(symbols()).unwrap();
        assert!(cache.find_root().unwrap().is_none());
        assert_eq!(cache.stats().total(), 0);

        let root = cache.get_root();
        let found = cache.find_root().unwrap().unwrap();
        assert_eq!(found.id(), root.id());
        assert_eq!(found.key(), root.key());
        assert_eq!(found.parent_id(), None);

        assert!(Cache::disabled(symbols()).find_root().unwrap().is_none());
    }

    #[test]
    fn test_file_per_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig::in_dir(dir.path().join("cache"));
        let fingerprint = Fingerprint::of_bytes(b"input");

        let cache = Cache::try_new(&config, &fingerprint, symbols()).unwrap();
        cache.get_root();

        let expected = config.cache_file(&fingerprint);
        assert_eq!(cache.path(), Some(expected.as_path()));
        assert!(expected.exists());
    }

    #[test]
    fn test_soft_constructor_without_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig::in_dir(dir.path());
        let cache = Cache::new(&config, None, symbols());

        assert!(!cache.is_enabled());
        let root = cache.get_root();
        assert!(root.id().is_none());
        assert_eq!(root.cached_value(), &AttrValue::Attrs);
    }

    #[test]
    fn test_soft_constructor_when_disabled_in_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig {
            cache_dir: Some(dir.path().to_path_buf()),
            enabled: false,
        };
        let fingerprint = Fingerprint::of_bytes(b"input");
        let cache = Cache::new(&config, Some(&fingerprint), symbols());

        assert!(!cache.is_enabled());
        assert!(!config.cache_file(&fingerprint).exists());
    }

    #[test]
    fn test_open_failure_soft_and_hard() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the cache directory should be
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();
        let config = CacheConfig::in_dir(&blocker);
        let fingerprint = Fingerprint::of_bytes(b"input");

        assert!(Cache::try_new(&config, &fingerprint, symbols()).is_err());

        let cache = Cache::new(&config, Some(&fingerprint), symbols());
        assert!(!cache.is_enabled());
        assert!(cache.get_root().maybe_get_attr(cache.symbols().create("x")).unwrap().is_none());
    }

    #[test]
    fn test_commit_without_store() {
        let cache = Cache::disabled(symbols());
        cache.commit();
        assert_eq!(cache.stats().total(), 0);
        assert!(cache.path().is_none());
    }

    #[test]
    fn test_from_db_shares_symbols() {
        let table = symbols();
        let db = AttrDb::open_in_memory(table.clone()).unwrap();
        let cache = Cache::from_db(db);
        assert!(Arc::ptr_eq(cache.symbols(), &table));
        assert!(cache.is_enabled());
    }
}

//! SQLite row store for cached nodes
//!
//! `AttrDb` keeps one connection and one long-running transaction per cache
//! session. Any storage error flips it into the `Disabled` state for good:
//! from then on every read is a miss and every write returns `AttrId::NONE`,
//! and the session carries on uncached. Storage faults never reach callers.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use serde::Serialize;

use super::schema;
use crate::context::{ContextCodec, EscapedContextCodec};
use crate::symbol::SymbolTable;
use crate::value::{AttrId, AttrKey, AttrType, AttrValue, RawValue};
use crate::{Error, Result};

/// Columns of one `Attributes` row, as read back by a point query
struct Row {
    id: i64,
    tag: i64,
    value: Option<String>,
    context: Option<String>,
}

/// An open connection with its session transaction
struct Session {
    conn: Connection,
    in_transaction: bool,
}

impl Session {
    fn new(conn: Connection) -> rusqlite::Result<Self> {
        Self::prepare(&conn)?;
        Self::start(conn)
    }

    fn start(conn: Connection) -> rusqlite::Result<Self> {
        let mut session = Self {
            conn,
            in_transaction: false,
        };
        session.begin()?;
        Ok(session)
    }

    fn prepare(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(schema::CACHE_PRAGMAS)?;
        let _mode: String = conn.pragma_update_and_check(
            None,
            "journal_mode",
            schema::CACHE_JOURNAL_MODE,
            |row| row.get(0),
        )?;
        for stmt in schema::all_schema_statements() {
            conn.execute(stmt, [])?;
        }
        Ok(())
    }

    fn begin(&mut self) -> rusqlite::Result<()> {
        self.conn.execute("BEGIN TRANSACTION", [])?;
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> rusqlite::Result<()> {
        if self.in_transaction {
            self.conn.execute("COMMIT", [])?;
            self.in_transaction = false;
        }
        Ok(())
    }

    fn insert(&self, parent: AttrId, name: &str, raw: &RawValue, context: Option<String>) -> rusqlite::Result<AttrId> {
        match context {
            Some(context) => {
                let mut stmt = self.conn.prepare_cached(schema::INSERT_ATTRIBUTE_WITH_CONTEXT)?;
                stmt.execute(params![parent.get(), name, raw.ty.tag(), raw.value, context])?;
            }
            None => {
                let mut stmt = self.conn.prepare_cached(schema::INSERT_ATTRIBUTE)?;
                stmt.execute(params![parent.get(), name, raw.ty.tag(), raw.value])?;
            }
        }
        Ok(AttrId::new(self.conn.last_insert_rowid()))
    }

    /// `None` when the row at the key is already resolved
    fn upsert(&self, parent: AttrId, name: &str, raw: &RawValue, context: Option<String>) -> rusqlite::Result<Option<AttrId>> {
        let mut stmt = self.conn.prepare_cached(schema::UPSERT_ATTRIBUTE)?;
        let id: Option<i64> = stmt
            .query_row(
                params![parent.get(), name, raw.ty.tag(), raw.value, context],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id.map(AttrId::new))
    }

    fn query(&self, parent: AttrId, name: &str) -> rusqlite::Result<Option<Row>> {
        let mut stmt = self.conn.prepare_cached(schema::QUERY_ATTRIBUTE)?;
        stmt.query_row(params![parent.get(), name], |row| {
            Ok(Row {
                id: row.get(0)?,
                tag: row.get(1)?,
                value: row.get(2)?,
                context: row.get(3)?,
            })
        })
        .optional()
    }

    fn child_names(&self, parent: AttrId) -> rusqlite::Result<Vec<String>> {
        let mut stmt = self.conn.prepare_cached(schema::QUERY_ATTRIBUTES)?;
        let names = stmt
            .query_map([parent.get()], |row| row.get::<_, Option<String>>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names.into_iter().flatten().collect())
    }

    fn count_by_type(&self) -> rusqlite::Result<Vec<(i64, usize)>> {
        let mut stmt = self.conn.prepare_cached(schema::COUNT_BY_TYPE)?;
        let counts = stmt
            .query_map([], |row| {
                let tag: i64 = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((tag, count as usize))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(counts)
    }
}

enum StoreState {
    Active(Session),
    /// A storage error happened; the connection is gone and nothing is cached
    Disabled,
}

/// Persistent mapping from `AttrKey` to cached values.
///
/// All access is serialized behind one mutex, so an `AttrDb` can be shared
/// between threads.
pub struct AttrDb {
    state: Mutex<StoreState>,
    symbols: Arc<SymbolTable>,
    codec: Box<dyn ContextCodec>,
    path: Option<PathBuf>,
}

impl AttrDb {
    /// Open a cache file (creates it and the schema if needed)
    pub fn open(path: &Path, symbols: Arc<SymbolTable>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self::from_session(Session::new(conn)?, symbols, Some(path.to_path_buf()));
        tracing::debug!("Opened evaluation cache {}", path.display());
        Ok(db)
    }

    /// Open an existing cache file without writing to it.
    ///
    /// Neither the schema nor the pragmas are touched. A write fails like
    /// any other storage error and disables the store.
    pub fn open_read_only(path: &Path, symbols: Arc<SymbolTable>) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        let db = Self::from_session(Session::start(conn)?, symbols, Some(path.to_path_buf()));
        tracing::debug!("Opened evaluation cache {} read-only", path.display());
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory(symbols: Arc<SymbolTable>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::from_session(Session::new(conn)?, symbols, None))
    }

    fn from_session(session: Session, symbols: Arc<SymbolTable>, path: Option<PathBuf>) -> Self {
        Self {
            state: Mutex::new(StoreState::Active(session)),
            symbols,
            codec: Box::new(EscapedContextCodec),
            path,
        }
    }

    /// Replace the string context codec
    pub fn with_codec(mut self, codec: impl ContextCodec + 'static) -> Self {
        self.codec = Box::new(codec);
        self
    }

    /// File backing this store, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn symbols(&self) -> &Arc<SymbolTable> {
        &self.symbols
    }

    /// Whether a storage error has switched caching off for this session
    pub fn is_disabled(&self) -> bool {
        matches!(*self.lock(), StoreState::Disabled)
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `op` against the live session, or return `fallback` without touching
    /// storage if the store is disabled. An error disables the store.
    fn with_session<T>(
        &self,
        operation: &'static str,
        fallback: T,
        op: impl FnOnce(&mut Session) -> rusqlite::Result<T>,
    ) -> T {
        let mut state = self.lock();
        let StoreState::Active(session) = &mut *state else {
            return fallback;
        };
        match op(session) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(operation, error = %e, "evaluation cache disabled after storage error");
                // Dropping the session closes the connection and rolls back
                // whatever the open transaction held.
                *state = StoreState::Disabled;
                fallback
            }
        }
    }

    fn name_of(&self, key: &AttrKey) -> Option<Arc<str>> {
        let name = self.symbols.resolve(key.name);
        if name.is_none() {
            tracing::warn!(symbol = %key.name, "symbol not in this cache's table");
        }
        name
    }

    // ========== Writes ==========

    /// Insert a new row for `key`.
    ///
    /// A row already present at `key` violates the uniqueness constraint and
    /// disables the store; use `set_if_absent` or `replace_value` instead.
    pub fn set_value(&self, key: AttrKey, value: &AttrValue) -> AttrId {
        let Some(name) = self.name_of(&key) else {
            return AttrId::NONE;
        };
        let raw = RawValue::from_value(value);
        let context = raw.serialize_context(self.codec.as_ref());
        self.with_session("insert", AttrId::NONE, |session| {
            session.insert(key.parent, &name, &raw, context)
        })
    }

    pub fn set_bool(&self, key: AttrKey, b: bool) -> AttrId {
        self.set_value(key, &AttrValue::bool(b))
    }

    pub fn set_placeholder(&self, key: AttrKey) -> AttrId {
        self.set_value(key, &AttrValue::Placeholder)
    }

    pub fn set_missing(&self, key: AttrKey) -> AttrId {
        self.set_value(key, &AttrValue::Missing)
    }

    pub fn set_misc(&self, key: AttrKey) -> AttrId {
        self.set_value(key, &AttrValue::Misc)
    }

    pub fn set_failed(&self, key: AttrKey) -> AttrId {
        self.set_value(key, &AttrValue::Failed)
    }

    /// Write `value` at `key`, resolving a placeholder row in place.
    ///
    /// A placeholder keeps its id. Any other stored type is final: the row is
    /// left as it is and `Error::IllegalTransition` names the stored type.
    /// Check and write happen under one lock, so a stale cursor cannot
    /// overwrite a value another cursor resolved first.
    pub fn replace_value(&self, key: AttrKey, value: &AttrValue) -> Result<AttrId> {
        let Some(name) = self.name_of(&key) else {
            return Ok(AttrId::NONE);
        };
        let raw = RawValue::from_value(value);
        let context = raw.serialize_context(self.codec.as_ref());
        let written = self.with_session("upsert", Ok(AttrId::NONE), |session| {
            match session.upsert(key.parent, &name, &raw, context)? {
                Some(id) => Ok(Ok(id)),
                None => Ok(Err(session.query(key.parent, &name)?.map_or(0, |row| row.tag))),
            }
        });

        match written {
            Ok(id) => Ok(id),
            Err(stored) => Err(Error::IllegalTransition {
                name: name.to_string(),
                from: AttrType::try_from(stored)?,
                to: value.attr_type(),
            }),
        }
    }

    /// Id of the row at `key`, inserting `value` there first if there is none.
    ///
    /// Lookup and insert happen under one lock.
    pub fn set_if_absent(&self, key: AttrKey, value: &AttrValue) -> AttrId {
        let Some(name) = self.name_of(&key) else {
            return AttrId::NONE;
        };
        let raw = RawValue::from_value(value);
        let context = raw.serialize_context(self.codec.as_ref());
        self.with_session("insert if absent", AttrId::NONE, |session| {
            match session.query(key.parent, &name)? {
                Some(row) => Ok(AttrId::new(row.id)),
                None => session.insert(key.parent, &name, &raw, context),
            }
        })
    }

    // ========== Reads ==========

    /// Id of the row at `key`, if cached
    pub fn get_id(&self, key: AttrKey) -> Option<AttrId> {
        let name = self.name_of(&key)?;
        self.with_session("query", None, |session| {
            Ok(session.query(key.parent, &name)?.map(|row| AttrId::new(row.id)))
        })
    }

    /// Id and value of the row at `key`, if cached.
    ///
    /// A row whose type tag or payload cannot be interpreted is an error:
    /// the file was written by an incompatible schema or is corrupt.
    pub fn get_value(&self, key: AttrKey) -> Result<Option<(AttrId, AttrValue)>> {
        let Some(name) = self.name_of(&key) else {
            return Ok(None);
        };
        let row = self.with_session("query", None, |session| session.query(key.parent, &name));
        let Some(row) = row else {
            return Ok(None);
        };

        let raw = RawValue::from_columns(row.tag, row.value, row.context.as_deref(), self.codec.as_ref())?;
        Ok(Some((AttrId::new(row.id), raw.into_value()?)))
    }

    /// Names cached directly under `parent`, sorted
    pub fn child_names(&self, parent: AttrId) -> Vec<String> {
        self.with_session("list children", Vec::new(), |session| session.child_names(parent))
    }

    /// Row counts per type
    pub fn stats(&self) -> CacheStats {
        let counts = self.with_session("count", Vec::new(), |session| session.count_by_type());
        let mut stats = CacheStats::default();
        for (tag, count) in counts {
            match AttrType::try_from(tag) {
                Ok(ty) => stats.by_type.push((ty, count)),
                Err(_) => stats.unknown += count,
            }
        }
        stats.by_type.sort_by_key(|(ty, _)| ty.tag());
        stats
    }

    // ========== Transactions ==========

    /// Commit the session transaction and immediately open a new one
    pub fn commit(&self) {
        self.with_session("commit", (), |session| {
            if session.in_transaction {
                tracing::debug!("Saving the evaluation cache");
                session.commit()?;
                session.begin()?;
            }
            Ok(())
        })
    }
}

impl Drop for AttrDb {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let StoreState::Active(session) = state {
            if let Err(e) = session.commit() {
                tracing::warn!(error = %e, "failed to commit evaluation cache");
            }
        }
    }
}

/// Row counts of one cache file
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Count per known type, in tag order; types without rows are omitted
    pub by_type: Vec<(AttrType, usize)>,
    /// Rows whose type tag is not known to this version
    pub unknown: usize,
}

impl CacheStats {
    pub fn total(&self) -> usize {
        self.by_type.iter().map(|(_, count)| count).sum::<usize>() + self.unknown
    }

    pub fn count(&self, ty: AttrType) -> usize {
        self.by_type
            .iter()
            .find(|(t, _)| *t == ty)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cache Statistics:")?;
        for ty in AttrType::all() {
            writeln!(f, "  {}: {}", ty, self.count(*ty))?;
        }
        if self.unknown > 0 {
            writeln!(f, "  unknown: {}", self.unknown)?;
        }
        write!(f, "  Total: {}", self.total())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::symbol::Symbol;

    fn store() -> (AttrDb, Arc<SymbolTable>) {
        let symbols = Arc::new(SymbolTable::new());
        (AttrDb::open_in_memory(symbols.clone()).unwrap(), symbols)
    }

    fn key(symbols: &SymbolTable, parent: AttrId, name: &str) -> AttrKey {
        AttrKey::new(parent, symbols.create(name))
    }

    #[test]
    fn test_set_and_get_value() {
        let (db, symbols) = store();
        let root = db.set_value(key(&symbols, AttrId::NONE, ""), &AttrValue::Attrs);
        assert!(!root.is_none());

        let value = AttrValue::string_with_context("out", vec![("/a.drv".to_string(), "out".to_string())]);
        let id = db.set_value(key(&symbols, root, "foo"), &value);

        let (got_id, got) = db.get_value(key(&symbols, root, "foo")).unwrap().unwrap();
        assert_eq!(got_id, id);
        assert_eq!(got, value);
        assert_eq!(db.get_id(key(&symbols, root, "foo")), Some(id));
    }

    #[test]
    fn test_missing_key() {
        let (db, symbols) = store();
        assert!(db.get_id(key(&symbols, AttrId::NONE, "nope")).is_none());
        assert!(db.get_value(key(&symbols, AttrId::NONE, "nope")).unwrap().is_none());
        assert!(!db.is_disabled());
    }

    #[test]
    fn test_set_if_absent_is_idempotent() {
        let (db, symbols) = store();
        let k = key(&symbols, AttrId::NONE, "x");

        let first = db.set_if_absent(k, &AttrValue::bool(true));
        let second = db.set_if_absent(k, &AttrValue::bool(false));

        assert_eq!(first, second);
        assert_eq!(db.stats().total(), 1);
        // The first write wins
        assert_eq!(db.get_value(k).unwrap().unwrap().1, AttrValue::bool(true));
    }

    #[test]
    fn test_same_name_under_different_parents() {
        let (db, symbols) = store();
        let a = db.set_value(key(&symbols, AttrId::NONE, "a"), &AttrValue::Attrs);
        let b = db.set_value(key(&symbols, AttrId::NONE, "b"), &AttrValue::Attrs);

        let under_a = db.set_value(key(&symbols, a, "x"), &AttrValue::bool(true));
        let under_b = db.set_value(key(&symbols, b, "x"), &AttrValue::bool(false));

        assert_ne!(under_a, under_b);
        assert!(!db.is_disabled());
    }

    #[test]
    fn test_duplicate_insert_disables_store() {
        let (db, symbols) = store();
        let k = key(&symbols, AttrId::NONE, "dup");

        assert!(!db.set_value(k, &AttrValue::Misc).is_none());
        assert_eq!(db.set_value(k, &AttrValue::Missing), AttrId::NONE);
        assert!(db.is_disabled());
    }

    #[test]
    fn test_disabled_store_is_a_no_op() {
        let (db, symbols) = store();
        let k = key(&symbols, AttrId::NONE, "dup");
        db.set_failed(k);
        db.set_failed(k);
        assert!(db.is_disabled());

        // The row exists, but a disabled store no longer reads
        assert!(db.get_id(k).is_none());
        assert!(db.get_value(k).unwrap().is_none());
        assert_eq!(db.set_bool(key(&symbols, AttrId::NONE, "other"), true), AttrId::NONE);
        assert_eq!(db.replace_value(k, &AttrValue::Misc).unwrap(), AttrId::NONE);
        assert_eq!(db.set_if_absent(k, &AttrValue::Misc), AttrId::NONE);
        assert!(db.child_names(AttrId::NONE).is_empty());
        assert_eq!(db.stats().total(), 0);
        db.commit();
        assert!(db.is_disabled());
    }

    #[test]
    fn test_replace_value_keeps_id() {
        let (db, symbols) = store();
        let k = key(&symbols, AttrId::NONE, "later");

        let id = db.set_placeholder(k);
        let replaced = db.replace_value(k, &AttrValue::string("done")).unwrap();

        assert_eq!(id, replaced);
        assert_eq!(db.get_value(k).unwrap().unwrap(), (id, AttrValue::string("done")));
        assert_eq!(db.stats().total(), 1);
        assert!(!db.is_disabled());
    }

    #[test]
    fn test_replace_value_inserts_when_absent() {
        let (db, symbols) = store();
        let k = key(&symbols, AttrId::NONE, "fresh");
        let id = db.replace_value(k, &AttrValue::bool(false)).unwrap();
        assert_eq!(db.get_id(k), Some(id));
    }

    #[test]
    fn test_replace_value_leaves_resolved_rows_alone() {
        let (db, symbols) = store();
        let k = key(&symbols, AttrId::NONE, "s");
        let value = AttrValue::string_with_context("v", vec![("/p".to_string(), "o".to_string())]);
        let id = db.set_value(k, &value);

        let err = db.replace_value(k, &AttrValue::bool(false)).unwrap_err();
        assert!(matches!(
            err,
            Error::IllegalTransition {
                from: AttrType::String,
                to: AttrType::Bool,
                ..
            }
        ));
        assert_eq!(db.get_value(k).unwrap().unwrap(), (id, value));
        assert!(!db.is_disabled());
    }

    #[test]
    fn test_typed_setters() {
        let (db, symbols) = store();
        db.set_bool(key(&symbols, AttrId::NONE, "b"), false);
        db.set_placeholder(key(&symbols, AttrId::NONE, "p"));
        db.set_missing(key(&symbols, AttrId::NONE, "m"));
        db.set_misc(key(&symbols, AttrId::NONE, "o"));
        db.set_failed(key(&symbols, AttrId::NONE, "f"));

        let get = |name| db.get_value(key(&symbols, AttrId::NONE, name)).unwrap().unwrap().1;
        assert_eq!(get("b"), AttrValue::bool(false));
        assert_eq!(get("p"), AttrValue::Placeholder);
        assert_eq!(get("m"), AttrValue::Missing);
        assert_eq!(get("o"), AttrValue::Misc);
        assert_eq!(get("f"), AttrValue::Failed);
    }

    #[test]
    fn test_unknown_type_tag_is_fatal() {
        let (db, symbols) = store();
        let k = key(&symbols, AttrId::NONE, "weird");
        db.with_session("test", (), |session| {
            session
                .conn
                .execute("INSERT INTO Attributes (parent, name, type) VALUES (0, 'weird', 99)", [])
                .map(|_| ())
        });

        assert!(matches!(db.get_value(k), Err(Error::UnexpectedAttrType(99))));
        // Corruption is reported, not absorbed
        assert!(!db.is_disabled());
        assert_eq!(db.stats().unknown, 1);
    }

    #[test]
    fn test_child_names() {
        let (db, symbols) = store();
        let root = db.set_value(key(&symbols, AttrId::NONE, ""), &AttrValue::Attrs);
        db.set_bool(key(&symbols, root, "zeta"), true);
        db.set_bool(key(&symbols, root, "alpha"), true);

        assert_eq!(db.child_names(root), vec!["alpha".to_string(), "zeta".to_string()]);
        assert!(db.child_names(AttrId::new(9999)).is_empty());
    }

    #[test]
    fn test_stats() {
        let (db, symbols) = store();
        db.set_bool(key(&symbols, AttrId::NONE, "a"), true);
        db.set_bool(key(&symbols, AttrId::NONE, "b"), false);
        db.set_failed(key(&symbols, AttrId::NONE, "c"));

        let stats = db.stats();
        assert_eq!(stats.count(AttrType::Bool), 2);
        assert_eq!(stats.count(AttrType::Failed), 1);
        assert_eq!(stats.count(AttrType::String), 0);
        assert_eq!(stats.total(), 3);
        assert!(stats.to_string().contains("bool: 2"));
    }

    #[test]
    fn test_foreign_symbol_is_a_miss() {
        let (db, _symbols) = store();
        let other = SymbolTable::new();
        for name in ["a", "b", "c"] {
            other.create(name);
        }
        let foreign: Symbol = other.create("d");
        let k = AttrKey::new(AttrId::NONE, foreign);

        assert_eq!(db.set_value(k, &AttrValue::Misc), AttrId::NONE);
        assert!(db.get_value(k).unwrap().is_none());
        assert!(!db.is_disabled());
    }

    #[test]
    fn test_commit_persists_and_uncommitted_is_dropped_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.sqlite");

        {
            let symbols = Arc::new(SymbolTable::new());
            let db = AttrDb::open(&path, symbols.clone()).unwrap();
            db.set_bool(key(&symbols, AttrId::NONE, "committed"), true);
            db.commit();
            db.set_bool(key(&symbols, AttrId::NONE, "pending"), true);
            // Force the store into the failed state
            db.set_bool(key(&symbols, AttrId::NONE, "pending"), true);
            assert!(db.is_disabled());
        }

        let symbols = Arc::new(SymbolTable::new());
        let db = AttrDb::open(&path, symbols.clone()).unwrap();
        assert!(db.get_id(key(&symbols, AttrId::NONE, "committed")).is_some());
        assert!(db.get_id(key(&symbols, AttrId::NONE, "pending")).is_none());
    }

    #[test]
    fn test_drop_commits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.sqlite");

        {
            let symbols = Arc::new(SymbolTable::new());
            let db = AttrDb::open(&path, symbols.clone()).unwrap();
            db.set_missing(key(&symbols, AttrId::NONE, "gone"));
        }

        let symbols = Arc::new(SymbolTable::new());
        let db = AttrDb::open(&path, symbols.clone()).unwrap();
        assert_eq!(
            db.get_value(key(&symbols, AttrId::NONE, "gone")).unwrap().unwrap().1,
            AttrValue::Missing
        );
        assert_eq!(db.path(), Some(path.as_path()));
    }

    #[test]
    fn test_read_only_open_never_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.sqlite");

        {
            let symbols = Arc::new(SymbolTable::new());
            let db = AttrDb::open(&path, symbols.clone()).unwrap();
            db.set_bool(key(&symbols, AttrId::NONE, "kept"), true);
        }

        {
            let symbols = Arc::new(SymbolTable::new());
            let db = AttrDb::open_read_only(&path, symbols.clone()).unwrap();
            assert_eq!(
                db.get_value(key(&symbols, AttrId::NONE, "kept")).unwrap().unwrap().1,
                AttrValue::bool(true)
            );
            assert_eq!(db.stats().total(), 1);

            assert_eq!(db.set_misc(key(&symbols, AttrId::NONE, "new")), AttrId::NONE);
            assert!(db.is_disabled());
        }

        let symbols = Arc::new(SymbolTable::new());
        let db = AttrDb::open(&path, symbols.clone()).unwrap();
        assert!(db.get_id(key(&symbols, AttrId::NONE, "new")).is_none());
        assert_eq!(db.stats().total(), 1);
    }

    #[test]
    fn test_read_only_open_needs_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.sqlite");
        assert!(AttrDb::open_read_only(&path, Arc::new(SymbolTable::new())).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_custom_codec() {
        struct Reversed;
        impl ContextCodec for Reversed {
            fn encode(&self, path: &str, name: &str) -> String {
                format!("{}|{}", name, path)
            }
            fn decode(&self, token: &str) -> Result<(String, String)> {
                let (name, path) = token
                    .split_once('|')
                    .ok_or_else(|| Error::InvalidContext(token.to_string()))?;
                Ok((path.to_string(), name.to_string()))
            }
        }

        let symbols = Arc::new(SymbolTable::new());
        let db = AttrDb::open_in_memory(symbols.clone()).unwrap().with_codec(Reversed);
        let k = key(&symbols, AttrId::NONE, "s");
        let value = AttrValue::string_with_context("v", vec![("/p".to_string(), "out".to_string())]);
        db.set_value(k, &value);
        assert_eq!(db.get_value(k).unwrap().unwrap().1, value);
    }
}

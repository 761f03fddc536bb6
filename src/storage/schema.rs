//! Database schema definitions

/// SQL to create the attributes table.
///
/// One row per cached node. `(parent, name)` is unique: the store relies on
/// this constraint alone for consistency.
pub const CREATE_ATTRIBUTES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS Attributes (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    parent INTEGER NOT NULL,
    name TEXT,
    type INTEGER NOT NULL,
    value TEXT,
    context TEXT,
    UNIQUE (parent, name)
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS IndexByParent ON Attributes(parent, name)",
];

/// Pragmas for a cache database: it can always be rebuilt, so durability is traded for speed
pub const CACHE_PRAGMAS: &str = "PRAGMA synchronous = OFF;";

/// Journal mode for a cache database (ignored by in-memory databases)
pub const CACHE_JOURNAL_MODE: &str = "TRUNCATE";

pub const INSERT_ATTRIBUTE: &str =
    "INSERT INTO Attributes (parent, name, type, value) VALUES (?1, ?2, ?3, ?4)";

pub const INSERT_ATTRIBUTE_WITH_CONTEXT: &str =
    "INSERT INTO Attributes (parent, name, type, value, context) VALUES (?1, ?2, ?3, ?4, ?5)";

/// Overwrite a placeholder in place, keeping its row id. A row of any other
/// type is left alone and no id is returned.
pub const UPSERT_ATTRIBUTE: &str = r#"
INSERT INTO Attributes (parent, name, type, value, context) VALUES (?1, ?2, ?3, ?4, ?5)
ON CONFLICT (parent, name) DO UPDATE SET
    type = excluded.type,
    value = excluded.value,
    context = excluded.context
WHERE Attributes.type = 0
RETURNING id
"#;

pub const QUERY_ATTRIBUTE: &str =
    "SELECT id, type, value, context FROM Attributes WHERE parent = ?1 AND name = ?2";

pub const QUERY_ATTRIBUTES: &str =
    "SELECT name FROM Attributes WHERE parent = ?1 ORDER BY name";

pub const COUNT_BY_TYPE: &str =
    "SELECT type, COUNT(*) FROM Attributes GROUP BY type";

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![CREATE_ATTRIBUTES_TABLE];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}

use std::path::Path;

use rusqlite::{ffi, params, Connection, OptionalExtension};
use thiserror::Error;
use tracing::debug;

use crate::config::{ConfigError, GraphConfig};
use crate::graph::model::{CharacterId, RecordKind};

const GRAPH_SCHEMA_VERSION: i64 = 1;

const GRAPH_DB_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS graph_meta (
  id INTEGER PRIMARY KEY CHECK (id = 1),
  schema_version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS characters (
  character_id INTEGER PRIMARY KEY AUTOINCREMENT,
  slug TEXT NOT NULL UNIQUE,
  name TEXT NOT NULL,
  starred INTEGER NOT NULL DEFAULT 0,
  selected INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS vitals (
  vital_id INTEGER PRIMARY KEY AUTOINCREMENT,
  character_id INTEGER NOT NULL REFERENCES characters (character_id),
  name TEXT NOT NULL,
  value TEXT NOT NULL,
  UNIQUE (character_id, name)
);

CREATE TABLE IF NOT EXISTS relationships (
  relationship_id INTEGER PRIMARY KEY AUTOINCREMENT,
  from_character_id INTEGER NOT NULL REFERENCES characters (character_id),
  to_character_id INTEGER NOT NULL REFERENCES characters (character_id),
  label TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_relationships_from ON relationships (from_character_id);
CREATE INDEX IF NOT EXISTS idx_relationships_to ON relationships (to_character_id);
"#;

#[derive(Debug, Error)]
pub enum GraphDbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("{0}")]
    InvalidData(String),
    #[error("{kind} not found: {key}")]
    NotFound { kind: RecordKind, key: String },
    #[error("{field} {reason}")]
    Validation {
        field: &'static str,
        reason: &'static str,
    },
    #[error("no free slug for {base:?} after {attempts} attempts")]
    ConflictRetryExhausted { base: String, attempts: u32 },
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),
}

impl GraphDbError {
    pub(crate) fn not_found(kind: RecordKind, key: impl ToString) -> Self {
        Self::NotFound {
            kind,
            key: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _) if inner.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Trims `value` and rejects it when nothing is left.
pub(crate) fn require_non_empty<'a>(
    field: &'static str,
    value: &'a str,
) -> Result<&'a str, GraphDbError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(GraphDbError::Validation {
            field,
            reason: "must not be empty",
        });
    }
    Ok(trimmed)
}

pub(crate) fn resolve_slug(conn: &Connection, slug: &str) -> Result<Option<CharacterId>, GraphDbError> {
    let id = conn
        .query_row(
            "SELECT character_id FROM characters WHERE slug = ?1",
            params![slug],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(id.map(CharacterId))
}

pub(crate) fn require_character(conn: &Connection, id: CharacterId) -> Result<(), GraphDbError> {
    let found = conn
        .query_row(
            "SELECT 1 FROM characters WHERE character_id = ?1",
            params![id.0],
            |_| Ok(()),
        )
        .optional()?;
    match found {
        Some(()) => Ok(()),
        None => Err(GraphDbError::not_found(RecordKind::Character, id)),
    }
}

// One connection per instance. Writes shared across instances on a file run IMMEDIATE.
pub struct GraphDb {
    pub(crate) conn: Connection,
    pub(crate) max_slug_attempts: u32,
}

impl GraphDb {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GraphDbError> {
        Self::open_with(path, &GraphConfig::default())
    }

    pub fn open_with(path: impl AsRef<Path>, config: &GraphConfig) -> Result<Self, GraphDbError> {
        config.validate()?;
        let conn = Connection::open(path)?;
        conn.busy_timeout(config.busy_timeout())?;
        Self::init(conn, config.max_slug_attempts)
    }

    pub fn open_in_memory() -> Result<Self, GraphDbError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, GraphConfig::default().max_slug_attempts)
    }

    fn init(conn: Connection, max_slug_attempts: u32) -> Result<Self, GraphDbError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(GRAPH_DB_SCHEMA)?;
        let db = Self {
            conn,
            max_slug_attempts,
        };
        db.ensure_graph_meta()?;
        Ok(db)
    }

    fn ensure_graph_meta(&self) -> Result<(), GraphDbError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO graph_meta (id, schema_version) VALUES (1, ?1)",
            params![GRAPH_SCHEMA_VERSION],
        )?;
        let schema_version: i64 = self.conn.query_row(
            "SELECT schema_version FROM graph_meta WHERE id = 1",
            [],
            |row| row.get(0),
        )?;
        if schema_version != GRAPH_SCHEMA_VERSION {
            return Err(GraphDbError::InvalidData(format!(
                "graph_meta version mismatch (schema {}, expected {})",
                schema_version, GRAPH_SCHEMA_VERSION
            )));
        }
        debug!(schema_version, "graph schema ready");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reopening_a_file_keeps_the_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.db");

        let mut db = GraphDb::open(&path).unwrap();
        db.create_character("Harry Potter").unwrap();
        drop(db);

        let db = GraphDb::open(&path).unwrap();
        assert!(db.get_character("harry-potter").unwrap().is_some());
    }

    #[test]
    fn unknown_schema_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.db");

        let db = GraphDb::open(&path).unwrap();
        db.conn
            .execute("UPDATE graph_meta SET schema_version = 99 WHERE id = 1", [])
            .unwrap();
        drop(db);

        match GraphDb::open(&path) {
            Err(GraphDbError::InvalidData(message)) => assert!(message.contains("99")),
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("expected a version mismatch"),
        }
    }

    #[test]
    fn zero_slug_attempts_are_refused_at_open() {
        let dir = tempfile::tempdir().unwrap();
        let config = GraphConfig {
            db_path: dir.path().join("graph.db"),
            max_slug_attempts: 0,
            ..GraphConfig::default()
        };

        match GraphDb::open_with(&config.db_path, &config) {
            Err(GraphDbError::Config(ConfigError::Validation(message))) => {
                assert!(message.contains("max_slug_attempts"))
            }
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("expected a config error"),
        }
        assert!(!config.db_path.exists());
    }

    #[test]
    fn blank_values_fail_validation() {
        assert!(matches!(
            require_non_empty("label", "   "),
            Err(GraphDbError::Validation { field: "label", .. })
        ));
        assert_eq!(require_non_empty("label", "  Father ").unwrap(), "Father");
    }

    #[test]
    fn dangling_edges_are_refused_by_the_store() {
        let db = GraphDb::open_in_memory().unwrap();
        let err = db
            .conn
            .execute(
                "INSERT INTO relationships (from_character_id, to_character_id, label) VALUES (1, 2, 'x')",
                [],
            )
            .unwrap_err();
        assert!(!is_unique_violation(&err));
        assert!(matches!(
            err,
            rusqlite::Error::SqliteFailure(inner, _)
                if inner.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY
        ));
    }
}

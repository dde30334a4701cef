//! SQLite-backed registry of persons, name variants, meta facts, and the
//! conflict/failure logs.
//!
//! The store is the single writer; uniqueness is enforced here (not in the
//! resolver) so that at most one canonical row per key exists even if a
//! category is loaded twice. Expected constraint hits surface as
//! `StoreError::UniqueViolation` for the caller to route, never as panics.

use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;
use thiserror::Error;

use crate::models::{
    EntityOp, IssueKind, IssueRecord, IssueStatus, LoadCtx, NameComponents, NameType, Person,
    Role,
};
use crate::normalize::norm;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violation")]
    UniqueViolation,
    #[error("record not found")]
    NotFound,
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// SQLITE_CONSTRAINT_UNIQUE / SQLITE_CONSTRAINT_PRIMARYKEY extended codes.
fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(f, _)
            if f.code == ErrorCode::ConstraintViolation
                && (f.extended_code == 2067 || f.extended_code == 1555)
    )
}

// ============================================================================
// Schema
// ============================================================================

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS persons (
        id            INTEGER PRIMARY KEY,
        name          TEXT NOT NULL,
        disamb        TEXT NOT NULL DEFAULT '',
        alt_name      TEXT,
        title         TEXT,
        first_name    TEXT,
        middle_name   TEXT,
        last_prefix   TEXT,
        last_name     TEXT,
        suffix        TEXT,
        is_composer   INTEGER NOT NULL DEFAULT 0,
        is_conductor  INTEGER NOT NULL DEFAULT 0,
        is_performer  INTEGER NOT NULL DEFAULT 0,
        is_canonical  INTEGER NOT NULL DEFAULT 0,
        cnl_person_id INTEGER REFERENCES persons(id),
        tags          TEXT NOT NULL DEFAULT '[]',
        notes         TEXT NOT NULL DEFAULT '[]',
        born          TEXT,
        died          TEXT,
        country       TEXT,
        epoch         TEXT,
        source        TEXT,
        source_date   TEXT,
        created_at    TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at    TEXT NOT NULL DEFAULT (datetime('now'))
    );
    -- duplicate names must be disambiguatable
    CREATE UNIQUE INDEX IF NOT EXISTS idx_persons_key ON persons (name, disamb);
    CREATE INDEX IF NOT EXISTS idx_persons_alt_name ON persons (alt_name);

    CREATE TABLE IF NOT EXISTS person_meta (
        id          INTEGER PRIMARY KEY,
        person_id   INTEGER NOT NULL REFERENCES persons(id),
        key         TEXT NOT NULL,
        value       TEXT,
        source      TEXT,
        source_date TEXT,
        created_at  TEXT NOT NULL DEFAULT (datetime('now'))
    );
    CREATE UNIQUE INDEX IF NOT EXISTS idx_person_meta_key
        ON person_meta (person_id, key, source);

    CREATE TABLE IF NOT EXISTS person_names (
        id            INTEGER PRIMARY KEY,
        name_str      TEXT NOT NULL,
        name_str_norm TEXT NOT NULL,
        name_type     TEXT,
        source        TEXT NOT NULL DEFAULT '',
        source_date   TEXT,
        person_id     INTEGER REFERENCES persons(id),
        person_res    TEXT,
        created_at    TEXT NOT NULL DEFAULT (datetime('now'))
    );
    CREATE UNIQUE INDEX IF NOT EXISTS idx_person_names_key
        ON person_names (name_str, source);
    CREATE INDEX IF NOT EXISTS idx_person_names_norm ON person_names (name_str_norm);

    CREATE TABLE IF NOT EXISTS conflicts (
        id          INTEGER PRIMARY KEY,
        entity_name TEXT NOT NULL,
        entity_str  TEXT NOT NULL,
        entity_info TEXT NOT NULL,
        operation   TEXT NOT NULL,
        status      TEXT NOT NULL DEFAULT 'open',
        parent_id   INTEGER,
        created_at  TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
    );
    CREATE INDEX IF NOT EXISTS idx_conflicts_key
        ON conflicts (entity_name, operation, entity_str);

    CREATE TABLE IF NOT EXISTS failures (
        id          INTEGER PRIMARY KEY,
        entity_name TEXT NOT NULL,
        entity_str  TEXT NOT NULL,
        entity_info TEXT NOT NULL,
        operation   TEXT NOT NULL,
        status      TEXT NOT NULL DEFAULT 'open',
        parent_id   INTEGER,
        created_at  TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
    );
    CREATE INDEX IF NOT EXISTS idx_failures_key
        ON failures (entity_name, operation, entity_str);
";

const DROP_ALL: &str = "
    DROP TABLE IF EXISTS person_meta;
    DROP TABLE IF EXISTS person_names;
    DROP TABLE IF EXISTS conflicts;
    DROP TABLE IF EXISTS failures;
    DROP TABLE IF EXISTS persons;
";

const PERSON_COLS: &str = "id, name, disamb, alt_name, title, first_name, middle_name, \
     last_prefix, last_name, suffix, is_composer, is_conductor, is_performer, is_canonical, \
     cnl_person_id, tags, notes, born, died, country, epoch, source, source_date";

fn person_from_row(row: &Row) -> rusqlite::Result<Person> {
    let tags: String = row.get(15)?;
    let notes: String = row.get(16)?;
    Ok(Person {
        id: Some(row.get(0)?),
        name: row.get(1)?,
        disamb: row.get(2)?,
        alt_name: row.get(3)?,
        comps: NameComponents {
            title: row.get(4)?,
            first_name: row.get(5)?,
            middle_name: row.get(6)?,
            last_prefix: row.get(7)?,
            last_name: row.get(8)?,
            suffix: row.get(9)?,
        },
        is_composer: row.get(10)?,
        is_conductor: row.get(11)?,
        is_performer: row.get(12)?,
        is_canonical: row.get(13)?,
        cnl_person_id: row.get(14)?,
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        notes: serde_json::from_str(&notes).unwrap_or_default(),
        born: row.get(17)?,
        died: row.get(18)?,
        country: row.get(19)?,
        epoch: row.get(20)?,
        source: row.get(21)?,
        source_date: row.get(22)?,
    })
}

// ============================================================================
// Store
// ============================================================================

/// Connection wrapper exposing exactly the operations the resolver and the
/// triage CLI need: unique-keyed inserts, exact and normalized lookups,
/// role-flag updates, and the append-only issue logs.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )?;
        Ok(Store { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Store { conn })
    }

    /// Create all tables. With `force`, existing tables are dropped first.
    pub fn create_schema(&self, force: bool) -> Result<(), StoreError> {
        if force {
            self.conn.execute_batch(DROP_ALL)?;
        }
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // persons
    // ------------------------------------------------------------------

    /// Insert a new person row. A (name, disamb) collision maps to
    /// `StoreError::UniqueViolation` for the resolver to route to the
    /// conflict log.
    pub fn insert_person(&self, p: &Person) -> Result<i64, StoreError> {
        let tags = serde_json::to_string(&p.tags)?;
        let notes = serde_json::to_string(&p.notes)?;
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO persons (name, disamb, alt_name, title, first_name, middle_name,
                 last_prefix, last_name, suffix, is_composer, is_conductor, is_performer,
                 is_canonical, cnl_person_id, tags, notes, born, died, country, epoch,
                 source, source_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                 ?16, ?17, ?18, ?19, ?20, ?21, ?22)",
        )?;
        stmt.execute(params![
            p.name,
            p.disamb,
            p.alt_name,
            p.comps.title,
            p.comps.first_name,
            p.comps.middle_name,
            p.comps.last_prefix,
            p.comps.last_name,
            p.comps.suffix,
            p.is_composer,
            p.is_conductor,
            p.is_performer,
            p.is_canonical,
            p.cnl_person_id,
            tags,
            notes,
            p.born,
            p.died,
            p.country,
            p.epoch,
            p.source,
            p.source_date,
        ])
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::UniqueViolation
            } else {
                StoreError::Sqlite(e)
            }
        })?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Exact lookup by identity key.
    pub fn person_by_key(&self, name: &str, disamb: &str) -> Result<Person, StoreError> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {PERSON_COLS} FROM persons WHERE name = ?1 AND disamb = ?2"
        ))?;
        stmt.query_row(params![name, disamb], person_from_row)
            .optional()?
            .ok_or(StoreError::NotFound)
    }

    pub fn person_by_id(&self, id: i64) -> Result<Person, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("SELECT {PERSON_COLS} FROM persons WHERE id = ?1"))?;
        stmt.query_row(params![id], person_from_row)
            .optional()?
            .ok_or(StoreError::NotFound)
    }

    /// Promote a role flag to true; a no-op when already set.
    pub fn set_role_flag(&self, person_id: i64, role: Role) -> Result<(), StoreError> {
        let column = match role {
            Role::Composer => "is_composer",
            Role::Conductor => "is_conductor",
            Role::Performer => "is_performer",
        };
        let n = self.conn.execute(
            &format!(
                "UPDATE persons SET {column} = 1, updated_at = datetime('now') WHERE id = ?1"
            ),
            params![person_id],
        )?;
        if n == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    pub fn person_count(&self) -> Result<i64, StoreError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM persons", [], |row| row.get(0))?)
    }

    // ------------------------------------------------------------------
    // person_names
    // ------------------------------------------------------------------

    /// Look up the person owning a literal name string from the given source.
    /// At most one row can exist (unique on (name_str, source)).
    pub fn find_by_name_str(
        &self,
        name_str: &str,
        source: &str,
    ) -> Result<Option<Person>, StoreError> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {PERSON_COLS} FROM persons
             WHERE id = (SELECT person_id FROM person_names
                         WHERE name_str = ?1 AND source = ?2 AND person_id IS NOT NULL)"
        ))?;
        Ok(stmt
            .query_row(params![name_str, source], person_from_row)
            .optional()?)
    }

    /// All distinct persons with a name variant whose normalized form matches,
    /// restricted to the given source. More than one result is a pre-existing
    /// ambiguity the caller must surface.
    pub fn find_by_name_norm(
        &self,
        name_norm: &str,
        source: &str,
    ) -> Result<Vec<Person>, StoreError> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {PERSON_COLS} FROM persons
             WHERE id IN (SELECT DISTINCT person_id FROM person_names
                          WHERE name_str_norm = ?1 AND source = ?2
                            AND person_id IS NOT NULL)
             ORDER BY id"
        ))?;
        let rows = stmt.query_map(params![name_norm, source], person_from_row)?;
        let mut persons = Vec::new();
        for row in rows {
            persons.push(row?);
        }
        Ok(persons)
    }

    /// Record one name-variant string. Returns false when the same literal
    /// string from the same source is already present (expected, silent).
    pub fn insert_person_name(
        &self,
        person_id: i64,
        name_str: &str,
        name_type: NameType,
        ctx: &LoadCtx,
        person_res: &str,
    ) -> Result<bool, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO person_names (name_str, name_str_norm, name_type, source,
                 source_date, person_id, person_res)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        match stmt.execute(params![
            name_str,
            norm(name_str),
            name_type.as_str(),
            ctx.source,
            ctx.source_date,
            person_id,
            person_res,
        ]) {
            Ok(_) => Ok(true),
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    pub fn person_name_count(&self) -> Result<i64, StoreError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM person_names", [], |row| row.get(0))?)
    }

    // ------------------------------------------------------------------
    // person_meta
    // ------------------------------------------------------------------

    /// Record one side fact. Returns false when the same (person, key, source)
    /// fact already exists (expected on replays, silent).
    pub fn insert_person_meta(
        &self,
        person_id: i64,
        key: &str,
        value: &str,
        ctx: &LoadCtx,
    ) -> Result<bool, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO person_meta (person_id, key, value, source, source_date)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        match stmt.execute(params![person_id, key, value, ctx.source, ctx.source_date]) {
            Ok(_) => Ok(true),
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    pub fn person_meta_count(&self) -> Result<i64, StoreError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM person_meta", [], |row| row.get(0))?)
    }

    // ------------------------------------------------------------------
    // conflicts / failures
    // ------------------------------------------------------------------

    /// Append a row to the conflict or failure log. These are diagnostic
    /// records; the resolution logic never reads them back.
    pub fn record_issue(
        &self,
        kind: IssueKind,
        entity_name: &str,
        entity_str: &str,
        entity_info: &serde_json::Value,
        operation: EntityOp,
    ) -> Result<i64, StoreError> {
        self.conn.execute(
            &format!(
                "INSERT INTO {} (entity_name, entity_str, entity_info, operation)
                 VALUES (?1, ?2, ?3, ?4)",
                kind.table()
            ),
            params![
                entity_name,
                entity_str,
                entity_info.to_string(),
                operation.as_str()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_issues(
        &self,
        kind: IssueKind,
        status: Option<IssueStatus>,
    ) -> Result<Vec<IssueRecord>, StoreError> {
        let sql = match status {
            Some(_) => format!(
                "SELECT id, entity_name, entity_str, entity_info, operation, status,
                     parent_id, created_at
                 FROM {} WHERE status = ?1 ORDER BY id",
                kind.table()
            ),
            None => format!(
                "SELECT id, entity_name, entity_str, entity_info, operation, status,
                     parent_id, created_at
                 FROM {} ORDER BY id",
                kind.table()
            ),
        };
        let mut stmt = self.conn.prepare(&sql)?;
        let map_row = |row: &Row| -> rusqlite::Result<IssueRecord> {
            let info: String = row.get(3)?;
            Ok(IssueRecord {
                id: row.get(0)?,
                entity_name: row.get(1)?,
                entity_str: row.get(2)?,
                entity_info: serde_json::from_str(&info)
                    .unwrap_or(serde_json::Value::String(info)),
                operation: row.get(4)?,
                status: row.get(5)?,
                parent_id: row.get(6)?,
                created_at: row.get(7)?,
            })
        };
        let rows = match status {
            Some(s) => stmt.query_map(params![s.as_str()], map_row)?,
            None => stmt.query_map([], map_row)?,
        };
        let mut issues = Vec::new();
        for row in rows {
            issues.push(row?);
        }
        Ok(issues)
    }

    /// Human-triage mutation path: status change plus optional link to the
    /// record the issue was resolved into.
    pub fn set_issue_status(
        &self,
        kind: IssueKind,
        id: i64,
        status: IssueStatus,
        parent_id: Option<i64>,
    ) -> Result<(), StoreError> {
        let n = self.conn.execute(
            &format!(
                "UPDATE {} SET status = ?1, parent_id = COALESCE(?2, parent_id),
                     updated_at = datetime('now')
                 WHERE id = ?3",
                kind.table()
            ),
            params![status.as_str(), parent_id, id],
        )?;
        if n == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

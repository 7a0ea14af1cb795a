//! SQLite-backed translation store.
//! A single connection behind a mutex; statements are short and never held
//! across an await point. Every call runs the query synchronously on the
//! calling task's worker thread, so it blocks that thread for the duration
//! of one statement.

use std::path::Path;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use tracing::{debug, info};

use super::{StoreError, TranslationStore};
use crate::models::{now_unix_millis, NewTranslation, Translation, TranslationEdit, TranslationStatus};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS post_translations (
        id TEXT PRIMARY KEY,
        post_id TEXT NOT NULL,
        language_code TEXT NOT NULL,
        title TEXT NOT NULL,
        slug TEXT NOT NULL,
        content TEXT NOT NULL,
        excerpt TEXT,
        meta_title TEXT,
        meta_description TEXT,
        status TEXT NOT NULL,
        is_machine_translated INTEGER NOT NULL DEFAULT 1,
        is_published INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    );
    CREATE UNIQUE INDEX IF NOT EXISTS idx_translation_pair
        ON post_translations(post_id, language_code);
    CREATE INDEX IF NOT EXISTS idx_translation_updated
        ON post_translations(updated_at);";

const COLUMNS: &str = "id, post_id, language_code, title, slug, content, excerpt,
     meta_title, meta_description, status, is_machine_translated, is_published,
     created_at, updated_at";

pub struct SqliteTranslationStore {
    conn: Mutex<Connection>,
}

impl SqliteTranslationStore {
    /// Open (or create) the database at the given path.
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)
            .map_err(|e| StoreError::Database(format!("failed to open {}: {e}", db_path.display())))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(db_err)?;

        let store = Self::with_connection(conn)?;
        info!(path = %db_path.display(), "translation store opened");
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn get_by_id(conn: &Connection, id: &str) -> Result<Option<Translation>, StoreError> {
        conn.query_row(
            &format!("SELECT {COLUMNS} FROM post_translations WHERE id = ?1"),
            params![id],
            row_to_translation,
        )
        .optional()
        .map_err(db_err)
    }
}

#[async_trait]
impl TranslationStore for SqliteTranslationStore {
    async fn list_all(&self) -> Result<Vec<Translation>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {COLUMNS} FROM post_translations
                 ORDER BY updated_at DESC, rowid DESC"
            ))
            .map_err(db_err)?;

        let rows = stmt
            .query_map([], row_to_translation)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;

        debug!(count = rows.len(), "translations listed");
        Ok(rows)
    }

    async fn find(&self, post_id: &str, language: &str) -> Result<Option<Translation>, StoreError> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!(
                "SELECT {COLUMNS} FROM post_translations
                 WHERE post_id = ?1 AND language_code = ?2"
            ),
            params![post_id, language],
            row_to_translation,
        )
        .optional()
        .map_err(db_err)
    }

    async fn insert(&self, row: NewTranslation) -> Result<Translation, StoreError> {
        let conn = self.conn.lock();
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_unix_millis();

        let result = conn.execute(
            "INSERT INTO post_translations
             (id, post_id, language_code, title, slug, content, excerpt,
              meta_title, meta_description, status, is_machine_translated,
              is_published, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
            params![
                id,
                row.post_id,
                row.language_code,
                row.title,
                row.slug,
                row.content,
                row.excerpt,
                row.meta_title,
                row.meta_description,
                row.status.as_str(),
                row.is_machine_translated as i32,
                row.is_published as i32,
                now,
            ],
        );

        match result {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _)) if err.code == ErrorCode::ConstraintViolation => {
                return Err(StoreError::Duplicate(row.key()));
            }
            Err(e) => return Err(db_err(e)),
        }

        debug!(id = %id, key = %row.key(), "translation inserted");
        Self::get_by_id(&conn, &id)?.ok_or(StoreError::NotFound(id))
    }

    async fn update(&self, id: &str, edit: &TranslationEdit) -> Result<Translation, StoreError> {
        let conn = self.conn.lock();
        let changed = conn
            .execute(
                "UPDATE post_translations SET
                    title = COALESCE(?2, title),
                    slug = COALESCE(?3, slug),
                    content = COALESCE(?4, content),
                    excerpt = COALESCE(?5, excerpt),
                    meta_title = COALESCE(?6, meta_title),
                    meta_description = COALESCE(?7, meta_description),
                    updated_at = ?8
                 WHERE id = ?1",
                params![
                    id,
                    edit.title,
                    edit.slug,
                    edit.content,
                    edit.excerpt,
                    edit.meta_title,
                    edit.meta_description,
                    now_unix_millis(),
                ],
            )
            .map_err(db_err)?;

        if changed == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Self::get_by_id(&conn, id)?.ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn set_published(&self, id: &str, published: bool) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let changed = conn
            .execute(
                "UPDATE post_translations SET is_published = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, published as i32, now_unix_millis()],
            )
            .map_err(db_err)?;

        if changed == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let changed = conn
            .execute("DELETE FROM post_translations WHERE id = ?1", params![id])
            .map_err(db_err)?;

        if changed == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        debug!(id, "translation deleted");
        Ok(())
    }
}

fn row_to_translation(row: &Row<'_>) -> rusqlite::Result<Translation> {
    let status_raw: String = row.get(9)?;
    let status = TranslationStatus::parse(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            9,
            rusqlite::types::Type::Text,
            Box::new(StoreError::Corrupt(format!("unknown status {status_raw:?}"))),
        )
    })?;

    Ok(Translation {
        id: row.get(0)?,
        post_id: row.get(1)?,
        language_code: row.get(2)?,
        title: row.get(3)?,
        slug: row.get(4)?,
        content: row.get(5)?,
        excerpt: row.get(6)?,
        meta_title: row.get(7)?,
        meta_description: row.get(8)?,
        status,
        is_machine_translated: row.get::<_, i32>(10)? != 0,
        is_published: row.get::<_, i32>(11)? != 0,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

fn db_err(e: rusqlite::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

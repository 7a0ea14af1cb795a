//! Translation store: one persisted row per (post, language).

pub mod sqlite;

use async_trait::async_trait;

use crate::models::{NewTranslation, Translation, TranslationEdit, TranslationKey};

pub use sqlite::SqliteTranslationStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store database error: {0}")]
    Database(String),
    #[error("translation {0} not found")]
    NotFound(String),
    #[error("translation for {0} already exists")]
    Duplicate(TranslationKey),
    #[error("corrupt translation row: {0}")]
    Corrupt(String),
}

/// Row-oriented access to the translations table.
///
/// Implementations may block the calling worker thread while a statement
/// runs (the SQLite store does); callers keep the calls short and never hold
/// manager locks across them.
#[async_trait]
pub trait TranslationStore: Send + Sync {
    /// Every row, most recently updated first.
    async fn list_all(&self) -> Result<Vec<Translation>, StoreError>;

    async fn find(&self, post_id: &str, language: &str) -> Result<Option<Translation>, StoreError>;

    /// Fails with [`StoreError::Duplicate`] when the pair already has a row.
    async fn insert(&self, row: NewTranslation) -> Result<Translation, StoreError>;

    async fn update(&self, id: &str, edit: &TranslationEdit) -> Result<Translation, StoreError>;

    async fn set_published(&self, id: &str, published: bool) -> Result<(), StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

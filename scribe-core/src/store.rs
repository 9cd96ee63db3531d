//! Note store: durable CRUD for `SessionNote` records.
//!
//! `PgNoteStore` is the production backend. `MemoryNoteStore` keeps records in
//! process memory with the same id and mutation rules, for tests and local
//! runs without a database.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::Mutex;

use crate::contracts::NewSessionNote;
use crate::error::{Result, ScribeError};
use crate::models::SessionNote;

const NOTE_COLUMNS: &str = "id, session_duration, session_type, draft_note, generated_note, \
                            final_note, created_at, updated_at";

#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Persist a new draft and return it with its assigned id and `created_at`.
    async fn insert(&self, note: &NewSessionNote) -> Result<SessionNote>;

    async fn get_by_id(&self, id: i64) -> Result<Option<SessionNote>>;

    /// Record the generated text. Fails with `NotFound` for an unknown id and
    /// `AlreadyGenerated` if the note already carries a generated note.
    async fn update_generated_note(&self, id: i64, text: &str) -> Result<SessionNote>;

    /// Overwrite the final note. `Ok(None)` when no record has this id.
    async fn update_final_note(&self, id: i64, text: &str) -> Result<Option<SessionNote>>;

    /// Short description of the backing store, or an error if it is unreachable.
    async fn health(&self) -> Result<String>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// PostgreSQL
// ============================================================================

#[derive(Debug, Clone)]
pub struct PgNoteStore {
    pool: PgPool,
}

impl PgNoteStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl NoteStore for PgNoteStore {
    async fn insert(&self, note: &NewSessionNote) -> Result<SessionNote> {
        let sql = format!(
            "INSERT INTO session_notes (session_duration, session_type, draft_note) \
             VALUES ($1, $2, $3) RETURNING {}",
            NOTE_COLUMNS
        );
        let row: SessionNote = sqlx::query_as(&sql)
            .bind(note.session_duration)
            .bind(&note.session_type)
            .bind(&note.draft_note)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<SessionNote>> {
        let sql = format!("SELECT {} FROM session_notes WHERE id = $1", NOTE_COLUMNS);
        let row: Option<SessionNote> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_generated_note(&self, id: i64, text: &str) -> Result<SessionNote> {
        let sql = format!(
            "UPDATE session_notes SET generated_note = $2, updated_at = now() \
             WHERE id = $1 AND generated_note IS NULL RETURNING {}",
            NOTE_COLUMNS
        );
        let row: Option<SessionNote> = sqlx::query_as(&sql)
            .bind(id)
            .bind(text)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(note) => Ok(note),
            None => match self.get_by_id(id).await? {
                Some(_) => Err(ScribeError::AlreadyGenerated(id)),
                None => Err(ScribeError::NotFound(id)),
            },
        }
    }

    async fn update_final_note(&self, id: i64, text: &str) -> Result<Option<SessionNote>> {
        let sql = format!(
            "UPDATE session_notes SET final_note = $2, updated_at = now() \
             WHERE id = $1 RETURNING {}",
            NOTE_COLUMNS
        );
        let row: Option<SessionNote> = sqlx::query_as(&sql)
            .bind(id)
            .bind(text)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn health(&self) -> Result<String> {
        Ok(crate::db::health_check(&self.pool).await?)
    }

    fn name(&self) -> &str {
        "postgres"
    }
}

// ============================================================================
// In-memory
// ============================================================================

#[derive(Debug, Default)]
struct MemoryState {
    last_id: i64,
    notes: BTreeMap<i64, SessionNote>,
}

#[derive(Debug, Default)]
pub struct MemoryNoteStore {
    state: Mutex<MemoryState>,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.notes.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl NoteStore for MemoryNoteStore {
    async fn insert(&self, note: &NewSessionNote) -> Result<SessionNote> {
        let mut state = self.state.lock().await;
        state.last_id += 1;
        let record = SessionNote {
            id: state.last_id,
            session_duration: note.session_duration,
            session_type: note.session_type.clone(),
            draft_note: note.draft_note.clone(),
            generated_note: None,
            final_note: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        state.notes.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<SessionNote>> {
        Ok(self.state.lock().await.notes.get(&id).cloned())
    }

    async fn update_generated_note(&self, id: i64, text: &str) -> Result<SessionNote> {
        let mut state = self.state.lock().await;
        let note = state.notes.get_mut(&id).ok_or(ScribeError::NotFound(id))?;
        if note.generated_note.is_some() {
            return Err(ScribeError::AlreadyGenerated(id));
        }
        note.generated_note = Some(text.to_string());
        note.updated_at = Some(Utc::now());
        Ok(note.clone())
    }

    async fn update_final_note(&self, id: i64, text: &str) -> Result<Option<SessionNote>> {
        let mut state = self.state.lock().await;
        Ok(state.notes.get_mut(&id).map(|note| {
            note.final_note = Some(text.to_string());
            note.updated_at = Some(Utc::now());
            note.clone()
        }))
    }

    async fn health(&self) -> Result<String> {
        Ok("in-memory".to_string())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

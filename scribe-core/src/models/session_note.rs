use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A clinician's session note as persisted in `session_notes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SessionNote {
    pub id: i64,
    /// Minutes.
    pub session_duration: i32,
    pub session_type: String,
    pub draft_note: String,
    pub generated_note: Option<String>,
    pub final_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Lifecycle position of a note, derived from which text fields are populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteStatus {
    Draft,
    Generated,
    Finalized,
}

impl SessionNote {
    /// A finalized note stays finalized even if generation never succeeded.
    pub fn status(&self) -> NoteStatus {
        if self.final_note.is_some() {
            NoteStatus::Finalized
        } else if self.generated_note.is_some() {
            NoteStatus::Generated
        } else {
            NoteStatus::Draft
        }
    }
}

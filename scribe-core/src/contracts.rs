//! Request / response shapes for the session-note API.
//!
//! Request fields are optional at the serde level so that a missing field is
//! reported as a [`ScribeError::Validation`] with a readable message instead of
//! a framework deserialization rejection.

use serde::{Deserialize, Serialize};

use crate::error::ScribeError;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CreateNoteRequest {
    pub session_duration: Option<i32>,
    pub session_type: Option<String>,
    /// The clinician's draft; stored as `draft_note`.
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FinalizeNoteRequest {
    pub final_note: Option<String>,
}

/// A create request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSessionNote {
    pub session_duration: i32,
    pub session_type: String,
    pub draft_note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateNoteResponse {
    pub note_id: i64,
    pub generated_note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeNoteResponse {
    pub note_id: i64,
    pub final_note: String,
}

impl CreateNoteRequest {
    pub fn validate(self) -> Result<NewSessionNote, ScribeError> {
        let session_duration = self
            .session_duration
            .ok_or_else(|| missing("session_duration"))?;
        if session_duration < 1 {
            return Err(ScribeError::Validation(format!(
                "session_duration must be a positive number of minutes, got {}",
                session_duration
            )));
        }

        let session_type = required_text("session_type", self.session_type)?;
        let draft_note = required_text("notes", self.notes)?;

        Ok(NewSessionNote {
            session_duration,
            session_type,
            draft_note,
        })
    }
}

impl FinalizeNoteRequest {
    pub fn validate(self) -> Result<String, ScribeError> {
        required_text("final_note", self.final_note)
    }
}

fn missing(field: &str) -> ScribeError {
    ScribeError::Validation(format!("{} field is required", field))
}

/// Blank text and NUL bytes (unstorable in PostgreSQL `TEXT`) are rejected;
/// accepted text is returned untouched.
fn required_text(field: &str, value: Option<String>) -> Result<String, ScribeError> {
    match value {
        Some(v) if v.contains('\0') => Err(ScribeError::Validation(format!(
            "{} must not contain NUL characters",
            field
        ))),
        Some(v) if !v.trim().is_empty() => Ok(v),
        Some(_) => Err(ScribeError::Validation(format!(
            "{} must not be empty",
            field
        ))),
        None => Err(missing(field)),
    }
}

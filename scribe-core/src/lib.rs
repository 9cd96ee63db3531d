pub mod config;
pub mod contracts;
pub mod db;
pub mod error;
pub mod llm;
pub mod models;
pub mod service;
pub mod store;

pub use config::ScribeConfig;
pub use error::ScribeError;
pub use llm::{GeneratorConfig, NoteGenerator, OpenAiNoteGenerator, TransformationError};
pub use models::{NoteStatus, SessionNote};
pub use service::NoteService;
pub use store::{MemoryNoteStore, NoteStore, PgNoteStore};

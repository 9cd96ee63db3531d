pub mod session_note;

pub use session_note::{NoteStatus, SessionNote};

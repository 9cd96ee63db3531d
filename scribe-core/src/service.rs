//! Note lifecycle: DRAFT -> GENERATED -> FINALIZED.
//!
//! `create_note` persists the draft before calling the generator and writes the
//! generated text back afterwards, strictly in that order. A failed generation
//! leaves the draft in place. `finalize_note` is allowed from either DRAFT or
//! GENERATED and may be repeated.

use std::sync::Arc;

use crate::contracts::{
    CreateNoteRequest, CreateNoteResponse, FinalizeNoteRequest, FinalizeNoteResponse,
};
use crate::error::{Result, ScribeError};
use crate::llm::NoteGenerator;
use crate::models::SessionNote;
use crate::store::NoteStore;

#[derive(Clone)]
pub struct NoteService {
    store: Arc<dyn NoteStore>,
    generator: Arc<dyn NoteGenerator>,
}

impl NoteService {
    pub fn new(store: Arc<dyn NoteStore>, generator: Arc<dyn NoteGenerator>) -> Self {
        Self { store, generator }
    }

    pub fn store(&self) -> &dyn NoteStore {
        self.store.as_ref()
    }

    pub async fn create_note(&self, request: CreateNoteRequest) -> Result<CreateNoteResponse> {
        let new_note = request.validate()?;

        let note = self.store.insert(&new_note).await?;
        tracing::info!(
            note_id = note.id,
            session_type = %note.session_type,
            "Session note draft stored"
        );

        let generated = match self.generator.transform(&note.draft_note).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(
                    note_id = note.id,
                    generator = self.generator.name(),
                    error = %e,
                    "Note generation failed, draft kept without generated note"
                );
                return Err(ScribeError::GenerationFailed {
                    note_id: note.id,
                    source: e,
                });
            }
        };

        let note = self.store.update_generated_note(note.id, &generated).await?;
        tracing::info!(note_id = note.id, "Generated note stored");

        Ok(CreateNoteResponse {
            note_id: note.id,
            generated_note: generated,
        })
    }

    pub async fn finalize_note(
        &self,
        note_id: i64,
        request: FinalizeNoteRequest,
    ) -> Result<FinalizeNoteResponse> {
        let final_text = request.validate()?;

        let note = match self.store.update_final_note(note_id, &final_text).await? {
            Some(note) => note,
            None => {
                tracing::warn!(note_id, "Finalize requested for unknown session note");
                return Err(ScribeError::NotFound(note_id));
            }
        };
        tracing::info!(note_id, "Session note finalized");

        Ok(FinalizeNoteResponse {
            note_id: note.id,
            final_note: note.final_note.unwrap_or(final_text),
        })
    }

    pub async fn get_note(&self, note_id: i64) -> Result<SessionNote> {
        self.store
            .get_by_id(note_id)
            .await?
            .ok_or(ScribeError::NotFound(note_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::TransformationError;
    use crate::models::NoteStatus;
    use crate::store::MemoryNoteStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Echoes the draft with a fixed prefix.
    #[derive(Default)]
    struct PrefixGenerator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl NoteGenerator for PrefixGenerator {
        async fn transform(&self, draft_note: &str) -> std::result::Result<String, TransformationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("Processed: {}", draft_note))
        }

        fn name(&self) -> &str {
            "prefix"
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl NoteGenerator for FailingGenerator {
        async fn transform(&self, _draft_note: &str) -> std::result::Result<String, TransformationError> {
            Err(TransformationError::Api {
                code: 500,
                message: "upstream unavailable".to_string(),
            })
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn service_with(generator: Arc<dyn NoteGenerator>) -> (NoteService, Arc<MemoryNoteStore>) {
        let store = Arc::new(MemoryNoteStore::new());
        (NoteService::new(store.clone(), generator), store)
    }

    fn create_request(notes: &str) -> CreateNoteRequest {
        CreateNoteRequest {
            session_duration: Some(50),
            session_type: Some("individual".to_string()),
            notes: Some(notes.to_string()),
        }
    }

    fn finalize_request(text: &str) -> FinalizeNoteRequest {
        FinalizeNoteRequest {
            final_note: Some(text.to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_returns_generated_note() {
        let (service, store) = service_with(Arc::new(PrefixGenerator::default()));

        let resp = service
            .create_note(create_request("Client engaged in..."))
            .await
            .unwrap();

        assert_eq!(resp.note_id, 1);
        assert_eq!(resp.generated_note, "Processed: Client engaged in...");

        let stored = store.get_by_id(1).await.unwrap().unwrap();
        assert_eq!(stored.draft_note, "Client engaged in...");
        assert_eq!(stored.generated_note.as_deref(), Some("Processed: Client engaged in..."));
        assert_eq!(stored.status(), NoteStatus::Generated);
    }

    #[tokio::test]
    async fn test_invalid_create_persists_nothing_and_skips_generator() {
        let generator = Arc::new(PrefixGenerator::default());
        let (service, store) = service_with(generator.clone());

        let mut req = create_request("text");
        req.session_type = None;
        let result = service.create_note(req).await;

        assert!(matches!(result, Err(ScribeError::Validation(_))));
        assert!(store.is_empty().await);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_generation_failure_keeps_draft() {
        let (service, store) = service_with(Arc::new(FailingGenerator));

        let result = service.create_note(create_request("Client engaged in...")).await;

        let note_id = match result {
            Err(ScribeError::GenerationFailed { note_id, source }) => {
                assert!(source.to_string().contains("upstream unavailable"));
                note_id
            }
            other => panic!("Expected GenerationFailed, got {:?}", other),
        };

        let stored = store.get_by_id(note_id).await.unwrap().unwrap();
        assert_eq!(stored.draft_note, "Client engaged in...");
        assert!(stored.generated_note.is_none());
        assert_eq!(stored.status(), NoteStatus::Draft);
    }

    #[tokio::test]
    async fn test_finalize_after_generation() {
        let (service, _store) = service_with(Arc::new(PrefixGenerator::default()));
        service.create_note(create_request("Client engaged in...")).await.unwrap();

        let resp = service
            .finalize_note(1, finalize_request("Reviewed and approved."))
            .await
            .unwrap();

        assert_eq!(resp.note_id, 1);
        assert_eq!(resp.final_note, "Reviewed and approved.");
    }

    #[tokio::test]
    async fn test_finalize_is_idempotent_and_never_touches_draft() {
        let (service, _store) = service_with(Arc::new(PrefixGenerator::default()));
        service.create_note(create_request("original draft")).await.unwrap();

        let first = service.finalize_note(1, finalize_request("Same text")).await.unwrap();
        let second = service.finalize_note(1, finalize_request("Same text")).await.unwrap();
        assert_eq!(first, second);

        service.finalize_note(1, finalize_request("original draft, edited")).await.unwrap();
        let note = service.get_note(1).await.unwrap();
        assert_eq!(note.draft_note, "original draft");
        assert_eq!(note.final_note.as_deref(), Some("original draft, edited"));
        assert_eq!(note.status(), NoteStatus::Finalized);
    }

    #[tokio::test]
    async fn test_finalize_allowed_without_generated_note() {
        let (service, _store) = service_with(Arc::new(FailingGenerator));
        let _ = service.create_note(create_request("draft")).await;

        let resp = service.finalize_note(1, finalize_request("Hand written.")).await.unwrap();
        assert_eq!(resp.final_note, "Hand written.");

        let note = service.get_note(1).await.unwrap();
        assert!(note.generated_note.is_none());
        assert_eq!(note.status(), NoteStatus::Finalized);
    }

    /// Reports successful writes but hands back rows without `final_note`,
    /// like a replica that has not caught up yet.
    struct LaggingStore {
        inner: MemoryNoteStore,
    }

    #[async_trait]
    impl NoteStore for LaggingStore {
        async fn insert(&self, note: &crate::contracts::NewSessionNote) -> Result<SessionNote> {
            self.inner.insert(note).await
        }

        async fn get_by_id(&self, id: i64) -> Result<Option<SessionNote>> {
            self.inner.get_by_id(id).await
        }

        async fn update_generated_note(&self, id: i64, text: &str) -> Result<SessionNote> {
            self.inner.update_generated_note(id, text).await
        }

        async fn update_final_note(&self, id: i64, text: &str) -> Result<Option<SessionNote>> {
            let note = self.inner.update_final_note(id, text).await?;
            Ok(note.map(|n| SessionNote {
                final_note: None,
                ..n
            }))
        }

        async fn health(&self) -> Result<String> {
            self.inner.health().await
        }

        fn name(&self) -> &str {
            "lagging"
        }
    }

    #[tokio::test]
    async fn test_finalize_echoes_request_text_when_row_lacks_final_note() {
        let store = Arc::new(LaggingStore {
            inner: MemoryNoteStore::new(),
        });
        let service = NoteService::new(store, Arc::new(PrefixGenerator::default()));
        service.create_note(create_request("draft")).await.unwrap();

        let resp = service
            .finalize_note(1, finalize_request("Reviewed and approved."))
            .await
            .unwrap();

        assert_eq!(resp.note_id, 1);
        assert_eq!(resp.final_note, "Reviewed and approved.");
    }

    #[tokio::test]
    async fn test_finalize_unknown_id_is_not_found() {
        let (service, store) = service_with(Arc::new(PrefixGenerator::default()));

        let result = service.finalize_note(999, finalize_request("Reviewed and approved.")).await;

        assert!(matches!(result, Err(ScribeError::NotFound(999))));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_finalize_rejects_blank_text_before_lookup() {
        let (service, _store) = service_with(Arc::new(PrefixGenerator::default()));
        let result = service.finalize_note(999, finalize_request("  ")).await;
        assert!(matches!(result, Err(ScribeError::Validation(_))));
    }

    #[tokio::test]
    async fn test_get_note_unknown_id() {
        let (service, _store) = service_with(Arc::new(PrefixGenerator::default()));
        assert!(matches!(service.get_note(3).await, Err(ScribeError::NotFound(3))));
    }
}

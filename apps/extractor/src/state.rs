use std::sync::Arc;
use std::time::Duration;

use crate::assistant::conversation::ConversationStore;
use crate::config::Config;
use crate::documents::{FileTextExtractor, TextExtractor};
use crate::llm_client::LanguageModel;

/// Shared assistant state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub llm: Arc<dyn LanguageModel>,
    /// Reads uploaded JD and résumé files.
    pub text_extractor: Arc<dyn TextExtractor>,
    pub conversations: Arc<ConversationStore>,
    pub config: Config,
}

impl AppState {
    pub fn new(llm: Arc<dyn LanguageModel>, config: Config) -> Self {
        Self {
            llm,
            text_extractor: Arc::new(FileTextExtractor),
            conversations: Arc::new(ConversationStore::new()),
            config,
        }
    }

    /// Per-call model deadline from `LLM_TIMEOUT_SECS`.
    pub fn llm_deadline(&self) -> Option<Duration> {
        self.config.llm_timeout_secs.map(Duration::from_secs)
    }
}

//! Conversation store for the job-description assistant.
//!
//! Each mode holds at most one active conversation, keyed by a signature of
//! the uploaded documents. Re-opening with the same signature resumes the
//! existing history; a different signature replaces it with a fresh one.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::prompts::{extraction_prompt, matching_prompt, reasoning_prompt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Extraction,
    Reasoning,
    Matching,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Extraction => "extraction",
            Mode::Reasoning => "reasoning",
            Mode::Matching => "matching",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An uploaded document, already reduced to text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedDocument {
    pub name: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: Uuid,
    pub mode: Mode,
    pub signature: String,
    pub job_description: NamedDocument,
    pub resumes: Vec<NamedDocument>,
    pub history: Vec<Exchange>,
}

impl Conversation {
    /// The model prompt for `question` in this conversation's mode.
    pub fn prompt_for(&self, question: &str) -> String {
        let jd = &self.job_description.text;
        match self.mode {
            Mode::Extraction => extraction_prompt(jd, question),
            Mode::Reasoning => reasoning_prompt(jd, question),
            Mode::Matching => matching_prompt(jd, &self.resumes, question),
        }
    }
}

/// Identity of an upload set: the JD name, plus the sorted résumé names when
/// matching.
pub fn signature(mode: Mode, job_description: &NamedDocument, resumes: &[NamedDocument]) -> String {
    match mode {
        Mode::Extraction | Mode::Reasoning => job_description.name.clone(),
        Mode::Matching => {
            let mut names: Vec<&str> = resumes.iter().map(|r| r.name.as_str()).collect();
            names.sort_unstable();
            format!("{}|{}", job_description.name, names.join(","))
        }
    }
}

#[derive(Debug, Default)]
pub struct ConversationStore {
    active: RwLock<HashMap<Mode, Conversation>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resumes or starts the conversation for this upload set. Documents are
    /// refreshed either way.
    pub async fn open(
        &self,
        mode: Mode,
        job_description: NamedDocument,
        resumes: Vec<NamedDocument>,
    ) -> Conversation {
        let signature = signature(mode, &job_description, &resumes);
        let mut active = self.active.write().await;

        match active.get_mut(&mode) {
            Some(existing) if existing.signature == signature => {
                existing.job_description = job_description;
                existing.resumes = resumes;
                existing.clone()
            }
            _ => {
                let conversation = Conversation {
                    id: Uuid::new_v4(),
                    mode,
                    signature,
                    job_description,
                    resumes,
                    history: Vec::new(),
                };
                active.insert(mode, conversation.clone());
                conversation
            }
        }
    }

    pub async fn get(&self, id: Uuid) -> Option<Conversation> {
        self.active
            .read()
            .await
            .values()
            .find(|c| c.id == id)
            .cloned()
    }

    /// Appends an exchange and returns its 1-based position, or `None` if the
    /// conversation has since been replaced.
    pub async fn append(&self, id: Uuid, exchange: Exchange) -> Option<usize> {
        let mut active = self.active.write().await;
        let conversation = active.values_mut().find(|c| c.id == id)?;
        conversation.history.push(exchange);
        Some(conversation.history.len())
    }

    pub async fn reset(&self, id: Uuid) -> Option<Conversation> {
        let mut active = self.active.write().await;
        let conversation = active.values_mut().find(|c| c.id == id)?;
        conversation.history.clear();
        Some(conversation.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str) -> NamedDocument {
        NamedDocument {
            name: name.to_string(),
            text: format!("contents of {name}"),
        }
    }

    fn exchange(q: &str) -> Exchange {
        Exchange {
            question: q.to_string(),
            answer: format!("answer to {q}"),
        }
    }

    #[test]
    fn test_matching_signature_ignores_upload_order() {
        let jd = doc("jd.pdf");
        let a = signature(Mode::Matching, &jd, &[doc("b.pdf"), doc("a.pdf")]);
        let b = signature(Mode::Matching, &jd, &[doc("a.pdf"), doc("b.pdf")]);
        assert_eq!(a, "jd.pdf|a.pdf,b.pdf");
        assert_eq!(a, b);
    }

    #[test]
    fn test_extraction_signature_is_jd_name() {
        assert_eq!(signature(Mode::Extraction, &doc("jd.txt"), &[doc("x")]), "jd.txt");
    }

    #[tokio::test]
    async fn test_same_signature_resumes_history() {
        let store = ConversationStore::new();
        let first = store.open(Mode::Extraction, doc("jd.pdf"), vec![]).await;
        assert_eq!(store.append(first.id, exchange("skills?")).await, Some(1));

        let again = store.open(Mode::Extraction, doc("jd.pdf"), vec![]).await;
        assert_eq!(again.id, first.id);
        assert_eq!(again.history, vec![exchange("skills?")]);
    }

    #[tokio::test]
    async fn test_new_upload_set_starts_fresh_conversation() {
        let store = ConversationStore::new();
        let first = store
            .open(Mode::Matching, doc("jd.pdf"), vec![doc("a.pdf")])
            .await;
        store.append(first.id, exchange("best?")).await;

        let second = store
            .open(Mode::Matching, doc("jd.pdf"), vec![doc("a.pdf"), doc("b.pdf")])
            .await;
        assert_ne!(second.id, first.id);
        assert!(second.history.is_empty());
        assert!(store.get(first.id).await.is_none());
        assert_eq!(store.append(first.id, exchange("late")).await, None);
    }

    #[tokio::test]
    async fn test_modes_are_independent() {
        let store = ConversationStore::new();
        let extraction = store.open(Mode::Extraction, doc("jd.pdf"), vec![]).await;
        let reasoning = store.open(Mode::Reasoning, doc("jd.pdf"), vec![]).await;

        assert_ne!(extraction.id, reasoning.id);
        assert!(store.get(extraction.id).await.is_some());
        assert!(store.get(reasoning.id).await.is_some());
    }

    #[tokio::test]
    async fn test_reset_clears_history_only() {
        let store = ConversationStore::new();
        let conversation = store.open(Mode::Reasoning, doc("jd.pdf"), vec![]).await;
        store.append(conversation.id, exchange("why?")).await;

        let reset = store.reset(conversation.id).await.unwrap();
        assert!(reset.history.is_empty());
        assert_eq!(reset.job_description, doc("jd.pdf"));
        assert_eq!(store.append(conversation.id, exchange("again")).await, Some(1));
    }

    #[test]
    fn test_prompt_for_dispatches_on_mode() {
        let mut conversation = Conversation {
            id: Uuid::new_v4(),
            mode: Mode::Matching,
            signature: String::new(),
            job_description: doc("jd.pdf"),
            resumes: vec![doc("a.pdf")],
            history: Vec::new(),
        };
        assert!(conversation
            .prompt_for("q")
            .contains("Resume 1:\ncontents of a.pdf"));

        conversation.mode = Mode::Reasoning;
        assert!(conversation.prompt_for("q").contains("Answer reasoning question: q"));
    }
}

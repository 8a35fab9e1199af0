//! Scripted `LanguageModel` double for tests.
//!
//! Replies are chosen by the first rule whose needle occurs in the prompt,
//! falling back to a default reply.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{LanguageModel, LlmError};

#[derive(Clone)]
enum Reply {
    Text(String),
    Fail,
}

pub struct ScriptedModel {
    rules: Vec<(String, Reply)>,
    fallback: Reply,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(fallback: &str) -> Self {
        Self {
            rules: Vec::new(),
            fallback: Reply::Text(fallback.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    /// A model whose every call fails with a server error.
    pub fn failing() -> Self {
        Self {
            rules: Vec::new(),
            fallback: Reply::Fail,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn on(mut self, needle: &str, response: &str) -> Self {
        self.rules
            .push((needle.to_string(), Reply::Text(response.to_string())));
        self
    }

    pub fn fail_on(mut self, needle: &str) -> Self {
        self.rules.push((needle.to_string(), Reply::Fail));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str, _system: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.fallback.clone());

        match reply {
            Reply::Text(text) => Ok(text),
            Reply::Fail => Err(LlmError::Api {
                status: 500,
                message: "scripted failure".to_string(),
            }),
        }
    }
}

/// Replies `{}` after a fixed delay and records the highest number of calls
/// that were in flight at once.
pub struct SlowModel {
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl SlowModel {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for SlowModel {
    async fn complete(&self, _prompt: &str, _system: &str) -> Result<String, LlmError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok("{}".to_string())
    }
}

//! In-memory `TextExtractor` for tests, keyed by file name.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use super::TextExtractor;

#[derive(Default)]
pub struct StubTextExtractor {
    texts: HashMap<String, String>,
    requested: Mutex<Vec<String>>,
}

impl StubTextExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, file_name: &str, text: &str) -> Self {
        self.texts.insert(file_name.to_string(), text.to_string());
        self
    }

    /// File names passed to `extract`, sorted.
    pub fn requested(&self) -> Vec<String> {
        let mut names = self.requested.lock().unwrap().clone();
        names.sort();
        names
    }
}

#[async_trait]
impl TextExtractor for StubTextExtractor {
    async fn extract(&self, path: &Path) -> String {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.requested.lock().unwrap().push(name.clone());
        self.texts.get(&name).cloned().unwrap_or_default()
    }
}

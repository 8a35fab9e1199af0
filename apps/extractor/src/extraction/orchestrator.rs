//! Extraction Orchestrator: one document in, one finalized record out.
//!
//! Flow: extract text → working copy of the template → fan out section tasks
//!       on a bounded pool → join all → merge → enforce → wrap with an id.
//!
//! Section tasks share nothing mutable: each reads the document text and its
//! own fragment and returns a patch. Merging happens on this task after every
//! section has joined, so the working copy never needs a lock.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use serde_json::{Map, Value};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::documents::TextExtractor;
use crate::extraction::prompter::{CompetencyLevel, Section, SectionPrompter};
use crate::extraction::record::{ExtractionOutcome, ParsedDocument};
use crate::template::{self, enforce, Template};

/// Per-skill key the competency label is written under.
pub const COMPETENCY_KEY: &str = "competencyLevel";
/// Key a bare-string skill entry is promoted into.
pub const SKILL_NAME_KEY: &str = "skillName";

/// Record keys stamped by the orchestrator; model output never overwrites them.
const STAMPED_KEYS: &[&str] = &[template::RESUME_FILE_NAME, template::PARSING_DATE];

const IDENTITY_KEYS: &[&str] = &[
    template::PASSPORT_DETAILS,
    template::IDENTIFICATION,
    template::CATEGORY_DETAILS,
];

const MISC_KEYS: &[&str] = &[
    template::WORKED_PERIOD,
    template::ACHIEVEMENTS,
    template::PUBLICATIONS,
    template::HOBBIES,
    template::REFERENCES,
    template::LANGUAGES_KNOWN,
];

pub struct DocumentExtractor {
    template: Arc<Template>,
    prompter: Arc<SectionPrompter>,
    text_extractor: Arc<dyn TextExtractor>,
    section_concurrency: usize,
}

impl DocumentExtractor {
    pub fn new(
        template: Arc<Template>,
        prompter: Arc<SectionPrompter>,
        text_extractor: Arc<dyn TextExtractor>,
        section_concurrency: usize,
    ) -> Self {
        Self {
            template,
            prompter,
            text_extractor,
            section_concurrency: section_concurrency.max(1),
        }
    }

    /// Runs the full pipeline for one file. Never fails: unreadable input
    /// yields `ExtractionOutcome::Unreadable`.
    pub async fn process_document(&self, path: &Path) -> ExtractionOutcome {
        let text = self.text_extractor.extract(path).await;
        if text.is_empty() {
            warn!(file = %path.display(), "No text extracted, writing empty record");
            return ExtractionOutcome::Unreadable;
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        ExtractionOutcome::Parsed(self.process_text(&file_name, text).await)
    }

    /// Extracts a record from already-extracted text.
    pub async fn process_text(&self, file_name: &str, text: String) -> ParsedDocument {
        let started = Instant::now();

        // Step 2: per-document working copy, stamped
        let mut working = match self.template.record().to_value() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        working.insert(
            template::RESUME_FILE_NAME.to_string(),
            Value::String(file_name.to_string()),
        );
        working.insert(
            template::PARSING_DATE.to_string(),
            Value::String(Local::now().to_rfc3339()),
        );

        // Steps 3-5: fan out, then join every task
        let (patches, level) = self.run_sections(&working, Arc::from(text)).await;

        // Step 6: merge on this task only
        merge_sections(&mut working, patches, level);

        // Step 7: final integrity pass against the whole template
        let mut wrapped = Map::new();
        wrapped.insert(template::RECORD_KEY.to_string(), Value::Object(working));
        let enforced = enforce(self.template.root(), &Value::Object(wrapped));
        let resume_data = match enforced {
            Value::Object(mut root) => root.remove(template::RECORD_KEY).unwrap_or_default(),
            other => other,
        };

        // Step 8
        let document_id = Uuid::new_v4();
        info!(
            file = file_name,
            %document_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Extracted document"
        );

        ParsedDocument {
            document_id,
            resume_data,
        }
    }

    async fn run_sections(
        &self,
        working: &Map<String, Value>,
        text: Arc<str>,
    ) -> (HashMap<Section, Value>, CompetencyLevel) {
        let semaphore = Arc::new(Semaphore::new(self.section_concurrency));

        let mut handles: Vec<(Section, Value, JoinHandle<Value>)> =
            Vec::with_capacity(Section::ALL.len());
        for section in Section::ALL {
            let fragment = section_fragment(section, working);
            let task_fragment = fragment.clone();
            let prompter = Arc::clone(&self.prompter);
            let semaphore = Arc::clone(&semaphore);
            let text = Arc::clone(&text);

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                prompter.extract(section, &text, &task_fragment).await
            });
            handles.push((section, fragment, handle));
        }

        let competency = {
            let prompter = Arc::clone(&self.prompter);
            let semaphore = Arc::clone(&semaphore);
            let text = Arc::clone(&text);
            tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                prompter.classify_competency(&text).await
            })
        };

        let mut patches = HashMap::with_capacity(handles.len());
        for (section, fragment, handle) in handles {
            let patch = handle.await.unwrap_or_else(|e| {
                warn!(section = %section, error = %e, "Section task aborted, using template default");
                fragment
            });
            patches.insert(section, patch);
        }

        let level = competency.await.unwrap_or_else(|e| {
            warn!(error = %e, "Competency task aborted, defaulting");
            CompetencyLevel::default()
        });

        (patches, level)
    }
}

/// The template region a section task is given, read from the working copy.
fn section_fragment(section: Section, working: &Map<String, Value>) -> Value {
    let get = |key: &str| working.get(key).cloned().unwrap_or(Value::Null);
    let composite = |keys: &[&str]| {
        Value::Object(
            keys.iter()
                .map(|k| (k.to_string(), get(k)))
                .collect::<Map<String, Value>>(),
        )
    };

    match section {
        Section::Personal => get(template::PERSONAL_DETAILS),
        Section::Contact => get(template::CONTACT_DETAILS),
        Section::Identity => composite(IDENTITY_KEYS),
        Section::Education => get(template::EDUCATION),
        Section::WorkExperience => get(template::WORK_EXPERIENCE),
        Section::Projects => get(template::PROJECTS),
        Section::Skills => get(template::SEGREGATED_SKILL),
        Section::Miscellaneous => composite(MISC_KEYS),
    }
}

/// Folds every section patch into the working copy.
fn merge_sections(
    working: &mut Map<String, Value>,
    mut patches: HashMap<Section, Value>,
    level: CompetencyLevel,
) {
    let mut take = |section: Section| patches.remove(&section).unwrap_or(Value::Null);

    for (section, key) in [
        (Section::Personal, template::PERSONAL_DETAILS),
        (Section::Contact, template::CONTACT_DETAILS),
        (Section::Skills, template::SEGREGATED_SKILL),
    ] {
        let patch = unwrap_envelope(take(section), key);
        if let Some(target) = working.get_mut(key) {
            merge_object_into(target, patch);
        }
    }

    let identity = take(Section::Identity);
    for key in IDENTITY_KEYS {
        if let (Some(target), Some(patch)) = (working.get_mut(*key), identity.get(*key)) {
            merge_object_into(target, patch.clone());
        }
    }

    // Array sections replace the template's exemplar wholesale.
    for (section, key) in [
        (Section::Education, template::EDUCATION),
        (Section::WorkExperience, template::WORK_EXPERIENCE),
        (Section::Projects, template::PROJECTS),
    ] {
        working.insert(key.to_string(), unwrap_envelope(take(section), key));
    }

    // Only keys the record already has are written back. This runs after the
    // other sections, so a miscellaneous answer naming another section's key
    // replaces that section's result; the final enforce pass reshapes it.
    if let Value::Object(misc) = take(Section::Miscellaneous) {
        for (key, value) in misc {
            if STAMPED_KEYS.contains(&key.as_str()) {
                warn!(key = %key, "Ignoring miscellaneous write to a stamped key");
            } else if working.contains_key(&key) {
                working.insert(key, value);
            } else {
                warn!(key = %key, "Dropping miscellaneous key outside the record");
            }
        }
    }

    broadcast_competency(working, level);
}

/// Shallow-merges an object patch into an object target. Non-object patches
/// leave the target untouched; enforcement fills any gaps later.
fn merge_object_into(target: &mut Value, patch: Value) {
    if let (Value::Object(target), Value::Object(patch)) = (target, patch) {
        target.extend(patch);
    }
}

/// `{"Education": [...]}` → `[...]` when the section name is the only key.
fn unwrap_envelope(patch: Value, key: &str) -> Value {
    match patch {
        Value::Object(mut map) if map.len() == 1 && map.contains_key(key) => {
            map.remove(key).unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Writes the competency label onto every entry of both skill lists.
fn broadcast_competency(working: &mut Map<String, Value>, level: CompetencyLevel) {
    let Some(skills) = working.get_mut(template::SEGREGATED_SKILL) else {
        return;
    };
    for list in [template::TECHNICAL_SKILLS, template::SOFT_SKILLS] {
        let Some(Value::Array(entries)) = skills.get_mut(list) else {
            continue;
        };
        for entry in entries.iter_mut() {
            if !entry.is_object() {
                let mut promoted = Map::new();
                if let Value::String(name) = entry.take() {
                    promoted.insert(SKILL_NAME_KEY.to_string(), Value::String(name));
                }
                *entry = Value::Object(promoted);
            }
            if let Value::Object(fields) = entry {
                fields.insert(
                    COMPETENCY_KEY.to_string(),
                    Value::String(level.as_str().to_string()),
                );
            }
        }
    }
}

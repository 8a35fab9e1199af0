//! Section Prompter: asks the model for one region of the template.
//!
//! Both operations are infallible: model errors, deadline expiry and
//! unparseable output all degrade to the caller-supplied default.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::extraction::parser::parse_model_output;
use crate::extraction::prompts::*;
use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, STRICT_JSON_INSTRUCTION};
use crate::llm_client::{complete_within, LanguageModel, LlmError};

/// How much raw model output to quote in parse-failure logs.
const LOG_EXCERPT_CHARS: usize = 300;

/// The independent, template-shaped extraction subtasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Personal,
    Contact,
    Identity,
    Education,
    WorkExperience,
    Projects,
    Skills,
    Miscellaneous,
}

impl Section {
    pub const ALL: [Section; 8] = [
        Section::Personal,
        Section::Contact,
        Section::Identity,
        Section::Education,
        Section::WorkExperience,
        Section::Projects,
        Section::Skills,
        Section::Miscellaneous,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Section::Personal => "personal",
            Section::Contact => "contact",
            Section::Identity => "identity",
            Section::Education => "education",
            Section::WorkExperience => "work",
            Section::Projects => "projects",
            Section::Skills => "skills",
            Section::Miscellaneous => "misc",
        }
    }

    fn instruction(self) -> &'static str {
        match self {
            Section::Personal => PERSONAL_INSTRUCTION,
            Section::Contact => CONTACT_INSTRUCTION,
            Section::Identity => IDENTITY_INSTRUCTION,
            Section::Education => EDUCATION_INSTRUCTION,
            Section::WorkExperience => WORK_INSTRUCTION,
            Section::Projects => PROJECTS_INSTRUCTION,
            Section::Skills => SKILLS_INSTRUCTION,
            Section::Miscellaneous => MISC_INSTRUCTION,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Overall competency, broadcast onto every skill entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum CompetencyLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl CompetencyLevel {
    /// Case-insensitive match of the whole (trimmed) response.
    pub fn from_response(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "beginner" => Some(CompetencyLevel::Beginner),
            "intermediate" => Some(CompetencyLevel::Intermediate),
            "advanced" => Some(CompetencyLevel::Advanced),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CompetencyLevel::Beginner => "Beginner",
            CompetencyLevel::Intermediate => "Intermediate",
            CompetencyLevel::Advanced => "Advanced",
        }
    }
}

impl fmt::Display for CompetencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct SectionPrompter {
    llm: Arc<dyn LanguageModel>,
    max_chars: usize,
    deadline: Option<Duration>,
}

impl SectionPrompter {
    pub fn new(llm: Arc<dyn LanguageModel>, max_chars: usize) -> Self {
        Self {
            llm,
            max_chars,
            deadline: None,
        }
    }

    /// Bounds every model call; expiry counts as a failed call.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Best-effort patch for `fragment`, or `fragment` itself on any failure.
    pub async fn extract(&self, section: Section, text: &str, fragment: &Value) -> Value {
        let prompt = self.section_prompt(section, text, fragment);

        let raw = match self.call(&prompt, JSON_ONLY_SYSTEM).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(section = %section, error = %e, "Model call failed, using template default");
                return fragment.clone();
            }
        };

        let outcome = parse_model_output(&raw);
        debug!(section = %section, stage = outcome.stage(), "Parsed section response");
        match outcome.value() {
            Some(value) => value,
            None => {
                warn!(
                    section = %section,
                    raw = %excerpt(&raw),
                    "No JSON found in model output, using template default"
                );
                fragment.clone()
            }
        }
    }

    /// One of three labels; `Intermediate` unless the response matches exactly.
    pub async fn classify_competency(&self, text: &str) -> CompetencyLevel {
        let prompt =
            COMPETENCY_PROMPT_TEMPLATE.replace("{resume_text}", &truncate_chars(text, self.max_chars));

        match self.call(&prompt, COMPETENCY_SYSTEM).await {
            Ok(raw) => CompetencyLevel::from_response(&raw).unwrap_or_else(|| {
                debug!(raw = %excerpt(&raw), "Unrecognised competency label");
                CompetencyLevel::default()
            }),
            Err(e) => {
                warn!(error = %e, "Competency call failed, defaulting");
                CompetencyLevel::default()
            }
        }
    }

    fn section_prompt(&self, section: Section, text: &str, fragment: &Value) -> String {
        let template_json =
            serde_json::to_string_pretty(fragment).unwrap_or_else(|_| fragment.to_string());
        SECTION_PROMPT_TEMPLATE
            .replace("{instruction}", section.instruction())
            .replace("{strict_json}", STRICT_JSON_INSTRUCTION)
            .replace("{template_json}", &template_json)
            .replace("{resume_text}", &truncate_chars(text, self.max_chars))
    }

    async fn call(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        complete_within(self.llm.as_ref(), prompt, system, self.deadline).await
    }
}

/// First `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn excerpt(raw: &str) -> String {
    truncate_chars(raw, LOG_EXCERPT_CHARS)
}
